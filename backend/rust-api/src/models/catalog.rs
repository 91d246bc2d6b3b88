use serde::{Deserialize, Serialize};

/// XP granted by a lesson that does not set its own reward.
pub const DEFAULT_LESSON_XP: i64 = 50;

/// Top of the content hierarchy ("Astronomy", "Astrology"...), `subjects` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "_id")]
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon_name: Option<String>,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    #[default]
    Published,
    ComingSoon,
    Draft,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Published => "published",
            CourseStatus::ComingSoon => "coming_soon",
            CourseStatus::Draft => "draft",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub level_tag: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub order_index: i32,
}

/// Ordered group of lessons inside a course, `modules` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseModule {
    #[serde(rename = "_id")]
    pub id: String,
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(rename = "_id")]
    pub id: String,
    pub module_id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_mdx: Option<String>,
    #[serde(default)]
    pub xp_reward: Option<i64>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub order_index: i32,
}

impl Lesson {
    pub fn reward(&self) -> i64 {
        self.xp_reward.unwrap_or(DEFAULT_LESSON_XP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_reward_defaults_to_fifty() {
        let mut lesson = Lesson {
            id: "l1".into(),
            module_id: "m1".into(),
            slug: "intro".into(),
            title: "Intro".into(),
            content_type: None,
            content_mdx: None,
            xp_reward: None,
            difficulty_level: None,
            order_index: 1,
        };
        assert_eq!(lesson.reward(), 50);
        lesson.xp_reward = Some(120);
        assert_eq!(lesson.reward(), 120);
    }

    #[test]
    fn course_status_uses_snake_case() {
        let status: CourseStatus = serde_json::from_str("\"coming_soon\"").unwrap();
        assert_eq!(status, CourseStatus::ComingSoon);
        assert_eq!(CourseStatus::Published.as_str(), "published");
    }
}
