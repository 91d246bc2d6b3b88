use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{bson_datetime_as_chrono, bson_datetime_as_chrono_option, Profile, Streak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::Completed => "completed",
        }
    }
}

/// One row per (user, lesson), `user_progress` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProgress {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub lesson_id: String,
    #[serde(default)]
    pub status: ProgressStatus,
    #[serde(
        rename = "completedAt",
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    /// XP granted at first completion, kept even if the lesson reward changes later.
    #[serde(default)]
    pub xp_earned: i64,
}

impl UserProgress {
    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }
}

/// `course_enrollments` collection, unique on (user_id, course_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseEnrollment {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    #[serde(rename = "enrolledAt", with = "bson_datetime_as_chrono")]
    pub enrolled_at: DateTime<Utc>,
}

impl CourseEnrollment {
    pub fn new(user_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            course_id: course_id.into(),
            enrolled_at: Utc::now(),
        }
    }
}

/// Everything the store needs to record a first completion atomically.
#[derive(Debug, Clone)]
pub struct LessonCompletion {
    pub user_id: String,
    pub lesson_id: String,
    pub xp_reward: i64,
    pub completed_at: DateTime<Utc>,
    /// Calendar day the streak is counted against.
    pub today: NaiveDate,
}

#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    AlreadyCompleted,
    Completed { profile: Profile, streak: Streak },
}

/// Reads an id the way a loose JSON client sends it: strings as-is, other
/// truthy values (non-zero numbers, `true`, objects) as their JSON text.
/// `null`, `false` and `0` count as missing.
fn loose_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) => Some(s),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonRequest {
    #[serde(default, deserialize_with = "loose_id")]
    pub lesson_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonResponse {
    pub already_done: bool,
    pub xp_earned: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_level: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_streak: Option<i32>,
}

impl CompleteLessonResponse {
    pub fn already_done() -> Self {
        Self {
            already_done: true,
            xp_earned: 0,
            new_total: None,
            new_level: None,
            current_streak: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    #[serde(default, deserialize_with = "loose_id")]
    pub course_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrollResponse {
    pub enrolled: bool,
    pub already_enrolled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_done_response_omits_totals() {
        let json = serde_json::to_value(CompleteLessonResponse::already_done()).unwrap();
        assert_eq!(json, serde_json::json!({ "alreadyDone": true, "xpEarned": 0 }));
    }

    #[test]
    fn complete_request_accepts_missing_id() {
        let req: CompleteLessonRequest = serde_json::from_str("{}").unwrap();
        assert!(req.lesson_id.is_none());
        let req: CompleteLessonRequest = serde_json::from_str(r#"{"lessonId":"abc"}"#).unwrap();
        assert_eq!(req.lesson_id.as_deref(), Some("abc"));
    }

    #[test]
    fn ids_accept_truthy_non_strings() {
        let req: CompleteLessonRequest = serde_json::from_str(r#"{"lessonId":123}"#).unwrap();
        assert_eq!(req.lesson_id.as_deref(), Some("123"));
        let req: EnrollRequest = serde_json::from_str(r#"{"courseId":true}"#).unwrap();
        assert_eq!(req.course_id.as_deref(), Some("true"));

        for body in [r#"{"lessonId":null}"#, r#"{"lessonId":0}"#, r#"{"lessonId":false}"#] {
            let req: CompleteLessonRequest = serde_json::from_str(body).unwrap();
            assert!(req.lesson_id.is_none(), "{}", body);
        }
    }

    #[test]
    fn progress_status_round_trips_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProgressStatus::NotStarted).unwrap(),
            "\"not_started\""
        );
        assert_eq!(ProgressStatus::Completed.as_str(), "completed");
    }
}
