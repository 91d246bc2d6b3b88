use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::bson_datetime_as_chrono;

pub const XP_PER_LEVEL: i64 = 500;

/// Level reached with `xp` cumulative experience. Level 1 starts at 0 XP.
pub fn level_for_xp(xp: i64) -> i64 {
    xp.max(0) / XP_PER_LEVEL + 1
}

/// Learner's self-assessed starting point, chosen during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierLevel {
    Explorer,
    Navigator,
    Researcher,
    Curious,
}

/// Learner profile, `profiles` collection keyed by the auth user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub xp: i64,
    #[serde(default = "first_level")]
    pub level: i64,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub onboarding_complete: bool,
    #[serde(default)]
    pub tier_level: Option<TierLevel>,
    #[serde(default)]
    pub subject_interests: Vec<String>,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

fn first_level() -> i64 {
    1
}

impl Profile {
    pub fn new(id: impl Into<String>, display_name: Option<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            display_name,
            email,
            xp: 0,
            level: 1,
            is_premium: false,
            onboarding_complete: false,
            tier_level: None,
            subject_interests: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds XP and recomputes the level. Level is never set on its own.
    pub fn award_xp(&mut self, amount: i64) {
        self.xp += amount.max(0);
        self.level = level_for_xp(self.xp);
    }

    pub fn level_progress(&self) -> LevelProgress {
        LevelProgress::for_xp(self.xp)
    }
}

/// XP earned inside the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub progress: i64,
    pub needed: i64,
    pub percent: i64,
}

impl LevelProgress {
    pub fn for_xp(xp: i64) -> Self {
        let progress = xp.max(0) % XP_PER_LEVEL;
        Self {
            progress,
            needed: XP_PER_LEVEL,
            percent: ((progress as f64 / XP_PER_LEVEL as f64) * 100.0).round() as i64,
        }
    }
}

/// Daily activity streak, `streaks` collection keyed by user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    #[serde(rename = "_id")]
    pub user_id: String,
    #[serde(default)]
    pub current_streak: i32,
    #[serde(default)]
    pub longest_streak: i32,
    #[serde(default)]
    pub last_active_date: Option<NaiveDate>,
}

impl Streak {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
        }
    }

    /// Records activity on `today`.
    ///
    /// Same day (or a clock that went backwards) keeps the streak, the next
    /// calendar day extends it, any longer gap restarts it at one.
    pub fn touch(&mut self, today: NaiveDate) {
        match self.last_active_date {
            Some(last) if last >= today && self.current_streak > 0 => return,
            Some(last) if last.succ_opt() == Some(today) => self.current_streak += 1,
            _ => self.current_streak = 1,
        }
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_active_date = Some(today);
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    #[validate(length(min = 1, max = 80, message = "Display name must be 1-80 characters"))]
    pub display_name: Option<String>,
    pub tier_level: TierLevel,
    #[serde(default)]
    #[validate(length(max = 10, message = "Pick at most 10 interests"))]
    pub subject_interests: Vec<String>,
}

/// Profile as returned to the browser.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub xp: i64,
    pub level: i64,
    pub is_premium: bool,
    pub onboarding_complete: bool,
    pub tier_level: Option<TierLevel>,
    pub subject_interests: Vec<String>,
    pub level_progress: LevelProgress,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileView {
    fn from(profile: Profile) -> Self {
        let level_progress = profile.level_progress();
        Self {
            id: profile.id,
            display_name: profile.display_name,
            email: profile.email,
            xp: profile.xp,
            level: profile.level,
            is_premium: profile.is_premium,
            onboarding_complete: profile.onboarding_complete,
            tier_level: profile.tier_level,
            subject_interests: profile.subject_interests,
            level_progress,
            created_at: profile.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn level_is_floor_of_xp_over_five_hundred_plus_one() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(499), 1);
        assert_eq!(level_for_xp(500), 2);
        assert_eq!(level_for_xp(530), 2);
        assert_eq!(level_for_xp(1500), 4);
        assert_eq!(level_for_xp(-20), 1);
    }

    #[test]
    fn award_xp_recomputes_level() {
        let mut profile = Profile::new("u1", None, None);
        profile.xp = 480;
        profile.award_xp(50);
        assert_eq!(profile.xp, 530);
        assert_eq!(profile.level, 2);
        assert_eq!(profile.level_progress().progress, 30);
        assert_eq!(profile.level_progress().percent, 6);
    }

    #[test]
    fn streak_extends_on_consecutive_days() {
        let mut streak = Streak::new("u1");
        streak.touch(day(1));
        streak.touch(day(2));
        streak.touch(day(3));
        assert_eq!(streak.current_streak, 3);
        assert_eq!(streak.longest_streak, 3);
    }

    #[test]
    fn streak_same_day_is_unchanged() {
        let mut streak = Streak::new("u1");
        streak.touch(day(5));
        streak.touch(day(5));
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.last_active_date, Some(day(5)));
    }

    #[test]
    fn streak_resets_after_gap_but_keeps_longest() {
        let mut streak = Streak::new("u1");
        streak.touch(day(1));
        streak.touch(day(2));
        streak.touch(day(4));
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 2);
    }

    #[test]
    fn streak_crosses_month_boundary() {
        let mut streak = Streak::new("u1");
        streak.touch(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        streak.touch(day(1));
        assert_eq!(streak.current_streak, 2);
    }

    #[test]
    fn tier_level_is_lowercase() {
        let tier: TierLevel = serde_json::from_str("\"researcher\"").unwrap();
        assert_eq!(tier, TierLevel::Researcher);
        assert!(serde_json::from_str::<TierLevel>("\"wizard\"").is_err());
    }
}
