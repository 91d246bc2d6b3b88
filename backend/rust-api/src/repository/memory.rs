//! In-memory repository for tests and local development without MongoDB.
//!
//! One `RwLock` guards the whole data set, so a completion holds the write
//! lock from the "already completed?" check to the last write.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{LearnRepository, RepositoryError, RepositoryResult};
use crate::models::{
    profile::OnboardingRequest, AuthUser, CompletionOutcome, Course, CourseEnrollment,
    CourseModule, CourseStatus, Lesson, LessonCompletion, Profile, ProgressStatus, Streak,
    Subject, UserProgress,
};

#[derive(Clone, Default)]
pub struct InMemoryLearnRepository {
    data: Arc<RwLock<MemoryData>>,
}

#[derive(Default)]
struct MemoryData {
    subjects: Vec<Subject>,
    courses: Vec<Course>,
    modules: Vec<CourseModule>,
    lessons: Vec<Lesson>,
    profiles: HashMap<String, Profile>,
    streaks: HashMap<String, Streak>,
    progress: HashMap<(String, String), UserProgress>,
    enrollments: Vec<CourseEnrollment>,
    /// When set, every write fails with this message before touching state.
    write_failure: Option<String>,
}

impl InMemoryLearnRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_subject(&self, subject: Subject) {
        self.data.write().await.subjects.push(subject);
    }

    pub async fn insert_course(&self, course: Course) {
        self.data.write().await.courses.push(course);
    }

    pub async fn insert_module(&self, module: CourseModule) {
        self.data.write().await.modules.push(module);
    }

    pub async fn insert_lesson(&self, lesson: Lesson) {
        self.data.write().await.lessons.push(lesson);
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.data
            .write()
            .await
            .profiles
            .insert(profile.id.clone(), profile);
    }

    pub async fn insert_streak(&self, streak: Streak) {
        self.data
            .write()
            .await
            .streaks
            .insert(streak.user_id.clone(), streak);
    }

    pub async fn insert_progress(&self, progress: UserProgress) {
        let key = (progress.user_id.clone(), progress.lesson_id.clone());
        self.data.write().await.progress.insert(key, progress);
    }

    /// Makes subsequent writes fail, to exercise rollback paths.
    pub async fn fail_writes(&self, message: impl Into<String>) {
        self.data.write().await.write_failure = Some(message.into());
    }

    fn check_writable(data: &MemoryData) -> RepositoryResult<()> {
        match &data.write_failure {
            Some(message) => Err(RepositoryError::Database(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LearnRepository for InMemoryLearnRepository {
    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }

    async fn list_subjects(&self) -> RepositoryResult<Vec<Subject>> {
        let mut subjects = self.data.read().await.subjects.clone();
        subjects.sort_by_key(|s| s.order);
        Ok(subjects)
    }

    async fn list_published_courses(&self) -> RepositoryResult<Vec<Course>> {
        let mut courses: Vec<Course> = self
            .data
            .read()
            .await
            .courses
            .iter()
            .filter(|c| c.status == CourseStatus::Published)
            .cloned()
            .collect();
        courses.sort_by_key(|c| c.order_index);
        Ok(courses)
    }

    async fn find_course_by_id(&self, course_id: &str) -> RepositoryResult<Option<Course>> {
        let data = self.data.read().await;
        Ok(data.courses.iter().find(|c| c.id == course_id).cloned())
    }

    async fn find_course_by_slug(&self, slug: &str) -> RepositoryResult<Option<Course>> {
        let data = self.data.read().await;
        Ok(data.courses.iter().find(|c| c.slug == slug).cloned())
    }

    async fn find_subject_by_id(&self, subject_id: &str) -> RepositoryResult<Option<Subject>> {
        let data = self.data.read().await;
        Ok(data.subjects.iter().find(|s| s.id == subject_id).cloned())
    }

    async fn list_modules(&self, course_ids: &[String]) -> RepositoryResult<Vec<CourseModule>> {
        let mut modules: Vec<CourseModule> = self
            .data
            .read()
            .await
            .modules
            .iter()
            .filter(|m| course_ids.contains(&m.course_id))
            .cloned()
            .collect();
        modules.sort_by_key(|m| m.order);
        Ok(modules)
    }

    async fn find_module_by_id(&self, module_id: &str) -> RepositoryResult<Option<CourseModule>> {
        let data = self.data.read().await;
        Ok(data.modules.iter().find(|m| m.id == module_id).cloned())
    }

    async fn list_lessons(&self, module_ids: &[String]) -> RepositoryResult<Vec<Lesson>> {
        let mut lessons: Vec<Lesson> = self
            .data
            .read()
            .await
            .lessons
            .iter()
            .filter(|l| module_ids.contains(&l.module_id))
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.order_index);
        Ok(lessons)
    }

    async fn find_lesson_by_id(&self, lesson_id: &str) -> RepositoryResult<Option<Lesson>> {
        let data = self.data.read().await;
        Ok(data.lessons.iter().find(|l| l.id == lesson_id).cloned())
    }

    async fn find_lesson_by_slug(&self, slug: &str) -> RepositoryResult<Option<Lesson>> {
        let data = self.data.read().await;
        Ok(data.lessons.iter().find(|l| l.slug == slug).cloned())
    }

    async fn find_profile(&self, user_id: &str) -> RepositoryResult<Option<Profile>> {
        Ok(self.data.read().await.profiles.get(user_id).cloned())
    }

    async fn ensure_profile(&self, user: &AuthUser) -> RepositoryResult<Profile> {
        let mut data = self.data.write().await;
        if let Some(profile) = data.profiles.get(&user.id) {
            return Ok(profile.clone());
        }
        Self::check_writable(&data)?;
        let profile = Profile::new(&user.id, user.display_name.clone(), user.email.clone());
        data.profiles.insert(user.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn save_onboarding(
        &self,
        user_id: &str,
        request: &OnboardingRequest,
    ) -> RepositoryResult<Option<Profile>> {
        let mut data = self.data.write().await;
        Self::check_writable(&data)?;
        let Some(profile) = data.profiles.get_mut(user_id) else {
            return Ok(None);
        };
        if let Some(name) = &request.display_name {
            profile.display_name = Some(name.clone());
        }
        profile.tier_level = Some(request.tier_level);
        profile.subject_interests = request.subject_interests.clone();
        profile.onboarding_complete = true;
        Ok(Some(profile.clone()))
    }

    async fn find_streak(&self, user_id: &str) -> RepositoryResult<Option<Streak>> {
        Ok(self.data.read().await.streaks.get(user_id).cloned())
    }

    async fn find_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> RepositoryResult<Option<UserProgress>> {
        let key = (user_id.to_string(), lesson_id.to_string());
        Ok(self.data.read().await.progress.get(&key).cloned())
    }

    async fn completed_lesson_ids(&self, user_id: &str) -> RepositoryResult<HashSet<String>> {
        let data = self.data.read().await;
        Ok(data
            .progress
            .values()
            .filter(|p| p.user_id == user_id && p.is_completed())
            .map(|p| p.lesson_id.clone())
            .collect())
    }

    async fn record_completion(
        &self,
        completion: &LessonCompletion,
    ) -> RepositoryResult<CompletionOutcome> {
        let mut data = self.data.write().await;
        let key = (completion.user_id.clone(), completion.lesson_id.clone());

        let progress = match data.progress.get(&key) {
            Some(existing) if existing.is_completed() => {
                return Ok(CompletionOutcome::AlreadyCompleted)
            }
            Some(existing) => UserProgress {
                status: ProgressStatus::Completed,
                completed_at: Some(completion.completed_at),
                xp_earned: completion.xp_reward,
                ..existing.clone()
            },
            None => UserProgress {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: completion.user_id.clone(),
                lesson_id: completion.lesson_id.clone(),
                status: ProgressStatus::Completed,
                completed_at: Some(completion.completed_at),
                xp_earned: completion.xp_reward,
            },
        };

        let mut profile = data
            .profiles
            .get(&completion.user_id)
            .cloned()
            .unwrap_or_else(|| Profile::new(&completion.user_id, None, None));
        profile.award_xp(completion.xp_reward);

        let mut streak = data
            .streaks
            .get(&completion.user_id)
            .cloned()
            .unwrap_or_else(|| Streak::new(&completion.user_id));
        streak.touch(completion.today);

        // Nothing has been written yet, so failing here leaves no partial state
        Self::check_writable(&data)?;

        data.progress.insert(key, progress);
        data.profiles
            .insert(completion.user_id.clone(), profile.clone());
        data.streaks
            .insert(completion.user_id.clone(), streak.clone());

        Ok(CompletionOutcome::Completed { profile, streak })
    }

    async fn find_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> RepositoryResult<Option<CourseEnrollment>> {
        let data = self.data.read().await;
        Ok(data
            .enrollments
            .iter()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .cloned())
    }

    async fn insert_enrollment(&self, enrollment: &CourseEnrollment) -> RepositoryResult<()> {
        let mut data = self.data.write().await;
        Self::check_writable(&data)?;
        let exists = data
            .enrollments
            .iter()
            .any(|e| e.user_id == enrollment.user_id && e.course_id == enrollment.course_id);
        if exists {
            return Err(RepositoryError::Duplicate(format!(
                "course_enrollments ({}, {})",
                enrollment.user_id, enrollment.course_id
            )));
        }
        data.enrollments.push(enrollment.clone());
        Ok(())
    }

    async fn list_enrollments(&self, user_id: &str) -> RepositoryResult<Vec<CourseEnrollment>> {
        let mut enrollments: Vec<CourseEnrollment> = self
            .data
            .read()
            .await
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(enrollments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn completion(lesson_id: &str, reward: i64, day: u32) -> LessonCompletion {
        LessonCompletion {
            user_id: "user-1".into(),
            lesson_id: lesson_id.into(),
            xp_reward: reward,
            completed_at: Utc::now(),
            today: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn second_completion_is_a_no_op() {
        let repo = InMemoryLearnRepository::new();
        let first = repo.record_completion(&completion("l1", 50, 1)).await.unwrap();
        assert!(matches!(first, CompletionOutcome::Completed { .. }));

        let second = repo.record_completion(&completion("l1", 50, 1)).await.unwrap();
        assert!(matches!(second, CompletionOutcome::AlreadyCompleted));

        let profile = repo.find_profile("user-1").await.unwrap().unwrap();
        assert_eq!(profile.xp, 50);
    }

    #[tokio::test]
    async fn failed_completion_writes_nothing() {
        let repo = InMemoryLearnRepository::new();
        repo.insert_profile(Profile::new("user-1", None, None)).await;
        repo.fail_writes("disk full").await;

        let err = repo
            .record_completion(&completion("l1", 50, 1))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");

        assert!(repo.find_progress("user-1", "l1").await.unwrap().is_none());
        assert!(repo.find_streak("user-1").await.unwrap().is_none());
        assert_eq!(repo.find_profile("user-1").await.unwrap().unwrap().xp, 0);
    }

    #[tokio::test]
    async fn not_started_row_is_upgraded_in_place() {
        let repo = InMemoryLearnRepository::new();
        repo.insert_progress(UserProgress {
            id: "p1".into(),
            user_id: "user-1".into(),
            lesson_id: "l1".into(),
            status: ProgressStatus::NotStarted,
            completed_at: None,
            xp_earned: 0,
        })
        .await;

        repo.record_completion(&completion("l1", 75, 1)).await.unwrap();

        let row = repo.find_progress("user-1", "l1").await.unwrap().unwrap();
        assert_eq!(row.id, "p1");
        assert!(row.is_completed());
        assert_eq!(row.xp_earned, 75);
    }

    #[tokio::test]
    async fn duplicate_enrollment_is_rejected() {
        let repo = InMemoryLearnRepository::new();
        repo.insert_enrollment(&CourseEnrollment::new("user-1", "c1"))
            .await
            .unwrap();
        let err = repo
            .insert_enrollment(&CourseEnrollment::new("user-1", "c1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));
    }

    #[tokio::test]
    async fn completed_ids_only_include_finished_lessons() {
        let repo = InMemoryLearnRepository::new();
        repo.record_completion(&completion("l1", 50, 1)).await.unwrap();
        repo.insert_progress(UserProgress {
            id: "p2".into(),
            user_id: "user-1".into(),
            lesson_id: "l2".into(),
            status: ProgressStatus::NotStarted,
            completed_at: None,
            xp_earned: 0,
        })
        .await;

        let ids = repo.completed_lesson_ids("user-1").await.unwrap();
        assert_eq!(ids, HashSet::from(["l1".to_string()]));
    }
}
