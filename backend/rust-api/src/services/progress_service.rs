use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::metrics::{ENROLLMENTS_TOTAL, LESSONS_COMPLETED_TOTAL, XP_AWARDED_TOTAL};
use crate::models::progress::{CompleteLessonResponse, EnrollResponse};
use crate::models::{CompletionOutcome, CourseEnrollment, LessonCompletion};
use crate::repository::{LearnRepository, RepositoryError};

pub struct ProgressService {
    repository: Arc<dyn LearnRepository>,
}

/// Treats a blank id the same as a missing one.
fn required_id(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProgressService {
    pub fn new(repository: Arc<dyn LearnRepository>) -> Self {
        Self { repository }
    }

    pub async fn complete_lesson(
        &self,
        user_id: &str,
        lesson_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CompleteLessonResponse, ApiError> {
        let lesson_id =
            required_id(lesson_id).ok_or_else(|| ApiError::bad_request("Missing lessonId"))?;

        let lesson = self
            .repository
            .find_lesson_by_id(&lesson_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Lesson not found"))?;

        let completion = LessonCompletion {
            user_id: user_id.to_string(),
            lesson_id: lesson.id.clone(),
            xp_reward: lesson.reward(),
            completed_at: now,
            today: now.date_naive(),
        };

        let outcome = match self.repository.record_completion(&completion).await {
            Ok(outcome) => outcome,
            // A concurrent request won the unique (user_id, lesson_id) race
            Err(RepositoryError::Duplicate(_)) => CompletionOutcome::AlreadyCompleted,
            Err(err) => {
                LESSONS_COMPLETED_TOTAL.with_label_values(&["error"]).inc();
                return Err(err.into());
            }
        };

        match outcome {
            CompletionOutcome::AlreadyCompleted => {
                LESSONS_COMPLETED_TOTAL
                    .with_label_values(&["already_done"])
                    .inc();
                tracing::debug!("Lesson {} already completed by {}", lesson.id, user_id);
                Ok(CompleteLessonResponse::already_done())
            }
            CompletionOutcome::Completed { profile, streak } => {
                LESSONS_COMPLETED_TOTAL
                    .with_label_values(&["completed"])
                    .inc();
                XP_AWARDED_TOTAL.inc_by(completion.xp_reward.max(0) as u64);

                tracing::info!(
                    "Lesson completed: user={}, lesson={}, xp={}, total={}, streak={}",
                    user_id,
                    lesson.id,
                    completion.xp_reward,
                    profile.xp,
                    streak.current_streak
                );

                Ok(CompleteLessonResponse {
                    already_done: false,
                    xp_earned: completion.xp_reward,
                    new_total: Some(profile.xp),
                    new_level: Some(profile.level),
                    current_streak: Some(streak.current_streak),
                })
            }
        }
    }

    pub async fn enroll(
        &self,
        user_id: &str,
        course_id: Option<String>,
    ) -> Result<EnrollResponse, ApiError> {
        let course_id =
            required_id(course_id).ok_or_else(|| ApiError::bad_request("Missing courseId"))?;

        if self.repository.find_course_by_id(&course_id).await?.is_none() {
            return Err(ApiError::not_found("Course not found"));
        }

        let already = EnrollResponse {
            enrolled: true,
            already_enrolled: true,
        };

        if self
            .repository
            .find_enrollment(user_id, &course_id)
            .await?
            .is_some()
        {
            ENROLLMENTS_TOTAL.with_label_values(&["already_enrolled"]).inc();
            return Ok(already);
        }

        match self
            .repository
            .insert_enrollment(&CourseEnrollment::new(user_id, &course_id))
            .await
        {
            Ok(()) => {
                ENROLLMENTS_TOTAL.with_label_values(&["enrolled"]).inc();
                tracing::info!("User {} enrolled in course {}", user_id, course_id);
                Ok(EnrollResponse {
                    enrolled: true,
                    already_enrolled: false,
                })
            }
            Err(RepositoryError::Duplicate(_)) => {
                ENROLLMENTS_TOTAL.with_label_values(&["already_enrolled"]).inc();
                Ok(already)
            }
            Err(err) => {
                ENROLLMENTS_TOTAL.with_label_values(&["error"]).inc();
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::OnboardingRequest;
    use crate::models::{
        AuthUser, Course, CourseModule, CourseStatus, Lesson, Profile, Streak, Subject,
        UserProgress,
    };
    use crate::repository::{InMemoryLearnRepository, RepositoryResult};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashSet;

    /// Reads like an empty store, but every insert loses the unique-index
    /// race to a request that got there first.
    struct LosingRace(InMemoryLearnRepository);

    #[async_trait]
    impl LearnRepository for LosingRace {
        async fn ping(&self) -> RepositoryResult<()> {
            self.0.ping().await
        }
        async fn list_subjects(&self) -> RepositoryResult<Vec<Subject>> {
            self.0.list_subjects().await
        }
        async fn list_published_courses(&self) -> RepositoryResult<Vec<Course>> {
            self.0.list_published_courses().await
        }
        async fn find_course_by_id(&self, course_id: &str) -> RepositoryResult<Option<Course>> {
            self.0.find_course_by_id(course_id).await
        }
        async fn find_course_by_slug(&self, slug: &str) -> RepositoryResult<Option<Course>> {
            self.0.find_course_by_slug(slug).await
        }
        async fn find_subject_by_id(&self, subject_id: &str) -> RepositoryResult<Option<Subject>> {
            self.0.find_subject_by_id(subject_id).await
        }
        async fn list_modules(&self, course_ids: &[String]) -> RepositoryResult<Vec<CourseModule>> {
            self.0.list_modules(course_ids).await
        }
        async fn find_module_by_id(
            &self,
            module_id: &str,
        ) -> RepositoryResult<Option<CourseModule>> {
            self.0.find_module_by_id(module_id).await
        }
        async fn list_lessons(&self, module_ids: &[String]) -> RepositoryResult<Vec<Lesson>> {
            self.0.list_lessons(module_ids).await
        }
        async fn find_lesson_by_id(&self, lesson_id: &str) -> RepositoryResult<Option<Lesson>> {
            self.0.find_lesson_by_id(lesson_id).await
        }
        async fn find_lesson_by_slug(&self, slug: &str) -> RepositoryResult<Option<Lesson>> {
            self.0.find_lesson_by_slug(slug).await
        }
        async fn find_profile(&self, user_id: &str) -> RepositoryResult<Option<Profile>> {
            self.0.find_profile(user_id).await
        }
        async fn ensure_profile(&self, user: &AuthUser) -> RepositoryResult<Profile> {
            self.0.ensure_profile(user).await
        }
        async fn save_onboarding(
            &self,
            user_id: &str,
            request: &OnboardingRequest,
        ) -> RepositoryResult<Option<Profile>> {
            self.0.save_onboarding(user_id, request).await
        }
        async fn find_streak(&self, user_id: &str) -> RepositoryResult<Option<Streak>> {
            self.0.find_streak(user_id).await
        }
        async fn find_progress(
            &self,
            user_id: &str,
            lesson_id: &str,
        ) -> RepositoryResult<Option<UserProgress>> {
            self.0.find_progress(user_id, lesson_id).await
        }
        async fn completed_lesson_ids(&self, user_id: &str) -> RepositoryResult<HashSet<String>> {
            self.0.completed_lesson_ids(user_id).await
        }
        async fn record_completion(
            &self,
            _completion: &LessonCompletion,
        ) -> RepositoryResult<CompletionOutcome> {
            Err(RepositoryError::Duplicate("user_progress user_id_lesson_id".into()))
        }
        async fn find_enrollment(
            &self,
            _user_id: &str,
            _course_id: &str,
        ) -> RepositoryResult<Option<CourseEnrollment>> {
            Ok(None)
        }
        async fn insert_enrollment(&self, _enrollment: &CourseEnrollment) -> RepositoryResult<()> {
            Err(RepositoryError::Duplicate("course_enrollments user_id_course_id".into()))
        }
        async fn list_enrollments(&self, user_id: &str) -> RepositoryResult<Vec<CourseEnrollment>> {
            self.0.list_enrollments(user_id).await
        }
    }

    async fn seeded() -> InMemoryLearnRepository {
        let repo = InMemoryLearnRepository::new();
        repo.insert_course(Course {
            id: "c1".into(),
            subject_id: None,
            slug: "intro".into(),
            title: "Intro".into(),
            description: None,
            status: CourseStatus::Published,
            is_premium: false,
            level_tag: None,
            estimated_hours: None,
            order_index: 0,
        })
        .await;
        repo.insert_module(CourseModule {
            id: "m1".into(),
            course_id: "c1".into(),
            title: "Basics".into(),
            order: 0,
        })
        .await;
        repo.insert_lesson(Lesson {
            id: "l1".into(),
            module_id: "m1".into(),
            slug: "first-light".into(),
            title: "First light".into(),
            content_type: None,
            content_mdx: None,
            xp_reward: None,
            difficulty_level: None,
            order_index: 0,
        })
        .await;
        repo
    }

    #[test]
    fn blank_ids_are_missing() {
        assert_eq!(required_id(None), None);
        assert_eq!(required_id(Some("   ".into())), None);
        assert_eq!(required_id(Some(" l1 ".into())), Some("l1".into()));
    }

    #[tokio::test]
    async fn default_reward_and_first_streak_day() {
        let service = ProgressService::new(Arc::new(seeded().await));
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let response = service
            .complete_lesson("u1", Some("l1".into()), now)
            .await
            .unwrap();
        assert_eq!(response.xp_earned, 50);
        assert_eq!(response.new_total, Some(50));
        assert_eq!(response.new_level, Some(1));
        assert_eq!(response.current_streak, Some(1));

        let again = service
            .complete_lesson("u1", Some("l1".into()), now)
            .await
            .unwrap();
        assert_eq!(again, CompleteLessonResponse::already_done());
    }

    #[tokio::test]
    async fn missing_and_unknown_ids() {
        let service = ProgressService::new(Arc::new(seeded().await));

        let err = service.complete_lesson("u1", None, Utc::now()).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing lessonId");

        let err = service
            .complete_lesson("u1", Some("nope".into()), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Lesson not found");

        let err = service.enroll("u1", Some("".into())).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing courseId");

        let err = service.enroll("u1", Some("nope".into())).await.unwrap_err();
        assert_eq!(err.to_string(), "Course not found");
    }

    #[tokio::test]
    async fn enroll_is_idempotent() {
        let service = ProgressService::new(Arc::new(seeded().await));

        let first = service.enroll("u1", Some("c1".into())).await.unwrap();
        assert!(first.enrolled && !first.already_enrolled);

        let second = service.enroll("u1", Some("c1".into())).await.unwrap();
        assert!(second.enrolled && second.already_enrolled);
    }

    #[tokio::test]
    async fn duplicate_key_on_insert_is_idempotent_success() {
        let service = ProgressService::new(Arc::new(LosingRace(seeded().await)));

        let completed = service
            .complete_lesson("u1", Some("l1".into()), Utc::now())
            .await
            .unwrap();
        assert_eq!(completed, CompleteLessonResponse::already_done());

        let enrolled = service.enroll("u1", Some("c1".into())).await.unwrap();
        assert_eq!(
            enrolled,
            EnrollResponse {
                enrolled: true,
                already_enrolled: true,
            }
        );
    }
}
