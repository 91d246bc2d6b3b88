//! Storage seam for the learn area.
//!
//! Handlers and services only see [`LearnRepository`]; production wires in
//! [`MongoLearnRepository`], tests and `storage = "memory"` use
//! [`InMemoryLearnRepository`].

use std::collections::HashSet;

use async_trait::async_trait;

use crate::models::{
    profile::OnboardingRequest, AuthUser, CompletionOutcome, Course, CourseEnrollment,
    CourseModule, Lesson, LessonCompletion, Profile, Streak, Subject, UserProgress,
};

pub mod memory;
pub mod mongo;

pub use memory::InMemoryLearnRepository;
pub use mongo::MongoLearnRepository;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A unique index rejected the write.
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// A concurrent transaction touched the same documents.
    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("{0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

const DUPLICATE_KEY_CODE: i32 = 11000;

impl From<mongodb::error::Error> for RepositoryError {
    fn from(err: mongodb::error::Error) -> Self {
        if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we)) =
            *err.kind
        {
            if we.code == DUPLICATE_KEY_CODE {
                return RepositoryError::Duplicate(we.message.clone());
            }
        }
        if err.contains_label(mongodb::error::TRANSIENT_TRANSACTION_ERROR) {
            return RepositoryError::WriteConflict(err.to_string());
        }
        RepositoryError::Database(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for RepositoryError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

#[async_trait]
pub trait LearnRepository: Send + Sync {
    async fn ping(&self) -> RepositoryResult<()>;

    // Catalog

    /// All subjects ordered by `order`.
    async fn list_subjects(&self) -> RepositoryResult<Vec<Subject>>;
    /// Published courses ordered by `order_index`.
    async fn list_published_courses(&self) -> RepositoryResult<Vec<Course>>;
    async fn find_course_by_id(&self, course_id: &str) -> RepositoryResult<Option<Course>>;
    async fn find_course_by_slug(&self, slug: &str) -> RepositoryResult<Option<Course>>;
    async fn find_subject_by_id(&self, subject_id: &str) -> RepositoryResult<Option<Subject>>;
    /// Modules of the given courses ordered by `order`.
    async fn list_modules(&self, course_ids: &[String]) -> RepositoryResult<Vec<CourseModule>>;
    async fn find_module_by_id(&self, module_id: &str) -> RepositoryResult<Option<CourseModule>>;
    /// Lessons of the given modules ordered by `order_index`.
    async fn list_lessons(&self, module_ids: &[String]) -> RepositoryResult<Vec<Lesson>>;
    async fn find_lesson_by_id(&self, lesson_id: &str) -> RepositoryResult<Option<Lesson>>;
    async fn find_lesson_by_slug(&self, slug: &str) -> RepositoryResult<Option<Lesson>>;

    // Profiles

    async fn find_profile(&self, user_id: &str) -> RepositoryResult<Option<Profile>>;
    /// Returns the user's profile, creating an empty one on first sign-in.
    async fn ensure_profile(&self, user: &AuthUser) -> RepositoryResult<Profile>;
    async fn save_onboarding(
        &self,
        user_id: &str,
        request: &OnboardingRequest,
    ) -> RepositoryResult<Option<Profile>>;
    async fn find_streak(&self, user_id: &str) -> RepositoryResult<Option<Streak>>;

    // Progress

    async fn find_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> RepositoryResult<Option<UserProgress>>;
    async fn completed_lesson_ids(&self, user_id: &str) -> RepositoryResult<HashSet<String>>;
    /// Marks the lesson completed, awards XP and touches the streak as one
    /// unit: either all three writes land or none do.
    async fn record_completion(
        &self,
        completion: &LessonCompletion,
    ) -> RepositoryResult<CompletionOutcome>;

    // Enrollments

    async fn find_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> RepositoryResult<Option<CourseEnrollment>>;
    /// Fails with [`RepositoryError::Duplicate`] if the pair already exists.
    async fn insert_enrollment(&self, enrollment: &CourseEnrollment) -> RepositoryResult<()>;
    /// Most recent first.
    async fn list_enrollments(&self, user_id: &str) -> RepositoryResult<Vec<CourseEnrollment>>;
}
