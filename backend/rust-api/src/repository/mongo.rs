use std::collections::HashSet;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Document},
    options::{FindOptions, IndexOptions, ReturnDocument},
    ClientSession, Collection, Database, IndexModel,
};

use super::{LearnRepository, RepositoryError, RepositoryResult};
use crate::metrics::track_db_operation;
use crate::models::{
    profile::OnboardingRequest, AuthUser, CompletionOutcome, Course, CourseEnrollment,
    CourseModule, CourseStatus, Lesson, LessonCompletion, Profile, ProgressStatus, Streak,
    Subject, UserProgress,
};
use crate::utils::time::chrono_to_bson;

const SUBJECTS: &str = "subjects";
const COURSES: &str = "courses";
const MODULES: &str = "modules";
const LESSONS: &str = "lessons";
const PROFILES: &str = "profiles";
const STREAKS: &str = "streaks";
const USER_PROGRESS: &str = "user_progress";
const COURSE_ENROLLMENTS: &str = "course_enrollments";

#[derive(Clone)]
pub struct MongoLearnRepository {
    db: Database,
}

impl MongoLearnRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates the unique indexes the progress and enrollment writes rely on.
    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.enrollments()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "course_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
        self.progress()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "lesson_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
        self.courses()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "slug": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
        self.lessons()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "slug": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    fn subjects(&self) -> Collection<Subject> {
        self.db.collection(SUBJECTS)
    }

    fn courses(&self) -> Collection<Course> {
        self.db.collection(COURSES)
    }

    fn modules(&self) -> Collection<CourseModule> {
        self.db.collection(MODULES)
    }

    fn lessons(&self) -> Collection<Lesson> {
        self.db.collection(LESSONS)
    }

    fn profiles(&self) -> Collection<Profile> {
        self.db.collection(PROFILES)
    }

    fn streaks(&self) -> Collection<Streak> {
        self.db.collection(STREAKS)
    }

    fn progress(&self) -> Collection<UserProgress> {
        self.db.collection(USER_PROGRESS)
    }

    fn enrollments(&self) -> Collection<CourseEnrollment> {
        self.db.collection(COURSE_ENROLLMENTS)
    }

    async fn find_sorted<T>(
        collection: Collection<T>,
        filter: Document,
        sort: Document,
    ) -> RepositoryResult<Vec<T>>
    where
        T: serde::de::DeserializeOwned + Send + Sync,
    {
        let options = FindOptions::builder().sort(sort).build();
        let cursor = collection.find(filter).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Body of the completion transaction. Every operation runs on `session`.
    async fn complete_in_session(
        &self,
        session: &mut ClientSession,
        completion: &LessonCompletion,
    ) -> RepositoryResult<CompletionOutcome> {
        let user_id = completion.user_id.as_str();
        let progress = self.progress();

        let existing = progress
            .find_one(doc! { "user_id": user_id, "lesson_id": completion.lesson_id.as_str() })
            .session(&mut *session)
            .await?;

        match existing {
            Some(row) if row.is_completed() => return Ok(CompletionOutcome::AlreadyCompleted),
            Some(row) => {
                progress
                    .update_one(
                        doc! { "_id": row.id.as_str() },
                        doc! { "$set": {
                            "status": ProgressStatus::Completed.as_str(),
                            "completedAt": chrono_to_bson(completion.completed_at),
                            "xp_earned": completion.xp_reward,
                        }},
                    )
                    .session(&mut *session)
                    .await?;
            }
            None => {
                let row = UserProgress {
                    id: uuid::Uuid::new_v4().to_string(),
                    user_id: completion.user_id.clone(),
                    lesson_id: completion.lesson_id.clone(),
                    status: ProgressStatus::Completed,
                    completed_at: Some(completion.completed_at),
                    xp_earned: completion.xp_reward,
                };
                progress.insert_one(&row).session(&mut *session).await?;
            }
        }

        let profiles = self.profiles();
        let mut profile = profiles
            .find_one(doc! { "_id": user_id })
            .session(&mut *session)
            .await?
            .unwrap_or_else(|| Profile::new(user_id, None, None));
        profile.award_xp(completion.xp_reward);
        profiles
            .replace_one(doc! { "_id": user_id }, &profile)
            .upsert(true)
            .session(&mut *session)
            .await?;

        let streaks = self.streaks();
        let mut streak = streaks
            .find_one(doc! { "_id": user_id })
            .session(&mut *session)
            .await?
            .unwrap_or_else(|| Streak::new(user_id));
        streak.touch(completion.today);
        streaks
            .replace_one(doc! { "_id": user_id }, &streak)
            .upsert(true)
            .session(&mut *session)
            .await?;

        Ok(CompletionOutcome::Completed { profile, streak })
    }
}

#[async_trait]
impl LearnRepository for MongoLearnRepository {
    async fn ping(&self) -> RepositoryResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn list_subjects(&self) -> RepositoryResult<Vec<Subject>> {
        Self::find_sorted(self.subjects(), doc! {}, doc! { "order": 1 }).await
    }

    async fn list_published_courses(&self) -> RepositoryResult<Vec<Course>> {
        Self::find_sorted(
            self.courses(),
            doc! { "status": CourseStatus::Published.as_str() },
            doc! { "order_index": 1 },
        )
        .await
    }

    async fn find_course_by_id(&self, course_id: &str) -> RepositoryResult<Option<Course>> {
        Ok(self.courses().find_one(doc! { "_id": course_id }).await?)
    }

    async fn find_course_by_slug(&self, slug: &str) -> RepositoryResult<Option<Course>> {
        Ok(self.courses().find_one(doc! { "slug": slug }).await?)
    }

    async fn find_subject_by_id(&self, subject_id: &str) -> RepositoryResult<Option<Subject>> {
        Ok(self.subjects().find_one(doc! { "_id": subject_id }).await?)
    }

    async fn list_modules(&self, course_ids: &[String]) -> RepositoryResult<Vec<CourseModule>> {
        if course_ids.is_empty() {
            return Ok(Vec::new());
        }
        Self::find_sorted(
            self.modules(),
            doc! { "course_id": { "$in": course_ids } },
            doc! { "order": 1 },
        )
        .await
    }

    async fn find_module_by_id(&self, module_id: &str) -> RepositoryResult<Option<CourseModule>> {
        Ok(self.modules().find_one(doc! { "_id": module_id }).await?)
    }

    async fn list_lessons(&self, module_ids: &[String]) -> RepositoryResult<Vec<Lesson>> {
        if module_ids.is_empty() {
            return Ok(Vec::new());
        }
        Self::find_sorted(
            self.lessons(),
            doc! { "module_id": { "$in": module_ids } },
            doc! { "order_index": 1 },
        )
        .await
    }

    async fn find_lesson_by_id(&self, lesson_id: &str) -> RepositoryResult<Option<Lesson>> {
        track_db_operation("find_one", LESSONS, async {
            Ok(self.lessons().find_one(doc! { "_id": lesson_id }).await?)
        })
        .await
    }

    async fn find_lesson_by_slug(&self, slug: &str) -> RepositoryResult<Option<Lesson>> {
        Ok(self.lessons().find_one(doc! { "slug": slug }).await?)
    }

    async fn find_profile(&self, user_id: &str) -> RepositoryResult<Option<Profile>> {
        Ok(self.profiles().find_one(doc! { "_id": user_id }).await?)
    }

    async fn ensure_profile(&self, user: &AuthUser) -> RepositoryResult<Profile> {
        track_db_operation("upsert", PROFILES, async {
            if let Some(profile) = self.find_profile(&user.id).await? {
                return Ok(profile);
            }
            let profile = Profile::new(&user.id, user.display_name.clone(), user.email.clone());
            match self.profiles().insert_one(&profile).await {
                Ok(_) => Ok(profile),
                // Another callback created it first
                Err(err) => match RepositoryError::from(err) {
                    RepositoryError::Duplicate(_) => self
                        .find_profile(&user.id)
                        .await?
                        .ok_or_else(|| RepositoryError::Database("profile vanished".into())),
                    other => Err(other),
                },
            }
        })
        .await
    }

    async fn save_onboarding(
        &self,
        user_id: &str,
        request: &OnboardingRequest,
    ) -> RepositoryResult<Option<Profile>> {
        let mut set = doc! {
            "tier_level": to_bson(&request.tier_level)?,
            "subject_interests": &request.subject_interests,
            "onboarding_complete": true,
        };
        if let Some(name) = &request.display_name {
            set.insert("display_name", name.as_str());
        }

        Ok(self
            .profiles()
            .find_one_and_update(doc! { "_id": user_id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn find_streak(&self, user_id: &str) -> RepositoryResult<Option<Streak>> {
        Ok(self.streaks().find_one(doc! { "_id": user_id }).await?)
    }

    async fn find_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> RepositoryResult<Option<UserProgress>> {
        Ok(self
            .progress()
            .find_one(doc! { "user_id": user_id, "lesson_id": lesson_id })
            .await?)
    }

    async fn completed_lesson_ids(&self, user_id: &str) -> RepositoryResult<HashSet<String>> {
        let rows: Vec<UserProgress> = self
            .progress()
            .find(doc! { "user_id": user_id, "status": ProgressStatus::Completed.as_str() })
            .await?
            .try_collect()
            .await?;
        Ok(rows.into_iter().map(|row| row.lesson_id).collect())
    }

    async fn record_completion(
        &self,
        completion: &LessonCompletion,
    ) -> RepositoryResult<CompletionOutcome> {
        track_db_operation("transaction", USER_PROGRESS, async {
            let mut session = self.db.client().start_session().await?;
            session.start_transaction().await?;

            let result = match self.complete_in_session(&mut session, completion).await {
                Ok(CompletionOutcome::AlreadyCompleted) => {
                    session.abort_transaction().await?;
                    Ok(CompletionOutcome::AlreadyCompleted)
                }
                Ok(outcome) => session
                    .commit_transaction()
                    .await
                    .map(|_| outcome)
                    .map_err(RepositoryError::from),
                Err(err) => {
                    if let Err(abort_err) = session.abort_transaction().await {
                        tracing::warn!("Failed to abort completion transaction: {}", abort_err);
                    }
                    Err(err)
                }
            };

            match result {
                Err(RepositoryError::WriteConflict(message)) => {
                    let existing = self
                        .find_progress(&completion.user_id, &completion.lesson_id)
                        .await?;
                    after_write_conflict(existing.as_ref(), message)
                }
                other => other,
            }
        })
        .await
    }

    async fn find_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> RepositoryResult<Option<CourseEnrollment>> {
        Ok(self
            .enrollments()
            .find_one(doc! { "user_id": user_id, "course_id": course_id })
            .await?)
    }

    async fn insert_enrollment(&self, enrollment: &CourseEnrollment) -> RepositoryResult<()> {
        track_db_operation("insert_one", COURSE_ENROLLMENTS, async {
            self.enrollments().insert_one(enrollment).await?;
            Ok(())
        })
        .await
    }

    async fn list_enrollments(&self, user_id: &str) -> RepositoryResult<Vec<CourseEnrollment>> {
        Self::find_sorted(
            self.enrollments(),
            doc! { "user_id": user_id },
            doc! { "enrolledAt": -1 },
        )
        .await
    }
}

/// Settles a completion that lost a write conflict on its progress row. When
/// the other transaction has already committed the completion, this request
/// is a repeat; otherwise the conflict is reported.
fn after_write_conflict(
    existing: Option<&UserProgress>,
    message: String,
) -> RepositoryResult<CompletionOutcome> {
    match existing {
        Some(row) if row.is_completed() => {
            tracing::debug!(
                "Completion of {} by {} lost a write conflict to a committed one",
                row.lesson_id,
                row.user_id
            );
            Ok(CompletionOutcome::AlreadyCompleted)
        }
        _ => Err(RepositoryError::WriteConflict(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn progress(status: ProgressStatus) -> UserProgress {
        UserProgress {
            id: "p1".into(),
            user_id: "u1".into(),
            lesson_id: "l1".into(),
            status,
            completed_at: Some(Utc::now()),
            xp_earned: 50,
        }
    }

    #[test]
    fn conflict_with_committed_completion_is_already_done() {
        let row = progress(ProgressStatus::Completed);
        let outcome = after_write_conflict(Some(&row), "WriteConflict".into()).unwrap();
        assert!(matches!(outcome, CompletionOutcome::AlreadyCompleted));
    }

    #[test]
    fn conflict_without_completed_row_is_reported() {
        let err = after_write_conflict(None, "WriteConflict".into()).unwrap_err();
        assert!(matches!(err, RepositoryError::WriteConflict(_)));

        let row = progress(ProgressStatus::NotStarted);
        let err = after_write_conflict(Some(&row), "WriteConflict".into()).unwrap_err();
        assert_eq!(err.to_string(), "Write conflict: WriteConflict");
    }
}
