use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use validator::Validate;

use crate::error::ApiError;
use crate::models::profile::{OnboardingRequest, ProfileView};
use crate::models::{AuthUser, Course, CourseModule, Lesson, LevelProgress, Streak};
use crate::repository::LearnRepository;
use crate::services::catalog_service::completion_percent;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakView {
    pub current: i32,
    pub longest: i32,
    pub last_active_date: Option<NaiveDate>,
}

impl From<Option<Streak>> for StreakView {
    fn from(streak: Option<Streak>) -> Self {
        match streak {
            Some(s) => Self {
                current: s.current_streak,
                longest: s.longest_streak,
                last_active_date: s.last_active_date,
            },
            None => Self {
                current: 0,
                longest: 0,
                last_active_date: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub subject_slug: Option<String>,
    pub color: Option<String>,
    pub is_premium: bool,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub percent: i64,
    pub continue_href: String,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub profile: ProfileView,
    pub needs_onboarding: bool,
    pub level_progress: LevelProgress,
    pub streak: StreakView,
    pub courses: Vec<EnrolledCourse>,
}

/// Link to the first incomplete lesson, walking modules by `order` and
/// lessons by `order_index`; the course page once everything is done.
pub fn continue_href(
    subject_slug: Option<&str>,
    course: &Course,
    modules: &[&CourseModule],
    lessons: &[&Lesson],
    completed: &HashSet<String>,
) -> String {
    let subject = subject_slug.unwrap_or("course");

    let mut modules = modules.to_vec();
    modules.sort_by_key(|m| m.order);

    for (index, module) in modules.iter().enumerate() {
        let mut module_lessons: Vec<&Lesson> = lessons
            .iter()
            .copied()
            .filter(|l| l.module_id == module.id)
            .collect();
        module_lessons.sort_by_key(|l| l.order_index);

        if let Some(lesson) = module_lessons.iter().find(|l| !completed.contains(&l.id)) {
            return format!(
                "/learn/{}/{}/module-{}/{}",
                subject,
                course.slug,
                index + 1,
                lesson.slug
            );
        }
    }

    format!("/learn/{}/{}", subject, course.slug)
}

pub struct ProfileService {
    repository: Arc<dyn LearnRepository>,
}

impl ProfileService {
    pub fn new(repository: Arc<dyn LearnRepository>) -> Self {
        Self { repository }
    }

    pub async fn profile(&self, user: &AuthUser) -> Result<ProfileView, ApiError> {
        Ok(self.repository.ensure_profile(user).await?.into())
    }

    pub async fn complete_onboarding(
        &self,
        user: &AuthUser,
        request: OnboardingRequest,
    ) -> Result<ProfileView, ApiError> {
        request.validate()?;

        self.repository.ensure_profile(user).await?;
        let profile = self
            .repository
            .save_onboarding(&user.id, &request)
            .await?
            .ok_or_else(|| ApiError::not_found("Profile not found"))?;

        tracing::info!(
            "Onboarding completed: user={}, tier={:?}",
            user.id,
            request.tier_level
        );
        Ok(profile.into())
    }

    pub async fn dashboard(&self, user: &AuthUser) -> Result<DashboardResponse, ApiError> {
        let profile = self.repository.ensure_profile(user).await?;
        let streak = self.repository.find_streak(&user.id).await?;
        let enrollments = self.repository.list_enrollments(&user.id).await?;

        let mut courses_with_dates = Vec::with_capacity(enrollments.len());
        for enrollment in &enrollments {
            if let Some(course) = self
                .repository
                .find_course_by_id(&enrollment.course_id)
                .await?
            {
                courses_with_dates.push((course, enrollment.enrolled_at));
            }
        }

        let courses = if courses_with_dates.is_empty() {
            Vec::new()
        } else {
            self.enrolled_courses(&user.id, courses_with_dates).await?
        };

        Ok(DashboardResponse {
            needs_onboarding: !profile.onboarding_complete,
            level_progress: profile.level_progress(),
            profile: profile.into(),
            streak: streak.into(),
            courses,
        })
    }

    async fn enrolled_courses(
        &self,
        user_id: &str,
        courses: Vec<(Course, DateTime<Utc>)>,
    ) -> Result<Vec<EnrolledCourse>, ApiError> {
        let course_ids: Vec<String> = courses.iter().map(|(c, _)| c.id.clone()).collect();
        let modules = self.repository.list_modules(&course_ids).await?;
        let module_ids: Vec<String> = modules.iter().map(|m| m.id.clone()).collect();
        let lessons = self.repository.list_lessons(&module_ids).await?;
        let completed = self.repository.completed_lesson_ids(user_id).await?;

        let mut subjects = HashMap::new();
        for subject in self.repository.list_subjects().await? {
            subjects.insert(subject.id.clone(), subject);
        }

        let mut result = Vec::with_capacity(courses.len());
        for (course, enrolled_at) in courses {
            let course_modules: Vec<&CourseModule> =
                modules.iter().filter(|m| m.course_id == course.id).collect();
            let course_lessons: Vec<&Lesson> = lessons
                .iter()
                .filter(|l| course_modules.iter().any(|m| m.id == l.module_id))
                .collect();

            let total_lessons = course_lessons.len();
            let completed_lessons = course_lessons
                .iter()
                .filter(|l| completed.contains(&l.id))
                .count();

            let subject = course
                .subject_id
                .as_deref()
                .and_then(|sid| subjects.get(sid));
            let subject_slug = subject.map(|s| s.slug.clone());

            result.push(EnrolledCourse {
                continue_href: continue_href(
                    subject_slug.as_deref(),
                    &course,
                    &course_modules,
                    &course_lessons,
                    &completed,
                ),
                percent: completion_percent(completed_lessons, total_lessons),
                color: subject.and_then(|s| s.color.clone()),
                subject_slug,
                is_premium: course.is_premium,
                total_lessons,
                completed_lessons,
                enrolled_at,
                id: course.id,
                slug: course.slug,
                title: course.title,
            });
        }

        Ok(result)
    }
}
