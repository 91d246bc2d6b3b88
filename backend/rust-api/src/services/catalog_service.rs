//! Read side of the content hierarchy: subjects, courses, modules and lessons.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::error::ApiError;
use crate::models::{Course, CourseModule, CourseStatus, Lesson, Subject};
use crate::repository::LearnRepository;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub id: String,
    pub slug: String,
    pub title: String,
}

impl From<&Subject> for SubjectRef {
    fn from(subject: &Subject) -> Self {
        Self {
            id: subject.id.clone(),
            slug: subject.slug.clone(),
            title: subject.title.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub status: CourseStatus,
    pub is_premium: bool,
    pub level_tag: Option<String>,
    pub estimated_hours: Option<f64>,
    /// Premium course and the viewer is not premium.
    pub locked: bool,
}

impl CourseSummary {
    fn new(course: &Course, viewer_premium: bool) -> Self {
        Self {
            id: course.id.clone(),
            slug: course.slug.clone(),
            title: course.title.clone(),
            description: course.description.clone(),
            status: course.status,
            is_premium: course.is_premium,
            level_tag: course.level_tag.clone(),
            estimated_hours: course.estimated_hours,
            locked: course.is_premium && !viewer_premium,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSubject {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon_name: Option<String>,
    pub courses: Vec<CourseSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub subjects: Vec<CatalogSubject>,
    /// Published courses without a known subject.
    pub other_courses: Vec<CourseSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content_type: Option<String>,
    pub difficulty_level: Option<String>,
    pub xp_reward: i64,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleView {
    pub id: String,
    pub title: String,
    pub order: i32,
    pub lessons: Vec<LessonSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    pub course: CourseSummary,
    pub subject: Option<SubjectRef>,
    pub modules: Vec<ModuleView>,
    pub total_xp: i64,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub enrolled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content_type: Option<String>,
    pub content_mdx: Option<String>,
    pub difficulty_level: Option<String>,
    pub xp_reward: i64,
    pub order_index: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    pub subject: Option<SubjectRef>,
    pub course: SubjectRef,
    pub module_title: String,
    /// 1-based position of the module inside the course.
    pub module_number: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDetail {
    pub lesson: LessonView,
    pub breadcrumb: Breadcrumb,
    pub next_lesson: Option<SubjectRef>,
    pub completed: bool,
}

/// Rounded completion percentage; 0 for an empty course.
pub fn completion_percent(completed: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as i64
}

pub struct CatalogService {
    repository: Arc<dyn LearnRepository>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn LearnRepository>) -> Self {
        Self { repository }
    }

    async fn viewer_is_premium(&self, user_id: Option<&str>) -> Result<bool, ApiError> {
        match user_id {
            Some(id) => Ok(self
                .repository
                .find_profile(id)
                .await?
                .map(|p| p.is_premium)
                .unwrap_or(false)),
            None => Ok(false),
        }
    }

    async fn completed_ids(&self, user_id: Option<&str>) -> Result<HashSet<String>, ApiError> {
        match user_id {
            Some(id) => Ok(self.repository.completed_lesson_ids(id).await?),
            None => Ok(HashSet::new()),
        }
    }

    pub async fn catalog(&self, user_id: Option<&str>) -> Result<CatalogResponse, ApiError> {
        let premium = self.viewer_is_premium(user_id).await?;
        let subjects = self.repository.list_subjects().await?;
        let courses = self.repository.list_published_courses().await?;

        let known: HashSet<&str> = subjects.iter().map(|s| s.id.as_str()).collect();
        let mut by_subject: HashMap<&str, Vec<CourseSummary>> = HashMap::new();
        let mut other_courses = Vec::new();

        for course in &courses {
            let summary = CourseSummary::new(course, premium);
            match course.subject_id.as_deref() {
                Some(sid) if known.contains(sid) => {
                    by_subject.entry(sid).or_default().push(summary)
                }
                _ => other_courses.push(summary),
            }
        }

        let subjects = subjects
            .iter()
            .map(|subject| CatalogSubject {
                id: subject.id.clone(),
                slug: subject.slug.clone(),
                title: subject.title.clone(),
                description: subject.description.clone(),
                color: subject.color.clone(),
                icon_name: subject.icon_name.clone(),
                courses: by_subject.remove(subject.id.as_str()).unwrap_or_default(),
            })
            .collect();

        Ok(CatalogResponse {
            subjects,
            other_courses,
        })
    }

    pub async fn course_detail(
        &self,
        slug: &str,
        user_id: Option<&str>,
    ) -> Result<CourseDetail, ApiError> {
        let course = self
            .repository
            .find_course_by_slug(slug)
            .await?
            .filter(|c| c.status != CourseStatus::Draft)
            .ok_or_else(|| ApiError::not_found("Course not found"))?;

        let subject = match course.subject_id.as_deref() {
            Some(sid) => self.repository.find_subject_by_id(sid).await?,
            None => None,
        };

        let premium = self.viewer_is_premium(user_id).await?;
        let completed = self.completed_ids(user_id).await?;
        let enrolled = match user_id {
            Some(uid) => self
                .repository
                .find_enrollment(uid, &course.id)
                .await?
                .is_some(),
            None => false,
        };

        let modules = self
            .repository
            .list_modules(std::slice::from_ref(&course.id))
            .await?;
        let module_ids: Vec<String> = modules.iter().map(|m| m.id.clone()).collect();
        let lessons = self.repository.list_lessons(&module_ids).await?;

        let total_xp = lessons.iter().map(Lesson::reward).sum();
        let total_lessons = lessons.len();
        let completed_lessons = lessons
            .iter()
            .filter(|l| completed.contains(&l.id))
            .count();

        let modules = modules
            .into_iter()
            .map(|module| ModuleView {
                lessons: lessons
                    .iter()
                    .filter(|l| l.module_id == module.id)
                    .map(|l| LessonSummary {
                        id: l.id.clone(),
                        slug: l.slug.clone(),
                        title: l.title.clone(),
                        content_type: l.content_type.clone(),
                        difficulty_level: l.difficulty_level.clone(),
                        xp_reward: l.reward(),
                        completed: completed.contains(&l.id),
                    })
                    .collect(),
                id: module.id,
                title: module.title,
                order: module.order,
            })
            .collect();

        Ok(CourseDetail {
            course: CourseSummary::new(&course, premium),
            subject: subject.as_ref().map(SubjectRef::from),
            modules,
            total_xp,
            total_lessons,
            completed_lessons,
            enrolled,
        })
    }

    pub async fn lesson_detail(
        &self,
        slug: &str,
        user_id: Option<&str>,
    ) -> Result<LessonDetail, ApiError> {
        let not_found = || ApiError::not_found("Lesson not found");

        let lesson = self
            .repository
            .find_lesson_by_slug(slug)
            .await?
            .ok_or_else(not_found)?;
        let module = self
            .repository
            .find_module_by_id(&lesson.module_id)
            .await?
            .ok_or_else(not_found)?;
        let course = self
            .repository
            .find_course_by_id(&module.course_id)
            .await?
            .ok_or_else(not_found)?;

        if course.is_premium && !self.viewer_is_premium(user_id).await? {
            return Err(ApiError::forbidden("Premium course"));
        }

        let subject = match course.subject_id.as_deref() {
            Some(sid) => self.repository.find_subject_by_id(sid).await?,
            None => None,
        };

        let course_modules = self
            .repository
            .list_modules(std::slice::from_ref(&course.id))
            .await?;
        let module_number = module_position(&course_modules, &module.id);

        let siblings = self
            .repository
            .list_lessons(std::slice::from_ref(&module.id))
            .await?;
        let next_lesson = next_in_module(&siblings, &lesson).map(|next| SubjectRef {
            id: next.id.clone(),
            slug: next.slug.clone(),
            title: next.title.clone(),
        });

        let completed = match user_id {
            Some(uid) => self
                .repository
                .find_progress(uid, &lesson.id)
                .await?
                .map(|p| p.is_completed())
                .unwrap_or(false),
            None => false,
        };

        Ok(LessonDetail {
            breadcrumb: Breadcrumb {
                subject: subject.as_ref().map(SubjectRef::from),
                course: SubjectRef {
                    id: course.id.clone(),
                    slug: course.slug.clone(),
                    title: course.title.clone(),
                },
                module_title: module.title.clone(),
                module_number,
            },
            next_lesson,
            completed,
            lesson: LessonView {
                xp_reward: lesson.reward(),
                id: lesson.id,
                slug: lesson.slug,
                title: lesson.title,
                content_type: lesson.content_type,
                content_mdx: lesson.content_mdx,
                difficulty_level: lesson.difficulty_level,
                order_index: lesson.order_index,
            },
        })
    }
}

/// 1-based index of the module among the course's modules sorted by `order`.
fn module_position(modules: &[CourseModule], module_id: &str) -> usize {
    let mut sorted: Vec<&CourseModule> = modules.iter().collect();
    sorted.sort_by_key(|m| m.order);
    sorted
        .iter()
        .position(|m| m.id == module_id)
        .map(|i| i + 1)
        .unwrap_or(1)
}

/// Lesson with the smallest `order_index` greater than the current one.
fn next_in_module<'a>(siblings: &'a [Lesson], current: &Lesson) -> Option<&'a Lesson> {
    siblings
        .iter()
        .filter(|l| l.id != current.id && l.order_index > current.order_index)
        .min_by_key(|l| l.order_index)
}
