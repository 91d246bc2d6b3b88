use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::ApiError,
    extractors::{AppJson, LenientJson, MaybeUser},
    models::{
        profile::OnboardingRequest,
        progress::{CompleteLessonRequest, EnrollRequest},
        AuthUser,
    },
    services::{
        catalog_service::CatalogService, profile_service::ProfileService,
        progress_service::ProgressService, AppState,
    },
};

/// POST /api/learn/complete - mark a lesson completed and award XP
pub async fn complete_lesson(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    LenientJson(req): LenientJson<CompleteLessonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ProgressService::new(state.repository.clone());
    let response = service
        .complete_lesson(&user.id, req.lesson_id, Utc::now())
        .await?;
    Ok(Json(response))
}

/// POST /api/learn/enroll - enroll in a course (idempotent)
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    LenientJson(req): LenientJson<EnrollRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ProgressService::new(state.repository.clone());
    let response = service.enroll(&user.id, req.course_id).await?;
    Ok(Json(response))
}

/// GET /api/learn/catalog
pub async fn catalog(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
) -> Result<impl IntoResponse, ApiError> {
    let service = CatalogService::new(state.repository.clone());
    Ok(Json(service.catalog(user.id()).await?))
}

/// GET /api/learn/courses/{slug}
pub async fn course_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    user: MaybeUser,
) -> Result<impl IntoResponse, ApiError> {
    let service = CatalogService::new(state.repository.clone());
    Ok(Json(service.course_detail(&slug, user.id()).await?))
}

/// GET /api/learn/lessons/{slug}
pub async fn lesson_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    user: MaybeUser,
) -> Result<impl IntoResponse, ApiError> {
    let service = CatalogService::new(state.repository.clone());
    Ok(Json(service.lesson_detail(&slug, user.id()).await?))
}

/// GET /api/learn/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ProfileService::new(state.repository.clone());
    Ok(Json(service.dashboard(&user).await?))
}

/// POST /api/learn/onboarding
pub async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<OnboardingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ProfileService::new(state.repository.clone());
    Ok(Json(service.complete_onboarding(&user, req).await?))
}

/// GET /api/learn/profile
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ProfileService::new(state.repository.clone());
    Ok(Json(service.profile(&user).await?))
}
