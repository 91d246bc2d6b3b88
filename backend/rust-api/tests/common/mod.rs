#![allow(dead_code)]

use astrolearn_api::{
    config::Config,
    create_router,
    models::{
        AuthUser, Course, CourseModule, CourseStatus, Lesson, Profile, Streak, Subject,
    },
    repository::InMemoryLearnRepository,
    services::{
        auth_service::StaticAuthGateway,
        session_service::{MemorySessionStore, SessionStore},
        AppState,
    },
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

pub const VALID_CODE: &str = "valid-code";

pub struct TestApp {
    pub router: Router,
    pub repo: InMemoryLearnRepository,
    pub sessions: MemorySessionStore,
}

impl TestApp {
    /// Creates a session for `user_id` and returns the `Cookie` header value.
    pub async fn login(&self, user_id: &str) -> String {
        let session = self
            .sessions
            .create(AuthUser {
                id: user_id.to_string(),
                email: Some(format!("{}@example.com", user_id)),
                display_name: None,
            })
            .await
            .expect("session");
        format!("session_id={}", session.id)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends the request and decodes the JSON body.
    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.send(request).await;
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                panic!(
                    "non-JSON body for status {}: {}",
                    status,
                    String::from_utf8_lossy(&body)
                )
            })
        };
        (status, json)
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn create_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = Config::for_memory();
    let repo = InMemoryLearnRepository::new();
    let sessions = MemorySessionStore::new(config.session_ttl_seconds);
    let auth = StaticAuthGateway::new().with_code(
        VALID_CODE,
        AuthUser {
            id: "user-oauth".to_string(),
            email: Some("vera@example.com".to_string()),
            display_name: Some("Vera Rubin".to_string()),
        },
    );

    seed_test_data(&repo).await;

    let app_state = Arc::new(AppState::new(
        config,
        Arc::new(repo.clone()),
        Arc::new(sessions.clone()),
        Arc::new(auth),
    ));

    TestApp {
        router: create_router(app_state),
        repo,
        sessions,
    }
}

fn subject(id: &str, slug: &str, title: &str, order: i32) -> Subject {
    Subject {
        id: id.to_string(),
        slug: slug.to_string(),
        title: title.to_string(),
        description: None,
        color: Some("#58a6ff".to_string()),
        icon_name: None,
        order,
    }
}

fn course(
    id: &str,
    subject_id: Option<&str>,
    slug: &str,
    is_premium: bool,
    status: CourseStatus,
    order_index: i32,
) -> Course {
    Course {
        id: id.to_string(),
        subject_id: subject_id.map(str::to_string),
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        description: None,
        status,
        is_premium,
        level_tag: None,
        estimated_hours: Some(2.5),
        order_index,
    }
}

fn module(id: &str, course_id: &str, title: &str, order: i32) -> CourseModule {
    CourseModule {
        id: id.to_string(),
        course_id: course_id.to_string(),
        title: title.to_string(),
        order,
    }
}

fn lesson(id: &str, module_id: &str, slug: &str, xp: Option<i64>, order_index: i32) -> Lesson {
    Lesson {
        id: id.to_string(),
        module_id: module_id.to_string(),
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        content_type: Some("mdx".to_string()),
        content_mdx: Some(format!("# {}", slug)),
        xp_reward: xp,
        difficulty_level: None,
        order_index,
    }
}

/// Catalog:
/// - astronomy: observing-basics (free; Tools: telescopes, binoculars;
///   Methods: transit-method), exoplanets (premium; radial-velocity)
/// - astrology: empty
/// - sky-myths without a subject, old-notes as a draft
///
/// Users: `user-ada` (480 XP, active yesterday, 3-day streak),
/// `user-premium` (premium), anyone else has no profile yet.
async fn seed_test_data(repo: &InMemoryLearnRepository) {
    repo.insert_subject(subject("s-astrology", "astrology", "Astrology", 2))
        .await;
    repo.insert_subject(subject("s-astro", "astronomy", "Astronomy", 1))
        .await;

    repo.insert_course(course(
        "c-exo",
        Some("s-astro"),
        "exoplanets",
        true,
        CourseStatus::Published,
        2,
    ))
    .await;
    repo.insert_course(course(
        "c-observing",
        Some("s-astro"),
        "observing-basics",
        false,
        CourseStatus::Published,
        1,
    ))
    .await;
    repo.insert_course(course(
        "c-myths",
        None,
        "sky-myths",
        false,
        CourseStatus::Published,
        3,
    ))
    .await;
    repo.insert_course(course(
        "c-draft",
        Some("s-astro"),
        "old-notes",
        false,
        CourseStatus::Draft,
        4,
    ))
    .await;

    repo.insert_module(module("m-methods", "c-observing", "Methods", 2))
        .await;
    repo.insert_module(module("m-tools", "c-observing", "Tools", 1))
        .await;
    repo.insert_module(module("m-exo", "c-exo", "Detection", 1)).await;

    repo.insert_lesson(lesson("l-telescopes", "m-tools", "telescopes", None, 1))
        .await;
    repo.insert_lesson(lesson("l-binoculars", "m-tools", "binoculars", Some(30), 2))
        .await;
    repo.insert_lesson(lesson(
        "l-transit",
        "m-methods",
        "transit-method",
        Some(50),
        1,
    ))
    .await;
    repo.insert_lesson(lesson(
        "l-radial",
        "m-exo",
        "radial-velocity",
        Some(75),
        1,
    ))
    .await;

    let mut ada = Profile::new(
        "user-ada",
        Some("Ada".to_string()),
        Some("ada@example.com".to_string()),
    );
    ada.xp = 480;
    ada.level = 1;
    ada.onboarding_complete = true;
    repo.insert_profile(ada).await;

    let mut streak = Streak::new("user-ada");
    streak.current_streak = 3;
    streak.longest_streak = 5;
    streak.last_active_date = Some(Utc::now().date_naive() - Duration::days(1));
    repo.insert_streak(streak).await;

    let mut premium = Profile::new("user-premium", None, None);
    premium.is_premium = true;
    premium.onboarding_complete = true;
    repo.insert_profile(premium).await;
}
