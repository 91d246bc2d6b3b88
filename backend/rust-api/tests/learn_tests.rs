use astrolearn_api::repository::LearnRepository;
use axum::http::StatusCode;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

mod common;

use common::{post_json, create_test_app};

#[tokio::test]
async fn test_complete_lesson_awards_xp_and_extends_streak() {
    let app = create_test_app().await;
    let cookie = app.login("user-ada").await;

    let (status, body) = app
        .send_json(post_json(
            "/api/learn/complete",
            Some(&cookie),
            r#"{"lessonId":"l-transit"}"#,
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(
        body,
        json!({
            "alreadyDone": false,
            "xpEarned": 50,
            "newTotal": 530,
            "newLevel": 2,
            "currentStreak": 4
        })
    );

    let streak = app.repo.find_streak("user-ada").await.unwrap().unwrap();
    assert_eq!(streak.current_streak, 4);
    assert_eq!(streak.longest_streak, 5);
    assert_eq!(streak.last_active_date, Some(Utc::now().date_naive()));

    let progress = app
        .repo
        .find_progress("user-ada", "l-transit")
        .await
        .unwrap()
        .unwrap();
    assert!(progress.is_completed());
    assert_eq!(progress.xp_earned, 50);
}

#[tokio::test]
async fn test_complete_lesson_twice_is_a_no_op() {
    let app = create_test_app().await;
    let cookie = app.login("user-ada").await;
    let request = || {
        post_json(
            "/api/learn/complete",
            Some(&cookie),
            r#"{"lessonId":"l-binoculars"}"#,
        )
    };

    let (status, first) = app.send_json(request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["xpEarned"], 30);
    assert_eq!(first["newTotal"], 510);

    let (status, second) = app.send_json(request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, json!({ "alreadyDone": true, "xpEarned": 0 }));

    let profile = app.repo.find_profile("user-ada").await.unwrap().unwrap();
    assert_eq!(profile.xp, 510);
}

#[tokio::test]
async fn test_complete_lesson_creates_profile_for_new_user() {
    let app = create_test_app().await;
    let cookie = app.login("user-fresh").await;

    let (status, body) = app
        .send_json(post_json(
            "/api/learn/complete",
            Some(&cookie),
            r#"{"lessonId":"l-telescopes"}"#,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["xpEarned"], 50);
    assert_eq!(body["newTotal"], 50);
    assert_eq!(body["newLevel"], 1);
    assert_eq!(body["currentStreak"], 1);
}

#[tokio::test]
async fn test_complete_lesson_requires_session() {
    let app = create_test_app().await;

    let (status, body) = app
        .send_json(post_json(
            "/api/learn/complete",
            None,
            r#"{"lessonId":"l-transit"}"#,
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));

    let (status, _) = app
        .send_json(post_json(
            "/api/learn/complete",
            Some("session_id=forged"),
            r#"{"lessonId":"l-transit"}"#,
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_complete_lesson_bad_requests() {
    let app = create_test_app().await;
    let cookie = app.login("user-ada").await;

    for body in ["{}", r#"{"lessonId":""}"#, "not json at all", ""] {
        let (status, json) = app
            .send_json(post_json("/api/learn/complete", Some(&cookie), body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(json, json!({ "error": "Missing lessonId" }));
    }
}

#[tokio::test]
async fn test_complete_unknown_lesson_returns_404() {
    let app = create_test_app().await;
    let cookie = app.login("user-ada").await;

    let (status, body) = app
        .send_json(post_json(
            "/api/learn/complete",
            Some(&cookie),
            r#"{"lessonId":"l-missing"}"#,
        ))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Lesson not found" }));
}

#[tokio::test]
async fn test_complete_lesson_with_numeric_id_is_not_found() {
    let app = create_test_app().await;
    let cookie = app.login("user-ada").await;

    let (status, body) = app
        .send_json(post_json(
            "/api/learn/complete",
            Some(&cookie),
            r#"{"lessonId":123}"#,
        ))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Lesson not found" }));
}

#[tokio::test]
async fn test_storage_failure_returns_500_and_writes_nothing() {
    let app = create_test_app().await;
    let cookie = app.login("user-ada").await;
    app.repo.fail_writes("connection reset by peer").await;

    let (status, body) = app
        .send_json(post_json(
            "/api/learn/complete",
            Some(&cookie),
            r#"{"lessonId":"l-transit"}"#,
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "connection reset by peer" }));

    assert!(app
        .repo
        .find_progress("user-ada", "l-transit")
        .await
        .unwrap()
        .is_none());
    let profile = app.repo.find_profile("user-ada").await.unwrap().unwrap();
    assert_eq!(profile.xp, 480);
    let streak = app.repo.find_streak("user-ada").await.unwrap().unwrap();
    assert_eq!(streak.current_streak, 3);
}

#[tokio::test]
async fn test_enroll_then_enroll_again() {
    let app = create_test_app().await;
    let cookie = app.login("user-ada").await;

    let (status, body) = app
        .send_json(post_json(
            "/api/learn/enroll",
            Some(&cookie),
            r#"{"courseId":"c-observing"}"#,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "enrolled": true, "alreadyEnrolled": false }));

    let (status, body) = app
        .send_json(post_json(
            "/api/learn/enroll",
            Some(&cookie),
            r#"{"courseId":"c-observing"}"#,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "enrolled": true, "alreadyEnrolled": true }));

    let enrollments = app.repo.list_enrollments("user-ada").await.unwrap();
    assert_eq!(enrollments.len(), 1);
}

#[tokio::test]
async fn test_enroll_errors() {
    let app = create_test_app().await;
    let cookie = app.login("user-ada").await;

    let (status, _) = app
        .send_json(post_json(
            "/api/learn/enroll",
            None,
            r#"{"courseId":"c-observing"}"#,
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send_json(post_json("/api/learn/enroll", Some(&cookie), "{}"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing courseId" }));

    let (status, body) = app
        .send_json(post_json(
            "/api/learn/enroll",
            Some(&cookie),
            r#"{"courseId":"c-nope"}"#,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Course not found" }));
}

#[tokio::test]
async fn test_enroll_storage_failure_returns_500() {
    let app = create_test_app().await;
    let cookie = app.login("user-ada").await;
    app.repo.fail_writes("not primary").await;

    let (status, body) = app
        .send_json(post_json(
            "/api/learn/enroll",
            Some(&cookie),
            r#"{"courseId":"c-observing"}"#,
        ))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "not primary" }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enrolls_create_one_row() {
    let app = create_test_app().await;
    let cookie = app.login("user-ada").await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let router = app.router.clone();
            let request = post_json(
                "/api/learn/enroll",
                Some(&cookie),
                r#"{"courseId":"c-observing"}"#,
            );
            tokio::spawn(async move { router.oneshot(request).await.unwrap() })
        })
        .collect();

    let mut fresh = 0;
    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["enrolled"], true);
        if body["alreadyEnrolled"] == false {
            fresh += 1;
        }
    }

    assert_eq!(fresh, 1);
    let enrollments = app.repo.list_enrollments("user-ada").await.unwrap();
    assert_eq!(enrollments.len(), 1);
}
