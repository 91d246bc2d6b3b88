use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod astronomy;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod repository;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' 'unsafe-inline'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Sky data is public and read-only
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/auth", auth_routes())
        .nest("/api/learn", learn_routes(app_state.clone()))
        .nest("/api/sky", sky_routes().layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/callback",
            get(handlers::auth::callback_get).post(handlers::auth::callback_post),
        )
        .route("/logout", post(handlers::auth::logout))
}

fn learn_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Browsing works signed out; the user only adds per-lesson state
    let public_routes = Router::new()
        .route("/catalog", get(handlers::learn::catalog))
        .route("/courses/{slug}", get(handlers::learn::course_detail))
        .route("/lessons/{slug}", get(handlers::learn::lesson_detail))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::optional_session,
        ));

    let protected_routes = Router::new()
        .route("/complete", post(handlers::learn::complete_lesson))
        .route("/enroll", post(handlers::learn::enroll))
        .route("/dashboard", get(handlers::learn::dashboard))
        .route("/onboarding", post(handlers::learn::complete_onboarding))
        .route("/profile", get(handlers::learn::profile))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::require_session,
        ));

    public_routes.merge(protected_routes)
}

fn sky_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/moon", get(handlers::sky::moon))
        .route("/sun", get(handlers::sky::sun))
        .route("/positions", get(handlers::sky::positions))
        .route("/sites", get(handlers::sky::sites))
        .route("/exoplanets/{seed}", get(handlers::sky::exoplanet))
        .route("/light-travel", get(handlers::sky::light_travel))
}
