//! Route definitions for the ImgHost HTTP API.
//!
//! JSON routes are mounted under `/api`. Stored originals of local engines
//! and generated thumbnails are served as static files from `/uploads` and
//! `/thumbnails`.

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::middleware::error_detail::expose_internal_errors;
use crate::middleware::logging::request_logging;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let api_routes = Router::new()
        .merge(image_routes())
        .merge(engine_routes())
        .merge(config_routes())
        .merge(health_routes());

    let mut router = Router::new()
        .nest("/api", api_routes)
        .nest_service("/uploads", ServeDir::new(&config.storage.upload_dir))
        .nest_service("/thumbnails", ServeDir::new(&config.storage.thumbnail_dir));

    // Innermost, so it rewrites the body before compression runs.
    if config.server.expose_internal_errors {
        router = router.layer(axum_middleware::from_fn(expose_internal_errors));
    }

    router
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_seconds,
        )))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.server.cors))
        .layer(axum_middleware::from_fn(request_logging))
        .with_state(state)
}

/// Upload, listing, download and delete
fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/images", get(handlers::image::list_images))
        .route("/images/upload", post(handlers::image::upload_image))
        .route("/images/upload/batch", post(handlers::image::batch_upload))
        .route("/images/batch-delete", post(handlers::image::batch_delete))
        .route(
            "/images/{id}",
            get(handlers::image::get_image).delete(handlers::image::delete_image),
        )
        .route("/images/{id}/raw", get(handlers::image::download_image))
}

/// Storage engine administration
fn engine_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/storage/engines",
            get(handlers::engine::list_engines).post(handlers::engine::create_engine),
        )
        .route(
            "/storage/engines/{id}",
            get(handlers::engine::get_engine)
                .put(handlers::engine::update_engine)
                .delete(handlers::engine::delete_engine),
        )
        .route(
            "/storage/engines/{id}/default",
            post(handlers::engine::set_default_engine),
        )
        .route("/storage/engines/{id}/test", post(handlers::engine::test_engine))
        .route("/storage/engines/{id}/usage", get(handlers::engine::engine_usage))
        .route("/storage/types", get(handlers::engine::supported_types))
        .route("/storage/cache/reload", post(handlers::engine::reload_cache))
}

/// Runtime settings
fn config_routes() -> Router<AppState> {
    Router::new()
        .route("/configs", get(handlers::config::list_configs))
        .route("/configs/batch", put(handlers::config::batch_update_configs))
        .route("/configs/reload", post(handlers::config::reload_configs))
        .route(
            "/configs/{key}",
            get(handlers::config::get_config)
                .put(handlers::config::update_config)
                .delete(handlers::config::delete_config),
        )
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
