use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::{handlers, jobs, middleware::metrics_middleware, tasks};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Jobs
        .route("/jobs", post(jobs::create_job))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job))
        // Tasks
        .route("/tasks", get(tasks::list_tasks))
        .route("/tasks/run", post(tasks::run_task));

    // Unversioned routes kept for existing clients
    let legacy_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/run-pipeline", post(jobs::create_job))
        .route("/job-status/{id}", get(jobs::get_job))
        .route("/run-script", post(tasks::run_task));

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(legacy_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(metrics_middleware)),
        )
        .with_state(state)
}
