// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, generation, plans},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, plans, generation).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, engine).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let plan_routes = Router::new()
        .route("/", post(plans::create_plan).get(plans::list_plans))
        .route("/{public_id}", get(plans::get_plan))
        .route("/{public_id}/goals", post(plans::create_goal))
        .route(
            "/{public_id}/documents",
            post(plans::add_document).get(plans::list_documents),
        );

    let goal_routes = Router::new()
        .route("/{public_id}/tasks", post(plans::create_task))
        .route(
            "/{public_id}/note",
            post(generation::start_goal_note).get(generation::get_goal_note),
        )
        .route(
            "/{public_id}/quiz",
            post(generation::start_goal_quiz).get(generation::get_goal_quiz),
        )
        .route(
            "/{public_id}/quiz/submission",
            post(generation::submit_goal_quiz).get(generation::get_goal_quiz_submission),
        );

    let task_routes = Router::new()
        .route(
            "/{public_id}/note",
            post(generation::start_task_note).get(generation::get_task_note),
        )
        .route(
            "/{public_id}/quiz",
            post(generation::start_task_quiz).get(generation::get_task_quiz),
        )
        .route(
            "/{public_id}/quiz/submission",
            post(generation::submit_task_quiz).get(generation::get_task_quiz_submission),
        );

    let protected = Router::new()
        .nest("/api/plans", plan_routes)
        .nest("/api/goals", goal_routes)
        .nest("/api/tasks", task_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .merge(protected)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
