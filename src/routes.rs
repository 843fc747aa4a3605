// src/routes.rs

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{admin, auth, grades, practices, tests, users},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public routes: registration and login.
/// * Protected routes: everything else, behind `auth_middleware`.
/// * Admin routes: additionally behind `admin_middleware`.
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = Router::new()
        .route("/me", get(users::me))
        .route("/{id}", get(users::get_user));

    let test_routes = Router::new()
        .route("/", get(tests::list_tests))
        .route("/attempts", get(tests::my_attempts))
        .route("/attempts/{id}", get(tests::get_attempt))
        .route("/{id}", get(tests::get_test))
        .route("/{id}/attempts", post(tests::submit_attempt));

    let practice_routes = Router::new()
        .route("/", get(practices::list_practices))
        .route("/submissions", get(practices::my_submissions))
        .route("/submissions/{id}", get(practices::get_submission))
        .route("/{id}", get(practices::get_practice))
        .route("/{id}/submissions", post(practices::submit_practice));

    let grade_routes = Router::new()
        .route("/tests", get(grades::my_test_grades))
        .route("/practices", get(grades::my_practice_grades));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/tests", post(admin::create_test))
        .route("/tests/attempts", get(admin::list_attempts))
        .route("/tests/grades", post(admin::set_test_grade))
        .route(
            "/tests/grades/{id}",
            put(admin::update_test_grade).delete(admin::delete_test_grade),
        )
        .route(
            "/tests/{id}",
            put(admin::update_test).delete(admin::delete_test),
        )
        .route("/practices", post(admin::create_practice))
        .route("/practices/submissions", get(admin::list_submissions))
        .route("/practices/grades", post(admin::set_practice_grade))
        .route(
            "/practices/grades/{id}",
            put(admin::update_practice_grade).delete(admin::delete_practice_grade),
        )
        .route(
            "/practices/{id}",
            put(admin::update_practice).delete(admin::delete_practice),
        )
        // Runs inside the auth layer below, so claims are always present here
        .layer(middleware::from_fn(admin_middleware));

    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/tests", test_routes)
        .nest("/practices", practice_routes)
        .nest("/grades", grade_routes)
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", protected_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
