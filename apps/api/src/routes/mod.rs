//! API route definitions

mod annotations;
mod auth;
mod data_sources;
mod drafts;
mod health;
mod project_types;
mod projects;
mod queue;
mod reviews;
mod skills;
mod skip_reasons;
mod tasks;
mod teams;
mod users;
mod workflows;

use axum::Router;

/// Build the API router with all routes
pub fn api_routes() -> Router {
    Router::new()
        .merge(health::routes())
        .nest("/api/v1", api_v1_routes())
}

/// API v1 routes
///
/// `auth` (session cookies) and `queue` (the live assignment-queue
/// websocket hub) carry their own router state and are mounted by the
/// binary once that state is constructed, not nested here. The
/// project/task sub-resource routers (`data_sources`, `drafts`,
/// `reviews`, `skip_reasons`, `skills`) are written to nest under their
/// parent resource's `{id}` segment and are wired there rather than here.
fn api_v1_routes() -> Router {
    Router::new()
        .nest("/users", users::routes())
        .nest("/tasks", tasks::routes())
        .nest("/annotations", annotations::routes())
        .nest("/projects", projects::routes())
        .nest("/project-types", project_types::routes())
        .nest("/teams", teams::routes())
        .nest("/skills/types", skills::skill_type_routes())
        .nest("/workflows", workflows::routes())
}

/// Get all route paths for OpenAPI documentation
pub fn openapi_paths() -> utoipa::openapi::Paths {
    use utoipa::OpenApi;

    // Collect paths from all route modules
    #[derive(OpenApi)]
    #[openapi(paths(users::list_users, users::get_user, users::create_user,))]
    struct UserPaths;

    UserPaths::openapi().paths
}
