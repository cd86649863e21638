mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validation;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{auth::middleware::require_auth, state::AppState};

/// Reads are public; every write goes through [`require_auth`].
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/events", get(handlers::list_events))
        .route("/events/:id", get(handlers::get_event));

    let protected = Router::new()
        .route("/events", post(handlers::create_event))
        .route(
            "/events/:id",
            put(handlers::update_event).delete(handlers::delete_event),
        )
        .route(
            "/events/:id/register",
            post(handlers::register).delete(handlers::unregister),
        )
        .route("/events/:id/unregister", post(handlers::unregister))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(protected)
}
