mod handlers;
pub mod identity;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Store;

pub fn create_router(store: Store) -> Router {
    let api = Router::new()
        // Members
        .route("/members", get(handlers::list_members))
        .route("/members", post(handlers::create_member))
        .route("/members/{id}", get(handlers::get_member))
        .route("/members/{id}", put(handlers::update_member))
        .route("/members/{id}", delete(handlers::delete_member))
        .route("/leaderboard", get(handlers::leaderboard))
        // Projects
        .route("/projects", get(handlers::list_projects))
        .route("/projects", post(handlers::submit_project))
        .route("/projects/{id}", get(handlers::get_project))
        .route("/projects/{id}", put(handlers::update_project))
        .route("/projects/{id}", delete(handlers::delete_project))
        .route("/projects/{id}/approve", post(handlers::approve_project))
        .route("/projects/{id}/reject", post(handlers::reject_project))
        .route("/projects/{id}/complete", post(handlers::complete_project))
        .route("/projects/{id}/join", post(handlers::join_project))
        // Polls
        .route("/polls", get(handlers::list_polls))
        .route("/polls", post(handlers::create_poll))
        .route("/polls/{id}", get(handlers::get_poll))
        .route("/polls/{id}", delete(handlers::delete_poll))
        .route("/polls/{id}/vote", post(handlers::vote_poll))
        .route("/polls/{id}/close", post(handlers::close_poll))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(store)
}
