//! HTTP API server

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::repository::Repository;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiJson};
pub use state::AppState;

/// Both the singular and plural forms are served
const ITEM_ROUTES: [&str; 2] = ["/item", "/items"];

/// Build the API router using the provided application state
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new().route("/health", get(handlers::health));

    for base in ITEM_ROUTES {
        router = router
            .route(
                base,
                post(handlers::create_item).get(handlers::list_items),
            )
            .route(
                &format!("{}/:id", base),
                get(handlers::get_item)
                    .put(handlers::update_item)
                    .delete(handlers::delete_item),
            );
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Convenience helper wiring a repository with default state settings
pub fn create_item_router(repository: Repository) -> Router {
    create_router(AppState::new(repository))
}
