mod sync;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::ServerState;

pub struct AppRouter;

impl AppRouter {
    pub fn create(state: ServerState) -> Router {
        Router::new()
            .route("/health", get(sync::health))
            .route("/mailboxes/:mailbox_id/poll", post(sync::poll_mailbox))
            .route("/mailboxes/:mailbox_id/sync", post(sync::manual_sync))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}
