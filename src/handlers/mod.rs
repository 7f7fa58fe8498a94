pub mod status;
pub mod websocket;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sovits/v1/", get(websocket::handle_websocket))
        .route("/sovits/status", get(status::handle_status))
        .with_state(state)
}
