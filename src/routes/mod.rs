pub mod submit;

use axum::routing::post;
use axum::Router;

use crate::state::SharedState;

pub fn submit_routes() -> Router<SharedState> {
    Router::new().route("/submit", post(submit::submit))
}
