pub mod config;
pub mod error;
pub mod state;
pub mod models;
pub mod routes;
pub mod notify;
pub mod store;
pub mod submission;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::notify::{Notifier, SmtpNotifier};
use crate::state::{AppState, SharedState};
use crate::store::SubmissionStore;

pub fn build_app(config: Config) -> Router {
    let notifier = config.smtp.as_ref().and_then(|smtp| {
        match SmtpNotifier::new(smtp) {
            Ok(notifier) => {
                tracing::info!("SMTP notifications enabled via {}:{}", smtp.host, smtp.port);
                Some(Arc::new(notifier) as Arc<dyn Notifier>)
            }
            Err(e) => {
                tracing::warn!("SMTP notifications not available: {e}");
                None
            }
        }
    });
    if config.smtp.is_none() {
        tracing::info!("SMTP_HOST not set, notifications disabled");
    }

    let store = SubmissionStore::new(&config.data_dir);
    tracing::info!("Writing submissions to {}", store.path().display());

    router(Arc::new(AppState {
        config,
        store,
        notifier,
    }))
}

/// Assemble the HTTP surface around an already built state.
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::submit_routes())
        .route("/health", axum::routing::get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(DefaultBodyLimit::max(state.config.max_body_size)),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
