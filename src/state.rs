use std::sync::Arc;

use crate::config::Config;
use crate::notify::Notifier;
use crate::store::SubmissionStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub store: SubmissionStore,
    /// `None` when no SMTP relay is configured.
    pub notifier: Option<Arc<dyn Notifier>>,
}
