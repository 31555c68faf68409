use serde_json::Value;

use crate::error::AppError;
use crate::models::SubmissionRecord;
use crate::notify::{self, Notification};
use crate::state::SharedState;
use crate::store::StoreError;

use super::validate;

/// Payload `type` that marks a final submission.
pub const FINAL_SUBMISSION: &str = "submit";

pub struct PipelineResult {
    pub record: SubmissionRecord,
    pub notification_scheduled: bool,
}

/// Validate, persist, then notify.
///
/// The response must not be acknowledged before the append finishes, but the
/// notification is detached and can never fail the request.
pub async fn run(state: &SharedState, payload: Value, ip: String) -> Result<PipelineResult, AppError> {
    let payload = validate::validate(payload)?;
    let record = SubmissionRecord::new(payload, ip);

    // Runs on its own task so a client disconnect cannot abort a started
    // append, nor skip the notification that follows it.
    let store = state.store.clone();
    let notifier = state.notifier.clone();
    let (record, notification_scheduled) = tokio::spawn(async move {
        store.append(&record).await?;

        tracing::info!(
            "Stored submission (type={}, ip={})",
            record.kind().unwrap_or("?"),
            record.ip
        );

        let scheduled = record.kind() == Some(FINAL_SUBMISSION)
            && notify::dispatch(notifier, Notification::for_submission(&record)).is_some();

        Ok::<_, StoreError>((record, scheduled))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Store task failed: {e}")))??;

    Ok(PipelineResult {
        record,
        notification_scheduled,
    })
}
