use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accepted submission as it is written to the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    #[serde(with = "iso_millis")]
    pub received_at: DateTime<Utc>,
    pub ip: String,
    pub payload: serde_json::Value,
}

impl SubmissionRecord {
    pub fn new(payload: serde_json::Value, ip: String) -> Self {
        Self {
            received_at: Utc::now(),
            ip,
            payload,
        }
    }

    /// The `type` tag of the payload when it is a string.
    pub fn kind(&self) -> Option<&str> {
        self.payload.get("type").and_then(|v| v.as_str())
    }

    pub fn received_at_iso(&self) -> String {
        iso_millis::format(&self.received_at)
    }
}

/// `2024-01-01T00:00:00.000Z`
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
