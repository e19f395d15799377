use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

/// Idempotency ledger row for inbound payment-provider events.
///
/// Three observable states: no row (never arrived), `processed = false`
/// (logged, possibly with an error message for operator triage), and
/// `processed = true` (terminal). The unique index on `provider_event_id` is
/// the sole de-duplication boundary for at-least-once delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StripeEventLog {
    pub id: Uuid,
    pub provider_event_id: String,
    pub event_type: String,
    pub payload: JsonValue,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Triage projection for the admin surface: unprocessed rows and their
/// last error.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StripeEventLogResponse {
    pub id: Uuid,
    pub provider_event_id: String,
    pub event_type: String,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StripeEventLog> for StripeEventLogResponse {
    fn from(log: StripeEventLog) -> Self {
        Self {
            id: log.id,
            provider_event_id: log.provider_event_id,
            event_type: log.event_type,
            processed: log.processed,
            processed_at: log.processed_at,
            error_message: log.error_message,
            created_at: log.created_at,
        }
    }
}
