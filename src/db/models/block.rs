//! Budget-exhaustion history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One exhausted budget and the cooldown it triggered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub blocked_until: DateTime<Utc>,
    pub watched_ms: u64,
}

impl BlockRecord {
    pub fn new(started_at: DateTime<Utc>, blocked_until: DateTime<Utc>, watched_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at,
            blocked_until,
            watched_ms,
        }
    }
}
