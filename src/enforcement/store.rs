use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::db::models::BlockRecord;

/// Unset deadline: never blocked.
pub fn not_blocked() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Durable "blocked until" deadline, surviving process restarts.
///
/// Single writer (the driver). Writes only ever move the deadline forward.
pub trait DeadlineStore: Send + Sync {
    /// Current deadline, [`not_blocked`] when never set.
    fn blocked_until(&self) -> impl Future<Output = Result<DateTime<Utc>>> + Send;

    fn set_blocked_until(&self, until: DateTime<Utc>) -> impl Future<Output = Result<()>> + Send;

    /// Appends to the block history. Stores without history accept and drop it.
    fn record_block(&self, record: BlockRecord) -> impl Future<Output = Result<()>> + Send {
        let _ = record;
        async { Ok(()) }
    }
}
