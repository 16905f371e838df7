// Startup recovery of jobs orphaned by a prior crash.

use crate::errors::StoreError;
use crate::store::JobStore;
use tracing::{info, instrument};

/// Reset every job left in processing status back to pending.
///
/// A processing row with no live executor behind it is definitionally
/// orphaned by a prior crash. `attempts` is left untouched: the increment
/// from the interrupted attempt stands, so a crash still consumes one retry
/// toward the ceiling and crash loops stay bounded. Must run before the
/// scheduler's first tick; idempotent when nothing intervenes.
#[instrument(skip(store))]
pub async fn run(store: &dyn JobStore) -> Result<u64, StoreError> {
    let reset = store.reset_orphaned().await?;
    // Per-row errors are not reported; only the aggregate count.
    info!(jobs_reset = reset, "Recovery sweep completed");
    Ok(reset)
}
