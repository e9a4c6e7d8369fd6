use std::time::Duration;

/// Orphans older than `head.number - ORPHAN_AGE_OFFSET` are purged on every
/// `chainThenPurgeOrphans` pass (§4.4.2 step 7, invariant 3 in §8).
pub const ORPHAN_AGE_OFFSET: u64 = 10;

/// Reclamation threshold: the tail is advanced once the chain grows to
/// `2 * SAVE_COUNT` headers long (§4.4.3).
pub const SAVE_COUNT: u64 = 300;

/// How many headers one sync batch requests at a time (§4.4.4).
pub const SYNC_BATCH: u32 = 100;

/// How often the pending-transaction status poller fires (§4.4.6).
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// The engine's tunable constants (§10.4), overridable per-deployment.
/// Defaults mirror the specification's own named constants; an embedder
/// (`cmd/photon`'s config layer) builds one of these from its own config
/// file rather than this crate depending on a concrete config type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTunables {
    pub orphan_age_offset: u64,
    pub save_count: u64,
    pub sync_batch: u32,
}

impl Default for EngineTunables {
    fn default() -> Self {
        Self {
            orphan_age_offset: ORPHAN_AGE_OFFSET,
            save_count: SAVE_COUNT,
            sync_batch: SYNC_BATCH,
        }
    }
}
