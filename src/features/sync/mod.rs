//! Offline mutation queue and sync engine.
//!
//! Scouting records are written to a durable local queue first and delivered
//! to the scouting API later, whenever connectivity allows.
//!
//! Features:
//! - Durable queue with a `pending → syncing → synced | error` state machine
//! - Batched, bounded-concurrency sync passes in creation order
//! - Retry limit with manual "retry failed" and automatic backoff
//! - Auto-sync after reconnect, with a settle delay
//! - Completion listeners and progress reporting for UIs

pub mod config;
pub mod engine;
pub mod entry;
pub mod network;
pub mod orchestrator;
pub mod queue;

pub use config::{SyncConfig, SyncConfigUpdate, MAX_BACKOFF};
pub use engine::{EngineOptions, ScoutSync, SyncStatus};
pub use entry::{EntryId, EntryStatus, QueuedEntry};
pub use network::{
    poll_connectivity, spawn_auto_sync, Connectivity, ConnectivityProbe, NetworkMonitor,
};
pub use orchestrator::{EntryOutcome, Outcome, SyncOrchestrator, SyncProgress, SyncResult};
pub use queue::{ListenerId, QueueManager, QueueStats, DEFAULT_CLAIM_LEASE};
