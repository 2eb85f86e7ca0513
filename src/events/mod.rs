//! Lifecycle events published during sync runs.
//!
//! Publication is fire-and-forget: the engine never waits on consumers
//! and a slow or absent bus cannot fail a sync.

use std::time::Duration;

use crate::catalog::{DatabaseId, TableId};

/// A sync lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A database sync run started.
    DatabaseSyncBegin {
        database_id: DatabaseId,
        /// Fresh tracking id for this run (UUID v4).
        custom_id: String,
    },
    /// A database sync run finished.
    DatabaseSyncEnd {
        database_id: DatabaseId,
        custom_id: String,
        running_time: Duration,
    },
    /// A single-table sync finished.
    TableSync { table_id: TableId },
}

/// Fire-and-forget event sink.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: SyncEvent);
}

/// An event bus that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventBus;

impl EventBus for NoopEventBus {
    fn publish(&self, _event: SyncEvent) {}
}
