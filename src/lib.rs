//! # Metasync
//!
//! Catalog sync and metadata inference for external BI data sources.
//!
//! Given a registered [`Database`](catalog::Database) and a
//! [`Driver`](driver::Driver) that can describe it, the engine brings the
//! application's catalog of tables, fields, foreign keys and nested
//! fields into agreement with the external schema, and enriches columns
//! with inferred semantic types (category, URL, JSON, latitude, ...) and
//! display metadata.
//!
//! ## Quick Start
//!
//! ```ignore
//! use metasync::prelude::*;
//!
//! let syncer = Syncer::new()?;
//! let report = syncer
//!     .sync_database(&driver, &catalog, &events, &database, true)
//!     .await?;
//! println!("{} new fields", report.fields_created);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        Syncer                            │
//! │   tables ─► fields ─► classify ─► fks ─► metadata table  │
//! └─────────────────────────────────────────────────────────┘
//!        │                    │                   │
//!        ▼                    ▼                   ▼
//!     Driver            CatalogStore          EventBus
//!  (describe/sample)   (typed CRUD)      (fire-and-forget)
//! ```
//!
//! Phases are strictly sequenced within a run: later phases depend on
//! the catalog state earlier ones leave behind. Concurrent runs against
//! *different* databases are fine; the engine adds no cross-database
//! coordination of its own.

pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod sync;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{
        BaseType, CatalogStore, Database, Field, FieldPatch, ForeignKey, MemoryCatalog,
        NewField, NewTable, Relationship, SpecialType, Table, TablePatch,
    };
    pub use crate::config::{Settings, SyncSettings};
    pub use crate::driver::{
        Capability, DatabaseDescription, Driver, FieldDescription, ForeignKeyDescription,
        TableDescription, TableIdent,
    };
    pub use crate::error::{SyncError, SyncResult};
    pub use crate::events::{EventBus, NoopEventBus, SyncEvent};
    pub use crate::sync::{SyncReport, Syncer};
}

// Also export the headline types at the crate root.
pub use catalog::{CatalogStore, Database};
pub use driver::Driver;
pub use error::{SyncError, SyncResult};
pub use sync::{SyncReport, Syncer};
