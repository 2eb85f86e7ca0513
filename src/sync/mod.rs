//! The sync engine: reconciliation and metadata inference for external
//! data sources.
//!
//! A sync run is one logical task that drives a fixed sequence of phases,
//! each depending on the catalog state the previous one left behind:
//!
//! ```text
//! describe_database
//!       │
//!       ▼
//! table reconciliation ──► field reconciliation (per table, name order)
//!                                │
//!                                ▼
//!                          field classification (per field)
//!                                │
//!                                ▼
//!                          foreign-key linking (per table, second pass)
//!                                │
//!                                ▼
//!                          metadata side-table
//! ```
//!
//! One bad table, field, or metadata row is logged and skipped; only
//! structurally invalid driver output aborts a run.

mod classify;
mod fields;
mod fks;
mod metadata_table;
mod tables;

pub mod infer;
pub mod progress;

pub use fields::FieldChanges;
pub use infer::SpecialTypeInferrer;
pub use metadata_table::METADATA_TABLE_NAME;
pub use progress::progress_meter;
pub use tables::TableChanges;

use std::time::{Duration, Instant};

use tracing::{error, info};
use uuid::Uuid;

use crate::catalog::{CatalogStore, Database, Table, TablePatch};
use crate::config::SyncSettings;
use crate::driver::{Capability, Driver};
use crate::error::SyncResult;
use crate::events::{EventBus, SyncEvent};

use classify::FieldClassifier;

/// Tuning constants for the content classifiers, exposed for
/// configuration defaults.
pub mod thresholds {
    /// URL fraction a textual field must exceed to be marked `url`.
    pub const URL_RATIO: f64 = 0.95;
    /// Distinct-count ceiling under which a field is marked `category`.
    pub const LOW_CARDINALITY: usize = 40;
    /// Average length above which a field leaves row previews.
    pub const AVG_LENGTH: u64 = 50;
    /// Most values the JSON classifier will pull from a driver's lazy
    /// value sequence.
    pub const MAX_SYNC_LAZY_SEQ_RESULTS: usize = 10_000;
}

/// Per-run state threaded explicitly through every phase.
///
/// Carries the run's tracking id and the log-quiet flags that silence
/// chatty query/catalog diagnostics for the duration of a run. The flags
/// replace scoped logger reconfiguration: whoever holds the context
/// decides, and every exit path is covered because there is nothing to
/// restore.
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Fresh UUID v4 identifying this run in events and logs.
    pub custom_id: String,
    /// Silence per-value query diagnostics (distinct counts, sampling).
    pub quiet_query_log: bool,
    /// Silence per-row catalog selection diagnostics.
    pub quiet_catalog_log: bool,
}

impl SyncContext {
    fn for_run() -> Self {
        Self {
            custom_id: Uuid::new_v4().to_string(),
            quiet_query_log: true,
            quiet_catalog_log: true,
        }
    }
}

/// What a database sync run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub tables_created: usize,
    pub tables_reactivated: usize,
    pub tables_deactivated: usize,
    pub fields_created: usize,
    pub fields_updated: usize,
    pub fields_reactivated: usize,
    pub fields_deactivated: usize,
    pub foreign_keys_linked: usize,
    pub metadata_rows_applied: usize,
    /// Units (tables, fields, metadata rows) skipped after an error.
    pub unit_failures: usize,
    pub running_time: Duration,
}

impl SyncReport {
    fn absorb_tables(&mut self, changes: TableChanges) {
        self.tables_created += changes.created;
        self.tables_reactivated += changes.reactivated;
        self.tables_deactivated += changes.deactivated;
    }

    fn absorb_fields(&mut self, changes: FieldChanges) {
        self.fields_created += changes.created;
        self.fields_updated += changes.updated;
        self.fields_reactivated += changes.reactivated;
        self.fields_deactivated += changes.deactivated;
    }
}

/// The sync engine.
///
/// Construction compiles and validates the special-type pattern table;
/// a misconfigured table refuses to start rather than mis-inferring
/// quietly.
pub struct Syncer {
    settings: SyncSettings,
    inferrer: SpecialTypeInferrer,
}

impl Syncer {
    /// Engine with default settings.
    pub fn new() -> SyncResult<Self> {
        Self::with_settings(SyncSettings::default())
    }

    /// Engine with explicit settings.
    pub fn with_settings(settings: SyncSettings) -> SyncResult<Self> {
        Ok(Self {
            inferrer: SpecialTypeInferrer::new()?,
            settings,
        })
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Sync every table of a database.
    ///
    /// Publishes `database-sync-begin` and, on success, `database-sync-end`
    /// with the run's duration; both carry the same fresh tracking id.
    /// `full_sync = false` reconciles metadata but skips the
    /// sampling-heavy classifier stages and the row-count refresh.
    pub async fn sync_database(
        &self,
        driver: &dyn Driver,
        catalog: &dyn CatalogStore,
        events: &dyn EventBus,
        database: &Database,
        full_sync: bool,
    ) -> SyncResult<SyncReport> {
        let ctx = SyncContext::for_run();
        let started = Instant::now();

        info!(database = %database.name, custom_id = %ctx.custom_id, "beginning database sync");
        events.publish(SyncEvent::DatabaseSyncBegin {
            database_id: database.id,
            custom_id: ctx.custom_id.clone(),
        });

        driver.begin_sync(database).await?;
        let result = self
            .sync_database_inner(&ctx, driver, catalog, database, full_sync)
            .await;
        if let Err(e) = driver.end_sync(database).await {
            // A failed release must not mask the run's own outcome.
            error!(database = %database.name, error = %e, "driver release failed");
        }

        let mut report = result?;
        report.running_time = started.elapsed();
        events.publish(SyncEvent::DatabaseSyncEnd {
            database_id: database.id,
            custom_id: ctx.custom_id.clone(),
            running_time: report.running_time,
        });
        info!(
            database = %database.name,
            custom_id = %ctx.custom_id,
            tables_created = report.tables_created,
            tables_deactivated = report.tables_deactivated,
            fields_created = report.fields_created,
            foreign_keys_linked = report.foreign_keys_linked,
            unit_failures = report.unit_failures,
            running_time_ms = report.running_time.as_millis() as u64,
            "finished database sync"
        );
        Ok(report)
    }

    /// Sync a single table: field reconciliation plus classification,
    /// then a `table-sync` event.
    pub async fn sync_table(
        &self,
        driver: &dyn Driver,
        catalog: &dyn CatalogStore,
        events: &dyn EventBus,
        database: &Database,
        table: &Table,
        full_sync: bool,
    ) -> SyncResult<FieldChanges> {
        let ctx = SyncContext::for_run();

        driver.begin_sync(database).await?;
        let result = self
            .sync_one_table(&ctx, driver, catalog, database, table, full_sync)
            .await;
        if let Err(e) = driver.end_sync(database).await {
            error!(database = %database.name, error = %e, "driver release failed");
        }

        let changes = result?;
        events.publish(SyncEvent::TableSync { table_id: table.id });
        Ok(changes)
    }

    async fn sync_database_inner(
        &self,
        ctx: &SyncContext,
        driver: &dyn Driver,
        catalog: &dyn CatalogStore,
        database: &Database,
        full_sync: bool,
    ) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();

        let description = driver.describe_database(database).await?;
        report.absorb_tables(
            tables::reconcile_tables(ctx, catalog, database, &description).await?,
        );

        let mut active = catalog.active_tables(database.id).await?;
        active.sort_by(|a, b| a.name.cmp(&b.name));
        let total = active.len();

        for (done, table) in active.iter().enumerate() {
            match self
                .sync_one_table(ctx, driver, catalog, database, table, full_sync)
                .await
            {
                Ok(changes) => report.absorb_fields(changes),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(table = %table.name, error = %e, "table sync failed, continuing");
                    report.unit_failures += 1;
                }
            }
            info!(custom_id = %ctx.custom_id, "{}", progress_meter(done + 1, total));
        }

        // Foreign keys link only after every table has fields: a
        // destination may belong to a table reconciled later in this run.
        if driver.has_feature(Capability::ForeignKeys) {
            for table in &active {
                match self
                    .sync_one_table_fks(ctx, driver, catalog, database, table)
                    .await
                {
                    Ok(linked) => report.foreign_keys_linked += linked,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        error!(table = %table.name, error = %e, "fk sync failed, continuing");
                        report.unit_failures += 1;
                    }
                }
            }
        }

        if driver.has_feature(Capability::MetadataRows) {
            if let Some(ident) = metadata_table::find_metadata_table(&description) {
                match metadata_table::apply_metadata_table(driver, catalog, database, &ident.name)
                    .await
                {
                    Ok(applied) => report.metadata_rows_applied += applied,
                    Err(e) => {
                        error!(error = %e, "metadata table failed, continuing");
                        report.unit_failures += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    async fn sync_one_table(
        &self,
        ctx: &SyncContext,
        driver: &dyn Driver,
        catalog: &dyn CatalogStore,
        database: &Database,
        table: &Table,
        full_sync: bool,
    ) -> SyncResult<FieldChanges> {
        let description = driver.describe_table(database, table).await?;
        let changes =
            fields::reconcile_table_fields(ctx, &self.inferrer, catalog, table, &description)
                .await?;

        if full_sync {
            match catalog.table_row_count(table).await {
                Ok(rows) if table.rows != Some(rows) => {
                    catalog
                        .update_table(
                            table.id,
                            TablePatch {
                                rows: Some(rows),
                                ..Default::default()
                            },
                        )
                        .await?;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(table = %table.name, error = %e, "row count refresh failed, continuing");
                }
            }
        }

        let classifier = FieldClassifier {
            settings: &self.settings,
            inferrer: &self.inferrer,
        };
        for field in catalog.active_fields(table.id, None).await? {
            classifier
                .classify(ctx, driver, catalog, table, field, full_sync)
                .await;
        }

        Ok(changes)
    }

    async fn sync_one_table_fks(
        &self,
        ctx: &SyncContext,
        driver: &dyn Driver,
        catalog: &dyn CatalogStore,
        database: &Database,
        table: &Table,
    ) -> SyncResult<usize> {
        let described = driver.describe_table_fks(database, table).await?;
        fks::reconcile_table_fks(ctx, catalog, database, table, &described).await
    }
}
