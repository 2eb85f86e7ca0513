//! Shared test harness: a scriptable driver and a recording event bus.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use metasync::catalog::{BaseType, Database, Field, FieldPatch, Table};
use metasync::driver::{
    Capability, DatabaseDescription, Driver, DriverError, DriverResult, FieldDescription,
    ForeignKeyDescription, MetadataRow, TableDescription, TableIdent,
};
use metasync::events::{EventBus, SyncEvent};

/// The database under sync in every scenario.
pub fn database() -> Database {
    Database {
        id: 1,
        name: "test-db".to_string(),
    }
}

/// Install a test subscriber so failing runs print their logs.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A driver scripted entirely from the test.
///
/// Describe results, sampling answers and failures are configured with
/// the builder methods; anything unconfigured answers with a neutral
/// default (no URLs, zero length, no samples).
#[derive(Default)]
pub struct MockDriver {
    features: HashSet<Capability>,
    tables: Vec<TableIdent>,
    fields: HashMap<String, Vec<FieldDescription>>,
    fks: HashMap<String, Vec<ForeignKeyDescription>>,
    percent_urls: HashMap<String, f64>,
    avg_lengths: HashMap<String, u64>,
    samples: HashMap<String, Vec<Option<String>>>,
    nested: HashMap<String, HashMap<String, BaseType>>,
    metadata_rows: Vec<MetadataRow>,
    fail_percent_urls: HashSet<String>,
    begin_syncs: AtomicUsize,
    end_syncs: AtomicUsize,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature(mut self, capability: Capability) -> Self {
        self.features.insert(capability);
        self
    }

    pub fn with_table(mut self, ident: TableIdent, fields: Vec<FieldDescription>) -> Self {
        self.fields.insert(ident.name.clone(), fields);
        self.tables.push(ident);
        self
    }

    /// Add a table to the description without any columns, e.g. the
    /// metadata side-table.
    pub fn with_bare_table(mut self, ident: TableIdent) -> Self {
        self.tables.push(ident);
        self
    }

    pub fn with_fks(mut self, table: &str, fks: Vec<ForeignKeyDescription>) -> Self {
        self.fks.insert(table.to_string(), fks);
        self
    }

    pub fn with_percent_urls(mut self, field: &str, ratio: f64) -> Self {
        self.percent_urls.insert(field.to_string(), ratio);
        self
    }

    pub fn with_avg_length(mut self, field: &str, length: u64) -> Self {
        self.avg_lengths.insert(field.to_string(), length);
        self
    }

    pub fn with_samples(mut self, field: &str, samples: Vec<Option<String>>) -> Self {
        self.samples.insert(field.to_string(), samples);
        self
    }

    pub fn with_nested(mut self, field: &str, children: &[(&str, BaseType)]) -> Self {
        self.nested.insert(
            field.to_string(),
            children
                .iter()
                .map(|(name, base_type)| (name.to_string(), *base_type))
                .collect(),
        );
        self
    }

    pub fn with_metadata_row(mut self, keypath: &str, value: serde_json::Value) -> Self {
        let mut row = MetadataRow::new();
        row.insert(
            "keypath".to_string(),
            serde_json::Value::String(keypath.to_string()),
        );
        row.insert("value".to_string(), value);
        self.metadata_rows.push(row);
        self
    }

    /// Make `field_percent_urls` fail for one field.
    pub fn failing_percent_urls(mut self, field: &str) -> Self {
        self.fail_percent_urls.insert(field.to_string());
        self
    }

    pub fn begin_syncs(&self) -> usize {
        self.begin_syncs.load(Ordering::SeqCst)
    }

    pub fn end_syncs(&self) -> usize {
        self.end_syncs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn features(&self) -> HashSet<Capability> {
        self.features.clone()
    }

    async fn begin_sync(&self, _database: &Database) -> DriverResult<()> {
        self.begin_syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn end_sync(&self, _database: &Database) -> DriverResult<()> {
        self.end_syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn describe_database(
        &self,
        _database: &Database,
    ) -> DriverResult<DatabaseDescription> {
        Ok(DatabaseDescription {
            tables: self.tables.clone(),
        })
    }

    async fn describe_table(
        &self,
        _database: &Database,
        table: &Table,
    ) -> DriverResult<TableDescription> {
        Ok(TableDescription {
            fields: self.fields.get(&table.name).cloned().unwrap_or_default(),
        })
    }

    async fn describe_table_fks(
        &self,
        _database: &Database,
        table: &Table,
    ) -> DriverResult<Vec<ForeignKeyDescription>> {
        Ok(self.fks.get(&table.name).cloned().unwrap_or_default())
    }

    async fn field_percent_urls(&self, _table: &Table, field: &Field) -> DriverResult<f64> {
        if self.fail_percent_urls.contains(&field.name) {
            return Err(DriverError::Backend("injected sampling failure".to_string()));
        }
        Ok(self.percent_urls.get(&field.name).copied().unwrap_or(0.0))
    }

    async fn field_avg_length(&self, _table: &Table, field: &Field) -> DriverResult<u64> {
        Ok(self.avg_lengths.get(&field.name).copied().unwrap_or(0))
    }

    async fn field_sample_values(
        &self,
        _table: &Table,
        field: &Field,
        limit: usize,
    ) -> DriverResult<Vec<Option<String>>> {
        let mut samples = self.samples.get(&field.name).cloned().unwrap_or_default();
        samples.truncate(limit);
        Ok(samples)
    }

    async fn nested_field_types(
        &self,
        _table: &Table,
        field: &Field,
    ) -> DriverResult<HashMap<String, BaseType>> {
        Ok(self.nested.get(&field.name).cloned().unwrap_or_default())
    }

    async fn table_rows(
        &self,
        _database: &Database,
        _table_name: &str,
    ) -> DriverResult<Vec<MetadataRow>> {
        Ok(self.metadata_rows.clone())
    }

    async fn sync_field_hook(
        &self,
        _table: &Table,
        _field: &Field,
    ) -> DriverResult<Option<FieldPatch>> {
        Ok(None)
    }
}

/// An event bus that remembers everything published to it.
#[derive(Default)]
pub struct RecordingEventBus {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventBus for RecordingEventBus {
    fn publish(&self, event: SyncEvent) {
        self.events.lock().unwrap().push(event);
    }
}
