//! Catalog records and the store abstraction the sync engine writes through.
//!
//! The catalog is the application's own picture of every registered data
//! source: which tables it has, which fields they carry, how fields relate,
//! and what semantic annotations have been inferred or curated. The sync
//! engine is the only writer here; everything else in the product reads.
//!
//! Rows are soft-deleted: reconciliation flips `active` off, it never
//! removes anything.

mod memory;
pub mod types;

pub use memory::MemoryCatalog;
pub use types::{BaseType, SpecialType};

use async_trait::async_trait;
use inflector::Inflector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a registered database.
pub type DatabaseId = i64;
/// Identifier of a catalog table row.
pub type TableId = i64;
/// Identifier of a catalog field row.
pub type FieldId = i64;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors from the catalog store backend.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Referenced a table row that does not exist.
    #[error("table {0} not found")]
    TableNotFound(TableId),

    /// Referenced a field row that does not exist.
    #[error("field {0} not found")]
    FieldNotFound(FieldId),

    /// The backing store failed.
    #[error("catalog backend error: {0}")]
    Backend(String),
}

/// A registered external data source. Read-only to the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub id: DatabaseId,
    pub name: String,
}

/// A table of a registered database.
///
/// Unique within a database by `(schema, name)`; an absent schema is a
/// distinct key, not a wildcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub db_id: DatabaseId,
    pub schema: Option<String>,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub caveats: Option<String>,
    pub points_of_interest: Option<String>,
    pub entity_type: Option<String>,
    pub show_in_getting_started: bool,
    /// Row count as of the last full sync.
    pub rows: Option<u64>,
    pub active: bool,
}

/// A column of a table, or a subkey of a document column.
///
/// Unique within a table by `(parent_id, name)`. Top-level fields have no
/// parent; children of a [`BaseType::Dictionary`] field reference the
/// enclosing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub table_id: TableId,
    pub parent_id: Option<FieldId>,
    pub name: String,
    pub base_type: BaseType,
    pub special_type: Option<SpecialType>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Whether row previews show this column. Cleared for very wide
    /// columns and for JSON columns.
    pub preview_display: bool,
    pub active: bool,
}

impl Field {
    /// Apply a patch to this in-memory view, mirroring what the store
    /// would persist. Lets classifier stages thread an updated record
    /// forward without re-reading it.
    pub fn apply(&mut self, patch: &FieldPatch) {
        if let Some(base_type) = patch.base_type {
            self.base_type = base_type;
        }
        if let Some(special_type) = patch.special_type {
            self.special_type = Some(special_type);
        }
        if let Some(display_name) = &patch.display_name {
            self.display_name = Some(display_name.clone());
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(preview_display) = patch.preview_display {
            self.preview_display = preview_display;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
    }
}

/// How a foreign key's origin relates to its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Relationship {
    #[default]
    ManyToOne,
    OneToOne,
}

/// A link from a foreign-key column to the column it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub origin_field_id: FieldId,
    pub destination_field_id: FieldId,
    pub relationship: Relationship,
}

/// Attributes for creating a table row. `active` is implied true.
#[derive(Debug, Clone)]
pub struct NewTable {
    pub db_id: DatabaseId,
    pub schema: Option<String>,
    pub name: String,
}

/// Attributes for creating a field row. `preview_display` and `active`
/// are implied true.
#[derive(Debug, Clone)]
pub struct NewField {
    pub table_id: TableId,
    pub parent_id: Option<FieldId>,
    pub name: String,
    pub base_type: BaseType,
    pub special_type: Option<SpecialType>,
    pub display_name: Option<String>,
}

/// Partial update of a table row. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TablePatch {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub caveats: Option<String>,
    pub points_of_interest: Option<String>,
    pub entity_type: Option<String>,
    pub show_in_getting_started: Option<bool>,
    pub rows: Option<u64>,
    pub active: Option<bool>,
}

impl TablePatch {
    /// Whether this patch would write nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Partial update of a field row. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    pub base_type: Option<BaseType>,
    pub special_type: Option<SpecialType>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub preview_display: Option<bool>,
    pub active: Option<bool>,
}

impl FieldPatch {
    /// Whether this patch would write nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Derive a human-readable display name from a column or table name.
///
/// `"user_id"` becomes `"User Id"`, `"createdAt"` becomes `"Created At"`.
pub fn humanize_name(name: &str) -> String {
    name.to_title_case()
}

/// Persistence surface the sync engine writes through.
///
/// Implemented by the application's catalog database; [`MemoryCatalog`]
/// provides an in-memory implementation for tests. Every method is a
/// blocking I/O point from the engine's perspective; the engine issues
/// them strictly sequentially.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All active tables of a database.
    async fn active_tables(&self, db_id: DatabaseId) -> CatalogResult<Vec<Table>>;

    /// Look up a table by `(db_id, name, schema)`, active or not.
    async fn table_by_name(
        &self,
        db_id: DatabaseId,
        name: &str,
        schema: Option<&str>,
    ) -> CatalogResult<Option<Table>>;

    /// Look up a table by name alone, preferring an active row. Used by
    /// the metadata-table interpreter, whose keypaths carry no schema.
    async fn table_named(&self, db_id: DatabaseId, name: &str) -> CatalogResult<Option<Table>>;

    /// Insert a table row with `active = true`.
    async fn create_table(&self, table: NewTable) -> CatalogResult<Table>;

    /// Patch a table row. Returns the number of rows affected.
    async fn update_table(&self, id: TableId, patch: TablePatch) -> CatalogResult<u64>;

    /// Active fields of a table at one nesting level: `parent_id = None`
    /// selects top-level fields, `Some(id)` the children of that field.
    async fn active_fields(
        &self,
        table_id: TableId,
        parent_id: Option<FieldId>,
    ) -> CatalogResult<Vec<Field>>;

    /// Look up a field by `(table_id, parent_id, name)`, active or not.
    async fn field_by_name(
        &self,
        table_id: TableId,
        parent_id: Option<FieldId>,
        name: &str,
    ) -> CatalogResult<Option<Field>>;

    /// Insert a field row with `preview_display = true, active = true`.
    async fn create_field(&self, field: NewField) -> CatalogResult<Field>;

    /// Patch a field row. Returns the number of rows affected.
    async fn update_field(&self, id: FieldId, patch: FieldPatch) -> CatalogResult<u64>;

    /// Mark every field of a table inactive in one batch.
    async fn deactivate_table_fields(&self, table_id: TableId) -> CatalogResult<u64>;

    /// The foreign key originating at a field, if one exists.
    async fn foreign_key_for_origin(
        &self,
        origin_field_id: FieldId,
    ) -> CatalogResult<Option<ForeignKey>>;

    /// Insert a foreign-key row.
    async fn create_foreign_key(&self, fk: ForeignKey) -> CatalogResult<()>;

    /// Distinct-value count for a field, capped when `cap` is given.
    async fn field_distinct_count(
        &self,
        field: &Field,
        cap: Option<usize>,
    ) -> CatalogResult<usize>;

    /// Current row count of a table in the external source.
    async fn table_row_count(&self, table: &Table) -> CatalogResult<u64>;

    /// Whether the field-values collaborator wants a cache for this field.
    async fn field_should_have_values(&self, field: &Field) -> CatalogResult<bool>;

    /// Refresh (or create) the cached distinct values for a field.
    async fn refresh_field_values(&self, field: &Field) -> CatalogResult<()>;

    /// Derive a display name from a raw table or column name.
    fn name_to_human_readable(&self, name: &str) -> String {
        humanize_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_name() {
        assert_eq!(humanize_name("user_id"), "User Id");
        assert_eq!(humanize_name("createdAt"), "Created At");
        assert_eq!(humanize_name("orders"), "Orders");
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(FieldPatch::default().is_empty());
        assert!(TablePatch::default().is_empty());

        let patch = FieldPatch {
            special_type: Some(SpecialType::Url),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_field_apply_patch() {
        let mut field = Field {
            id: 1,
            table_id: 1,
            parent_id: None,
            name: "payload".to_string(),
            base_type: BaseType::Text,
            special_type: None,
            display_name: None,
            description: None,
            preview_display: true,
            active: true,
        };

        field.apply(&FieldPatch {
            special_type: Some(SpecialType::Json),
            preview_display: Some(false),
            ..Default::default()
        });

        assert_eq!(field.special_type, Some(SpecialType::Json));
        assert!(!field.preview_display);
        assert_eq!(field.base_type, BaseType::Text); // untouched
    }
}
