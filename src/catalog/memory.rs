//! In-memory catalog store.
//!
//! Backs the test suite. Keeps the same soft-delete semantics as the real
//! store and counts writes so idempotence can be asserted.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    CatalogResult, CatalogStore, DatabaseId, Field, FieldId, FieldPatch, ForeignKey, NewField,
    NewTable, Table, TableId, TablePatch,
};

#[derive(Default)]
struct CatalogState {
    tables: Vec<Table>,
    fields: Vec<Field>,
    foreign_keys: Vec<ForeignKey>,
    next_table_id: TableId,
    next_field_id: FieldId,
    /// Distinct counts by field name, configured by tests.
    distinct_counts: HashMap<String, usize>,
    /// External row counts by table name, configured by tests.
    row_counts: HashMap<String, u64>,
    refreshed: Vec<FieldId>,
    writes: u64,
}

/// A [`CatalogStore`] held entirely in memory.
#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the distinct-value count reported for a field name.
    pub fn set_distinct_count(&self, field_name: &str, count: usize) {
        let mut state = self.state.lock().unwrap();
        state.distinct_counts.insert(field_name.to_string(), count);
    }

    /// Configure the external row count reported for a table name.
    pub fn set_row_count(&self, table_name: &str, rows: u64) {
        let mut state = self.state.lock().unwrap();
        state.row_counts.insert(table_name.to_string(), rows);
    }

    /// Number of catalog writes issued so far. Field-values refreshes are
    /// not counted; idempotence is defined net of them.
    pub fn write_count(&self) -> u64 {
        self.state.lock().unwrap().writes
    }

    /// Fields whose value cache was refreshed, in order.
    pub fn refreshed_field_ids(&self) -> Vec<FieldId> {
        self.state.lock().unwrap().refreshed.clone()
    }

    /// Fetch a table by name, active or not.
    pub fn table(&self, db_id: DatabaseId, name: &str) -> Option<Table> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .iter()
            .find(|t| t.db_id == db_id && t.name == name)
            .cloned()
    }

    /// Fetch a top-level field by name, active or not.
    pub fn field(&self, table_id: TableId, name: &str) -> Option<Field> {
        let state = self.state.lock().unwrap();
        state
            .fields
            .iter()
            .find(|f| f.table_id == table_id && f.parent_id.is_none() && f.name == name)
            .cloned()
    }

    /// Fetch a nested field by parent and name, active or not.
    pub fn nested_field(&self, parent_id: FieldId, name: &str) -> Option<Field> {
        let state = self.state.lock().unwrap();
        state
            .fields
            .iter()
            .find(|f| f.parent_id == Some(parent_id) && f.name == name)
            .cloned()
    }

    /// All fields of a table (any nesting level, any active state).
    pub fn all_fields(&self, table_id: TableId) -> Vec<Field> {
        let state = self.state.lock().unwrap();
        state
            .fields
            .iter()
            .filter(|f| f.table_id == table_id)
            .cloned()
            .collect()
    }

    /// Every foreign-key row.
    pub fn foreign_keys(&self) -> Vec<ForeignKey> {
        self.state.lock().unwrap().foreign_keys.clone()
    }
}

fn apply_table_patch(table: &mut Table, patch: &TablePatch) {
    if let Some(display_name) = &patch.display_name {
        table.display_name = Some(display_name.clone());
    }
    if let Some(description) = &patch.description {
        table.description = Some(description.clone());
    }
    if let Some(caveats) = &patch.caveats {
        table.caveats = Some(caveats.clone());
    }
    if let Some(points_of_interest) = &patch.points_of_interest {
        table.points_of_interest = Some(points_of_interest.clone());
    }
    if let Some(entity_type) = &patch.entity_type {
        table.entity_type = Some(entity_type.clone());
    }
    if let Some(show) = patch.show_in_getting_started {
        table.show_in_getting_started = show;
    }
    if let Some(rows) = patch.rows {
        table.rows = Some(rows);
    }
    if let Some(active) = patch.active {
        table.active = active;
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn active_tables(&self, db_id: DatabaseId) -> CatalogResult<Vec<Table>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .iter()
            .filter(|t| t.db_id == db_id && t.active)
            .cloned()
            .collect())
    }

    async fn table_by_name(
        &self,
        db_id: DatabaseId,
        name: &str,
        schema: Option<&str>,
    ) -> CatalogResult<Option<Table>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .iter()
            .find(|t| t.db_id == db_id && t.name == name && t.schema.as_deref() == schema)
            .cloned())
    }

    async fn table_named(&self, db_id: DatabaseId, name: &str) -> CatalogResult<Option<Table>> {
        let state = self.state.lock().unwrap();
        let mut candidates = state
            .tables
            .iter()
            .filter(|t| t.db_id == db_id && t.name == name);
        let first = candidates.next().cloned();
        let active = state
            .tables
            .iter()
            .find(|t| t.db_id == db_id && t.name == name && t.active)
            .cloned();
        Ok(active.or(first))
    }

    async fn create_table(&self, table: NewTable) -> CatalogResult<Table> {
        let mut state = self.state.lock().unwrap();
        state.next_table_id += 1;
        let row = Table {
            id: state.next_table_id,
            db_id: table.db_id,
            schema: table.schema,
            name: table.name,
            display_name: None,
            description: None,
            caveats: None,
            points_of_interest: None,
            entity_type: None,
            show_in_getting_started: false,
            rows: None,
            active: true,
        };
        state.tables.push(row.clone());
        state.writes += 1;
        Ok(row)
    }

    async fn update_table(&self, id: TableId, patch: TablePatch) -> CatalogResult<u64> {
        let mut state = self.state.lock().unwrap();
        let Some(table) = state.tables.iter_mut().find(|t| t.id == id) else {
            return Ok(0);
        };
        apply_table_patch(table, &patch);
        state.writes += 1;
        Ok(1)
    }

    async fn active_fields(
        &self,
        table_id: TableId,
        parent_id: Option<FieldId>,
    ) -> CatalogResult<Vec<Field>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .fields
            .iter()
            .filter(|f| f.table_id == table_id && f.parent_id == parent_id && f.active)
            .cloned()
            .collect())
    }

    async fn field_by_name(
        &self,
        table_id: TableId,
        parent_id: Option<FieldId>,
        name: &str,
    ) -> CatalogResult<Option<Field>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .fields
            .iter()
            .find(|f| f.table_id == table_id && f.parent_id == parent_id && f.name == name)
            .cloned())
    }

    async fn create_field(&self, field: NewField) -> CatalogResult<Field> {
        let mut state = self.state.lock().unwrap();
        state.next_field_id += 1;
        let row = Field {
            id: state.next_field_id,
            table_id: field.table_id,
            parent_id: field.parent_id,
            name: field.name,
            base_type: field.base_type,
            special_type: field.special_type,
            display_name: field.display_name,
            description: None,
            preview_display: true,
            active: true,
        };
        state.fields.push(row.clone());
        state.writes += 1;
        Ok(row)
    }

    async fn update_field(&self, id: FieldId, patch: FieldPatch) -> CatalogResult<u64> {
        let mut state = self.state.lock().unwrap();
        let Some(field) = state.fields.iter_mut().find(|f| f.id == id) else {
            return Ok(0);
        };
        field.apply(&patch);
        state.writes += 1;
        Ok(1)
    }

    async fn deactivate_table_fields(&self, table_id: TableId) -> CatalogResult<u64> {
        let mut state = self.state.lock().unwrap();
        let mut affected = 0;
        for field in state
            .fields
            .iter_mut()
            .filter(|f| f.table_id == table_id && f.active)
        {
            field.active = false;
            affected += 1;
        }
        if affected > 0 {
            state.writes += 1;
        }
        Ok(affected)
    }

    async fn foreign_key_for_origin(
        &self,
        origin_field_id: FieldId,
    ) -> CatalogResult<Option<ForeignKey>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .foreign_keys
            .iter()
            .find(|fk| fk.origin_field_id == origin_field_id)
            .cloned())
    }

    async fn create_foreign_key(&self, fk: ForeignKey) -> CatalogResult<()> {
        let mut state = self.state.lock().unwrap();
        state.foreign_keys.push(fk);
        state.writes += 1;
        Ok(())
    }

    async fn field_distinct_count(
        &self,
        field: &Field,
        cap: Option<usize>,
    ) -> CatalogResult<usize> {
        let state = self.state.lock().unwrap();
        let count = state.distinct_counts.get(&field.name).copied().unwrap_or(0);
        Ok(match cap {
            Some(cap) => count.min(cap),
            None => count,
        })
    }

    async fn table_row_count(&self, table: &Table) -> CatalogResult<u64> {
        let state = self.state.lock().unwrap();
        Ok(state.row_counts.get(&table.name).copied().unwrap_or(0))
    }

    async fn field_should_have_values(&self, field: &Field) -> CatalogResult<bool> {
        Ok(field.special_type == Some(super::SpecialType::Category)
            || field.base_type == super::BaseType::Boolean)
    }

    async fn refresh_field_values(&self, field: &Field) -> CatalogResult<()> {
        let mut state = self.state.lock().unwrap();
        state.refreshed.push(field.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{BaseType, SpecialType};
    use super::*;

    #[tokio::test]
    async fn test_create_and_patch_field() {
        let catalog = MemoryCatalog::new();
        let table = catalog
            .create_table(NewTable {
                db_id: 1,
                schema: None,
                name: "users".to_string(),
            })
            .await
            .unwrap();

        let field = catalog
            .create_field(NewField {
                table_id: table.id,
                parent_id: None,
                name: "email".to_string(),
                base_type: BaseType::Char,
                special_type: None,
                display_name: Some("Email".to_string()),
            })
            .await
            .unwrap();
        assert!(field.preview_display);
        assert!(field.active);

        let affected = catalog
            .update_field(
                field.id,
                FieldPatch {
                    special_type: Some(SpecialType::Category),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let stored = catalog.field(table.id, "email").unwrap();
        assert_eq!(stored.special_type, Some(SpecialType::Category));
        assert_eq!(catalog.write_count(), 3);
    }

    #[tokio::test]
    async fn test_update_missing_row_affects_zero() {
        let catalog = MemoryCatalog::new();
        let affected = catalog
            .update_field(999, FieldPatch::default())
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_deactivate_table_fields_is_batch() {
        let catalog = MemoryCatalog::new();
        let table = catalog
            .create_table(NewTable {
                db_id: 1,
                schema: None,
                name: "orders".to_string(),
            })
            .await
            .unwrap();
        for name in ["id", "total"] {
            catalog
                .create_field(NewField {
                    table_id: table.id,
                    parent_id: None,
                    name: name.to_string(),
                    base_type: BaseType::Integer,
                    special_type: None,
                    display_name: None,
                })
                .await
                .unwrap();
        }

        let affected = catalog.deactivate_table_fields(table.id).await.unwrap();
        assert_eq!(affected, 2);
        assert!(catalog
            .active_fields(table.id, None)
            .await
            .unwrap()
            .is_empty());
    }
}
