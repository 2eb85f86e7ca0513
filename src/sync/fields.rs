//! Field reconciliation: per-table diff of the driver's reported columns
//! against the catalog's active fields.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::catalog::{CatalogStore, Field, FieldPatch, NewField, Table, TablePatch};
use crate::driver::TableDescription;
use crate::error::{SyncError, SyncResult};

use super::infer::SpecialTypeInferrer;
use super::SyncContext;

/// What the reconciliation pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldChanges {
    pub created: usize,
    pub updated: usize,
    pub reactivated: usize,
    pub deactivated: usize,
}

impl FieldChanges {
    pub fn absorb(&mut self, other: FieldChanges) {
        self.created += other.created;
        self.updated += other.updated;
        self.reactivated += other.reactivated;
        self.deactivated += other.deactivated;
    }
}

/// Bring a table's top-level fields into agreement with the driver's
/// description.
///
/// New fields are inserted with an inferred special type and a derived
/// display name; existing fields are patched only where something
/// actually changed. A field description without a name is a contract
/// violation and aborts the sync.
pub(crate) async fn reconcile_table_fields(
    ctx: &SyncContext,
    inferrer: &SpecialTypeInferrer,
    catalog: &dyn CatalogStore,
    table: &Table,
    description: &TableDescription,
) -> SyncResult<FieldChanges> {
    for field in &description.fields {
        if field.name.is_empty() {
            return Err(SyncError::contract("describeTable", "field without a name"));
        }
    }

    // The table itself needs a display name before its fields do.
    if table.display_name.is_none() {
        catalog
            .update_table(
                table.id,
                TablePatch {
                    display_name: Some(catalog.name_to_human_readable(&table.name)),
                    ..Default::default()
                },
            )
            .await?;
    }

    let existing: HashMap<String, Field> = catalog
        .active_fields(table.id, None)
        .await?
        .into_iter()
        .map(|f| (f.name.clone(), f))
        .collect();
    if !ctx.quiet_catalog_log {
        debug!(
            table = %table.name,
            existing = existing.len(),
            incoming = description.fields.len(),
            "reconciling fields"
        );
    }

    let mut changes = FieldChanges::default();

    for field in existing.values() {
        if !description.fields.iter().any(|f| f.name == field.name) {
            info!(table = %table.name, field = %field.name, "marking field as inactive");
            catalog
                .update_field(
                    field.id,
                    FieldPatch {
                        active: Some(false),
                        ..Default::default()
                    },
                )
                .await?;
            changes.deactivated += 1;
        }
    }

    for incoming in &description.fields {
        match existing.get(&incoming.name) {
            Some(current) => {
                let special_type = current.special_type.or_else(|| {
                    inferrer.infer(&incoming.name, incoming.base_type, incoming.pk, None)
                });
                let display_name = current
                    .display_name
                    .clone()
                    .unwrap_or_else(|| catalog.name_to_human_readable(&incoming.name));

                let patch = FieldPatch {
                    base_type: (current.base_type != incoming.base_type)
                        .then_some(incoming.base_type),
                    special_type: (current.special_type != special_type)
                        .then_some(special_type)
                        .flatten(),
                    display_name: (current.display_name.as_deref() != Some(display_name.as_str()))
                        .then_some(display_name),
                    ..Default::default()
                };
                if !patch.is_empty() {
                    info!(table = %table.name, field = %incoming.name, "updating field metadata");
                    catalog.update_field(current.id, patch).await?;
                    changes.updated += 1;
                }
            }
            None => {
                let special_type =
                    inferrer.infer(&incoming.name, incoming.base_type, incoming.pk, None);
                // Reactivate a soft-deleted row of the same name rather
                // than inserting a duplicate.
                match catalog.field_by_name(table.id, None, &incoming.name).await? {
                    Some(prior) => {
                        info!(table = %table.name, field = %incoming.name, "reactivating field");
                        catalog
                            .update_field(
                                prior.id,
                                FieldPatch {
                                    active: Some(true),
                                    base_type: (prior.base_type != incoming.base_type)
                                        .then_some(incoming.base_type),
                                    special_type: prior
                                        .special_type
                                        .is_none()
                                        .then_some(special_type)
                                        .flatten(),
                                    ..Default::default()
                                },
                            )
                            .await?;
                        changes.reactivated += 1;
                    }
                    None => {
                        info!(table = %table.name, field = %incoming.name, "found new field");
                        catalog
                            .create_field(NewField {
                                table_id: table.id,
                                parent_id: None,
                                name: incoming.name.clone(),
                                base_type: incoming.base_type,
                                special_type,
                                display_name: Some(
                                    catalog.name_to_human_readable(&incoming.name),
                                ),
                            })
                            .await?;
                        changes.created += 1;
                    }
                }
            }
        }
    }

    Ok(changes)
}
