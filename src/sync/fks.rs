//! Foreign-key linking: second-pass resolution of driver-reported FK
//! triples into catalog links.
//!
//! Runs only after every table has been field-reconciled, because a
//! destination may live in a table synced later in the same run.

use tracing::{debug, info};

use crate::catalog::{
    CatalogStore, Database, FieldPatch, ForeignKey, Relationship, SpecialType, Table,
};
use crate::driver::ForeignKeyDescription;
use crate::error::{SyncError, SyncResult};

use super::SyncContext;

/// Link the foreign keys the driver reports for one table. Returns the
/// number of links created.
///
/// Unresolvable legs (origin column, destination table, destination
/// column) skip the triple; resolution failures are expected while a
/// schema is in flux. Origin fields are promoted to `special_type = fk`
/// even when something else was inferred earlier: a live FK constraint
/// outranks name heuristics.
pub(crate) async fn reconcile_table_fks(
    ctx: &SyncContext,
    catalog: &dyn CatalogStore,
    database: &Database,
    table: &Table,
    fks: &[ForeignKeyDescription],
) -> SyncResult<usize> {
    let mut linked = 0;

    for fk in fks {
        if fk.fk_column_name.is_empty() || fk.dest_table.name.is_empty() || fk.dest_column_name.is_empty()
        {
            return Err(SyncError::contract(
                "describeTableFks",
                "foreign key with an empty column or table name",
            ));
        }

        let Some(origin) = catalog
            .field_by_name(table.id, None, &fk.fk_column_name)
            .await?
            .filter(|f| f.active)
        else {
            if !ctx.quiet_catalog_log {
                debug!(table = %table.name, column = %fk.fk_column_name, "fk origin not found, skipping");
            }
            continue;
        };

        let Some(dest_table) = catalog
            .table_by_name(
                database.id,
                &fk.dest_table.name,
                fk.dest_table.schema.as_deref(),
            )
            .await?
            .filter(|t| t.active)
        else {
            if !ctx.quiet_catalog_log {
                debug!(table = %fk.dest_table.name, "fk destination table not found, skipping");
            }
            continue;
        };

        let Some(destination) = catalog
            .field_by_name(dest_table.id, None, &fk.dest_column_name)
            .await?
            .filter(|f| f.active)
        else {
            if !ctx.quiet_catalog_log {
                debug!(
                    table = %dest_table.name,
                    column = %fk.dest_column_name,
                    "fk destination column not found, skipping"
                );
            }
            continue;
        };

        if catalog.foreign_key_for_origin(origin.id).await?.is_none() {
            info!(
                origin = %format!("{}.{}", table.name, origin.name),
                destination = %format!("{}.{}", dest_table.name, destination.name),
                "linking foreign key"
            );
            catalog
                .create_foreign_key(ForeignKey {
                    origin_field_id: origin.id,
                    destination_field_id: destination.id,
                    relationship: Relationship::ManyToOne,
                })
                .await?;
            linked += 1;
        }

        if origin.special_type != Some(SpecialType::Fk) {
            catalog
                .update_field(
                    origin.id,
                    FieldPatch {
                        special_type: Some(SpecialType::Fk),
                        ..Default::default()
                    },
                )
                .await?;
        }
    }

    Ok(linked)
}
