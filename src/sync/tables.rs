//! Table reconciliation: diff the driver's reported tables against the
//! catalog, deactivating the missing and creating (or reactivating) the
//! new.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::catalog::{CatalogStore, Database, NewTable, Table, TablePatch};
use crate::driver::DatabaseDescription;
use crate::error::{SyncError, SyncResult};

use super::metadata_table::METADATA_TABLE_NAME;
use super::SyncContext;

/// What the reconciliation pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableChanges {
    pub created: usize,
    pub reactivated: usize,
    pub deactivated: usize,
}

type TableKey = (String, Option<String>);

fn key_of(name: &str, schema: Option<&str>) -> TableKey {
    (name.to_string(), schema.map(str::to_string))
}

/// Bring the catalog's table set for `database` into agreement with the
/// driver's description.
///
/// The metadata side-table is filtered out entirely; it never becomes a
/// catalog row. Malformed descriptions (an element without a name) are a
/// contract violation and abort the sync.
pub(crate) async fn reconcile_tables(
    ctx: &SyncContext,
    catalog: &dyn CatalogStore,
    database: &Database,
    description: &DatabaseDescription,
) -> SyncResult<TableChanges> {
    let mut incoming: HashSet<TableKey> = HashSet::new();
    for ident in &description.tables {
        if ident.name.is_empty() {
            return Err(SyncError::contract(
                "describeDatabase",
                "table without a name",
            ));
        }
        if ident.name.eq_ignore_ascii_case(METADATA_TABLE_NAME) {
            continue;
        }
        incoming.insert(key_of(&ident.name, ident.schema.as_deref()));
    }

    let existing: HashMap<TableKey, Table> = catalog
        .active_tables(database.id)
        .await?
        .into_iter()
        .map(|t| (key_of(&t.name, t.schema.as_deref()), t))
        .collect();

    let mut changes = TableChanges::default();

    for (key, table) in &existing {
        if !incoming.contains(key) {
            info!(table = %table.name, "marking table as inactive");
            catalog
                .update_table(
                    table.id,
                    TablePatch {
                        active: Some(false),
                        ..Default::default()
                    },
                )
                .await?;
            catalog.deactivate_table_fields(table.id).await?;
            changes.deactivated += 1;
        }
    }

    for (name, schema) in &incoming {
        if existing.contains_key(&key_of(name, schema.as_deref())) {
            continue;
        }
        // A soft-deleted row with the same identity is reactivated rather
        // than duplicated.
        match catalog
            .table_by_name(database.id, name, schema.as_deref())
            .await?
        {
            Some(prior) if !prior.active => {
                info!(table = %name, "reactivating table");
                catalog
                    .update_table(
                        prior.id,
                        TablePatch {
                            active: Some(true),
                            ..Default::default()
                        },
                    )
                    .await?;
                changes.reactivated += 1;
            }
            Some(_) => {
                if !ctx.quiet_catalog_log {
                    debug!(table = %name, "table already active, nothing to do");
                }
            }
            None => {
                info!(table = %name, "found new table");
                catalog
                    .create_table(NewTable {
                        db_id: database.id,
                        schema: schema.clone(),
                        name: name.clone(),
                    })
                    .await?;
                changes.created += 1;
            }
        }
    }

    Ok(changes)
}
