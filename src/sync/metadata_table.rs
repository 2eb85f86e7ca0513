//! Interpretation of the `_metabase_metadata` side-table.
//!
//! A source may ship a magic table whose rows are out-of-band patches to
//! the catalog: `{keypath, value}` pairs where the keypath addresses a
//! table (`table.property`) or a field (`table.field.property`). The
//! table itself never becomes a catalog row.
//!
//! Property keys are restricted to a closed allow-list per entity;
//! unknown keys are logged and skipped. Every row is processed in
//! isolation: one bad row never aborts the loop.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{error, info};

use crate::catalog::{CatalogStore, Database, FieldPatch, SpecialType, TablePatch};
use crate::driver::{DatabaseDescription, Driver, MetadataRow, TableIdent};
use crate::error::SyncResult;

/// Name of the magic side-table, compared case-insensitively.
pub const METADATA_TABLE_NAME: &str = "_metabase_metadata";

static KEYPATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^.]+)\.(?:([^.]+)\.)?([^.]+)$").unwrap());

/// The metadata side-table in a database description, if present.
pub(crate) fn find_metadata_table(description: &DatabaseDescription) -> Option<&TableIdent> {
    description
        .tables
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(METADATA_TABLE_NAME))
}

/// Render a JSON scalar the way a hand-written metadata table means it.
fn string_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn bool_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

/// Apply every row of the metadata side-table. Returns the number of
/// rows successfully applied.
pub(crate) async fn apply_metadata_table(
    driver: &dyn Driver,
    catalog: &dyn CatalogStore,
    database: &Database,
    table_name: &str,
) -> SyncResult<usize> {
    let rows = driver.table_rows(database, table_name).await?;
    info!(rows = rows.len(), "applying metadata table");

    let mut applied = 0;
    for row in &rows {
        match apply_row(catalog, database, row).await {
            Ok(true) => applied += 1,
            Ok(false) => {}
            Err(e) => error!(error = %e, "metadata row failed, continuing"),
        }
    }
    Ok(applied)
}

async fn apply_row(
    catalog: &dyn CatalogStore,
    database: &Database,
    row: &MetadataRow,
) -> SyncResult<bool> {
    let Some(keypath) = row.get("keypath").and_then(Value::as_str) else {
        error!("metadata row has no keypath");
        return Ok(false);
    };
    let Some(value) = row.get("value") else {
        error!(keypath, "metadata row has no value");
        return Ok(false);
    };
    let Some(captures) = KEYPATH_RE.captures(keypath) else {
        error!(keypath, "unparsable keypath");
        return Ok(false);
    };

    let table_name = &captures[1];
    let field_name = captures.get(2).map(|m| m.as_str());
    let property = &captures[3];

    let Some(table) = catalog.table_named(database.id, table_name).await? else {
        error!(keypath, "no table matched metadata keypath");
        return Ok(false);
    };

    let affected = match field_name {
        Some(field_name) => {
            let Some(field) = catalog.field_by_name(table.id, None, field_name).await? else {
                error!(keypath, "no field matched metadata keypath");
                return Ok(false);
            };
            let Some(patch) = field_patch(property, value) else {
                error!(keypath, property, "rejected field property or value");
                return Ok(false);
            };
            catalog.update_field(field.id, patch).await?
        }
        None => {
            let Some(patch) = table_patch(property, value) else {
                error!(keypath, property, "rejected table property or value");
                return Ok(false);
            };
            catalog.update_table(table.id, patch).await?
        }
    };

    if affected < 1 {
        error!(keypath, "metadata update affected no rows");
        return Ok(false);
    }
    Ok(true)
}

/// Allow-listed field properties.
fn field_patch(property: &str, value: &Value) -> Option<FieldPatch> {
    let mut patch = FieldPatch::default();
    match property {
        "description" => patch.description = Some(string_value(value)),
        "display_name" => patch.display_name = Some(string_value(value)),
        "special_type" => patch.special_type = Some(SpecialType::parse(&string_value(value))?),
        "preview_display" => patch.preview_display = Some(bool_value(value)?),
        _ => return None,
    }
    Some(patch)
}

/// Allow-listed table properties.
fn table_patch(property: &str, value: &Value) -> Option<TablePatch> {
    let mut patch = TablePatch::default();
    match property {
        "description" => patch.description = Some(string_value(value)),
        "display_name" => patch.display_name = Some(string_value(value)),
        "caveats" => patch.caveats = Some(string_value(value)),
        "points_of_interest" => patch.points_of_interest = Some(string_value(value)),
        "entity_type" => patch.entity_type = Some(string_value(value)),
        "show_in_getting_started" => patch.show_in_getting_started = Some(bool_value(value)?),
        _ => return None,
    }
    Some(patch)
}
