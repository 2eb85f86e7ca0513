//! Content classification of individual fields.
//!
//! Classifiers run as a fixed pipeline over one field: a driver-specific
//! hook, then the URL marker, the preview-width marker, the
//! category/field-values pass, the JSON marker, and finally nested-field
//! reconciliation for document columns. Each stage takes the current
//! field record and yields a patch (or nothing); the pipeline persists
//! the patch and folds the updated record forward so later stages see it
//! without re-reading the catalog.
//!
//! Stages are individually isolated: a failing stage is logged and the
//! pipeline moves on with the field unchanged. Classification never sets
//! a special type over an existing one.

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::catalog::{
    BaseType, CatalogStore, Field, FieldPatch, NewField, SpecialType, Table,
};
use crate::config::SyncSettings;
use crate::driver::{Capability, Driver};
use crate::error::{SyncError, SyncResult};

use super::infer::SpecialTypeInferrer;
use super::SyncContext;

pub(crate) struct FieldClassifier<'a> {
    pub settings: &'a SyncSettings,
    pub inferrer: &'a SpecialTypeInferrer,
}

impl FieldClassifier<'_> {
    /// Run the pipeline over one field, returning the final record.
    ///
    /// When `full_sync` is false only the driver hook, the URL marker,
    /// and nested-field reconciliation run; the sampling-heavy stages
    /// are skipped.
    pub fn classify<'a>(
        &'a self,
        ctx: &'a SyncContext,
        driver: &'a dyn Driver,
        catalog: &'a dyn CatalogStore,
        table: &'a Table,
        field: Field,
        full_sync: bool,
    ) -> BoxFuture<'a, Field> {
        Box::pin(async move {
            let mut field = field;

            let outcome = driver
                .sync_field_hook(table, &field)
                .await
                .map_err(SyncError::from);
            self.apply_stage("driver-hook", catalog, &mut field, outcome).await;

            let outcome = self.url_patch(driver, table, &field).await;
            self.apply_stage("url", catalog, &mut field, outcome).await;

            if full_sync {
                let outcome = self.preview_patch(driver, table, &field).await;
                self.apply_stage("preview-display", catalog, &mut field, outcome)
                    .await;

                let outcome = self.category_patch(ctx, catalog, &field).await;
                self.apply_stage("category", catalog, &mut field, outcome).await;

                let outcome = self.json_patch(driver, table, &field).await;
                self.apply_stage("json", catalog, &mut field, outcome).await;
            }

            if field.base_type == BaseType::Dictionary
                && driver.has_feature(Capability::NestedFields)
            {
                if let Err(e) = self
                    .sync_nested_fields(ctx, driver, catalog, table, &field, full_sync)
                    .await
                {
                    error!(
                        field = %field.name,
                        stage = "nested-fields",
                        error = %e,
                        "classifier stage failed, skipping"
                    );
                }
            }

            field
        })
    }

    /// Persist a stage's patch and fold it into the working record; a
    /// failed stage leaves the record as it was.
    async fn apply_stage(
        &self,
        stage: &str,
        catalog: &dyn CatalogStore,
        field: &mut Field,
        outcome: SyncResult<Option<FieldPatch>>,
    ) {
        let patch = match outcome {
            Ok(Some(patch)) if !patch.is_empty() => patch,
            Ok(_) => return,
            Err(e) => {
                error!(field = %field.name, stage, error = %e, "classifier stage failed, skipping");
                return;
            }
        };
        match catalog.update_field(field.id, patch.clone()).await {
            Ok(_) => field.apply(&patch),
            Err(e) => {
                error!(field = %field.name, stage, error = %e, "classifier stage failed, skipping");
            }
        }
    }

    /// Mark a textual field whose sampled values are almost all URLs.
    async fn url_patch(
        &self,
        driver: &dyn Driver,
        table: &Table,
        field: &Field,
    ) -> SyncResult<Option<FieldPatch>> {
        if field.special_type.is_some() || !field.base_type.is_text() {
            return Ok(None);
        }
        let ratio = driver.field_percent_urls(table, field).await?;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(SyncError::contract(
                "fieldPercentUrls",
                format!("ratio {ratio} outside [0, 1]"),
            ));
        }
        if ratio > self.settings.url_threshold {
            info!(field = %field.name, ratio, "marking field as url");
            return Ok(Some(FieldPatch {
                special_type: Some(SpecialType::Url),
                ..Default::default()
            }));
        }
        Ok(None)
    }

    /// Drop very wide textual fields from row previews.
    async fn preview_patch(
        &self,
        driver: &dyn Driver,
        table: &Table,
        field: &Field,
    ) -> SyncResult<Option<FieldPatch>> {
        if !field.preview_display || !field.base_type.is_text() {
            return Ok(None);
        }
        let avg_length = driver.field_avg_length(table, field).await?;
        if avg_length > self.settings.avg_length_threshold {
            info!(field = %field.name, avg_length, "excluding wide field from previews");
            return Ok(Some(FieldPatch {
                preview_display: Some(false),
                ..Default::default()
            }));
        }
        Ok(None)
    }

    /// Mark low-cardinality fields as categories, or refresh the value
    /// cache of fields that already qualify for one.
    async fn category_patch(
        &self,
        ctx: &SyncContext,
        catalog: &dyn CatalogStore,
        field: &Field,
    ) -> SyncResult<Option<FieldPatch>> {
        if field.special_type.is_none() && field.preview_display {
            if !ctx.quiet_query_log {
                debug!(field = %field.name, "counting distinct values");
            }
            let distinct = catalog
                .field_distinct_count(field, Some(self.settings.cardinality_threshold))
                .await?;
            if distinct > 0 && distinct < self.settings.cardinality_threshold {
                info!(field = %field.name, distinct, "marking field as category");
                return Ok(Some(FieldPatch {
                    special_type: Some(SpecialType::Category),
                    ..Default::default()
                }));
            }
        } else if catalog.field_should_have_values(field).await? {
            debug!(field = %field.name, "refreshing cached field values");
            catalog.refresh_field_values(field).await?;
        }
        Ok(None)
    }

    /// Mark textual fields whose every sampled value is a JSON object or
    /// array.
    async fn json_patch(
        &self,
        driver: &dyn Driver,
        table: &Table,
        field: &Field,
    ) -> SyncResult<Option<FieldPatch>> {
        if field.special_type.is_some() || !field.base_type.is_text() {
            return Ok(None);
        }
        let samples = driver
            .field_sample_values(table, field, self.settings.json_sample_cap)
            .await?;
        if json_qualifies(&samples) {
            info!(field = %field.name, "marking field as json");
            return Ok(Some(FieldPatch {
                special_type: Some(SpecialType::Json),
                preview_display: Some(false),
                ..Default::default()
            }));
        }
        Ok(None)
    }

    /// Reconcile the children of a document column against the driver's
    /// current subkey map, recursing into each new child.
    async fn sync_nested_fields(
        &self,
        ctx: &SyncContext,
        driver: &dyn Driver,
        catalog: &dyn CatalogStore,
        table: &Table,
        field: &Field,
        full_sync: bool,
    ) -> SyncResult<()> {
        let child_types = driver.nested_field_types(table, field).await?;
        let existing = catalog.active_fields(table.id, Some(field.id)).await?;

        for child in &existing {
            if !child_types.contains_key(&child.name) {
                info!(parent = %field.name, field = %child.name, "marking nested field as inactive");
                catalog
                    .update_field(
                        child.id,
                        FieldPatch {
                            active: Some(false),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
        }

        for (name, base_type) in &child_types {
            if existing.iter().any(|c| &c.name == name) {
                continue;
            }
            let child = match catalog.field_by_name(table.id, Some(field.id), name).await? {
                Some(mut prior) => {
                    info!(parent = %field.name, field = %name, "reactivating nested field");
                    let patch = FieldPatch {
                        active: Some(true),
                        base_type: (prior.base_type != *base_type).then_some(*base_type),
                        ..Default::default()
                    };
                    catalog.update_field(prior.id, patch.clone()).await?;
                    prior.apply(&patch);
                    prior
                }
                None => {
                    info!(parent = %field.name, field = %name, "found new nested field");
                    catalog
                        .create_field(NewField {
                            table_id: table.id,
                            parent_id: Some(field.id),
                            name: name.clone(),
                            base_type: *base_type,
                            special_type: self.inferrer.infer(name, *base_type, false, None),
                            display_name: Some(catalog.name_to_human_readable(name)),
                        })
                        .await?
                }
            };
            self.classify(ctx, driver, catalog, table, child, full_sync)
                .await;
        }

        Ok(())
    }
}

/// Whether a sample set qualifies a field as JSON: at least one non-blank
/// value, and every non-blank value parses as a JSON object or array.
/// Scalars disqualify; nulls and blanks are ignored.
fn json_qualifies(samples: &[Option<String>]) -> bool {
    let mut saw_value = false;
    for sample in samples.iter().flatten() {
        let trimmed = sample.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(_)) | Ok(Value::Array(_)) => saw_value = true,
            _ => return false,
        }
    }
    saw_value
}
