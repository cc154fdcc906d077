//! Applies the reconcilers' decisions to one managed instance.
//!
//! Stages run strictly in order because each consumes the output of the one before:
//!
//! 1. custom formats: diff, create and update, build the name -> id map, delete unmanaged;
//! 2. quality definitions: diff and bulk update;
//! 3. quality profiles: diff against the quality catalogue and the id map, create and update.
//!
//! A failed create, update or delete fails that entity only and is collected in the
//! report. A failed listing call aborts the remaining stages of the instance. In dry-run
//! mode every mutating call is replaced by an `info!` line starting with `DryRun:`.

use crate::custom_formats;
use crate::errors::SyncError;
use crate::quality_definitions;
use crate::quality_profiles::{QualityCatalogueEntry, QualityProfileReconciler};
use arr_client::{ArrClient, ServerQualityDefinition};
use arr_config::CanonicalConfig;
use std::collections::BTreeMap;
use tracing::{error, info, instrument, warn};

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;

/// Run-level switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Compute every diff but skip all mutating calls
    pub dry_run: bool,
}

/// Per-stage entity counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Outcome of one instance run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub instance: String,
    pub custom_formats: StageSummary,
    pub quality_definitions: StageSummary,
    pub quality_profiles: StageSummary,
    /// Every failure, in the order it happened
    pub errors: Vec<SyncError>,
    /// `true` when a listing call failed and later stages were skipped
    pub aborted: bool,
}

impl SyncReport {
    fn new(instance: &str) -> Self {
        Self {
            instance: instance.to_string(),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && !self.aborted
    }

    fn abort(&mut self, error: SyncError) {
        error!(instance = %self.instance, error = %error, "Aborting instance synchronization");
        self.errors.push(error);
        self.aborted = true;
    }
}

/// Synchronizes one instance through an explicitly passed client.
pub struct InstanceSynchronizer<'a, C: ArrClient + ?Sized> {
    client: &'a C,
    options: SyncOptions,
}

impl<'a, C: ArrClient + ?Sized> InstanceSynchronizer<'a, C> {
    pub fn new(client: &'a C, options: SyncOptions) -> Self {
        Self { client, options }
    }

    /// Runs every stage against the instance described by `config`.
    ///
    /// Never fails as a whole: failures are reported through [`SyncReport::errors`].
    #[instrument(skip(self, config), fields(instance = %config.instance_name, dry_run = self.options.dry_run))]
    pub async fn sync(&self, config: &CanonicalConfig) -> SyncReport {
        let mut report = SyncReport::new(&config.instance_name);
        info!(
            custom_formats = config.custom_formats.len(),
            quality_profiles = config.quality_profiles.len(),
            "Synchronizing instance"
        );

        let Some(format_ids) = self.sync_custom_formats(config, &mut report).await else {
            return report;
        };
        let Some(definitions) = self.sync_quality_definitions(config, &mut report).await else {
            return report;
        };
        self.sync_quality_profiles(config, &definitions, &format_ids, &mut report)
            .await;

        info!(
            errors = report.errors.len(),
            custom_formats = ?report.custom_formats,
            quality_definitions = ?report.quality_definitions,
            quality_profiles = ?report.quality_profiles,
            "Instance synchronization finished"
        );
        report
    }

    /// Returns the name -> id map of the server's formats after the stage, or `None` when
    /// the server formats could not be listed.
    async fn sync_custom_formats(
        &self,
        config: &CanonicalConfig,
        report: &mut SyncReport,
    ) -> Option<BTreeMap<String, i64>> {
        let server = match self.client.list_custom_formats().await {
            Ok(server) => server,
            Err(e) => {
                report.abort(SyncError::remote("list", "custom formats", &config.instance_name, &e));
                return None;
            }
        };

        let diff = custom_formats::reconcile(&config.custom_formats, &server);
        let mut ids = custom_formats::id_map(&server);
        let summary = &mut report.custom_formats;
        summary.unchanged = diff.unchanged.len();

        for payload in &diff.to_create {
            if self.options.dry_run {
                info!(name = %payload.name, "DryRun: would create custom format");
                summary.created += 1;
                continue;
            }
            match self.client.create_custom_format(payload).await {
                Ok(created) => {
                    info!(name = %created.name, id = ?created.id, "Created custom format");
                    if let Some(id) = created.id {
                        ids.insert(created.name, id);
                    }
                    summary.created += 1;
                }
                Err(e) => {
                    warn!(name = %payload.name, error = %e, "Failed to create custom format");
                    summary.failed += 1;
                    report.errors.push(SyncError::remote("create", "custom format", &payload.name, &e));
                }
            }
        }

        for payload in &diff.to_update {
            let changes = diff.change_log.get(&payload.name).cloned().unwrap_or_default();
            if self.options.dry_run {
                info!(name = %payload.name, changes = ?changes, "DryRun: would update custom format");
                summary.updated += 1;
                continue;
            }
            match self.client.update_custom_format(payload).await {
                Ok(_) => {
                    info!(name = %payload.name, changes = ?changes, "Updated custom format");
                    summary.updated += 1;
                }
                Err(e) => {
                    warn!(name = %payload.name, error = %e, "Failed to update custom format");
                    summary.failed += 1;
                    report.errors.push(SyncError::remote("update", "custom format", &payload.name, &e));
                }
            }
        }

        let managed: Vec<String> = config.custom_formats.iter().map(|cf| cf.name.clone()).collect();
        for stray in custom_formats::find_unmanaged(&server, &managed, &config.delete_unmanaged) {
            let Some(id) = stray.id else { continue };
            if self.options.dry_run {
                info!(name = %stray.name, id, "DryRun: would delete unmanaged custom format");
                summary.deleted += 1;
                continue;
            }
            match self.client.delete_custom_format(id).await {
                Ok(()) => {
                    info!(name = %stray.name, id, "Deleted unmanaged custom format");
                    ids.remove(&stray.name);
                    summary.deleted += 1;
                }
                Err(e) => {
                    warn!(name = %stray.name, error = %e, "Failed to delete custom format");
                    summary.failed += 1;
                    report.errors.push(SyncError::remote("delete", "custom format", &stray.name, &e));
                }
            }
        }

        Some(ids)
    }

    /// Returns the server's definitions, needed for the quality catalogue, or `None` when
    /// they could not be listed.
    async fn sync_quality_definitions(
        &self,
        config: &CanonicalConfig,
        report: &mut SyncReport,
    ) -> Option<Vec<ServerQualityDefinition>> {
        let server = match self.client.list_quality_definitions().await {
            Ok(server) => server,
            Err(e) => {
                report.abort(SyncError::remote(
                    "list",
                    "quality definitions",
                    &config.instance_name,
                    &e,
                ));
                return None;
            }
        };

        let Some(desired) = &config.quality_definition else {
            return Some(server);
        };

        let diff = quality_definitions::reconcile(&server, desired);
        let summary = &mut report.quality_definitions;
        summary.unchanged = desired
            .entries
            .len()
            .saturating_sub(diff.change_map.len() + diff.create.len());
        for entry in &diff.create {
            warn!(quality = %entry.quality, "Quality definition cannot be created, skipping");
            summary.failed += 1;
        }

        if !diff.has_changes() {
            return Some(server);
        }

        if self.options.dry_run {
            for (quality, changes) in &diff.change_map {
                info!(quality = %quality, changes = ?changes, "DryRun: would update quality definition");
            }
            summary.updated = diff.change_map.len();
            return Some(server);
        }

        match self.client.update_quality_definitions(&diff.rest_data).await {
            Ok(updated) => {
                info!(count = diff.change_map.len(), "Updated quality definitions");
                summary.updated = diff.change_map.len();
                Some(updated)
            }
            Err(e) => {
                warn!(error = %e, "Failed to update quality definitions");
                summary.failed += diff.change_map.len();
                report.errors.push(SyncError::remote(
                    "update",
                    "quality definitions",
                    &desired.kind,
                    &e,
                ));
                Some(server)
            }
        }
    }

    async fn sync_quality_profiles(
        &self,
        config: &CanonicalConfig,
        definitions: &[ServerQualityDefinition],
        format_ids: &BTreeMap<String, i64>,
        report: &mut SyncReport,
    ) {
        let server = match self.client.list_quality_profiles().await {
            Ok(server) => server,
            Err(e) => {
                report.abort(SyncError::remote(
                    "list",
                    "quality profiles",
                    &config.instance_name,
                    &e,
                ));
                return;
            }
        };

        let catalogue = QualityCatalogueEntry::from_definitions(definitions);
        let reconciler = QualityProfileReconciler::new(&catalogue, &config.custom_formats, format_ids);
        let result = reconciler.reconcile(&config.quality_profiles, &server);

        let summary = &mut report.quality_profiles;
        summary.unchanged = result.diff.unchanged.len();
        summary.failed += result.errors.len();
        report.errors.extend(result.errors);

        for profile in &result.diff.to_create {
            if self.options.dry_run {
                info!(name = %profile.name, "DryRun: would create quality profile");
                summary.created += 1;
                continue;
            }
            match self.client.create_quality_profile(profile).await {
                Ok(created) => {
                    info!(name = %created.name, id = ?created.id, "Created quality profile");
                    summary.created += 1;
                }
                Err(e) => {
                    warn!(name = %profile.name, error = %e, "Failed to create quality profile");
                    summary.failed += 1;
                    report.errors.push(SyncError::remote("create", "quality profile", &profile.name, &e));
                }
            }
        }

        for profile in &result.diff.to_update {
            let changes = result.diff.change_log.get(&profile.name).cloned().unwrap_or_default();
            if self.options.dry_run {
                info!(name = %profile.name, changes = ?changes, "DryRun: would update quality profile");
                summary.updated += 1;
                continue;
            }
            match self.client.update_quality_profile(profile).await {
                Ok(_) => {
                    info!(name = %profile.name, changes = ?changes, "Updated quality profile");
                    summary.updated += 1;
                }
                Err(e) => {
                    warn!(name = %profile.name, error = %e, "Failed to update quality profile");
                    summary.failed += 1;
                    report.errors.push(SyncError::remote("update", "quality profile", &profile.name, &e));
                }
            }
        }
    }
}
