//! Assembly of the canonical configuration of every enabled instance.

use std::path::PathBuf;

use arr_config::{
    ArrType, CanonicalConfig, CustomFormatCatalog, GitCheckout, InputConfig, InstanceConfig,
    TemplateMerger, TemplateSources, TrashGuide,
};
use tracing::{debug, info, instrument, warn};

use crate::config::RunSettings;
use crate::errors::Error;

#[cfg(test)]
#[path = "instances_tests.rs"]
mod tests;

/// Local roots of the guide and recyclarr template repositories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkouts {
    pub guide: Option<PathBuf>,
    pub recyclarr: Option<PathBuf>,
}

impl Checkouts {
    /// Clones or updates both repositories below the settings' root path.
    ///
    /// git2 is blocking, so the work runs on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when a clone, fetch or reset fails.
    #[instrument(skip(input, settings), fields(root = ?settings.root_path))]
    pub async fn ensure(input: &InputConfig, settings: &RunSettings) -> Result<Self, Error> {
        let guide = checkout(
            input.trash_guide_url(),
            input.trash_revision(),
            settings.guide_checkout_dir(),
        )
        .await?;
        let recyclarr = checkout(
            input.recyclarr_config_url(),
            input.recyclarr_revision(),
            settings.recyclarr_checkout_dir(),
        )
        .await?;

        Ok(Self {
            guide: Some(guide.path().to_path_buf()),
            recyclarr: Some(recyclarr.path().to_path_buf()),
        })
    }

    /// The checkouts already present below the root path, without touching the network.
    pub fn existing(settings: &RunSettings) -> Self {
        let present = |dir: PathBuf| {
            if dir.join(".git").exists() {
                Some(dir)
            } else {
                warn!(path = ?dir, "No checkout found, templates from it are unavailable");
                None
            }
        };
        Self {
            guide: present(settings.guide_checkout_dir()),
            recyclarr: present(settings.recyclarr_checkout_dir()),
        }
    }
}

async fn checkout(url: &str, revision: &str, dest: PathBuf) -> Result<GitCheckout, Error> {
    let url = url.to_string();
    let revision = revision.to_string();
    let checkout = tokio::task::spawn_blocking(move || GitCheckout::ensure(&url, &revision, &dest))
        .await
        .map_err(|e| Error::Task(e.to_string()))??;
    info!(
        path = ?checkout.path(),
        revision = checkout.revision(),
        commit = checkout.commit(),
        "Repository checkout ready"
    );
    Ok(checkout)
}

/// One enabled instance with its canonical configuration, or the reason it could not be
/// assembled.
#[derive(Debug)]
pub struct PreparedInstance {
    pub arr_type: ArrType,
    pub name: String,
    pub config: Result<CanonicalConfig, Error>,
}

impl PreparedInstance {
    /// `<arr>.<name>`, as used in log lines and the run summary.
    pub fn label(&self) -> String {
        format!("{}.{}", self.arr_type, self.name)
    }
}

/// Merges and assembles every enabled instance: Sonarr instances first, then Radarr, each
/// in name order. Disabled instances are skipped.
pub async fn prepare_instances(input: &InputConfig, checkouts: &Checkouts) -> Vec<PreparedInstance> {
    let mut prepared = Vec::new();
    for (arr_type, name, instance) in input.instances() {
        if !instance.enabled {
            info!(instance = %format!("{}.{}", arr_type, name), "Instance is disabled, skipping");
            continue;
        }
        let config = build_instance(input, checkouts, arr_type, name, instance).await;
        prepared.push(PreparedInstance {
            arr_type,
            name: name.to_string(),
            config,
        });
    }
    prepared
}

async fn build_instance(
    input: &InputConfig,
    checkouts: &Checkouts,
    arr_type: ArrType,
    name: &str,
    instance: &InstanceConfig,
) -> Result<CanonicalConfig, Error> {
    let guide = checkouts
        .guide
        .as_deref()
        .map(|root| TrashGuide::new(root, arr_type));

    let sources = TemplateSources::standard(
        arr_type,
        input.local_config_templates_path.as_deref(),
        checkouts.recyclarr.as_deref(),
        checkouts.guide.as_deref(),
    )?;
    let merged = TemplateMerger::new(&sources).merge(&instance.fragment).await;

    let catalog = CustomFormatCatalog::build(
        guide.as_ref(),
        input.local_custom_formats_path.as_deref(),
        &input.custom_format_definitions,
        &merged.custom_format_definitions,
    )?;
    let quality_sizes = match &guide {
        Some(guide) => guide.quality_sizes()?,
        None => Vec::new(),
    };
    debug!(
        instance = %format!("{}.{}", arr_type, name),
        catalog = catalog.len(),
        quality_sizes = quality_sizes.len(),
        "Sources loaded"
    );

    Ok(CanonicalConfig::build(
        arr_type,
        name,
        instance,
        merged,
        &catalog,
        &quality_sizes,
    )?)
}
