//! # ArrSync Core
//!
//! The reconciliation engine. Given the canonical desired state of one instance and the
//! state reported by its server, it computes the minimal set of create, update and delete
//! operations and applies them through an [`arr_client::ArrClient`].
//!
//! ## Components
//!
//! - [`structural_diff`] - deep comparison of request shapes with array-shape rules
//! - [`score_resolver`] - effective custom-format scores from score sets and overrides
//! - [`custom_formats`] - custom-format create / update / no-op decisions and deletion of
//!   unmanaged formats
//! - [`quality_definitions`] - quality size envelopes with preferred-size interpolation
//! - [`quality_profiles`] - quality lists, cutoffs and per-format scores of profiles
//! - [`sync`] - the [`InstanceSynchronizer`] running the stages in order
//!
//! ## Examples
//!
//! ```no_run
//! use arr_client::ArrHttpClient;
//! use arr_sync_core::{InstanceSynchronizer, SyncOptions};
//!
//! # async fn example(config: arr_config::CanonicalConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArrHttpClient::new(&config.base_url, config.api_key.clone())?;
//! let report = InstanceSynchronizer::new(&client, SyncOptions { dry_run: true })
//!     .sync(&config)
//!     .await;
//! println!("{} errors", report.errors.len());
//! # Ok(())
//! # }
//! ```

pub mod custom_formats;
pub mod diff;
pub mod errors;
pub mod quality_definitions;
pub mod quality_profiles;
pub mod score_resolver;
pub mod structural_diff;
pub mod sync;

pub use diff::DiffResult;
pub use errors::{SyncError, SyncResult};
pub use quality_definitions::{interpolate_preferred_size, QualityDefinitionDiff};
pub use quality_profiles::{QualityCatalogueEntry, QualityProfileDiff, QualityProfileReconciler};
pub use score_resolver::resolve_score;
pub use structural_diff::{compare, StructuralDiff};
pub use sync::{InstanceSynchronizer, StageSummary, SyncOptions, SyncReport};
