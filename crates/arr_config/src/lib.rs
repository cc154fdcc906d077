//! Desired-state configuration for arr-sync.
//!
//! This crate turns the user's configuration file, the TRaSH guides, reusable templates and
//! ad-hoc URL templates into one [`CanonicalConfig`] per managed instance:
//!
//! ```text
//! load_input_config ──► InputConfig
//!                          │ per instance
//!                          ▼
//! TemplateSources ──► TemplateMerger ──► MergedConfig
//!                                           │
//! TrashGuide ──► CustomFormatCatalog ───────┤
//!                                           ▼
//!                                     CanonicalConfig
//! ```

pub mod canonical;
pub mod catalog;
pub mod errors;
pub mod git_checkout;
pub mod guide;
pub mod input;
pub mod loader;
pub mod merger;
pub mod specification;
pub mod template_source;

#[cfg(test)]
mod test_support;

pub use canonical::{
    CanonicalConfig, CanonicalCustomFormat, CanonicalQualityDefinition, CanonicalQualityEntry,
    CanonicalQualityProfile, DeleteUnmanagedPolicy, DesiredQualitySize, ResetUnmatchedScores,
    ProfileScore, UpgradePolicy, DEFAULT_SCORE_SET,
};
pub use catalog::CustomFormatCatalog;
pub use errors::{ConfigurationError, ConfigurationResult};
pub use git_checkout::GitCheckout;
pub use guide::{GuideCustomFormat, TrashGuide, TrashQualityProfile, TrashQualitySize};
pub use input::{ArrType, ConfigFragment, IncludeEntry, InputConfig, InstanceConfig, QualitySort, TemplateSourceKind};
pub use loader::{load_input_config, load_secrets, parse_input_config, Secrets};
pub use merger::{merge_fragments, MergedConfig, TemplateMerger};
pub use specification::{Specification, SpecificationFields};
pub use template_source::{
    FilesystemTemplateSource, GuideProfileSource, HttpTemplateSource, TemplateSource,
    TemplateSources,
};
