//! Run settings of the arr-sync CLI.
//!
//! Every setting can be given as a command-line argument or through the environment,
//! which is how the tool is usually configured when it runs in a container.

use std::path::{Path, PathBuf};

use clap::{builder::FalseyValueParser, Args};

/// Default location of the desired-state configuration
pub const DEFAULT_CONFIG_LOCATION: &str = "config.yml";

/// Default location of the secrets file
pub const DEFAULT_SECRETS_LOCATION: &str = "secrets.yml";

/// Default directory holding the git checkouts
pub const DEFAULT_ROOT_PATH: &str = "./repos";

/// Checkout directory of the TRaSH guides, below the root path
const GUIDE_CHECKOUT_DIR: &str = "trash-guides";

/// Checkout directory of the recyclarr templates, below the root path
const RECYCLARR_CHECKOUT_DIR: &str = "recyclarr-templates";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Settings shared by all commands.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Path of the YAML configuration file
    #[arg(long = "config", env = "CONFIG_LOCATION", default_value = DEFAULT_CONFIG_LOCATION, global = true)]
    pub config_location: PathBuf,

    /// Path of the YAML secrets file used by `!secret` tags
    #[arg(long = "secrets", env = "SECRETS_LOCATION", default_value = DEFAULT_SECRETS_LOCATION, global = true)]
    pub secrets_location: PathBuf,

    /// Directory in which the guide and template repositories are checked out
    #[arg(long, env = "ROOT_PATH", default_value = DEFAULT_ROOT_PATH, global = true)]
    pub root_path: PathBuf,

    /// Compute every change but do not apply it
    #[arg(long, env = "DRY_RUN", value_parser = FalseyValueParser::new(), global = true)]
    pub dry_run: bool,

    /// Log level used when ARR_SYNC_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,
}

impl RunSettings {
    pub fn guide_checkout_dir(&self) -> PathBuf {
        self.root_path.join(GUIDE_CHECKOUT_DIR)
    }

    pub fn recyclarr_checkout_dir(&self) -> PathBuf {
        self.root_path.join(RECYCLARR_CHECKOUT_DIR)
    }

    pub fn config_location(&self) -> &Path {
        &self.config_location
    }

    pub fn secrets_location(&self) -> &Path {
        &self.secrets_location
    }
}
