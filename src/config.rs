//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/cattree/cattree.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `CATTREE_*` prefix

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::{
    TreeConfig, DEFAULT_CHUNKED_LOAD_THRESHOLD, DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_MAX_CATEGORIES,
};
use crate::application::ApplicationError;
use crate::domain::rules::{DEFAULT_SEPARATOR, MAX_CATEGORY_DEPTH, MAX_CATEGORY_NAME_LENGTH};
use crate::domain::TreeRules;

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Full-name separator (default: "/")
    pub separator: String,
    /// Categories must stay below this depth
    pub max_depth: u32,
    /// Leaf names are truncated to this many characters
    pub max_name_length: usize,
    /// Active categories allowed per tenant
    pub max_categories: usize,
    /// Category count that enables chunked loading for a tenant
    pub chunked_load_threshold: usize,
    /// Wait for the tenant lock before failing as busy
    pub lock_timeout_ms: u64,
    /// Snapshot file used by the CLI
    pub data_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            max_depth: MAX_CATEGORY_DEPTH,
            max_name_length: MAX_CATEGORY_NAME_LENGTH,
            max_categories: DEFAULT_MAX_CATEGORIES,
            chunked_load_threshold: DEFAULT_CHUNKED_LOAD_THRESHOLD,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            data_file: default_data_file(),
        }
    }
}

/// Default snapshot location (`<data dir>/cattree/categories.toml`).
fn default_data_file() -> PathBuf {
    ProjectDirs::from("", "", "cattree")
        .map(|dirs| dirs.data_dir().join("categories.toml"))
        .unwrap_or_else(|| PathBuf::from("~/.cattree/categories.toml"))
}

/// Get the XDG config directory for cattree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cattree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("cattree.toml"))
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file; it must exist when given
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("separator", defaults.separator.clone())
            .map_err(config_err)?
            .set_default("max_depth", defaults.max_depth as u64)
            .map_err(config_err)?
            .set_default("max_name_length", defaults.max_name_length as u64)
            .map_err(config_err)?
            .set_default("max_categories", defaults.max_categories as u64)
            .map_err(config_err)?
            .set_default(
                "chunked_load_threshold",
                defaults.chunked_load_threshold as u64,
            )
            .map_err(config_err)?
            .set_default("lock_timeout_ms", defaults.lock_timeout_ms)
            .map_err(config_err)?
            .set_default(
                "data_file",
                defaults.data_file.to_string_lossy().to_string(),
            )
            .map_err(config_err)?;

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CATTREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;

        settings.expand_paths()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) -> Result<(), ApplicationError> {
        let raw = self.data_file.to_string_lossy().to_string();
        let expanded = shellexpand::full(&raw).map_err(|e| ApplicationError::Config {
            message: format!("expand data_file {raw:?}: {e}"),
        })?;
        self.data_file = PathBuf::from(expanded.as_ref());
        Ok(())
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        let problem = if self.separator.chars().count() != 1 {
            Some("separator must be exactly one character")
        } else if self.max_depth == 0 {
            Some("max_depth must be at least 1")
        } else if self.max_name_length == 0 {
            Some("max_name_length must be at least 1")
        } else {
            None
        };
        match problem {
            Some(message) => Err(ApplicationError::Config {
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Naming and depth rules.
    pub fn rules(&self) -> TreeRules {
        TreeRules {
            separator: self.separator.clone(),
            max_depth: self.max_depth,
            max_name_length: self.max_name_length,
        }
    }

    /// Everything the tree service enforces.
    pub fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            rules: self.rules(),
            max_categories: self.max_categories,
            chunked_load_threshold: self.chunked_load_threshold,
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# cattree configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/cattree/cattree.toml
#   Explicit: --config <file>
#   Env:      CATTREE_* environment variables (e.g. CATTREE_MAX_DEPTH=6)

# Separator joining names into full names
# separator = "/"

# Categories must stay below this depth (roots are depth 0)
# max_depth = 8

# Leaf names are truncated to this many characters
# max_name_length = 60

# Active categories allowed per tenant
# max_categories = 1500

# Category count at which a tenant switches to chunked loading
# chunked_load_threshold = 1000

# How long a structural change waits for the tenant lock
# lock_timeout_ms = 2000

# Snapshot file used by the CLI (~ and $VAR are expanded)
# data_file = "~/.local/share/cattree/categories.toml"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
