//! TOML snapshot of the in-memory collaborators.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Category, TenantId};
use crate::infrastructure::memory::EntryRecord;
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{InfraError, InfraResult};

/// Everything the CLI keeps between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "first_id")]
    pub next_id: u64,
    #[serde(default)]
    pub flagged_tenants: Vec<TenantId>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub entries: Vec<EntryRecord>,
}

fn first_id() -> u64 {
    1
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            next_id: first_id(),
            flagged_tenants: Vec::new(),
            categories: Vec::new(),
            entries: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Read a snapshot; a missing file yields an empty one.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> InfraResult<Self> {
        if !fs.exists(path) {
            debug!("load: no snapshot at {}", path.display());
            return Ok(Self::default());
        }
        let content = fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read snapshot {}", path.display()), e))?;
        let snapshot: Self = toml::from_str(&content).map_err(|e| InfraError::Snapshot {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(
            "load: {} categories, {} entries from {}",
            snapshot.categories.len(),
            snapshot.entries.len(),
            path.display()
        );
        Ok(snapshot)
    }

    /// Write through a sibling temp file so a failed write keeps the old snapshot.
    pub fn save(&self, fs: &dyn FileSystem, path: &Path) -> InfraResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| InfraError::Snapshot {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs.ensure_parent(path)
            .map_err(|e| InfraError::io(format!("create parent of {}", path.display()), e))?;

        let tmp = path.with_extension("toml.tmp");
        fs.write(&tmp, &content)
            .map_err(|e| InfraError::io(format!("write snapshot {}", tmp.display()), e))?;
        fs.rename(&tmp, path)
            .map_err(|e| InfraError::io(format!("replace snapshot {}", path.display()), e))?;
        debug!("save: {} categories to {}", self.categories.len(), path.display());
        Ok(())
    }
}
