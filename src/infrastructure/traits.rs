//! Collaborator traits (ports)
//!
//! The category tree core only talks to persistence, entry storage,
//! notification and tenant policy through these traits, so services
//! can be wired to any backend and tested with recording fakes.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::domain::{Category, CategoryEvent, CategoryId, Changeset, EntryRef, TenantId};

/// Error reported by a collaborator.
#[derive(Error, Debug)]
pub enum PortError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for collaborator calls.
pub type PortResult<T> = Result<T, PortError>;

/// Category persistence.
///
/// Every lookup except `get_by_id` and `get_by_parent_id_any` sees
/// active categories only.
pub trait CategoryStore: Send + Sync {
    /// Point lookup, including soft-deleted rows.
    fn get_by_id(&self, tenant: TenantId, id: CategoryId) -> PortResult<Option<Category>>;

    /// Direct children of `parent`, or the roots when `None`.
    fn get_by_parent_id(
        &self,
        tenant: TenantId,
        parent: Option<CategoryId>,
    ) -> PortResult<Vec<Category>>;

    /// Direct children of `parent`, including soft-deleted rows.
    fn get_by_parent_id_any(
        &self,
        tenant: TenantId,
        parent: CategoryId,
    ) -> PortResult<Vec<Category>>;

    fn get_by_full_name_exact(
        &self,
        tenant: TenantId,
        full_name: &str,
    ) -> PortResult<Option<Category>>;

    fn get_by_full_name_prefix(&self, tenant: TenantId, prefix: &str)
        -> PortResult<Vec<Category>>;

    /// Number of active categories of the tenant.
    fn count_all(&self, tenant: TenantId) -> PortResult<usize>;

    /// Every active category of the tenant.
    fn list(&self, tenant: TenantId) -> PortResult<Vec<Category>>;

    /// Reserve an id for a new category.
    fn allocate_id(&self) -> PortResult<CategoryId>;

    fn upsert(&self, category: &Category) -> PortResult<()>;

    fn delete(&self, tenant: TenantId, id: CategoryId) -> PortResult<()>;

    /// Apply a changeset. Backends with transactions should apply it atomically;
    /// the default applies writes one by one.
    fn commit(&self, changes: Changeset) -> PortResult<()> {
        for category in &changes.upserts {
            self.upsert(category)?;
        }
        for (tenant, id) in changes.deletes {
            self.delete(tenant, id)?;
        }
        Ok(())
    }
}

/// Entry membership in categories, owned by the entry store.
pub trait EntryAssociations: Send + Sync {
    /// Entries whose membership includes any of `ids`.
    fn find_entries_by_category_subtree(
        &self,
        tenant: TenantId,
        ids: &BTreeSet<CategoryId>,
    ) -> PortResult<Vec<EntryRef>>;

    fn rename_category_on_entry(
        &self,
        entry: &EntryRef,
        old_full_name: &str,
        new_full_name: &str,
    ) -> PortResult<()>;

    fn remove_category_from_entry(&self, entry: &EntryRef, full_name: &str) -> PortResult<()>;

    /// Recompute the entry's membership after a rename or removal.
    fn resync_entry_categories(&self, entry: &EntryRef) -> PortResult<()>;

    /// Current membership of the entry (empty for unknown entries).
    fn categories_of(&self, entry: &EntryRef) -> PortResult<BTreeSet<CategoryId>>;

    /// Replace the entry's membership.
    fn assign(
        &self,
        tenant: TenantId,
        entry: &EntryRef,
        ids: &BTreeSet<CategoryId>,
    ) -> PortResult<()>;
}

/// Event sink. Called after commit; failures never undo the change.
pub trait Notifier: Send + Sync {
    fn raise(&self, event: &CategoryEvent) -> PortResult<()>;
}

/// Tenant policy hooks.
pub trait QuotaPolicy: Send + Sync {
    /// The tenant's category count reached the chunked-load threshold.
    fn on_category_count_threshold_crossed(&self, tenant: TenantId) -> PortResult<()>;
}

/// Filesystem abstraction for snapshot persistence.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;

    /// Replace `to` with `from`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }
}
