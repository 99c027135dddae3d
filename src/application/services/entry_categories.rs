//! Entry category assignment
//!
//! Resolves category full names for an entry and keeps entry counts in step
//! with the entry's membership.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::application::services::CategoryTreeService;
use crate::application::{ApplicationResult, PortResultExt};
use crate::domain::{Category, CategoryId, DomainError, EntryRef, TenantId};
use crate::infrastructure::traits::EntryAssociations;

/// Service assigning entries to categories.
pub struct EntryCategoryService {
    tree: Arc<CategoryTreeService>,
    entries: Arc<dyn EntryAssociations>,
}

impl EntryCategoryService {
    pub fn new(tree: Arc<CategoryTreeService>, entries: Arc<dyn EntryAssociations>) -> Self {
        Self { tree, entries }
    }

    /// Replace the entry's categories with `full_names`.
    ///
    /// Unknown names are created when `create_missing` is set and rejected
    /// otherwise. Blank names are ignored. Returns the new membership.
    pub fn assign_categories(
        &self,
        tenant: TenantId,
        entry: &EntryRef,
        full_names: &[String],
        create_missing: bool,
    ) -> ApplicationResult<BTreeSet<CategoryId>> {
        debug!(
            "assign_categories: tenant={} entry={} names={:?} create_missing={}",
            tenant, entry, full_names, create_missing
        );
        let mut new_ids = BTreeSet::new();
        for full_name in full_names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let category = match self.tree.find_by_full_name(tenant, full_name)? {
                Some(category) => category,
                None if create_missing => self.tree.create_by_path(tenant, full_name)?,
                None => return Err(DomainError::UnknownCategory(full_name.to_string()).into()),
            };
            new_ids.insert(category.id);
        }

        let old_ids = self.tree.reassign_entry(tenant, entry, &new_ids)?;
        if old_ids == new_ids {
            debug!("assign_categories: {} unchanged", entry);
            return Ok(new_ids);
        }
        info!(
            "entry {} now in {} categories (was {})",
            entry,
            new_ids.len(),
            old_ids.len()
        );
        Ok(new_ids)
    }

    /// The entry's current categories, sorted by full name.
    pub fn categories_of(
        &self,
        tenant: TenantId,
        entry: &EntryRef,
    ) -> ApplicationResult<Vec<Category>> {
        let ids = self
            .entries
            .categories_of(entry)
            .with_context("load categories of entry", entry)?;
        let mut categories = Vec::with_capacity(ids.len());
        for id in ids {
            match self.tree.get(tenant, id) {
                Ok(category) => categories.push(category),
                Err(e) if e.as_domain() == Some(&DomainError::NotFound(id)) => {
                    debug!("categories_of: {} refers to purged category {}", entry, id)
                }
                Err(e) => return Err(e),
            }
        }
        categories.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(categories)
    }
}
