//! Category tree maintenance service
//!
//! Keeps full names, depths and entry counts of a tenant's tree consistent
//! across create, rename, move and delete.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::application::services::tenant_lock::TenantLocks;
use crate::application::{ApplicationResult, PortResultExt};
use crate::domain::{
    CascadePlan, Category, CategoryEvent, CategoryForest, CategoryId, Changeset, DomainError,
    EntryRef, MembershipSettings, TenantId, TreeRules,
};
use crate::infrastructure::traits::{CategoryStore, EntryAssociations, Notifier, QuotaPolicy};

/// Default tenant category limit.
pub const DEFAULT_MAX_CATEGORIES: usize = 1500;

/// Default category count at which the chunked-load hook fires.
pub const DEFAULT_CHUNKED_LOAD_THRESHOLD: usize = 1000;

/// Default wait for the tenant lock.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2000;

/// Limits and rules the service enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    pub rules: TreeRules,
    pub max_categories: usize,
    pub chunked_load_threshold: usize,
    pub lock_timeout: Duration,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            rules: TreeRules::default(),
            max_categories: DEFAULT_MAX_CATEGORIES,
            chunked_load_threshold: DEFAULT_CHUNKED_LOAD_THRESHOLD,
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }
}

/// How `delete` removes a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Mark rows deleted and raise `ObjectDeleted` for each.
    #[default]
    Soft,
    /// Remove rows.
    Hard,
}

/// Service maintaining a tenant's category tree.
///
/// Public mutating methods take the tenant lock; the `*_locked` helpers
/// assume it is held and never take it again.
pub struct CategoryTreeService {
    store: Arc<dyn CategoryStore>,
    entries: Arc<dyn EntryAssociations>,
    notifier: Arc<dyn Notifier>,
    quota: Arc<dyn QuotaPolicy>,
    config: TreeConfig,
    locks: TenantLocks,
}

impl CategoryTreeService {
    pub fn new(
        store: Arc<dyn CategoryStore>,
        entries: Arc<dyn EntryAssociations>,
        notifier: Arc<dyn Notifier>,
        quota: Arc<dyn QuotaPolicy>,
        config: TreeConfig,
    ) -> Self {
        Self {
            store,
            entries,
            notifier,
            quota,
            config,
            locks: TenantLocks::new(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn rules(&self) -> &TreeRules {
        &self.config.rules
    }

    fn with_lock<T>(
        &self,
        tenant: TenantId,
        f: impl FnOnce() -> ApplicationResult<T>,
    ) -> ApplicationResult<T> {
        self.locks.with_lock(tenant, self.config.lock_timeout, f)
    }

    // ============================================================
    // CREATE
    // ============================================================

    /// Create `name` under `parent`, or as a root.
    pub fn create(
        &self,
        tenant: TenantId,
        name: &str,
        parent: Option<CategoryId>,
    ) -> ApplicationResult<Category> {
        debug!("create: tenant={} name={:?} parent={:?}", tenant, name, parent);
        self.with_lock(tenant, || self.create_locked(tenant, name, parent))
    }

    fn create_locked(
        &self,
        tenant: TenantId,
        name: &str,
        parent: Option<CategoryId>,
    ) -> ApplicationResult<Category> {
        let rules = &self.config.rules;
        let name = rules.parse_name(name)?;
        let parent = parent
            .map(|id| self.require_active(tenant, id))
            .transpose()?;

        let count = self
            .store
            .count_all(tenant)
            .with_context("count categories of tenant", tenant)?;
        if count >= self.config.max_categories {
            return Err(DomainError::TenantQuotaExceeded {
                tenant,
                max: self.config.max_categories,
            }
            .into());
        }

        let depth = parent.as_ref().map(|p| p.depth + 1).unwrap_or(0);
        let full_name = rules.join(parent.as_ref().map(|p| p.full_name.as_str()), &name);
        rules.check_depth(&full_name, depth)?;
        self.ensure_unique(tenant, &full_name, &BTreeSet::new())?;

        let id = self
            .store
            .allocate_id()
            .with_context("allocate id for", &full_name)?;
        let mut category = Category::new(id, tenant);
        category.name = name;
        category.full_name = full_name;
        category.depth = depth;
        category.parent_id = parent.as_ref().map(|p| p.id);
        category.apply_inheritance(parent.as_ref());

        let mut changes = Changeset::new();
        changes.upsert(category.clone());
        self.store
            .commit(changes)
            .with_context("create category", &category.full_name)?;
        info!("created category {}", category);

        if count == self.config.chunked_load_threshold {
            self.threshold_crossed(tenant);
        }
        self.raise(CategoryEvent::ObjectAdded(category.clone()));
        Ok(category)
    }

    /// Materialize every missing prefix of `full_path` and return the leaf.
    pub fn create_by_path(&self, tenant: TenantId, full_path: &str) -> ApplicationResult<Category> {
        debug!("create_by_path: tenant={} path={:?}", tenant, full_path);
        self.with_lock(tenant, || self.create_by_path_locked(tenant, full_path))
    }

    fn create_by_path_locked(
        &self,
        tenant: TenantId,
        full_path: &str,
    ) -> ApplicationResult<Category> {
        let rules = &self.config.rules;
        let mut parent: Option<Category> = None;
        for segment in rules.split_path(full_path)? {
            let name = rules.parse_name(segment)?;
            let full_name = rules.join(parent.as_ref().map(|p| p.full_name.as_str()), &name);
            let existing = self
                .store
                .get_by_full_name_exact(tenant, &full_name)
                .with_context("look up", &full_name)?;
            let category = match existing {
                Some(category) => category,
                None => self.create_locked(tenant, &name, parent.as_ref().map(|p| p.id))?,
            };
            parent = Some(category);
        }
        parent.ok_or_else(|| DomainError::InvalidName(full_path.to_string()).into())
    }

    // ============================================================
    // RENAME / REPARENT
    // ============================================================

    /// Rename a category, cascading full names to its descendants.
    pub fn rename(
        &self,
        tenant: TenantId,
        id: CategoryId,
        new_name: &str,
    ) -> ApplicationResult<Category> {
        debug!("rename: tenant={} id={} new_name={:?}", tenant, id, new_name);
        self.with_lock(tenant, || {
            let name = self.config.rules.parse_name(new_name)?;
            let category = self.require_active(tenant, id)?;
            if category.name == name {
                debug!("rename: {} already named {:?}", category, name);
                return Ok(category);
            }
            let parent = self.parent_of(&category)?;
            self.restructure(tenant, &category, &name, parent.as_ref())
        })
    }

    /// Move a category under `new_parent`, or to the root level when `None`.
    pub fn reparent(
        &self,
        tenant: TenantId,
        id: CategoryId,
        new_parent: Option<CategoryId>,
    ) -> ApplicationResult<Category> {
        debug!("reparent: tenant={} id={} new_parent={:?}", tenant, id, new_parent);
        self.with_lock(tenant, || self.reparent_locked(tenant, id, new_parent))
    }

    fn reparent_locked(
        &self,
        tenant: TenantId,
        id: CategoryId,
        new_parent: Option<CategoryId>,
    ) -> ApplicationResult<Category> {
        let category = self.require_active(tenant, id)?;
        if let Some(parent_id) = new_parent {
            self.ensure_not_in_subtree(tenant, id, parent_id)?;
        }
        let parent = new_parent
            .map(|pid| self.require_active(tenant, pid))
            .transpose()?;
        if category.parent_id == new_parent {
            debug!("reparent: {} already under {:?}", category, new_parent);
            return Ok(category);
        }

        let old_parent = category.parent_id;
        let moved = self.restructure(tenant, &category, &category.name, parent.as_ref())?;

        let mut chain = Vec::new();
        for start in [old_parent, new_parent].into_iter().flatten() {
            chain.push(start);
            chain.extend(self.ancestor_ids(tenant, start)?);
        }
        for ancestor in chain.into_iter().unique() {
            self.recount_locked(tenant, ancestor)?;
        }
        Ok(moved)
    }

    /// Plan, validate and commit a new position for `category`, then rewrite
    /// the entries directly associated with it.
    fn restructure(
        &self,
        tenant: TenantId,
        category: &Category,
        name: &str,
        parent: Option<&Category>,
    ) -> ApplicationResult<Category> {
        let rules = &self.config.rules;
        let plan = CascadePlan::build(rules, category, name, parent, |id| {
            self.store.get_by_parent_id(tenant, Some(id))
        })
        .with_context("load subtree of", category)?;

        plan.check_depth(rules)?;
        let members = plan.ids();
        for step in plan.changed() {
            if step.full_name != step.old_full_name() {
                self.ensure_unique(tenant, &step.full_name, &members)?;
            }
        }

        let now = Utc::now();
        let mut root = plan.root().updated(now);
        root.apply_inheritance(parent);
        let mut changes = Changeset::new();
        changes.upsert(root.clone());
        for step in plan.steps().iter().skip(1).filter(|s| !s.is_noop()) {
            changes.upsert(step.updated(now));
        }
        let written = changes.len();
        self.store
            .commit(changes)
            .with_context("commit cascade of", category)?;
        info!(
            "moved {} to {} ({} categories updated)",
            category.full_name, root.full_name, written
        );

        if root.full_name != category.full_name {
            for entry in self.direct_entries(tenant, root.id)? {
                self.entries
                    .rename_category_on_entry(&entry, &category.full_name, &root.full_name)
                    .with_context("rename category on entry", &entry)?;
            }
        }
        Ok(root)
    }

    /// Walk the subtree of `id`; fail when `candidate` is found in it.
    fn ensure_not_in_subtree(
        &self,
        tenant: TenantId,
        id: CategoryId,
        candidate: CategoryId,
    ) -> ApplicationResult<()> {
        if id == candidate {
            return Err(DomainError::CycleDetected {
                category: id,
                parent: candidate,
            }
            .into());
        }
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            for child in self
                .store
                .get_by_parent_id(tenant, Some(current))
                .with_context("load children of", current)?
            {
                if child.id == candidate {
                    return Err(DomainError::CycleDetected {
                        category: id,
                        parent: candidate,
                    }
                    .into());
                }
                pending.push(child.id);
            }
        }
        Ok(())
    }

    // ============================================================
    // DELETE
    // ============================================================

    /// Delete a category and its subtree, children first.
    ///
    /// Entries of every deleted category move to its parent (or lose the
    /// category when it is a root) before the rows are committed.
    pub fn delete(&self, tenant: TenantId, id: CategoryId, mode: DeleteMode) -> ApplicationResult<()> {
        debug!("delete: tenant={} id={} mode={:?}", tenant, id, mode);
        self.with_lock(tenant, || self.delete_locked(tenant, id, mode))
    }

    fn delete_locked(
        &self,
        tenant: TenantId,
        id: CategoryId,
        mode: DeleteMode,
    ) -> ApplicationResult<()> {
        let category = match mode {
            DeleteMode::Soft => self.require_active(tenant, id)?,
            DeleteMode::Hard => self
                .store
                .get_by_id(tenant, id)
                .with_context("load category", id)?
                .ok_or(DomainError::NotFound(id))?,
        };

        let mut doomed = Vec::new();
        self.detach_subtree(tenant, &category, mode, &mut doomed)?;

        let now = Utc::now();
        let mut changes = Changeset::new();
        let mut deleted = Vec::new();
        for mut c in doomed {
            match mode {
                DeleteMode::Soft if c.is_active() => {
                    c.mark_deleted(now);
                    changes.upsert(c.clone());
                    deleted.push(c);
                }
                DeleteMode::Soft => {}
                DeleteMode::Hard => changes.delete(tenant, c.id),
            }
        }
        let written = changes.len();
        self.store
            .commit(changes)
            .with_context("delete subtree of", &category)?;
        info!("deleted {} ({:?}, {} categories)", category, mode, written);

        for c in deleted {
            self.raise(CategoryEvent::ObjectDeleted(c));
        }
        Ok(())
    }

    /// Post-order walk: move each category's entries away, then record it.
    /// A hard delete also walks soft-deleted children so no row is left
    /// pointing at a purged parent.
    fn detach_subtree(
        &self,
        tenant: TenantId,
        category: &Category,
        mode: DeleteMode,
        doomed: &mut Vec<Category>,
    ) -> ApplicationResult<()> {
        let children = match mode {
            DeleteMode::Soft => self.store.get_by_parent_id(tenant, Some(category.id)),
            DeleteMode::Hard => self.store.get_by_parent_id_any(tenant, category.id),
        }
        .with_context("load children of", category)?;
        for child in children {
            self.detach_subtree(tenant, &child, mode, doomed)?;
        }
        self.move_entries_to_parent(tenant, category)?;
        doomed.push(category.clone());
        Ok(())
    }

    fn move_entries_to_parent(&self, tenant: TenantId, category: &Category) -> ApplicationResult<()> {
        let entries = self.direct_entries(tenant, category.id)?;
        if entries.is_empty() {
            return Ok(());
        }
        let parent = self.parent_of(category)?;
        for entry in &entries {
            match &parent {
                Some(parent) => self
                    .entries
                    .rename_category_on_entry(entry, &category.full_name, &parent.full_name)
                    .with_context("move entry to parent category", entry)?,
                None => self
                    .entries
                    .remove_category_from_entry(entry, &category.full_name)
                    .with_context("remove category from entry", entry)?,
            }
            self.entries
                .resync_entry_categories(entry)
                .with_context("resync entry", entry)?;
        }
        debug!("moved {} entries off {}", entries.len(), category);
        Ok(())
    }

    // ============================================================
    // ENTRY COUNTS
    // ============================================================

    /// Add `amount` to the category and its ancestors, stopping at the first
    /// category in `already_member`.
    pub fn increment_entries_count(
        &self,
        tenant: TenantId,
        id: CategoryId,
        amount: u64,
        already_member: &BTreeSet<CategoryId>,
    ) -> ApplicationResult<()> {
        debug!("increment_entries_count: tenant={} id={} amount={}", tenant, id, amount);
        self.with_lock(tenant, || {
            self.adjust_count_locked(tenant, id, Adjustment::Increment(amount), already_member)
        })
    }

    /// Subtract `amount` from the category and its ancestors, clamping at zero.
    /// Stops at the first category in `already_member` or soft-deleted.
    pub fn decrement_entries_count(
        &self,
        tenant: TenantId,
        id: CategoryId,
        amount: u64,
        already_member: &BTreeSet<CategoryId>,
    ) -> ApplicationResult<()> {
        debug!("decrement_entries_count: tenant={} id={} amount={}", tenant, id, amount);
        self.with_lock(tenant, || {
            self.adjust_count_locked(tenant, id, Adjustment::Decrement(amount), already_member)
        })
    }

    /// Replace the entry's membership with `new_ids` and adjust the counts so
    /// every category counts the entry at most once. The previous membership
    /// is read and replaced under the same tenant lock. Returns it.
    pub fn reassign_entry(
        &self,
        tenant: TenantId,
        entry: &EntryRef,
        new_ids: &BTreeSet<CategoryId>,
    ) -> ApplicationResult<BTreeSet<CategoryId>> {
        debug!("reassign_entry: tenant={} entry={} new={:?}", tenant, entry, new_ids);
        self.with_lock(tenant, || {
            let old_ids = self
                .entries
                .categories_of(entry)
                .with_context("load categories of entry", entry)?;
            if old_ids == *new_ids {
                return Ok(old_ids);
            }
            self.membership_change_locked(tenant, &old_ids, new_ids)?;
            self.entries
                .assign(tenant, entry, new_ids)
                .with_context("assign categories to entry", entry)?;
            Ok(old_ids)
        })
    }

    fn membership_change_locked(
        &self,
        tenant: TenantId,
        old: &BTreeSet<CategoryId>,
        new: &BTreeSet<CategoryId>,
    ) -> ApplicationResult<()> {
        // purged categories no longer count anything
        let mut old_live = BTreeSet::new();
        for &id in old {
            if self
                .store
                .get_by_id(tenant, id)
                .with_context("load category", id)?
                .is_some()
            {
                old_live.insert(id);
            }
        }
        let old = &old_live;
        let kept: Vec<CategoryId> = old.intersection(new).copied().collect();
        let kept_closure = self.closure(tenant, kept.iter().copied())?;

        let mut settled = kept_closure.clone();
        for &removed in old.difference(new) {
            self.adjust_count_locked(tenant, removed, Adjustment::Decrement(1), &settled)?;
            settled.extend(self.closure(tenant, [removed])?);
        }

        let mut counted = kept_closure;
        for &added in new.difference(old) {
            self.adjust_count_locked(tenant, added, Adjustment::Increment(1), &counted)?;
            counted.extend(self.closure(tenant, [added])?);
        }
        Ok(())
    }

    fn adjust_count_locked(
        &self,
        tenant: TenantId,
        id: CategoryId,
        adjustment: Adjustment,
        already_member: &BTreeSet<CategoryId>,
    ) -> ApplicationResult<()> {
        let mut current = self
            .store
            .get_by_id(tenant, id)
            .with_context("load category", id)?
            .ok_or(DomainError::NotFound(id))?;
        loop {
            if already_member.contains(&current.id) {
                return Ok(());
            }
            match adjustment {
                Adjustment::Increment(amount) => current.entries_count += amount,
                Adjustment::Decrement(_) if !current.is_active() => return Ok(()),
                Adjustment::Decrement(amount) => {
                    current.entries_count = current.entries_count.saturating_sub(amount)
                }
            }
            current.updated_at = Utc::now();
            self.store
                .upsert(&current)
                .with_context("update entries count of", &current)?;

            let Some(parent_id) = current.parent_id else {
                return Ok(());
            };
            match self
                .store
                .get_by_id(tenant, parent_id)
                .with_context("load category", parent_id)?
            {
                Some(parent) => current = parent,
                None => return Ok(()),
            }
        }
    }

    /// Recount distinct entries in the subtree of `id` and persist the result.
    pub fn recount_entries(&self, tenant: TenantId, id: CategoryId) -> ApplicationResult<u64> {
        debug!("recount_entries: tenant={} id={}", tenant, id);
        self.with_lock(tenant, || {
            self.recount_locked(tenant, id)?
                .ok_or_else(|| DomainError::NotFound(id).into())
        })
    }

    fn recount_locked(&self, tenant: TenantId, id: CategoryId) -> ApplicationResult<Option<u64>> {
        let Some(mut category) = self
            .store
            .get_by_id(tenant, id)
            .with_context("load category", id)?
            .filter(Category::is_active)
        else {
            return Ok(None);
        };

        let mut ids: BTreeSet<CategoryId> = self
            .descendants_of(&category)?
            .into_iter()
            .map(|c| c.id)
            .collect();
        ids.insert(category.id);
        let entries: BTreeSet<EntryRef> = self
            .entries
            .find_entries_by_category_subtree(tenant, &ids)
            .with_context("find entries under", &category)?
            .into_iter()
            .collect();
        let count = entries.len() as u64;

        if category.entries_count != count {
            debug!(
                "recount: {} {} -> {}",
                category, category.entries_count, count
            );
            category.entries_count = count;
            category.updated_at = Utc::now();
            self.store
                .upsert(&category)
                .with_context("update entries count of", &category)?;
        }
        Ok(Some(count))
    }

    // ============================================================
    // MEMBERSHIP
    // ============================================================

    /// Replace membership settings and cascade them to inheriting descendants.
    pub fn update_membership(
        &self,
        tenant: TenantId,
        id: CategoryId,
        settings: MembershipSettings,
    ) -> ApplicationResult<Category> {
        debug!("update_membership: tenant={} id={}", tenant, id);
        self.with_lock(tenant, || {
            let mut category = self.require_active(tenant, id)?;
            let parent = self.parent_of(&category)?;
            category.membership = settings;
            category.apply_inheritance(parent.as_ref());
            category.updated_at = Utc::now();

            let mut changes = Changeset::new();
            changes.upsert(category.clone());
            self.cascade_inheritance(tenant, &category, &mut changes)?;
            let written = changes.len();
            self.store
                .commit(changes)
                .with_context("update membership of", &category)?;
            info!("updated membership of {} ({} categories)", category, written);
            Ok(category)
        })
    }

    fn cascade_inheritance(
        &self,
        tenant: TenantId,
        parent: &Category,
        changes: &mut Changeset,
    ) -> ApplicationResult<()> {
        for mut child in self
            .store
            .get_by_parent_id(tenant, Some(parent.id))
            .with_context("load children of", parent)?
        {
            if !child.membership.inherits() {
                continue;
            }
            child.apply_inheritance(Some(parent));
            child.updated_at = parent.updated_at;
            changes.upsert(child.clone());
            self.cascade_inheritance(tenant, &child, changes)?;
        }
        Ok(())
    }

    // ============================================================
    // QUERIES
    // ============================================================

    /// Any stored category, including soft-deleted ones.
    pub fn get(&self, tenant: TenantId, id: CategoryId) -> ApplicationResult<Category> {
        self.store
            .get_by_id(tenant, id)
            .with_context("load category", id)?
            .ok_or_else(|| DomainError::NotFound(id).into())
    }

    pub fn find_by_full_name(
        &self,
        tenant: TenantId,
        full_name: &str,
    ) -> ApplicationResult<Option<Category>> {
        self.store
            .get_by_full_name_exact(tenant, full_name)
            .with_context("look up", full_name)
    }

    /// Direct children sorted by name; roots when `parent` is `None`.
    pub fn children(
        &self,
        tenant: TenantId,
        parent: Option<CategoryId>,
    ) -> ApplicationResult<Vec<Category>> {
        let mut children = self
            .store
            .get_by_parent_id(tenant, parent)
            .with_context("load children of tenant", tenant)?;
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    /// Every active descendant of `id`, sorted by full name.
    pub fn descendants(&self, tenant: TenantId, id: CategoryId) -> ApplicationResult<Vec<Category>> {
        let category = self.require_active(tenant, id)?;
        let mut descendants = self.descendants_of(&category)?;
        descendants.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(descendants)
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestor_ids(&self, tenant: TenantId, id: CategoryId) -> ApplicationResult<Vec<CategoryId>> {
        let mut ancestors = Vec::new();
        let mut next = self
            .store
            .get_by_id(tenant, id)
            .with_context("load category", id)?
            .and_then(|c| c.parent_id);
        while let Some(parent_id) = next {
            if ancestors.contains(&parent_id) || parent_id == id {
                warn!("ancestor chain of {} loops at {}", id, parent_id);
                break;
            }
            ancestors.push(parent_id);
            next = self
                .store
                .get_by_id(tenant, parent_id)
                .with_context("load category", parent_id)?
                .and_then(|c| c.parent_id);
        }
        Ok(ancestors)
    }

    /// Every active category of the tenant, sorted by full name.
    pub fn list(&self, tenant: TenantId) -> ApplicationResult<Vec<Category>> {
        let mut categories = self
            .store
            .list(tenant)
            .with_context("list categories of tenant", tenant)?;
        categories.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(categories)
    }

    /// Arena snapshot of the tenant's active tree.
    pub fn forest(&self, tenant: TenantId) -> ApplicationResult<CategoryForest> {
        Ok(CategoryForest::from_categories(self.list(tenant)?))
    }

    // ============================================================
    // HELPERS
    // ============================================================

    fn require_active(&self, tenant: TenantId, id: CategoryId) -> ApplicationResult<Category> {
        self.store
            .get_by_id(tenant, id)
            .with_context("load category", id)?
            .filter(Category::is_active)
            .ok_or_else(|| DomainError::NotFound(id).into())
    }

    fn parent_of(&self, category: &Category) -> ApplicationResult<Option<Category>> {
        match category.parent_id {
            Some(parent_id) => Ok(self
                .store
                .get_by_id(category.tenant_id, parent_id)
                .with_context("load parent", parent_id)?
                .filter(Category::is_active)),
            None => Ok(None),
        }
    }

    fn descendants_of(&self, category: &Category) -> ApplicationResult<Vec<Category>> {
        let prefix = self.config.rules.descendant_prefix(&category.full_name);
        self.store
            .get_by_full_name_prefix(category.tenant_id, &prefix)
            .with_context("load descendants of", category)
    }

    fn ensure_unique(
        &self,
        tenant: TenantId,
        full_name: &str,
        exclude: &BTreeSet<CategoryId>,
    ) -> ApplicationResult<()> {
        let existing = self
            .store
            .get_by_full_name_exact(tenant, full_name)
            .with_context("look up", full_name)?;
        match existing {
            Some(other) if !exclude.contains(&other.id) => {
                Err(DomainError::DuplicateFullName(full_name.to_string()).into())
            }
            _ => Ok(()),
        }
    }

    fn direct_entries(&self, tenant: TenantId, id: CategoryId) -> ApplicationResult<Vec<EntryRef>> {
        self.entries
            .find_entries_by_category_subtree(tenant, &BTreeSet::from([id]))
            .with_context("find entries of category", id)
    }

    /// The given ids plus all their ancestors.
    fn closure(
        &self,
        tenant: TenantId,
        ids: impl IntoIterator<Item = CategoryId>,
    ) -> ApplicationResult<BTreeSet<CategoryId>> {
        let mut closure = BTreeSet::new();
        for id in ids {
            if closure.insert(id) {
                closure.extend(self.ancestor_ids(tenant, id)?);
            }
        }
        Ok(closure)
    }

    fn raise(&self, event: CategoryEvent) {
        if let Err(e) = self.notifier.raise(&event) {
            warn!("notifier failed for {} of {}: {}", event.kind(), event.category(), e);
        }
    }

    fn threshold_crossed(&self, tenant: TenantId) {
        info!(
            "tenant {} reached {} categories",
            tenant, self.config.chunked_load_threshold
        );
        if let Err(e) = self.quota.on_category_count_threshold_crossed(tenant) {
            warn!("quota hook failed for tenant {}: {}", tenant, e);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Adjustment {
    Increment(u64),
    Decrement(u64),
}
