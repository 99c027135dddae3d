//! In-memory collaborator implementations
//!
//! Used by the CLI (backed by a TOML snapshot) and by tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{Category, CategoryEvent, CategoryId, Changeset, EntryRef, TenantId};
use crate::infrastructure::traits::{
    CategoryStore, EntryAssociations, Notifier, PortError, PortResult, QuotaPolicy,
};

#[derive(Debug)]
struct StoreState {
    categories: BTreeMap<CategoryId, Category>,
    next_id: u64,
}

/// Category store keyed by id.
///
/// Changesets are applied atomically: they are staged on a copy and only
/// swapped in when the tenant's active full names stay unique.
#[derive(Debug)]
pub struct InMemoryCategoryStore {
    state: RwLock<StoreState>,
}

impl Default for InMemoryCategoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), 1)
    }

    /// Rebuild from persisted categories. `next_id` is raised past the highest id.
    pub fn from_parts(categories: Vec<Category>, next_id: u64) -> Self {
        let categories: BTreeMap<CategoryId, Category> =
            categories.into_iter().map(|c| (c.id, c)).collect();
        let highest = categories.keys().next_back().map(|id| id.0).unwrap_or(0);
        Self {
            state: RwLock::new(StoreState {
                categories,
                next_id: next_id.max(highest + 1),
            }),
        }
    }

    /// Every stored row (all tenants, including soft-deleted) and the next id.
    pub fn to_parts(&self) -> (Vec<Category>, u64) {
        let state = self.state.read();
        (state.categories.values().cloned().collect(), state.next_id)
    }

    fn active<'a>(
        state: &'a StoreState,
        tenant: TenantId,
    ) -> impl Iterator<Item = &'a Category> + 'a {
        state
            .categories
            .values()
            .filter(move |c| c.tenant_id == tenant && c.is_active())
    }

    fn check_unique(
        categories: &BTreeMap<CategoryId, Category>,
        tenants: &BTreeSet<TenantId>,
    ) -> PortResult<()> {
        let mut seen: BTreeSet<(TenantId, &str)> = BTreeSet::new();
        for c in categories
            .values()
            .filter(|c| c.is_active() && tenants.contains(&c.tenant_id))
        {
            if !seen.insert((c.tenant_id, c.full_name.as_str())) {
                return Err(PortError::Conflict(format!(
                    "duplicate full name {:?} for tenant {}",
                    c.full_name, c.tenant_id
                )));
            }
        }
        Ok(())
    }
}

impl CategoryStore for InMemoryCategoryStore {
    fn get_by_id(&self, tenant: TenantId, id: CategoryId) -> PortResult<Option<Category>> {
        let state = self.state.read();
        let found = state
            .categories
            .get(&id)
            .filter(|c| c.tenant_id == tenant)
            .cloned();
        Ok(found)
    }

    fn get_by_parent_id(
        &self,
        tenant: TenantId,
        parent: Option<CategoryId>,
    ) -> PortResult<Vec<Category>> {
        let state = self.state.read();
        Ok(Self::active(&state, tenant)
            .filter(|c| c.parent_id == parent)
            .cloned()
            .collect())
    }

    fn get_by_parent_id_any(
        &self,
        tenant: TenantId,
        parent: CategoryId,
    ) -> PortResult<Vec<Category>> {
        let state = self.state.read();
        let children = state
            .categories
            .values()
            .filter(|c| c.tenant_id == tenant && c.parent_id == Some(parent))
            .cloned()
            .collect();
        Ok(children)
    }

    fn get_by_full_name_exact(
        &self,
        tenant: TenantId,
        full_name: &str,
    ) -> PortResult<Option<Category>> {
        let state = self.state.read();
        let found = Self::active(&state, tenant)
            .find(|c| c.full_name == full_name)
            .cloned();
        Ok(found)
    }

    fn get_by_full_name_prefix(
        &self,
        tenant: TenantId,
        prefix: &str,
    ) -> PortResult<Vec<Category>> {
        let state = self.state.read();
        Ok(Self::active(&state, tenant)
            .filter(|c| c.full_name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn count_all(&self, tenant: TenantId) -> PortResult<usize> {
        let state = self.state.read();
        Ok(Self::active(&state, tenant).count())
    }

    fn list(&self, tenant: TenantId) -> PortResult<Vec<Category>> {
        let state = self.state.read();
        Ok(Self::active(&state, tenant).cloned().collect())
    }

    fn allocate_id(&self) -> PortResult<CategoryId> {
        let mut state = self.state.write();
        let id = CategoryId(state.next_id);
        state.next_id += 1;
        Ok(id)
    }

    fn upsert(&self, category: &Category) -> PortResult<()> {
        let mut changes = Changeset::new();
        changes.upsert(category.clone());
        self.commit(changes)
    }

    fn delete(&self, tenant: TenantId, id: CategoryId) -> PortResult<()> {
        let mut changes = Changeset::new();
        changes.delete(tenant, id);
        self.commit(changes)
    }

    fn commit(&self, changes: Changeset) -> PortResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write();
        let mut staged = state.categories.clone();
        let mut tenants = BTreeSet::new();

        for category in changes.upserts {
            tenants.insert(category.tenant_id);
            staged.insert(category.id, category);
        }
        for (tenant, id) in changes.deletes {
            if staged.get(&id).is_some_and(|c| c.tenant_id == tenant) {
                staged.remove(&id);
            }
        }

        Self::check_unique(&staged, &tenants)?;
        debug!("commit: {} rows now stored", staged.len());
        state.categories = staged;
        Ok(())
    }
}

/// Persisted membership of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub entry: EntryRef,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub category_ids: BTreeSet<CategoryId>,
}

/// Entry membership keyed by category id.
///
/// Full names are resolved against the category store at call time,
/// so renames never leave stale names behind.
pub struct InMemoryEntryAssociations {
    store: Arc<dyn CategoryStore>,
    entries: RwLock<BTreeMap<EntryRef, EntryRecord>>,
}

impl InMemoryEntryAssociations {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self::with_records(store, Vec::new())
    }

    pub fn with_records(store: Arc<dyn CategoryStore>, records: Vec<EntryRecord>) -> Self {
        Self {
            store,
            entries: RwLock::new(records.into_iter().map(|r| (r.entry.clone(), r)).collect()),
        }
    }

    pub fn records(&self) -> Vec<EntryRecord> {
        self.entries.read().values().cloned().collect()
    }

    fn full_name_of(&self, tenant: TenantId, id: CategoryId) -> PortResult<Option<String>> {
        Ok(self.store.get_by_id(tenant, id)?.map(|c| c.full_name))
    }

    fn ids_named(
        &self,
        record: &EntryRecord,
        full_name: &str,
    ) -> PortResult<Vec<CategoryId>> {
        let mut ids = Vec::new();
        for &id in &record.category_ids {
            if self.full_name_of(record.tenant_id, id)?.as_deref() == Some(full_name) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

impl EntryAssociations for InMemoryEntryAssociations {
    fn find_entries_by_category_subtree(
        &self,
        tenant: TenantId,
        ids: &BTreeSet<CategoryId>,
    ) -> PortResult<Vec<EntryRef>> {
        let entries = self.entries.read();
        Ok(entries
            .values()
            .filter(|r| r.tenant_id == tenant && !r.category_ids.is_disjoint(ids))
            .map(|r| r.entry.clone())
            .collect())
    }

    fn rename_category_on_entry(
        &self,
        entry: &EntryRef,
        old_full_name: &str,
        new_full_name: &str,
    ) -> PortResult<()> {
        let mut entries = self.entries.write();
        let Some(record) = entries.get_mut(entry) else {
            return Ok(());
        };
        let Some(target) = self
            .store
            .get_by_full_name_exact(record.tenant_id, new_full_name)?
        else {
            return Ok(());
        };
        for id in self.ids_named(record, old_full_name)? {
            if id != target.id {
                record.category_ids.remove(&id);
                record.category_ids.insert(target.id);
            }
        }
        Ok(())
    }

    fn remove_category_from_entry(&self, entry: &EntryRef, full_name: &str) -> PortResult<()> {
        let mut entries = self.entries.write();
        if let Some(record) = entries.get_mut(entry) {
            for id in self.ids_named(record, full_name)? {
                record.category_ids.remove(&id);
            }
        }
        Ok(())
    }

    fn resync_entry_categories(&self, entry: &EntryRef) -> PortResult<()> {
        let mut entries = self.entries.write();
        if let Some(record) = entries.get_mut(entry) {
            let mut live = BTreeSet::new();
            for &id in &record.category_ids {
                if self
                    .store
                    .get_by_id(record.tenant_id, id)?
                    .is_some_and(|c| c.is_active())
                {
                    live.insert(id);
                }
            }
            record.category_ids = live;
        }
        Ok(())
    }

    fn categories_of(&self, entry: &EntryRef) -> PortResult<BTreeSet<CategoryId>> {
        Ok(self
            .entries
            .read()
            .get(entry)
            .map(|r| r.category_ids.clone())
            .unwrap_or_default())
    }

    fn assign(
        &self,
        tenant: TenantId,
        entry: &EntryRef,
        ids: &BTreeSet<CategoryId>,
    ) -> PortResult<()> {
        self.entries.write().insert(
            entry.clone(),
            EntryRecord {
                entry: entry.clone(),
                tenant_id: tenant,
                category_ids: ids.clone(),
            },
        );
        Ok(())
    }
}

/// Notifier writing events to the log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn raise(&self, event: &CategoryEvent) -> PortResult<()> {
        let category = event.category();
        info!(
            event = event.kind(),
            tenant = %category.tenant_id,
            id = %category.id,
            invalidate = ?category.cache_invalidation_keys(),
            "{}",
            category.full_name
        );
        Ok(())
    }
}

/// Quota policy enabling chunked category loading per tenant.
#[derive(Debug, Default)]
pub struct FeatureFlagQuotaPolicy {
    flagged: RwLock<BTreeSet<TenantId>>,
}

impl FeatureFlagQuotaPolicy {
    pub fn with_flagged(tenants: impl IntoIterator<Item = TenantId>) -> Self {
        Self {
            flagged: RwLock::new(tenants.into_iter().collect()),
        }
    }

    pub fn is_flagged(&self, tenant: TenantId) -> bool {
        self.flagged.read().contains(&tenant)
    }

    pub fn flagged(&self) -> Vec<TenantId> {
        self.flagged.read().iter().copied().collect()
    }
}

impl QuotaPolicy for FeatureFlagQuotaPolicy {
    fn on_category_count_threshold_crossed(&self, tenant: TenantId) -> PortResult<()> {
        if self.flagged.write().insert(tenant) {
            info!(%tenant, "chunked category loading enabled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(store: &InMemoryCategoryStore, tenant: u64, full_name: &str) -> Category {
        let id = store.allocate_id().unwrap();
        let mut c = Category::new(id, TenantId(tenant));
        c.name = full_name.rsplit('/').next().unwrap_or(full_name).to_string();
        c.full_name = full_name.to_string();
        c
    }

    #[test]
    fn given_conflicting_changeset_when_committing_then_nothing_is_applied() {
        let store = InMemoryCategoryStore::new();
        let a = category(&store, 1, "a");
        store.upsert(&a).unwrap();

        let mut changes = Changeset::new();
        changes.upsert(category(&store, 1, "b"));
        changes.upsert(category(&store, 1, "a"));
        let result = store.commit(changes);

        assert!(matches!(result, Err(PortError::Conflict(_))));
        assert_eq!(store.count_all(TenantId(1)).unwrap(), 1);
    }

    #[test]
    fn given_same_full_name_in_two_tenants_when_committing_then_both_are_kept() {
        let store = InMemoryCategoryStore::new();
        store.upsert(&category(&store, 1, "a")).unwrap();
        store.upsert(&category(&store, 2, "a")).unwrap();

        assert_eq!(store.count_all(TenantId(1)).unwrap(), 1);
        assert_eq!(store.count_all(TenantId(2)).unwrap(), 1);
    }

    #[test]
    fn given_soft_deleted_row_when_querying_then_only_point_lookup_sees_it() {
        let store = InMemoryCategoryStore::new();
        let mut a = category(&store, 1, "a");
        a.mark_deleted(chrono::Utc::now());
        store.upsert(&a).unwrap();

        assert!(store.get_by_id(TenantId(1), a.id).unwrap().is_some());
        assert!(store.get_by_full_name_exact(TenantId(1), "a").unwrap().is_none());
        assert_eq!(store.count_all(TenantId(1)).unwrap(), 0);
    }

    #[test]
    fn given_soft_deleted_child_when_listing_children_then_only_any_lookup_sees_it() {
        let store = InMemoryCategoryStore::new();
        let a = category(&store, 1, "a");
        let mut b = category(&store, 1, "a/b");
        b.parent_id = Some(a.id);
        b.mark_deleted(chrono::Utc::now());
        store.upsert(&a).unwrap();
        store.upsert(&b).unwrap();

        let active = store.get_by_parent_id(TenantId(1), Some(a.id)).unwrap();
        let any = store.get_by_parent_id_any(TenantId(1), a.id).unwrap();

        assert!(active.is_empty());
        assert_eq!(any, vec![b]);
        assert!(store.get_by_parent_id_any(TenantId(2), a.id).unwrap().is_empty());
    }

    #[test]
    fn given_active_row_when_looking_up_full_name_then_found() {
        let store = InMemoryCategoryStore::new();
        let a = category(&store, 1, "a/b");
        store.upsert(&a).unwrap();

        let found = store.get_by_full_name_exact(TenantId(1), "a/b").unwrap();

        assert_eq!(found, Some(a));
    }

    #[test]
    fn given_persisted_rows_when_restoring_then_next_id_passes_highest() {
        let mut c = Category::new(CategoryId(41), TenantId(1));
        c.full_name = "a".into();

        let store = InMemoryCategoryStore::from_parts(vec![c], 1);

        assert_eq!(store.allocate_id().unwrap(), CategoryId(42));
    }

    #[test]
    fn given_other_tenant_when_looking_up_by_id_then_not_found() {
        let store = InMemoryCategoryStore::new();
        let a = category(&store, 1, "a");
        store.upsert(&a).unwrap();

        assert!(store.get_by_id(TenantId(2), a.id).unwrap().is_none());
    }

    #[test]
    fn given_entry_in_category_when_renaming_to_existing_target_then_membership_moves() {
        let store = Arc::new(InMemoryCategoryStore::new());
        let a = category(&store, 1, "a");
        let b = category(&store, 1, "a/b");
        store.upsert(&a).unwrap();
        store.upsert(&b).unwrap();
        let entries = InMemoryEntryAssociations::new(store.clone());
        let entry = EntryRef::new("e1");
        entries
            .assign(TenantId(1), &entry, &BTreeSet::from([b.id]))
            .unwrap();

        entries.rename_category_on_entry(&entry, "a/b", "a").unwrap();

        assert_eq!(entries.categories_of(&entry).unwrap(), BTreeSet::from([a.id]));
    }

    #[test]
    fn given_entry_when_removing_and_resyncing_then_only_live_ids_remain() {
        let store = Arc::new(InMemoryCategoryStore::new());
        let a = category(&store, 1, "a");
        let b = category(&store, 1, "b");
        store.upsert(&a).unwrap();
        store.upsert(&b).unwrap();
        let entries = InMemoryEntryAssociations::new(store.clone());
        let entry = EntryRef::new("e1");
        entries
            .assign(TenantId(1), &entry, &BTreeSet::from([a.id, b.id, CategoryId(999)]))
            .unwrap();

        entries.remove_category_from_entry(&entry, "a").unwrap();
        entries.resync_entry_categories(&entry).unwrap();

        assert_eq!(entries.categories_of(&entry).unwrap(), BTreeSet::from([b.id]));
    }

    #[test]
    fn given_threshold_hook_when_called_twice_then_tenant_flagged_once() {
        let policy = FeatureFlagQuotaPolicy::default();

        policy.on_category_count_threshold_crossed(TenantId(3)).unwrap();
        policy.on_category_count_threshold_crossed(TenantId(3)).unwrap();

        assert!(policy.is_flagged(TenantId(3)));
        assert_eq!(policy.flagged(), vec![TenantId(3)]);
    }
}
