//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{CategoryTreeService, EntryCategoryService};
use crate::config::Settings;
use crate::domain::TenantId;
use crate::infrastructure::memory::{
    FeatureFlagQuotaPolicy, InMemoryCategoryStore, InMemoryEntryAssociations, TracingNotifier,
};
use crate::infrastructure::snapshot::Snapshot;
use crate::infrastructure::traits::{
    CategoryStore, EntryAssociations, FileSystem, Notifier, PortResult, QuotaPolicy,
    RealFileSystem,
};
use crate::infrastructure::InfraResult;

/// Records crossings in the container's flags before delegating.
struct FlaggingQuota {
    flags: Arc<FeatureFlagQuotaPolicy>,
    inner: Arc<dyn QuotaPolicy>,
}

impl QuotaPolicy for FlaggingQuota {
    fn on_category_count_threshold_crossed(&self, tenant: TenantId) -> PortResult<()> {
        self.flags.on_category_count_threshold_crossed(tenant)?;
        self.inner.on_category_count_threshold_crossed(tenant)
    }
}

/// Container holding all application services.
///
/// Backed by the in-memory collaborators; their state round-trips
/// through a [`Snapshot`].
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub store: Arc<InMemoryCategoryStore>,
    pub entries: Arc<InMemoryEntryAssociations>,

    /// Tenants with chunked loading enabled
    pub feature_flags: Arc<FeatureFlagQuotaPolicy>,

    pub tree: Arc<CategoryTreeService>,
    pub entry_categories: EntryCategoryService,
}

impl ServiceContainer {
    /// Load the snapshot at `settings.data_file` and wire real implementations.
    pub fn open(settings: Settings) -> InfraResult<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let snapshot = Snapshot::load(fs.as_ref(), &settings.data_file)?;
        let feature_flags = Arc::new(FeatureFlagQuotaPolicy::with_flagged(
            snapshot.flagged_tenants.iter().copied(),
        ));
        let quota: Arc<dyn QuotaPolicy> = feature_flags.clone();
        Ok(Self::assemble(
            settings,
            fs,
            snapshot,
            Arc::new(TracingNotifier),
            quota,
            feature_flags,
        ))
    }

    /// Empty in-memory container with the default hooks.
    pub fn in_memory(settings: Settings) -> Self {
        let feature_flags = Arc::new(FeatureFlagQuotaPolicy::default());
        let quota: Arc<dyn QuotaPolicy> = feature_flags.clone();
        Self::assemble(
            settings,
            Arc::new(RealFileSystem),
            Snapshot::default(),
            Arc::new(TracingNotifier),
            quota,
            feature_flags,
        )
    }

    /// Create a service container with custom dependencies (for testing).
    ///
    /// Threshold crossings reach `quota` and are also recorded in
    /// `feature_flags`, so snapshots carry them.
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        snapshot: Snapshot,
        notifier: Arc<dyn Notifier>,
        quota: Arc<dyn QuotaPolicy>,
    ) -> Self {
        let feature_flags = Arc::new(FeatureFlagQuotaPolicy::with_flagged(
            snapshot.flagged_tenants.iter().copied(),
        ));
        let quota: Arc<dyn QuotaPolicy> = Arc::new(FlaggingQuota {
            flags: feature_flags.clone(),
            inner: quota,
        });
        Self::assemble(settings, fs, snapshot, notifier, quota, feature_flags)
    }

    fn assemble(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        snapshot: Snapshot,
        notifier: Arc<dyn Notifier>,
        quota: Arc<dyn QuotaPolicy>,
        feature_flags: Arc<FeatureFlagQuotaPolicy>,
    ) -> Self {
        debug!(
            "assemble: {} categories, {} entries",
            snapshot.categories.len(),
            snapshot.entries.len()
        );
        let settings = Arc::new(settings);
        let store = Arc::new(InMemoryCategoryStore::from_parts(
            snapshot.categories,
            snapshot.next_id,
        ));
        let store_dyn: Arc<dyn CategoryStore> = store.clone();
        let entries = Arc::new(InMemoryEntryAssociations::with_records(
            store_dyn.clone(),
            snapshot.entries,
        ));
        let entries_dyn: Arc<dyn EntryAssociations> = entries.clone();

        let tree = Arc::new(CategoryTreeService::new(
            store_dyn,
            entries_dyn.clone(),
            notifier,
            quota,
            settings.tree_config(),
        ));
        let entry_categories = EntryCategoryService::new(tree.clone(), entries_dyn);

        Self {
            settings,
            fs,
            store,
            entries,
            feature_flags,
            tree,
            entry_categories,
        }
    }

    /// Current state of the in-memory collaborators.
    pub fn snapshot(&self) -> Snapshot {
        let (categories, next_id) = self.store.to_parts();
        Snapshot {
            next_id,
            flagged_tenants: self.feature_flags.flagged(),
            categories,
            entries: self.entries.records(),
        }
    }

    /// Write the current state to `settings.data_file`.
    pub fn save(&self) -> InfraResult<()> {
        self.snapshot()
            .save(self.fs.as_ref(), &self.settings.data_file)
    }
}
