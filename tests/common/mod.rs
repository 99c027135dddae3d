//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use cattree::config::Settings;
use cattree::domain::{Category, CategoryEvent, TenantId};
use cattree::infrastructure::di::ServiceContainer;
use cattree::infrastructure::snapshot::Snapshot;
use cattree::infrastructure::traits::{
    Notifier, PortError, PortResult, QuotaPolicy, RealFileSystem,
};
use cattree::util::testing;

pub const TENANT: TenantId = TenantId(7);
pub const OTHER_TENANT: TenantId = TenantId(8);

/// Notifier remembering every event.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<CategoryEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<CategoryEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.kind()).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn raise(&self, event: &CategoryEvent) -> PortResult<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Notifier that always fails.
#[derive(Debug, Default)]
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn raise(&self, _event: &CategoryEvent) -> PortResult<()> {
        Err(PortError::Unavailable("event bus down".into()))
    }
}

/// Quota policy remembering every threshold call.
#[derive(Debug, Default)]
pub struct RecordingQuota {
    calls: Mutex<Vec<TenantId>>,
}

impl RecordingQuota {
    pub fn calls(&self) -> Vec<TenantId> {
        self.calls.lock().clone()
    }
}

impl QuotaPolicy for RecordingQuota {
    fn on_category_count_threshold_crossed(&self, tenant: TenantId) -> PortResult<()> {
        self.calls.lock().push(tenant);
        Ok(())
    }
}

pub struct Harness {
    pub container: ServiceContainer,
    pub notifier: Arc<RecordingNotifier>,
    pub quota: Arc<RecordingQuota>,
}

pub fn harness() -> Harness {
    harness_with(Settings::default())
}

pub fn harness_with(settings: Settings) -> Harness {
    testing::init_test_setup();
    let notifier = Arc::new(RecordingNotifier::default());
    let quota = Arc::new(RecordingQuota::default());
    let container = ServiceContainer::with_deps(
        settings,
        Arc::new(RealFileSystem),
        Snapshot::default(),
        notifier.clone(),
        quota.clone(),
    );
    Harness {
        container,
        notifier,
        quota,
    }
}

/// Active categories of a tenant by full name.
pub fn full_names(h: &Harness, tenant: TenantId) -> Vec<String> {
    h.container
        .tree
        .list(tenant)
        .unwrap()
        .into_iter()
        .map(|c| c.full_name)
        .collect()
}

pub fn reload(h: &Harness, category: &Category) -> Category {
    h.container.tree.get(category.tenant_id, category.id).unwrap()
}
