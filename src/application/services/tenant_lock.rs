//! Per-tenant serialization of structural changes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::TenantId;

/// One mutex per tenant. Cascades on overlapping subtrees of the same
/// tenant never interleave; different tenants never wait on each other.
#[derive(Debug, Default)]
pub struct TenantLocks {
    locks: Mutex<HashMap<TenantId, Arc<Mutex<()>>>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, tenant: TenantId) -> Arc<Mutex<()>> {
        self.locks.lock().entry(tenant).or_default().clone()
    }

    /// Run `f` while holding the tenant's lock, waiting at most `timeout`.
    /// The lock is released on every exit path.
    pub fn with_lock<T>(
        &self,
        tenant: TenantId,
        timeout: Duration,
        f: impl FnOnce() -> ApplicationResult<T>,
    ) -> ApplicationResult<T> {
        let lock = self.handle(tenant);
        let _guard = lock
            .try_lock_for(timeout)
            .ok_or_else(|| ApplicationError::Busy {
                tenant,
                waited_ms: timeout.as_millis() as u64,
            })?;
        trace!(%tenant, "tenant lock acquired");
        f()
    }
}
