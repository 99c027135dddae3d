//! Error conversion helpers for collaborator calls
//!
//! Provides an extension trait for cleaner error handling with context.

use std::fmt;

use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::traits::PortResult;

/// Extension trait for converting `PortResult` to `ApplicationResult` with context.
pub trait PortResultExt<T> {
    /// Add context to a collaborator error.
    ///
    /// # Example
    /// ```ignore
    /// store.get_by_id(tenant, id)
    ///     .with_context("load category", id)?;
    /// ```
    fn with_context(self, action: &str, subject: impl fmt::Display) -> ApplicationResult<T>;
}

impl<T> PortResultExt<T> for PortResult<T> {
    fn with_context(self, action: &str, subject: impl fmt::Display) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, subject),
            source: Box::new(e),
        })
    }
}
