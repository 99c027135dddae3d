//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::{CategoryId, TenantId};

/// Domain errors represent violations of the category tree invariants.
/// They are raised before any write of the failing operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("category not found: {0}")]
    NotFound(CategoryId),

    #[error("max depth reached: {full_name} would be at depth {depth} (max {max})")]
    DepthExceeded {
        full_name: String,
        depth: u32,
        max: u32,
    },

    #[error("duplicate category: {0}")]
    DuplicateFullName(String),

    #[error("parent {parent} is {category} or one of its descendants")]
    CycleDetected {
        category: CategoryId,
        parent: CategoryId,
    },

    #[error("max number of categories reached for tenant {tenant} (max {max})")]
    TenantQuotaExceeded { tenant: TenantId, max: usize },

    #[error("invalid category name: {0:?}")]
    InvalidName(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
