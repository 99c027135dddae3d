//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, TenantId};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("tenant {tenant} is busy: structural lock not acquired within {waited_ms} ms")]
    Busy { tenant: TenantId, waited_ms: u64 },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// The domain error, if this is a validation failure.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ApplicationError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
