//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Snapshot { .. } => crate::exitcode::DATAERR,
                InfraError::Application(app) => match app {
                    ApplicationError::Domain(DomainError::NotFound(_))
                    | ApplicationError::Domain(DomainError::UnknownCategory(_)) => {
                        crate::exitcode::NOINPUT
                    }
                    ApplicationError::Domain(_) => crate::exitcode::DATAERR,
                    ApplicationError::Busy { .. } => crate::exitcode::TEMPFAIL,
                    ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                    ApplicationError::OperationFailed { .. } => crate::exitcode::SOFTWARE,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryId, TenantId};
    use rstest::rstest;

    #[rstest]
    #[case(ApplicationError::Domain(DomainError::NotFound(CategoryId(1))), crate::exitcode::NOINPUT)]
    #[case(ApplicationError::Domain(DomainError::DuplicateFullName("a".into())), crate::exitcode::DATAERR)]
    #[case(ApplicationError::Busy { tenant: TenantId(1), waited_ms: 5 }, crate::exitcode::TEMPFAIL)]
    #[case(ApplicationError::Config { message: "x".into() }, crate::exitcode::CONFIG)]
    fn given_application_error_when_mapping_then_exit_code_matches(
        #[case] error: ApplicationError,
        #[case] expected: i32,
    ) {
        assert_eq!(CliError::from(error).exit_code(), expected);
    }

    #[test]
    fn given_usage_error_when_mapping_then_usage_code() {
        assert_eq!(
            CliError::Usage("bad".into()).exit_code(),
            crate::exitcode::USAGE
        );
    }
}
