//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::Domain(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Infra(e) => infra_exit_code(e),
        }
    }
}

fn infra_exit_code(e: &InfraError) -> i32 {
    match e {
        InfraError::Io { .. } => exitcode::IOERR,
        InfraError::ToolFailed { .. } => exitcode::UNAVAILABLE,
        InfraError::Application(app) => match app {
            ApplicationError::Domain(DomainError::InvalidContainer(_)) => exitcode::NOINPUT,
            ApplicationError::Domain(DomainError::UnknownAction(_)) => exitcode::USAGE,
            ApplicationError::Domain(_) => exitcode::DATAERR,
            ApplicationError::Config { .. } => exitcode::CONFIG,
            ApplicationError::OperationFailed { source, .. } => {
                if let Some(infra) = source.downcast_ref::<InfraError>() {
                    infra_exit_code(infra)
                } else if source.is::<std::io::Error>() {
                    exitcode::IOERR
                } else {
                    exitcode::SOFTWARE
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tool_failure() -> CliError {
        ApplicationError::OperationFailed {
            context: "run halStats".into(),
            source: Box::new(InfraError::ToolFailed {
                program: "halStats".into(),
                exit_code: Some(1),
                stderr: "boom".into(),
            }),
        }
        .into()
    }

    #[rstest]
    #[case(DomainError::NotFound("x".into()).into(), exitcode::DATAERR)]
    #[case(DomainError::InvalidContainer("in.hal".into()).into(), exitcode::NOINPUT)]
    #[case(DomainError::UnknownAction("leaf".into()).into(), exitcode::USAGE)]
    #[case(ApplicationError::Config { message: "bad".into() }.into(), exitcode::CONFIG)]
    #[case(tool_failure(), exitcode::UNAVAILABLE)]
    fn given_error_when_mapping_exit_code_then_sysexits(
        #[case] error: CliError,
        #[case] expected: i32,
    ) {
        assert_eq!(error.exit_code(), expected);
    }

    #[test]
    fn given_io_failure_when_mapping_exit_code_then_ioerr() {
        let error: CliError = ApplicationError::OperationFailed {
            context: "write seq file".into(),
            source: Box::new(std::io::Error::other("disk full")),
        }
        .into();
        assert_eq!(error.exit_code(), exitcode::IOERR);
    }
}
