use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::app::domain::document::DataKind;

/// Failure raised by a message subscriber.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// The operation an error was raised from. Every `AppError` carries one so
/// the message shown to the user names what was being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Reload,
    Save,
    Remove,
    CheckModified,
    NewResource,
    Execute(&'static str),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Load => f.write_str("load"),
            Operation::Reload => f.write_str("reload"),
            Operation::Save => f.write_str("save"),
            Operation::Remove => f.write_str("remove"),
            Operation::CheckModified => f.write_str("modification check"),
            Operation::NewResource => f.write_str("new resource"),
            Operation::Execute(command) => write!(f, "{}", command),
        }
    }
}

/// Errors from the plain-text parser, before a path or operation is attached.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("file is not valid UTF-8")]
    Encoding,

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{operation} failed: {} does not exist", path.display())]
    NotFound { operation: Operation, path: PathBuf },

    #[error("{operation} failed: cannot parse {}: {source}", path.display())]
    Parse {
        operation: Operation,
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("{operation} failed for {}: {source}", path.display())]
    Io {
        operation: Operation,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{operation} failed: {message}")]
    InvariantViolation { operation: Operation, message: String },

    #[error("{operation} is not applicable to {kind} {}", path.display())]
    NotApplicable {
        operation: Operation,
        kind: DataKind,
        path: PathBuf,
    },

    #[error("Subscriber for {topic} failed: {source}")]
    Handler {
        topic: &'static str,
        #[source]
        source: HandlerError,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Wrap an I/O failure, mapping a missing path to `NotFound`.
    pub fn io(operation: Operation, path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            AppError::NotFound {
                operation,
                path: path.to_path_buf(),
            }
        } else {
            AppError::Io {
                operation,
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Wrap a parser failure. Unreadable files surface as `NotFound`/`Io`,
    /// everything else as `Parse`.
    pub fn format(operation: Operation, path: &Path, source: FormatError) -> Self {
        match source {
            FormatError::Io(err) => AppError::io(operation, path, err),
            other => AppError::Parse {
                operation,
                path: path.to_path_buf(),
                source: other,
            },
        }
    }

    pub fn invariant(operation: Operation, message: impl Into<String>) -> Self {
        AppError::InvariantViolation {
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }
}

/// Convenience type alias for Results with AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = AppError::io(Operation::Reload, Path::new("/tmp/suite.robot"), io_err);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "reload failed: /tmp/suite.robot does not exist"
        );
    }

    #[test]
    fn test_other_io_errors_keep_source() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = AppError::io(Operation::Save, Path::new("/ro/suite.robot"), io_err);
        assert!(matches!(err, AppError::Io { .. }));
        assert!(err.to_string().contains("save failed for /ro/suite.robot"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_parse_error_names_path_and_line() {
        let err = AppError::format(
            Operation::Load,
            Path::new("tests.robot"),
            FormatError::Syntax {
                line: 3,
                message: "step outside of a test case".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "load failed: cannot parse tests.robot: line 3: step outside of a test case"
        );
    }

    #[test]
    fn test_format_io_error_is_unwrapped() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = AppError::format(Operation::Load, Path::new("x.robot"), io_err.into());
        assert!(err.is_not_found());
    }

    #[test]
    fn test_command_operation_display() {
        let err = AppError::invariant(Operation::Execute("DeleteFile"), "unknown controller 7");
        assert_eq!(err.to_string(), "DeleteFile failed: unknown controller 7");
    }
}
