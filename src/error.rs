//! Centralized error handling for datainspect.
//!
//! The engine itself never surfaces a failed transformation step or filter
//! clause as an error: those are logged and degrade to a no-op. This type is
//! used at the outer boundary instead (configuration files, pipeline/clause
//! JSON, CLI input and output).

use std::fmt;

/// Main error type for datainspect operations.
#[derive(Debug)]
pub enum DataInspectError {
    /// I/O errors (file operations)
    Io(std::io::Error),

    /// Data processing errors (Polars, parsing, etc.)
    DataProcessing(String),

    /// Configuration and (de)serialization errors
    Config(String),

    /// A referenced column does not exist in the table
    ColumnNotFound(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for DataInspectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::ColumnNotFound(name) => write!(f, "Column not found: '{name}'"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DataInspectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DataInspectError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for DataInspectError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for DataInspectError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for DataInspectError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

/// Result type alias for datainspect operations.
pub type Result<T> = std::result::Result<T, DataInspectError>;

impl DataInspectError {
    /// Prefixes the message with `ctx`, keeping the error's category.
    fn prefixed(self, ctx: &str) -> Self {
        match self {
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), format!("{ctx}: {e}"))),
            Self::DataProcessing(msg) => Self::DataProcessing(format!("{ctx}: {msg}")),
            Self::Config(msg) => Self::Config(format!("{ctx}: {msg}")),
            err @ Self::ColumnNotFound(_) => Self::Other(format!("{ctx}: {err}")),
            Self::Other(msg) => Self::Other(format!("{ctx}: {msg}")),
        }
    }
}

/// `.context()` for boundary code returning [`Result`].
pub trait ResultExt<T> {
    fn context(self, msg: impl Into<String>) -> Result<T>;

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<DataInspectError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| Into::<DataInspectError>::into(e).prefixed(&msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| Into::<DataInspectError>::into(e).prefixed(&f()))
    }
}
