//! Load-pipeline error taxonomy and user-facing message formatting.
//!
//! Uses typed error matching (PolarsError variants) rather than string
//! parsing to produce actionable messages. Every variant is absorbed at the
//! load-orchestration boundary into a `Failed` record; nothing here crashes
//! the process.

use polars::prelude::PolarsError;
use std::fmt;

/// Errors that can interrupt a catalog or datastore load.
#[derive(Debug, Clone)]
pub enum LoadError {
    /// Non-success HTTP status or transport failure. `status` is None for
    /// transport-level failures (DNS, refused connection, timeout).
    Network { status: Option<u16>, message: String },
    /// The query engine worker could not be started, or stopped unexpectedly.
    EngineInit(String),
    /// Malformed or failing SQL, or an unreadable data buffer.
    Query(String),
    /// A polling caller found no cache record after waiting.
    NotFound(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Network { message, .. } => write!(f, "{}", message),
            LoadError::EngineInit(msg) => write!(f, "Could not start the query engine: {}", msg),
            LoadError::Query(msg) => write!(f, "{}", msg),
            LoadError::NotFound(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<PolarsError> for LoadError {
    fn from(err: PolarsError) -> Self {
        LoadError::Query(user_message_from_polars(&err))
    }
}

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. The data file may not match the expected schema.",
            msg
        ),
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::SchemaFieldNotFound(msg) => format!("Schema field not found: {}", msg),
        PE::ComputeError(msg) => format!("Query failed: {}", msg),
        PE::SQLInterface(msg) | PE::SQLSyntax(msg) => msg.to_string(),
        PE::IO { error, .. } => format!("I/O error while reading data: {}", error),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}
