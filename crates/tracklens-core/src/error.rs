//! Error types for tracklens.
//!
//! Resolution failures carry the legal alternatives so the caller can render a
//! retryable message without going back to the upstream API.

use thiserror::Error;

/// Main error type for tracklens operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure (connection refused, TLS, ...)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Upstream API answered with a non-2xx status
    #[error("Upstream request failed: {status} - {body}")]
    UpstreamRequestFailed { status: u16, body: String },

    /// Response or input could not be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// No field in the catalog matches the requested name
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Field exists but is absent from the issue's edit metadata
    #[error("Field '{field}' is not editable on {issue}")]
    FieldNotEditable { issue: String, field: String },

    /// Field has no enumerable allowed values
    #[error("Field '{0}' is not an option field (no allowed values)")]
    NotAnOptionField(String),

    /// Fuzzy match was rejected by the threshold
    #[error("{}", no_close_match_message(.input, .candidates, .omitted))]
    NoCloseMatch {
        input: String,
        candidates: Vec<String>,
        omitted: usize,
    },

    /// No agile board is associated with the project
    #[error("{}", no_boards_message(.project_key, .boards))]
    NoBoardsFound {
        project_key: String,
        boards: Vec<String>,
    },

    /// Boards matched but none of them yielded a sprint
    #[error("{}", no_sprints_message(.project_key, .board_errors))]
    NoSprintsFound {
        project_key: String,
        board_errors: Vec<String>,
    },

    /// A sprint identifier was required to be numeric
    #[error("Invalid sprint id '{0}': expected a number")]
    InvalidSprintId(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tool needs a provider that is not configured
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Map a non-success HTTP status and body to an error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        Error::UpstreamRequestFailed {
            status,
            body: body.into(),
        }
    }

    /// Whether this error came from fuzzy resolution (the agent can retry with
    /// one of the listed alternatives).
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Error::FieldNotFound(_)
                | Error::FieldNotEditable { .. }
                | Error::NotAnOptionField(_)
                | Error::NoCloseMatch { .. }
                | Error::NoBoardsFound { .. }
                | Error::NoSprintsFound { .. }
                | Error::InvalidSprintId(_)
        )
    }
}

fn no_close_match_message(input: &str, candidates: &[String], omitted: &usize) -> String {
    let mut message = format!(
        "No close match for '{}'. Available: {}",
        input,
        candidates.join(", ")
    );
    if *omitted > 0 {
        message.push_str(&format!(" (and {} more)", omitted));
    }
    message
}

fn no_boards_message(project_key: &str, boards: &[String]) -> String {
    if boards.is_empty() {
        format!("No boards found for project '{}'", project_key)
    } else {
        format!(
            "No boards found for project '{}'. Visible boards: {}",
            project_key,
            boards.join(", ")
        )
    }
}

fn no_sprints_message(project_key: &str, board_errors: &[String]) -> String {
    if board_errors.is_empty() {
        format!("No sprints found for project '{}'", project_key)
    } else {
        format!(
            "No sprints found for project '{}'. Board errors: {}",
            project_key,
            board_errors.join("; ")
        )
    }
}

/// Result type alias for tracklens operations.
pub type Result<T> = std::result::Result<T, Error>;
