//! Crate-wide error type.
//!
//! Flat `thiserror` enum, one variant per error kind in the error handling
//! design. No web-framework coupling: this is a CLI/library crate, not a
//! server.

/// Errors surfaced anywhere in the harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("tool invocation error: {0}")]
    ToolInvocation(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("scoring error: {0}")]
    Scoring(String),
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
