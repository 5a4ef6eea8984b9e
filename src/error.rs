//! Error types for the routing graph

use thiserror::Error;

/// Result type alias for the routing graph
pub type Result<T> = std::result::Result<T, GraphError>;

/// Main error type for the routing graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// Malformed graph detected at construction time (dangling handoff
    /// target, missing entry node). Never recoverable at request time.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A node's reasoning engine or tool failed during execution. The turn
    /// is aborted; the last good checkpoint is untouched.
    #[error("Turn execution failed in agent '{agent}': {message}")]
    TurnExecution { agent: String, message: String },

    /// The thread reached a state the graph cannot explain (multiple
    /// suspension triggers, unknown destination). Fatal for the thread.
    #[error("Consistency violation: {message}")]
    Consistency { message: String },

    /// Checkpoint read/write failure, retryable by the caller.
    #[error("Checkpoint store error: {0}")]
    Store(String),

    /// The hop budget for a single turn was exhausted.
    #[error("Hop budget exceeded: {max_hops}")]
    HopBudgetExceeded { max_hops: usize },

    /// Caller misuse (e.g. resuming a thread that is not suspended).
    #[error("User error: {message}")]
    User { message: String },

    /// Error from the OpenAI API
    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GraphError {
    /// Shorthand for a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for a consistency violation.
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }
}
