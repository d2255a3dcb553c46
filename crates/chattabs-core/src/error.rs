//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Backend Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to subscribe to chat events: {reason}")]
    Subscription { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Tab Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Chat tab not found: {tab_id}")]
    TabNotFound { tab_id: String },

    #[error("Invalid tab: {message}")]
    InvalidTab { message: String },

    #[error("Failed to load history for tab {tab_id}: {reason}")]
    HistoryLoad { tab_id: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Filter Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid filter at {path}: {reason}")]
    InvalidFilter { path: String, reason: String },

    #[error("Filter group limit reached ({max} groups)")]
    FilterGroupLimit { max: usize },

    #[error("Filter index out of range: {message}")]
    FilterIndex { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn subscription(reason: impl Into<String>) -> Self {
        Self::Subscription {
            reason: reason.into(),
        }
    }

    pub fn tab_not_found(tab_id: impl Into<String>) -> Self {
        Self::TabNotFound {
            tab_id: tab_id.into(),
        }
    }

    pub fn invalid_tab(message: impl Into<String>) -> Self {
        Self::InvalidTab {
            message: message.into(),
        }
    }

    pub fn history_load(tab_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HistoryLoad {
            tab_id: tab_id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_filter(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn filter_index(message: impl Into<String>) -> Self {
        Self::FilterIndex {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::TabNotFound { .. }
                | Error::InvalidTab { .. }
                | Error::HistoryLoad { .. }
                | Error::InvalidFilter { .. }
                | Error::FilterGroupLimit { .. }
                | Error::FilterIndex { .. }
                | Error::Subscription { .. }
        )
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ChannelClosed)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions (for use with color-eyre)
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
