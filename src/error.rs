//! Error taxonomy for feed, reaction and post operations

use std::sync::Mutex;

use thiserror::Error;

/// Errors raised while talking to the social backend
#[derive(Error, Debug)]
pub enum FeedError {
    /// The transport could not reach the endpoint (connect failure, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// The payload did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No token is stored, so the call was skipped
    #[error("Not signed in: no access token available")]
    AuthMissing,
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// Result alias used across the API layer
pub type FeedResult<T> = Result<T, FeedError>;

/// Shared error-reporting collaborator (toast, log line, ...)
pub trait ErrorReporter: Send + Sync {
    /// Report a failed operation. `context` names what was being attempted.
    fn report(&self, context: &str, error: &FeedError);
}

/// Reporter that writes failures to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, error: &FeedError) {
        tracing::warn!("{context} failed: {error}");
    }
}

/// Reporter that keeps every message, for callers that render errors later
#[derive(Debug, Default)]
pub struct CollectingReporter {
    messages: Mutex<Vec<String>>,
}

impl CollectingReporter {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all collected messages, leaving the reporter empty
    pub fn drain(&self) -> Vec<String> {
        let mut messages = self
            .messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        std::mem::take(&mut *messages)
    }

    /// Number of messages collected so far
    pub fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been reported
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, context: &str, error: &FeedError) {
        tracing::debug!("collecting error from {context}");
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(format!("{context}: {error}"));
    }
}
