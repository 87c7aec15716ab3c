use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of runtime errors.
///
/// Failure filters are expressed in terms of kinds: a completed exchange
/// counts toward a circuit breaker's failure threshold only if its attached
/// error matches one of the configured kinds (or the filter is empty, in
/// which case any error counts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The downstream handler did not answer in time.
    Timeout,
    /// The downstream handler reported a failure of its own.
    Upstream,
    /// Admission was refused because the circuit is open.
    CircuitOpen,
    /// Admission was refused because the runtime is shutting down.
    NotRunnable,
    /// I/O failure while handling the exchange.
    Io,
    /// The payload could not be serialized or deserialized.
    Serialization,
    /// Invariant violation inside the runtime.
    Internal,
}

/// Unified error type for the pipeline runtime.
///
/// Handler-side errors (`Upstream`, `Timeout`, `Io`, `Serialization`) travel
/// through the pipeline attached to the exchange and are never translated;
/// rejection errors (`CircuitOpen`, `NotRunnable`) are attached by pipeline
/// elements that refuse to forward an exchange.
#[derive(Debug, Error)]
pub enum Error {
    #[error("upstream handler failed: {message}")]
    Upstream {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("timed out: {message}")]
    Timeout { message: String },

    #[error("circuit breaker open: failures: {failures}, last failure: {last_failure_ms}ms")]
    CircuitOpen { failures: u32, last_failure_ms: u64 },

    #[error("rejected: runtime is not runnable")]
    NotRunnable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create an upstream handler error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Error::Upstream {
            message: message.into(),
            source: None,
        }
    }

    /// Create an upstream handler error wrapping its cause.
    pub fn upstream_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Upstream {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Error::Timeout {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// The kind this error classifies as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Upstream { .. } => ErrorKind::Upstream,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Error::NotRunnable => ErrorKind::NotRunnable,
            Error::Io(_) => ErrorKind::Io,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// True if this error, or any error in its source chain, classifies as
    /// `kind`.
    pub fn matches_kind(&self, kind: ErrorKind) -> bool {
        if self.kind() == kind {
            return true;
        }
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            if let Some(err) = cause.downcast_ref::<Error>() {
                if err.kind() == kind {
                    return true;
                }
            }
            source = cause.source();
        }
        false
    }
}
