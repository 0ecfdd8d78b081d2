//! Error types and error handling strategy for lifecall.
//!
//! Error handling follows two rules:
//!
//! - **Domain errors** travel inside an [`Outcome`](crate::types::Outcome) and
//!   are delivered through the normal completion path. They are never raised
//!   across the call boundary.
//! - **Usage-contract violations** (blocking the main context with
//!   [`sync`](crate::call::CallExt::sync), corrupt internal state) panic.
//!   Continuing would deadlock or reorder completions.
//!
//! Cancellation is not an error: a cancelled call simply never delivers.
//!
//! # Well-known errors
//!
//! | Kind | Domain | Code |
//! |------|--------|------|
//! | [`ErrorKind::Timeout`] | `"Time out"` | `-100001` |
//! | [`ErrorKind::NilCall`] | `"Nil call"` | `-200001` |

use core::fmt;
use thiserror::Error;

/// Fixed domains and codes of the well-known error kinds.
pub mod codes {
    /// Domain reported when a call misses its deadline.
    pub const TIMEOUT_DOMAIN: &str = "Time out";
    /// Code reported when a call misses its deadline.
    pub const TIMEOUT_CODE: i64 = -100_001;
    /// Message attached to timeout errors.
    pub const TIMEOUT_MESSAGE: &str = "Call time out";

    /// Domain reported when a required call is absent.
    pub const NIL_CALL_DOMAIN: &str = "Nil call";
    /// Code reported when a required call is absent.
    pub const NIL_CALL_CODE: i64 = -200_001;
    /// Message attached to nil-call errors.
    pub const NIL_CALL_MESSAGE: &str = "Continuation produced no call";
}

/// The kind of a [`CallError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The call did not complete before its deadline.
    Timeout,
    /// A continuation or wrapped target was absent when required.
    NilCall,
    /// Error produced by user code.
    Custom,
}

impl ErrorKind {
    /// Returns the fixed domain for well-known kinds.
    #[must_use]
    pub const fn domain(self) -> Option<&'static str> {
        match self {
            Self::Timeout => Some(codes::TIMEOUT_DOMAIN),
            Self::NilCall => Some(codes::NIL_CALL_DOMAIN),
            Self::Custom => None,
        }
    }

    /// Returns the fixed code for well-known kinds.
    #[must_use]
    pub const fn code(self) -> Option<i64> {
        match self {
            Self::Timeout => Some(codes::TIMEOUT_CODE),
            Self::NilCall => Some(codes::NIL_CALL_CODE),
            Self::Custom => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::NilCall => write!(f, "nil call"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// Error carried by a failed [`Outcome`](crate::types::Outcome).
///
/// Mirrors the `{domain, code, message}` triple surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{domain} ({code}): {message}")]
pub struct CallError {
    kind: ErrorKind,
    domain: String,
    code: i64,
    message: String,
}

impl CallError {
    /// Creates a custom error.
    ///
    /// A domain/code pair matching a well-known kind is classified as that kind.
    #[must_use]
    pub fn new(domain: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        let domain = domain.into();
        let kind = match (domain.as_str(), code) {
            (codes::TIMEOUT_DOMAIN, codes::TIMEOUT_CODE) => ErrorKind::Timeout,
            (codes::NIL_CALL_DOMAIN, codes::NIL_CALL_CODE) => ErrorKind::NilCall,
            _ => ErrorKind::Custom,
        };
        Self {
            kind,
            domain,
            code,
            message: message.into(),
        }
    }

    /// The error delivered when a call misses its deadline.
    #[must_use]
    pub fn timeout() -> Self {
        Self {
            kind: ErrorKind::Timeout,
            domain: codes::TIMEOUT_DOMAIN.to_string(),
            code: codes::TIMEOUT_CODE,
            message: codes::TIMEOUT_MESSAGE.to_string(),
        }
    }

    /// The error delivered when a continuation yields no call.
    #[must_use]
    pub fn nil_call() -> Self {
        Self {
            kind: ErrorKind::NilCall,
            domain: codes::NIL_CALL_DOMAIN.to_string(),
            code: codes::NIL_CALL_CODE,
            message: codes::NIL_CALL_MESSAGE.to_string(),
        }
    }

    /// Replaces the human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> i64 {
        self.code
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Returns true if this is a nil-call error.
    #[must_use]
    pub const fn is_nil_call(&self) -> bool {
        matches!(self.kind, ErrorKind::NilCall)
    }
}

/// Configuration error (invalid runtime settings, bad config file).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value the runtime cannot use.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// The config file could not be parsed.
    #[cfg(feature = "config-file")]
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A runtime thread could not be spawned.
    #[error("failed to spawn thread `{name}`: {source}")]
    Spawn {
        /// Name of the thread that failed to start.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
