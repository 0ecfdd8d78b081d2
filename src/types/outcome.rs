//! Two-valued outcome delivered by a completed call.
//!
//! An [`Outcome`] is exactly one of a success value or a [`CallError`]. It is
//! immutable once constructed. Cancellation has no outcome: a cancelled call
//! never delivers one.

use crate::error::CallError;
use core::fmt;

/// The success-or-error result of a call.
#[derive(Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Completed with a value.
    Ok(T),
    /// Completed with an error.
    Err(CallError),
}

impl<T> Outcome<T> {
    /// Creates a success outcome.
    #[must_use]
    pub const fn value(value: T) -> Self {
        Self::Ok(value)
    }

    /// Creates a failed outcome.
    #[must_use]
    pub const fn error(error: CallError) -> Self {
        Self::Err(error)
    }

    /// True iff this outcome was constructed from a value.
    #[must_use]
    pub const fn has_value(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Borrows the value, if any.
    #[must_use]
    pub const fn as_value(&self) -> Option<&T> {
        match self {
            Self::Ok(v) => Some(v),
            Self::Err(_) => None,
        }
    }

    /// Borrows the error, if any.
    #[must_use]
    pub const fn as_error(&self) -> Option<&CallError> {
        match self {
            Self::Ok(_) => None,
            Self::Err(e) => Some(e),
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, CallError> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(e),
        }
    }

    /// Maps the success value, leaving errors untouched.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Ok(v) => Outcome::Ok(f(v)),
            Self::Err(e) => Outcome::Err(e),
        }
    }
}

impl<T> From<Result<T, CallError>> for Outcome<T> {
    fn from(result: Result<T, CallError>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Err(e),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(v) => f.debug_tuple("Ok").field(v).finish(),
            Self::Err(e) => f.debug_tuple("Err").field(e).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_outcome_has_value() {
        let out = Outcome::value("x");
        assert!(out.has_value());
        assert_eq!(out.as_value(), Some(&"x"));
        assert!(out.as_error().is_none());
    }

    #[test]
    fn error_outcome_has_no_value() {
        let out: Outcome<u8> = Outcome::error(CallError::timeout());
        assert!(!out.has_value());
        assert!(out.as_error().is_some_and(CallError::is_timeout));
        assert!(out.into_result().is_err());
    }

    #[test]
    fn map_preserves_errors() {
        let ok = Outcome::value(2).map(|v| v * 10);
        assert_eq!(ok, Outcome::Ok(20));

        let err: Outcome<i32> = Outcome::error(CallError::nil_call());
        assert_eq!(err.map(|v| v * 10), Outcome::Err(CallError::nil_call()));
    }

    #[test]
    fn from_result() {
        let out: Outcome<u8> = Ok(1).into();
        assert_eq!(out, Outcome::Ok(1));
        let out: Outcome<u8> = Err(CallError::timeout()).into();
        assert!(!out.has_value());
    }
}
