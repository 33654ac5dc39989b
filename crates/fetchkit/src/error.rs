//! Error types for fetchkit.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The request was cancelled through its signal.
    #[error(transparent)]
    Abort(#[from] AbortError),

    /// The call is not valid for the controller's cancellation mode.
    #[error("invalid operation: {message}")]
    InvalidOperation { message: &'static str },

    /// The transport failed; the original error is preserved.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] Arc<serde_json::Error>),

    #[error("unknown event name '{0}', expected 'download' or 'upload'")]
    UnknownEvent(String),

    #[error("invalid transport configuration: {0}")]
    Config(String),
}

impl Error {
    /// Stable discriminator for the failure kind.
    pub fn name(&self) -> &'static str {
        match self {
            Error::Abort(e) => e.name(),
            Error::InvalidOperation { .. } => "InvalidOperation",
            Error::Transport(_) => "TransportFailure",
            Error::Decode(_) => "DecodeError",
            Error::UnknownEvent(_) => "UnknownEvent",
            Error::Config(_) => "ConfigError",
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Abort(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(Arc::new(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Rejection reason for a request cancelled through its signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("Aborted")]
pub struct AbortError;

impl AbortError {
    pub const NAME: &'static str = "AbortError";

    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }
}

/// A failure produced by the transport, shared so it can be handed to every
/// waiter of the same request.
#[derive(Clone)]
pub struct TransportError {
    inner: Arc<dyn StdError + Send + Sync>,
}

impl TransportError {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Build a transport error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// The error exactly as the transport reported it.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.inner
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}

impl fmt::Debug for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("connection reset")]
    struct Reset;

    #[test]
    fn abort_error_has_stable_name() {
        let err = Error::from(AbortError::new());
        assert_eq!(err.name(), "AbortError");
        assert!(err.is_abort());
        assert_eq!(err.to_string(), "Aborted");
    }

    #[test]
    fn transport_error_is_not_wrapped() {
        let err = Error::from(TransportError::new(Reset));
        assert_eq!(err.name(), "TransportFailure");
        assert_eq!(err.to_string(), "connection reset");

        let Error::Transport(inner) = err else {
            panic!("expected transport error");
        };
        assert!(inner.downcast_ref::<Reset>().is_some());
    }

    #[test]
    fn invalid_operation_names_alternative() {
        let err = Error::InvalidOperation {
            message: "use AbortController::abort instead",
        };
        assert_eq!(err.name(), "InvalidOperation");
        assert!(err.to_string().contains("AbortController::abort"));
    }

    #[test]
    fn decode_error_converts_from_serde() {
        let raw = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(raw);
        assert_eq!(err.name(), "DecodeError");
    }
}
