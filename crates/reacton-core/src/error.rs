//! Error types for the Reacton engine.

use thiserror::Error;

use crate::response::ResponseCollection;

/// Human readable description of the selector grammar, used in error messages.
pub const VALID_SELECTOR_TEXT: &str = "letters, numbers, colon (:), dot (.), underscore (_), \
     dash (-), optionally prefixed with a jQuery-style attribute operator (^=, $=, *=, ~=, !=)";

/// Errors raised by selector parsing, registration and dispatch.
#[derive(Debug, Error)]
pub enum ReactonError {
    /// The selector text does not follow the selector grammar.
    #[error(
        "invalid selector '{selector}': a valid selector consists of {}",
        VALID_SELECTOR_TEXT
    )]
    InvalidSelector {
        /// The rejected selector text.
        selector: String,
    },

    /// A pattern-shaped or malformed string was used where a plain event name is required.
    #[error("'{0}' is not a valid event name")]
    InvalidEventName(String),

    /// The handler does not satisfy the invocable capability.
    #[error("invalid callback: {0}")]
    InvalidCallback(String),

    /// A registration was finalized without a selector.
    #[error("no event selector has been defined")]
    UndefinedSelector,

    /// The selector operator has no compiled matcher.
    #[error("unsupported selector operator '{0}'")]
    UnsupportedSelectorOperator(String),

    /// A plain event name was handed to the pattern compiler.
    #[error("selector '{0}' is a plain event name, not a pattern")]
    NotAPattern(String),

    /// A handler failed while the event was being dispatched.
    #[error(transparent)]
    Handler(#[from] DispatchError),
}

impl ReactonError {
    /// Creates an invalid selector error.
    pub fn invalid_selector(selector: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
        }
    }

    /// Creates an invalid callback error.
    pub fn invalid_callback(reason: impl Into<String>) -> Self {
        Self::InvalidCallback(reason.into())
    }

    /// Returns the partial responses if this error came from a failing handler.
    pub fn partial_responses(&self) -> Option<&ResponseCollection> {
        match self {
            Self::Handler(err) => Some(&err.partial),
            _ => None,
        }
    }
}

/// Error returned by a handler invocation.
///
/// Handlers convert their own failures into this type; the engine never
/// inspects it beyond forwarding it to the caller.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl HandlerError {
    /// Creates a handler error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an arbitrary error.
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::msg(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

/// A handler failure that aborted a dispatch walk.
///
/// The responses collected before the failing handler are preserved in
/// [`partial`](Self::partial).
#[derive(Debug, Error)]
#[error("handler #{position} for event '{event_name}' failed: {source}")]
pub struct DispatchError {
    /// The event being dispatched.
    pub event_name: String,
    /// Zero-based position of the failing handler in the resolved order.
    pub position: usize,
    /// Responses produced before the failure.
    pub partial: ResponseCollection,
    /// The handler's error.
    #[source]
    pub source: HandlerError,
}

/// Result type for engine operations.
pub type ReactonResult<T> = Result<T, ReactonError>;

/// Result type returned by handlers.
pub type HandlerResult = Result<serde_json::Value, HandlerError>;
