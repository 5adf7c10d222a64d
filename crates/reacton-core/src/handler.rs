//! Handler capability.
//!
//! A handler is anything that can be invoked with an [`EventContext`] and
//! produce a JSON value. Closures are handlers out of the box:
//!
//! ```rust
//! use reacton_core::{Dispatcher, EventContext};
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher
//!     .on("offer.accept")
//!     .unwrap()
//!     .call(|ctx: &mut EventContext| format!("accepted {}", ctx.name()))
//!     .unwrap();
//! ```
//!
//! Return values are converted through [`IntoResponse`]: `()` becomes
//! `null`, strings and numbers become their JSON counterparts, `Option`
//! maps `None` to `null`, and `Result` turns `Err` into a handler failure
//! that aborts the dispatch walk.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::context::EventContext;
use crate::error::{HandlerError, HandlerResult};

/// A shared, type-erased handler reference.
pub type HandlerRef = Arc<dyn Handler>;

/// The core capability every registered handler satisfies.
pub trait Handler: Send + Sync + 'static {
    /// Invokes the handler for the current event.
    fn invoke(&self, ctx: &mut EventContext) -> HandlerResult;

    /// Returns whether this handler can be invoked.
    ///
    /// Registration rejects handlers that report `false`. Handlers that wrap
    /// a late-bound target override this to report a missing binding.
    fn is_invocable(&self) -> bool {
        true
    }

    /// Returns a name for this handler, used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F, R> Handler for F
where
    F: Fn(&mut EventContext) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
    fn invoke(&self, ctx: &mut EventContext) -> HandlerResult {
        self(ctx).into_response()
    }
}

/// Boxes a closure into a [`HandlerRef`].
///
/// Unlike passing the closure to a generic `H: Handler` parameter, the
/// closure's argument type is inferred here.
pub fn handler_fn<F, R>(f: F) -> HandlerRef
where
    F: Fn(&mut EventContext) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
    Arc::new(f)
}

/// A handler with an explicit name, useful for log output.
pub struct Named<H> {
    name: String,
    inner: H,
}

impl<H: Handler> Named<H> {
    /// Wraps `inner` under `name`.
    pub fn new(name: impl Into<String>, inner: H) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

impl<H: Handler> Handler for Named<H> {
    fn invoke(&self, ctx: &mut EventContext) -> HandlerResult {
        self.inner.invoke(ctx)
    }

    fn is_invocable(&self) -> bool {
        self.inner.is_invocable()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// IntoResponse - Handler return values
// ============================================================================

/// Converts a handler's return value into a response.
pub trait IntoResponse {
    /// Performs the conversion.
    fn into_response(self) -> HandlerResult;
}

impl IntoResponse for () {
    fn into_response(self) -> HandlerResult {
        Ok(Value::Null)
    }
}

impl IntoResponse for Value {
    fn into_response(self) -> HandlerResult {
        Ok(self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> HandlerResult {
        Ok(Value::String(self))
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> HandlerResult {
        Ok(Value::from(self))
    }
}

macro_rules! into_response_via_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoResponse for $ty {
                fn into_response(self) -> HandlerResult {
                    Ok(Value::from(self))
                }
            }
        )*
    };
}

into_response_via_from!(bool, i32, i64, u32, u64, f64);

impl<T: IntoResponse> IntoResponse for Option<T> {
    fn into_response(self) -> HandlerResult {
        match self {
            Some(value) => value.into_response(),
            None => Ok(Value::Null),
        }
    }
}

impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: Into<HandlerError>,
{
    fn into_response(self) -> HandlerResult {
        match self {
            Ok(value) => value.into_response(),
            Err(err) => Err(err.into()),
        }
    }
}

/// Serializes any `Serialize` value into the response.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> HandlerResult {
        Ok(serde_json::to_value(self.0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Arguments, no_target};
    use serde_json::json;

    fn ctx() -> EventContext {
        EventContext::new("offer.accept", no_target(), Arguments::new())
    }

    #[test]
    fn test_closure_is_handler() {
        let handler = handler_fn(|ctx| format!("handled {}", ctx.name()));
        assert_eq!(handler.invoke(&mut ctx()).unwrap(), json!("handled offer.accept"));
        assert!(handler.is_invocable());
    }

    #[test]
    fn test_response_conversions() {
        assert_eq!(().into_response().unwrap(), Value::Null);
        assert_eq!("x".into_response().unwrap(), json!("x"));
        assert_eq!(7_i64.into_response().unwrap(), json!(7));
        assert_eq!(true.into_response().unwrap(), json!(true));
        assert_eq!(None::<String>.into_response().unwrap(), Value::Null);
        assert_eq!(Some(3_u32).into_response().unwrap(), json!(3));
        assert_eq!(
            Json(vec!["a", "b"]).into_response().unwrap(),
            json!(["a", "b"])
        );
    }

    #[test]
    fn test_result_error_becomes_handler_error() {
        let result: Result<String, &str> = Err("boom");
        let err = result.into_response().unwrap_err();
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_named_handler() {
        let named = Named::new("offer.logger", |_: &mut EventContext| ());
        assert_eq!(named.name(), "offer.logger");
        assert_eq!(named.invoke(&mut ctx()).unwrap(), Value::Null);
    }
}
