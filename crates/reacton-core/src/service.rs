//! Tower integration.
//!
//! [`Dispatcher`] implements `tower::Service<TriggerRequest>`, so a trigger
//! can be composed with Tower middleware:
//!
//! ```rust
//! use reacton_core::{Dispatcher, EventContext, TriggerRequest};
//! use tower::ServiceExt;
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.on("offer.accept")?.call(|_: &mut EventContext| "accepted")?;
//!
//! let responses = tokio_test::block_on(
//!     dispatcher.clone().oneshot(TriggerRequest::new("offer.accept")),
//! )?;
//! assert_eq!(responses[0], "accepted");
//! # Ok::<(), reacton_core::ReactonError>(())
//! ```
//!
//! Dispatch itself is synchronous; the returned future is always ready.

use std::future::{Ready, ready};
use std::task::{Context, Poll};

use serde_json::Value;
use tower::Service;

use crate::context::{Arguments, Target, no_target};
use crate::dispatcher::Dispatcher;
use crate::error::ReactonError;
use crate::response::ResponseCollection;

/// A trigger call packaged as a service request.
#[derive(Clone)]
pub struct TriggerRequest {
    event: String,
    target: Target,
    arguments: Arguments,
}

impl TriggerRequest {
    /// Creates a request for `event` with no target and no arguments.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            target: no_target(),
            arguments: Arguments::new(),
        }
    }

    /// Sets the event target.
    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Adds one argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Replaces all arguments.
    pub fn arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }

    /// Returns the event name.
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl std::fmt::Debug for TriggerRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerRequest")
            .field("event", &self.event)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

impl Service<TriggerRequest> for Dispatcher {
    type Response = ResponseCollection;
    type Error = ReactonError;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: TriggerRequest) -> Self::Future {
        let TriggerRequest {
            event,
            target,
            arguments,
        } = request;
        ready(self.trigger(&event, target, arguments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EventContext;
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn test_oneshot_triggers_event() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .on("offer.accept")
            .unwrap()
            .call(|ctx: &mut EventContext| -> Result<String, crate::HandlerError> {
                let dollars: u32 = ctx.param_as("dollars")?;
                Ok(format!("accepted ${dollars}"))
            })
            .unwrap();

        let request = TriggerRequest::new("offer.accept").arg("dollars", 24);
        let responses = tokio_test::block_on(dispatcher.oneshot(request)).unwrap();
        assert_eq!(responses.into_vec(), vec![json!("accepted $24")]);
    }

    #[test]
    fn test_service_reports_invalid_event_name() {
        let dispatcher = Dispatcher::new();
        let result = tokio_test::block_on(dispatcher.oneshot(TriggerRequest::new("^=offer")));
        assert!(matches!(result, Err(ReactonError::InvalidEventName(_))));
    }

    #[test]
    fn test_service_clones_share_registry() {
        let dispatcher = Dispatcher::new();
        let mut service = dispatcher.clone();
        dispatcher.on("e").unwrap().call(|_: &mut EventContext| 1).unwrap();

        let responses = tokio_test::block_on(async {
            service.ready().await?.call(TriggerRequest::new("e")).await
        })
        .unwrap();
        assert_eq!(responses.len(), 1);
    }
}
