//! # Reacton Core
//!
//! A priority-ordered, selector-matched event dispatcher.
//!
//! Handlers are bound to *selectors*: either a plain event name
//! (`offer.accepted`) or a pattern written with a jQuery-style attribute
//! operator. Triggering an event runs every applicable handler in descending
//! priority order, ties broken by registration order, and collects their
//! return values.
//!
//! | Selector        | Matches event names that           |
//! |-----------------|------------------------------------|
//! | `offer.accept`  | are exactly `offer.accept`         |
//! | `^=offer`       | begin with `offer`                 |
//! | `$=accepted`    | end with `accepted`                |
//! | `*=ffe`         | contain `ffe`                      |
//! | `~=accept`      | contain the word `accept`          |
//! | `!=offer`       | are anything but `offer`           |
//!
//! Words for `~=` are delimited by `.`, `:` and `-`.
//!
//! ## Modules
//!
//! - [`selector`]: selector grammar and parsing ([`Selector`], [`MatchOperator`])
//! - [`pattern`]: compiled pattern matchers ([`PatternMatcher`])
//! - [`registry`]: handler storage and resolution ([`HandlerRegistry`])
//! - [`dispatcher`]: the trigger walk ([`Dispatcher`], [`Binding`])
//! - [`service`]: `tower::Service` integration ([`TriggerRequest`])
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use parking_lot::Mutex;
//! use reacton_core::prelude::*;
//!
//! struct User {
//!     name: Mutex<String>,
//! }
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.on("offer.accept")?.call(|ctx: &mut EventContext| -> Result<String, HandlerError> {
//!     let user = ctx.target::<User>().ok_or("not a user")?;
//!     let dollars: u32 = ctx.param_as("dollars")?;
//!     Ok(format!(
//!         "{}, I have accepted your offer of ${dollars}",
//!         user.name.lock()
//!     ))
//! })?;
//!
//! let mut args = Arguments::new();
//! args.insert("dollars".into(), 24.into());
//! let target = Arc::new(User { name: Mutex::new("John".into()) });
//!
//! let responses = dispatcher.trigger("offer.accept", target, args)?;
//! assert_eq!(responses[0], "John, I have accepted your offer of $24");
//! # Ok::<(), ReactonError>(())
//! ```

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod pattern;
pub mod registry;
pub mod response;
pub mod selector;
pub mod service;

pub use context::{Arguments, EventContext, Target, no_target};
pub use dispatcher::{Binding, Dispatcher};
pub use error::{
    DispatchError, HandlerError, HandlerResult, ReactonError, ReactonResult, VALID_SELECTOR_TEXT,
};
pub use handler::{Handler, HandlerRef, IntoResponse, Json, Named, handler_fn};
pub use pattern::PatternMatcher;
pub use registry::{DEFAULT_PRIORITY, HandlerEntry, HandlerRegistry};
pub use response::ResponseCollection;
pub use selector::{MatchOperator, Selector, is_valid_selector};
pub use service::TriggerRequest;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Arguments, Dispatcher, EventContext, Handler, HandlerEntry, HandlerError, Json,
        ReactonError, ReactonResult, ResponseCollection, Selector, Target, handler_fn, no_target,
    };
}
