//! Event dispatcher for Reacton.
//!
//! The [`Dispatcher`] owns a [`HandlerRegistry`] and drives the dispatch walk
//! for every triggered event:
//!
//! 1. The event name is validated; pattern selectors can only be used for
//!    registration, never as a trigger target.
//! 2. The applicable handlers are resolved from the registry into one
//!    priority-ordered sequence (exact and pattern bindings interleaved).
//! 3. Handlers are invoked in order. After each one the walk stops if the
//!    handler stopped propagation, or if the short-circuit predicate accepts
//!    the handler's response.
//!
//! ```rust
//! use reacton_core::{Dispatcher, EventContext, no_target};
//! use serde_json::Map;
//!
//! let dispatcher = Dispatcher::new();
//!
//! dispatcher
//!     .on("^=offer")?
//!     .priority(10)
//!     .call(|ctx: &mut EventContext| format!("audit {}", ctx.name()))?;
//! dispatcher
//!     .on("offer.accept")?
//!     .call(|_: &mut EventContext| "accepted")?;
//!
//! let responses = dispatcher.trigger("offer.accept", no_target(), Map::new())?;
//! assert_eq!(responses.len(), 2);
//! assert_eq!(responses[0], "audit offer.accept");
//! # Ok::<(), reacton_core::ReactonError>(())
//! ```
//!
//! # Concurrency
//!
//! The registry sits behind a reader/writer lock. A trigger resolves its
//! handler sequence under the read lock and releases it before invoking any
//! handler, so a walk always sees one consistent snapshot: bindings added
//! while a walk is running do not join it, and handlers may themselves
//! register or detach bindings.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{Level, debug, span, trace};

use crate::context::{Arguments, EventContext, Target};
use crate::error::{DispatchError, ReactonError, ReactonResult};
use crate::handler::{Handler, HandlerRef};
use crate::registry::{DEFAULT_PRIORITY, HandlerEntry, HandlerRegistry};
use crate::response::ResponseCollection;
use crate::selector::Selector;

struct DispatcherInner {
    registry: RwLock<HandlerRegistry>,
    default_priority: i64,
}

/// The central event dispatcher.
///
/// `Dispatcher` is a cheap handle: clones share the same registry. It is
/// `Send + Sync` and can be shared across threads.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Creates a dispatcher using [`DEFAULT_PRIORITY`] for bindings without
    /// an explicit priority.
    pub fn new() -> Self {
        Self::with_default_priority(DEFAULT_PRIORITY)
    }

    /// Creates a dispatcher with a custom default priority.
    pub fn with_default_priority(default_priority: i64) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry: RwLock::new(HandlerRegistry::new()),
                default_priority,
            }),
        }
    }

    /// Returns the priority applied to bindings that do not specify one.
    pub fn default_priority(&self) -> i64 {
        self.inner.default_priority
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Starts a binding for `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`ReactonError::InvalidSelector`] if the selector is malformed.
    pub fn on(&self, selector: &str) -> ReactonResult<Binding<'_>> {
        Ok(self.on_selector(Selector::parse(selector)?))
    }

    /// Starts a binding for an already parsed selector.
    pub fn on_selector(&self, selector: Selector) -> Binding<'_> {
        Binding {
            dispatcher: self,
            selector,
            priority: None,
        }
    }

    /// Binds `handler` to `selector` at `priority`.
    ///
    /// # Errors
    ///
    /// See [`HandlerRegistry::register`].
    pub fn register(
        &self,
        selector: Selector,
        handler: HandlerRef,
        priority: i64,
    ) -> ReactonResult<HandlerEntry> {
        self.inner.registry.write().register(selector, handler, priority)
    }

    /// Returns `true` if `entry` is currently registered with this dispatcher.
    pub fn has_handler(&self, entry: &HandlerEntry) -> bool {
        self.inner.registry.read().contains(entry)
    }

    /// Removes a binding. Detaching an unknown entry is a no-op.
    pub fn detach(&self, entry: &HandlerEntry) -> bool {
        self.inner.registry.write().unregister(entry)
    }

    /// Returns the number of registered bindings.
    pub fn handler_count(&self) -> usize {
        self.inner.registry.read().len()
    }

    /// Removes every binding.
    pub fn clear(&self) {
        self.inner.registry.write().clear();
    }

    /// Returns the handlers that a trigger of `event_name` would invoke.
    ///
    /// # Errors
    ///
    /// Returns [`ReactonError::InvalidEventName`] if `event_name` is not a
    /// plain event name.
    pub fn resolve(&self, event_name: &str) -> ReactonResult<Vec<HandlerEntry>> {
        let name = Selector::event_name(event_name)?;
        Ok(self.inner.registry.read().resolve(name.name_text()))
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Triggers `event_name`, running every applicable handler unless one
    /// stops propagation.
    ///
    /// # Errors
    ///
    /// - [`ReactonError::InvalidEventName`] if `event_name` is a pattern or
    ///   malformed.
    /// - [`ReactonError::Handler`] if a handler fails; the remaining handlers
    ///   are skipped and the responses gathered so far travel with the error.
    pub fn trigger(
        &self,
        event_name: &str,
        target: Target,
        arguments: Arguments,
    ) -> ReactonResult<ResponseCollection> {
        self.trigger_until(event_name, target, arguments, |_| false)
    }

    /// Triggers `event_name`, stopping as soon as `stop` accepts a response.
    ///
    /// The handler-driven stop is checked before the predicate.
    ///
    /// # Errors
    ///
    /// Same as [`trigger`](Self::trigger).
    pub fn trigger_until<P>(
        &self,
        event_name: &str,
        target: Target,
        arguments: Arguments,
        mut stop: P,
    ) -> ReactonResult<ResponseCollection>
    where
        P: FnMut(&Value) -> bool,
    {
        let name = Selector::event_name(event_name)?;
        let span = span!(Level::DEBUG, "dispatch", event_name = %name);
        let _enter = span.enter();

        let handlers = self.inner.registry.read().resolve(name.name_text());
        trace!(handler_count = handlers.len(), "Resolved handlers");

        let mut ctx = EventContext::new(name.name_text(), target, arguments);
        walk(&handlers, &mut ctx, &mut stop)
    }

    /// Triggers several events in order and concatenates their responses.
    ///
    /// All names are validated before any handler runs. Stopping propagation
    /// ends the walk for the current event only; the next event is still
    /// dispatched. The returned collection is `stopped` if any walk stopped.
    ///
    /// # Errors
    ///
    /// Same as [`trigger`](Self::trigger). A failing handler aborts the
    /// remaining events too; the partial responses include those of the
    /// events already dispatched.
    pub fn trigger_many<I, S>(
        &self,
        event_names: I,
        target: Target,
        arguments: Arguments,
    ) -> ReactonResult<ResponseCollection>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = event_names
            .into_iter()
            .map(|name| Selector::event_name(name.as_ref()))
            .collect::<ReactonResult<Vec<_>>>()?;

        let mut responses = ResponseCollection::new();
        for name in &names {
            match self.trigger(name.name_text(), Arc::clone(&target), arguments.clone()) {
                Ok(collected) => responses.absorb(collected),
                Err(ReactonError::Handler(mut err)) => {
                    responses.absorb(std::mem::take(&mut err.partial));
                    err.partial = responses;
                    return Err(ReactonError::Handler(err));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(responses)
    }
}

/// Invokes `handlers` in order against `ctx`.
fn walk<P>(
    handlers: &[HandlerEntry],
    ctx: &mut EventContext,
    stop: &mut P,
) -> ReactonResult<ResponseCollection>
where
    P: FnMut(&Value) -> bool,
{
    let mut responses = ResponseCollection::new();

    for (position, entry) in handlers.iter().enumerate() {
        trace!(
            handler = entry.handler().name(),
            selector = %entry.selector(),
            priority = entry.priority(),
            position,
            "Invoking handler"
        );

        let response = match entry.invoke(ctx) {
            Ok(response) => response,
            Err(source) => {
                debug!(position, error = %source, "Handler failed, aborting dispatch");
                return Err(DispatchError {
                    event_name: ctx.name().to_string(),
                    position,
                    partial: responses,
                    source,
                }
                .into());
            }
        };

        if ctx.is_propagation_stopped() {
            responses.push(response);
            debug!(
                handler = entry.handler().name(),
                "Handler stopped propagation"
            );
            responses.set_stopped(true);
            break;
        }

        let accepted = stop(&response);
        responses.push(response);

        if accepted {
            debug!(
                handler = entry.handler().name(),
                "Short-circuit predicate accepted response, stopping dispatch"
            );
            responses.set_stopped(true);
            break;
        }
    }

    Ok(responses)
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &*self.inner.registry.read())
            .field("default_priority", &self.inner.default_priority)
            .finish()
    }
}

// ============================================================================
// Binding - select-then-bind registration
// ============================================================================

/// A pending registration created by [`Dispatcher::on`].
///
/// The binding is consumed by [`call`](Self::call), so a selector is bound
/// exactly once.
#[must_use = "a binding does nothing until a handler is attached with `call`"]
pub struct Binding<'a> {
    dispatcher: &'a Dispatcher,
    selector: Selector,
    priority: Option<i64>,
}

impl Binding<'_> {
    /// Returns the selector being bound.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Sets the binding priority. Higher priorities run first.
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Attaches `handler`, completing the registration.
    ///
    /// # Errors
    ///
    /// See [`HandlerRegistry::register`].
    pub fn call<H: Handler>(self, handler: H) -> ReactonResult<HandlerEntry> {
        self.call_ref(Arc::new(handler))
    }

    /// Attaches `handler` at `priority`.
    ///
    /// # Errors
    ///
    /// See [`HandlerRegistry::register`].
    pub fn call_with_priority<H: Handler>(
        self,
        handler: H,
        priority: i64,
    ) -> ReactonResult<HandlerEntry> {
        self.priority(priority).call(handler)
    }

    /// Attaches an already shared handler.
    ///
    /// # Errors
    ///
    /// See [`HandlerRegistry::register`].
    pub fn call_ref(self, handler: HandlerRef) -> ReactonResult<HandlerEntry> {
        let priority = self
            .priority
            .unwrap_or(self.dispatcher.inner.default_priority);
        self.dispatcher.register(self.selector, handler, priority)
    }
}

impl fmt::Debug for Binding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("selector", &self.selector.to_string())
            .field("priority", &self.priority)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::no_target;
    use crate::error::HandlerError;
    use crate::handler::handler_fn;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct User {
        name: Mutex<String>,
    }

    fn dollars(amount: u32) -> Arguments {
        let mut args = Arguments::new();
        args.insert("dollars".into(), json!(amount));
        args
    }

    fn accept_offer(ctx: &mut EventContext) -> Result<String, HandlerError> {
        let user = ctx
            .target::<User>()
            .ok_or_else(|| HandlerError::msg("target is not a user"))?;
        let dollars: u32 = ctx.param_as("dollars")?;
        Ok(format!(
            "{}, I have accepted your offer of ${dollars}",
            user.name.lock()
        ))
    }

    fn user(name: &str) -> Target {
        Arc::new(User {
            name: Mutex::new(name.to_string()),
        })
    }

    #[test]
    fn test_trigger_without_handlers() {
        let dispatcher = Dispatcher::new();
        let responses = dispatcher.trigger("nothing", no_target(), Arguments::new()).unwrap();
        assert!(responses.is_empty());
        assert!(!responses.stopped());
    }

    #[test]
    fn test_handler_response_is_collected() {
        let dispatcher = Dispatcher::new();
        let entry = dispatcher.on("offer.accept").unwrap().call(accept_offer).unwrap();
        assert!(dispatcher.has_handler(&entry));

        let responses = dispatcher
            .trigger("offer.accept", user("jane"), dollars(24))
            .unwrap();
        assert_eq!(responses.first(), Some(&json!("jane, I have accepted your offer of $24")));
    }

    #[test]
    fn test_handler_can_mutate_target() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .on("user.rename")
            .unwrap()
            .call(|ctx: &mut EventContext| {
                if let Some(user) = ctx.target::<User>() {
                    *user.name.lock() = "John".to_string();
                }
            })
            .unwrap();

        let target = user("jane");
        dispatcher
            .trigger("user.rename", Arc::clone(&target), Arguments::new())
            .unwrap();

        let user = target.downcast_ref::<User>().unwrap();
        assert_eq!(*user.name.lock(), "John");
    }

    #[test]
    fn test_pattern_handler_runs_for_every_matching_event() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let dispatcher = Dispatcher::new();
        dispatcher
            .on("^=offer")
            .unwrap()
            .call(move |_: &mut EventContext| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        dispatcher.trigger("offer.accept", no_target(), dollars(24)).unwrap();
        dispatcher.trigger("offer.decline", no_target(), dollars(24)).unwrap();
        dispatcher.trigger("bad.offer", no_target(), dollars(24)).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_higher_priority_pattern_runs_before_exact() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .on("offer.accepted")
            .unwrap()
            .call(|_: &mut EventContext| "exact")
            .unwrap();
        dispatcher
            .on("^=offer")
            .unwrap()
            .priority(10)
            .call(|_: &mut EventContext| "pattern")
            .unwrap();

        let responses = dispatcher
            .trigger("offer.accepted", no_target(), Arguments::new())
            .unwrap();
        assert_eq!(responses.into_vec(), vec![json!("pattern"), json!("exact")]);
    }

    #[test]
    fn test_stop_propagation_short_circuits() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let dispatcher = Dispatcher::new();
        dispatcher
            .on("e")
            .unwrap()
            .call_with_priority(
                |ctx: &mut EventContext| {
                    ctx.stop_propagation();
                    "first"
                },
                5,
            )
            .unwrap();
        dispatcher
            .on("e")
            .unwrap()
            .call(move |_: &mut EventContext| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                "second"
            })
            .unwrap();

        let responses = dispatcher.trigger("e", no_target(), Arguments::new()).unwrap();
        assert!(responses.stopped());
        assert_eq!(responses.into_vec(), vec![json!("first")]);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_trigger_until_stops_on_accepted_response() {
        let dispatcher = Dispatcher::new();
        for (tag, priority) in [("a", 3), ("b", 2), ("c", 1)] {
            dispatcher
                .on("e")
                .unwrap()
                .call_with_priority(move |_: &mut EventContext| tag, priority)
                .unwrap();
        }

        let responses = dispatcher
            .trigger_until("e", no_target(), Arguments::new(), |r| r == "b")
            .unwrap();
        assert!(responses.stopped());
        assert_eq!(responses.into_vec(), vec![json!("a"), json!("b")]);

        let responses = dispatcher
            .trigger_until("e", no_target(), Arguments::new(), |r| r == "z")
            .unwrap();
        assert!(!responses.stopped());
        assert_eq!(responses.len(), 3);
    }

    #[test]
    fn test_trigger_until_skips_predicate_after_stop_propagation() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .on("e")
            .unwrap()
            .call_with_priority(
                |ctx: &mut EventContext| {
                    ctx.stop_propagation();
                    "halt"
                },
                5,
            )
            .unwrap();
        dispatcher.on("e").unwrap().call(|_: &mut EventContext| "later").unwrap();

        let mut calls = 0;
        let responses = dispatcher
            .trigger_until("e", no_target(), Arguments::new(), |_| {
                calls += 1;
                false
            })
            .unwrap();
        assert_eq!(calls, 0);
        assert!(responses.stopped());
        assert_eq!(responses.into_vec(), vec![json!("halt")]);
    }

    #[test]
    fn test_trigger_rejects_patterns() {
        let dispatcher = Dispatcher::new();
        for name in ["^=offer", "$=accepted", "*=post", "~=post", "!=post", "bad name", ""] {
            let err = dispatcher
                .trigger(name, no_target(), Arguments::new())
                .unwrap_err();
            assert!(matches!(err, ReactonError::InvalidEventName(_)), "{name}");
        }
    }

    #[test]
    fn test_on_rejects_invalid_selector() {
        let dispatcher = Dispatcher::new();
        assert!(matches!(
            dispatcher.on("offer accepted"),
            Err(ReactonError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_failing_handler_keeps_partial_responses() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let dispatcher = Dispatcher::new();
        dispatcher
            .on("e")
            .unwrap()
            .call_with_priority(|_: &mut EventContext| "ok", 3)
            .unwrap();
        dispatcher
            .on("e")
            .unwrap()
            .call_with_priority(
                |_: &mut EventContext| -> Result<(), HandlerError> { Err(HandlerError::msg("boom")) },
                2,
            )
            .unwrap();
        dispatcher
            .on("e")
            .unwrap()
            .call(move |_: &mut EventContext| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let err = dispatcher.trigger("e", no_target(), Arguments::new()).unwrap_err();
        let partial = err.partial_responses().unwrap();
        assert_eq!(partial.as_slice(), &[json!("ok")]);
        match err {
            ReactonError::Handler(dispatch) => {
                assert_eq!(dispatch.position, 1);
                assert_eq!(dispatch.event_name, "e");
                assert_eq!(dispatch.source.message(), "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_detach_is_idempotent() {
        let dispatcher = Dispatcher::new();
        let keep = dispatcher.on("e").unwrap().call(|_: &mut EventContext| "keep").unwrap();
        let drop = dispatcher.on("e").unwrap().call(|_: &mut EventContext| "drop").unwrap();

        assert!(dispatcher.detach(&drop));
        assert!(!dispatcher.detach(&drop));
        assert!(!dispatcher.has_handler(&drop));
        assert!(dispatcher.has_handler(&keep));

        let responses = dispatcher.trigger("e", no_target(), Arguments::new()).unwrap();
        assert_eq!(responses.into_vec(), vec![json!("keep")]);
    }

    #[test]
    fn test_handlers_added_during_dispatch_do_not_join_walk() {
        let dispatcher = Dispatcher::new();
        let registrar = dispatcher.clone();
        dispatcher
            .on("e")
            .unwrap()
            .call(move |_: &mut EventContext| {
                registrar
                    .on("e")
                    .and_then(|binding| binding.call(|_: &mut EventContext| "late"))
                    .map(|_| "registrar")
                    .map_err(|err| HandlerError::msg(err.to_string()))
            })
            .unwrap();

        let first = dispatcher.trigger("e", no_target(), Arguments::new()).unwrap();
        assert_eq!(first.into_vec(), vec![json!("registrar")]);

        let second = dispatcher.trigger("e", no_target(), Arguments::new()).unwrap();
        assert_eq!(second.into_vec(), vec![json!("registrar"), json!("late")]);
        assert_eq!(dispatcher.handler_count(), 3);
    }

    #[test]
    fn test_trigger_many_concatenates_responses() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .on("^=offer")
            .unwrap()
            .call(|ctx: &mut EventContext| ctx.name().to_string())
            .unwrap();
        dispatcher
            .on("offer.accept")
            .unwrap()
            .priority(5)
            .call(|ctx: &mut EventContext| {
                ctx.stop_propagation();
                "stopped"
            })
            .unwrap();

        let responses = dispatcher
            .trigger_many(["offer.accept", "offer.decline"], no_target(), Arguments::new())
            .unwrap();
        assert!(responses.stopped());
        assert_eq!(
            responses.into_vec(),
            vec![json!("stopped"), json!("offer.decline")]
        );
    }

    #[test]
    fn test_trigger_many_validates_all_names_first() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let dispatcher = Dispatcher::new();
        dispatcher
            .on("a")
            .unwrap()
            .call(move |_: &mut EventContext| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let err = dispatcher
            .trigger_many(["a", "^=a"], no_target(), Arguments::new())
            .unwrap_err();
        assert!(matches!(err, ReactonError::InvalidEventName(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_trigger_many_partial_responses_span_events() {
        let dispatcher = Dispatcher::new();
        dispatcher.on("a").unwrap().call(|_: &mut EventContext| "a").unwrap();
        dispatcher.on("b").unwrap().call(|_: &mut EventContext| "b").unwrap();
        dispatcher
            .on("b")
            .unwrap()
            .call(|_: &mut EventContext| -> Result<(), &'static str> { Err("nope") })
            .unwrap();

        let err = dispatcher
            .trigger_many(["a", "b"], no_target(), Arguments::new())
            .unwrap_err();
        assert_eq!(
            err.partial_responses().unwrap().as_slice(),
            &[json!("a"), json!("b")]
        );
    }

    #[test]
    fn test_default_priority_is_configurable() {
        let dispatcher = Dispatcher::with_default_priority(50);
        assert_eq!(dispatcher.default_priority(), 50);

        let implicit = dispatcher
            .on("e")
            .unwrap()
            .call_ref(handler_fn(|_| "implicit"))
            .unwrap();
        let explicit = dispatcher
            .on("e")
            .unwrap()
            .priority(60)
            .call_ref(handler_fn(|_| "explicit"))
            .unwrap();
        assert_eq!(implicit.priority(), 50);
        assert_eq!(explicit.priority(), 60);

        let responses = dispatcher.trigger("e", no_target(), Arguments::new()).unwrap();
        assert_eq!(responses.into_vec(), vec![json!("explicit"), json!("implicit")]);
    }

    #[test]
    fn test_resolve_and_clear() {
        let dispatcher = Dispatcher::new();
        dispatcher.on("*=ffe").unwrap().call(|_: &mut EventContext| ()).unwrap();
        dispatcher.on("offer").unwrap().call(|_: &mut EventContext| ()).unwrap();

        assert_eq!(dispatcher.resolve("offer").unwrap().len(), 2);
        assert!(dispatcher.resolve("*=ffe").is_err());
        assert_eq!(dispatcher.handler_count(), 2);

        dispatcher.clear();
        assert_eq!(dispatcher.handler_count(), 0);
        assert!(dispatcher.resolve("offer").unwrap().is_empty());
    }
}
