//! Handler registry.
//!
//! Handlers bound to a plain event name live in a per-name ordered map;
//! handlers bound to a pattern live in a flat list next to their compiled
//! [`PatternMatcher`]. Every entry is in exactly one of the two stores.
//!
//! # Ordering
//!
//! Entries are ordered by priority (higher first) and then by registration
//! sequence (earlier first). The sequence number is unique per registry, so
//! the order is total: identical registration sequences always resolve to
//! identical handler orders, whether the handlers were bound to exact names
//! or to patterns.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::iter::Peekable;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::context::EventContext;
use crate::error::{HandlerResult, ReactonError, ReactonResult};
use crate::handler::HandlerRef;
use crate::pattern::PatternMatcher;
use crate::selector::Selector;

/// Priority used when a binding does not specify one.
pub const DEFAULT_PRIORITY: i64 = 1;

/// Sort key of an entry: priority descending, then registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct OrderKey {
    priority: Reverse<i64>,
    sequence: u64,
}

struct EntryInner {
    handler: HandlerRef,
    selector: Selector,
    priority: i64,
    sequence: u64,
}

/// A stored binding of a handler to a selector.
///
/// Cloning is cheap and yields a token referring to the same binding;
/// equality is identity, not equality of fields. Keep the entry returned by
/// registration to check for or detach the binding later.
#[derive(Clone)]
pub struct HandlerEntry {
    inner: Arc<EntryInner>,
}

impl HandlerEntry {
    /// Returns the selector this handler is bound to.
    pub fn selector(&self) -> &Selector {
        &self.inner.selector
    }

    /// Returns the binding priority.
    pub fn priority(&self) -> i64 {
        self.inner.priority
    }

    /// Returns the registration sequence number.
    pub fn sequence(&self) -> u64 {
        self.inner.sequence
    }

    /// Returns the bound handler.
    pub fn handler(&self) -> &HandlerRef {
        &self.inner.handler
    }

    /// Invokes the bound handler.
    pub fn invoke(&self, ctx: &mut EventContext) -> HandlerResult {
        self.inner.handler.invoke(ctx)
    }

    fn key(&self) -> OrderKey {
        OrderKey {
            priority: Reverse(self.inner.priority),
            sequence: self.inner.sequence,
        }
    }
}

impl PartialEq for HandlerEntry {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for HandlerEntry {}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("selector", &self.inner.selector.to_string())
            .field("handler", &self.inner.handler.name())
            .field("priority", &self.inner.priority)
            .field("sequence", &self.inner.sequence)
            .finish()
    }
}

struct PatternEntry {
    entry: HandlerEntry,
    matcher: PatternMatcher,
}

/// Storage for all handler bindings of one dispatcher.
///
/// The registry itself is not synchronized; [`Dispatcher`](crate::Dispatcher)
/// wraps it in a reader/writer lock.
#[derive(Default)]
pub struct HandlerRegistry {
    exact: HashMap<String, BTreeMap<OrderKey, HandlerEntry>>,
    patterns: Vec<PatternEntry>,
    next_sequence: u64,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to `selector` at `priority`.
    ///
    /// Pattern selectors are compiled immediately so an unsupported pattern
    /// fails here rather than at trigger time.
    ///
    /// # Errors
    ///
    /// - [`ReactonError::InvalidCallback`] if the handler is not invocable.
    /// - [`ReactonError::NotAPattern`] / [`ReactonError::UnsupportedSelectorOperator`]
    ///   if the pattern cannot be compiled.
    pub fn register(
        &mut self,
        selector: Selector,
        handler: HandlerRef,
        priority: i64,
    ) -> ReactonResult<HandlerEntry> {
        if !handler.is_invocable() {
            return Err(ReactonError::invalid_callback(format!(
                "handler '{}' bound to '{}' is not invocable",
                handler.name(),
                selector
            )));
        }

        let matcher = if selector.is_pattern() {
            Some(PatternMatcher::compile(&selector)?)
        } else {
            None
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let entry = HandlerEntry {
            inner: Arc::new(EntryInner {
                handler,
                selector,
                priority,
                sequence,
            }),
        };

        match matcher {
            Some(matcher) => {
                self.patterns.push(PatternEntry {
                    entry: entry.clone(),
                    matcher,
                });
            }
            None => {
                self.exact
                    .entry(entry.selector().name_text().to_string())
                    .or_default()
                    .insert(entry.key(), entry.clone());
            }
        }

        debug!(
            selector = %entry.selector(),
            handler = entry.handler().name(),
            priority,
            sequence,
            "Registered handler"
        );

        Ok(entry)
    }

    /// Removes a binding.
    ///
    /// Returns `true` if the entry was present. Removing an entry that is not
    /// (or no longer) registered is a no-op.
    pub fn unregister(&mut self, entry: &HandlerEntry) -> bool {
        let removed = if entry.selector().is_pattern() {
            match self.patterns.iter().position(|p| p.entry == *entry) {
                Some(index) => {
                    self.patterns.remove(index);
                    true
                }
                None => false,
            }
        } else {
            let name = entry.selector().name_text();
            let key = entry.key();
            match self.exact.get_mut(name) {
                Some(bucket) if bucket.get(&key) == Some(entry) => {
                    bucket.remove(&key);
                    if bucket.is_empty() {
                        self.exact.remove(name);
                    }
                    true
                }
                _ => false,
            }
        };

        if removed {
            debug!(selector = %entry.selector(), sequence = entry.sequence(), "Unregistered handler");
        } else {
            trace!(selector = %entry.selector(), "Handler not registered, nothing to remove");
        }

        removed
    }

    /// Returns `true` if this exact entry is registered.
    pub fn contains(&self, entry: &HandlerEntry) -> bool {
        if entry.selector().is_pattern() {
            self.patterns.iter().any(|p| p.entry == *entry)
        } else {
            self.exact
                .get(entry.selector().name_text())
                .and_then(|bucket| bucket.get(&entry.key()))
                .is_some_and(|stored| stored == entry)
        }
    }

    /// Returns the handlers applicable to `event_name`, in invocation order.
    ///
    /// Exact-name handlers and accepting pattern handlers are merged into a
    /// single sequence; pattern handlers interleave with exact handlers by
    /// priority.
    pub fn resolve(&self, event_name: &str) -> Vec<HandlerEntry> {
        let mut matched: Vec<&HandlerEntry> = self
            .patterns
            .iter()
            .filter(|p| p.matcher.test(event_name))
            .map(|p| &p.entry)
            .collect();
        matched.sort_unstable_by_key(|entry| entry.key());

        match self.exact.get(event_name) {
            Some(bucket) => MergeByKey::new(bucket.values(), matched.into_iter())
                .cloned()
                .collect(),
            None => matched.into_iter().cloned().collect(),
        }
    }

    /// Returns the total number of bindings.
    pub fn len(&self) -> usize {
        self.exact_len() + self.pattern_len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of bindings to plain event names.
    pub fn exact_len(&self) -> usize {
        self.exact.values().map(BTreeMap::len).sum()
    }

    /// Returns the number of pattern bindings.
    pub fn pattern_len(&self) -> usize {
        self.patterns.len()
    }

    /// Removes every binding.
    ///
    /// Sequence numbers keep increasing so entries created before the clear
    /// never compare equal to new ones.
    pub fn clear(&mut self) {
        self.exact.clear();
        self.patterns.clear();
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("exact", &self.exact_len())
            .field("patterns", &self.pattern_len())
            .finish()
    }
}

/// Merges two iterators that are each sorted by [`OrderKey`].
struct MergeByKey<'a, A, B>
where
    A: Iterator<Item = &'a HandlerEntry>,
    B: Iterator<Item = &'a HandlerEntry>,
{
    left: Peekable<A>,
    right: Peekable<B>,
}

impl<'a, A, B> MergeByKey<'a, A, B>
where
    A: Iterator<Item = &'a HandlerEntry>,
    B: Iterator<Item = &'a HandlerEntry>,
{
    fn new(left: A, right: B) -> Self {
        Self {
            left: left.peekable(),
            right: right.peekable(),
        }
    }
}

impl<'a, A, B> Iterator for MergeByKey<'a, A, B>
where
    A: Iterator<Item = &'a HandlerEntry>,
    B: Iterator<Item = &'a HandlerEntry>,
{
    type Item = &'a HandlerEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let take_right = match (self.left.peek(), self.right.peek()) {
            (Some(l), Some(r)) => r.key() < l.key(),
            (Some(_), None) => false,
            (None, _) => true,
        };

        if take_right {
            self.right.next()
        } else {
            self.left.next()
        }
    }
}
