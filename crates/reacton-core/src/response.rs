//! Response collection returned by a trigger call.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The ordered return values of every handler invoked for one trigger call.
///
/// [`stopped`](Self::stopped) is `true` when the walk ended early because a
/// handler stopped propagation or the short-circuit predicate accepted a
/// response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseCollection {
    responses: Vec<Value>,
    stopped: bool,
}

impl ResponseCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, response: Value) {
        self.responses.push(response);
    }

    pub(crate) fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    /// Appends all responses of `other`, keeping `other`'s stop flag if set.
    pub(crate) fn absorb(&mut self, other: ResponseCollection) {
        self.responses.extend(other.responses);
        self.stopped |= other.stopped;
    }

    /// Returns `true` if the walk was stopped before all handlers ran.
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    /// Returns the first response.
    pub fn first(&self) -> Option<&Value> {
        self.responses.first()
    }

    /// Returns the last response.
    pub fn last(&self) -> Option<&Value> {
        self.responses.last()
    }

    /// Returns the response at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.responses.get(index)
    }

    /// Returns the number of responses.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Returns `true` if no handler produced a response.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Returns `true` if any response equals `value`.
    pub fn contains(&self, value: &Value) -> bool {
        self.responses.contains(value)
    }

    /// Iterates over the responses in invocation order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.responses.iter()
    }

    /// Returns the responses as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.responses
    }

    /// Consumes the collection, returning the responses.
    pub fn into_vec(self) -> Vec<Value> {
        self.responses
    }
}

impl Index<usize> for ResponseCollection {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.responses[index]
    }
}

impl IntoIterator for ResponseCollection {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResponseCollection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let mut responses = ResponseCollection::new();
        assert!(responses.is_empty());
        assert!(responses.first().is_none());

        responses.push(json!("a"));
        responses.push(json!(2));
        responses.push(Value::Null);

        assert_eq!(responses.len(), 3);
        assert_eq!(responses.first(), Some(&json!("a")));
        assert_eq!(responses.last(), Some(&Value::Null));
        assert_eq!(responses[1], json!(2));
        assert!(responses.contains(&json!(2)));
        assert!(!responses.stopped());
    }

    #[test]
    fn test_absorb_keeps_order_and_stop_flag() {
        let mut first = ResponseCollection::new();
        first.push(json!(1));

        let mut second = ResponseCollection::new();
        second.push(json!(2));
        second.set_stopped(true);

        first.absorb(second);
        assert!(first.stopped());
        assert_eq!(first.into_vec(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_iteration_order() {
        let mut responses = ResponseCollection::new();
        for i in 0..4 {
            responses.push(json!(i));
        }
        let collected: Vec<_> = responses.iter().cloned().collect();
        assert_eq!(collected, vec![json!(0), json!(1), json!(2), json!(3)]);
    }
}
