//! Pattern compiler.
//!
//! Turns a pattern [`Selector`] into a [`PatternMatcher`] that decides whether
//! a concrete event name belongs to the family the selector describes.
//! Matchers are compiled once at registration time and reused for every
//! trigger.

use std::fmt;

use crate::error::{ReactonError, ReactonResult};
use crate::selector::{MatchOperator, Selector};

/// Bytes that separate words in an event name for `~=` matching.
///
/// `_` is treated as part of a word, so `~=post` does not match `first_post`.
const WORD_DELIMITERS: &[u8] = b".:-";

/// A compiled pattern.
///
/// `test` is pure; a matcher can be shared and reused freely.
#[derive(Clone, PartialEq, Eq)]
pub struct PatternMatcher {
    operator: MatchOperator,
    text: String,
}

impl PatternMatcher {
    /// Compiles a pattern selector.
    ///
    /// # Errors
    ///
    /// Returns [`ReactonError::NotAPattern`] if the selector has no operator.
    pub fn compile(selector: &Selector) -> ReactonResult<Self> {
        match selector.operator() {
            MatchOperator::None => Err(ReactonError::NotAPattern(selector.to_string())),
            operator => Ok(Self {
                operator,
                text: selector.name_text().to_string(),
            }),
        }
    }

    /// Returns `true` if `event_name` is accepted by this pattern.
    pub fn test(&self, event_name: &str) -> bool {
        let text = self.text.as_str();
        match self.operator {
            MatchOperator::BeginsWith => event_name.starts_with(text),
            MatchOperator::EndsWith => event_name.ends_with(text),
            MatchOperator::ContainsString => event_name.contains(text),
            MatchOperator::ContainsWord => contains_word(event_name, text),
            MatchOperator::NotEquals => event_name != text,
            // `compile` never builds a matcher without an operator.
            MatchOperator::None => event_name == text,
        }
    }

    /// Returns the pattern's operator.
    pub fn operator(&self) -> MatchOperator {
        self.operator
    }

    /// Returns the text the operator is applied to.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("operator", &self.operator)
            .field("text", &self.text)
            .finish()
    }
}

/// Compiles a selector into a matcher. Shorthand for [`PatternMatcher::compile`].
pub fn compile(selector: &Selector) -> ReactonResult<PatternMatcher> {
    PatternMatcher::compile(selector)
}

fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }

    let bytes = haystack.as_bytes();
    let mut start = 0;

    while let Some(offset) = haystack[start..].find(word) {
        let begin = start + offset;
        let end = begin + word.len();

        let bounded_left = begin == 0 || WORD_DELIMITERS.contains(&bytes[begin - 1]);
        let bounded_right = end == bytes.len() || WORD_DELIMITERS.contains(&bytes[end]);
        if bounded_left && bounded_right {
            return true;
        }

        // Selector text is ASCII, so the byte after a match start is a char boundary.
        start = begin + 1;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(text: &str) -> PatternMatcher {
        PatternMatcher::compile(&Selector::parse(text).unwrap()).unwrap()
    }

    #[test]
    fn test_begins_with() {
        let m = matcher("^=offer");
        assert!(m.test("offer.accept"));
        assert!(m.test("offer.decline"));
        assert!(!m.test("bad.offer"));
    }

    #[test]
    fn test_ends_with() {
        let m = matcher("$=login");
        assert!(m.test("user.login"));
        assert!(m.test("bot.login"));
        assert!(!m.test("login.user"));
    }

    #[test]
    fn test_contains_string() {
        let m = matcher("*=post");
        assert!(m.test("article.post"));
        assert!(m.test("article-post.remove"));
        assert!(m.test("articlepost"));
        assert!(!m.test("article.remove"));
    }

    #[test]
    fn test_contains_word() {
        let m = matcher("~=post");
        assert!(m.test("article.post"));
        assert!(m.test("article.post.remove"));
        assert!(m.test("post"));
        assert!(m.test("article:post-remove"));
        assert!(!m.test("articlepost"));
        assert!(!m.test("article.posts"));
        assert!(!m.test("first_post"));
    }

    #[test]
    fn test_contains_word_checks_every_occurrence() {
        // The first occurrence is glued to other letters, the second is bounded.
        let m = matcher("~=post");
        assert!(m.test("repost.post"));
        // Overlapping candidates are considered as well.
        let m = matcher("~=aa");
        assert!(m.test("aaa.aa"));
        assert!(!m.test("aaa"));
    }

    #[test]
    fn test_contains_word_with_multi_segment_text() {
        let m = matcher("~=offer.accept");
        assert!(m.test("user.offer.accept.v2"));
        assert!(!m.test("counteroffer.accept"));
    }

    #[test]
    fn test_not_equals_is_exact_inequality() {
        let m = matcher("!=offer.accept");
        assert!(m.test("not.offer.accept"));
        assert!(m.test("offer.accepted"));
        assert!(!m.test("offer.accept"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!matcher("^=offer").test("Offer.accept"));
    }

    #[test]
    fn test_compile_rejects_plain_names() {
        let selector = Selector::parse("offer.accept").unwrap();
        assert!(matches!(
            compile(&selector),
            Err(ReactonError::NotAPattern(_))
        ));
    }

    #[test]
    fn test_non_ascii_candidates_do_not_panic() {
        let m = matcher("~=post");
        assert!(m.test("\u{e9}t\u{e9}.post"));
        assert!(!m.test("\u{e9}post"));
    }
}
