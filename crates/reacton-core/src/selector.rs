//! Selector grammar.
//!
//! A selector is either a plain event name (`offer.accepted`) or a pattern
//! that prefixes the event-name text with a jQuery-style attribute operator:
//!
//! | Selector          | Operator                        | Matches                              |
//! |-------------------|---------------------------------|--------------------------------------|
//! | `offer.accept`    | [`MatchOperator::None`]         | `offer.accept`                       |
//! | `^=offer`         | [`MatchOperator::BeginsWith`]   | `offer.accept`, `offer.decline`      |
//! | `$=login`         | [`MatchOperator::EndsWith`]     | `user.login`, `bot.login`            |
//! | `*=post`          | [`MatchOperator::ContainsString`] | `article.post`, `article-post.remove` |
//! | `~=post`          | [`MatchOperator::ContainsWord`] | `article.post`, `article.post.remove` |
//! | `!=offer.accept`  | [`MatchOperator::NotEquals`]    | `not.offer.accept`                   |
//!
//! The event-name text is restricted to ASCII letters, digits, `.`, `:`, `_`
//! and `-`; whitespace and every other character is rejected.
//!
//! # Example
//!
//! ```rust
//! use reacton_core::selector::{MatchOperator, Selector};
//!
//! let selector: Selector = "^=offer".parse().unwrap();
//! assert_eq!(selector.operator(), MatchOperator::BeginsWith);
//! assert_eq!(selector.name_text(), "offer");
//! assert!(selector.is_pattern());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ReactonError, ReactonResult};

/// The attribute operator of a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOperator {
    /// No operator: the selector names one concrete event.
    None,
    /// `^=`: the event name starts with the text.
    BeginsWith,
    /// `$=`: the event name ends with the text.
    EndsWith,
    /// `*=`: the event name contains the text anywhere.
    ContainsString,
    /// `~=`: the event name contains the text as a delimiter-bounded word.
    ContainsWord,
    /// `!=`: the event name is not equal to the text.
    NotEquals,
}

impl MatchOperator {
    /// All operators that turn a selector into a pattern.
    pub const PATTERNS: [MatchOperator; 5] = [
        Self::BeginsWith,
        Self::EndsWith,
        Self::ContainsString,
        Self::ContainsWord,
        Self::NotEquals,
    ];

    /// Returns the two-character token for this operator (empty for `None`).
    pub fn token(self) -> &'static str {
        match self {
            Self::None => "",
            Self::BeginsWith => "^=",
            Self::EndsWith => "$=",
            Self::ContainsString => "*=",
            Self::ContainsWord => "~=",
            Self::NotEquals => "!=",
        }
    }

    /// Looks up an operator by its two-character token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::PATTERNS.into_iter().find(|op| op.token() == token)
    }

    /// Returns a descriptive name, used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BeginsWith => "begins-with",
            Self::EndsWith => "ends-with",
            Self::ContainsString => "contains-string",
            Self::ContainsWord => "contains-word",
            Self::NotEquals => "not-equals",
        }
    }

    /// Returns `true` for every operator except [`MatchOperator::None`].
    pub fn is_pattern(self) -> bool {
        self != Self::None
    }
}

impl fmt::Display for MatchOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses either an operator token (`^=`) or a descriptive name (`begins-with`).
impl FromStr for MatchOperator {
    type Err = ReactonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(op) = Self::from_token(s) {
            return Ok(op);
        }
        match s.to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "begins-with" => Ok(Self::BeginsWith),
            "ends-with" => Ok(Self::EndsWith),
            "contains-string" => Ok(Self::ContainsString),
            "contains-word" => Ok(Self::ContainsWord),
            "not-equals" => Ok(Self::NotEquals),
            _ => Err(ReactonError::UnsupportedSelectorOperator(s.to_string())),
        }
    }
}

/// A parsed, validated selector.
///
/// Selectors are immutable; the only way to build one is through
/// [`Selector::parse`] (or [`FromStr`]), so every instance satisfies the
/// grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    operator: MatchOperator,
    name: String,
}

impl Selector {
    /// Parses selector text.
    ///
    /// # Errors
    ///
    /// Returns [`ReactonError::InvalidSelector`] when the text is empty,
    /// contains characters outside the allowed class, or consists of an
    /// operator with nothing after it.
    pub fn parse(text: &str) -> ReactonResult<Self> {
        let (operator, name) = split_operator(text);

        if name.is_empty() || !name.bytes().all(is_name_byte) {
            return Err(ReactonError::invalid_selector(text));
        }

        Ok(Self {
            operator,
            name: name.to_string(),
        })
    }

    /// Parses text that must be a plain event name.
    ///
    /// # Errors
    ///
    /// Returns [`ReactonError::InvalidEventName`] for malformed text and for
    /// pattern selectors, which can only be used for registration.
    pub fn event_name(text: &str) -> ReactonResult<Self> {
        match Self::parse(text) {
            Ok(selector) if !selector.is_pattern() => Ok(selector),
            _ => Err(ReactonError::InvalidEventName(text.to_string())),
        }
    }

    /// Returns the selector's operator.
    pub fn operator(&self) -> MatchOperator {
        self.operator
    }

    /// Returns the event-name text without the operator.
    pub fn name_text(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the selector carries a match operator.
    pub fn is_pattern(&self) -> bool {
        self.operator.is_pattern()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator.token(), self.name)
    }
}

impl FromStr for Selector {
    type Err = ReactonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Selector {
    type Error = ReactonError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Selector {
    type Error = ReactonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Returns `true` if `text` is a valid selector of any kind.
pub fn is_valid_selector(text: &str) -> bool {
    Selector::parse(text).is_ok()
}

/// Returns `true` if `text` is a valid selector without a match operator.
///
/// Only plain event names may be triggered.
pub fn is_plain_event_name(text: &str) -> bool {
    Selector::parse(text).is_ok_and(|selector| !selector.is_pattern())
}

fn split_operator(text: &str) -> (MatchOperator, &str) {
    text.get(..2)
        .and_then(MatchOperator::from_token)
        .map_or((MatchOperator::None, text), |op| (op, &text[2..]))
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b':' | b'_' | b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &[&str] = &[
        "offer.accepted",
        "offer.first_acceptance",
        "offer.first-acceptance",
        "offer:accepted",
        "my.offer3:accepted",
        "^=offer",
        "$=accepted",
        "*=post",
        "~=post",
        "!=post",
    ];

    const INVALID: &[&str] = &[
        "",
        "offer accepted",
        "offer/accepted",
        "offer\\accepted",
        "offer.\u{152}ccepted",
        "@offer.accepted",
        "offer!accepted",
        "offer#accepted",
        " offer",
        "offer\t",
        "^=",
        "!=",
        "^= offer",
        "=offer",
    ];

    #[test]
    fn test_valid_selectors_parse() {
        for text in VALID {
            assert!(is_valid_selector(text), "expected '{text}' to be valid");
        }
    }

    #[test]
    fn test_invalid_selectors_are_rejected() {
        for text in INVALID {
            let err = Selector::parse(text).unwrap_err();
            assert!(
                matches!(err, ReactonError::InvalidSelector { .. }),
                "expected '{text}' to be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_operator_classification() {
        let cases = [
            ("offer.accepted", MatchOperator::None, "offer.accepted"),
            ("^=offer", MatchOperator::BeginsWith, "offer"),
            ("$=accepted", MatchOperator::EndsWith, "accepted"),
            ("*=post", MatchOperator::ContainsString, "post"),
            ("~=post", MatchOperator::ContainsWord, "post"),
            ("!=post", MatchOperator::NotEquals, "post"),
        ];

        for (text, operator, name) in cases {
            let selector = Selector::parse(text).unwrap();
            assert_eq!(selector.operator(), operator, "{text}");
            assert_eq!(selector.name_text(), name, "{text}");
            assert_eq!(is_plain_event_name(text), operator == MatchOperator::None);
        }
    }

    #[test]
    fn test_display_reproduces_selector() {
        for text in VALID {
            let selector = Selector::parse(text).unwrap();
            assert_eq!(selector.to_string(), *text);
            assert_eq!(Selector::parse(&selector.to_string()).unwrap(), selector);
        }
    }

    #[test]
    fn test_operator_only_followed_by_operator_text() {
        // "^=^=x" is an operator followed by text containing '^', which is not allowed.
        assert!(!is_valid_selector("^=^=x"));
        // A leading '=' that is not part of an operator is rejected too.
        assert!(!is_valid_selector("=x"));
    }

    #[test]
    fn test_event_name_rejects_patterns() {
        for text in ["^=offer", "$=accepted", "*=post", "~=post", "!=post"] {
            assert!(matches!(
                Selector::event_name(text),
                Err(ReactonError::InvalidEventName(_))
            ));
        }
        assert!(matches!(
            Selector::event_name("offer accepted"),
            Err(ReactonError::InvalidEventName(_))
        ));
        assert!(Selector::event_name("offer.accepted").is_ok());
    }

    #[test]
    fn test_operator_from_str() {
        assert_eq!("^=".parse::<MatchOperator>().unwrap(), MatchOperator::BeginsWith);
        assert_eq!(
            "Contains-Word".parse::<MatchOperator>().unwrap(),
            MatchOperator::ContainsWord
        );
        assert_eq!("none".parse::<MatchOperator>().unwrap(), MatchOperator::None);
        assert!(matches!(
            "|=".parse::<MatchOperator>(),
            Err(ReactonError::UnsupportedSelectorOperator(_))
        ));
    }

    #[test]
    fn test_serde_uses_selector_text() {
        let selector = Selector::parse("~=post").unwrap();
        let json = serde_json::to_string(&selector).unwrap();
        assert_eq!(json, "\"~=post\"");

        let back: Selector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, selector);

        assert!(serde_json::from_str::<Selector>("\"bad name\"").is_err());
    }
}
