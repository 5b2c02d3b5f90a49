//! Activation event predicates.

use std::collections::BTreeSet;
use thiserror::Error;

/// Wildcard event: activate as soon as the extension is enabled.
pub const WILDCARD_EVENT: &str = "*";
/// Prefix of language activation events, e.g. `onLanguage:go`.
pub const ON_LANGUAGE_PREFIX: &str = "onLanguage:";

/// Parsed activation predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationEvent {
    Wildcard,
    OnLanguage(String),
    /// Event kind this engine does not evaluate; never matches.
    Other(String),
}

/// Malformed activation predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationEventError {
    #[error("activation event must not be empty")]
    Empty,
    #[error("activation event `{0}` names no language")]
    EmptyLanguage(String),
}

impl ActivationEvent {
    pub fn parse(raw: &str) -> Result<Self, ActivationEventError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(ActivationEventError::Empty);
        }
        if value == WILDCARD_EVENT {
            return Ok(Self::Wildcard);
        }
        if let Some(language) = value.strip_prefix(ON_LANGUAGE_PREFIX) {
            let language = language.trim();
            if language.is_empty() {
                return Err(ActivationEventError::EmptyLanguage(value.to_string()));
            }
            return Ok(Self::OnLanguage(language.to_string()));
        }
        Ok(Self::Other(value.to_string()))
    }

    pub fn matches(&self, languages: &BTreeSet<&str>) -> bool {
        match self {
            Self::Wildcard => true,
            Self::OnLanguage(language) => languages.contains(language.as_str()),
            Self::Other(_) => false,
        }
    }
}

/// Malformed event hit while evaluating one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateFailure {
    pub event: String,
    pub error: ActivationEventError,
}

/// Returns whether any event matches the visible languages.
///
/// Events are evaluated in declaration order and evaluation stops at the first
/// match. A malformed event reached before any match fails the whole
/// evaluation for this cycle.
pub fn any_event_matches(
    events: &[String],
    languages: &BTreeSet<&str>,
) -> Result<bool, PredicateFailure> {
    for raw in events {
        let event = ActivationEvent::parse(raw).map_err(|error| PredicateFailure {
            event: raw.clone(),
            error,
        })?;
        if event.matches(languages) {
            return Ok(true);
        }
    }
    Ok(false)
}
