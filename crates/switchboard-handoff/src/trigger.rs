// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trigger detection: human-intent keywords and retrieval confidence.

use regex::{Regex, RegexBuilder};

use switchboard_core::{HandoffReason, SwitchboardError};

use crate::templates::{self, MessageTemplates};

/// Why a handoff fired, with whatever the reason carries.
#[derive(Debug, Clone, PartialEq)]
pub enum HandoffTrigger {
    /// A human-intent keyword matched the customer's message.
    Keyword { keyword: String },
    /// The best retrieved chunk scored below the tenant's threshold.
    LowConfidence { max_score: f64 },
    /// The customer pressed "talk to a human".
    ButtonClick,
}

impl HandoffTrigger {
    pub fn reason(&self) -> HandoffReason {
        match self {
            HandoffTrigger::Keyword { .. } => HandoffReason::Keyword,
            HandoffTrigger::LowConfidence { .. } => HandoffReason::LowConfidence,
            HandoffTrigger::ButtonClick => HandoffReason::ButtonClick,
        }
    }

    /// The button shares the keyword copy: both are explicit requests.
    pub fn templates(&self) -> &'static MessageTemplates {
        match self {
            HandoffTrigger::Keyword { .. } | HandoffTrigger::ButtonClick => &templates::KEYWORD,
            HandoffTrigger::LowConfidence { .. } => &templates::LOW_CONFIDENCE,
        }
    }

    pub fn keyword(&self) -> Option<&str> {
        match self {
            HandoffTrigger::Keyword { keyword } => Some(keyword),
            _ => None,
        }
    }
}

/// A knowledge chunk returned by answer retrieval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievedChunk {
    pub combined_score: f64,
}

/// Best score among the chunks. No chunks scores 0.
pub fn max_score(chunks: &[RetrievedChunk]) -> f64 {
    chunks
        .iter()
        .map(|c| c.combined_score)
        .filter(|s| s.is_finite())
        .fold(0.0, f64::max)
}

/// Case-insensitive, word-bounded keyword matcher.
///
/// Multi-word keywords tolerate any run of whitespace between words, so
/// `"real person"` matches `"a REAL   person please"` but `"agent"` does not
/// match `"agents"` or `"reagent"`.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    patterns: Vec<(String, Regex)>,
}

impl KeywordMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Result<Self, SwitchboardError> {
        let mut patterns = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let keyword = keyword.as_ref().trim();
            if keyword.is_empty() {
                continue;
            }
            let body = keyword
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            let regex = RegexBuilder::new(&format!(r"\b{body}\b"))
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    SwitchboardError::Config(format!("invalid handoff keyword `{keyword}`: {e}"))
                })?;
            patterns.push((keyword.to_string(), regex));
        }
        Ok(Self { patterns })
    }

    /// The first configured keyword found in `message`, in list order.
    pub fn find(&self, message: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(message))
            .map(|(keyword, _)| keyword.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_matching_is_word_bounded_and_case_insensitive() {
        let matcher = KeywordMatcher::new(&["human", "real person", "agent"]).unwrap();
        assert_eq!(matcher.find("I want to talk to a HUMAN"), Some("human"));
        assert_eq!(matcher.find("a real   person, please"), Some("real person"));
        assert_eq!(matcher.find("humanity is great"), None);
        assert_eq!(matcher.find("our agents are busy"), None);
        assert_eq!(matcher.find("chemical reagent"), None);
        assert_eq!(matcher.find("agent?"), Some("agent"));
    }

    #[test]
    fn first_listed_keyword_wins() {
        let matcher = KeywordMatcher::new(&["operator", "human"]).unwrap();
        assert_eq!(matcher.find("human operator"), Some("operator"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let matcher = KeywordMatcher::new(&["c.s.r", "  ", "help me"]).unwrap();
        assert_eq!(matcher.find("get me a c.s.r"), Some("c.s.r"));
        assert_eq!(matcher.find("get me a cxsxr"), None);
        assert_eq!(matcher.patterns.len(), 2);
    }

    #[test]
    fn max_score_defaults_to_zero() {
        assert_eq!(max_score(&[]), 0.0);
        let chunks = [
            RetrievedChunk { combined_score: 0.2 },
            RetrievedChunk { combined_score: 0.7 },
            RetrievedChunk { combined_score: f64::NAN },
        ];
        assert_eq!(max_score(&chunks), 0.7);
    }

    #[test]
    fn trigger_carries_reason_and_copy() {
        let keyword = HandoffTrigger::Keyword {
            keyword: "human".into(),
        };
        assert_eq!(keyword.reason(), HandoffReason::Keyword);
        assert_eq!(keyword.keyword(), Some("human"));
        assert_eq!(keyword.templates(), &templates::KEYWORD);

        let low = HandoffTrigger::LowConfidence { max_score: 0.1 };
        assert_eq!(low.reason(), HandoffReason::LowConfidence);
        assert_eq!(low.templates(), &templates::LOW_CONFIDENCE);
        assert_eq!(low.keyword(), None);

        assert_eq!(HandoffTrigger::ButtonClick.reason(), HandoffReason::ButtonClick);
    }
}
