//! Natural-language candidate filters.
//!
//! Each filter string is classified by the keyword it contains:
//! - `exclude` / `avoid` (in any inflection) become a block list
//! - `require` / `must` become an allow list
//!
//! Anything else is ignored. Remaining words are matched as lowercase
//! substrings against the candidate's title and snippet. Generic nouns like
//! `clinics` are dropped when more specific words remain, and kept when they
//! are all the phrase names.

use std::sync::LazyLock;

use regex::Regex;

use demoforge_shared::LeadCandidate;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}'-]*").expect("valid regex"));

/// Stems recognised anywhere in a word, so `excluded` and `avoiding` count.
const BLOCK_STEMS: &[&str] = &["exclud", "avoid"];
const ALLOW_STEMS: &[&str] = &["requir", "must"];

/// Grammatical filler, never a matching term.
const FILLER: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "to", "in", "on", "for", "with", "without", "any", "all",
    "be", "is", "are", "have", "has", "that", "which", "who", "their", "them", "those", "these",
    "mention", "mentions", "mentioning", "contain", "contains", "include", "includes",
];

/// Generic nouns, used as terms only when nothing more specific is named.
const GENERIC: &[&str] = &[
    "clinic", "clinics", "practice", "practices", "results", "ones", "sites", "websites",
];

fn has_stem(text: &str, stems: &[&str]) -> bool {
    stems.iter().any(|stem| text.contains(stem))
}

/// A classified filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRule {
    /// Reject candidates mentioning any of these words.
    Block(Vec<String>),
    /// Reject candidates mentioning none of these words.
    Allow(Vec<String>),
}

impl FilterRule {
    /// Classify one filter phrase. Returns `None` for unclassifiable or empty phrases.
    pub fn parse(phrase: &str) -> Option<Self> {
        let lowered = phrase.to_lowercase();
        let is_block = has_stem(&lowered, BLOCK_STEMS);
        let is_allow = has_stem(&lowered, ALLOW_STEMS);
        if !is_block && !is_allow {
            return None;
        }

        let words: Vec<String> = WORD_RE
            .find_iter(&lowered)
            .map(|m| m.as_str().trim_end_matches(['\'', '-']).to_string())
            .filter(|w| {
                !w.is_empty()
                    && !has_stem(w, BLOCK_STEMS)
                    && !has_stem(w, ALLOW_STEMS)
                    && !FILLER.contains(&w.as_str())
            })
            .collect();

        let specific: Vec<String> = words
            .iter()
            .filter(|w| !GENERIC.contains(&w.as_str()))
            .cloned()
            .collect();
        let terms = if specific.is_empty() { words } else { specific };
        if terms.is_empty() {
            return None;
        }

        // "exclude" wins when a phrase somehow carries both.
        if is_block {
            Some(Self::Block(terms))
        } else {
            Some(Self::Allow(terms))
        }
    }

    /// Does `candidate` survive this rule?
    pub fn accepts(&self, candidate: &LeadCandidate) -> bool {
        let haystack = format!("{} {}", candidate.title, candidate.snippet).to_lowercase();
        match self {
            Self::Block(words) => !words.iter().any(|w| haystack.contains(w.as_str())),
            Self::Allow(words) => words.iter().any(|w| haystack.contains(w.as_str())),
        }
    }
}

/// Parse every phrase, dropping the ones that don't classify.
pub fn parse_filters(phrases: &[String]) -> Vec<FilterRule> {
    phrases.iter().filter_map(|p| FilterRule::parse(p)).collect()
}

/// Does `candidate` pass every rule?
pub fn passes(candidate: &LeadCandidate, rules: &[FilterRule]) -> bool {
    rules.iter().all(|rule| rule.accepts(candidate))
}
