//! Free-text search request parser.
//!
//! Turns phrases like `"I need to find new trade businesses in Chester"` into a
//! `(business type, location)` pair. The parse is best-effort: callers prompt for
//! whichever slot comes back empty.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::SearchQuery;

/// Request preambles, tried in order. At most one is stripped.
const FILLER_PATTERNS: &[&str] = &[
    r"(?i)^i need to find(?: new| local| some)?\s*",
    r"(?i)^find(?: me| new| local| some)?\s*",
    r"(?i)^looking for(?: new| local| some)?\s*",
    r"(?i)^search for(?: new| local| some)?\s*",
    r"(?i)^get me(?: new| local| some)?\s*",
    r"(?i)^show me(?: new| local| some)?\s*",
    r"(?i)^i want(?: to find)?\s*",
    r"(?i)^can you find(?: me)?\s*",
];

static FILLERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    FILLER_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("Failed to compile filler pattern - this is a bug"))
        .collect()
});

static LOCATION_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:in|near|around|at|within)\s+([A-Za-z\s]+?)\s*$")
        .expect("Failed to compile location pattern - this is a bug")
});

static NOISE_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:new|local|small|independent|nearby|businesses?|companies|tradespeople|tradespersons?)\b",
    )
    .expect("Failed to compile noise pattern - this is a bug")
});

static TRAILING_IN_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bin\s+.+$").expect("Failed to compile in-clause pattern - this is a bug")
});

/// Parses a free-text search request. Both fields may come back empty.
pub fn parse_search_input(raw: &str) -> SearchQuery {
    let text = strip_filler(raw.trim());

    let (business_type, location) = match LOCATION_CLAUSE.captures(text) {
        Some(caps) => {
            let location = caps
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            let clause_start = caps.get(0).map(|m| m.start()).unwrap_or(text.len());
            (text[..clause_start].trim().to_string(), location)
        }
        None => (text.trim().to_string(), String::new()),
    };

    let business_type = strip_noise_words(&business_type);

    if location.is_empty() {
        if let Some((rest, place)) = split_trailing_place(&business_type) {
            return SearchQuery::new(rest, place);
        }
    }

    SearchQuery::new(business_type, location)
}

/// Removes the first matching request preamble, if any.
fn strip_filler(text: &str) -> &str {
    for re in FILLERS.iter() {
        if let Some(m) = re.find(text) {
            return &text[m.end()..];
        }
    }
    text
}

/// Drops generic noise words. Reverts to the input if nothing would remain.
fn strip_noise_words(business_type: &str) -> String {
    let stripped = NOISE_WORDS
        .replace_all(business_type, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if stripped.is_empty() {
        business_type.trim().to_string()
    } else {
        stripped
    }
}

/// `"electrician Chester"` -> `("electrician", "Chester")` when the last token is capitalized.
fn split_trailing_place(business_type: &str) -> Option<(String, String)> {
    let words: Vec<&str> = business_type.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }
    let last = words[words.len() - 1];
    if !last.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }
    Some((words[..words.len() - 1].join(" "), last.to_string()))
}

/// Fallback business type when parsing left it empty: the raw input minus any `in ...` tail.
pub fn fallback_business_type(raw: &str) -> String {
    let trimmed = TRAILING_IN_CLAUSE.replace(raw, "").trim().to_string();
    if trimmed.is_empty() {
        raw.trim().to_string()
    } else {
        trimmed
    }
}
