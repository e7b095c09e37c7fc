//! What in a message must not be lost: named things, emphasized words, and
//! explicit constraints.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::cognition::injection::{ContextInjection, InjectionSource};
use crate::memory::store::{extract_keywords, is_stop_word};
use crate::memory::types::clamp_unit;

const MAX_ENTITIES: usize = 8;
const MAX_FOCAL_TERMS: usize = 5;
const MAX_CONSTRAINTS: usize = 5;
const MIN_SHOUT_LEN: usize = 3;
const ENTITY_WEIGHT: f64 = 0.1;
const EMPHASIS_WEIGHT: f64 = 0.15;
const CONSTRAINT_WEIGHT: f64 = 0.2;
const SALIENCE_PRIORITY: i32 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalienceFrame {
    /// Proper nouns, quoted strings, and quantities, in order of appearance.
    pub entities: Vec<String>,
    pub focal_terms: Vec<String>,
    pub emphasis: Vec<String>,
    pub constraints: Vec<String>,
    pub salience_score: f64,
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "invalid salience pattern");
            None
        }
    }
}

static QUOTED: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r#""([^"]{1,80})"|`([^`]{1,80})`"#));

static QUANTITY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r"(?i)\b\d+(?:\.\d+)?\s?(?:%|ms|s|sec|seconds|minutes|min|hours?|days?|weeks?|gb|mb|kb|px|usd|eur|k)?\b|\$\d+(?:\.\d+)?")
});

static MARKDOWN_EMPHASIS: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\*\*([^*]+)\*\*|__([^_]+)__|\*([^*\s][^*]*)\*"));

static EMPHASIS_PHRASES: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r"(?i)\b(important(ly)?|critical(ly)?|crucial|essential|make sure|whatever you do|above all)\b")
});

static CONSTRAINT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        r"(?i)\b(must(?: not)?|need to|needs to|has to|have to|should(?:n't| not)|don'?t|do not|never|without|only|at most|at least|no more than|no later than|before|by (?:monday|tuesday|wednesday|thursday|friday|saturday|sunday|tomorrow|tonight|eod))\b[^.,;!?]*",
    )
});

fn captures_all(re: &Option<Regex>, text: &str) -> Vec<String> {
    let Some(re) = re.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|caps| caps.iter().skip(1).flatten().next().map(|m| m.as_str().trim().to_string()))
        .filter(|s| !s.is_empty())
        .collect()
}

fn matches_all(re: &Option<Regex>, text: &str) -> Vec<String> {
    let Some(re) = re.as_ref() else {
        return Vec::new();
    };
    re.find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.iter().any(|existing| existing.eq_ignore_ascii_case(&item)) {
        list.push(item);
    }
}

/// Capitalized words that do not start a sentence, merged into runs
/// ("New York"). Sentence-initial words are ambiguous and skipped.
fn proper_nouns(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut run: Vec<String> = Vec::new();
    let mut sentence_start = true;

    for raw in text.split_whitespace() {
        let word: String = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_string();
        let capitalized = word.chars().next().is_some_and(char::is_uppercase)
            && !word.chars().all(|c| !c.is_lowercase());
        if capitalized && !sentence_start && !is_stop_word(&word.to_lowercase()) {
            run.push(word);
        } else if !run.is_empty() {
            found.push(run.join(" "));
            run.clear();
        }
        sentence_start = raw.ends_with(['.', '!', '?']);
        if sentence_start && !run.is_empty() {
            found.push(run.join(" "));
            run.clear();
        }
    }
    if !run.is_empty() {
        found.push(run.join(" "));
    }
    found
}

fn shouted_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| {
            w.chars().filter(|c| c.is_alphabetic()).count() >= MIN_SHOUT_LEN
                && w.chars().all(|c| !c.is_lowercase())
                && w.chars().any(char::is_uppercase)
        })
        .map(str::to_string)
        .collect()
}

pub fn extract_salience(message: &str) -> SalienceFrame {
    let mut entities = Vec::new();
    for item in proper_nouns(message)
        .into_iter()
        .chain(captures_all(&QUOTED, message))
        .chain(matches_all(&QUANTITY, message))
    {
        push_unique(&mut entities, item);
    }
    entities.truncate(MAX_ENTITIES);

    let mut emphasis = Vec::new();
    for item in captures_all(&MARKDOWN_EMPHASIS, message)
        .into_iter()
        .chain(shouted_words(message))
        .chain(matches_all(&EMPHASIS_PHRASES, message))
    {
        push_unique(&mut emphasis, item);
    }

    let mut constraints = Vec::new();
    for item in matches_all(&CONSTRAINT, message) {
        push_unique(&mut constraints, item);
    }
    constraints.truncate(MAX_CONSTRAINTS);

    let focal_terms: Vec<String> = extract_keywords(message)
        .into_iter()
        .take(MAX_FOCAL_TERMS)
        .collect();

    let salience_score = clamp_unit(
        ENTITY_WEIGHT * entities.len() as f64
            + EMPHASIS_WEIGHT * emphasis.len() as f64
            + CONSTRAINT_WEIGHT * constraints.len() as f64,
    );

    SalienceFrame {
        entities,
        focal_terms,
        emphasis,
        constraints,
        salience_score,
    }
}

/// Only when the user marked something as binding or emphasized.
pub fn format_salience_injection(frame: &SalienceFrame) -> Option<ContextInjection> {
    if frame.constraints.is_empty() && frame.emphasis.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    if !frame.constraints.is_empty() {
        parts.push(format!("Respect these constraints: {}.", frame.constraints.join("; ")));
    }
    if !frame.emphasis.is_empty() {
        parts.push(format!("The user emphasized: {}.", frame.emphasis.join(", ")));
    }
    if !frame.entities.is_empty() {
        parts.push(format!("Keep these exact: {}.", frame.entities.join(", ")));
    }
    Some(ContextInjection::new(
        InjectionSource::Salience,
        parts.join(" "),
        SALIENCE_PRIORITY,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proper_nouns_skip_sentence_starts() {
        let nouns = proper_nouns("Tell Maria the offsite moved to New York. Thanks");
        assert_eq!(nouns, vec!["Maria", "New York"]);
    }

    #[test]
    fn entities_include_quotes_and_quantities() {
        let frame = extract_salience("rename `load_config` to \"read settings\" and keep it under 200ms");
        assert!(frame.entities.contains(&"load_config".to_string()));
        assert!(frame.entities.contains(&"read settings".to_string()));
        assert!(frame.entities.contains(&"200ms".to_string()));
    }

    #[test]
    fn emphasis_and_constraints() {
        let frame = extract_salience(
            "Do NOT touch the schema. It is **important** that the API must stay backwards compatible",
        );
        assert!(frame.emphasis.contains(&"NOT".to_string()));
        assert!(frame.emphasis.contains(&"important".to_string()));
        assert!(frame
            .constraints
            .iter()
            .any(|c| c.starts_with("Do not") || c.starts_with("Do NOT")));
        assert!(frame
            .constraints
            .iter()
            .any(|c| c.starts_with("must stay backwards compatible")));
        let injection = format_salience_injection(&frame).unwrap();
        assert_eq!(injection.priority, 7);
        assert!(injection.content.contains("Respect these constraints"));
    }

    #[test]
    fn plain_message_has_no_injection() {
        let frame = extract_salience("what's a good name for a cat");
        assert!(frame.constraints.is_empty());
        assert!(frame.emphasis.is_empty());
        assert!(format_salience_injection(&frame).is_none());
        assert!(frame.focal_terms.contains(&"cat".to_string()));
    }
}
