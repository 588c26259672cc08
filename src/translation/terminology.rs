/*!
 * Per-job terminology memory.
 *
 * Names and recurring terms must be rendered the same way in chunk 1 and in
 * chunk 300, but every chunk is an independent model call. The manager keeps
 * an insertion-ordered glossary for one job, feeds the most recent entries
 * back into prompts, and rewrites drafts whose rendering of a known term
 * drifted from the first decision.
 */

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Runs of capitalized words
static CAPITALIZED_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("Invalid proper noun regex")
});

/// Default number of glossary entries embedded in a prompt
pub const DEFAULT_PROMPT_TERMS: usize = 20;

/// Insertion-ordered term glossary scoped to a single translation job
#[derive(Debug, Clone, Default)]
pub struct TerminologyManager {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl TerminologyManager {
    /// Create an empty glossary
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a glossary seeded with caller-provided pairs
    pub fn with_glossary<I, K, V>(glossary: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut manager = Self::new();
        for (original, translated) in glossary {
            manager.add_term(original, translated);
        }
        manager
    }

    /// Record a mapping; re-adding a term replaces its rendering in place
    pub fn add_term(&mut self, original: impl Into<String>, translated: impl Into<String>) {
        let original = original.into();
        let translated = translated.into();
        if original.trim().is_empty() || translated.trim().is_empty() {
            return;
        }

        match self.index.get(&original) {
            Some(&position) => self.entries[position].1 = translated,
            None => {
                self.index.insert(original.clone(), self.entries.len());
                self.entries.push((original, translated));
            }
        }
    }

    /// Stored rendering of a term
    pub fn get_term(&self, original: &str) -> Option<&str> {
        self.index
            .get(original)
            .map(|&position| self.entries[position].1.as_str())
    }

    /// Reconcile the terms seen in one chunk with the glossary.
    ///
    /// A term already in the glossary with a different rendering gets the new
    /// rendering replaced by the stored one in `text`; unseen terms are recorded.
    pub fn ensure_consistency(&mut self, text: &str, chunk_terms: &[(String, String)]) -> String {
        let mut result = text.to_string();

        for (original, translated) in chunk_terms {
            if translated.trim().is_empty() {
                continue;
            }
            match self.get_term(original) {
                Some(existing) if existing != translated => {
                    debug!("Term '{}': replacing '{}' with '{}'", original, translated, existing);
                    result = replace_term(&result, translated, existing);
                }
                Some(_) => {}
                None => self.add_term(original.clone(), translated.clone()),
            }
        }

        result
    }

    /// Glossary block for the next prompt, holding the `max_terms` most recent entries
    pub fn context_for_prompt(&self, max_terms: usize) -> String {
        if self.entries.is_empty() || max_terms == 0 {
            return String::new();
        }

        let start = self.entries.len().saturating_sub(max_terms);
        let mut block = String::from("TERMINOLOGY (use these translations consistently):");
        for (original, translated) in &self.entries[start..] {
            block.push_str(&format!("\n  - {} → {}", original, translated));
        }
        block
    }

    /// All mappings in insertion order
    pub fn glossary(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Number of stored terms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no terms are stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every term
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

/// Replace whole-word occurrences of `from` with `to`
fn replace_term(text: &str, from: &str, to: &str) -> String {
    let starts_word = from.chars().next().is_some_and(char::is_alphanumeric);
    let ends_word = from.chars().last().is_some_and(char::is_alphanumeric);
    let pattern = format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        regex::escape(from),
        if ends_word { r"\b" } else { "" }
    );

    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(text, regex::NoExpand(to)).into_owned(),
        Err(_) => text.replace(from, to),
    }
}

/// Capitalized word runs that do not open a sentence, in first-seen order
pub fn extract_proper_nouns(text: &str) -> Vec<String> {
    let mut nouns: Vec<String> = Vec::new();

    for found in CAPITALIZED_RUN.find_iter(text) {
        let before = text[..found.start()].trim_end_matches([' ', '\t']);
        let opens_sentence = match before.chars().last() {
            None => true,
            Some(ch) => matches!(ch, '.' | '!' | '?' | '\n' | '"' | '“' | '«' | '—' | ':'),
        };
        if opens_sentence {
            continue;
        }

        let noun = found.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
        if !nouns.contains(&noun) {
            nouns.push(noun);
        }
    }

    nouns
}

/// Proper nouns of `source` that the model left verbatim in `translated`
pub fn preserved_proper_nouns(source: &str, translated: &str) -> Vec<(String, String)> {
    extract_proper_nouns(source)
        .into_iter()
        .filter(|noun| {
            let pattern = format!(r"\b{}\b", regex::escape(noun));
            Regex::new(&pattern).is_ok_and(|re| re.is_match(translated))
        })
        .map(|noun| (noun.clone(), noun))
        .collect()
}
