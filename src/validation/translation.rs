/*!
 * Heuristic gate deciding whether a model response is really a translation.
 *
 * There is no reference translation to compare against, so the validator only
 * rejects on strong evidence of failure: an echo of the source, text that
 * still mostly shares the source vocabulary, residual source-language markers
 * or missing target-language markers. Rejections cost a retry; false accepts
 * end up in the cache, so the thresholds lean towards acceptance.
 */

use std::collections::HashSet;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use super::markers::{LanguageMarkerDetector, LanguageMarkerTable, ScriptType};

/// Tunables for the translation validator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Share of source words found in the candidate above which it counts as untranslated
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Candidates shorter than this (in characters) are accepted unjudged
    #[serde(default = "default_min_judgeable_length")]
    pub min_judgeable_length: usize,

    /// Candidates longer than this must contain target-language markers
    #[serde(default = "default_target_check_min_length")]
    pub target_check_min_length: usize,
}

fn default_similarity_threshold() -> f64 {
    0.65
}

fn default_min_judgeable_length() -> usize {
    50
}

fn default_target_check_min_length() -> usize {
    100
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            min_judgeable_length: default_min_judgeable_length(),
            target_check_min_length: default_target_check_min_length(),
        }
    }
}

impl ValidationConfig {
    /// Set the word-overlap rejection threshold
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }
}

/// Why a candidate translation was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Nothing came back
    Empty,
    /// The candidate is the source text again
    IdenticalToSource,
    /// Too many source words survived
    TooSimilar {
        /// Fraction of distinct source words present in the candidate
        overlap: f64,
    },
    /// The candidate still reads as the source language
    ResidualSourceLanguage {
        /// Source markers found
        count: usize,
        /// Rejection threshold for this length
        threshold: usize,
    },
    /// A long candidate has no trace of the target language
    MissingTargetLanguage {
        /// Target markers found
        count: usize,
        /// Markers required
        required: usize,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty translation"),
            Self::IdenticalToSource => write!(f, "translation is identical to the source"),
            Self::TooSimilar { overlap } => {
                write!(f, "{:.0}% of source words unchanged", overlap * 100.0)
            }
            Self::ResidualSourceLanguage { count, threshold } => write!(
                f,
                "{} source-language markers (limit {})",
                count, threshold
            ),
            Self::MissingTargetLanguage { count, required } => write!(
                f,
                "only {} target-language markers (need {})",
                count, required
            ),
        }
    }
}

/// Accepts or rejects candidate translations
#[derive(Debug, Clone, Default)]
pub struct TranslationValidator {
    config: ValidationConfig,
    detector: LanguageMarkerDetector,
}

impl TranslationValidator {
    /// Create a validator with the given configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            detector: LanguageMarkerDetector::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Whether `translated` plausibly is a `source_lang` → `target_lang` translation of `original`
    pub fn is_likely_translated(
        &self,
        original: &str,
        translated: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> bool {
        match self.check(original, translated, source_lang, target_lang) {
            Ok(()) => true,
            Err(rejection) => {
                debug!("Validator rejected candidate: {}", rejection);
                false
            }
        }
    }

    /// Same decision as [`is_likely_translated`](Self::is_likely_translated), with the reason
    pub fn check(
        &self,
        original: &str,
        translated: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<(), Rejection> {
        if translated.trim().is_empty() {
            return Err(Rejection::Empty);
        }

        if crate::language_utils::language_codes_match(source_lang, target_lang)
            || source_lang.trim().eq_ignore_ascii_case(target_lang.trim())
        {
            return Ok(());
        }

        let char_count = translated.chars().count();
        if char_count < self.config.min_judgeable_length {
            return Ok(());
        }

        let original_norm = normalize_for_comparison(original);
        let translated_norm = normalize_for_comparison(translated);
        if original_norm == translated_norm {
            return Err(Rejection::IdenticalToSource);
        }

        let source_table = LanguageMarkerTable::for_language(source_lang);

        let word_scripted_source = source_table.is_none_or(|table| !table.is_character_based());
        if word_scripted_source {
            let overlap = word_overlap(&original_norm, &translated_norm);
            if overlap > self.config.similarity_threshold {
                return Err(Rejection::TooSimilar { overlap });
            }
        }

        if let Some(table) = source_table {
            let threshold = residual_threshold(table, translated);
            let hits = LanguageMarkerDetector::count_markers(translated, table);
            if hits.count > threshold {
                return Err(Rejection::ResidualSourceLanguage {
                    count: hits.count,
                    threshold,
                });
            }
        }

        if let Some(table) = LanguageMarkerTable::for_language(target_lang) {
            if char_count > self.config.target_check_min_length {
                let hits = LanguageMarkerDetector::count_markers(translated, table);
                if hits.count < table.min_markers {
                    return Err(Rejection::MissingTargetLanguage {
                        count: hits.count,
                        required: table.min_markers,
                    });
                }
            }
        }

        Ok(())
    }

    /// Whether `text` still scores as `language` under the length-scaled threshold
    pub fn reads_as_language(&self, text: &str, language: &str) -> bool {
        match LanguageMarkerTable::for_language(language) {
            Some(table) => {
                LanguageMarkerDetector::count_markers(text, table).count > residual_threshold(table, text)
            }
            None => false,
        }
    }

    /// Marker detector used by this validator
    pub fn detector(&self) -> &LanguageMarkerDetector {
        &self.detector
    }
}

/// Length-scaled marker count above which text counts as `table`'s language
pub fn residual_threshold(table: &LanguageMarkerTable, text: &str) -> usize {
    match table.script {
        ScriptType::Word => {
            let words = text.split_whitespace().count();
            (table.min_markers + 3).max((words / 12).min(10))
        }
        ScriptType::Character => {
            let chars = text.chars().count();
            (table.min_markers + 4).max((chars / 25).min(15))
        }
    }
}

fn normalize_for_comparison(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Fraction of distinct source words that also appear in the candidate
fn word_overlap(original: &str, translated: &str) -> f64 {
    let source_words: HashSet<&str> = original.split(' ').filter(|w| !w.is_empty()).collect();
    if source_words.is_empty() {
        return 0.0;
    }
    let translated_words: HashSet<&str> = translated.split(' ').filter(|w| !w.is_empty()).collect();
    let common = source_words.intersection(&translated_words).count();
    common as f64 / source_words.len() as f64
}
