/*!
 * Document-level cleanup after both stages have run.
 */

use std::collections::HashSet;

use log::{info, warn};
use serde::Serialize;

use super::cache::is_failure_sentinel;
use crate::language_utils::language_codes_match;
use crate::validation::TranslationValidator;

/// Paragraphs shorter than this are never treated as duplicates
pub const MIN_DUPLICATE_LENGTH: usize = 100;

/// Characters of a normalized paragraph used as its identity
pub const DUPLICATE_KEY_LENGTH: usize = 150;

/// Paragraphs shorter than this are never flagged as untranslated
pub const MIN_FLAG_LENGTH: usize = 50;

/// Default annotation for paragraphs that still read as the source language
pub const DEFAULT_UNTRANSLATED_MARKER: &str = "[POSSIBLY UNTRANSLATED] ";

/// What the post-processing pass changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostProcessReport {
    /// Number of duplicate paragraphs removed
    pub duplicates_removed: usize,
    /// Paragraphs annotated as possibly untranslated, as they read before annotation
    pub flagged_paragraphs: Vec<String>,
}

fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n").filter(|p| !p.trim().is_empty())
}

fn duplicate_key(paragraph: &str) -> String {
    paragraph
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .take(DUPLICATE_KEY_LENGTH)
        .collect()
}

/// Drop long paragraphs whose normalized opening repeats an earlier one.
///
/// Returns the cleaned text and how many paragraphs were removed.
pub fn remove_duplicate_paragraphs(text: &str) -> (String, usize) {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut removed = 0;

    for paragraph in paragraphs(text) {
        if paragraph.trim().chars().count() < MIN_DUPLICATE_LENGTH {
            kept.push(paragraph);
            continue;
        }
        if seen.insert(duplicate_key(paragraph)) {
            kept.push(paragraph);
        } else {
            removed += 1;
        }
    }

    if removed > 0 {
        info!("Removed {} duplicate paragraphs", removed);
    }
    (kept.join("\n\n"), removed)
}

/// Prefix paragraphs that still read as `source_lang` with `marker`.
///
/// Returns the annotated text and the flagged paragraphs.
pub fn flag_untranslated(
    text: &str,
    source_lang: &str,
    target_lang: &str,
    validator: &TranslationValidator,
    marker: &str,
) -> (String, Vec<String>) {
    if language_codes_match(source_lang, target_lang) || source_lang.eq_ignore_ascii_case(target_lang) {
        return (text.to_string(), Vec::new());
    }

    let mut flagged = Vec::new();
    let annotated: Vec<String> = paragraphs(text)
        .map(|paragraph| {
            let trimmed = paragraph.trim();
            let eligible = trimmed.chars().count() >= MIN_FLAG_LENGTH
                && !is_failure_sentinel(trimmed)
                && !(!marker.is_empty() && trimmed.starts_with(marker.trim()));

            if eligible && validator.reads_as_language(trimmed, source_lang) {
                flagged.push(trimmed.to_string());
                format!("{}{}", marker, paragraph)
            } else {
                paragraph.to_string()
            }
        })
        .collect();

    if !flagged.is_empty() {
        warn!("{} paragraphs may be untranslated", flagged.len());
    }
    (annotated.join("\n\n"), flagged)
}

/// Run duplicate removal followed by untranslated flagging
pub fn post_process(
    text: &str,
    source_lang: &str,
    target_lang: &str,
    validator: &TranslationValidator,
    marker: &str,
) -> (String, PostProcessReport) {
    let (deduplicated, duplicates_removed) = remove_duplicate_paragraphs(text);
    let (annotated, flagged_paragraphs) =
        flag_untranslated(&deduplicated, source_lang, target_lang, validator, marker);

    (
        annotated,
        PostProcessReport {
            duplicates_removed,
            flagged_paragraphs,
        },
    )
}
