/*!
 * Document segmentation into bounded translation chunks.
 *
 * Paragraphs (blank-line separated) are packed greedily into chunks of at most
 * `max_chunk_length` characters. A paragraph that does not fit on its own is
 * broken into sentences, and a sentence that still does not fit is broken at
 * its comma clauses. Anything smaller than a clause is never cut: an oversized
 * clause is emitted whole and logged, never truncated or dropped.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

/// Blank line, possibly containing stray spaces
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n[ \t]*\n").expect("Invalid paragraph break regex")
});

/// Three or more line breaks
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n{3,}").expect("Invalid newline regex")
});

/// Normalize line endings, collapse runs of blank lines and trim
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    EXCESS_NEWLINES.replace_all(&unified, "\n\n").trim().to_string()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits documents into chunks for translation
#[derive(Debug, Clone)]
pub struct TextSegmenter {
    max_chunk_length: usize,
}

impl TextSegmenter {
    /// Create a segmenter producing chunks of at most `max_chunk_length` characters
    pub fn new(max_chunk_length: usize) -> Self {
        Self {
            max_chunk_length: max_chunk_length.max(1),
        }
    }

    /// Configured chunk bound
    pub fn max_chunk_length(&self) -> usize {
        self.max_chunk_length
    }

    /// Split `text` into ordered, non-empty chunks.
    ///
    /// Input without any content comes back as a single chunk holding the
    /// original text, so callers always get at least one element.
    pub fn split(&self, text: &str) -> Vec<String> {
        let normalized = normalize_text(text);
        let max = self.max_chunk_length;

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0;

        for paragraph in PARAGRAPH_BREAK.split(&normalized) {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }

            let paragraph_len = char_len(paragraph);
            if paragraph_len > max {
                if !current.is_empty() {
                    chunks.push(current.join("\n\n"));
                    current.clear();
                    current_len = 0;
                }
                chunks.extend(self.split_paragraph(paragraph));
                continue;
            }

            let joined_len = if current.is_empty() {
                paragraph_len
            } else {
                current_len + 2 + paragraph_len
            };

            if joined_len > max {
                chunks.push(current.join("\n\n"));
                current.clear();
                current_len = paragraph_len;
            } else {
                current_len = joined_len;
            }
            current.push(paragraph);
        }

        if !current.is_empty() {
            chunks.push(current.join("\n\n"));
        }

        if chunks.is_empty() {
            return vec![text.to_string()];
        }

        debug!(
            "Segmented {} characters into {} chunks (max {})",
            char_len(&normalized),
            chunks.len(),
            max
        );
        chunks
    }

    /// Break an oversized paragraph at sentence, then clause boundaries
    fn split_paragraph(&self, paragraph: &str) -> Vec<String> {
        let max = self.max_chunk_length;
        let mut pieces = Vec::new();
        let mut sentences: Vec<&str> = Vec::new();

        for sentence in split_sentences(paragraph) {
            if char_len(sentence) <= max {
                sentences.push(sentence);
                continue;
            }

            pieces.extend(pack(&sentences, " ", max));
            sentences.clear();

            let clauses = split_clauses(sentence);
            for clause in &clauses {
                if char_len(clause) > max {
                    warn!(
                        "Indivisible segment of {} characters exceeds chunk limit of {}",
                        char_len(clause),
                        max
                    );
                }
            }
            pieces.extend(pack(&clauses, " ", max));
        }

        pieces.extend(pack(&sentences, " ", max));
        pieces
    }
}

/// Greedily join units with `separator` while the result stays within `max` characters
fn pack(units: &[&str], separator: &str, max: usize) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut packed = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for unit in units {
        let unit_len = char_len(unit);
        let joined_len = if current.is_empty() {
            unit_len
        } else {
            current_len + separator_len + unit_len
        };

        if joined_len > max && !current.is_empty() {
            packed.push(current.join(separator));
            current.clear();
            current_len = unit_len;
        } else {
            current_len = joined_len;
        }
        current.push(unit);
    }

    if !current.is_empty() {
        packed.push(current.join(separator));
    }
    packed
}

/// Split after `.`, `!` or `?` when followed by whitespace and an uppercase letter
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    let mut i = 0;
    while i < chars.len() {
        let (offset, ch) = chars[i];
        if matches!(ch, '.' | '!' | '?') {
            let mut j = i + 1;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            if j > i + 1 && j < chars.len() && chars[j].1.is_uppercase() {
                let end = offset + ch.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = chars[j].0;
                i = j;
                continue;
            }
        }
        i += 1;
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Split a sentence after each `", "`, keeping the comma with its clause
fn split_clauses(sentence: &str) -> Vec<&str> {
    sentence
        .split_inclusive(", ")
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .collect()
}
