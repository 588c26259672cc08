/*!
 * Cleanup of raw model output before it is validated.
 *
 * Instruction-tuned models wrap their answers in all sorts of noise: reasoning
 * blocks, echoed prompt headers, "Here is the translation:" preambles, code
 * fences, trailing notes, quotes around the whole answer, and sometimes a
 * repeat of the continuity context they were shown. The sanitizer removes
 * those artifacts and nothing else. Running it on its own output is a no-op.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Closed reasoning blocks
static REASONING_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:think|thinking|reasoning|reflection)>.*?</(?:think|thinking|reasoning|reflection)>")
        .expect("Invalid reasoning block regex")
});

/// Reasoning block opened but never closed: everything after it is reasoning
static UNTERMINATED_REASONING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:think|thinking|reasoning|reflection)>.*$")
        .expect("Invalid unterminated reasoning regex")
});

/// Closing tag whose opening tag was swallowed by the chat template
static ORPHAN_REASONING_CLOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^.*?</(?:think|thinking|reasoning|reflection)>")
        .expect("Invalid orphan reasoning regex")
});

/// Echoed prompt lines, removed wherever they appear
static ECHO_LINES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^[ \t]*IMPORTANT:[ \t]*Return ONLY the translation.*(?:\n+|$)",
        r"(?im)^[ \t]*IMPORTANTE:[ \t]*Devuelve SOLO la traducci[oó]n.*(?:\n+|$)",
        r"(?im)^[ \t]*(?:TEXT TO TRANSLATE|TEXTO A TRADUCIR)[ \t]*:.*(?:\n+|$)",
        r"(?im)^[ \t]*(?:OUTPUT|DRAFT TRANSLATION)(?:[ \t]*\([^)\n]*\))?[ \t]*:[ \t]*(?:\n+|$)",
        r"(?im)^[ \t]*CONTEXT \(for continuity only[^)\n]*\):.*(?:\n+|$)",
        r"(?m)^[ \t]*```[\w-]*[ \t]*(?:\n|$)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid echo line regex"))
    .collect()
});

/// Preambles that only make sense at the very start of the answer
static LEADING_PREAMBLES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^\s*(?:here is|here's|below is)\s+(?:the|my|your)\s+(?:improved\s+|final\s+|revised\s+|edited\s+)?translation[^:\n]*:?[ \t]*\n*",
        r"(?i)^\s*\**(?:final\s+|improved\s+|revised\s+)?(?:translation|translated text)\**\s*:\**[ \t]*\n*",
        r"^\s*-{3,}[ \t]*(?:\n+|$)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid preamble regex"))
    .collect()
});

/// Translator notes appended after the answer
static TRAILING_NOTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\n[ \t]*\**\(?(?:note|notes|translator'?s note|translation notes?)\**[ \t]*:.*$")
        .expect("Invalid trailing notes regex")
});

/// Lines of the previous chunk compared against the start of a new answer
const MAX_CONTEXT_LINES: usize = 5;

/// Shortest repeated span worth stripping when comparing whole lines
const MIN_LINE_REPEAT_CHARS: usize = 50;

/// Shortest tail of the previous final line worth stripping
const MIN_TAIL_REPEAT_CHARS: usize = 30;

/// Tail window shrink step
const TAIL_STEP: usize = 10;

/// Quote pairs that may wrap an entire answer
const QUOTE_PAIRS: &[(char, char)] = &[('"', '"'), ('\'', '\''), ('“', '”')];

/// Removes model artifacts from raw responses
#[derive(Debug, Clone, Default)]
pub struct ResponseSanitizer;

impl ResponseSanitizer {
    /// Create a sanitizer
    pub fn new() -> Self {
        Self
    }

    /// Clean `raw`, also removing a leading repeat of `previous_chunk`
    pub fn clean(&self, raw: &str, previous_chunk: &str) -> String {
        let mut text = raw.trim().to_string();

        // Removing one artifact can expose another. Every step only removes
        // text, so this reaches a fixed point.
        loop {
            let next = self.clean_once(&text, previous_chunk);
            if next == text {
                break;
            }
            text = next;
        }

        if text.len() != raw.trim().len() {
            debug!(
                "Sanitized response from {} to {} characters",
                raw.trim().chars().count(),
                text.chars().count()
            );
        }
        text
    }

    fn clean_once(&self, text: &str, previous_chunk: &str) -> String {
        let text = strip_reasoning(text);
        let text = strip_echoes(&text);
        let text = strip_wrapping_quotes(&text);
        strip_context_repeat(&text, previous_chunk)
    }
}

fn strip_reasoning(text: &str) -> String {
    let text = REASONING_BLOCK.replace_all(text, "");
    let text = ORPHAN_REASONING_CLOSE.replace(&text, "");
    UNTERMINATED_REASONING.replace(&text, "").trim().to_string()
}

fn strip_echoes(text: &str) -> String {
    let mut text = text.to_string();
    for pattern in ECHO_LINES.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    text = TRAILING_NOTES.replace(&text, "").into_owned();
    for pattern in LEADING_PREAMBLES.iter() {
        text = pattern.replace(text.trim_start(), "").into_owned();
    }
    text.trim().to_string()
}

fn strip_wrapping_quotes(text: &str) -> String {
    for (open, close) in QUOTE_PAIRS {
        if let Some(inner) = text
            .strip_prefix(*open)
            .and_then(|rest| rest.strip_suffix(*close))
        {
            // Inner quotes mean these are dialogue marks, not a wrapper
            let nested = QUOTE_PAIRS
                .iter()
                .any(|(o, c)| inner.contains(*o) || inner.contains(*c));
            if !nested {
                return inner.trim().to_string();
            }
        }
    }
    text.to_string()
}

fn strip_context_repeat(text: &str, previous_chunk: &str) -> String {
    let previous = previous_chunk.trim();
    if previous.is_empty() || text.is_empty() {
        return text.to_string();
    }

    let lines: Vec<&str> = previous.lines().collect();
    for count in (1..=MAX_CONTEXT_LINES.min(lines.len())).rev() {
        let tail = lines[lines.len() - count..].join("\n");
        let tail = tail.trim();
        if tail.chars().count() >= MIN_LINE_REPEAT_CHARS {
            if let Some(rest) = text.strip_prefix(tail) {
                debug!("Removed {} repeated context lines", count);
                return rest.trim().to_string();
            }
        }
    }

    let last_line: Vec<char> = lines.last().map(|l| l.trim().chars().collect()).unwrap_or_default();
    if last_line.len() > MIN_TAIL_REPEAT_CHARS {
        let mut window = last_line.len();
        while window > MIN_TAIL_REPEAT_CHARS {
            let suffix: String = last_line[last_line.len() - window..].iter().collect();
            if let Some(rest) = text.strip_prefix(suffix.as_str()) {
                debug!("Removed {} repeated context characters", window);
                return rest.trim().to_string();
            }
            window = window.saturating_sub(TAIL_STEP);
        }
    }

    text.to_string()
}
