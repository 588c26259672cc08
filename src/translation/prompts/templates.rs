/*!
 * Prompt templates for the two translation stages.
 *
 * Stage 1 asks for a faithful draft, with the running glossary and the tail
 * of the previous draft as continuity context. Stage 2 shows the model the
 * original next to the draft and asks for an edited final version.
 */

use crate::language_utils;

/// Genre that adds no extra instruction
pub const DEFAULT_GENRE: &str = "general";

/// Default number of characters of the previous chunk's output shown as context
pub const DEFAULT_CONTEXT_TAIL_CHARS: usize = 300;

/// Last `max_chars` characters of `text`
pub fn context_tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    match text.char_indices().nth(skip) {
        Some((offset, _)) => &text[offset..],
        None => text,
    }
}

fn genre_line(genre: &str) -> String {
    let genre = genre.trim();
    if genre.is_empty() || genre.eq_ignore_ascii_case(DEFAULT_GENRE) {
        String::new()
    } else {
        format!("This is {} writing; keep the register and conventions of the genre.\n", genre)
    }
}

/// Builder for the stage-1 (draft) prompt
#[derive(Debug, Clone)]
pub struct DraftPromptBuilder {
    source_language: String,
    target_language: String,
    terminology: String,
    previous_draft: String,
    context_tail_chars: usize,
    genre: String,
}

impl DraftPromptBuilder {
    /// Create a builder for a language pair given as codes
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: language_utils::display_name(source_language),
            target_language: language_utils::display_name(target_language),
            terminology: String::new(),
            previous_draft: String::new(),
            context_tail_chars: DEFAULT_CONTEXT_TAIL_CHARS,
            genre: DEFAULT_GENRE.to_string(),
        }
    }

    /// Set the glossary block
    pub fn with_terminology(mut self, block: &str) -> Self {
        self.terminology = block.to_string();
        self
    }

    /// Set the previous chunk's draft and how much of its tail to show
    pub fn with_previous_draft(mut self, draft: &str, tail_chars: usize) -> Self {
        self.previous_draft = draft.to_string();
        self.context_tail_chars = tail_chars;
        self
    }

    /// Set the genre hint
    pub fn with_genre(mut self, genre: &str) -> Self {
        self.genre = genre.to_string();
        self
    }

    /// Render the prompt for `text`
    pub fn build(&self, text: &str) -> String {
        let terminology_section = if self.terminology.trim().is_empty() {
            String::new()
        } else {
            format!("\n{}\n", self.terminology)
        };

        let context_section = if self.previous_draft.trim().is_empty() || self.context_tail_chars == 0 {
            String::new()
        } else {
            format!(
                "\nCONTEXT (for continuity only - do NOT include in output):\n{}\n---\n",
                context_tail(&self.previous_draft, self.context_tail_chars)
            )
        };

        format!(
            "You are a professional literary translator. Translate the following {src} text to {tgt}.\n\
             {genre}\n\
             CRITICAL RULES:\n\
             1. Output ONLY the translated text - nothing else\n\
             2. PRESERVE all original formatting: paragraphs, line breaks, dialogue formatting, indentation\n\
             3. Do NOT add notes, explanations, comments, or headers\n\
             4. Do NOT repeat the prompt or instructions\n\
             5. Do NOT include \"Translation:\", \"Here is:\", or similar prefixes\n\
             6. Do NOT add [brackets] or markers of any kind\n\
             7. Maintain the author's style, tone, and voice exactly\n\
             8. Keep proper nouns and names consistent\n\
             {terminology}{context}\n\
             TEXT TO TRANSLATE:\n\
             {text}\n\n\
             OUTPUT (translated text only, preserving all formatting):",
            src = self.source_language,
            tgt = self.target_language,
            genre = genre_line(&self.genre),
            terminology = terminology_section,
            context = context_section,
            text = text,
        )
    }
}

/// Builder for the stage-2 (reflection) prompt
#[derive(Debug, Clone)]
pub struct ReflectionPromptBuilder {
    source_language: String,
    target_language: String,
    previous_final: String,
    context_tail_chars: usize,
    genre: String,
}

impl ReflectionPromptBuilder {
    /// Create a builder for a language pair given as codes
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: language_utils::display_name(source_language),
            target_language: language_utils::display_name(target_language),
            previous_final: String::new(),
            context_tail_chars: DEFAULT_CONTEXT_TAIL_CHARS,
            genre: DEFAULT_GENRE.to_string(),
        }
    }

    /// Set the previous chunk's final text and how much of its tail to show
    pub fn with_previous_final(mut self, final_text: &str, tail_chars: usize) -> Self {
        self.previous_final = final_text.to_string();
        self.context_tail_chars = tail_chars;
        self
    }

    /// Set the genre hint
    pub fn with_genre(mut self, genre: &str) -> Self {
        self.genre = genre.to_string();
        self
    }

    /// Render the prompt for an original chunk and its draft
    pub fn build(&self, original: &str, draft: &str) -> String {
        let context_section = if self.previous_final.trim().is_empty() || self.context_tail_chars == 0 {
            String::new()
        } else {
            format!(
                "STYLE CONTEXT (previous section ended with, do NOT include in output):\n...{}\n\n",
                context_tail(&self.previous_final, self.context_tail_chars)
            )
        };

        format!(
            "You are a professional literary editor. Review and improve this {tgt} translation.\n\
             {genre}\n\
             ORIGINAL ({src}):\n\
             {original}\n\n\
             DRAFT TRANSLATION ({tgt}):\n\
             {draft}\n\n\
             {context}\
             TASK: Review for accuracy, fluency, style preservation, and consistency.\n\n\
             CRITICAL RULES:\n\
             1. Output ONLY the improved translated text - nothing else\n\
             2. PRESERVE all original formatting: paragraphs, line breaks, dialogue formatting\n\
             3. Do NOT add notes, explanations, or comments\n\
             4. Do NOT include prefixes like \"Improved translation:\" or similar\n\
             5. If the draft is already good, return it unchanged\n\n\
             OUTPUT (final translation only):",
            src = self.source_language,
            tgt = self.target_language,
            genre = genre_line(&self.genre),
            original = original,
            draft = draft,
            context = context_section,
        )
    }
}
