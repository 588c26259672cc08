/*!
 * Prompt construction for the draft and reflection stages.
 */

pub mod templates;

pub use templates::{DEFAULT_CONTEXT_TAIL_CHARS, DraftPromptBuilder, ReflectionPromptBuilder, context_tail};
