/*!
 * # booktrans - two-stage book translation with a local LLM
 *
 * A Rust library for translating long documents with an Ollama-served model.
 *
 * ## Features
 *
 * - Paragraph and sentence aware segmentation into bounded chunks
 * - Stage 1 drafts with running context and a per-job glossary
 * - Stage 2 reflection where the model edits its own draft
 * - Heuristic validation of every reply (untranslated, echoed or wrong-language output)
 * - Two-tier translation cache (in-memory or SQLite) keyed by text, languages, stage and context
 * - Retry with linear backoff, cooperative cancellation and progress reporting
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: the pipeline and its building blocks:
 *   - `translation::segmenter`: chunking
 *   - `translation::prompts`: prompt builders
 *   - `translation::sanitizer`: reply cleanup
 *   - `translation::terminology`: glossary handling
 *   - `translation::cache`: translation cache
 *   - `translation::pipeline`: job model and orchestrator
 * - `validation`: language markers and reply acceptance rules
 * - `database`: SQLite cache store
 * - `providers`: model clients (Ollama and a scripted mock)
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod translation;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{CacheError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match};
pub use translation::{
    CancellationFlag, JobState, PipelineSettings, TranslationCache, TranslationOutcome,
    TranslationProgress, TranslationRequest, TwoStageTranslator,
};
pub use validation::TranslationValidator;
