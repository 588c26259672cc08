/*!
 * Book translation with a local LLM.
 *
 * - `segmenter`: splits documents into bounded chunks
 * - `prompts`: stage-1 and stage-2 prompt builders
 * - `sanitizer`: strips wrappers and repetitions from model replies
 * - `terminology`: per-job glossary of proper nouns
 * - `cache`: two-tier translation cache keyed by text, languages, stage and context
 * - `retry`: attempt loop with linear backoff
 * - `postprocess`: duplicate removal and untranslated-paragraph flagging
 * - `pipeline`: the two-stage job orchestrator
 */

pub mod cache;
pub mod pipeline;
pub mod postprocess;
pub mod prompts;
pub mod retry;
pub mod sanitizer;
pub mod segmenter;
pub mod terminology;

pub use cache::{CacheStore, MemoryCacheStore, TranslationCache};
pub use pipeline::{
    CancellationFlag, JobState, PipelineSettings, TranslationOutcome, TranslationProgress,
    TranslationRequest, TranslationStage, TwoStageTranslator,
};
pub use retry::RetryPolicy;
pub use sanitizer::ResponseSanitizer;
pub use segmenter::TextSegmenter;
pub use terminology::TerminologyManager;
