/*!
 * Two-stage translation pipeline.
 *
 * - `job`: request, chunks and the job state machine
 * - `progress`: progress records streamed to callers
 * - `orchestrator`: drives a job through drafting, reflection and post-processing
 */

pub mod job;
pub mod orchestrator;
pub mod progress;

pub use job::{CancellationFlag, Chunk, JobState, TranslationJob, TranslationRequest, TranslationStage};
pub use orchestrator::{PipelineSettings, TranslationHandle, TranslationOutcome, TwoStageTranslator};
pub use progress::TranslationProgress;
