/*!
 * Progress records emitted while a job runs.
 *
 * Both stages walk the same chunks, so a job has `2 × chunks` steps: step `n`
 * of stage 1 is step `n`, step `n` of stage 2 is step `n + chunks`.
 * `current_chunk` and `total_chunks` count those steps.
 */

use serde::Serialize;

use super::job::TranslationStage;

/// One progress record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationProgress {
    /// Completion percentage in `[0, 100]`
    pub progress: f64,
    /// Stage that produced the record
    pub stage: TranslationStage,
    /// Steps completed
    pub current_chunk: usize,
    /// Steps in the job
    pub total_chunks: usize,
    /// Drafts produced so far
    pub machine_translation: String,
    /// Final text so far (stage 2) or the finished document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    /// Warnings collected so far, one per line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
    /// Error message for failed or cancelled jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn percent(step: usize, total_steps: usize) -> f64 {
    if total_steps == 0 {
        return 100.0;
    }
    (step as f64 / total_steps as f64 * 100.0).clamp(0.0, 100.0)
}

fn join_warnings(warnings: &[String]) -> Option<String> {
    if warnings.is_empty() {
        None
    } else {
        Some(warnings.join("\n"))
    }
}

impl TranslationProgress {
    /// Record for stage-1 chunk `chunk_number` (1-based) of `total_chunks`
    pub fn primary(chunk_number: usize, total_chunks: usize, machine_translation: String) -> Self {
        let steps = total_chunks * 2;
        Self {
            progress: percent(chunk_number, steps),
            stage: TranslationStage::Primary,
            current_chunk: chunk_number,
            total_chunks: steps,
            machine_translation,
            translated_text: None,
            warnings: None,
            error: None,
        }
    }

    /// Record for stage-2 chunk `chunk_number` (1-based) of `total_chunks`
    pub fn reflection(
        chunk_number: usize,
        total_chunks: usize,
        machine_translation: String,
        translated_text: String,
        warnings: &[String],
    ) -> Self {
        let steps = total_chunks * 2;
        Self {
            progress: percent(chunk_number + total_chunks, steps),
            stage: TranslationStage::Reflection,
            current_chunk: chunk_number + total_chunks,
            total_chunks: steps,
            machine_translation,
            translated_text: Some(translated_text),
            warnings: join_warnings(warnings),
            error: None,
        }
    }

    /// Final record of a completed job
    pub fn completed(
        total_chunks: usize,
        machine_translation: String,
        final_text: String,
        warnings: &[String],
    ) -> Self {
        let steps = total_chunks * 2;
        Self {
            progress: 100.0,
            stage: TranslationStage::Completed,
            current_chunk: steps,
            total_chunks: steps,
            machine_translation,
            translated_text: Some(final_text),
            warnings: join_warnings(warnings),
            error: None,
        }
    }

    /// Record for a job that stopped early; progress stays where it was
    pub fn stopped(
        stage: TranslationStage,
        steps_done: usize,
        total_chunks: usize,
        machine_translation: String,
        error: String,
    ) -> Self {
        let steps = total_chunks * 2;
        Self {
            progress: percent(steps_done, steps),
            stage,
            current_chunk: steps_done,
            total_chunks: steps,
            machine_translation,
            translated_text: None,
            warnings: None,
            error: Some(error),
        }
    }

    /// Whether this is the terminal record of a completed job
    pub fn is_final(&self) -> bool {
        self.stage == TranslationStage::Completed
    }
}
