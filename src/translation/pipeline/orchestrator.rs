/*!
 * Two-stage translation orchestrator.
 *
 * A job is driven through a fixed sequence:
 * 1. Segmentation into bounded chunks
 * 2. Stage 1: a draft per chunk, each prompt carrying the previous draft's tail
 * 3. Stage 2: the model edits each draft against its original
 * 4. Post-processing of the joined document
 *
 * Chunks are processed strictly in order because every prompt and cache key
 * depends on the previous chunk's output. A stage-1 chunk that exhausts its
 * retries fails the job; a stage-2 chunk that does so falls back to its draft.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app_config::Config;
use crate::errors::{ProviderError, TranslationError};
use crate::language_utils;
use crate::providers::{GenerateRequest, ModelClient};
use crate::translation::cache::{TranslationCache, failure_sentinel, is_failure_sentinel, truncate_text};
use crate::translation::postprocess::{self, DEFAULT_UNTRANSLATED_MARKER};
use crate::translation::prompts::{DEFAULT_CONTEXT_TAIL_CHARS, DraftPromptBuilder, ReflectionPromptBuilder};
use crate::translation::retry::{RetryExhausted, RetryPolicy};
use crate::translation::sanitizer::ResponseSanitizer;
use crate::translation::segmenter::TextSegmenter;
use crate::translation::terminology::{DEFAULT_PROMPT_TERMS, TerminologyManager, preserved_proper_nouns};
use crate::validation::{DetectedLanguage, TranslationValidator};

use super::job::{CancellationFlag, JobState, TranslationJob, TranslationRequest, TranslationStage};
use super::progress::TranslationProgress;

/// Minimum detection confidence before a language mismatch is reported
const DETECTION_WARNING_CONFIDENCE: f64 = 0.3;

/// Knobs of the orchestrator
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Model used when the request does not name one
    pub model: String,
    /// Chunk bound in characters
    pub max_chunk_length: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Upper bound on a single model call, on top of the client's own timeouts
    pub call_timeout: Option<Duration>,
    /// Pause between chunks
    pub chunk_delay: Duration,
    /// Characters of the previous chunk's output shown to the model in either stage
    pub context_tail_chars: usize,
    /// Glossary entries embedded in each stage-1 prompt
    pub glossary_terms: usize,
    /// Fail the job when a stage-1 chunk exhausts its retries
    pub abort_on_stage1_failure: bool,
    /// Prefix for paragraphs that still read as the source language
    pub untranslated_marker: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model: "llama3.3:70b-instruct-q2_K".to_string(),
            max_chunk_length: 1000,
            temperature: 0.3,
            top_p: 0.9,
            call_timeout: None,
            chunk_delay: Duration::from_millis(300),
            context_tail_chars: DEFAULT_CONTEXT_TAIL_CHARS,
            glossary_terms: DEFAULT_PROMPT_TERMS,
            abort_on_stage1_failure: true,
            untranslated_marker: DEFAULT_UNTRANSLATED_MARKER.to_string(),
        }
    }
}

impl PipelineSettings {
    /// Settings derived from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model.model.clone(),
            max_chunk_length: config.translation.max_chunk_length,
            temperature: config.model.temperature,
            top_p: config.model.top_p,
            call_timeout: None,
            chunk_delay: Duration::from_millis(config.translation.chunk_delay_ms),
            context_tail_chars: config.translation.context_tail_chars,
            glossary_terms: config.translation.glossary_terms,
            abort_on_stage1_failure: config.translation.abort_on_stage1_failure,
            untranslated_marker: config.translation.untranslated_marker.clone(),
        }
    }

    /// Set the default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the pause between chunks
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Set the per-call timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Choose between failing the job and keeping a placeholder when stage 1 gives up
    pub fn with_abort_on_stage1_failure(mut self, abort: bool) -> Self {
        self.abort_on_stage1_failure = abort;
        self
    }

    /// Set the chunk bound
    pub fn with_max_chunk_length(mut self, max_chunk_length: usize) -> Self {
        self.max_chunk_length = max_chunk_length;
        self
    }
}

/// Result of a job
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    /// Job id
    pub job_id: String,
    /// Terminal state
    pub state: JobState,
    /// Post-processed document, for completed jobs
    pub final_text: Option<String>,
    /// Drafts joined as a document
    pub machine_translation: String,
    /// Non-fatal problems
    pub warnings: Vec<String>,
    /// Paragraphs annotated as possibly untranslated
    pub flagged_paragraphs: Vec<String>,
    /// Duplicate paragraphs removed during post-processing
    pub duplicates_removed: usize,
    /// Language detected in the input
    pub detected_language: Option<DetectedLanguage>,
    /// Error message for failed or cancelled jobs
    pub error: Option<String>,
    /// Number of chunks
    pub total_chunks: usize,
    /// Wall-clock duration
    pub duration: Duration,
}

impl TranslationOutcome {
    /// Whether the job completed
    pub fn is_success(&self) -> bool {
        self.state == JobState::Completed
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("State: {}", self.state),
            format!("Chunks: {}", self.total_chunks),
            format!("Duration: {:.2}s", self.duration.as_secs_f32()),
        ];
        if !self.warnings.is_empty() {
            parts.push(format!("Warnings: {}", self.warnings.len()));
        }
        if let Some(ref error) = self.error {
            parts.push(format!("Error: {}", error));
        }
        parts.join(" | ")
    }
}

/// Handle to a job running on its own task
pub struct TranslationHandle {
    /// Progress records in emission order; closes when the job ends
    pub progress: mpsc::UnboundedReceiver<TranslationProgress>,
    /// Final outcome
    pub result: JoinHandle<Result<TranslationOutcome, TranslationError>>,
    /// Cancels the job
    pub cancel: CancellationFlag,
}

/// Runs translation jobs against a model client
pub struct TwoStageTranslator {
    client: Arc<dyn ModelClient>,
    cache: TranslationCache,
    validator: TranslationValidator,
    sanitizer: ResponseSanitizer,
    segmenter: TextSegmenter,
    retry: RetryPolicy,
    settings: PipelineSettings,
}

/// Shared view of the job for one stage run
struct StageContext<'a> {
    source_language: &'a str,
    target_language: &'a str,
    model: &'a str,
    genre: &'a str,
    cancel: &'a CancellationFlag,
}

impl TwoStageTranslator {
    /// Create a translator with default validation and retry policy
    pub fn new(client: Arc<dyn ModelClient>, cache: TranslationCache, settings: PipelineSettings) -> Self {
        Self {
            client,
            cache,
            validator: TranslationValidator::default(),
            sanitizer: ResponseSanitizer::new(),
            segmenter: TextSegmenter::new(settings.max_chunk_length),
            retry: RetryPolicy::default(),
            settings,
        }
    }

    /// Replace the validator
    pub fn with_validator(mut self, validator: TranslationValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Active settings
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Shared cache
    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Run a job on a tokio task, streaming progress through a channel
    pub fn spawn(self: Arc<Self>, request: TranslationRequest) -> TranslationHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationFlag::new();
        let job_cancel = cancel.clone();

        let result = tokio::spawn(async move {
            let sink = move |record: TranslationProgress| {
                // The receiver may have been dropped; the job still runs to the end
                let _ = tx.send(record);
            };
            self.translate(request, &sink, &job_cancel).await
        });

        TranslationHandle {
            progress: rx,
            result,
            cancel,
        }
    }

    /// Translate a document, reporting through `progress`.
    ///
    /// Failed and cancelled jobs come back as `Ok` outcomes carrying the
    /// error message; `Err` is reserved for unusable requests.
    pub async fn translate(
        &self,
        request: TranslationRequest,
        progress: &(dyn Fn(TranslationProgress) + Send + Sync),
        cancel: &CancellationFlag,
    ) -> Result<TranslationOutcome, TranslationError> {
        request.validate()?;
        let start_time = Instant::now();

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.settings.model.clone());
        let pieces = self.segmenter.split(&request.text);
        let mut job = TranslationJob::new(&request, model, pieces);
        let total = job.chunks.len();

        info!(
            "Job {}: {} -> {} with {} ({} chunks)",
            job.id, job.source_language, job.target_language, job.model, total
        );

        let mut warnings = Vec::new();
        let detected = self.check_input_language(&request, &mut warnings);
        let mut terminology = TerminologyManager::with_glossary(request.glossary.iter().cloned());

        job.transition(JobState::Stage1Running)?;
        if let Err(e) = self.run_primary(&mut job, &mut terminology, progress, cancel).await {
            return self.stop(job, e, TranslationStage::Primary, warnings, detected, progress, start_time);
        }

        job.transition(JobState::Stage2Running)?;
        if let Err(e) = self.run_reflection(&mut job, &mut warnings, progress, cancel).await {
            return self.stop(job, e, TranslationStage::Reflection, warnings, detected, progress, start_time);
        }

        let (final_text, report) = postprocess::post_process(
            &job.translated_text(),
            &job.source_language,
            &job.target_language,
            &self.validator,
            &self.settings.untranslated_marker,
        );
        if report.duplicates_removed > 0 {
            warnings.push(format!("Removed {} duplicate paragraphs", report.duplicates_removed));
        }
        if !report.flagged_paragraphs.is_empty() {
            warnings.push(format!(
                "{} paragraphs may be untranslated",
                report.flagged_paragraphs.len()
            ));
        }

        job.transition(JobState::Completed)?;
        let machine_translation = job.machine_translation();
        progress(TranslationProgress::completed(
            total,
            machine_translation.clone(),
            final_text.clone(),
            &warnings,
        ));

        let outcome = TranslationOutcome {
            job_id: job.id.clone(),
            state: job.state(),
            final_text: Some(final_text),
            machine_translation,
            warnings,
            flagged_paragraphs: report.flagged_paragraphs,
            duplicates_removed: report.duplicates_removed,
            detected_language: detected,
            error: None,
            total_chunks: total,
            duration: start_time.elapsed(),
        };
        info!("Job {} finished. {}", outcome.job_id, outcome.summary());
        Ok(outcome)
    }

    /// Move the job to `Failed` or `Cancelled` and build the outcome
    #[allow(clippy::too_many_arguments)]
    fn stop(
        &self,
        mut job: TranslationJob,
        cause: TranslationError,
        stage: TranslationStage,
        warnings: Vec<String>,
        detected: Option<DetectedLanguage>,
        progress: &(dyn Fn(TranslationProgress) + Send + Sync),
        start_time: Instant,
    ) -> Result<TranslationOutcome, TranslationError> {
        let next = match cause {
            TranslationError::Cancelled => JobState::Cancelled,
            _ => JobState::Failed,
        };
        job.transition(next)?;

        let message = cause.to_string();
        match next {
            JobState::Cancelled => info!("Job {} cancelled", job.id),
            _ => error!("Job {} failed: {}", job.id, message),
        }

        let total = job.chunks.len();
        let steps_done = job.chunks.iter().filter(|c| c.draft_text.is_some()).count()
            + job.chunks.iter().filter(|c| c.final_text.is_some()).count();
        let machine_translation = job.machine_translation();
        progress(TranslationProgress::stopped(
            stage,
            steps_done,
            total,
            machine_translation.clone(),
            message.clone(),
        ));

        Ok(TranslationOutcome {
            job_id: job.id.clone(),
            state: job.state(),
            final_text: None,
            machine_translation,
            warnings,
            flagged_paragraphs: Vec::new(),
            duplicates_removed: 0,
            detected_language: detected,
            error: Some(message),
            total_chunks: total,
            duration: start_time.elapsed(),
        })
    }

    /// Compare the declared source language with what the markers suggest
    fn check_input_language(
        &self,
        request: &TranslationRequest,
        warnings: &mut Vec<String>,
    ) -> Option<DetectedLanguage> {
        let detected = self.validator.detector().detect_language(&request.text, None);
        if !detected.is_known() {
            debug!("Could not detect the input language");
            return None;
        }

        if detected.confidence >= DETECTION_WARNING_CONFIDENCE
            && !language_utils::language_codes_match(&detected.code, &request.source_language)
        {
            let message = format!(
                "Input looks like '{}' (confidence {:.2}) but source language is '{}'",
                detected.code, detected.confidence, request.source_language
            );
            warn!("{}", message);
            warnings.push(message);
        }
        Some(detected)
    }

    async fn run_primary(
        &self,
        job: &mut TranslationJob,
        terminology: &mut TerminologyManager,
        progress: &(dyn Fn(TranslationProgress) + Send + Sync),
        cancel: &CancellationFlag,
    ) -> Result<(), TranslationError> {
        let total = job.chunks.len();
        let tag = TranslationStage::Primary.model_tag(&job.model);
        let mut previous_draft = String::new();

        for index in 0..total {
            if cancel.is_cancelled() {
                return Err(TranslationError::Cancelled);
            }
            if index > 0 {
                self.retry.pause(self.settings.chunk_delay).await;
            }

            let chunk_number = index + 1;
            let original = job.chunks[index].original_text.clone();
            let context_hash = self.cache.context_hash(&previous_draft);
            info!("Stage 1: chunk {}/{}", chunk_number, total);

            let cached = self
                .validated_cache_hit(&original, &job.source_language, &job.target_language, &tag, &context_hash)
                .await;

            let draft = match cached {
                Some(draft) => apply_terminology(terminology, &original, &draft),
                None => {
                    let ctx = StageContext {
                        source_language: &job.source_language,
                        target_language: &job.target_language,
                        model: &job.model,
                        genre: &job.genre,
                        cancel,
                    };
                    match self
                        .draft_chunk(&ctx, &original, &previous_draft, terminology, chunk_number, total)
                        .await
                    {
                        Ok(draft) => {
                            let draft = apply_terminology(terminology, &original, &draft);
                            self.cache
                                .set(
                                    &original,
                                    &draft,
                                    &draft,
                                    &job.source_language,
                                    &job.target_language,
                                    &tag,
                                    &context_hash,
                                )
                                .await;
                            draft
                        }
                        Err(TranslationError::Cancelled) => return Err(TranslationError::Cancelled),
                        Err(e) if !self.settings.abort_on_stage1_failure => {
                            warn!("Stage 1 gave up on chunk {}, keeping a placeholder: {}", chunk_number, e);
                            failure_sentinel(&original)
                        }
                        Err(e) => return Err(e),
                    }
                }
            };

            previous_draft = if is_failure_sentinel(&draft) {
                String::new()
            } else {
                draft.clone()
            };
            job.chunks[index].draft_text = Some(draft);

            progress(TranslationProgress::primary(
                chunk_number,
                total,
                job.machine_translation(),
            ));
        }

        Ok(())
    }

    async fn run_reflection(
        &self,
        job: &mut TranslationJob,
        warnings: &mut Vec<String>,
        progress: &(dyn Fn(TranslationProgress) + Send + Sync),
        cancel: &CancellationFlag,
    ) -> Result<(), TranslationError> {
        let total = job.chunks.len();
        let tag = TranslationStage::Reflection.model_tag(&job.model);
        let mut previous_final = String::new();

        for index in 0..total {
            if cancel.is_cancelled() {
                return Err(TranslationError::Cancelled);
            }
            if index > 0 {
                self.retry.pause(self.settings.chunk_delay).await;
            }

            let chunk_number = index + 1;
            let original = job.chunks[index].original_text.clone();
            let draft = job.chunks[index].draft_text.clone().unwrap_or_default();
            info!("Stage 2: chunk {}/{}", chunk_number, total);

            let final_text = if is_failure_sentinel(&draft) {
                let message = format!("Chunk {} has no draft; left untranslated", chunk_number);
                warn!("{}", message);
                warnings.push(message);
                draft.clone()
            } else {
                let context_hash = self.cache.context_hash(&previous_final);
                let cached = self
                    .validated_cache_hit(&original, &job.source_language, &job.target_language, &tag, &context_hash)
                    .await;

                match cached {
                    Some(final_text) => final_text,
                    None => {
                        let ctx = StageContext {
                            source_language: &job.source_language,
                            target_language: &job.target_language,
                            model: &job.model,
                            genre: &job.genre,
                            cancel,
                        };
                        match self
                            .reflect_chunk(&ctx, &original, &draft, &previous_final, chunk_number, total)
                            .await
                        {
                            Ok(final_text) => {
                                self.cache
                                    .set(
                                        &original,
                                        &final_text,
                                        &draft,
                                        &job.source_language,
                                        &job.target_language,
                                        &tag,
                                        &context_hash,
                                    )
                                    .await;
                                final_text
                            }
                            Err(TranslationError::Cancelled) => return Err(TranslationError::Cancelled),
                            Err(e) => self.fall_back_to_draft(job, &original, &draft, chunk_number, &e, warnings),
                        }
                    }
                }
            };

            previous_final = if is_failure_sentinel(&final_text) {
                String::new()
            } else {
                final_text.clone()
            };
            job.chunks[index].final_text = Some(final_text);

            progress(TranslationProgress::reflection(
                chunk_number,
                total,
                job.machine_translation(),
                job.translated_text(),
                warnings,
            ));
        }

        Ok(())
    }

    /// Stage-2 failure: keep the draft when it still validates on its own
    fn fall_back_to_draft(
        &self,
        job: &TranslationJob,
        original: &str,
        draft: &str,
        chunk_number: usize,
        cause: &TranslationError,
        warnings: &mut Vec<String>,
    ) -> String {
        if self
            .validator
            .is_likely_translated(original, draft, &job.source_language, &job.target_language)
        {
            let message = format!(
                "Chunk {}: reflection failed ({}); using the draft",
                chunk_number, cause
            );
            warn!("{}", message);
            warnings.push(message);
            draft.to_string()
        } else {
            let message = format!(
                "Chunk {}: reflection failed ({}) and the draft does not validate",
                chunk_number, cause
            );
            error!("{}", message);
            warnings.push(message);
            failure_sentinel(original)
        }
    }

    /// Cached text for a key, re-checked by the validator
    async fn validated_cache_hit(
        &self,
        original: &str,
        source_language: &str,
        target_language: &str,
        tag: &str,
        context_hash: &str,
    ) -> Option<String> {
        let cached = self
            .cache
            .get(original, source_language, target_language, tag, context_hash)
            .await?;

        if self
            .validator
            .is_likely_translated(original, &cached.final_text, source_language, target_language)
        {
            debug!("Using cached {} result for '{}'", tag, truncate_text(original, 30));
            Some(cached.final_text)
        } else {
            warn!(
                "Cached {} result for '{}' no longer validates; translating again",
                tag,
                truncate_text(original, 30)
            );
            None
        }
    }

    async fn draft_chunk(
        &self,
        ctx: &StageContext<'_>,
        original: &str,
        previous_draft: &str,
        terminology: &TerminologyManager,
        chunk_number: usize,
        total: usize,
    ) -> Result<String, TranslationError> {
        let prompt = DraftPromptBuilder::new(ctx.source_language, ctx.target_language)
            .with_terminology(&terminology.context_for_prompt(self.settings.glossary_terms))
            .with_previous_draft(previous_draft, self.settings.context_tail_chars)
            .with_genre(ctx.genre)
            .build(original);

        self.generate_validated(
            ctx,
            TranslationStage::Primary,
            prompt,
            original,
            previous_draft,
            chunk_number,
            total,
        )
        .await
    }

    async fn reflect_chunk(
        &self,
        ctx: &StageContext<'_>,
        original: &str,
        draft: &str,
        previous_final: &str,
        chunk_number: usize,
        total: usize,
    ) -> Result<String, TranslationError> {
        let prompt = ReflectionPromptBuilder::new(ctx.source_language, ctx.target_language)
            .with_previous_final(previous_final, self.settings.context_tail_chars)
            .with_genre(ctx.genre)
            .build(original, draft);

        self.generate_validated(
            ctx,
            TranslationStage::Reflection,
            prompt,
            original,
            previous_final,
            chunk_number,
            total,
        )
        .await
    }

    /// Call the model until a sanitized answer passes the validator
    #[allow(clippy::too_many_arguments)]
    async fn generate_validated(
        &self,
        ctx: &StageContext<'_>,
        stage: TranslationStage,
        prompt: String,
        original: &str,
        previous_output: &str,
        chunk_number: usize,
        total: usize,
    ) -> Result<String, TranslationError> {
        let request = GenerateRequest::new(ctx.model, prompt)
            .temperature(self.settings.temperature)
            .top_p(self.settings.top_p);
        debug!(
            "{} prompt for chunk {}/{}: {} characters",
            stage,
            chunk_number,
            total,
            request.prompt.chars().count()
        );

        let operation_name = format!("{} chunk {}/{}", stage, chunk_number, total);
        let name = operation_name.as_str();
        let result = self
            .retry
            .run_if(name, TranslationError::is_retryable, |attempt| {
                let request = &request;
                async move {
                    if ctx.cancel.is_cancelled() {
                        return Err(TranslationError::Cancelled);
                    }
                    debug!("{} attempt {}", name, attempt);

                    let raw = self.call_model(request).await?;
                    let cleaned = self.sanitizer.clean(&raw, previous_output);
                    self.validator
                        .check(original, &cleaned, ctx.source_language, ctx.target_language)
                        .map_err(|rejection| TranslationError::ValidationFailed {
                            reason: rejection.to_string(),
                        })?;
                    Ok(cleaned)
                }
            })
            .await;

        match result {
            Ok(text) => Ok(text),
            Err(RetryExhausted {
                last_error: TranslationError::Cancelled,
                ..
            }) => Err(TranslationError::Cancelled),
            Err(RetryExhausted { attempts, last_error }) => Err(TranslationError::ChunkFailed {
                stage,
                chunk: chunk_number,
                attempts,
                last_error: Box::new(last_error),
            }),
        }
    }

    async fn call_model(&self, request: &GenerateRequest) -> Result<String, TranslationError> {
        let call = self.client.generate(request);
        let response = match self.settings.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(response) => response?,
                Err(_) => return Err(ProviderError::Timeout(limit.as_secs()).into()),
            },
            None => call.await?,
        };

        if response.text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }
        Ok(response.text)
    }
}

/// Record names kept verbatim by the model and restore older renderings
fn apply_terminology(terminology: &mut TerminologyManager, original: &str, draft: &str) -> String {
    let terms = preserved_proper_nouns(original, draft);
    terminology.ensure_consistency(draft, &terms)
}
