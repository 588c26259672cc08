/*!
 * Job model: request, chunks, stages and the job state machine.
 */

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::errors::TranslationError;
use crate::language_utils;
use crate::translation::prompts::templates::DEFAULT_GENRE;

/// Lifecycle of a translation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, nothing sent to the model yet
    Pending,
    /// Producing drafts
    Stage1Running,
    /// Refining drafts
    Stage2Running,
    /// Final text available
    Completed,
    /// Aborted by an unrecoverable chunk failure
    Failed,
    /// Stopped on request
    Cancelled,
}

impl JobState {
    /// Whether the machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Stage1Running)
                | (Stage1Running, Stage2Running)
                | (Stage2Running, Completed)
                | (Stage1Running | Stage2Running, Failed | Cancelled)
        )
    }

    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }

    /// Lower-case name
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Stage1Running => "stage1_running",
            JobState::Stage2Running => "stage2_running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage reported in progress records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TranslationStage {
    /// Stage 1
    #[serde(rename = "primary_translation")]
    Primary,
    /// Stage 2
    #[serde(rename = "reflection_improvement")]
    Reflection,
    /// Post-processing done
    #[serde(rename = "completed")]
    Completed,
}

impl TranslationStage {
    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            TranslationStage::Primary => "primary_translation",
            TranslationStage::Reflection => "reflection_improvement",
            TranslationStage::Completed => "completed",
        }
    }

    /// Cache tag combining the model name and the stage
    pub fn model_tag(self, model: &str) -> String {
        match self {
            TranslationStage::Primary => format!("{}_stage1", model),
            TranslationStage::Reflection => format!("{}_stage2", model),
            TranslationStage::Completed => model.to_string(),
        }
    }
}

impl fmt::Display for TranslationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the document
    pub index: usize,
    /// Source text
    pub original_text: String,
    /// Stage-1 output
    pub draft_text: Option<String>,
    /// Stage-2 output
    pub final_text: Option<String>,
}

impl Chunk {
    /// Create an untranslated chunk
    pub fn new(index: usize, original_text: impl Into<String>) -> Self {
        Self {
            index,
            original_text: original_text.into(),
            draft_text: None,
            final_text: None,
        }
    }
}

/// What the caller wants translated
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    /// Document text
    pub text: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Model override; the configured model is used when `None`
    pub model: Option<String>,
    /// Genre hint for prompts
    pub genre: String,
    /// Seed glossary (original → translation)
    pub glossary: Vec<(String, String)>,
}

impl TranslationRequest {
    /// Create a request with the default genre and no glossary
    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            model: None,
            genre: DEFAULT_GENRE.to_string(),
            glossary: Vec::new(),
        }
    }

    /// Use a specific model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the genre hint
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    /// Seed the job glossary
    pub fn with_glossary(mut self, glossary: Vec<(String, String)>) -> Self {
        self.glossary = glossary;
        self
    }

    /// Reject requests that cannot be translated
    pub fn validate(&self) -> Result<(), TranslationError> {
        if self.text.trim().is_empty() {
            return Err(TranslationError::InvalidRequest("text is empty".to_string()));
        }
        for code in [&self.source_language, &self.target_language] {
            language_utils::validate_language_code(code)
                .map_err(|e| TranslationError::InvalidRequest(e.to_string()))?;
        }
        if self.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(TranslationError::InvalidRequest("model name is empty".to_string()));
        }
        Ok(())
    }
}

/// A document being translated
#[derive(Debug, Clone)]
pub struct TranslationJob {
    /// Unique job id
    pub id: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Model name
    pub model: String,
    /// Genre hint
    pub genre: String,
    /// Chunks in document order
    pub chunks: Vec<Chunk>,
    state: JobState,
}

impl TranslationJob {
    /// Create a pending job over pre-split chunks
    pub fn new(request: &TranslationRequest, model: impl Into<String>, pieces: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_language: request.source_language.clone(),
            target_language: request.target_language.clone(),
            model: model.into(),
            genre: request.genre.clone(),
            chunks: pieces
                .into_iter()
                .enumerate()
                .map(|(index, text)| Chunk::new(index, text))
                .collect(),
            state: JobState::Pending,
        }
    }

    /// Current state
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move to `next`, refusing transitions the machine does not allow
    pub fn transition(&mut self, next: JobState) -> Result<(), TranslationError> {
        if !self.state.can_transition_to(next) {
            return Err(TranslationError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        log::debug!("Job {}: {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Drafts produced so far, joined as a document
    pub fn machine_translation(&self) -> String {
        self.chunks
            .iter()
            .filter_map(|c| c.draft_text.as_deref())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Final texts produced so far, joined as a document
    pub fn translated_text(&self) -> String {
        self.chunks
            .iter()
            .filter_map(|c| c.final_text.as_deref())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Cooperative cancellation signal shared between a job and its caller
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the job to stop at its next checkpoint
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
