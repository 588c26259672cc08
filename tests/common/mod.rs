/*!
 * Common test utilities for the booktrans test suite
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tempfile::TempDir;

use booktrans::database::{CacheRepository, DatabaseConnection};
use booktrans::providers::GenerateRequest;
use booktrans::providers::mock::MockModelClient;
use booktrans::translation::retry::{RecordingSleeper, RetryPolicy};
use booktrans::{PipelineSettings, TranslationCache, TranslationProgress, TwoStageTranslator};

/// Model name used by test translators
pub const TEST_MODEL: &str = "test-model";

/// English paragraphs and the Spanish renderings the mock returns for them
pub const PARAGRAPHS: [(&str, &str); 3] = [
    (
        "The old man walked slowly to the house at the end of the road, and he thought about all of the years that had passed since his youth.",
        "El anciano caminó despacio hasta la casa al final del camino, y pensó en todos los años que habían pasado desde su juventud.",
    ),
    (
        "Snow covered the mountains for most of the winter, and the villagers stayed close to their fires while the wind howled outside.",
        "La nieve cubrió las montañas durante casi todo el invierno, y los aldeanos se quedaron junto al fuego mientras el viento aullaba fuera.",
    ),
    (
        "When spring finally arrived, the children ran to the river with their friends and spent the whole afternoon catching small fish.",
        "Cuando por fin llegó la primavera, los niños corrieron hacia el río con sus amigos y pasaron toda la tarde pescando peces pequeños.",
    ),
];

/// Chunk bound that puts each of [`PARAGRAPHS`] in its own chunk
pub const ONE_PARAGRAPH_PER_CHUNK: usize = 150;

/// The English paragraphs joined as a document
pub fn english_document() -> String {
    PARAGRAPHS.iter().map(|(en, _)| *en).collect::<Vec<_>>().join("\n\n")
}

/// The Spanish paragraphs joined as a document
pub fn spanish_document() -> String {
    PARAGRAPHS.iter().map(|(_, es)| *es).collect::<Vec<_>>().join("\n\n")
}

/// Whether the prompt is a stage-2 (reflection) prompt
pub fn is_reflection_prompt(request: &GenerateRequest) -> bool {
    request.prompt.contains("DRAFT TRANSLATION (")
}

fn spanish_for(prompt: &str) -> Option<&'static str> {
    PARAGRAPHS
        .iter()
        .find(|(en, _)| prompt.contains(en))
        .map(|(_, es)| *es)
}

fn english_in(prompt: &str) -> &'static str {
    PARAGRAPHS
        .iter()
        .find(|(en, _)| prompt.contains(en))
        .map(|(en, _)| *en)
        .unwrap_or("")
}

/// Translates every known paragraph in both stages
pub fn translate_paragraph(request: &GenerateRequest) -> String {
    spanish_for(&request.prompt)
        .unwrap_or("respuesta desconocida")
        .to_string()
}

/// Drafts correctly, then answers every reflection prompt with the English original
pub fn reflection_echoes_source(request: &GenerateRequest) -> String {
    if is_reflection_prompt(request) {
        english_in(&request.prompt).to_string()
    } else {
        translate_paragraph(request)
    }
}

/// Leaves the second paragraph in English in stage 1
pub fn second_paragraph_untranslated(request: &GenerateRequest) -> String {
    let (second_en, _) = PARAGRAPHS[1];
    if !is_reflection_prompt(request) && request.prompt.contains(second_en) {
        second_en.to_string()
    } else {
        translate_paragraph(request)
    }
}

/// Mock client answering with [`translate_paragraph`]
pub fn translating_client() -> MockModelClient {
    MockModelClient::working("").with_custom_response(translate_paragraph)
}

/// Pipeline settings for tests: test model, one paragraph per chunk
pub fn test_settings() -> PipelineSettings {
    PipelineSettings::default()
        .with_model(TEST_MODEL)
        .with_max_chunk_length(ONE_PARAGRAPH_PER_CHUNK)
        .with_chunk_delay(Duration::from_millis(5))
}

/// Translator over `client` whose retry policy records instead of sleeping
pub fn test_translator(
    client: MockModelClient,
    cache: TranslationCache,
    settings: PipelineSettings,
) -> (TwoStageTranslator, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let retry = RetryPolicy::new(3, Duration::from_millis(10)).with_sleeper(Arc::new(sleeper.clone()));
    let translator = TwoStageTranslator::new(Arc::new(client), cache, settings).with_retry_policy(retry);
    (translator, sleeper)
}

/// Collects progress records
#[derive(Clone, Default)]
pub struct ProgressLog {
    records: Arc<Mutex<Vec<TranslationProgress>>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink to pass to `TwoStageTranslator::translate`
    pub fn sink(&self) -> impl Fn(TranslationProgress) + Send + Sync + 'static {
        let records = Arc::clone(&self.records);
        move |record| records.lock().push(record)
    }

    pub fn records(&self) -> Vec<TranslationProgress> {
        self.records.lock().clone()
    }

    pub fn percentages(&self) -> Vec<f64> {
        self.records.lock().iter().map(|r| r.progress).collect()
    }
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    std::fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Cache backed by a SQLite file at `path`
pub fn sqlite_cache(path: &Path) -> Result<TranslationCache> {
    let repository = CacheRepository::new(DatabaseConnection::new(path)?);
    Ok(TranslationCache::new(Arc::new(repository), true))
}
