/*!
 * End-to-end tests of the two-stage translation pipeline against mock models
 */

use std::time::Duration;

use booktrans::providers::mock::MockModelClient;
use booktrans::translation::TranslationStage;
use booktrans::translation::cache::{FAILURE_SENTINEL_PREFIX, is_failure_sentinel};
use booktrans::{CancellationFlag, JobState, PipelineSettings, TranslationCache, TranslationRequest};

use crate::common::{
    PARAGRAPHS, ProgressLog, TEST_MODEL, english_document, reflection_echoes_source,
    second_paragraph_untranslated, spanish_document, test_settings, test_translator,
    translating_client,
};

#[tokio::test]
async fn test_translate_withTwoShortParagraphs_shouldReachHalfThenFull() {
    let client = MockModelClient::working("Párrafo uno.\n\nPárrafo dos.");
    let (translator, _) = test_translator(
        client.clone(),
        TranslationCache::in_memory(),
        PipelineSettings::default().with_model(TEST_MODEL),
    );
    let log = ProgressLog::new();

    let outcome = translator
        .translate(
            TranslationRequest::new("Paragraph one.\n\nParagraph two.", "en", "es"),
            &log.sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, JobState::Completed);
    assert_eq!(outcome.final_text.as_deref(), Some("Párrafo uno.\n\nPárrafo dos."));
    assert_eq!(outcome.duplicates_removed, 0);
    assert!(outcome.warnings.iter().all(|w| !w.contains("duplicate")));
    assert_eq!(log.percentages(), vec![50.0, 100.0, 100.0]);

    let records = log.records();
    assert_eq!(records[0].stage, TranslationStage::Primary);
    assert_eq!(records[1].stage, TranslationStage::Reflection);
    assert!(records[2].is_final());
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn test_translate_withThreeChunks_shouldTranslateEachInOrder() {
    let client = translating_client();
    let (translator, sleeper) = test_translator(client.clone(), TranslationCache::in_memory(), test_settings());
    let log = ProgressLog::new();

    let outcome = translator
        .translate(
            TranslationRequest::new(english_document(), "en", "es"),
            &log.sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, JobState::Completed);
    assert_eq!(outcome.total_chunks, 3);
    assert_eq!(outcome.final_text, Some(spanish_document()));
    assert_eq!(outcome.machine_translation, spanish_document());
    assert!(outcome.warnings.is_empty(), "unexpected warnings: {:?}", outcome.warnings);
    assert_eq!(client.request_count(), 6);

    let percentages: Vec<u32> = log.percentages().iter().map(|p| p.round() as u32).collect();
    assert_eq!(percentages, vec![17, 33, 50, 67, 83, 100, 100]);

    // Chunk pauses only, two per stage
    assert_eq!(sleeper.recorded(), vec![Duration::from_millis(5); 4]);
}

#[tokio::test]
async fn test_translate_withSecondChunk_shouldCarryPreviousDraftAsContext() {
    let client = translating_client();
    let (translator, _) = test_translator(client.clone(), TranslationCache::in_memory(), test_settings());

    translator
        .translate(
            TranslationRequest::new(english_document(), "en", "es"),
            &ProgressLog::new().sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    let prompts = client.prompts();
    let (_, first_es) = PARAGRAPHS[0];
    let tail: String = first_es.chars().rev().take(40).collect::<Vec<_>>().into_iter().rev().collect();

    assert!(!prompts[0].contains("CONTEXT"));
    assert!(prompts[1].contains(&tail), "second stage-1 prompt lacks the previous draft");
    assert!(prompts[3].contains("DRAFT TRANSLATION ("));
}

#[tokio::test]
async fn test_translate_withSecondChunk_shouldCarryPreviousFinalIntoReflection() {
    let client = translating_client();
    let (translator, _) = test_translator(client.clone(), TranslationCache::in_memory(), test_settings());

    translator
        .translate(
            TranslationRequest::new(english_document(), "en", "es"),
            &ProgressLog::new().sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 6);
    let (_, first_es) = PARAGRAPHS[0];
    let (_, second_es) = PARAGRAPHS[1];
    let tail_of = |text: &str| -> String {
        let chars: Vec<char> = text.chars().collect();
        chars[chars.len() - 40..].iter().collect()
    };

    assert!(!prompts[3].contains("STYLE CONTEXT"));
    assert!(prompts[4].contains("STYLE CONTEXT"));
    assert!(prompts[4].contains(&tail_of(first_es)), "chunk 2 reflection lacks chunk 1 final text");
    assert!(prompts[5].contains(&tail_of(second_es)), "chunk 3 reflection lacks chunk 2 final text");
}

#[tokio::test]
async fn test_translate_withFailingModel_shouldFailAfterRetries() {
    let client = MockModelClient::failing();
    let (translator, sleeper) = test_translator(client.clone(), TranslationCache::in_memory(), test_settings());
    let log = ProgressLog::new();

    let outcome = translator
        .translate(
            TranslationRequest::new(english_document(), "en", "es"),
            &log.sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, JobState::Failed);
    assert!(outcome.final_text.is_none());
    let error = outcome.error.unwrap();
    assert!(error.contains("chunk 1 after 3 attempts"), "unexpected error: {}", error);
    assert_eq!(client.request_count(), 3);
    assert_eq!(
        sleeper.recorded(),
        vec![Duration::from_millis(10), Duration::from_millis(20)]
    );

    let last = log.records().pop().unwrap();
    assert_eq!(last.stage, TranslationStage::Primary);
    assert_eq!(last.progress, 0.0);
    assert!(last.error.is_some());
}

#[tokio::test]
async fn test_translate_withEmptyReplies_shouldFail() {
    let (translator, _) = test_translator(MockModelClient::empty(), TranslationCache::in_memory(), test_settings());

    let outcome = translator
        .translate(
            TranslationRequest::new("Hello there.", "en", "es"),
            &ProgressLog::new().sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, JobState::Failed);
    assert!(outcome.error.unwrap().contains("empty"));
}

#[tokio::test]
async fn test_translate_withIntermittentModel_shouldRecover() {
    let client = MockModelClient::intermittent(2).with_custom_response(crate::common::translate_paragraph);
    let (translator, sleeper) = test_translator(client.clone(), TranslationCache::in_memory(), test_settings());

    let outcome = translator
        .translate(
            TranslationRequest::new(english_document(), "en", "es"),
            &ProgressLog::new().sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, JobState::Completed);
    assert_eq!(outcome.final_text, Some(spanish_document()));
    assert!(client.request_count() > 6);
    assert!(sleeper.recorded().contains(&Duration::from_millis(10)));
}

#[tokio::test]
async fn test_translate_withRejectedReflection_shouldFallBackToDraft() {
    let client = MockModelClient::working("").with_custom_response(reflection_echoes_source);
    let (translator, _) = test_translator(client.clone(), TranslationCache::in_memory(), test_settings());

    let outcome = translator
        .translate(
            TranslationRequest::new(english_document(), "en", "es"),
            &ProgressLog::new().sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, JobState::Completed);
    assert_eq!(outcome.final_text, Some(spanish_document()));
    assert_eq!(
        outcome.warnings.iter().filter(|w| w.contains("using the draft")).count(),
        3
    );
    // Three drafts, then three attempts per reflection
    assert_eq!(client.request_count(), 3 + 3 * 3);
}

#[tokio::test]
async fn test_translate_withStrictStage1_shouldFailOnUntranslatedChunk() {
    let client = MockModelClient::working("").with_custom_response(second_paragraph_untranslated);
    let (translator, _) = test_translator(client, TranslationCache::in_memory(), test_settings());
    let log = ProgressLog::new();

    let outcome = translator
        .translate(
            TranslationRequest::new(english_document(), "en", "es"),
            &log.sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, JobState::Failed);
    assert!(outcome.error.unwrap().contains("chunk 2"));
    assert_eq!(outcome.machine_translation, PARAGRAPHS[0].1);

    // The first chunk's progress stays visible
    let records = log.records();
    assert!(records.iter().any(|r| r.progress > 0.0 && r.error.is_none()));
}

#[tokio::test]
async fn test_translate_withLenientStage1_shouldKeepPlaceholder() {
    let client = MockModelClient::working("").with_custom_response(second_paragraph_untranslated);
    let settings = test_settings().with_abort_on_stage1_failure(false);
    let (translator, _) = test_translator(client, TranslationCache::in_memory(), settings);

    let outcome = translator
        .translate(
            TranslationRequest::new(english_document(), "en", "es"),
            &ProgressLog::new().sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, JobState::Completed);
    let final_text = outcome.final_text.unwrap();
    let paragraphs: Vec<&str> = final_text.split("\n\n").collect();

    assert_eq!(paragraphs.len(), 3);
    assert_eq!(paragraphs[0], PARAGRAPHS[0].1);
    assert!(paragraphs[1].starts_with(FAILURE_SENTINEL_PREFIX));
    assert!(is_failure_sentinel(paragraphs[1]));
    assert_eq!(paragraphs[2], PARAGRAPHS[2].1);
    assert!(outcome.warnings.iter().any(|w| w.contains("Chunk 2")));
}

#[tokio::test]
async fn test_translate_withCancelAfterFirstChunk_shouldStopAsCancelled() {
    let client = translating_client();
    let (translator, _) = test_translator(client.clone(), TranslationCache::in_memory(), test_settings());
    let cancel = CancellationFlag::new();
    let log = ProgressLog::new();

    let record = log.sink();
    let trigger = cancel.clone();
    let sink = move |progress| {
        record(progress);
        trigger.cancel();
    };

    let outcome = translator
        .translate(TranslationRequest::new(english_document(), "en", "es"), &sink, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome.state, JobState::Cancelled);
    assert!(outcome.final_text.is_none());
    assert_eq!(client.request_count(), 1);
    assert_eq!(outcome.machine_translation, PARAGRAPHS[0].1);

    let records = log.records();
    assert_eq!(records.len(), 2);
    assert!(records[1].error.as_deref().unwrap_or_default().contains("cancelled"));
}

#[tokio::test]
async fn test_translate_withSharedCache_shouldNotCallModelTwice() {
    let cache = TranslationCache::in_memory();
    let first_client = translating_client();
    let (first, _) = test_translator(first_client.clone(), cache.clone(), test_settings());
    let request = TranslationRequest::new(english_document(), "en", "es");

    let first_outcome = first
        .translate(request.clone(), &ProgressLog::new().sink(), &CancellationFlag::new())
        .await
        .unwrap();

    let second_client = translating_client();
    let (second, _) = test_translator(second_client.clone(), cache.clone(), test_settings());
    let second_outcome = second
        .translate(request, &ProgressLog::new().sink(), &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(first_client.request_count(), 6);
    assert_eq!(second_client.request_count(), 0);
    assert_eq!(first_outcome.final_text, second_outcome.final_text);

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.hits, 6);
    assert_eq!(stats.store.total_entries, 6);
}

#[tokio::test]
async fn test_translate_withInvalidCachedDraft_shouldTranslateAgain() {
    let cache = TranslationCache::in_memory();
    let (english, spanish) = PARAGRAPHS[0];
    let tag = TranslationStage::Primary.model_tag(TEST_MODEL);
    // An "entry" that is just the source text
    assert!(cache.set(english, english, english, "en", "es", &tag, "").await);

    let client = translating_client();
    let (translator, _) = test_translator(client.clone(), cache, test_settings());

    let outcome = translator
        .translate(
            TranslationRequest::new(english, "en", "es"),
            &ProgressLog::new().sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.final_text.as_deref(), Some(spanish));
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn test_translate_withDisabledCache_shouldAlwaysCallModel() {
    let client = translating_client();
    let (translator, _) = test_translator(client.clone(), TranslationCache::disabled(), test_settings());
    let request = TranslationRequest::new(PARAGRAPHS[0].0, "en", "es");

    for _ in 0..2 {
        translator
            .translate(request.clone(), &ProgressLog::new().sink(), &CancellationFlag::new())
            .await
            .unwrap();
    }

    assert_eq!(client.request_count(), 4);
}

#[tokio::test]
async fn test_translate_withGlossary_shouldEmbedTermsInDraftPrompt() {
    let client = translating_client();
    let (translator, _) = test_translator(client.clone(), TranslationCache::in_memory(), test_settings());
    let request = TranslationRequest::new(PARAGRAPHS[0].0, "en", "es")
        .with_glossary(vec![("Gandalf".to_string(), "Gandalf el Gris".to_string())])
        .with_genre("fantasy");

    translator
        .translate(request, &ProgressLog::new().sink(), &CancellationFlag::new())
        .await
        .unwrap();

    let prompts = client.prompts();
    assert!(prompts[0].contains("Gandalf el Gris"));
    assert!(prompts[0].contains("fantasy"));
}

#[tokio::test]
async fn test_translate_withMislabelledSource_shouldWarn() {
    let client = translating_client();
    let (translator, _) = test_translator(client, TranslationCache::in_memory(), test_settings());

    let outcome = translator
        .translate(
            TranslationRequest::new(spanish_document(), "fr", "de"),
            &ProgressLog::new().sink(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    let detected = outcome.detected_language.unwrap();
    assert_eq!(detected.code, "es");
    assert!(outcome.warnings.iter().any(|w| w.contains("looks like 'es'")));
}

#[tokio::test]
async fn test_translate_withInvalidLanguage_shouldRejectRequest() {
    let client = translating_client();
    let (translator, _) = test_translator(client.clone(), TranslationCache::in_memory(), test_settings());

    let result = translator
        .translate(
            TranslationRequest::new("Hello.", "en", "not-a-language"),
            &ProgressLog::new().sink(),
            &CancellationFlag::new(),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(client.request_count(), 0);
}
