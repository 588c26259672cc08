/*!
 * Jobs spawned on their own task with a progress channel
 */

use std::sync::Arc;

use booktrans::providers::mock::MockModelClient;
use booktrans::{JobState, TranslationCache, TranslationRequest};

use crate::common::{english_document, spanish_document, test_settings, test_translator, translating_client};

#[tokio::test]
async fn test_spawn_shouldStreamMonotonicProgressThenOutcome() {
    let (translator, _) = test_translator(translating_client(), TranslationCache::in_memory(), test_settings());
    let mut handle = Arc::new(translator).spawn(TranslationRequest::new(english_document(), "en", "es"));

    let mut records = Vec::new();
    while let Some(record) = handle.progress.recv().await {
        records.push(record);
    }
    let outcome = handle.result.await.unwrap().unwrap();

    assert_eq!(outcome.state, JobState::Completed);
    assert_eq!(outcome.final_text, Some(spanish_document()));
    assert_eq!(records.len(), 3 * 2 + 1);
    assert!(records.windows(2).all(|pair| pair[0].progress <= pair[1].progress));
    assert!(records.last().unwrap().is_final());
    assert_eq!(records.last().unwrap().translated_text, Some(spanish_document()));
}

#[tokio::test]
async fn test_spawn_withCancelAfterFirstRecord_shouldEndCancelled() {
    let client = MockModelClient::slow(50).with_custom_response(crate::common::translate_paragraph);
    let (translator, _) = test_translator(client.clone(), TranslationCache::in_memory(), test_settings());
    let mut handle = Arc::new(translator).spawn(TranslationRequest::new(english_document(), "en", "es"));

    // Wait for the first chunk, then ask the job to stop
    let first = handle.progress.recv().await.unwrap();
    handle.cancel.cancel();
    assert!(first.error.is_none());

    let mut last = first;
    while let Some(record) = handle.progress.recv().await {
        last = record;
    }
    let outcome = handle.result.await.unwrap().unwrap();

    assert_eq!(outcome.state, JobState::Cancelled);
    assert!(last.error.is_some());
    assert!(client.request_count() < 6);
}
