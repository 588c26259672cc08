/*!
 * Tests for configuration loading and pipeline settings
 */

use std::time::Duration;

use booktrans::app_config::{Config, LogLevel};
use booktrans::PipelineSettings;
use booktrans::translation::terminology::DEFAULT_PROMPT_TERMS;
use log::LevelFilter;

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_loadOrCreate_withExistingFile_shouldReadValues() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        dir.path(),
        "conf.json",
        r#"{
            "source_language": "de",
            "target_language": "en",
            "model": { "model": "mistral", "temperature": 0.1 },
            "translation": { "max_chunk_length": 2000, "abort_on_stage1_failure": false },
            "cache": { "enabled": false },
            "log_level": "debug"
        }"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();

    assert_eq!(config.source_language, "de");
    assert_eq!(config.model.model, "mistral");
    assert_eq!(config.model.top_p, 0.9);
    assert_eq!(config.translation.max_chunk_length, 2000);
    assert!(!config.translation.abort_on_stage1_failure);
    assert!(!config.cache.enabled);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_level.to_level_filter(), LevelFilter::Debug);
    assert!(config.validate().is_ok());
}

#[test]
fn test_loadOrCreate_withMalformedJson_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "conf.json", "{ not json").unwrap();

    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_validate_withUnknownLanguage_shouldFail() {
    let config = Config {
        target_language: "zz9".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_pipelineSettings_fromConfig_shouldCopyTranslationKnobs() {
    let mut config = Config::default();
    config.model.model = "qwen2.5:14b".to_string();
    config.translation.chunk_delay_ms = 0;
    config.translation.context_tail_chars = 120;
    config.translation.max_chunk_length = 1500;

    let settings = PipelineSettings::from_config(&config);

    assert_eq!(settings.model, "qwen2.5:14b");
    assert_eq!(settings.chunk_delay, Duration::ZERO);
    assert_eq!(settings.context_tail_chars, 120);
    assert_eq!(settings.max_chunk_length, 1500);
    assert!(settings.abort_on_stage1_failure);
    assert_eq!(settings.untranslated_marker, "[POSSIBLY UNTRANSLATED] ");
}

#[test]
fn test_defaults_shouldShareGlossaryAndContextSizes() {
    let config = Config::default();
    let settings = PipelineSettings::default();

    assert_eq!(config.translation.glossary_terms, DEFAULT_PROMPT_TERMS);
    assert_eq!(settings.glossary_terms, DEFAULT_PROMPT_TERMS);
    assert_eq!(config.translation.context_tail_chars, 300);
    assert_eq!(settings.context_tail_chars, 300);
}
