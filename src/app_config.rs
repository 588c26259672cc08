use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::validation::ValidationConfig;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Model endpoint and sampling settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Translation pipeline settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Reply acceptance rules
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Translation cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Ollama service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    /// Service endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name (e.g., "llama3.3:70b-instruct-q2_K")
    #[serde(default = "default_model")]
    pub model: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds; generation on large models is slow
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Timeout of the health probe in seconds
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            health_timeout_secs: default_health_timeout_secs(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// Translation pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Upper bound of a chunk in characters
    #[serde(default = "default_max_chunk_length")]
    pub max_chunk_length: usize,

    /// Attempts per chunk and stage
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base retry delay in milliseconds, multiplied by the attempt number
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause between consecutive chunks in milliseconds
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// Characters of the previous chunk's output included in prompts
    #[serde(default = "default_context_tail_chars")]
    pub context_tail_chars: usize,

    /// Glossary entries included in stage-1 prompts
    #[serde(default = "default_glossary_terms")]
    pub glossary_terms: usize,

    /// Fail the whole job when a stage-1 chunk cannot be translated.
    /// When false, a placeholder is kept and the job goes on.
    #[serde(default = "default_true")]
    pub abort_on_stage1_failure: bool,

    /// Prefix added to paragraphs that still read as the source language
    #[serde(default = "default_untranslated_marker")]
    pub untranslated_marker: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: default_max_chunk_length(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            chunk_delay_ms: default_chunk_delay_ms(),
            context_tail_chars: default_context_tail_chars(),
            glossary_terms: default_glossary_terms(),
            abort_on_stage1_failure: true,
            untranslated_marker: default_untranslated_marker(),
        }
    }
}

/// Translation cache configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Whether translations are cached
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Hex characters kept from the previous-output hash in cache keys
    #[serde(default = "default_context_hash_length")]
    pub context_hash_length: usize,

    /// Entries unused for longer than this are removed by `cache cleanup`
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// Database file; the user data directory is used when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            context_hash_length: default_context_hash_length(),
            max_age_days: default_max_age_days(),
            path: None,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Smallest accepted chunk bound
pub const MIN_CHUNK_LENGTH: usize = 100;

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.3:70b-instruct-q2_K".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_read_timeout_secs() -> u64 {
    300
}

fn default_health_timeout_secs() -> u64 {
    5
}

fn default_temperature() -> f32 {
    0.3
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_chunk_length() -> usize {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000 // multiplied by the attempt number
}

fn default_chunk_delay_ms() -> u64 {
    300
}

fn default_context_tail_chars() -> usize {
    300
}

fn default_glossary_terms() -> usize {
    crate::translation::terminology::DEFAULT_PROMPT_TERMS
}

fn default_untranslated_marker() -> String {
    "[POSSIBLY UNTRANSLATED] ".to_string()
}

fn default_context_hash_length() -> usize {
    32
}

fn default_max_age_days() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load the configuration at `path`, writing a default one first if the file is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let _source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        if self.model.model.trim().is_empty() {
            return Err(anyhow!("Model name must not be empty"));
        }

        if self.translation.max_chunk_length < MIN_CHUNK_LENGTH {
            return Err(anyhow!(
                "max_chunk_length must be at least {} (got {})",
                MIN_CHUNK_LENGTH,
                self.translation.max_chunk_length
            ));
        }

        if self.translation.max_retries == 0 {
            return Err(anyhow!("max_retries must be at least 1"));
        }

        let threshold = self.validation.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "similarity_threshold must be between 0 and 1 (got {})",
                threshold
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "es".to_string(),
            model: ModelConfig::default(),
            translation: TranslationConfig::default(),
            validation: ValidationConfig::default(),
            cache: CacheConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
