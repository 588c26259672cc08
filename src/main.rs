// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use booktrans::app_config::{self, Config};
use booktrans::database;
use booktrans::providers::ModelClient;
use booktrans::providers::ollama::Ollama;
use booktrans::translation::retry::RetryPolicy;
use booktrans::translation::{TranslationCache, TwoStageTranslator};
use booktrans::validation::{LanguageMarkerDetector, TranslationValidator};
use booktrans::{JobState, PipelineSettings, TranslationRequest, language_utils};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Show entry counts
    Stats,
    /// Remove entries unused for longer than the configured age
    Cleanup {
        /// Maximum age in days (defaults to the configured value)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Remove every entry
    Clear,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a text file
    Translate(TranslateArgs),

    /// Detect the language of a text file
    Detect {
        /// Text file to inspect
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Inspect or maintain the translation cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,

        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: PathBuf,
    },

    /// List models available on the configured endpoint
    Models {
        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: PathBuf,
    },

    /// Generate shell completions for booktrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Text file to translate
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Output file (defaults to INPUT with the target language inserted before the extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Genre hint for the prompts (e.g., 'fantasy', 'technical')
    #[arg(long)]
    genre: Option<String>,

    /// JSON object mapping names to their fixed translations
    #[arg(long)]
    glossary: Option<PathBuf>,

    /// Skip the translation cache
    #[arg(long)]
    no_cache: bool,
}

/// booktrans - two-stage book translation with a local LLM
#[derive(Parser, Debug)]
#[command(name = "booktrans")]
#[command(version)]
#[command(about = "Translate books with a local LLM in two stages")]
#[command(long_about = "booktrans splits a document into chunks, drafts a translation of each chunk and then
asks the model to improve its own draft against the original.

EXAMPLES:
    booktrans translate novel.txt -s en -t es        # Translate from English to Spanish
    booktrans translate novel.txt --glossary names.json
    booktrans detect chapter1.txt                    # Guess the language of a file
    booktrans cache stats                            # Show cache statistics
    booktrans completions bash > booktrans.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // The logger itself lets everything through; filtering happens via set_max_level
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag and ANSI color for level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "\x1B[1;31m"),
            Level::Warn => ("WARN ", "\x1B[1;33m"),
            Level::Info => ("INFO ", "\x1B[1;32m"),
            Level::Debug => ("DEBUG", "\x1B[1;36m"),
            Level::Trace => ("TRACE", "\x1B[1;35m"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (tag, color) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "booktrans", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
        Commands::Detect { input } => run_detect(&input),
        Commands::Cache { action, config_path } => run_cache(action, &config_path).await,
        Commands::Models { config_path } => run_models(&config_path).await,
    }
}

fn load_config(path: &Path, log_level: Option<&CliLogLevel>) -> Result<Config> {
    let mut config = Config::load_or_create(path)?;
    if let Some(level) = log_level {
        config.log_level = level.clone().into();
    }
    log::set_max_level(config.log_level.to_level_filter());
    Ok(config)
}

fn ollama_client(config: &Config) -> Ollama {
    Ollama::new(
        &config.model.endpoint,
        config.model.connect_timeout_secs,
        config.model.read_timeout_secs,
    )
    .with_health_timeout(Duration::from_secs(config.model.health_timeout_secs))
}

fn default_output_path(input: &Path, target_language: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "translation".to_string());
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "txt".to_string());
    input.with_file_name(format!("{}.{}.{}", stem, target_language, extension))
}

fn load_glossary(path: &Path) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read glossary file: {}", path.display()))?;
    let terms: BTreeMap<String, String> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse glossary file: {}", path.display()))?;
    Ok(terms.into_iter().collect())
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let mut config = load_config(&options.config_path, options.log_level.as_ref())?;

    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(model) = &options.model {
        config.model.model = model.clone();
    }
    if options.no_cache {
        config.cache.enabled = false;
    }

    config.validate().context("Configuration validation failed")?;

    let text = std::fs::read_to_string(&options.input)
        .with_context(|| format!("Failed to read input file: {}", options.input.display()))?;

    let client = ollama_client(&config);
    if !client.is_healthy().await {
        return Err(anyhow!(
            "Model server at {} is not reachable",
            config.model.endpoint
        ));
    }

    let cache = if config.cache.enabled {
        database::open_cache(&config.cache)?
    } else {
        TranslationCache::disabled()
    };

    let retry = RetryPolicy::new(
        config.translation.max_retries,
        Duration::from_millis(config.translation.retry_delay_ms),
    );
    let translator = Arc::new(
        TwoStageTranslator::new(Arc::new(client), cache, PipelineSettings::from_config(&config))
            .with_validator(TranslationValidator::new(config.validation.clone()))
            .with_retry_policy(retry),
    );

    let mut request = TranslationRequest::new(text, &config.source_language, &config.target_language)
        .with_model(&config.model.model);
    if let Some(genre) = &options.genre {
        request = request.with_genre(genre);
    }
    if let Some(glossary_path) = &options.glossary {
        request = request.with_glossary(load_glossary(glossary_path)?);
    }

    info!(
        "Translating {} from {} to {}",
        options.input.display(),
        language_utils::display_name(&config.source_language),
        language_utils::display_name(&config.target_language)
    );

    let mut handle = translator.spawn(request);

    let cancel = handle.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current chunk");
            cancel.cancel();
        }
    });

    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} steps ({percent}%) {msg}")?
            .progress_chars("█▓▒░"),
    );

    while let Some(record) = handle.progress.recv().await {
        progress_bar.set_length(record.total_chunks as u64);
        progress_bar.set_position(record.current_chunk as u64);
        progress_bar.set_message(record.stage.to_string());
    }

    let outcome = handle
        .result
        .await
        .context("Translation task panicked")??;

    match outcome.state {
        JobState::Completed => progress_bar.finish_with_message("done"),
        _ => progress_bar.abandon_with_message(outcome.state.to_string()),
    }

    for warning in &outcome.warnings {
        warn!("{}", warning);
    }

    let Some(final_text) = outcome.final_text.as_deref() else {
        let message = outcome.error.clone().unwrap_or_else(|| outcome.state.to_string());
        error!("Translation did not complete: {}", message);
        return Err(anyhow!("Translation {}: {}", outcome.state, message));
    };

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&options.input, &config.target_language));
    std::fs::write(&output, final_text)
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;

    info!("Success: {} ({})", output.display(), outcome.summary());
    Ok(())
}

fn run_detect(input: &Path) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;

    let detected = LanguageMarkerDetector::new().detect_language(&text, None);
    if detected.is_known() {
        println!(
            "{} ({}) confidence {:.2}",
            detected.code,
            language_utils::display_name(&detected.code),
            detected.confidence
        );
    } else {
        println!("unknown");
    }
    Ok(())
}

async fn run_cache(action: CacheCommand, config_path: &Path) -> Result<()> {
    let config = load_config(config_path, None)?;
    let mut cache_config = config.cache.clone();
    cache_config.enabled = true;
    let cache = database::open_cache(&cache_config)?;

    match action {
        CacheCommand::Stats => {
            let stats = cache.stats().await?;
            println!("Entries: {}", stats.store.total_entries);
            println!("Used in the last 24h: {}", stats.store.entries_last_24h);
        }
        CacheCommand::Cleanup { days } => {
            let days = days.unwrap_or(config.cache.max_age_days);
            let removed = cache.cleanup(days).await?;
            println!("Removed {} entries older than {} days", removed, days);
        }
        CacheCommand::Clear => {
            let removed = cache.clear().await?;
            println!("Removed {} entries", removed);
        }
    }
    Ok(())
}

async fn run_models(config_path: &Path) -> Result<()> {
    let config = load_config(config_path, None)?;
    let client = ollama_client(&config);

    let version = client.version().await?;
    info!("Ollama {} at {}", version, client.base_url());

    for model in client.list_models().await? {
        let marker = if model.name == config.model.model { "*" } else { " " };
        println!("{} {}", marker, model.name);
    }
    Ok(())
}
