use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Docsight server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the Ollama runtime serving inference requests.
    pub ollama_url: Option<String>,
    /// Model identifier used for chunk and final summarization.
    pub summarizer_model: String,
    /// Optional model override for zero-shot classification (defaults to the summarizer model).
    pub classifier_model: Option<String>,
    /// Optional model override for entity extraction (defaults to the summarizer model).
    pub extractor_model: Option<String>,
    /// Optional override for the sentences-per-chunk bound.
    pub chunk_max_sentences: Option<usize>,
    /// Optional width of the concurrent summarization window during the map phase.
    pub map_concurrency: Option<usize>,
    /// Optional word budget requested from the summarizer.
    pub summary_max_words: Option<usize>,
    /// Optional override for the candidate category label set.
    pub category_labels: Option<Vec<String>>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            ollama_url: load_env_optional("OLLAMA_URL"),
            summarizer_model: load_env("SUMMARIZER_MODEL")?,
            classifier_model: load_env_optional("CLASSIFIER_MODEL"),
            extractor_model: load_env_optional("EXTRACTOR_MODEL"),
            chunk_max_sentences: parse_optional_nonzero("CHUNK_MAX_SENTENCES")?,
            map_concurrency: parse_optional_nonzero("MAP_CONCURRENCY")?,
            summary_max_words: parse_optional_nonzero("SUMMARY_MAX_WORDS")?,
            category_labels: load_env_optional("CATEGORY_LABELS").map(|value| {
                value
                    .split(',')
                    .map(|label| label.trim().to_string())
                    .filter(|label| !label.is_empty())
                    .collect()
            }),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an optional positive integer variable; zero is rejected rather than clamped.
fn parse_optional_nonzero(key: &str) -> Result<Option<usize>, ConfigError> {
    load_env_optional(key)
        .map(|value| match value.parse::<usize>() {
            Ok(parsed) if parsed >= 1 => Ok(parsed),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        ollama_url = ?config.ollama_url,
        summarizer_model = %config.summarizer_model,
        chunk_max_sentences = ?config.chunk_max_sentences,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
