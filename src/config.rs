use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::processing::{
    normalize::HeaderStripper,
    pipeline::{DEFAULT_HEADER_PATTERNS, PipelineConfig},
    types::PipelineError,
};
use crate::qdrant::SearchParams;

const DEFAULT_PDFS_DIR: &str = "data/pdfs";
const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";
const DEFAULT_COLLECTION: &str = "medical_guides";
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_LLM_TEMPERATURE: f32 = 0.2;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Chunk size and overlap are inconsistent.
    #[error("Invalid chunking parameters: {0}")]
    InvalidChunking(String),
    /// A header pattern does not compile.
    #[error("Invalid header pattern '{pattern}': {source}")]
    InvalidHeaderPattern {
        /// Offending pattern.
        pattern: String,
        /// Regex compilation error.
        #[source]
        source: regex::Error,
    },
}

/// Runtime configuration for the Rusty RAG service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned for PDF files.
    pub pdfs_dir: PathBuf,
    /// Normalization, coalescing, and chunking settings.
    pub pipeline: PipelineConfig,
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for document storage.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Provider used to generate answers.
    pub llm_provider: LlmProvider,
    /// Model name passed to the language model provider.
    pub llm_model_name: String,
    /// Gemini API key.
    pub llm_api_key: Option<String>,
    /// Override for the Gemini API base URL.
    pub llm_api_base: Option<String>,
    /// Sampling temperature for answers.
    pub llm_temperature: f32,
    /// Retrieval parameters for every question.
    pub retrieval: SearchParams,
    /// Number of conversation turns retained; unbounded when absent.
    pub memory_window: Option<usize>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic offline hashing embedder.
    Hashing,
}

/// Supported language model backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    /// Google Gemini.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let pipeline = PipelineConfig {
            min_page_characters: vars.parse_or("MIN_PAGE_CHARACTERS", 400)?,
            header_patterns: vars.header_patterns()?,
            chunk_size: vars.parse_or("CHUNK_SIZE", 900)?,
            chunk_overlap: vars.parse_or("CHUNK_OVERLAP", 150)?,
        };
        validate_pipeline(&pipeline)?;

        let retrieval = SearchParams {
            k: vars.parse_or("RETRIEVAL_K", 12)?,
            fetch_k: vars.parse_or("RETRIEVAL_FETCH_K", 20)?,
            lambda_mult: vars.parse_or("RETRIEVAL_LAMBDA_MULT", 0.5)?,
            use_mmr: match vars.optional("RETRIEVAL_SEARCH_TYPE") {
                None => true,
                Some(value) => match value.to_lowercase().as_str() {
                    "mmr" => true,
                    "similarity" => false,
                    _ => return Err(ConfigError::InvalidValue("RETRIEVAL_SEARCH_TYPE".into())),
                },
            },
        };
        if retrieval.k == 0 || retrieval.fetch_k < retrieval.k {
            return Err(ConfigError::InvalidValue(
                "RETRIEVAL_FETCH_K must be at least RETRIEVAL_K, which must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&retrieval.lambda_mult) {
            return Err(ConfigError::InvalidValue("RETRIEVAL_LAMBDA_MULT".into()));
        }

        let embedding_dimension = vars.parse_or("EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?;
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }

        Ok(Self {
            pdfs_dir: PathBuf::from(vars.string_or("PDFS_DIR", DEFAULT_PDFS_DIR)),
            pipeline,
            qdrant_url: vars.string_or("QDRANT_URL", DEFAULT_QDRANT_URL),
            qdrant_collection_name: vars.string_or("QDRANT_COLLECTION_NAME", DEFAULT_COLLECTION),
            qdrant_api_key: vars.optional("QDRANT_API_KEY"),
            embedding_provider: match vars.optional("EMBEDDING_PROVIDER") {
                None => EmbeddingProvider::Ollama,
                Some(value) => value.parse().map_err(|()| {
                    ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string())
                })?,
            },
            embedding_model: vars.string_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_dimension,
            ollama_url: vars.string_or("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            llm_provider: match vars.optional("LLM_PROVIDER") {
                None => LlmProvider::Gemini,
                Some(value) => value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("LLM_PROVIDER".to_string()))?,
            },
            llm_model_name: vars.string_or("LLM_MODEL_NAME", DEFAULT_LLM_MODEL),
            llm_api_key: vars.optional("LLM_API_KEY"),
            llm_api_base: vars.optional("LLM_API_BASE"),
            llm_temperature: vars.parse_or("LLM_TEMPERATURE", DEFAULT_LLM_TEMPERATURE)?,
            retrieval,
            memory_window: vars
                .optional("MEMORY_WINDOW")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("MEMORY_WINDOW".into()))
                })
                .transpose()?,
            server_port: vars
                .optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

/// Load `.env` if present and build the configuration from the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        pdfs_dir = %config.pdfs_dir.display(),
        chunk_size = config.pipeline.chunk_size,
        chunk_overlap = config.pipeline.chunk_overlap,
        embedding_provider = ?config.embedding_provider,
        llm_provider = ?config.llm_provider,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if pipeline.chunk_size == 0 {
        return Err(ConfigError::InvalidChunking(
            "CHUNK_SIZE must be greater than zero".into(),
        ));
    }
    if pipeline.chunk_overlap >= pipeline.chunk_size {
        return Err(ConfigError::InvalidChunking(format!(
            "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
            pipeline.chunk_overlap, pipeline.chunk_size
        )));
    }
    HeaderStripper::new(&pipeline.header_patterns).map_err(|error| match error {
        PipelineError::InvalidHeaderPattern { pattern, source } => {
            ConfigError::InvalidHeaderPattern { pattern, source }
        }
        other => ConfigError::InvalidChunking(other.to_string()),
    })?;
    Ok(())
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string())),
            None => Ok(default),
        }
    }

    fn header_patterns(&self) -> Result<Vec<String>, ConfigError> {
        match self.optional("HEADER_PATTERNS") {
            Some(value) => serde_json::from_str(&value)
                .map_err(|_| ConfigError::InvalidValue("HEADER_PATTERNS".into())),
            None => Ok(DEFAULT_HEADER_PATTERNS
                .iter()
                .map(|pattern| pattern.to_string())
                .collect()),
        }
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hashing" => Ok(Self::Hashing),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}
