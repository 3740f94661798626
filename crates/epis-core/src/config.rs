//! EPIS Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for a local pilot deployment.

use crate::messages::Locale;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Ticket database and vector store connections
    pub database: DatabaseConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// RAG pipeline configuration
    pub rag: RagConfig,

    /// Intent keyword rules
    pub router: RouterConfig,

    /// Response language
    pub locale: Locale,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError { path, message },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<impl Into<PathBuf>>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path)?.with_env_override(),
            None => Self::from_env(),
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }

        // CORS origins from environment variable (comma-separated)
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // SQLite
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.sqlite_url = url;
        }

        // Qdrant
        if let Ok(url) = std::env::var("QDRANT_URL") {
            self.database.qdrant_url = url;
        }
        if let Ok(collection) = std::env::var("QDRANT_COLLECTION") {
            self.database.qdrant_collection = collection;
        }

        // LLM
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            self.llm.ollama_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            self.llm.embedding_model = model;
        }

        if let Ok(locale) = std::env::var("EPIS_LOCALE") {
            self.locale = locale.parse()?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            self.logging.json_format = parse_bool("LOG_JSON", &json)?;
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Allowed origins for CORS ("*" allows any origin)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 300,
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite URL of the ticket database
    pub sqlite_url: String,

    /// SQLite connection pool size
    pub sqlite_pool_size: u32,

    /// Qdrant gRPC URL
    pub qdrant_url: String,

    /// Qdrant collection holding the document fragments
    pub qdrant_collection: String,

    /// Vector dimension (must match embedding model)
    pub vector_dimension: usize,

    /// Payload field with the fragment text
    pub content_field: String,

    /// Payload field with the source document name
    pub source_field: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_url: "sqlite://tickets.db".to_string(),
            sqlite_pool_size: 4,
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_collection: "epis_documents".to_string(),
            vector_dimension: 1024, // multilingual-e5-large
            content_field: "content".to_string(),
            source_field: "source".to_string(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for Azure or compatible APIs)
    pub openai_base_url: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model name to use
    pub model: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Text prepended to queries before embedding; unset picks a model default,
    /// an empty string disables it
    pub embedding_query_prefix: Option<String>,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            openai_api_key: None,
            openai_base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "smollm:360m".to_string(),
            embedding_model: "jeffh/intfloat-multilingual-e5-large".to_string(),
            embedding_query_prefix: None,
            max_tokens: 256,
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Prefix applied to retrieval queries before embedding
    ///
    /// e5 models served by Ollama are trained with `query: ` on the query side.
    pub fn query_prefix(&self) -> Option<&str> {
        match self.embedding_query_prefix.as_deref() {
            Some("") => None,
            Some(prefix) => Some(prefix),
            None if self.provider == LlmProvider::Ollama
                && self.embedding_model.to_lowercase().contains("e5") =>
            {
                Some("query: ")
            }
            None => None,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Ollama,
    Azure,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "azure" => Ok(Self::Azure),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// RAG pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Number of fragments retrieved per question
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        // Small local models lose track of the question with more context
        Self { top_k: 2 }
    }
}

/// Keyword rules for intent classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Substrings marking a problem report (checked first)
    pub problem_keywords: Vec<String>,

    /// Substrings marking a farewell
    pub farewell_keywords: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        let problem = [
            "problema",
            "error",
            "falla",
            "no funciona",
            "roto",
            "apaga",
            "enciende",
            "pantalla",
            "impresora",
            "red",
            "lento",
            "problem",
            "failure",
            "not working",
            "broken",
            "won't turn on",
            "screen",
            "printer",
            "network",
            "slow",
        ];
        let farewell = [
            "gracias",
            "adios",
            "adiós",
            "chau",
            "hasta luego",
            "listo",
            "thanks",
            "goodbye",
            "bye",
            "see you",
            "done",
        ];

        Self {
            problem_keywords: problem.iter().map(|s| s.to_string()).collect(),
            farewell_keywords: farewell.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl From<ConfigError> for crate::EpisError {
    fn from(err: ConfigError) -> Self {
        crate::EpisError::Config(err.to_string())
    }
}
