//! Configuration system for the synthesis pipeline

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[cfg(test)]
mod tests;

/// Environment types for configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
    Test,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
            Environment::Test => write!(f, "test"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(Error::config(format!("Unknown environment: {}", other))),
        }
    }
}

/// How the compiler adapter picks a contract when the requested name is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContractSelection {
    /// Fall back to the last contract defined in the source file
    #[default]
    LastDefined,
    /// Fail with `ContractNotFound`
    Strict,
}

/// Compiler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Path to the solc binary; `solc` on PATH when unset
    pub solc_path: Option<PathBuf>,

    /// Target EVM version
    pub evm_version: String,

    /// Enable the optimizer
    pub optimizer_enabled: bool,

    /// Optimizer run count
    pub optimizer_runs: u32,

    /// Per-invocation timeout in seconds
    pub timeout_secs: u64,

    /// Directory holding the bundled library sources (e.g. `node_modules`)
    pub library_root: Option<PathBuf>,

    /// Contract selection policy
    pub contract_selection: ContractSelection,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            solc_path: None,
            evm_version: "shanghai".to_string(),
            optimizer_enabled: true,
            optimizer_runs: 200,
            timeout_secs: 60,
            library_root: None,
            contract_selection: ContractSelection::default(),
        }
    }
}

/// Package directory used when `library_root` is unset
pub const DEFAULT_LIBRARY_ROOT: &str = "node_modules";

impl CompilerSettings {
    /// Configured library root, or `./node_modules` when that directory exists
    pub fn resolved_library_root(&self) -> Option<PathBuf> {
        self.library_root_in(Path::new(""))
    }

    /// Configured library root, or `<dir>/node_modules` when that directory exists
    pub fn library_root_in(&self, dir: &Path) -> Option<PathBuf> {
        self.library_root.clone().or_else(|| {
            let fallback = dir.join(DEFAULT_LIBRARY_ROOT);
            fallback.is_dir().then_some(fallback)
        })
    }
}

/// Model backend settings for the request interpreter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// OpenAI-compatible chat completions endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,

    /// API key; the model tier is disabled when unset
    pub api_key: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token limit
    pub max_tokens: u32,

    /// Completion token limit when the model writes a whole contract
    pub generation_max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 500,
            generation_max_tokens: 3000,
            timeout_secs: 30,
        }
    }
}

impl AssistantConfig {
    /// Whether a model backend can be built from this config
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty()) && !self.endpoint.is_empty()
    }
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_enabled: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub environment: Environment,
    pub compiler: CompilerSettings,
    pub assistant: AssistantConfig,
    pub api: ApiConfig,
    pub logging: LogConfig,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error in field '{}': {}", self.field, self.message)
    }
}

/// Configuration validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Configuration validator trait
pub trait ConfigValidator {
    /// Validate the configuration
    fn validate(&self) -> ValidationResult;
}

fn collect(results: impl IntoIterator<Item = ValidationResult>) -> ValidationResult {
    let errors: Vec<ValidationError> = results
        .into_iter()
        .filter_map(|r| r.err())
        .flatten()
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

impl ConfigValidator for SynthConfig {
    fn validate(&self) -> ValidationResult {
        collect([
            self.compiler.validate(),
            self.assistant.validate(),
            self.api.validate(),
            self.logging.validate(),
        ])
    }
}

const EVM_VERSIONS: &[&str] = &[
    "homestead",
    "tangerineWhistle",
    "spuriousDragon",
    "byzantium",
    "constantinople",
    "petersburg",
    "istanbul",
    "berlin",
    "london",
    "paris",
    "shanghai",
    "cancun",
    "prague",
];

impl ConfigValidator for CompilerSettings {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if !EVM_VERSIONS.contains(&self.evm_version.as_str()) {
            errors.push(ValidationError::new(
                "compiler.evm_version",
                format!("Unknown EVM version '{}'", self.evm_version),
            ));
        }

        if self.optimizer_enabled && self.optimizer_runs == 0 {
            errors.push(ValidationError::new(
                "compiler.optimizer_runs",
                "Optimizer runs must be greater than 0 when the optimizer is enabled",
            ));
        }

        if self.timeout_secs == 0 {
            errors.push(ValidationError::new("compiler.timeout_secs", "Timeout must be greater than 0"));
        }

        if let Some(root) = &self.library_root {
            if !root.is_dir() {
                errors.push(ValidationError::new(
                    "compiler.library_root",
                    format!("Library root '{}' is not a directory", root.display()),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ConfigValidator for AssistantConfig {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            errors.push(ValidationError::new(
                "assistant.endpoint",
                format!("Endpoint '{}' must be an http(s) URL", self.endpoint),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            errors.push(ValidationError::new("assistant.temperature", "Temperature must be between 0.0 and 2.0"));
        }

        if self.max_tokens == 0 {
            errors.push(ValidationError::new("assistant.max_tokens", "Max tokens must be greater than 0"));
        }

        if self.generation_max_tokens == 0 {
            errors.push(ValidationError::new(
                "assistant.generation_max_tokens",
                "Generation max tokens must be greater than 0",
            ));
        }

        if self.timeout_secs == 0 {
            errors.push(ValidationError::new("assistant.timeout_secs", "Timeout must be greater than 0"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ConfigValidator for ApiConfig {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.host.is_empty() {
            errors.push(ValidationError::new("api.host", "Host cannot be empty"));
        }

        if self.port == 0 {
            errors.push(ValidationError::new("api.port", "Port must be greater than 0"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ConfigValidator for LogConfig {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if !["trace", "debug", "info", "warn", "error"].contains(&self.level.to_lowercase().as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!("Invalid log level '{}'. Supported levels: trace, debug, info, warn, error", self.level),
            ));
        }

        if !["json", "pretty", "compact"].contains(&self.format.as_str()) {
            errors.push(ValidationError::new(
                "logging.format",
                format!("Invalid log format '{}'. Supported formats: json, pretty, compact", self.format),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration manager for loading and saving configuration
pub struct ConfigManager {
    config: SynthConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create a new configuration manager with defaults and environment overrides
    pub fn new() -> Result<Self> {
        let mut manager = Self {
            config: SynthConfig::default(),
            config_path: None,
        };
        manager.apply_environment_overrides()?;
        Ok(manager)
    }

    /// Load configuration from a `.toml` or `.json` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read configuration file {}: {}", path.display(), e)))?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| Error::config(format!("Failed to parse JSON configuration file {}: {}", path.display(), e)))?,
            _ => {
                return Err(Error::config(
                    "Unsupported configuration file format. Supported formats: .toml, .json",
                ))
            }
        };

        let mut manager = Self {
            config,
            config_path: Some(path.to_path_buf()),
        };
        manager.apply_environment_overrides()?;

        Ok(manager)
    }

    /// Load from `path` when given, otherwise from defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::new(),
        }
    }

    /// Apply `SYNTH_*` environment variable overrides
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        if let Ok(solc_path) = env::var("SYNTH_SOLC_PATH") {
            self.config.compiler.solc_path = Some(PathBuf::from(solc_path));
        }
        if let Ok(evm_version) = env::var("SYNTH_EVM_VERSION") {
            self.config.compiler.evm_version = evm_version;
        }
        if let Ok(library_root) = env::var("SYNTH_LIBRARY_ROOT") {
            self.config.compiler.library_root = Some(PathBuf::from(library_root));
        }

        if let Ok(api_host) = env::var("SYNTH_API_HOST") {
            self.config.api.host = api_host;
        }
        if let Ok(api_port) = env::var("SYNTH_API_PORT") {
            self.config.api.port = api_port
                .parse()
                .map_err(|_| Error::config(format!("Invalid SYNTH_API_PORT value: {}", api_port)))?;
        }

        if let Ok(model) = env::var("SYNTH_MODEL") {
            self.config.assistant.model = model;
        }
        if let Ok(endpoint) = env::var("SYNTH_MODEL_ENDPOINT") {
            self.config.assistant.endpoint = endpoint;
        }
        if let Ok(api_key) = env::var("OPENAI_API_KEY") {
            self.config.assistant.api_key = Some(api_key);
        }

        if let Ok(log_level) = env::var("SYNTH_LOG_LEVEL") {
            self.config.logging.level = log_level;
        }

        if let Ok(env_str) = env::var("SYNTH_ENVIRONMENT") {
            self.config.environment = env_str
                .parse()
                .map_err(|_| Error::config(format!("Invalid SYNTH_ENVIRONMENT value: {}", env_str)))?;
        }

        Ok(())
    }

    /// Validate the current configuration
    pub fn validate(&self) -> ValidationResult {
        self.config.validate()
    }

    /// Get the current configuration
    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Get a mutable reference to the configuration
    pub fn config_mut(&mut self) -> &mut SynthConfig {
        &mut self.config
    }

    /// Path the configuration was loaded from, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Consume the manager, returning the configuration
    pub fn into_config(self) -> SynthConfig {
        self.config
    }

    /// Save configuration to a file, picking the format from its extension
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(&self.config)?,
            _ => toml::to_string_pretty(&self.config)?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;

        Ok(())
    }

    /// Write a default configuration file for the given environment
    pub fn generate_default_config<P: AsRef<Path>>(path: P, environment: Environment) -> Result<()> {
        let mut config = SynthConfig {
            environment: environment.clone(),
            ..Default::default()
        };

        match environment {
            Environment::Production => {
                config.logging.format = "json".to_string();
                config.api.host = "0.0.0.0".to_string();
            }
            Environment::Test => {
                config.logging.level = "debug".to_string();
                config.compiler.timeout_secs = 10;
            }
            Environment::Development | Environment::Staging => {}
        }

        let manager = Self {
            config,
            config_path: None,
        };
        manager.save_to_file(path)
    }
}
