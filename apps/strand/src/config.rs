//! # Configuration
//!
//! `strand.toml` settings shared by every command.
//!
//! ```toml
//! log_format = "json"
//! seed = 42
//!
//! [default_loss]
//! type = "huber"
//! delta = 1.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use strand_core::{IdGenerator, RobustLoss, StrandError};

/// File consulted when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "strand.toml";

/// Maximum size of a configuration or scenario file (10 MB).
pub const MAX_INPUT_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrandConfig {
    /// Log formatter. `STRAND_LOG_FORMAT` overrides it.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Seed for random identifiers. Unset means OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Loss for scenario constraints that do not name one.
    #[serde(default)]
    pub default_loss: Option<RobustLoss>,
}

impl StrandConfig {
    /// Parse configuration text and validate it.
    pub fn parse(text: &str) -> Result<Self, StrandError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| StrandError::Config(format!("Invalid configuration: {}", e)))?;
        if let Some(loss) = config.default_loss {
            loss.validate()?;
        }
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, StrandError> {
        Self::parse(&read_input(path)?)
    }

    /// Load the explicit path if given, else `strand.toml` if present, else
    /// defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, StrandError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// The identifier generator this configuration asks for.
    #[must_use]
    pub fn id_generator(&self) -> IdGenerator {
        match self.seed {
            Some(seed) => IdGenerator::seeded(seed),
            None => IdGenerator::default(),
        }
    }
}

/// Read a bounded input file into a string.
pub fn read_input(path: &Path) -> Result<String, StrandError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| StrandError::Io(format!("Cannot read '{}': {}", path.display(), e)))?;

    if !metadata.is_file() {
        return Err(StrandError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > MAX_INPUT_FILE_SIZE {
        return Err(StrandError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_INPUT_FILE_SIZE
        )));
    }

    std::fs::read_to_string(path)
        .map_err(|e| StrandError::Io(format!("Cannot read '{}': {}", path.display(), e)))
}

// =============================================================================
// TESTS
// =============================================================================
