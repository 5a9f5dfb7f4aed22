use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::intake::{MAX_FILE_BYTES, MAX_INSTRUCTION_CHARS, SUPPORTED_EXTENSIONS};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub intake: IntakeConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntakeConfig {
    pub max_file_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub max_instruction_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: MAX_FILE_BYTES,
            allowed_extensions: SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_instruction_chars: MAX_INSTRUCTION_CHARS,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let intake_defaults = IntakeConfig::default();

        Ok(Self {
            api: ApiConfig {
                base_url: env::var("TABLESCRUB_API_URL")
                    .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
                timeout_ms: env::var("TABLESCRUB_TIMEOUT_MS")
                    .unwrap_or_else(|_| DEFAULT_TIMEOUT_MS.to_string())
                    .parse()
                    .context("TABLESCRUB_TIMEOUT_MS must be a whole number of milliseconds")?,
            },
            intake: IntakeConfig {
                max_file_bytes: env::var("TABLESCRUB_MAX_FILE_BYTES")
                    .unwrap_or_else(|_| MAX_FILE_BYTES.to_string())
                    .parse()
                    .context("TABLESCRUB_MAX_FILE_BYTES must be a byte count")?,
                allowed_extensions: env::var("TABLESCRUB_ALLOWED_EXTENSIONS")
                    .map(|list| {
                        list.split(',')
                            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or(intake_defaults.allowed_extensions),
                max_instruction_chars: intake_defaults.max_instruction_chars,
            },
            export: ExportConfig {
                output_dir: env::var("TABLESCRUB_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(".")),
            },
        })
    }

    /// Apply command line overrides on top of the environment
    pub fn with_overrides(
        mut self,
        api_url: Option<String>,
        timeout_ms: Option<u64>,
        output_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(url) = api_url {
            self.api.base_url = url;
        }
        if let Some(ms) = timeout_ms {
            self.api.timeout_ms = ms;
        }
        if let Some(dir) = output_dir {
            self.export.output_dir = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_backend_contract() {
        let api = ApiConfig::default();
        assert_eq!(api.timeout_ms, 30_000);

        let intake = IntakeConfig::default();
        assert_eq!(intake.max_file_bytes, 10_485_760);
        assert_eq!(intake.allowed_extensions, vec!["csv", "xlsx", "xls"]);
        assert_eq!(intake.max_instruction_chars, 1000);
    }

    #[test]
    fn test_overrides_replace_only_given_values() {
        let config = Config::default().with_overrides(
            Some("http://example.test/api".to_string()),
            None,
            None,
        );

        assert_eq!(config.api.base_url, "http://example.test/api");
        assert_eq!(config.api.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.export.output_dir, PathBuf::from("."));
    }
}
