//! Local intake checks
//!
//! Everything here runs before any request is made: file extension and size
//! checks for uploads, and the natural-language instruction check for
//! processing requests.

use crate::config::IntakeConfig;
use thiserror::Error;

/// Largest file the backend accepts (10 MiB)
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
/// Extensions accepted for upload, lower-case and without the dot
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];
/// Longest instruction the backend accepts
pub const MAX_INSTRUCTION_CHARS: usize = 1000;

/// Errors raised locally, before anything is sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unsupported file format. Supported formats: {supported}")]
    UnsupportedFormat { name: String, supported: String },

    #[error("File exceeds the size limit ({}MB)", .limit_bytes / (1024 * 1024))]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("Please enter a natural language description of the pattern to match and replace.")]
    EmptyInstruction,

    #[error("Instruction is too long ({length} characters, limit is {limit})")]
    InstructionTooLong { length: usize, limit: usize },

    #[error("Please upload a file before processing.")]
    NoDataset,

    #[error("The uploaded file contains no rows to process.")]
    EmptyDataset,
}

/// Name and size of a file chosen for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size_bytes: u64,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
        }
    }

    /// Substring after the last `.`, lower-cased. `None` when the name has no dot.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
    }
}

#[derive(Debug, Clone)]
pub struct FileIntakeValidator {
    allowed_extensions: Vec<String>,
    max_file_bytes: u64,
    max_instruction_chars: usize,
}

impl Default for FileIntakeValidator {
    fn default() -> Self {
        Self::from_config(&IntakeConfig::default())
    }
}

impl FileIntakeValidator {
    pub fn from_config(config: &IntakeConfig) -> Self {
        Self {
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            max_file_bytes: config.max_file_bytes,
            max_instruction_chars: config.max_instruction_chars,
        }
    }

    /// Check a file against the extension rule, then the size rule.
    /// The first failing rule wins.
    pub fn validate(&self, file: &FileInfo) -> Result<(), ValidationError> {
        let accepted = file
            .extension()
            .map(|ext| self.allowed_extensions.iter().any(|allowed| *allowed == ext))
            .unwrap_or(false);

        if !accepted {
            return Err(ValidationError::UnsupportedFormat {
                name: file.name.clone(),
                supported: self.supported_list(),
            });
        }

        if file.size_bytes > self.max_file_bytes {
            return Err(ValidationError::FileTooLarge {
                size_bytes: file.size_bytes,
                limit_bytes: self.max_file_bytes,
            });
        }

        Ok(())
    }

    pub fn max_instruction_chars(&self) -> usize {
        self.max_instruction_chars
    }

    /// Human readable list of accepted extensions, e.g. `.csv, .xlsx, .xls`
    pub fn supported_list(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A trimmed, non-empty natural-language instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRequest(String);

impl PatternRequest {
    pub fn parse(input: &str, max_chars: usize) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyInstruction);
        }

        let length = trimmed.chars().count();
        if length > max_chars {
            return Err(ValidationError::InstructionTooLong {
                length,
                limit: max_chars,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PatternRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_supported_extensions_in_any_case() {
        let validator = FileIntakeValidator::default();
        for name in ["data.csv", "DATA.CSV", "report.Xlsx", "legacy.xls", "a.b.csv", ".csv"] {
            assert!(validator.validate(&FileInfo::new(name, 10)).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_rejects_unsupported_or_missing_extension() {
        let validator = FileIntakeValidator::default();
        for name in ["notes.txt", "data.csv.zip", "csv", "archive.", "data.xlsm", ""] {
            let err = validator.validate(&FileInfo::new(name, 10)).unwrap_err();
            assert!(
                matches!(err, ValidationError::UnsupportedFormat { .. }),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let validator = FileIntakeValidator::default();
        assert!(validator.validate(&FileInfo::new("ok.csv", MAX_FILE_BYTES)).is_ok());

        let err = validator
            .validate(&FileInfo::new("big.csv", MAX_FILE_BYTES + 1))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::FileTooLarge {
                size_bytes: MAX_FILE_BYTES + 1,
                limit_bytes: MAX_FILE_BYTES,
            }
        );
        assert_eq!(err.to_string(), "File exceeds the size limit (10MB)");
    }

    #[test]
    fn test_extension_rule_is_checked_first() {
        let validator = FileIntakeValidator::default();
        let err = validator
            .validate(&FileInfo::new("huge.pdf", MAX_FILE_BYTES * 4))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported file format. Supported formats: .csv, .xlsx, .xls"
        );
    }

    #[test]
    fn test_pattern_request_is_trimmed() {
        let pattern = PatternRequest::parse("  replace emails with X \n", 1000).unwrap();
        assert_eq!(pattern.as_str(), "replace emails with X");
    }

    #[test]
    fn test_pattern_request_rejects_blank_and_oversized_input() {
        assert_eq!(PatternRequest::parse("", 1000), Err(ValidationError::EmptyInstruction));
        assert_eq!(PatternRequest::parse(" \t\n ", 1000), Err(ValidationError::EmptyInstruction));

        let long = "é".repeat(11);
        assert_eq!(
            PatternRequest::parse(&long, 10),
            Err(ValidationError::InstructionTooLong { length: 11, limit: 10 })
        );
    }
}
