use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Failed to load table '{table}': {reason}")]
    DataLoadError { table: String, reason: String },

    #[error("Schema mismatch in table '{table}' (missing: [{}], unexpected: [{}])", .missing.join(", "), .unexpected.join(", "))]
    SchemaError {
        table: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Unknown selection key: {key}")]
    InvalidSelectionKey { key: String },

    #[error("{group_company_count} group companies exceeds the automated pricing range")]
    EscalationRequired { group_company_count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    DataLoad,
    Selection,
    Escalation,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl QuoteError {
    pub fn data_load(table: &str, reason: impl Into<String>) -> Self {
        QuoteError::DataLoadError {
            table: table.to_string(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            QuoteError::ConfigValidationError { .. }
            | QuoteError::InvalidConfigValueError { .. }
            | QuoteError::MissingConfigError { .. } => ErrorCategory::Configuration,
            QuoteError::CsvError(_)
            | QuoteError::DataLoadError { .. }
            | QuoteError::SchemaError { .. } => ErrorCategory::DataLoad,
            QuoteError::InvalidSelectionKey { .. } => ErrorCategory::Selection,
            QuoteError::EscalationRequired { .. } => ErrorCategory::Escalation,
            QuoteError::IoError(_) | QuoteError::SerializationError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 個別報價是結果狀態，不是錯誤
            ErrorCategory::Escalation | ErrorCategory::Selection => ErrorSeverity::Low,
            ErrorCategory::DataLoad => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            QuoteError::SchemaError { table, .. } => format!(
                "Re-export '{}' from the master workbook with the expected header row",
                table
            ),
            QuoteError::DataLoadError { table, .. } => {
                format!("Check the rows of '{}' in the catalog directory", table)
            }
            QuoteError::CsvError(_) => "Make sure the catalog files are UTF-8 CSV".to_string(),
            QuoteError::ConfigValidationError { .. }
            | QuoteError::InvalidConfigValueError { .. }
            | QuoteError::MissingConfigError { .. } => {
                "Fix the quote configuration file and run again".to_string()
            }
            QuoteError::InvalidSelectionKey { .. } => {
                "Remove the stale entry from [selection]; the catalog no longer contains it"
                    .to_string()
            }
            QuoteError::EscalationRequired { .. } => {
                "Consult a specialist for an individual quote".to_string()
            }
            QuoteError::IoError(_) => "Check file paths and permissions".to_string(),
            QuoteError::SerializationError(_) => "Report this as a bug".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            QuoteError::EscalationRequired { .. } => {
                "Individual quote required (more than 5 group companies)".to_string()
            }
            QuoteError::SchemaError { table, .. } | QuoteError::DataLoadError { table, .. } => {
                format!("Catalog table '{}' could not be loaded", table)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_columns() {
        let err = QuoteError::SchemaError {
            table: "service_master".to_string(),
            missing: vec!["Hours".to_string(), "Required".to_string()],
            unexpected: vec!["Memo".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Schema mismatch in table 'service_master' (missing: [Hours, Required], unexpected: [Memo])"
        );
        assert_eq!(err.category(), ErrorCategory::DataLoad);
    }

    #[test]
    fn test_escalation_is_not_a_failure() {
        let err = QuoteError::EscalationRequired {
            group_company_count: 6,
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert!(err.user_friendly_message().contains("Individual quote"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: QuoteError = io_err.into();
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
