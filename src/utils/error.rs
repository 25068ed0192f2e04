use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Existing-set lookup unavailable: {reason}")]
    ExistingSetUnavailable { reason: String },

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Input error: {message}")]
    InputError { message: String },
}

/// 錯誤嚴重程度，CLI 依此決定退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ImportError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ImportError::ExistingSetUnavailable { .. } => ErrorSeverity::Critical,
            ImportError::HttpError(_) => ErrorSeverity::Medium,
            ImportError::IoError(_) | ImportError::SerializationError(_) => ErrorSeverity::High,
            ImportError::ConfigError { .. }
            | ImportError::ConfigValidationError { .. }
            | ImportError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            ImportError::InputError { .. } => ErrorSeverity::Low,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ImportError::ExistingSetUnavailable { .. } => {
                "Check that the registry file is readable, then run the import again"
            }
            ImportError::HttpError(_) => "Check network connectivity and retry",
            ImportError::IoError(_) => "Check file paths and permissions",
            ImportError::SerializationError(_) => {
                "Make sure the result file was produced by this tool and is not truncated"
            }
            ImportError::ConfigError { .. }
            | ImportError::ConfigValidationError { .. }
            | ImportError::InvalidConfigValueError { .. } => "Fix the configuration file and retry",
            ImportError::InputError { .. } => {
                "Provide one http:// or https:// locator per line"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ImportError::ExistingSetUnavailable { reason } => {
                format!("Could not read the list of already imported repositories ({})", reason)
            }
            ImportError::InputError { message } => message.clone(),
            other => other.to_string(),
        }
    }

    /// 只有既有集合查詢失敗會中止整個批次
    pub fn is_fatal(&self) -> bool {
        matches!(self, ImportError::ExistingSetUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_set_failure_is_fatal_and_critical() {
        let err = ImportError::ExistingSetUnavailable {
            reason: "permission denied".to_string(),
        };
        assert!(err.is_fatal());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("permission denied"));
    }

    #[test]
    fn test_input_error_is_low_severity() {
        let err = ImportError::InputError {
            message: "No locators supplied".to_string(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.user_friendly_message(), "No locators supplied");
    }
}
