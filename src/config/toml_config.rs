use crate::core::pipeline::SchedulerSettings;
use crate::utils::error::{ImportError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImporterConfig {
    #[serde(default)]
    pub import: ImportSettings,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub progress_interval_ms: u64,
    pub chunk_pause_ms: u64,
    pub dispatch_pause_ms: u64,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            progress_interval_ms: 300,
            chunk_pause_ms: 100,
            dispatch_pause_ms: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: format!("repo-importer/{}", env!("CARGO_PKG_VERSION")),
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: "./repositories.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: LogFormat,
}

impl ImporterConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ImportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ImportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_TOKEN})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ImportError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            progress_interval: Duration::from_millis(self.import.progress_interval_ms),
            chunk_pause: Duration::from_millis(self.import.chunk_pause_ms),
            dispatch_pause: Duration::from_millis(self.import.dispatch_pause_ms),
        }
    }

    pub fn registry_path(&self) -> &str {
        &self.registry.path
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl Validate for ImporterConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number(
            "validator.timeout_seconds",
            self.validator.timeout_seconds as usize,
            1,
        )?;
        validate_range("import.progress_interval_ms", self.import.progress_interval_ms, 0, 60_000)?;
        validate_range("import.chunk_pause_ms", self.import.chunk_pause_ms, 0, 10_000)?;
        validate_range("import.dispatch_pause_ms", self.import.dispatch_pause_ms, 0, 10_000)?;
        validate_non_empty_string("validator.user_agent", &self.validator.user_agent)?;
        validate_path("registry.path", &self.registry.path)?;
        Ok(())
    }
}
