use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// 使用者輸入的來源位址，同時保留原始字串與正規化後的形式。
///
/// 相等、雜湊與排序都只看正規化形式：兩個 `Locator` 正規化後相同即視為重複。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locator {
    raw: String,
    canonical: String,
}

impl Locator {
    pub(crate) fn from_parts(raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            canonical: canonical.into(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// 穩定的排序鍵
    pub fn ordering_key(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Locator {}

impl Hash for Locator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for Locator {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Locator {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordering_key().cmp(other.ordering_key())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// 系統負載等級，依嚴重程度排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadLevel {
    Nominal,
    Fair,
    Serious,
    Critical,
}

impl LoadLevel {
    pub fn is_throttled(self) -> bool {
        self >= LoadLevel::Serious
    }
}

impl fmt::Display for LoadLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadLevel::Nominal => "nominal",
            LoadLevel::Fair => "fair",
            LoadLevel::Serious => "serious",
            LoadLevel::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// 待驗證的唯一位址與其在原始批次中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub locator: Locator,
    pub position: usize,
}

/// 驗證成功時回傳的最小識別資料
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIdentity {
    pub name: String,
    pub identifier: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Network,
    Validation,
    Server,
    Unknown,
}

impl ErrorCategory {
    pub fn display_name(self) -> &'static str {
        match self {
            ErrorCategory::Network => "Network",
            ErrorCategory::Validation => "Validation",
            ErrorCategory::Server => "Server",
            ErrorCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 單一位址的驗證失敗記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub locator: Locator,
    pub raw_error: String,
    pub category: ErrorCategory,
    pub retryable: bool,
    pub timestamp: DateTime<Utc>,
}

/// 每個 WorkItem 恰好產生一次的結果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { identity: SourceIdentity },
    Failure(ValidationError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duplicates: usize,
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed as f64 / self.total as f64
    }

    /// 以目前速率線性推估剩餘時間；尚未處理任何項目時無法推估
    pub fn estimate_remaining(&self, elapsed: Duration) -> Option<Duration> {
        if self.processed == 0 || self.total == 0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.processed);
        let per_item = elapsed.as_secs_f64() / self.processed as f64;
        Some(Duration::from_secs_f64(per_item * remaining as f64))
    }

    pub fn eta_label(&self, elapsed: Duration) -> String {
        match self.estimate_remaining(elapsed) {
            None => "Calculating...".to_string(),
            Some(eta) => {
                let secs = eta.as_secs();
                if secs < 60 {
                    format!("{}s remaining", secs)
                } else {
                    format!("{}m {}s remaining", secs / 60, secs % 60)
                }
            }
        }
    }
}

/// 批次執行的最終結果，由呼叫端持有
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub added_locators: Vec<Locator>,
    pub duplicate_count: usize,
    pub errors: Vec<ValidationError>,
    pub was_cancelled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub network: usize,
    pub validation: usize,
    pub server: usize,
    pub unknown: usize,
    pub retryable: usize,
    pub non_retryable: usize,
}

impl BatchResult {
    /// 已計入結果的輸入數量 (新增 + 失敗 + 重複)
    pub fn accounted(&self) -> usize {
        self.added_locators.len() + self.errors.len() + self.duplicate_count
    }

    pub fn retryable_errors(&self) -> Vec<ValidationError> {
        self.errors.iter().filter(|e| e.retryable).cloned().collect()
    }

    pub fn non_retryable_errors(&self) -> Vec<ValidationError> {
        self.errors.iter().filter(|e| !e.retryable).cloned().collect()
    }

    pub fn summary(&self) -> ErrorSummary {
        let mut summary = ErrorSummary {
            succeeded: self.added_locators.len(),
            failed: self.errors.len(),
            duplicates: self.duplicate_count,
            ..ErrorSummary::default()
        };

        for error in &self.errors {
            match error.category {
                ErrorCategory::Network => summary.network += 1,
                ErrorCategory::Validation => summary.validation += 1,
                ErrorCategory::Server => summary.server += 1,
                ErrorCategory::Unknown => summary.unknown += 1,
            }
            if error.retryable {
                summary.retryable += 1;
            } else {
                summary.non_retryable += 1;
            }
        }

        summary
    }

    /// 每筆失敗一行："<locator> - <error>"
    pub fn export_failures(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{} - {}", e.locator.raw(), e.raw_error))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
