use crate::domain::model::ErrorCategory;

const NETWORK_MARKERS: [&str; 4] = ["network", "timeout", "connection", "dns"];
const VALIDATION_MARKERS: [&str; 3] = ["invalid", "malformed", "format"];
const SERVER_MARKERS: [&str; 4] = ["server", "404", "403", "500"];
const RETRYABLE_STATUS_MARKERS: [&str; 2] = ["500", "503"];
const PERMANENT_MARKERS: [&str; 3] = ["invalid", "malformed", "404"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// 依錯誤描述分類，第一個符合的規則優先 (不分大小寫)
pub fn categorize(description: &str) -> ErrorCategory {
    let text = description.to_lowercase();
    if contains_any(&text, &NETWORK_MARKERS) {
        ErrorCategory::Network
    } else if contains_any(&text, &VALIDATION_MARKERS) {
        ErrorCategory::Validation
    } else if contains_any(&text, &SERVER_MARKERS) {
        ErrorCategory::Server
    } else {
        ErrorCategory::Unknown
    }
}

/// 是否值得原樣重試。
///
/// 未知錯誤預設可重試，沿用既有行為；這可能把永久失效的輸入標成可重試。
pub fn is_retryable(description: &str) -> bool {
    let text = description.to_lowercase();
    if categorize(&text) == ErrorCategory::Network {
        return true;
    }
    if contains_any(&text, &RETRYABLE_STATUS_MARKERS) {
        return true;
    }
    if contains_any(&text, &PERMANENT_MARKERS) {
        return false;
    }
    true
}

pub fn classify(description: &str) -> (ErrorCategory, bool) {
    (categorize(description), is_retryable(description))
}

/// 對任何錯誤型別依其 Display 文字分類
pub fn classify_error(error: &(dyn std::error::Error + 'static)) -> (ErrorCategory, bool) {
    classify(&error.to_string())
}
