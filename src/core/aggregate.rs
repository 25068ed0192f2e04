use crate::domain::model::{BatchResult, Locator, Outcome, ValidationError};

/// 收集每個項目的結果，最後依原始批次順序產生 `BatchResult`
#[derive(Debug, Default)]
pub struct ResultAggregator {
    added: Vec<(usize, Locator)>,
    errors: Vec<(usize, ValidationError)>,
    duplicate_count: usize,
}

impl ResultAggregator {
    pub fn new(duplicate_count: usize) -> Self {
        Self {
            duplicate_count,
            ..Self::default()
        }
    }

    pub fn record(&mut self, position: usize, locator: Locator, outcome: Outcome) {
        match outcome {
            Outcome::Success { .. } => self.added.push((position, locator)),
            Outcome::Failure(error) => self.errors.push((position, error)),
        }
    }

    pub fn recorded(&self) -> usize {
        self.added.len() + self.errors.len()
    }

    pub fn finish(mut self, was_cancelled: bool) -> BatchResult {
        // 完成順序不固定，依位置排序以保持結果穩定
        self.added.sort_by_key(|(position, _)| *position);
        self.errors.sort_by_key(|(position, _)| *position);

        BatchResult {
            added_locators: self.added.into_iter().map(|(_, locator)| locator).collect(),
            duplicate_count: self.duplicate_count,
            errors: self.errors.into_iter().map(|(_, error)| error).collect(),
            was_cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ErrorCategory, SourceIdentity};

    fn locator(url: &str) -> Locator {
        Locator::from_parts(url, url)
    }

    #[test]
    fn test_finish_orders_by_original_position() {
        let mut aggregator = ResultAggregator::new(1);
        let identity = SourceIdentity {
            name: "n".to_string(),
            identifier: "i".to_string(),
        };

        aggregator.record(
            3,
            locator("https://d.io"),
            Outcome::Success {
                identity: identity.clone(),
            },
        );
        aggregator.record(
            2,
            locator("https://c.io"),
            Outcome::Failure(ValidationError {
                locator: locator("https://c.io"),
                raw_error: "500".to_string(),
                category: ErrorCategory::Server,
                retryable: true,
                timestamp: chrono::Utc::now(),
            }),
        );
        aggregator.record(0, locator("https://a.io"), Outcome::Success { identity });
        assert_eq!(aggregator.recorded(), 3);

        let result = aggregator.finish(false);
        let added: Vec<&str> = result.added_locators.iter().map(|l| l.canonical()).collect();
        assert_eq!(added, vec!["https://a.io", "https://d.io"]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.duplicate_count, 1);
        assert_eq!(result.accounted(), 4);
        assert!(!result.was_cancelled);
    }
}
