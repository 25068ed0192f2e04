use crate::core::normalize::{normalize, Rejection};
use crate::domain::model::WorkItem;
use crate::domain::ports::ExistingSet;
use crate::utils::error::Result;
use std::collections::HashSet;

/// 正規化失敗的原始輸入，不會送往驗證
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedInput {
    pub position: usize,
    pub raw: String,
    pub reason: Rejection,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DedupOutcome {
    pub items: Vec<WorkItem>,
    pub duplicate_count: usize,
    pub rejected: Vec<RejectedInput>,
}

impl DedupOutcome {
    /// 實際需要處理的數量 (待驗證 + 被拒絕)
    pub fn actionable(&self) -> usize {
        self.items.len() + self.rejected.len()
    }
}

/// 去除批次內重複與既有集合中已存在的位址。
///
/// 保留第一次出現的順序，之後的重複直接捨棄並計數。既有集合查詢失敗時整個
/// 呼叫回傳錯誤。
pub fn deduplicate<E>(raw_batch: &[String], existing: &E) -> Result<DedupOutcome>
where
    E: ExistingSet + ?Sized,
{
    let mut outcome = DedupOutcome::default();
    let mut seen = HashSet::new();

    for (position, raw) in raw_batch.iter().enumerate() {
        let locator = match normalize(raw) {
            Ok(locator) => locator,
            Err(reason) => {
                tracing::debug!("Rejected input #{}: {} ({})", position, raw, reason);
                outcome.rejected.push(RejectedInput {
                    position,
                    raw: raw.clone(),
                    reason,
                });
                continue;
            }
        };

        if !seen.insert(locator.canonical().to_string()) {
            tracing::debug!("Duplicate within batch: {}", locator);
            outcome.duplicate_count += 1;
            continue;
        }

        if existing.is_already_present(&locator)? {
            tracing::debug!("Already present: {}", locator);
            outcome.duplicate_count += 1;
            continue;
        }

        outcome.items.push(WorkItem { locator, position });
    }

    Ok(outcome)
}
