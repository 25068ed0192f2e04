use crate::domain::model::LoadLevel;

pub const MIN_BUDGET: usize = 3;
const SMALL_BATCH_BUDGET: usize = 8;
const DEFAULT_BUDGET: usize = 10;
const LARGE_BATCH_BUDGET: usize = 15;
const SMALL_BATCH_LIMIT: usize = 20;
const LARGE_BATCH_LIMIT: usize = 100;
const FAIR_FLOOR: usize = 6;

/// 單一 chunk 的排程決策
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub budget: usize,
    pub level: LoadLevel,
    pub should_pause: bool,
}

/// 依批次大小與系統負載決定每個 chunk 的並行數
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyController {
    base: usize,
}

impl ConcurrencyController {
    pub fn for_batch(batch_size: usize) -> Self {
        Self {
            base: Self::base_budget(batch_size),
        }
    }

    pub fn base_budget(batch_size: usize) -> usize {
        if batch_size < SMALL_BATCH_LIMIT {
            SMALL_BATCH_BUDGET
        } else if batch_size > LARGE_BATCH_LIMIT {
            LARGE_BATCH_BUDGET
        } else {
            DEFAULT_BUDGET
        }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// 依負載調整後的預算，尚未套用剩餘數量上限
    pub fn adjusted_budget(&self, level: LoadLevel) -> usize {
        let budget = match level {
            LoadLevel::Nominal => self.base,
            LoadLevel::Fair => self.base.saturating_sub(2).max(FAIR_FLOOR),
            LoadLevel::Serious => self.base.saturating_sub(4).max(MIN_BUDGET),
            LoadLevel::Critical => MIN_BUDGET,
        };
        budget.max(MIN_BUDGET)
    }

    pub fn should_pause(level: LoadLevel) -> bool {
        level.is_throttled()
    }

    /// 每個 chunk 開始前呼叫一次；`remaining` 為尚未派送的項目數
    pub fn plan_chunk(&self, level: LoadLevel, remaining: usize) -> ChunkPlan {
        ChunkPlan {
            budget: self.adjusted_budget(level).min(remaining),
            level,
            should_pause: Self::should_pause(level),
        }
    }
}
