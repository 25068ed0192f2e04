use crate::core::aggregate::ResultAggregator;
use crate::core::classify::{classify, classify_error};
use crate::core::concurrency::{ChunkPlan, ConcurrencyController};
use crate::core::dedup::{deduplicate, RejectedInput};
use crate::core::progress::{ProgressTracker, DEFAULT_PROGRESS_INTERVAL};
use crate::domain::model::{BatchResult, Locator, Outcome, ValidationError, WorkItem};
use crate::domain::ports::{ExistingSet, LoadSignal, ProgressSink, Validator};
use crate::utils::error::Result;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// 排程器的時間參數
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub progress_interval: Duration,
    /// 負載過高時，派送下一個 chunk 前的等待
    pub chunk_pause: Duration,
    /// 負載過高時，同一 chunk 內項目之間的等待
    pub dispatch_pause: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            chunk_pause: Duration::from_millis(100),
            dispatch_pause: Duration::from_millis(20),
        }
    }
}

/// 批次匯入管線：去重、分 chunk 並行驗證、彙整結果。
///
/// 每個 chunk 內的驗證同時進行，chunk 之間完全排空後才派送下一批，因此同時
/// 進行中的驗證數量不會超過當下的預算。所有結果只由 `run` 所在的 task 寫入。
pub struct ImportPipeline<V, E, L> {
    validator: Arc<V>,
    existing: E,
    load: L,
    settings: SchedulerSettings,
}

impl<V, E, L> ImportPipeline<V, E, L>
where
    V: Validator + 'static,
    E: ExistingSet,
    L: LoadSignal,
{
    pub fn new(validator: Arc<V>, existing: E, load: L) -> Self {
        Self {
            validator,
            existing,
            load,
            settings: SchedulerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SchedulerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn existing(&self) -> &E {
        &self.existing
    }

    /// 執行一次批次匯入。
    ///
    /// 只有既有集合不可用時回傳 `Err`；個別驗證失敗記錄在結果的 `errors`，
    /// 取消則回傳 `was_cancelled = true` 的部分結果。
    pub async fn run(
        &self,
        raw_batch: &[String],
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchResult> {
        let started = Instant::now();
        let dedup = deduplicate(raw_batch, &self.existing).map_err(|e| {
            tracing::error!("❌ Existing-set lookup failed, aborting import: {}", e);
            e
        })?;

        tracing::info!(
            "🚀 Starting import: {} inputs, {} to validate, {} duplicates, {} rejected",
            raw_batch.len(),
            dedup.items.len(),
            dedup.duplicate_count,
            dedup.rejected.len()
        );

        let mut aggregator = ResultAggregator::new(dedup.duplicate_count);
        let mut tracker = ProgressTracker::new(sink, self.settings.progress_interval);
        tracker.seed(dedup.actionable(), dedup.duplicate_count, dedup.rejected.len());

        for rejected in dedup.rejected {
            let position = rejected.position;
            let (locator, error) = rejection_failure(rejected);
            aggregator.record(position, locator, Outcome::Failure(error));
        }

        let controller = ConcurrencyController::for_batch(raw_batch.len());
        let mut queue: VecDeque<WorkItem> = dedup.items.into();
        let mut was_cancelled = false;
        let mut chunk_index = 0usize;

        while !queue.is_empty() {
            if cancel.is_cancelled() {
                was_cancelled = true;
                break;
            }

            let plan = controller.plan_chunk(self.load.sample(), queue.len());
            chunk_index += 1;
            tracing::debug!(
                "Chunk #{}: budget {} (base {}, load {}), {} remaining",
                chunk_index,
                plan.budget,
                controller.base(),
                plan.level,
                queue.len()
            );

            if plan.should_pause {
                tracing::warn!(
                    "🌡️ System load {} - pausing {:?} before chunk #{}",
                    plan.level,
                    self.settings.chunk_pause,
                    chunk_index
                );
                tokio::time::sleep(self.settings.chunk_pause).await;
            }

            let chunk: Vec<WorkItem> = queue.drain(..plan.budget).collect();
            let interrupted = self
                .run_chunk(chunk, &plan, cancel, &mut tracker, &mut aggregator)
                .await;

            if interrupted {
                was_cancelled = true;
                break;
            }
        }

        let snapshot = tracker.snapshot();
        if was_cancelled {
            tracker.flush();
            tracing::warn!(
                "⏹️ Import cancelled: {} of {} processed, {} never dispatched",
                snapshot.processed,
                snapshot.total,
                snapshot.total - snapshot.processed
            );
        } else {
            tracing::info!(
                "✅ Import finished in {:?}: {} succeeded, {} failed, {} duplicates",
                started.elapsed(),
                snapshot.succeeded,
                snapshot.failed,
                snapshot.duplicates
            );
        }

        Ok(aggregator.finish(was_cancelled))
    }

    /// 派送並排空一個 chunk。觀察到取消時回傳 `true`；已派送的驗證仍會等待完成。
    async fn run_chunk(
        &self,
        chunk: Vec<WorkItem>,
        plan: &ChunkPlan,
        cancel: &CancellationToken,
        tracker: &mut ProgressTracker<'_>,
        aggregator: &mut ResultAggregator,
    ) -> bool {
        let mut workers = JoinSet::new();
        let mut in_flight: HashMap<usize, Locator> = HashMap::with_capacity(chunk.len());
        let mut interrupted = false;

        for (index, item) in chunk.into_iter().enumerate() {
            if plan.should_pause && index > 0 {
                tokio::time::sleep(self.settings.dispatch_pause).await;
            }
            // 暫停期間也可能收到取消
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            in_flight.insert(item.position, item.locator.clone());
            let validator = Arc::clone(&self.validator);
            workers.spawn(async move {
                let result = validator.validate_locator(&item.locator).await;
                (item, result)
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((item, result)) => {
                    in_flight.remove(&item.position);
                    let outcome = match result {
                        Ok(identity) => {
                            tracing::debug!("✔ {} -> {}", item.locator, identity.name);
                            Outcome::Success { identity }
                        }
                        Err(err) => {
                            let (category, retryable) = classify_error(&err);
                            tracing::debug!("✘ {} -> {} ({})", item.locator, err, category);
                            Outcome::Failure(ValidationError {
                                locator: item.locator.clone(),
                                raw_error: err.to_string(),
                                category,
                                retryable,
                                timestamp: Utc::now(),
                            })
                        }
                    };
                    tracker.record(&outcome);
                    aggregator.record(item.position, item.locator, outcome);
                }
                Err(join_error) => {
                    tracing::error!("Validation task failed: {}", join_error);
                }
            }
        }

        // 驗證 task panic 時仍需為其項目留下結果
        let mut lost: Vec<(usize, Locator)> = in_flight.into_iter().collect();
        lost.sort_by_key(|(position, _)| *position);
        for (position, locator) in lost {
            let raw_error = "validation task ended unexpectedly".to_string();
            let (category, retryable) = classify(&raw_error);
            let outcome = Outcome::Failure(ValidationError {
                locator: locator.clone(),
                raw_error,
                category,
                retryable,
                timestamp: Utc::now(),
            });
            tracker.record(&outcome);
            aggregator.record(position, locator, outcome);
        }

        interrupted
    }
}

fn rejection_failure(rejected: RejectedInput) -> (Locator, ValidationError) {
    let canonical = rejected.raw.trim().to_string();
    let locator = Locator::from_parts(rejected.raw, canonical);
    let raw_error = format!("invalid locator: {}", rejected.reason);
    let (category, retryable) = classify(&raw_error);
    let error = ValidationError {
        locator: locator.clone(),
        raw_error,
        category,
        retryable,
        timestamp: Utc::now(),
    };
    (locator, error)
}
