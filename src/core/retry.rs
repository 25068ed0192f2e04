use crate::core::pipeline::ImportPipeline;
use crate::domain::model::{BatchResult, ValidationError};
use crate::domain::ports::{ExistingSet, LoadSignal, ProgressSink, Validator};
use crate::utils::error::Result;
use tokio_util::sync::CancellationToken;

/// 以先前失敗的子集重新進入管線。
///
/// 從去重階段重新開始，所以會依目前的既有集合再次判斷重複。
pub struct RetryCoordinator<'a, V, E, L> {
    pipeline: &'a ImportPipeline<V, E, L>,
}

impl<'a, V, E, L> RetryCoordinator<'a, V, E, L>
where
    V: Validator + 'static,
    E: ExistingSet,
    L: LoadSignal,
{
    pub fn new(pipeline: &'a ImportPipeline<V, E, L>) -> Self {
        Self { pipeline }
    }

    pub async fn retry(
        &self,
        selected: &[ValidationError],
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchResult> {
        let raw_batch: Vec<String> = selected
            .iter()
            .map(|error| error.locator.raw().to_string())
            .collect();

        tracing::info!("🔄 Retrying {} failed locators", raw_batch.len());
        self.pipeline.run(&raw_batch, sink, cancel).await
    }

    /// 只重試標記為可重試的失敗
    pub async fn retry_retryable(
        &self,
        prior: &BatchResult,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchResult> {
        let selected = prior.retryable_errors();
        tracing::info!(
            "Skipping {} non-retryable failures",
            prior.errors.len() - selected.len()
        );
        self.retry(&selected, sink, cancel).await
    }
}
