use crate::core::pipeline::ImportPipeline;
use crate::core::retry::RetryCoordinator;
use crate::domain::model::{BatchResult, ValidationError};
use crate::domain::ports::{ExistingSet, LoadSignal, ProgressSink, Validator};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use tokio_util::sync::CancellationToken;

/// 匯入流程的進入點：首次匯入與重試都經由同一條管線
pub struct ImportEngine<V, E, L> {
    pipeline: ImportPipeline<V, E, L>,
    monitor: SystemMonitor,
}

impl<V, E, L> ImportEngine<V, E, L>
where
    V: Validator + 'static,
    E: ExistingSet,
    L: LoadSignal,
{
    pub fn new(pipeline: ImportPipeline<V, E, L>) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: ImportPipeline<V, E, L>, enable_monitoring: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(enable_monitoring),
        }
    }

    pub fn pipeline(&self) -> &ImportPipeline<V, E, L> {
        &self.pipeline
    }

    pub async fn run(
        &self,
        raw_batch: &[String],
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchResult> {
        self.monitor.log_stats("Before import");
        let result = self.pipeline.run(raw_batch, sink, cancel).await;
        self.monitor.log_final_stats();
        result
    }

    pub async fn retry(
        &self,
        selected: &[ValidationError],
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchResult> {
        self.monitor.log_stats("Before retry");
        let result = RetryCoordinator::new(&self.pipeline)
            .retry(selected, sink, cancel)
            .await;
        self.monitor.log_final_stats();
        result
    }

    pub async fn retry_retryable(
        &self,
        prior: &BatchResult,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchResult> {
        self.monitor.log_stats("Before retry");
        let result = RetryCoordinator::new(&self.pipeline)
            .retry_retryable(prior, sink, cancel)
            .await;
        self.monitor.log_final_stats();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::registry::InMemoryRegistry;
    use crate::core::pipeline::SchedulerSettings;
    use crate::domain::model::{LoadLevel, Locator, SourceIdentity};
    use crate::domain::ports::{FixedLoad, LocatorStore, NoProgress};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct Flaky;

    /// 第一次呼叫失敗，之後成功
    #[derive(Default)]
    struct FailOnceValidator {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Validator for FailOnceValidator {
        type Error = Flaky;

        async fn validate_locator(&self, locator: &Locator) -> std::result::Result<SourceIdentity, Flaky> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(Flaky);
            }
            Ok(SourceIdentity {
                name: locator.canonical().to_string(),
                identifier: locator.canonical().to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_run_then_retry_recovers_transient_failure() {
        let pipeline = ImportPipeline::new(
            Arc::new(FailOnceValidator::default()),
            InMemoryRegistry::new(),
            FixedLoad(LoadLevel::Nominal),
        )
        .with_settings(SchedulerSettings {
            progress_interval: Duration::ZERO,
            chunk_pause: Duration::ZERO,
            dispatch_pause: Duration::ZERO,
        });
        let engine = ImportEngine::new(pipeline);
        let cancel = CancellationToken::new();

        let first = engine
            .run(&["https://solo.io/repo".to_string()], &NoProgress, &cancel)
            .await
            .unwrap();
        assert_eq!(first.errors.len(), 1);
        assert!(first.errors[0].retryable);

        let second = engine.retry_retryable(&first, &NoProgress, &cancel).await.unwrap();
        assert_eq!(second.added_locators.len(), 1);
        assert!(second.errors.is_empty());

        // once persisted, a further retry only reports a duplicate
        engine
            .pipeline()
            .existing()
            .persist(&second.added_locators)
            .unwrap();
        let third = engine.retry(&first.errors, &NoProgress, &cancel).await.unwrap();
        assert_eq!(third.duplicate_count, 1);
        assert!(third.added_locators.is_empty());
    }
}
