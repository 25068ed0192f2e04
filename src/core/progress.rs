use crate::domain::model::{Outcome, ProgressSnapshot};
use crate::domain::ports::ProgressSink;
use std::time::{Duration, Instant};

pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(300);

/// 累計每個項目的結果，並以固定間隔節流輸出進度快照。
///
/// 最終快照 (`processed == total`) 一律立即輸出。只由排程器持有並寫入。
pub struct ProgressTracker<'a> {
    snapshot: ProgressSnapshot,
    sink: &'a dyn ProgressSink,
    interval: Duration,
    last_emit: Option<Instant>,
    final_emitted: bool,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a dyn ProgressSink, interval: Duration) -> Self {
        Self {
            snapshot: ProgressSnapshot::default(),
            sink,
            interval,
            last_emit: None,
            final_emitted: false,
        }
    }

    /// 驗證開始前設定總數、重複數與已直接判定失敗的數量
    pub fn seed(&mut self, total: usize, duplicates: usize, prefailed: usize) {
        self.snapshot = ProgressSnapshot {
            total,
            processed: prefailed,
            succeeded: 0,
            failed: prefailed,
            duplicates,
        };
        self.final_emitted = false;
        self.last_emit = None;
        self.maybe_emit();
    }

    pub fn record(&mut self, outcome: &Outcome) {
        if self.snapshot.processed >= self.snapshot.total {
            tracing::warn!("Ignoring outcome recorded after all items were processed");
            return;
        }
        if outcome.is_success() {
            self.snapshot.succeeded += 1;
        } else {
            self.snapshot.failed += 1;
        }
        self.snapshot.processed += 1;
        self.maybe_emit();
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot
    }

    /// 不受節流限制，立即輸出目前的快照 (用於取消後的最後一次更新)
    pub fn flush(&mut self) {
        if self.final_emitted {
            return;
        }
        self.sink.publish(self.snapshot);
        self.last_emit = Some(Instant::now());
        self.final_emitted = self.snapshot.is_complete();
    }

    fn maybe_emit(&mut self) {
        let now = Instant::now();
        let is_final = self.snapshot.is_complete();
        if is_final && self.final_emitted {
            return;
        }

        let due = self
            .last_emit
            .map_or(true, |last| now.duration_since(last) >= self.interval);

        if due || is_final {
            self.sink.publish(self.snapshot);
            self.last_emit = Some(now);
            self.final_emitted = is_final;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ErrorCategory, Locator, SourceIdentity, ValidationError};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        snapshots: Mutex<Vec<ProgressSnapshot>>,
    }

    impl ProgressSink for Recorder {
        fn publish(&self, snapshot: ProgressSnapshot) {
            self.snapshots.lock().unwrap().push(snapshot);
        }
    }

    fn success() -> Outcome {
        Outcome::Success {
            identity: SourceIdentity {
                name: "Repo".to_string(),
                identifier: "io.repo".to_string(),
            },
        }
    }

    fn failure() -> Outcome {
        Outcome::Failure(ValidationError {
            locator: Locator::from_parts("https://x.io", "https://x.io"),
            raw_error: "timeout".to_string(),
            category: ErrorCategory::Network,
            retryable: true,
            timestamp: chrono::Utc::now(),
        })
    }

    #[test]
    fn test_fast_batch_is_throttled_but_final_update_is_emitted() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(&recorder, Duration::from_secs(60));

        tracker.seed(5, 2, 0);
        for _ in 0..4 {
            tracker.record(&success());
        }
        tracker.record(&failure());

        let snapshots = recorder.snapshots.lock().unwrap();
        // initial seed + final update only
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].processed, 0);
        assert_eq!(snapshots[0].duplicates, 2);
        let last = snapshots.last().unwrap();
        assert_eq!(last.processed, 5);
        assert_eq!(last.succeeded, 4);
        assert_eq!(last.failed, 1);
        assert_eq!(last.processed, last.succeeded + last.failed);
    }

    #[test]
    fn test_zero_interval_emits_every_update() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(&recorder, Duration::ZERO);

        tracker.seed(3, 0, 0);
        tracker.record(&success());
        tracker.record(&failure());
        tracker.record(&success());

        let snapshots = recorder.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 4);
        assert!(snapshots.iter().all(|s| s.processed == s.succeeded + s.failed));
        assert!(snapshots.iter().all(|s| s.processed <= s.total));
    }

    #[test]
    fn test_empty_batch_emits_terminal_signal_once() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(&recorder, Duration::from_secs(60));

        tracker.seed(0, 4, 0);

        let snapshots = recorder.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].is_complete());
        assert_eq!(snapshots[0].duplicates, 4);
    }

    #[test]
    fn test_prefailed_items_count_as_processed() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(&recorder, Duration::from_secs(60));

        tracker.seed(3, 0, 2);
        assert_eq!(tracker.snapshot().processed, 2);
        assert_eq!(tracker.snapshot().failed, 2);

        tracker.record(&success());
        assert!(tracker.snapshot().is_complete());
        assert_eq!(recorder.snapshots.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_flush_bypasses_throttle() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(&recorder, Duration::from_secs(60));

        tracker.seed(4, 0, 0);
        tracker.record(&success());
        tracker.record(&failure());
        tracker.flush();

        let snapshots = recorder.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].processed, 2);
        assert_eq!(snapshots[1].failed, 1);
    }

    #[test]
    fn test_flush_after_final_update_is_a_no_op() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(&recorder, Duration::from_secs(60));

        tracker.seed(1, 0, 0);
        tracker.record(&success());
        tracker.flush();

        assert_eq!(recorder.snapshots.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_records_past_total_are_ignored() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(&recorder, Duration::ZERO);

        tracker.seed(1, 0, 0);
        tracker.record(&success());
        tracker.record(&success());

        assert_eq!(tracker.snapshot().processed, 1);
        assert_eq!(recorder.snapshots.lock().unwrap().len(), 2);
    }
}
