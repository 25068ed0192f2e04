use crate::domain::model::{LoadLevel, Locator, ProgressSnapshot, SourceIdentity};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 遠端驗證：對單一正規化位址做網路檢查。必須可被多個 worker 同時呼叫。
#[async_trait]
pub trait Validator: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn validate_locator(&self, locator: &Locator) -> std::result::Result<SourceIdentity, Self::Error>;
}

/// 呼叫端既有集合的成員查詢。回傳錯誤代表集合不可用，整個批次會中止。
pub trait ExistingSet: Send + Sync {
    fn is_already_present(&self, locator: &Locator) -> Result<bool>;
}

/// 匯入完成後保存新位址的外部儲存，回傳實際新增的數量
pub trait LocatorStore: ExistingSet {
    fn persist(&self, locators: &[Locator]) -> Result<usize>;
}

/// 系統負載訊號，取樣必須便宜且不阻塞
pub trait LoadSignal: Send + Sync {
    fn sample(&self) -> LoadLevel;
}

/// 進度輸出端，不可阻塞排程器
pub trait ProgressSink: Send + Sync {
    fn publish(&self, snapshot: ProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressSnapshot) + Send + Sync,
{
    fn publish(&self, snapshot: ProgressSnapshot) {
        self(snapshot)
    }
}

impl ProgressSink for tokio::sync::watch::Sender<ProgressSnapshot> {
    fn publish(&self, snapshot: ProgressSnapshot) {
        // 沒有訂閱者時直接丟棄
        self.send_replace(snapshot);
    }
}

impl ProgressSink for tokio::sync::mpsc::UnboundedSender<ProgressSnapshot> {
    fn publish(&self, snapshot: ProgressSnapshot) {
        let _ = self.send(snapshot);
    }
}

/// 不輸出任何進度
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn publish(&self, _snapshot: ProgressSnapshot) {}
}

/// 固定負載等級，用於測試或不需監控的環境
#[derive(Debug, Clone, Copy)]
pub struct FixedLoad(pub LoadLevel);

impl LoadSignal for FixedLoad {
    fn sample(&self) -> LoadLevel {
        self.0
    }
}
