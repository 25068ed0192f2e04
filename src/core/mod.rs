pub mod aggregate;
pub mod classify;
pub mod concurrency;
pub mod dedup;
pub mod engine;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod retry;

pub use crate::domain::model::{BatchResult, LoadLevel, Locator, ProgressSnapshot, ValidationError};
pub use crate::domain::ports::{ExistingSet, LoadSignal, LocatorStore, ProgressSink, Validator};
pub use crate::utils::error::Result;
