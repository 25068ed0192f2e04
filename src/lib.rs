pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{http_validator::HttpValidator, registry::FileRegistry, registry::InMemoryRegistry};
pub use config::ImporterConfig;
pub use core::{engine::ImportEngine, pipeline::ImportPipeline, pipeline::SchedulerSettings};
pub use domain::model::{BatchResult, LoadLevel, Locator, ProgressSnapshot, ValidationError};
pub use utils::error::{ImportError, Result};
