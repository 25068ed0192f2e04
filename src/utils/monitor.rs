use crate::domain::model::LoadLevel;
use crate::domain::ports::LoadSignal;
#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

/// 由 CPU 與記憶體使用率 (百分比) 推得負載等級，取兩者較嚴重者
pub fn load_level_for(cpu_percent: f32, memory_percent: f32) -> LoadLevel {
    fn level(percent: f32) -> LoadLevel {
        if percent < 60.0 {
            LoadLevel::Nominal
        } else if percent < 80.0 {
            LoadLevel::Fair
        } else if percent < 95.0 {
            LoadLevel::Serious
        } else {
            LoadLevel::Critical
        }
    }
    level(cpu_percent).max(level(memory_percent))
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct SystemStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub memory_usage_percent: f32,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

/// 系統負載訊號與執行統計
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    peak_memory: Mutex<u64>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let mut system = System::new();
        // 第一次刷新作為 CPU 使用率的基準
        system.refresh_cpu_usage();
        system.refresh_memory();

        Self {
            system: Mutex::new(system),
            pid: sysinfo::get_current_pid().ok(),
            start_time: Instant::now(),
            peak_memory: Mutex::new(0),
            enabled,
        }
    }

    pub fn get_stats(&self) -> Option<SystemStats> {
        if !self.enabled {
            return None;
        }

        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_memory();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let process = system.process(pid)?;
        let memory_mb = process.memory() / 1024 / 1024;
        let total_memory = system.total_memory() / 1024 / 1024;
        let memory_percent = if total_memory > 0 {
            (memory_mb as f32 / total_memory as f32) * 100.0
        } else {
            0.0
        };

        let mut peak = self.peak_memory.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }

        Some(SystemStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            memory_usage_percent: memory_percent,
            peak_memory_mb: *peak,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    pub fn log_stats(&self, phase: &str) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB ({:.1}%), Peak: {}MB, Time: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.memory_usage_percent,
                stats.peak_memory_mb,
                stats.elapsed_time
            );
        }
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed_time,
                stats.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl LoadSignal for SystemMonitor {
    /// 只刷新整體 CPU 與記憶體；與統計紀錄是否啟用無關
    fn sample(&self) -> LoadLevel {
        let Ok(mut system) = self.system.lock() else {
            return LoadLevel::Nominal;
        };
        system.refresh_cpu_usage();
        system.refresh_memory();

        let total = system.total_memory();
        let memory_percent = if total > 0 {
            system.used_memory() as f32 / total as f32 * 100.0
        } else {
            0.0
        };
        let level = load_level_for(system.global_cpu_usage(), memory_percent);
        tracing::debug!(
            "Load sample: CPU {:.1}%, memory {:.1}% -> {}",
            system.global_cpu_usage(),
            memory_percent,
            level
        );
        level
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 環境提供空實現，負載永遠視為正常
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_stats(&self, _phase: &str) {}

    pub fn log_final_stats(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(not(feature = "cli"))]
impl LoadSignal for SystemMonitor {
    fn sample(&self) -> LoadLevel {
        LoadLevel::Nominal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_level_thresholds() {
        assert_eq!(load_level_for(10.0, 20.0), LoadLevel::Nominal);
        assert_eq!(load_level_for(65.0, 20.0), LoadLevel::Fair);
        assert_eq!(load_level_for(10.0, 85.0), LoadLevel::Serious);
        assert_eq!(load_level_for(99.0, 10.0), LoadLevel::Critical);
        assert_eq!(load_level_for(70.0, 96.0), LoadLevel::Critical);
    }

    #[test]
    fn test_disabled_monitor_reports_no_stats_but_still_samples() {
        let monitor = SystemMonitor::new(false);
        assert!(!monitor.is_enabled());
        monitor.log_stats("test");
        // sampling must never panic regardless of host load
        let _ = monitor.sample();
    }
}
