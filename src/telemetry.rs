use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Disks, System};
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::notify::{Event, Notifier};

pub const TELEMETRY_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub cpu: f32,
    pub ram: f32,
    /// Used space on the first disk, in percent
    pub disk: f32,
    pub time: String,
}

pub fn percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64 * 100.0) as f32
    }
}

pub struct TelemetrySampler {
    sys: System,
    disks: Disks,
}

impl TelemetrySampler {
    pub fn new() -> Self {
        Self {
            sys: System::new(),
            disks: Disks::new_with_refreshed_list(),
        }
    }

    pub fn sample(&mut self) -> SystemStats {
        self.sys.refresh_cpu();
        self.sys.refresh_memory();
        self.disks.refresh();

        let disk = self
            .disks
            .list()
            .first()
            .map(|d| percent(d.total_space().saturating_sub(d.available_space()), d.total_space()))
            .unwrap_or(0.0);

        SystemStats {
            cpu: self.sys.global_cpu_info().cpu_usage(),
            ram: percent(self.sys.used_memory(), self.sys.total_memory()),
            disk,
            time: chrono::Local::now().format("%H:%M").to_string(),
        }
    }
}

impl Default for TelemetrySampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit [`Event::SystemStats`] every `every` until the task is aborted
pub fn spawn(notifier: Arc<dyn Notifier>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sampler = TelemetrySampler::new();
        let mut ticker = interval(every);
        loop {
            ticker.tick().await;
            notifier.notify(Event::SystemStats(sampler.sample()));
        }
    })
}
