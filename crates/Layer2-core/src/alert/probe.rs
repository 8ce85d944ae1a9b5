//! Resource Probe - 알림 엔진용 리소스 샘플링
//!
//! 샘플링은 블로킹이다 (CPU 사용률은 두 번 측정해야 한다). 호출자는
//! `spawn_blocking` 위에서 실행해야 한다.

use super::types::AlertCategory;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sysinfo::{Disks, System};

/// Percent-usage source for resource categories
pub trait ResourceProbe: Send {
    /// Usage percent (0-100) for a resource category, None when unavailable
    fn sample(&mut self, category: AlertCategory) -> Option<f64>;
}

// ============================================================================
// SysinfoProbe
// ============================================================================

/// Host probe backed by `sysinfo`
pub struct SysinfoProbe {
    system: System,
    disk_mount: PathBuf,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self::with_mount("/")
    }

    /// Probe disk usage of a specific mount point
    pub fn with_mount(mount: impl Into<PathBuf>) -> Self {
        Self {
            system: System::new(),
            disk_mount: mount.into(),
        }
    }

    fn cpu_percent(&mut self) -> f64 {
        self.system.refresh_cpu();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        self.system.refresh_cpu();
        self.system.global_cpu_info().cpu_usage() as f64
    }

    fn memory_percent(&mut self) -> Option<f64> {
        self.system.refresh_memory();
        percent(self.system.used_memory(), self.system.total_memory())
    }

    fn disk_percent(&self) -> Option<f64> {
        let disks = Disks::new_with_refreshed_list();
        disk_usage_for(&disks, &self.disk_mount)
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SysinfoProbe {
    fn sample(&mut self, category: AlertCategory) -> Option<f64> {
        match category {
            AlertCategory::Cpu => Some(self.cpu_percent()),
            AlertCategory::Memory => self.memory_percent(),
            AlertCategory::Disk => self.disk_percent(),
            AlertCategory::Security => None,
        }
    }
}

/// Usage percent of the disk mounted at `mount`
fn disk_usage_for(disks: &Disks, mount: &Path) -> Option<f64> {
    let disk = disks.list().iter().find(|d| d.mount_point() == mount)?;
    let total = disk.total_space();
    percent(total.saturating_sub(disk.available_space()), total)
}

pub(crate) fn percent(used: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(used as f64 / total as f64 * 100.0)
    }
}

// ============================================================================
// StaticProbe
// ============================================================================

/// Fixed values, shared handle for updating them between checks
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    values: Arc<Mutex<HashMap<AlertCategory, f64>>>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, category: AlertCategory, value: f64) -> Self {
        self.set(category, value);
        self
    }

    pub fn set(&self, category: AlertCategory, value: f64) {
        self.values.lock().insert(category, value);
    }
}

impl ResourceProbe for StaticProbe {
    fn sample(&mut self, category: AlertCategory) -> Option<f64> {
        self.values.lock().get(&category).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(50, 200), Some(25.0));
        assert_eq!(percent(1, 0), None);
    }

    #[test]
    fn test_static_probe_shared() {
        let probe = StaticProbe::new().with(AlertCategory::Cpu, 10.0);
        let mut handle = probe.clone();
        probe.set(AlertCategory::Cpu, 95.0);
        assert_eq!(handle.sample(AlertCategory::Cpu), Some(95.0));
        assert_eq!(handle.sample(AlertCategory::Disk), None);
    }

    #[test]
    fn test_sysinfo_memory_in_range() {
        let mut probe = SysinfoProbe::new();
        if let Some(value) = probe.sample(AlertCategory::Memory) {
            assert!((0.0..=100.0).contains(&value));
        }
        assert_eq!(probe.sample(AlertCategory::Security), None);
    }
}
