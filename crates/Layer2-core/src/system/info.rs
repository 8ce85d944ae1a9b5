//! Host introspection snapshots
//!
//! 모든 수집 함수는 블로킹이다 (CPU 사용률 측정에 최소 간격 대기가 필요).

use chrono::{Local, TimeZone};
use std::path::{Path, PathBuf};
use sysinfo::{Disks, Networks, System};

/// Processes listed by `/ps`
pub const TOP_PROCESSES: usize = 10;

// ============================================================================
// SystemSnapshot
// ============================================================================

/// `/info` 결과
#[derive(Debug, Clone)]
pub struct SystemSnapshot {
    pub os: String,
    pub kernel: String,
    pub hostname: String,
    pub arch: String,
    pub cpu_cores: usize,
    pub cpu_percent: f64,
    pub memory_total: u64,
    pub memory_used: u64,
    pub disk_total: u64,
    pub disk_used: u64,
    pub boot_time: u64,
    pub working_directory: PathBuf,
}

impl SystemSnapshot {
    /// Collect host info; `working_directory` is the session cursor
    pub fn collect(working_directory: &Path) -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_cpu();
        system.refresh_memory();

        let disks = Disks::new_with_refreshed_list();
        let (disk_total, disk_used) = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .map(|d| {
                let total = d.total_space();
                (total, total.saturating_sub(d.available_space()))
            })
            .unwrap_or((0, 0));

        Self {
            os: System::long_os_version()
                .or_else(System::name)
                .unwrap_or_else(|| std::env::consts::OS.to_string()),
            kernel: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            arch: System::cpu_arch().unwrap_or_else(|| std::env::consts::ARCH.to_string()),
            cpu_cores: system.cpus().len(),
            cpu_percent: system.global_cpu_info().cpu_usage() as f64,
            memory_total: system.total_memory(),
            memory_used: system.used_memory(),
            disk_total,
            disk_used,
            boot_time: System::boot_time(),
            working_directory: working_directory.to_path_buf(),
        }
    }

    pub fn memory_percent(&self) -> f64 {
        ratio(self.memory_used, self.memory_total)
    }

    pub fn disk_percent(&self) -> f64 {
        ratio(self.disk_used, self.disk_total)
    }

    pub fn render(&self) -> String {
        let boot = Local
            .timestamp_opt(self.boot_time as i64, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        format!(
            "System information\n\
             OS: {}\n\
             Kernel: {}\n\
             Hostname: {}\n\
             Architecture: {}\n\
             CPU: {} cores, {:.1}% {}\n\
             Memory: {} / {} ({:.1}%) {}\n\
             Disk: {} / {} ({:.1}%) {}\n\
             Boot time: {}\n\
             Working directory: {}",
            self.os,
            self.kernel,
            self.hostname,
            self.arch,
            self.cpu_cores,
            self.cpu_percent,
            progress_bar(self.cpu_percent, 10),
            format_size(self.memory_used),
            format_size(self.memory_total),
            self.memory_percent(),
            progress_bar(self.memory_percent(), 10),
            format_size(self.disk_used),
            format_size(self.disk_total),
            self.disk_percent(),
            progress_bar(self.disk_percent(), 10),
            boot,
            self.working_directory.display(),
        )
    }
}

// ============================================================================
// Processes
// ============================================================================

#[derive(Debug, Clone)]
pub struct ProcessEntry {
    pub pid: String,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub status: String,
}

/// `/ps` 결과: CPU 사용률 상위 프로세스
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub top: Vec<ProcessEntry>,
    pub total: usize,
}

impl ProcessSnapshot {
    pub fn collect(limit: usize) -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_processes();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_processes();

        let total_memory = system.total_memory();
        let mut entries: Vec<ProcessEntry> = system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry {
                pid: pid.to_string(),
                name: process.name().to_string(),
                cpu_percent: process.cpu_usage() as f64,
                memory_percent: ratio(process.memory(), total_memory),
                status: process.status().to_string(),
            })
            .collect();

        let total = entries.len();
        sort_by_cpu(&mut entries);
        entries.truncate(limit);

        Self {
            top: entries,
            total,
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("Top {} processes by CPU\n", self.top.len());
        for entry in &self.top {
            out.push_str(&format!(
                "{:>7}  {:<20} CPU {:>5.1}%  MEM {:>5.1}%  {}\n",
                entry.pid,
                truncate_name(&entry.name, 20),
                entry.cpu_percent,
                entry.memory_percent,
                entry.status
            ));
        }
        out.push_str(&format!("Total processes: {}", self.total));
        out
    }
}

fn sort_by_cpu(entries: &mut [ProcessEntry]) {
    entries.sort_by(|a, b| {
        b.cpu_percent
            .partial_cmp(&a.cpu_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn truncate_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        name.chars().take(width.saturating_sub(1)).chain(['~']).collect()
    }
}

// ============================================================================
// Network
// ============================================================================

#[derive(Debug, Clone)]
pub struct InterfaceEntry {
    pub name: String,
    pub received: u64,
    pub transmitted: u64,
}

/// `/net` 결과
#[derive(Debug, Clone)]
pub struct NetworkSnapshot {
    pub interfaces: Vec<InterfaceEntry>,
}

impl NetworkSnapshot {
    pub fn collect() -> Self {
        let networks = Networks::new_with_refreshed_list();
        let mut interfaces: Vec<InterfaceEntry> = networks
            .list()
            .iter()
            .map(|(name, data)| InterfaceEntry {
                name: name.clone(),
                received: data.total_received(),
                transmitted: data.total_transmitted(),
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        Self { interfaces }
    }

    pub fn render(&self) -> String {
        if self.interfaces.is_empty() {
            return "No network interfaces found".to_string();
        }
        let mut out = String::from("Network interfaces");
        for iface in &self.interfaces {
            out.push_str(&format!(
                "\n{}: down {} / up {}",
                iface.name,
                format_size(iface.received),
                format_size(iface.transmitted)
            ));
        }
        out
    }
}

// ============================================================================
// Disk
// ============================================================================

#[derive(Debug, Clone)]
pub struct MountEntry {
    pub mount_point: PathBuf,
    pub file_system: String,
    pub total: u64,
    pub available: u64,
}

impl MountEntry {
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }

    pub fn percent(&self) -> f64 {
        ratio(self.used(), self.total)
    }
}

/// `/disk` 결과
#[derive(Debug, Clone)]
pub struct DiskSnapshot {
    pub mounts: Vec<MountEntry>,
}

impl DiskSnapshot {
    pub fn collect() -> Self {
        let disks = Disks::new_with_refreshed_list();
        let mut mounts: Vec<MountEntry> = disks
            .list()
            .iter()
            .map(|disk| MountEntry {
                mount_point: disk.mount_point().to_path_buf(),
                file_system: disk.file_system().to_string_lossy().into_owned(),
                total: disk.total_space(),
                available: disk.available_space(),
            })
            .collect();
        mounts.sort_by(|a, b| a.mount_point.cmp(&b.mount_point));
        Self { mounts }
    }

    pub fn render(&self) -> String {
        if self.mounts.is_empty() {
            return "No disks found".to_string();
        }
        let mut out = String::from("Disk usage");
        for mount in &self.mounts {
            out.push_str(&format!(
                "\n{} ({})\n  {} {:.1}%\n  total {} / used {} / free {}",
                mount.mount_point.display(),
                mount.file_system,
                progress_bar(mount.percent(), 10),
                mount.percent(),
                format_size(mount.total),
                format_size(mount.used()),
                format_size(mount.available),
            ));
        }
        out
    }
}

// ============================================================================
// Formatting helpers
// ============================================================================

fn ratio(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

/// 바이트를 사람이 읽기 좋은 형식으로 변환
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// `[####------]` style bar
pub fn progress_bar(percent: f64, width: usize) -> String {
    let clamped = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((clamped / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 10), "[----------]");
        assert_eq!(progress_bar(50.0, 10), "[#####-----]");
        assert_eq!(progress_bar(250.0, 4), "[####]");
        assert_eq!(progress_bar(f64::NAN, 4), "[----]");
    }

    #[test]
    fn test_sort_by_cpu() {
        let entry = |pid: &str, cpu: f64| ProcessEntry {
            pid: pid.into(),
            name: "p".into(),
            cpu_percent: cpu,
            memory_percent: 0.0,
            status: "Run".into(),
        };
        let mut entries = vec![entry("1", 1.0), entry("2", 30.0), entry("3", 5.0)];
        sort_by_cpu(&mut entries);
        let order: Vec<_> = entries.iter().map(|e| e.pid.as_str()).collect();
        assert_eq!(order, vec!["2", "3", "1"]);
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("bash", 20), "bash");
        assert_eq!(truncate_name("abcdefgh", 5), "abcd~");
    }

    #[test]
    fn test_disk_render() {
        let snapshot = DiskSnapshot {
            mounts: vec![MountEntry {
                mount_point: PathBuf::from("/"),
                file_system: "ext4".into(),
                total: 100 * 1024 * 1024,
                available: 25 * 1024 * 1024,
            }],
        };
        let text = snapshot.render();
        assert!(text.contains("/ (ext4)"));
        assert!(text.contains("75.0%"));
        assert!(text.contains("[########--]"));
    }

    #[test]
    fn test_system_snapshot_collects() {
        let dir = std::env::temp_dir();
        let snapshot = SystemSnapshot::collect(&dir);
        assert!(snapshot.memory_percent() >= 0.0);
        assert!(snapshot.render().contains(&dir.display().to_string()));
    }
}
