use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

/// Point-in-time resource usage for the status and session components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub timestamp: i64,
    pub cpu_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub storage_used_gb: f64,
    pub storage_total_gb: f64,
    pub uptime_seconds: u64,
    pub process_count: usize,
    /// Resident memory of this process.
    pub process_rss_mb: u64,
}

impl SystemSnapshot {
    /// Blocks for the CPU sampling interval; prefer [`SystemSnapshot::capture_async`]
    /// from async code.
    pub fn capture() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu();

        let disks = Disks::new_with_refreshed_list();
        let root_disk = disks
            .iter()
            .find(|disk| disk.mount_point() == std::path::Path::new("/"))
            .or_else(|| disks.iter().next());
        let (storage_total_gb, storage_used_gb) = root_disk
            .map(|disk| {
                let total = disk.total_space() as f64 / 1024f64.powi(3);
                let available = disk.available_space() as f64 / 1024f64.powi(3);
                (total, total - available)
            })
            .unwrap_or((0.0, 0.0));

        let process_rss_mb = sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| sys.process(pid))
            .map(|process| process.memory() / 1024 / 1024)
            .unwrap_or(0);

        Self {
            timestamp: chrono::Utc::now().timestamp(),
            cpu_percent: sys.global_cpu_info().cpu_usage(),
            memory_used_mb: sys.used_memory() / 1024 / 1024,
            memory_total_mb: sys.total_memory() / 1024 / 1024,
            storage_used_gb,
            storage_total_gb,
            uptime_seconds: System::uptime(),
            process_count: sys.processes().len(),
            process_rss_mb,
        }
    }

    pub async fn capture_async() -> Self {
        tokio::task::spawn_blocking(Self::capture)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("System snapshot failed: {}", e);
                Self::default()
            })
    }

    pub fn memory_percent(&self) -> f32 {
        percent(self.memory_used_mb as f64, self.memory_total_mb as f64)
    }

    pub fn storage_percent(&self) -> f32 {
        percent(self.storage_used_gb, self.storage_total_gb)
    }

    pub fn to_concise_string(&self) -> String {
        format!(
            "CPU: {:.1}%\nMemory: {}/{} MB ({:.1}%)\nStorage: {:.1}/{:.1} GB ({:.1}%)\nProcesses: {}",
            self.cpu_percent,
            self.memory_used_mb,
            self.memory_total_mb,
            self.memory_percent(),
            self.storage_used_gb,
            self.storage_total_gb,
            self.storage_percent(),
            self.process_count,
        )
    }
}

fn percent(used: f64, total: f64) -> f32 {
    if total <= 0.0 {
        return 0.0;
    }
    (used / total * 100.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture() {
        let snapshot = SystemSnapshot::capture();
        assert!(snapshot.memory_total_mb > 0);
        assert!(snapshot.process_count > 0);
        assert!(snapshot.memory_percent() <= 100.0);
    }

    #[test]
    fn test_percentages_handle_zero_totals() {
        let snapshot = SystemSnapshot::default();
        assert_eq!(snapshot.memory_percent(), 0.0);
        assert_eq!(snapshot.storage_percent(), 0.0);
        assert!(snapshot.to_concise_string().contains("CPU: 0.0%"));
    }
}
