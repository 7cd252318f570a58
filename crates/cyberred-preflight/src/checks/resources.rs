//! Disk-free and memory-available checks via `sysinfo`.

use std::path::PathBuf;

use async_trait::async_trait;
use sysinfo::{Disks, System};

use crate::check::{CheckResult, PreflightCheck, Priority};

const MIN_FREE_RATIO: f64 = 0.10;

pub struct DiskFreeCheck {
    path: PathBuf,
}

impl DiskFreeCheck {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl PreflightCheck for DiskFreeCheck {
    fn name(&self) -> &str {
        "disk_free"
    }

    fn priority(&self) -> Priority {
        Priority::P1
    }

    async fn execute(&self) -> CheckResult {
        let path = self.path.clone();
        let name = self.name().to_string();
        let priority = self.priority();
        tokio::task::spawn_blocking(move || {
            let disks = Disks::new_with_refreshed_list();
            let mut best: Option<(&sysinfo::Disk, usize)> = None;
            for disk in disks.list() {
                let mount = disk.mount_point();
                let depth = mount.components().count();
                if path.starts_with(mount) {
                    if best.map(|(_, best_depth)| depth > best_depth).unwrap_or(true) {
                        best = Some((disk, depth));
                    }
                }
            }
            match best {
                Some((disk, _)) => {
                    let total = disk.total_space();
                    let available = disk.available_space();
                    if total == 0 {
                        return CheckResult::warn(&name, priority, "disk size unavailable");
                    }
                    let ratio = available as f64 / total as f64;
                    if ratio < MIN_FREE_RATIO {
                        CheckResult::warn(&name, priority, format!("disk free {:.1}% below 10% threshold", ratio * 100.0))
                    } else {
                        CheckResult::pass(&name, priority, format!("disk free {:.1}%", ratio * 100.0))
                    }
                }
                None => CheckResult::warn(&name, priority, "no mounted disk found for storage path"),
            }
        })
        .await
        .unwrap_or_else(|e| CheckResult::warn("disk_free", Priority::P1, format!("check panicked: {e}")))
    }
}

pub struct MemoryAvailableCheck;

#[async_trait]
impl PreflightCheck for MemoryAvailableCheck {
    fn name(&self) -> &str {
        "memory_available"
    }

    fn priority(&self) -> Priority {
        Priority::P1
    }

    async fn execute(&self) -> CheckResult {
        let name = self.name().to_string();
        let priority = self.priority();
        tokio::task::spawn_blocking(move || {
            let mut sys = System::new();
            sys.refresh_memory();
            let total = sys.total_memory();
            let available = sys.available_memory();
            if total == 0 {
                return CheckResult::warn(&name, priority, "memory size unavailable");
            }
            let ratio = available as f64 / total as f64;
            if ratio < MIN_FREE_RATIO {
                CheckResult::warn(&name, priority, format!("memory free {:.1}% below 10% threshold", ratio * 100.0))
            } else {
                CheckResult::pass(&name, priority, format!("memory free {:.1}%", ratio * 100.0))
            }
        })
        .await
        .unwrap_or_else(|e| CheckResult::warn("memory_available", Priority::P1, format!("check panicked: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckStatus;

    #[tokio::test]
    async fn memory_check_runs_without_panicking() {
        let check = MemoryAvailableCheck;
        let result = check.execute().await;
        assert!(matches!(result.status, CheckStatus::Pass | CheckStatus::Warn));
    }

    #[tokio::test]
    async fn disk_check_runs_without_panicking() {
        let check = DiskFreeCheck::new(std::env::temp_dir());
        let result = check.execute().await;
        assert!(matches!(result.status, CheckStatus::Pass | CheckStatus::Warn));
    }
}
