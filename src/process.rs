//! Process management module
//!
//! PID 文件的写入与清理

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Process management utilities
pub struct ProcessManager;

impl ProcessManager {
    /// Write PID file
    ///
    /// 未配置路径时不做任何事；已存在的文件会被覆盖（上次异常退出遗留）。
    pub fn write_pid_file(pid_path: Option<&str>) -> Result<Option<PathBuf>> {
        let Some(path_str) = pid_path else {
            return Ok(None);
        };
        let path = Path::new(path_str);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create PID file directory: {parent:?}"))?;
        }

        if let Ok(previous) = fs::read_to_string(path) {
            warn!(
                "Overwriting existing PID file {:?} (previous PID: {})",
                path,
                previous.trim()
            );
        }

        let pid = std::process::id();
        fs::write(path, format!("{pid}\n"))
            .with_context(|| format!("Failed to write PID file: {path:?}"))?;

        info!("PID file written: {:?} (PID: {})", path, pid);
        Ok(Some(path.to_path_buf()))
    }

    /// Remove PID file
    pub fn remove_pid_file(pid_path: Option<&PathBuf>) {
        let Some(path) = pid_path else {
            return;
        };
        match fs::remove_file(path) {
            Ok(()) => info!("PID file removed: {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove PID file {:?}: {}", path, e),
        }
    }
}

/// Guard to ensure PID file is removed on drop
pub struct PidFileGuard {
    path: Option<PathBuf>,
}

impl PidFileGuard {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        ProcessManager::remove_pid_file(self.path.as_ref());
    }
}
