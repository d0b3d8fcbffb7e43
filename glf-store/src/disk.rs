//! Free space on the volume holding the log directory

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskSpace {
    pub free_bytes: u64,
    pub total_bytes: u64,
}

impl DiskSpace {
    pub fn percent_free(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.free_bytes as f64 * 100.0 / self.total_bytes as f64
    }
}

/// Space available to unprivileged writers, `None` if the volume can't be queried
#[cfg(unix)]
pub fn disk_space(path: &Path) -> Option<DiskSpace> {
    use nix::sys::statvfs::statvfs;

    match statvfs(path) {
        Ok(stat) => {
            let fragment = stat.fragment_size() as u64;
            Some(DiskSpace {
                free_bytes: (stat.blocks_available() as u64).saturating_mul(fragment),
                total_bytes: (stat.blocks() as u64).saturating_mul(fragment),
            })
        }
        Err(e) => {
            log::debug!("statvfs({}) failed: {}", path.display(), e);
            None
        }
    }
}

#[cfg(not(unix))]
pub fn disk_space(_path: &Path) -> Option<DiskSpace> {
    None
}
