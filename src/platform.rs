use std::path::Path;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub available_bytes: u64,
}

impl DiskUsage {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }
}

#[cfg(unix)]
pub fn disk_usage(path: &Path) -> Option<DiskUsage> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
    // SAFETY: `stats` is valid writable memory and `c_path` is a nul-terminated C string.
    let mut stats: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: pointers passed to libc are valid for the duration of this call.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stats) };
    if rc != 0 {
        return None;
    }

    let block_size = if stats.f_frsize > 0 {
        stats.f_frsize as u64
    } else {
        stats.f_bsize as u64
    };

    Some(DiskUsage {
        total_bytes: (stats.f_blocks as u64).saturating_mul(block_size),
        free_bytes: (stats.f_bfree as u64).saturating_mul(block_size),
        available_bytes: (stats.f_bavail as u64).saturating_mul(block_size),
    })
}

#[cfg(not(unix))]
pub fn disk_usage(_path: &Path) -> Option<DiskUsage> {
    None
}

/// Bytes in use on the volume holding `path`, the denominator for scan percentages.
pub fn used_bytes_estimate(path: &Path) -> Option<u64> {
    disk_usage(path)
        .map(|usage| usage.used_bytes())
        .filter(|used| *used > 0)
}

pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}
