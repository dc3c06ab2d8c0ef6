//! Global cache size limit
//!
//! The global limit is the number of bytes all renderer object caches may use
//! together. Unless a preference overrides it, the default scales with the
//! amount of physical memory on the machine.

/// Baseline budget used on machines with little or unknown memory (8 MB)
pub const DEFAULT_GLOBAL_SIZE_LIMIT: u64 = 8 * 1024 * 1024;

/// Physical memory in MB at which the baseline is doubled
pub const MEDIUM_MEMORY_MB: u64 = 512;

/// Physical memory at which the baseline is quadrupled (1000, not 1024)
pub const LARGE_MEMORY_MB: u64 = 1000;

/// Default limit for a machine with `physical_ram_bytes` of memory
///
/// `None` (unknown memory size) yields the baseline.
pub fn default_size_limit_for(physical_ram_bytes: Option<u64>) -> u64 {
    let Some(bytes) = physical_ram_bytes else {
        return DEFAULT_GLOBAL_SIZE_LIMIT;
    };

    let ram_mb = bytes / (1024 * 1024);
    if ram_mb >= LARGE_MEMORY_MB {
        DEFAULT_GLOBAL_SIZE_LIMIT * 4
    } else if ram_mb >= MEDIUM_MEMORY_MB {
        DEFAULT_GLOBAL_SIZE_LIMIT * 2
    } else {
        DEFAULT_GLOBAL_SIZE_LIMIT
    }
}

/// Default limit for the current machine
pub fn default_size_limit() -> u64 {
    let ram = physical_ram_bytes();
    let limit = default_size_limit_for(ram);
    tracing::debug!(physical_ram = ?ram, limit, "derived default cache size limit");
    limit
}

/// Total physical memory, if the platform exposes it
#[cfg(target_os = "linux")]
pub fn physical_ram_bytes() -> Option<u64> {
    let mut info = std::mem::MaybeUninit::<libc::sysinfo>::uninit();
    let rc = unsafe { libc::sysinfo(info.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    let info = unsafe { info.assume_init() };
    Some((info.totalram as u64).saturating_mul(info.mem_unit as u64))
}

/// Total physical memory, if the platform exposes it
#[cfg(target_os = "macos")]
pub fn physical_ram_bytes() -> Option<u64> {
    use std::ffi::CString;
    use std::mem::size_of;
    use std::ptr;

    let key = CString::new("hw.memsize").ok()?;
    let mut value: u64 = 0;
    let mut len = size_of::<u64>();
    let rc = unsafe {
        libc::sysctlbyname(
            key.as_ptr(),
            &mut value as *mut u64 as *mut libc::c_void,
            &mut len,
            ptr::null_mut(),
            0,
        )
    };
    if rc == 0 && len == size_of::<u64>() {
        Some(value)
    } else {
        None
    }
}

/// Total physical memory, if the platform exposes it
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn physical_ram_bytes() -> Option<u64> {
    None
}
