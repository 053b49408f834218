//! Processor queries behind shard selection and sizing.
//!
//! # Purpose
//!
//! Sharded state needs two facts from the platform:
//! - how many logical processors the process may use (the shard count,
//!   read once when a container is built), and
//! - which processor the calling thread is executing on right now (the
//!   shard-selection hint, read on every operation).
//!
//! Both are **hints**. Threads migrate between processors at any time, and
//! the usable set can change after start-up. Nothing built on this module
//! relies on the answers for correctness, only for contention.
//!
//! # Platform Support
//!
//! - **Linux**: `sched_getcpu` for the current CPU, `sched_getaffinity` for
//!   the allowed set, `pthread_setaffinity_np` for pinning.
//! - **Other**: `current_cpu()` returns `None`; the affinity calls return an
//!   `Unsupported` error instead of silently succeeding.
//!
//! # Container/Cgroup Awareness
//!
//! In containers the process may only run on a subset of host CPUs (for
//! example CPUs 4-7). Raw CPU numbers are therefore not shard indices; see
//! [`CpuShardIndex`](crate::CpuShardIndex), which ranks the allowed set.

use std::io;

/// Maximum number of CPUs representable in a [`CpuSet`].
///
/// This is `CPU_SETSIZE` on Linux (typically 1024). Core indices must be
/// less than this value to avoid undefined behavior in the `CPU_*` macros.
#[cfg(target_os = "linux")]
pub const CPU_SET_CAPACITY: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

#[cfg(not(target_os = "linux"))]
pub const CPU_SET_CAPACITY: usize = 1024;

#[inline]
fn validate_core(core: usize) -> io::Result<()> {
    if core >= CPU_SET_CAPACITY {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "core index {} exceeds CPU_SET_CAPACITY ({})",
                core, CPU_SET_CAPACITY
            ),
        ));
    }
    Ok(())
}

/// Returns the number of logical processors usable by this process.
///
/// Uses `std::thread::available_parallelism()`, which respects cgroup CPU
/// quotas and the process affinity mask.
///
/// # Fallback
///
/// Returns 1 (with a warning) if the count cannot be determined. A single
/// shard is always a correct, if contended, configuration.
pub fn num_cpus() -> usize {
    match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(e) => {
            tracing::warn!(error = %e, "could not determine CPU count, defaulting to 1");
            1
        }
    }
}

/// Returns the CPU the calling thread is executing on, if the platform
/// can tell.
///
/// On Linux this is `sched_getcpu`, which glibc serves from the vDSO or
/// rseq area without entering the kernel. The answer may be stale by the
/// time the caller uses it.
#[cfg(target_os = "linux")]
#[inline]
pub fn current_cpu() -> Option<usize> {
    // SAFETY: sched_getcpu takes no arguments and has no preconditions.
    let cpu = unsafe { libc::sched_getcpu() };
    if cpu < 0 {
        None
    } else {
        Some(cpu as usize)
    }
}

#[cfg(not(target_os = "linux"))]
#[inline]
pub fn current_cpu() -> Option<usize> {
    None
}

/// Pins the current thread to a specific CPU core.
///
/// # Errors
///
/// Returns an error if:
/// - `core >= CPU_SET_CAPACITY`
/// - the core is not in the process's allowed CPU set (cgroups/cpuset)
/// - the platform doesn't support thread affinity
#[cfg(target_os = "linux")]
pub fn pin_current_thread_to_core(core: usize) -> io::Result<()> {
    let mut set = CpuSet::new();
    set.set(core)?;

    // SAFETY: `set.inner` is a valid, initialized cpu_set_t and the size
    // passed matches its type. pthread_setaffinity_np reports errors via its
    // return value, not errno.
    let rc = unsafe {
        libc::pthread_setaffinity_np(
            libc::pthread_self(),
            std::mem::size_of::<libc::cpu_set_t>(),
            &set.inner as *const _,
        )
    };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread_to_core(core: usize) -> io::Result<()> {
    validate_core(core)?;
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "CPU affinity is not supported on this platform",
    ))
}

/// Returns the set of CPUs the calling thread is allowed to run on.
///
/// This respects cgroups, cpusets, and taskset constraints.
#[cfg(target_os = "linux")]
pub fn allowed_cpus() -> io::Result<CpuSet> {
    let mut set = CpuSet::new();

    // SAFETY: pid 0 selects the calling thread; the buffer is a valid
    // cpu_set_t of the advertised size.
    let rc = unsafe {
        libc::sched_getaffinity(
            0,
            std::mem::size_of::<libc::cpu_set_t>(),
            &mut set.inner as *mut _,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(set)
}

#[cfg(not(target_os = "linux"))]
pub fn allowed_cpus() -> io::Result<CpuSet> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "allowed_cpus() is not supported on this platform",
    ))
}

/// CPU affinity mask.
///
/// On Linux, wraps `cpu_set_t`. On other platforms this is an empty stub
/// that validates indices but records nothing.
#[derive(Clone, Debug)]
pub struct CpuSet {
    #[cfg(target_os = "linux")]
    inner: libc::cpu_set_t,

    #[cfg(not(target_os = "linux"))]
    _private: (),
}

impl CpuSet {
    /// Creates an empty CPU set.
    pub fn new() -> Self {
        #[cfg(target_os = "linux")]
        {
            // SAFETY: an all-zero cpu_set_t is a valid empty set.
            let mut inner: libc::cpu_set_t = unsafe { std::mem::zeroed() };
            // SAFETY: `inner` is a valid cpu_set_t.
            unsafe { libc::CPU_ZERO(&mut inner) };
            Self { inner }
        }
        #[cfg(not(target_os = "linux"))]
        {
            Self { _private: () }
        }
    }

    /// Adds a core to the set.
    ///
    /// # Errors
    ///
    /// Returns error if `core >= CPU_SET_CAPACITY`.
    #[cfg(target_os = "linux")]
    pub fn set(&mut self, core: usize) -> io::Result<()> {
        validate_core(core)?;
        // SAFETY: core was validated against the set's capacity.
        unsafe { libc::CPU_SET(core, &mut self.inner) };
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    pub fn set(&mut self, core: usize) -> io::Result<()> {
        validate_core(core)
    }

    /// Checks if a core is in the set.
    ///
    /// Returns `false` if `core >= CPU_SET_CAPACITY` (instead of UB).
    #[cfg(target_os = "linux")]
    pub fn is_set(&self, core: usize) -> bool {
        if core >= CPU_SET_CAPACITY {
            return false;
        }
        // SAFETY: core is in bounds.
        unsafe { libc::CPU_ISSET(core, &self.inner) }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn is_set(&self, _core: usize) -> bool {
        false
    }

    /// Returns the number of CPUs in the set.
    #[cfg(target_os = "linux")]
    pub fn count(&self) -> usize {
        // SAFETY: CPU_COUNT only reads a valid cpu_set_t.
        unsafe { libc::CPU_COUNT(&self.inner) as usize }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn count(&self) -> usize {
        0
    }

    /// Returns an iterator over set core indices, ascending.
    ///
    /// O(CPU_SET_CAPACITY): always scans the full mask.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..CPU_SET_CAPACITY).filter(move |&core| self.is_set(core))
    }
}

impl Default for CpuSet {
    fn default() -> Self {
        Self::new()
    }
}
