//! Wall-Clock Timing
//!
//! Operations here are network round trips measured in milliseconds, so the
//! monotonic `std::time::Instant` clock is precise enough.

use std::time::{Duration, Instant};

/// Timer for a single invocation
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed nanoseconds since `start`
    #[inline(always)]
    pub fn stop(&self) -> u64 {
        duration_nanos(self.start.elapsed())
    }
}

/// Saturating conversion, a u64 of nanoseconds covers ~584 years
#[inline]
pub(crate) fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Pin the current thread to a single core
///
/// Keeps a fork from migrating between cores mid-window.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();

        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu, set_ref);

        let result = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref);

        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

/// Core the calling thread is running on right now
#[cfg(target_os = "linux")]
pub fn current_cpu() -> Result<usize, std::io::Error> {
    let cpu = unsafe { libc::sched_getcpu() };
    usize::try_from(cpu).map_err(|_| std::io::Error::last_os_error())
}

/// Core the calling thread is running on (always 0 on this platform)
#[cfg(not(target_os = "linux"))]
pub fn current_cpu() -> Result<usize, std::io::Error> {
    Ok(0)
}

/// Pin the current thread to a single core (no-op on this platform)
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    Ok(())
}
