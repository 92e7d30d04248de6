//! Monotonic time sources
//!
//! Elapsed inactivity is always measured against system uptime, never the
//! calendar clock, so moving the device clock forward or back cannot skip or
//! extend a grace period.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ClockError;

/// A source of monotonic time readings, expressed as time since an
/// arbitrary fixed origin (boot, for the system clock).
pub trait MonotonicClock: Send + Sync {
    /// Read the clock. Successive readings never decrease.
    fn now(&self) -> Result<Duration, ClockError>;
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for Arc<C> {
    fn now(&self) -> Result<Duration, ClockError> {
        (**self).now()
    }
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &C {
    fn now(&self) -> Result<Duration, ClockError> {
        (**self).now()
    }
}

/// System uptime clock
///
/// Linux and Android read `CLOCK_MONOTONIC_RAW`, which is also immune to NTP
/// slewing. Other Unix targets read `CLOCK_MONOTONIC`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemUptimeClock;

#[cfg(any(target_os = "linux", target_os = "android"))]
const UPTIME_CLOCK_ID: libc::clockid_t = libc::CLOCK_MONOTONIC_RAW;

#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
const UPTIME_CLOCK_ID: libc::clockid_t = libc::CLOCK_MONOTONIC;

#[cfg(unix)]
impl MonotonicClock for SystemUptimeClock {
    fn now(&self) -> Result<Duration, ClockError> {
        // SAFETY: timespec is plain old data; all-zero is a valid value.
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        // SAFETY: `ts` is a valid, exclusively borrowed timespec.
        let rc = unsafe { libc::clock_gettime(UPTIME_CLOCK_ID, &mut ts) };
        if rc != 0 {
            let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
            return Err(ClockError::Unavailable(errno));
        }

        Ok(Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32))
    }
}

#[cfg(not(unix))]
impl MonotonicClock for SystemUptimeClock {
    fn now(&self) -> Result<Duration, ClockError> {
        use std::sync::OnceLock;
        use std::time::Instant;

        // Origin is the first reading in this process; policy state lives no
        // longer than the process, so only differences matter.
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        Ok(ORIGIN.get_or_init(Instant::now).elapsed())
    }
}

/// Manually driven monotonic clock
///
/// Clones share the same reading. Used to replay recorded uptimes and to pin
/// time down in tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `start`
    pub fn new(start: Duration) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(duration_to_nanos(start))),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let by = duration_to_nanos(by);
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(by))
            });
    }

    /// Move the clock to `to`. Earlier readings are ignored, the clock
    /// never runs backwards.
    pub fn set(&self, to: Duration) {
        self.nanos.fetch_max(duration_to_nanos(to), Ordering::AcqRel);
    }

    /// Current reading
    pub fn reading(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> Result<Duration, ClockError> {
        Ok(self.reading())
    }
}

/// Largest reading the policy can tell apart from its neighbours (~584 years)
pub const MAX_READING: Duration = Duration::from_nanos(u64::MAX);

/// Nanoseconds in a `Duration`, saturating at [`MAX_READING`]
pub(crate) fn duration_to_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
