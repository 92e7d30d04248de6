//! Relock Core - Re-authentication gating policy
//!
//! Decides whether a user must re-prove identity (PIN or biometrics) after
//! the application has been in the background, whether the obscuring screen
//! should cover the app while it is inactive, and whether repeated
//! authentication failures must log the user out.
//!
//! Elapsed time is measured with a monotonic uptime clock, so changing the
//! device's calendar clock cannot skip a grace period.
//!
//! ```
//! use std::time::Duration;
//! use relock_core::{
//!     BiometricPromptFlag, ConfigurationSnapshot, ManualClock, ReauthenticationPolicy,
//! };
//!
//! let prefs = ConfigurationSnapshot {
//!     pin_is_set: true,
//!     grace_period: Duration::from_secs(30),
//!     ..Default::default()
//! };
//! let clock = ManualClock::new(Duration::from_secs(100));
//! let policy = ReauthenticationPolicy::with_clock(prefs, 1usize, BiometricPromptFlag::new(), clock.clone());
//!
//! policy.on_application_will_become_inactive();
//! clock.advance(Duration::from_secs(45));
//! assert!(policy.should_require_reauthentication());
//! ```

pub mod accounts;
pub mod clock;
pub mod error;
pub mod policy;
pub mod preferences;
pub mod prompt;

pub use accounts::{AccountDirectory, ActiveAccounts};
pub use clock::{ManualClock, MonotonicClock, SystemUptimeClock, MAX_READING};
pub use error::{ClockError, PreferencesError, Result};
pub use policy::{PolicyDecision, ReauthenticationPolicy};
pub use preferences::{BuildSettings, ConfigurationSnapshot, PreferencesSource, SharedPreferences};
pub use prompt::{BiometricPromptFlag, BiometricPromptGuard};

/// PIN failures allowed before a forced logout, unless configured
pub const DEFAULT_MAX_PIN_FAILURES: u32 = 3;

/// Biometric failures allowed before a forced logout, unless configured
pub const DEFAULT_MAX_BIOMETRIC_FAILURES: u32 = 5;
