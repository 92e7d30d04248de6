//! Re-authentication gating decisions
//!
//! Decision order for [`ReauthenticationPolicy::should_require_reauthentication`]:
//!
//! 1. No PIN and no biometrics: nothing to re-authenticate against
//! 2. No active account: no session to protect
//! 3. Never inactivated: require it (first protected screen after launch)
//! 4. Otherwise: inactive for strictly longer than the grace period

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::accounts::AccountDirectory;
use crate::clock::{duration_to_nanos, MonotonicClock, SystemUptimeClock};
use crate::error::ClockError;
use crate::preferences::{ConfigurationSnapshot, PreferencesSource};
use crate::prompt::BiometricPromptFlag;

/// Sentinel for "no inactivation recorded"
const NEVER_INACTIVE: u64 = 0;

/// Every decision taken against one preferences snapshot and one clock reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// PIN or biometrics is configured
    pub protection_configured: bool,
    /// The user must re-authenticate before continuing
    pub require_reauthentication: bool,
    /// The obscuring screen should cover the app while inactive
    pub show_obscuring_screen: bool,
    /// Failure limits are exceeded and the user must be logged out
    pub force_logout: bool,
}

/// Re-authentication gating policy
///
/// Lives for the whole process. The host calls
/// [`on_application_will_become_inactive`](Self::on_application_will_become_inactive)
/// whenever it is about to leave the foreground and queries the policy when
/// it comes back.
///
/// # Aborts
///
/// Every query that measures elapsed time aborts the process if the
/// monotonic clock cannot be read.
pub struct ReauthenticationPolicy<P, A, C = SystemUptimeClock> {
    /// Preferences collaborator, read on every query
    preferences: P,

    /// Account collaborator
    accounts: A,

    /// Monotonic time source
    clock: C,

    /// Shared with the UI layer
    biometric_prompt: BiometricPromptFlag,

    /// Uptime of the last inactivation in nanoseconds, offset by one so that
    /// zero can mean "never". Only ever raised, via `fetch_max`.
    last_inactive: AtomicU64,
}

impl<P, A> ReauthenticationPolicy<P, A, SystemUptimeClock>
where
    P: PreferencesSource,
    A: AccountDirectory,
{
    /// Create a policy measuring time against system uptime
    pub fn new(preferences: P, accounts: A, biometric_prompt: BiometricPromptFlag) -> Self {
        Self::with_clock(preferences, accounts, biometric_prompt, SystemUptimeClock)
    }
}

impl<P, A, C> ReauthenticationPolicy<P, A, C>
where
    P: PreferencesSource,
    A: AccountDirectory,
    C: MonotonicClock,
{
    /// Create a policy with a custom clock
    pub fn with_clock(
        preferences: P,
        accounts: A,
        biometric_prompt: BiometricPromptFlag,
        clock: C,
    ) -> Self {
        Self {
            preferences,
            accounts,
            clock,
            biometric_prompt,
            last_inactive: AtomicU64::new(NEVER_INACTIVE),
        }
    }

    /// The application is about to become inactive
    ///
    /// Records the current uptime. Calling it again simply advances the
    /// recorded instant.
    pub fn on_application_will_become_inactive(&self) {
        let now = self.uptime();
        let encoded = duration_to_nanos(now).saturating_add(1);
        self.last_inactive.fetch_max(encoded, Ordering::AcqRel);
        debug!(uptime_secs = now.as_secs_f64(), "Recorded inactivation");
    }

    /// Whether the user must re-authenticate before continuing
    pub fn should_require_reauthentication(&self) -> bool {
        let prefs = self.preferences.snapshot();
        self.requires_reauthentication(&prefs)
    }

    /// Whether the obscuring screen should cover the app while inactive
    ///
    /// Suppressed while a biometric prompt is showing, since the prompt
    /// itself makes the app resign active.
    pub fn should_show_inactive_obscuring_screen(&self) -> bool {
        let prefs = self.preferences.snapshot();
        self.shows_obscuring_screen(&prefs)
    }

    /// PIN or biometrics is configured
    pub fn is_protection_configured(&self) -> bool {
        self.preferences.snapshot().is_protection_configured()
    }

    /// Whether repeated failures must log the user out
    pub fn should_force_logout(&self) -> bool {
        let prefs = self.preferences.snapshot();
        Self::forces_logout(&prefs)
    }

    /// Take every decision against a single preferences snapshot
    pub fn evaluate(&self) -> PolicyDecision {
        let prefs = self.preferences.snapshot();
        PolicyDecision {
            protection_configured: prefs.is_protection_configured(),
            require_reauthentication: self.requires_reauthentication(&prefs),
            show_obscuring_screen: self.shows_obscuring_screen(&prefs),
            force_logout: Self::forces_logout(&prefs),
        }
    }

    /// Uptime recorded by the most recent inactivation
    pub fn last_inactive(&self) -> Option<Duration> {
        match self.last_inactive.load(Ordering::Acquire) {
            NEVER_INACTIVE => None,
            encoded => Some(Duration::from_nanos(encoded - 1)),
        }
    }

    /// Time since the most recent inactivation
    pub fn elapsed_since_inactive(&self) -> Option<Duration> {
        let since = self.last_inactive()?;
        Some(self.uptime().saturating_sub(since))
    }

    /// Time left before re-authentication becomes required, zero once the
    /// grace period has run out
    pub fn grace_remaining(&self) -> Option<Duration> {
        let elapsed = self.elapsed_since_inactive()?;
        Some(self.preferences.snapshot().grace_period.saturating_sub(elapsed))
    }

    /// Handle to the biometric prompt flag
    pub fn biometric_prompt(&self) -> &BiometricPromptFlag {
        &self.biometric_prompt
    }

    fn requires_reauthentication(&self, prefs: &ConfigurationSnapshot) -> bool {
        if !prefs.is_protection_configured() {
            return false;
        }

        if self.accounts.active_account_count() == 0 {
            return false;
        }

        let Some(elapsed) = self.elapsed_since_inactive() else {
            debug!("No inactivation recorded, re-authentication required");
            return true;
        };

        let required = elapsed > prefs.grace_period;
        debug!(
            elapsed_secs = elapsed.as_secs_f64(),
            grace_secs = prefs.grace_period.as_secs_f64(),
            required,
            "Evaluated grace period"
        );
        required
    }

    fn shows_obscuring_screen(&self, prefs: &ConfigurationSnapshot) -> bool {
        if !prefs.is_protection_configured() {
            return false;
        }
        !self.biometric_prompt.is_active()
    }

    fn forces_logout(prefs: &ConfigurationSnapshot) -> bool {
        if prefs.pin_failures_force_logout() {
            debug!(
                failures = prefs.pin_failure_count,
                max = prefs.max_pin_failures,
                "PIN failure limit reached, logout required"
            );
            return true;
        }

        if prefs.biometric_failures_force_logout() {
            debug!(
                failures = prefs.biometric_failure_count,
                max = prefs.max_biometric_failures,
                "Biometric failure limit reached, logout required"
            );
            return true;
        }

        false
    }

    fn uptime(&self) -> Duration {
        match self.clock.now() {
            Ok(now) => now,
            Err(e) => clock_failure(e),
        }
    }
}

#[cold]
#[inline(never)]
fn clock_failure(err: ClockError) -> ! {
    error!("{}; cannot decide whether the grace period elapsed, aborting", err);
    // Unwinding could be caught by the host, which would then guess.
    std::process::abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::preferences::SharedPreferences;

    struct BrokenClock;

    impl MonotonicClock for BrokenClock {
        fn now(&self) -> Result<Duration, ClockError> {
            Err(ClockError::Unavailable(22))
        }
    }

    fn pin_prefs(grace_secs: u64) -> ConfigurationSnapshot {
        ConfigurationSnapshot {
            pin_is_set: true,
            grace_period: Duration::from_secs(grace_secs),
            ..Default::default()
        }
    }

    fn policy_at(
        prefs: ConfigurationSnapshot,
        accounts: usize,
    ) -> (ReauthenticationPolicy<ConfigurationSnapshot, usize, ManualClock>, ManualClock) {
        let clock = ManualClock::new(Duration::from_secs(1_000));
        let policy =
            ReauthenticationPolicy::with_clock(prefs, accounts, BiometricPromptFlag::new(), clock.clone());
        (policy, clock)
    }

    #[test]
    fn test_requires_reauth_before_first_inactivation() {
        let (policy, _clock) = policy_at(pin_prefs(30), 1);
        assert!(policy.should_require_reauthentication());
        assert_eq!(policy.last_inactive(), None);
        assert_eq!(policy.grace_remaining(), None);
    }

    #[test]
    fn test_within_grace_period() {
        let (policy, clock) = policy_at(pin_prefs(30), 1);
        policy.on_application_will_become_inactive();

        clock.advance(Duration::from_secs(10));
        assert!(!policy.should_require_reauthentication());
        assert_eq!(policy.grace_remaining(), Some(Duration::from_secs(20)));
    }

    #[test]
    fn test_grace_period_boundary_is_strict() {
        let (policy, clock) = policy_at(pin_prefs(30), 1);
        policy.on_application_will_become_inactive();

        clock.advance(Duration::from_secs(30));
        assert!(!policy.should_require_reauthentication());

        clock.advance(Duration::from_millis(1));
        assert!(policy.should_require_reauthentication());
        assert_eq!(policy.grace_remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_zero_grace_period() {
        let (policy, clock) = policy_at(pin_prefs(0), 1);
        policy.on_application_will_become_inactive();
        assert!(!policy.should_require_reauthentication());

        clock.advance(Duration::from_nanos(1));
        assert!(policy.should_require_reauthentication());
    }

    #[test]
    fn test_biometrics_alone_counts_as_protection() {
        let prefs = ConfigurationSnapshot {
            biometrics_is_set: true,
            ..Default::default()
        };
        let (policy, _clock) = policy_at(prefs, 1);
        assert!(policy.is_protection_configured());
        assert!(policy.should_require_reauthentication());
    }

    #[test]
    fn test_no_accounts_never_requires_reauth() {
        let (policy, clock) = policy_at(pin_prefs(30), 0);
        assert!(!policy.should_require_reauthentication());

        policy.on_application_will_become_inactive();
        clock.advance(Duration::from_secs(3_600));
        assert!(!policy.should_require_reauthentication());
    }

    #[test]
    fn test_obscuring_screen_follows_prompt_flag() {
        let (policy, _clock) = policy_at(pin_prefs(30), 1);
        assert!(policy.should_show_inactive_obscuring_screen());

        policy.biometric_prompt().set();
        assert!(!policy.should_show_inactive_obscuring_screen());

        policy.biometric_prompt().clear();
        assert!(policy.should_show_inactive_obscuring_screen());
    }

    #[test]
    fn test_preferences_read_on_every_query() {
        let shared = SharedPreferences::new(pin_prefs(30));
        let clock = ManualClock::new(Duration::from_secs(5));
        let policy = ReauthenticationPolicy::with_clock(
            shared.clone(),
            1usize,
            BiometricPromptFlag::new(),
            clock.clone(),
        );

        policy.on_application_will_become_inactive();
        clock.advance(Duration::from_secs(60));
        assert!(policy.should_require_reauthentication());

        shared.update(|prefs| prefs.grace_period = Duration::from_secs(120));
        assert!(!policy.should_require_reauthentication());

        shared.update(|prefs| prefs.pin_is_set = false);
        assert!(!policy.is_protection_configured());
        assert!(!policy.should_show_inactive_obscuring_screen());
    }

    #[test]
    fn test_evaluate_reports_all_decisions() {
        let prefs = ConfigurationSnapshot {
            pin_failure_count: 5,
            max_pin_failures: 5,
            logout_on_pin_failures_exceeded: true,
            ..pin_prefs(30)
        };
        let (policy, _clock) = policy_at(prefs, 2);

        assert_eq!(
            policy.evaluate(),
            PolicyDecision {
                protection_configured: true,
                require_reauthentication: true,
                show_obscuring_screen: true,
                force_logout: true,
            }
        );
    }

    #[test]
    fn test_system_clock_policy() {
        let policy = ReauthenticationPolicy::new(pin_prefs(3_600), 1usize, BiometricPromptFlag::new());
        policy.on_application_will_become_inactive();
        assert!(policy.last_inactive().is_some());
        assert!(!policy.should_require_reauthentication());
    }

    #[test]
    fn test_unprotected_queries_never_read_clock() {
        let policy = ReauthenticationPolicy::with_clock(
            ConfigurationSnapshot::default(),
            1usize,
            BiometricPromptFlag::new(),
            BrokenClock,
        );
        assert!(!policy.should_require_reauthentication());
        assert!(!policy.should_force_logout());
    }

    #[test]
    fn test_force_logout_query_does_not_warn() {
        use std::io;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let prefs = ConfigurationSnapshot {
            pin_failure_count: 9,
            max_pin_failures: 3,
            biometric_failure_count: 9,
            max_biometric_failures: 3,
            logout_on_pin_failures_exceeded: true,
            logout_on_biometric_failures_exceeded: true,
            ..pin_prefs(30)
        };
        let (policy, _clock) = policy_at(prefs, 1);

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            assert!(policy.should_force_logout());
            assert!(policy.evaluate().force_logout);
        });

        assert!(captured.0.lock().unwrap().is_empty());
    }
}
