//! Security preferences consumed by the policy
//!
//! The policy never writes preferences. It asks a [`PreferencesSource`] for a
//! fresh [`ConfigurationSnapshot`] on every query, so a PIN being removed or a
//! failure counter being bumped is observed by the very next decision.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PreferencesError, Result};
use crate::{DEFAULT_MAX_BIOMETRIC_FAILURES, DEFAULT_MAX_PIN_FAILURES};

/// Build-level toggles
///
/// Resolved from cargo features at compile time, then carried in the
/// snapshot so hosts and tests can override them in code. They are never
/// read from or written to the preferences file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSettings {
    /// Log the user out once PIN failures reach the maximum
    pub logout_on_pin_failures_exceeded: bool,
    /// Log the user out once biometric failures reach the maximum
    pub logout_on_biometric_failures_exceeded: bool,
}

impl BuildSettings {
    /// Toggles compiled into this build
    pub const fn compiled() -> Self {
        Self {
            logout_on_pin_failures_exceeded: cfg!(feature = "logout-on-pin-failures"),
            logout_on_biometric_failures_exceeded: cfg!(feature = "logout-on-biometric-failures"),
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self::compiled()
    }
}

/// Point-in-time view of the user's security preferences
///
/// Values are taken as given. A zero failure maximum, for instance, means the
/// corresponding logout toggle fires immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationSnapshot {
    /// A PIN has been configured
    pub pin_is_set: bool,

    /// Biometric unlock has been enabled
    pub biometrics_is_set: bool,

    /// Tolerated inactivity before re-authentication is required
    #[serde(rename = "grace_period_secs", with = "secs_f64")]
    pub grace_period: Duration,

    /// Consecutive failed PIN entries
    pub pin_failure_count: u32,

    /// PIN failures allowed before a forced logout
    pub max_pin_failures: u32,

    /// Consecutive failed biometric attempts
    pub biometric_failure_count: u32,

    /// Biometric failures allowed before a forced logout
    pub max_biometric_failures: u32,

    /// Build toggle: log out when PIN failures are exceeded
    #[serde(skip, default = "compiled_pin_logout")]
    pub logout_on_pin_failures_exceeded: bool,

    /// Build toggle: log out when biometric failures are exceeded
    #[serde(skip, default = "compiled_biometric_logout")]
    pub logout_on_biometric_failures_exceeded: bool,
}

fn compiled_pin_logout() -> bool {
    BuildSettings::compiled().logout_on_pin_failures_exceeded
}

fn compiled_biometric_logout() -> bool {
    BuildSettings::compiled().logout_on_biometric_failures_exceeded
}

impl Default for ConfigurationSnapshot {
    fn default() -> Self {
        let build = BuildSettings::compiled();
        Self {
            pin_is_set: false,
            biometrics_is_set: false,
            grace_period: Duration::ZERO,
            pin_failure_count: 0,
            max_pin_failures: DEFAULT_MAX_PIN_FAILURES,
            biometric_failure_count: 0,
            max_biometric_failures: DEFAULT_MAX_BIOMETRIC_FAILURES,
            logout_on_pin_failures_exceeded: build.logout_on_pin_failures_exceeded,
            logout_on_biometric_failures_exceeded: build.logout_on_biometric_failures_exceeded,
        }
    }
}

impl ConfigurationSnapshot {
    /// PIN or biometrics is configured
    pub fn is_protection_configured(&self) -> bool {
        self.pin_is_set || self.biometrics_is_set
    }

    /// PIN failures reached the maximum and the build logs out on it
    pub fn pin_failures_force_logout(&self) -> bool {
        self.logout_on_pin_failures_exceeded && self.pin_failure_count >= self.max_pin_failures
    }

    /// Biometric failures reached the maximum and the build logs out on it
    pub fn biometric_failures_force_logout(&self) -> bool {
        self.logout_on_biometric_failures_exceeded
            && self.biometric_failure_count >= self.max_biometric_failures
    }

    /// Build toggles carried by this snapshot
    pub fn build_settings(&self) -> BuildSettings {
        BuildSettings {
            logout_on_pin_failures_exceeded: self.logout_on_pin_failures_exceeded,
            logout_on_biometric_failures_exceeded: self.logout_on_biometric_failures_exceeded,
        }
    }

    /// Replace the build toggles
    pub fn with_build_settings(mut self, build: BuildSettings) -> Self {
        self.logout_on_pin_failures_exceeded = build.logout_on_pin_failures_exceeded;
        self.logout_on_biometric_failures_exceeded = build.logout_on_biometric_failures_exceeded;
        self
    }

    /// Default preferences location: `<data dir>/relock/preferences.json`
    pub fn default_path() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join("relock").join("preferences.json"))
            .ok_or(PreferencesError::NoDataDir)
    }

    /// Load preferences from a JSON file
    ///
    /// Build toggles always come from [`BuildSettings::compiled`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&content)?;
        Ok(snapshot)
    }

    /// Save preferences to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("json.tmp");
        let written = write_private(&temp_path, content.as_bytes())
            .and_then(|()| fs::rename(&temp_path, path));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }
}

/// Create or truncate `path` readable by the owner only, then write `content`
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    // `mode` only applies on creation; a stale temp file keeps its old bits
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(content)?;
    file.sync_all()
}

/// Grace period as fractional seconds on the wire
mod secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| serde::de::Error::custom(format!("invalid grace period {secs}: {e}")))
    }
}

/// Supplies the current preferences to the policy
pub trait PreferencesSource: Send + Sync {
    /// Current preference values
    fn snapshot(&self) -> ConfigurationSnapshot;
}

impl PreferencesSource for ConfigurationSnapshot {
    fn snapshot(&self) -> ConfigurationSnapshot {
        *self
    }
}

impl<P: PreferencesSource + ?Sized> PreferencesSource for Arc<P> {
    fn snapshot(&self) -> ConfigurationSnapshot {
        (**self).snapshot()
    }
}

/// Shared, updatable preferences
///
/// The preferences collaborator keeps one clone and writes through it; the
/// policy keeps another and reads a copy per query.
#[derive(Debug, Clone, Default)]
pub struct SharedPreferences {
    inner: Arc<RwLock<ConfigurationSnapshot>>,
}

impl SharedPreferences {
    /// Wrap an initial snapshot
    pub fn new(snapshot: ConfigurationSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Replace every value
    pub fn replace(&self, snapshot: ConfigurationSnapshot) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Modify values in place
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ConfigurationSnapshot),
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

impl PreferencesSource for SharedPreferences {
    fn snapshot(&self) -> ConfigurationSnapshot {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}
