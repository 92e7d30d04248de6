//! Biometric prompt in-flight flag
//!
//! Presenting the system biometric dialog makes the host report that the
//! application is resigning active. While the flag is set the obscuring
//! screen is suppressed so it does not cover the prompt itself.
//!
//! If the flag is left set after the prompt resolves, the obscuring screen
//! never comes back. Prefer [`BiometricPromptFlag::begin`], whose guard
//! clears the flag on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

/// Shared handle to the "biometric prompt is showing" flag
///
/// One clone goes to the UI layer, one to the policy.
#[derive(Debug, Clone, Default)]
pub struct BiometricPromptFlag {
    active: Arc<AtomicBool>,
}

impl BiometricPromptFlag {
    /// Create a cleared flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a biometric prompt is currently showing
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Mark a prompt as showing
    pub fn set(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// Mark the prompt as resolved
    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Set the flag for the lifetime of the returned guard
    ///
    /// Call immediately before presenting the prompt and hold the guard until
    /// the prompt resolves.
    #[must_use = "the flag is cleared as soon as the guard is dropped"]
    pub fn begin(&self) -> BiometricPromptGuard {
        debug!("Biometric prompt starting");
        self.set();
        BiometricPromptGuard { flag: self.clone() }
    }
}

/// Clears the biometric prompt flag when dropped
#[derive(Debug)]
pub struct BiometricPromptGuard {
    flag: BiometricPromptFlag,
}

impl Drop for BiometricPromptGuard {
    fn drop(&mut self) {
        self.flag.clear();
        debug!("Biometric prompt resolved");
    }
}
