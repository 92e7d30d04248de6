//! Decision replay

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use relock_core::{
    BiometricPromptFlag, ConfigurationSnapshot, ManualClock, PolicyDecision,
    ReauthenticationPolicy,
};

/// Decisions for one replayed scenario
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Wall-clock time of the replay, informational only
    pub evaluated_at: DateTime<Utc>,

    /// Active accounts in the scenario
    pub accounts: usize,

    /// Simulated inactivity, `None` if the app never went inactive
    pub inactive_for_secs: Option<f64>,

    /// Whether a biometric prompt was showing
    pub biometric_prompt_active: bool,

    /// Grace period left when the scenario was evaluated
    pub grace_remaining_secs: Option<f64>,

    /// The policy's decisions
    #[serde(flatten)]
    pub decision: PolicyDecision,
}

impl EvaluationReport {
    /// Replay a scenario against `prefs` on a manual clock
    pub fn replay(
        prefs: ConfigurationSnapshot,
        accounts: usize,
        inactive_for: Option<Duration>,
        biometric_prompt_active: bool,
    ) -> Self {
        let clock = ManualClock::default();
        let prompt = BiometricPromptFlag::new();
        let policy = ReauthenticationPolicy::with_clock(prefs, accounts, prompt.clone(), clock.clone());

        if let Some(inactive_for) = inactive_for {
            policy.on_application_will_become_inactive();
            clock.advance(inactive_for);
        }
        if biometric_prompt_active {
            prompt.set();
        }

        Self {
            evaluated_at: Utc::now(),
            accounts,
            inactive_for_secs: inactive_for.map(|d| d.as_secs_f64()),
            biometric_prompt_active,
            grace_remaining_secs: policy.grace_remaining().map(|d| d.as_secs_f64()),
            decision: policy.evaluate(),
        }
    }
}
