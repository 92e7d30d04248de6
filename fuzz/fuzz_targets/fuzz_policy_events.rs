#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use relock_core::{
    AccountDirectory, ActiveAccounts, BiometricPromptFlag, ConfigurationSnapshot, ManualClock,
    ReauthenticationPolicy,
};

#[derive(Arbitrary, Debug)]
enum Event {
    Inactive,
    Advance(u32),
    PromptShown,
    PromptResolved,
    Accounts(u8),
}

#[derive(Arbitrary, Debug)]
struct Scenario {
    pin_is_set: bool,
    biometrics_is_set: bool,
    grace_ms: u32,
    events: Vec<Event>,
}

fuzz_target!(|scenario: Scenario| {
    let prefs = ConfigurationSnapshot {
        pin_is_set: scenario.pin_is_set,
        biometrics_is_set: scenario.biometrics_is_set,
        grace_period: Duration::from_millis(scenario.grace_ms as u64),
        ..Default::default()
    };
    let clock = ManualClock::default();
    let accounts = ActiveAccounts::new(1);
    let prompt = BiometricPromptFlag::new();
    let policy = ReauthenticationPolicy::with_clock(prefs, accounts.clone(), prompt.clone(), clock.clone());

    let mut last = None;
    for event in scenario.events {
        match event {
            Event::Inactive => policy.on_application_will_become_inactive(),
            Event::Advance(ms) => clock.advance(Duration::from_millis(ms as u64)),
            Event::PromptShown => prompt.set(),
            Event::PromptResolved => prompt.clear(),
            Event::Accounts(n) => accounts.set(n as usize),
        }

        // Recorded instant never moves backwards
        let current = policy.last_inactive();
        assert!(current >= last);
        last = current;

        let decision = policy.evaluate();
        if !prefs.is_protection_configured() {
            assert!(!decision.require_reauthentication);
            assert!(!decision.show_obscuring_screen);
        }
        if accounts.active_account_count() == 0 {
            assert!(!decision.require_reauthentication);
        }
    }
});
