#![no_main]

use libfuzzer_sys::fuzz_target;
use relock_core::{
    BiometricPromptFlag, BuildSettings, ConfigurationSnapshot, ManualClock, ReauthenticationPolicy,
};

fuzz_target!(|data: &[u8]| {
    // Arbitrary preference files must either be rejected or yield a snapshot
    // the policy can evaluate without panicking
    if let Ok(prefs) = serde_json::from_slice::<ConfigurationSnapshot>(data) {
        assert_eq!(prefs.build_settings(), BuildSettings::compiled());

        let policy = ReauthenticationPolicy::with_clock(
            prefs,
            1usize,
            BiometricPromptFlag::new(),
            ManualClock::default(),
        );
        let decision = policy.evaluate();

        if !prefs.is_protection_configured() {
            assert!(!decision.require_reauthentication);
            assert!(!decision.show_obscuring_screen);
        }
    }
});
