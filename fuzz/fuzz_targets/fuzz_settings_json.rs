#![no_main]

use hapticbind::config::Settings;
use hapticbind::input::BindingKind;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary JSON must either fail to parse or sanitize into usable settings
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(settings) = serde_json::from_str::<Settings>(s)
    {
        let settings = settings.sanitized();
        assert!((0.0..=1.0).contains(&settings.vibration_intensity));
        assert!(!settings.server_address.trim().is_empty());

        let bindings = BindingKind::ALL.map(|kind| settings.binding(kind));
        for (i, binding) in bindings.iter().enumerate() {
            assert!(bindings[i + 1..].iter().all(|later| !later.overlaps(binding)));
        }
    }
});
