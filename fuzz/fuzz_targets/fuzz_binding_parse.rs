#![no_main]

use hapticbind::input::{UiKey, hook_keys, key_name_from_ui_text, parse_binding};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Anything that parses must print back to a name that parses to the same binding
    if let Ok(binding) = parse_binding(s) {
        let reparsed = parse_binding(&binding.to_string()).expect("canonical name must parse");
        assert_eq!(binding, reparsed);
    }

    // Every named key from the GUI must have hook keys
    if let UiKey::Named(name) = key_name_from_ui_text(s) {
        assert!(hook_keys(&name).is_some(), "no hook keys for {name}");
    }
});
