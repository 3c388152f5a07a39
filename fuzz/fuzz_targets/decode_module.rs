#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed input must come back as a DecodeError, never a panic
    if let Ok(module) = wasmstack::decode(data) {
        let _ = wasmstack::ModuleReport::new(&module).to_json();
    }
});
