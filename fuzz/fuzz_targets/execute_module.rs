#![no_main]

use libfuzzer_sys::fuzz_target;
use wasmstack::parser::module::ExportDesc;
use wasmstack::{decode, EngineConfig, ImportObject, Instance, Value};

fuzz_target!(|data: &[u8]| {
    let Ok(module) = decode(data) else {
        return;
    };

    // Keep recursion and memory growth small enough for the fuzzer's limits
    let config = EngineConfig::default()
        .with_max_call_depth(64)
        .with_max_memory_pages(256);
    let Ok(mut instance) = Instance::new(&module, &ImportObject::new(), config) else {
        return;
    };

    for export in &module.exports {
        let ExportDesc::Function(func_idx) = export.desc else {
            continue;
        };
        let Some(func_type) = module.function_type(func_idx) else {
            continue;
        };
        let args: Vec<Value> = func_type.params.iter().map(|typ| Value::zero(*typ)).collect();
        let _ = instance.invoke(&export.name, &args);
    }
});
