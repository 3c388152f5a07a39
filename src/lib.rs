//! A WebAssembly 1.0 binary decoder and stack-machine interpreter.
//!
//! wasmstack decodes `.wasm` bytes into a [`Module`], instantiates it into a
//! [`Store`] against host-supplied imports, and runs exported functions on an
//! interpreter whose numeric results are bit-compatible with WebAssembly
//! 1.0 semantics.
//!
//! # Modules
//!
//! - [`parser`] -- Binary format decoder, LEB128 codec and block resolver.
//! - [`runtime`] -- Store, instances, the stack machine and opcode semantics.
//! - [`report`] -- JSON and text summaries of a decoded module.
//!
//! # Example
//!
//! Decode a module importing `env.print`, bind the import to a closure and
//! call an export:
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use wasmstack::parser::module::{FunctionType, ValueType};
//! use wasmstack::{decode, instantiate, ImportObject, Value};
//!
//! // (import "env" "print" (func (param i32)))
//! // (func (export "run") i32.const 7 call 0)
//! let bytes = [
//!     0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00,
//!     0x01, 0x08, 0x02, 0x60, 0x01, 0x7f, 0x00, 0x60, 0x00, 0x00,
//!     0x02, 0x0d, 0x01, 0x03, b'e', b'n', b'v', 0x05, b'p', b'r', b'i', b'n', b't', 0x00, 0x00,
//!     0x03, 0x02, 0x01, 0x01,
//!     0x07, 0x07, 0x01, 0x03, b'r', b'u', b'n', 0x00, 0x01,
//!     0x0a, 0x08, 0x01, 0x06, 0x00, 0x41, 0x07, 0x10, 0x00, 0x0b,
//! ];
//! let module = decode(&bytes).unwrap();
//!
//! let printed = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&printed);
//! let mut imports = ImportObject::new();
//! imports.add_function("env", "print", FunctionType::new(vec![ValueType::I32], vec![]), move |args, _| {
//!     sink.borrow_mut().extend_from_slice(args);
//!     Ok(vec![])
//! });
//!
//! let mut instance = instantiate(&module, &imports).unwrap();
//! instance.invoke("run", &[]).unwrap();
//! assert_eq!(*printed.borrow(), vec![Value::from_i32(7)]);
//! ```

pub mod parser;
pub mod report;
pub mod runtime;

pub use parser::module::Module;
pub use parser::{decode, DecodeError};
pub use report::ModuleReport;
pub use runtime::{EngineConfig, ImportObject, Input, Instance, RuntimeError, Store, Value};

/// Instantiate `module` in a fresh store with the default [`EngineConfig`].
pub fn instantiate(module: &Module, imports: &ImportObject) -> Result<Instance, RuntimeError> {
    Instance::new(module, imports, EngineConfig::default())
}
