//! WebAssembly runtime implementation
//!
//! This module provides the execution engine for decoded modules: the store
//! and its instances, the value/label/frame stack machine, and the
//! per-instruction semantics.

pub mod config;
pub mod control;
pub mod executor;
pub mod frame;
pub mod imports;
pub mod instance;
pub mod memory;
pub mod ops;
pub mod stack;
pub mod store;
pub mod table;
pub mod test_utils;
pub mod value;

pub use config::EngineConfig;
pub use imports::{HostBinding, HostFunc, ImportObject};
pub use instance::{ExternVal, Input, Instance, ModuleInstance};
pub use memory::Memory;
pub use store::{FuncAddr, FunctionInstance, GlobalAddr, GlobalInstance, MemoryAddr, Store, TableAddr};
pub use table::Table;
pub use value::Value;

/// Every way execution or instantiation can fail.
///
/// A trap aborts the whole `invoke` call; host functions report their own
/// failures through the same type.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("unreachable executed")]
    Unreachable,
    #[error("out of bounds memory access: address {addr} width {width} memory size {size}")]
    MemoryOutOfBounds { addr: u64, width: usize, size: usize },
    #[error("undefined element: table index {0} out of bounds")]
    TableOutOfBounds(u32),
    #[error("uninitialized element {0}")]
    UndefinedElement(u32),
    #[error("indirect call type mismatch: expected {expected}, got {actual}")]
    IndirectCallTypeMismatch { expected: String, actual: String },
    #[error("reserved byte must be zero, got {0:#04x}")]
    InvalidReservedByte(u8),
    #[error("integer divide by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("invalid conversion to integer")]
    InvalidConversionToInteger,
    #[error("call stack exhausted")]
    CallStackExhausted,
    #[error("unknown import: {module}.{name}")]
    UnknownImport { module: String, name: String },
    #[error("incompatible import type for {module}.{name}: expected {expected}, got {actual}")]
    ImportTypeMismatch {
        module: String,
        name: String,
        expected: String,
        actual: String,
    },
    #[error("unknown export: {0}")]
    UnknownExport(String),
    #[error("export is not a function: {0}")]
    NotAFunction(String),
    #[error("stack underflow")]
    StackUnderflow,
    #[error("unexpected stack entry: expected {expected}, found {found}")]
    UnexpectedEntry { expected: &'static str, found: &'static str },
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("invalid label: {0}")]
    InvalidLabel(u32),
    #[error("local variable index out of bounds: {0}")]
    LocalIndexOutOfBounds(u32),
    #[error("global variable index out of bounds: {0}")]
    GlobalIndexOutOfBounds(u32),
    #[error("function index out of bounds: {0}")]
    FunctionIndexOutOfBounds(u32),
    #[error("global {0} is immutable")]
    ImmutableGlobal(u32),
    #[error("invalid constant expression: {0}")]
    InvalidConstExpr(String),
    #[error("unimplemented instruction: {0}")]
    UnimplementedInstruction(String),
    #[error("argument count mismatch: expected {expected}, got {actual}")]
    ArgumentCountMismatch { expected: usize, actual: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("host error: {0}")]
    HostError(String),
    #[error("out of bounds table access during element segment initialization")]
    ElementSegmentOutOfBounds,
    #[error("out of bounds memory access during data segment initialization")]
    DataSegmentOutOfBounds,
    #[error("memory error: {0}")]
    MemoryError(String),
}
