//! Implementation limits applied while decoding.
//!
//! These bound allocations driven by counts read from untrusted input.

/// Maximum number of locals a single function body may declare.
pub const MAX_LOCALS: u64 = 0x1000_0000;

/// Maximum number of entries in any section vector.
pub const MAX_SECTION_ENTRIES: u32 = 1_000_000;

/// Maximum number of parameters or results in a function type.
pub const MAX_FUNCTION_TYPE_ARITY: u32 = 1_000;

/// Maximum number of labels in a `br_table` instruction.
pub const MAX_BR_TABLE_LABELS: u32 = 65_536;

/// Maximum number of function indices in a single element segment.
pub const MAX_ELEMENT_INDICES: u32 = 10_000_000;
