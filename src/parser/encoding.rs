//! Binary encoding primitives and format constants.
//!
//! Provides LEB128 integer encoding and IEEE 754 float encoding, the exact
//! inverses of the decoders in [`super::reader`]. Writers append to a
//! caller-provided `&mut Vec<u8>`.

use byteorder::{ByteOrder, LittleEndian};

// ---------------------------------------------------------------------------
// Binary format constants
// ---------------------------------------------------------------------------

pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];
pub const VERSION: u32 = 1;

// Section IDs, in canonical order
pub const SECTION_CUSTOM: u8 = 0;
pub const SECTION_TYPE: u8 = 1;
pub const SECTION_IMPORT: u8 = 2;
pub const SECTION_FUNCTION: u8 = 3;
pub const SECTION_TABLE: u8 = 4;
pub const SECTION_MEMORY: u8 = 5;
pub const SECTION_GLOBAL: u8 = 6;
pub const SECTION_EXPORT: u8 = 7;
pub const SECTION_START: u8 = 8;
pub const SECTION_ELEMENT: u8 = 9;
pub const SECTION_CODE: u8 = 10;
pub const SECTION_DATA: u8 = 11;

// Type constructors
pub const TYPE_FUNC: u8 = 0x60;
pub const TYPE_I32: u8 = 0x7F;
pub const TYPE_I64: u8 = 0x7E;
pub const TYPE_F32: u8 = 0x7D;
pub const TYPE_F64: u8 = 0x7C;
pub const ELEM_TYPE_FUNCREF: u8 = 0x70;

// Import/export descriptor kinds
pub const DESC_FUNC: u8 = 0x00;
pub const DESC_TABLE: u8 = 0x01;
pub const DESC_MEMORY: u8 = 0x02;
pub const DESC_GLOBAL: u8 = 0x03;

// Limits flags
pub const LIMITS_MIN: u8 = 0x00;
pub const LIMITS_MIN_MAX: u8 = 0x01;

// Global mutability
pub const MUT_CONST: u8 = 0x00;
pub const MUT_VAR: u8 = 0x01;

// Structured control
pub const BLOCK_TYPE_EMPTY: u8 = 0x40;
pub const OP_BLOCK: u8 = 0x02;
pub const OP_LOOP: u8 = 0x03;
pub const OP_IF: u8 = 0x04;
pub const OP_ELSE: u8 = 0x05;
pub const OP_END: u8 = 0x0B;

// ---------------------------------------------------------------------------
// LEB128
// ---------------------------------------------------------------------------

pub fn encode_unsigned(v: u64) -> Vec<u8> {
    let mut result = Vec::new();
    write_vu64(&mut result, v);
    result
}

pub fn encode_signed(v: i64) -> Vec<u8> {
    let mut result = Vec::new();
    write_vs64(&mut result, v);
    result
}

pub fn write_vu64(buf: &mut Vec<u8>, v: u64) {
    let mut value = v;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

pub fn write_vs64(buf: &mut Vec<u8>, v: i64) {
    let mut value = v;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        buf.push(if done { byte } else { byte | 0x80 });
        if done {
            break;
        }
    }
}

pub fn write_vu32(buf: &mut Vec<u8>, v: u32) {
    write_vu64(buf, u64::from(v));
}

pub fn write_vs32(buf: &mut Vec<u8>, v: i32) {
    write_vs64(buf, i64::from(v));
}

// ---------------------------------------------------------------------------
// Floats
// ---------------------------------------------------------------------------

pub fn write_f32(buf: &mut Vec<u8>, v: f32) {
    // bits written directly so NaN payloads survive
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, v.to_bits());
    buf.extend_from_slice(&bytes);
}

pub fn write_f64(buf: &mut Vec<u8>, v: f64) {
    let mut bytes = [0u8; 8];
    LittleEndian::write_u64(&mut bytes, v.to_bits());
    buf.extend_from_slice(&bytes);
}

pub fn encode_f32(v: f32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4);
    write_f32(&mut buf, v);
    buf
}

pub fn encode_f64(v: f64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8);
    write_f64(&mut buf, v);
    buf
}

// ---------------------------------------------------------------------------
// Composite
// ---------------------------------------------------------------------------

/// Length-prefixed byte vector.
pub fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_vu32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

pub fn write_name(buf: &mut Vec<u8>, name: &str) {
    write_bytes(buf, name.as_bytes());
}

/// A section with its id and size prefix.
pub fn write_section(buf: &mut Vec<u8>, id: u8, payload: &[u8]) {
    buf.push(id);
    write_bytes(buf, payload);
}
