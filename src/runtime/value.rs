//! WebAssembly value representation
//!
//! A [`Value`] is a type tag plus the raw little-endian bytes of the value.
//! Every numeric reading (`to_i32`, `to_u64`, `to_f64`, ...) is a view over the
//! same bytes, so bit patterns, NaN payloads and signed zeros included, survive
//! any number of moves, stores and reloads.

use crate::parser::module::ValueType;
use fhex::ToHex;
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value {
    typ: ValueType,
    raw: [u8; 8],
}

impl Value {
    /// Build a value from raw bytes; bytes beyond the type's width are ignored.
    pub fn from_raw(typ: ValueType, bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        let width = typ.width().min(bytes.len());
        raw[..width].copy_from_slice(&bytes[..width]);
        Value { typ, raw }
    }

    /// The zero value of a type, used for freshly declared locals.
    pub fn zero(typ: ValueType) -> Self {
        Value { typ, raw: [0; 8] }
    }

    pub fn from_i32(v: i32) -> Self {
        Value::from_raw(ValueType::I32, &v.to_le_bytes())
    }

    pub fn from_u32(v: u32) -> Self {
        Value::from_raw(ValueType::I32, &v.to_le_bytes())
    }

    pub fn from_i64(v: i64) -> Self {
        Value::from_raw(ValueType::I64, &v.to_le_bytes())
    }

    pub fn from_u64(v: u64) -> Self {
        Value::from_raw(ValueType::I64, &v.to_le_bytes())
    }

    pub fn from_f32(v: f32) -> Self {
        Value::from_raw(ValueType::F32, &v.to_bits().to_le_bytes())
    }

    pub fn from_f64(v: f64) -> Self {
        Value::from_raw(ValueType::F64, &v.to_bits().to_le_bytes())
    }

    pub fn from_bool(v: bool) -> Self {
        Value::from_i32(v as i32)
    }

    pub fn typ(&self) -> ValueType {
        self.typ
    }

    /// The raw little-endian bytes, 4 or 8 depending on the type.
    pub fn bytes(&self) -> &[u8] {
        &self.raw[..self.typ.width()]
    }

    /// Same bytes under another type of equal width.
    pub fn reinterpret(&self, typ: ValueType) -> Option<Value> {
        if typ.width() != self.typ.width() {
            return None;
        }
        Some(Value { typ, raw: self.raw })
    }

    fn low4(&self) -> [u8; 4] {
        [self.raw[0], self.raw[1], self.raw[2], self.raw[3]]
    }

    pub fn to_i32(&self) -> i32 {
        i32::from_le_bytes(self.low4())
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_le_bytes(self.low4())
    }

    pub fn to_i64(&self) -> i64 {
        i64::from_le_bytes(self.raw)
    }

    pub fn to_u64(&self) -> u64 {
        u64::from_le_bytes(self.raw)
    }

    pub fn to_f32(&self) -> f32 {
        f32::from_bits(self.to_u32())
    }

    pub fn to_f64(&self) -> f64 {
        f64::from_bits(self.to_u64())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::from_i32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::from_i64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::from_f32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::from_f64(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            ValueType::I32 => write!(f, "i32:{}", self.to_i32()),
            ValueType::I64 => write!(f, "i64:{}", self.to_i64()),
            ValueType::F32 => write!(f, "f32:{}", self.to_f32().to_hex()),
            ValueType::F64 => write!(f, "f64:{}", self.to_f64().to_hex()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
