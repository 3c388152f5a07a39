//! Memory instructions
//!
//! The effective address is the popped i32, read as unsigned, plus the
//! static offset, computed in 64 bits so it cannot wrap. Narrow loads extend
//! after reading; narrow stores write the low bytes of the value.

use super::{MemArg, Memory, RuntimeError, Stack, Value};
use crate::parser::module::ValueType;

fn effective_address(stack: &mut Stack, memarg: &MemArg) -> Result<u64, RuntimeError> {
    let base = stack.pop_i32()? as u32;
    Ok(base as u64 + memarg.offset as u64)
}

macro_rules! load_op {
    ($name:ident, $width:literal, $read:ty, $push:ident, $widen:ty) => {
        pub fn $name(memory: &Memory, stack: &mut Stack, memarg: &MemArg) -> Result<(), RuntimeError> {
            let addr = effective_address(stack, memarg)?;
            let raw = <$read>::from_le_bytes(memory.load::<$width>(addr)?);
            stack.push(Value::$push(raw as $widen));
            Ok(())
        }
    };
}

load_op!(i32_load, 4, i32, from_i32, i32);
load_op!(i64_load, 8, i64, from_i64, i64);
load_op!(i32_load8_s, 1, i8, from_i32, i32);
load_op!(i32_load8_u, 1, u8, from_u32, u32);
load_op!(i32_load16_s, 2, i16, from_i32, i32);
load_op!(i32_load16_u, 2, u16, from_u32, u32);
load_op!(i64_load8_s, 1, i8, from_i64, i64);
load_op!(i64_load8_u, 1, u8, from_u64, u64);
load_op!(i64_load16_s, 2, i16, from_i64, i64);
load_op!(i64_load16_u, 2, u16, from_u64, u64);
load_op!(i64_load32_s, 4, i32, from_i64, i64);
load_op!(i64_load32_u, 4, u32, from_u64, u64);

/// Float loads copy the bytes as-is so NaN payloads survive.
pub fn f32_load(memory: &Memory, stack: &mut Stack, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = effective_address(stack, memarg)?;
    stack.push(Value::from_raw(ValueType::F32, &memory.load::<4>(addr)?));
    Ok(())
}

pub fn f64_load(memory: &Memory, stack: &mut Stack, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = effective_address(stack, memarg)?;
    stack.push(Value::from_raw(ValueType::F64, &memory.load::<8>(addr)?));
    Ok(())
}

macro_rules! store_op {
    ($name:ident, $typ:expr, $width:literal) => {
        pub fn $name(memory: &mut Memory, stack: &mut Stack, memarg: &MemArg) -> Result<(), RuntimeError> {
            let value = stack.pop_typed($typ)?;
            let addr = effective_address(stack, memarg)?;
            memory.store(addr, &value.bytes()[..$width])
        }
    };
}

store_op!(i32_store, ValueType::I32, 4);
store_op!(i64_store, ValueType::I64, 8);
store_op!(f32_store, ValueType::F32, 4);
store_op!(f64_store, ValueType::F64, 8);
store_op!(i32_store8, ValueType::I32, 1);
store_op!(i32_store16, ValueType::I32, 2);
store_op!(i64_store8, ValueType::I64, 1);
store_op!(i64_store16, ValueType::I64, 2);
store_op!(i64_store32, ValueType::I64, 4);

/// Push the current size in pages.
pub fn memory_size(memory: &Memory, stack: &mut Stack) -> Result<(), RuntimeError> {
    stack.push(Value::from_u32(memory.size()));
    Ok(())
}

/// Pop a page delta and push the previous size, or -1 when growth fails.
pub fn memory_grow(memory: &mut Memory, stack: &mut Stack, ceiling: u32) -> Result<(), RuntimeError> {
    let delta = stack.pop_i32()? as u32;
    stack.push(Value::from_i32(memory.grow(delta, ceiling)));
    Ok(())
}
