//! Conversion instructions
//!
//! Float-to-integer truncation traps on NaN (`InvalidConversionToInteger`)
//! and on results outside the target range (`IntegerOverflow`). The other
//! conversions are total. Reinterpretations keep the exact bit pattern.

use super::{unary, RuntimeError, Stack};
use crate::parser::module::ValueType;

/// Truncate toward zero, requiring `min <= trunc(x) < max`.
///
/// Every f32 is exactly representable as f64, and the bounds below are powers
/// of two, so checking in f64 is exact for both source widths.
fn truncate(x: f64, min: f64, max: f64) -> Result<f64, RuntimeError> {
    if x.is_nan() {
        return Err(RuntimeError::InvalidConversionToInteger);
    }
    let t = x.trunc();
    if t < min || t >= max {
        return Err(RuntimeError::IntegerOverflow);
    }
    Ok(t)
}

const I32_RANGE: (f64, f64) = (-2147483648.0, 2147483648.0);
const U32_RANGE: (f64, f64) = (0.0, 4294967296.0);
const I64_RANGE: (f64, f64) = (-9223372036854775808.0, 9223372036854775808.0);
const U64_RANGE: (f64, f64) = (0.0, 18446744073709551616.0);

macro_rules! trunc_op {
    ($name:ident, $from:ty, $to:ty, $range:expr) => {
        pub fn $name(stack: &mut Stack) -> Result<(), RuntimeError> {
            let (min, max) = $range;
            unary(stack, |x: $from| Ok(truncate(x as f64, min, max)? as $to))
        }
    };
}

trunc_op!(i32_trunc_f32_s, f32, i32, I32_RANGE);
trunc_op!(i32_trunc_f32_u, f32, u32, U32_RANGE);
trunc_op!(i32_trunc_f64_s, f64, i32, I32_RANGE);
trunc_op!(i32_trunc_f64_u, f64, u32, U32_RANGE);
trunc_op!(i64_trunc_f32_s, f32, i64, I64_RANGE);
trunc_op!(i64_trunc_f32_u, f32, u64, U64_RANGE);
trunc_op!(i64_trunc_f64_s, f64, i64, I64_RANGE);
trunc_op!(i64_trunc_f64_u, f64, u64, U64_RANGE);

/// Conversions that are a plain `as` cast: wrapping, extension, int-to-float
/// (round to nearest even), demotion and promotion.
macro_rules! cast_op {
    ($name:ident, $from:ty, $to:ty) => {
        pub fn $name(stack: &mut Stack) -> Result<(), RuntimeError> {
            unary(stack, |x: $from| Ok(x as $to))
        }
    };
}

cast_op!(i32_wrap_i64, i64, i32);
cast_op!(i64_extend_i32_s, i32, i64);
cast_op!(i64_extend_i32_u, u32, u64);
cast_op!(f32_convert_i32_s, i32, f32);
cast_op!(f32_convert_i32_u, u32, f32);
cast_op!(f32_convert_i64_s, i64, f32);
cast_op!(f32_convert_i64_u, u64, f32);
cast_op!(f32_demote_f64, f64, f32);
cast_op!(f64_convert_i32_s, i32, f64);
cast_op!(f64_convert_i32_u, u32, f64);
cast_op!(f64_convert_i64_s, i64, f64);
cast_op!(f64_convert_i64_u, u64, f64);
cast_op!(f64_promote_f32, f32, f64);

/// Retag the top value's bytes as `to`; the source must have type `from`.
pub fn reinterpret(stack: &mut Stack, from: ValueType, to: ValueType) -> Result<(), RuntimeError> {
    let value = stack.pop_typed(from)?;
    let retagged = value.reinterpret(to).ok_or_else(|| RuntimeError::TypeMismatch {
        expected: format!("{}-byte type", from.width()),
        actual: to.to_string(),
    })?;
    stack.push(retagged);
    Ok(())
}
