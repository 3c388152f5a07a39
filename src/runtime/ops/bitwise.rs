//! Bitwise instructions: logic, shifts, rotates and bit counting
//!
//! Shift and rotate counts are taken modulo the operand width.

use super::{binary, unary, RuntimeError, Stack};

macro_rules! bitwise {
    ($t:ty, $u:ty, $and:ident, $or:ident, $xor:ident, $shl:ident, $shr_s:ident, $shr_u:ident,
     $rotl:ident, $rotr:ident, $clz:ident, $ctz:ident, $popcnt:ident) => {
        pub fn $and(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a & b))
        }

        pub fn $or(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a | b))
        }

        pub fn $xor(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a ^ b))
        }

        pub fn $shl(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a.wrapping_shl(b as u32)))
        }

        /// Arithmetic shift: the sign bit fills in.
        pub fn $shr_s(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a.wrapping_shr(b as u32)))
        }

        pub fn $shr_u(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $u, b: $u| Ok(a.wrapping_shr(b as u32)))
        }

        pub fn $rotl(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $u, b: $u| Ok(a.rotate_left((b % <$u>::BITS as $u) as u32)))
        }

        pub fn $rotr(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $u, b: $u| Ok(a.rotate_right((b % <$u>::BITS as $u) as u32)))
        }

        pub fn $clz(stack: &mut Stack) -> Result<(), RuntimeError> {
            unary(stack, |a: $u| Ok(a.leading_zeros() as $u))
        }

        pub fn $ctz(stack: &mut Stack) -> Result<(), RuntimeError> {
            unary(stack, |a: $u| Ok(a.trailing_zeros() as $u))
        }

        pub fn $popcnt(stack: &mut Stack) -> Result<(), RuntimeError> {
            unary(stack, |a: $u| Ok(a.count_ones() as $u))
        }
    };
}

bitwise!(
    i32, u32, i32_and, i32_or, i32_xor, i32_shl, i32_shr_s, i32_shr_u, i32_rotl, i32_rotr, i32_clz, i32_ctz,
    i32_popcnt
);
bitwise!(
    i64, u64, i64_and, i64_or, i64_xor, i64_shl, i64_shr_s, i64_shr_u, i64_rotl, i64_rotr, i64_clz, i64_ctz,
    i64_popcnt
);
