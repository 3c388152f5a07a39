//! Test and comparison instructions
//!
//! Every comparison pushes an i32 that is 1 when the relation holds and 0
//! otherwise. Float comparisons involving NaN are false, except `ne`.

use super::{binary, unary, RuntimeError, Stack};

macro_rules! int_compare {
    ($t:ty, $u:ty, $eqz:ident, $eq:ident, $ne:ident, $lt_s:ident, $lt_u:ident, $gt_s:ident, $gt_u:ident,
     $le_s:ident, $le_u:ident, $ge_s:ident, $ge_u:ident) => {
        pub fn $eqz(stack: &mut Stack) -> Result<(), RuntimeError> {
            unary(stack, |a: $t| Ok(a == 0))
        }

        pub fn $eq(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a == b))
        }

        pub fn $ne(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a != b))
        }

        pub fn $lt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a < b))
        }

        pub fn $lt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $u, b: $u| Ok(a < b))
        }

        pub fn $gt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a > b))
        }

        pub fn $gt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $u, b: $u| Ok(a > b))
        }

        pub fn $le_s(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a <= b))
        }

        pub fn $le_u(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $u, b: $u| Ok(a <= b))
        }

        pub fn $ge_s(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a >= b))
        }

        pub fn $ge_u(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $u, b: $u| Ok(a >= b))
        }
    };
}

int_compare!(
    i32, u32, i32_eqz, i32_eq, i32_ne, i32_lt_s, i32_lt_u, i32_gt_s, i32_gt_u, i32_le_s, i32_le_u, i32_ge_s, i32_ge_u
);
int_compare!(
    i64, u64, i64_eqz, i64_eq, i64_ne, i64_lt_s, i64_lt_u, i64_gt_s, i64_gt_u, i64_le_s, i64_le_u, i64_ge_s, i64_ge_u
);

macro_rules! float_compare {
    ($t:ty, $eq:ident, $ne:ident, $lt:ident, $gt:ident, $le:ident, $ge:ident) => {
        pub fn $eq(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a == b))
        }

        pub fn $ne(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a != b))
        }

        pub fn $lt(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a < b))
        }

        pub fn $gt(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a > b))
        }

        pub fn $le(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a <= b))
        }

        pub fn $ge(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a >= b))
        }
    };
}

float_compare!(f32, f32_eq, f32_ne, f32_lt, f32_gt, f32_le, f32_ge);
float_compare!(f64, f64_eq, f64_ne, f64_lt, f64_gt, f64_le, f64_ge);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Value;
    use rstest::rstest;

    type Op = fn(&mut Stack) -> Result<(), RuntimeError>;

    fn run(op: Op, args: &[Value]) -> i32 {
        let mut stack = Stack::new();
        stack.push_all(args.iter().copied());
        op(&mut stack).unwrap();
        stack.pop_i32().unwrap()
    }

    #[rstest]
    #[case(i32_lt_s, -1, 0, 1)]
    #[case(i32_lt_u, -1, 0, 0)]
    #[case(i32_gt_u, -1, 0, 1)]
    #[case(i32_ge_s, 5, 5, 1)]
    #[case(i32_le_u, 6, 5, 0)]
    #[case(i32_ne, 1, 2, 1)]
    fn test_i32_compare(#[case] op: Op, #[case] a: i32, #[case] b: i32, #[case] expected: i32) {
        assert_eq!(run(op, &[Value::from_i32(a), Value::from_i32(b)]), expected);
    }

    #[test]
    fn test_eqz() {
        assert_eq!(run(i32_eqz, &[Value::from_i32(0)]), 1);
        assert_eq!(run(i64_eqz, &[Value::from_i64(7)]), 0);
    }

    #[test]
    fn test_i64_signedness() {
        let args = [Value::from_i64(i64::MIN), Value::from_i64(1)];
        assert_eq!(run(i64_lt_s, &args), 1);
        assert_eq!(run(i64_lt_u, &args), 0);
    }

    #[test]
    fn test_nan_comparisons() {
        let args = [Value::from_f64(f64::NAN), Value::from_f64(f64::NAN)];
        assert_eq!(run(f64_eq, &args), 0);
        assert_eq!(run(f64_ne, &args), 1);
        assert_eq!(run(f64_le, &args), 0);
        let zeros = [Value::from_f32(0.0), Value::from_f32(-0.0)];
        assert_eq!(run(f32_eq, &zeros), 1);
        assert_eq!(run(f32_lt, &zeros), 0);
    }
}
