//! Arithmetic instructions
//!
//! Integer arithmetic wraps modulo 2^N. Division and remainder trap on a zero
//! divisor; signed division also traps on `MIN / -1`, while `MIN % -1` is 0.
//! Float arithmetic follows IEEE 754 with the WebAssembly rules for `min`,
//! `max` and `nearest`.

use super::{binary, unary, RuntimeError, Stack};

macro_rules! int_arith {
    ($t:ty, $u:ty, $add:ident, $sub:ident, $mul:ident, $div_s:ident, $div_u:ident, $rem_s:ident, $rem_u:ident) => {
        pub fn $add(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a.wrapping_add(b)))
        }

        pub fn $sub(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a.wrapping_sub(b)))
        }

        pub fn $mul(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a.wrapping_mul(b)))
        }

        pub fn $div_s(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| {
                if b == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                a.checked_div(b).ok_or(RuntimeError::IntegerOverflow)
            })
        }

        pub fn $div_u(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $u, b: $u| a.checked_div(b).ok_or(RuntimeError::DivisionByZero))
        }

        pub fn $rem_s(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| {
                if b == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Ok(a.wrapping_rem(b))
            })
        }

        pub fn $rem_u(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $u, b: $u| a.checked_rem(b).ok_or(RuntimeError::DivisionByZero))
        }
    };
}

int_arith!(i32, u32, i32_add, i32_sub, i32_mul, i32_div_s, i32_div_u, i32_rem_s, i32_rem_u);
int_arith!(i64, u64, i64_add, i64_sub, i64_mul, i64_div_s, i64_div_u, i64_rem_s, i64_rem_u);

/// NaN operands propagate; between equal zeros the negative one is smaller.
macro_rules! float_min_max {
    ($t:ty, $min:ident, $max:ident) => {
        fn $min(a: $t, b: $t) -> $t {
            if a.is_nan() {
                a
            } else if b.is_nan() {
                b
            } else if a == b {
                if a.is_sign_negative() { a } else { b }
            } else {
                a.min(b)
            }
        }

        fn $max(a: $t, b: $t) -> $t {
            if a.is_nan() {
                a
            } else if b.is_nan() {
                b
            } else if a == b {
                if a.is_sign_positive() { a } else { b }
            } else {
                a.max(b)
            }
        }
    };
}

float_min_max!(f32, min_f32, max_f32);
float_min_max!(f64, min_f64, max_f64);

macro_rules! float_arith {
    ($t:ty, $bits:ty, $min_fn:ident, $max_fn:ident,
     $abs:ident, $neg:ident, $ceil:ident, $floor:ident, $trunc:ident, $nearest:ident, $sqrt:ident,
     $add:ident, $sub:ident, $mul:ident, $div:ident, $min:ident, $max:ident, $copysign:ident) => {
        /// Clears the sign bit only, so NaN payloads survive.
        pub fn $abs(stack: &mut Stack) -> Result<(), RuntimeError> {
            let sign: $bits = 1 << (<$bits>::BITS - 1);
            unary(stack, |a: $t| Ok(<$t>::from_bits(a.to_bits() & !sign)))
        }

        /// Flips the sign bit only.
        pub fn $neg(stack: &mut Stack) -> Result<(), RuntimeError> {
            let sign: $bits = 1 << (<$bits>::BITS - 1);
            unary(stack, |a: $t| Ok(<$t>::from_bits(a.to_bits() ^ sign)))
        }

        pub fn $ceil(stack: &mut Stack) -> Result<(), RuntimeError> {
            unary(stack, |a: $t| Ok(a.ceil()))
        }

        pub fn $floor(stack: &mut Stack) -> Result<(), RuntimeError> {
            unary(stack, |a: $t| Ok(a.floor()))
        }

        pub fn $trunc(stack: &mut Stack) -> Result<(), RuntimeError> {
            unary(stack, |a: $t| Ok(a.trunc()))
        }

        /// Round to nearest, ties to even.
        pub fn $nearest(stack: &mut Stack) -> Result<(), RuntimeError> {
            unary(stack, |a: $t| Ok(a.round_ties_even()))
        }

        pub fn $sqrt(stack: &mut Stack) -> Result<(), RuntimeError> {
            unary(stack, |a: $t| Ok(a.sqrt()))
        }

        pub fn $add(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a + b))
        }

        pub fn $sub(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a - b))
        }

        pub fn $mul(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a * b))
        }

        pub fn $div(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok(a / b))
        }

        pub fn $min(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok($min_fn(a, b)))
        }

        pub fn $max(stack: &mut Stack) -> Result<(), RuntimeError> {
            binary(stack, |a: $t, b: $t| Ok($max_fn(a, b)))
        }

        /// Magnitude of the first operand with the sign bit of the second.
        pub fn $copysign(stack: &mut Stack) -> Result<(), RuntimeError> {
            let sign: $bits = 1 << (<$bits>::BITS - 1);
            binary(stack, |a: $t, b: $t| Ok(<$t>::from_bits((a.to_bits() & !sign) | (b.to_bits() & sign))))
        }
    };
}

float_arith!(
    f32, u32, min_f32, max_f32, f32_abs, f32_neg, f32_ceil, f32_floor, f32_trunc, f32_nearest, f32_sqrt, f32_add,
    f32_sub, f32_mul, f32_div, f32_min, f32_max, f32_copysign
);
float_arith!(
    f64, u64, min_f64, max_f64, f64_abs, f64_neg, f64_ceil, f64_floor, f64_trunc, f64_nearest, f64_sqrt, f64_add,
    f64_sub, f64_mul, f64_div, f64_min, f64_max, f64_copysign
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Value;
    use rstest::rstest;

    fn run(op: fn(&mut Stack) -> Result<(), RuntimeError>, args: &[Value]) -> Result<Value, RuntimeError> {
        let mut stack = Stack::new();
        stack.push_all(args.iter().copied());
        op(&mut stack)?;
        stack.pop()
    }

    fn i32s(a: i32, b: i32) -> [Value; 2] {
        [Value::from_i32(a), Value::from_i32(b)]
    }

    #[rstest]
    #[case(i32_add, i32::MAX, 1, i32::MIN)]
    #[case(i32_sub, i32::MIN, 1, i32::MAX)]
    #[case(i32_mul, 0x1000_0000, 16, 0)]
    #[case(i32_div_s, -7, 2, -3)]
    #[case(i32_div_u, -1, 2, i32::MAX)]
    #[case(i32_rem_s, -7, 2, -1)]
    #[case(i32_rem_s, i32::MIN, -1, 0)]
    #[case(i32_rem_u, -1, 10, 5)]
    fn test_i32_arith(
        #[case] op: fn(&mut Stack) -> Result<(), RuntimeError>,
        #[case] a: i32,
        #[case] b: i32,
        #[case] expected: i32,
    ) {
        assert_eq!(run(op, &i32s(a, b)).unwrap(), Value::from_i32(expected));
    }

    #[test]
    fn test_division_traps() {
        assert!(matches!(run(i32_div_s, &i32s(1, 0)), Err(RuntimeError::DivisionByZero)));
        assert!(matches!(run(i32_div_u, &i32s(1, 0)), Err(RuntimeError::DivisionByZero)));
        assert!(matches!(run(i32_rem_s, &i32s(1, 0)), Err(RuntimeError::DivisionByZero)));
        assert!(matches!(run(i32_rem_u, &i32s(1, 0)), Err(RuntimeError::DivisionByZero)));
        assert!(matches!(
            run(i32_div_s, &i32s(i32::MIN, -1)),
            Err(RuntimeError::IntegerOverflow)
        ));
        assert!(matches!(
            run(i64_div_s, &[Value::from_i64(i64::MIN), Value::from_i64(-1)]),
            Err(RuntimeError::IntegerOverflow)
        ));
        assert_eq!(
            run(i64_rem_s, &[Value::from_i64(i64::MIN), Value::from_i64(-1)]).unwrap(),
            Value::from_i64(0)
        );
    }

    #[test]
    fn test_i64_unsigned_views() {
        let r = run(i64_div_u, &[Value::from_i64(-2), Value::from_i64(2)]).unwrap();
        assert_eq!(r.to_u64(), u64::MAX / 2);
    }

    #[test]
    fn test_operand_order() {
        assert_eq!(run(i32_sub, &i32s(10, 3)).unwrap(), Value::from_i32(7));
        assert_eq!(
            run(f64_div, &[Value::from_f64(1.0), Value::from_f64(4.0)]).unwrap(),
            Value::from_f64(0.25)
        );
    }

    #[test]
    fn test_float_min_max_zeros_and_nan() {
        let f = |a: f32, b: f32| [Value::from_f32(a), Value::from_f32(b)];
        assert!(run(f32_min, &f(0.0, -0.0)).unwrap().to_f32().is_sign_negative());
        assert!(run(f32_min, &f(-0.0, 0.0)).unwrap().to_f32().is_sign_negative());
        assert!(run(f32_max, &f(-0.0, 0.0)).unwrap().to_f32().is_sign_positive());
        assert!(run(f32_max, &f(1.0, f32::NAN)).unwrap().to_f32().is_nan());
        assert!(run(f32_min, &f(f32::NAN, 1.0)).unwrap().to_f32().is_nan());
        assert_eq!(run(f32_max, &f(1.0, 2.0)).unwrap(), Value::from_f32(2.0));

        let d = |a: f64, b: f64| [Value::from_f64(a), Value::from_f64(b)];
        assert_eq!(run(f64_min, &d(-1.0, 2.0)).unwrap(), Value::from_f64(-1.0));
    }

    #[test]
    fn test_sign_bit_ops_preserve_payload() {
        let nan = f32::from_bits(0x7fa0_0001);
        let neg = run(f32_neg, &[Value::from_f32(nan)]).unwrap();
        assert_eq!(neg.to_u32(), 0xffa0_0001);
        let abs = run(f32_abs, &[neg]).unwrap();
        assert_eq!(abs.to_u32(), 0x7fa0_0001);

        let r = run(f64_copysign, &[Value::from_f64(2.0), Value::from_f64(-0.0)]).unwrap();
        assert_eq!(r, Value::from_f64(-2.0));
    }

    #[rstest]
    #[case(0.5, 0.0)]
    #[case(1.5, 2.0)]
    #[case(2.5, 2.0)]
    #[case(-0.5, -0.0)]
    #[case(-3.7, -4.0)]
    fn test_nearest_ties_to_even(#[case] input: f64, #[case] expected: f64) {
        let r = run(f64_nearest, &[Value::from_f64(input)]).unwrap();
        assert_eq!(r, Value::from_f64(expected));
    }

    #[test]
    fn test_rounding_family() {
        let v = [Value::from_f32(-1.5)];
        assert_eq!(run(f32_ceil, &v).unwrap(), Value::from_f32(-1.0));
        assert_eq!(run(f32_floor, &v).unwrap(), Value::from_f32(-2.0));
        assert_eq!(run(f32_trunc, &v).unwrap(), Value::from_f32(-1.0));
        assert_eq!(run(f32_sqrt, &[Value::from_f32(9.0)]).unwrap(), Value::from_f32(3.0));
        assert!(run(f64_sqrt, &[Value::from_f64(-1.0)]).unwrap().to_f64().is_nan());
    }

    #[test]
    fn test_type_mismatch() {
        assert!(matches!(
            run(i32_add, &[Value::from_i64(1), Value::from_i32(1)]),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }
}
