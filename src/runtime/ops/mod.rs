//! Instruction semantics
//!
//! Each instruction that only touches the operand stack (and possibly a
//! memory or frame) is a free function here, grouped by category. Control
//! flow and calls live in the executor because they move the program counter.

pub mod bitwise;
pub mod comparison;
pub mod conversion;
pub mod memory;
pub mod numeric;
pub mod parametric;
pub mod variable;

pub(crate) use crate::parser::instruction::MemArg;
pub(crate) use crate::runtime::memory::Memory;
pub(crate) use crate::runtime::stack::Stack;
pub(crate) use crate::runtime::{RuntimeError, Value};

/// Operand types that can be popped with a type check.
pub(crate) trait Operand: Sized {
    fn pop(stack: &mut Stack) -> Result<Self, RuntimeError>;
}

/// Results that can be pushed back as a value.
pub(crate) trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! operand {
    ($ty:ty, $pop:ident, $from:ident $(, $cast:ty)?) => {
        impl Operand for $ty {
            fn pop(stack: &mut Stack) -> Result<Self, RuntimeError> {
                Ok(stack.$pop()? $(as $cast)?)
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$from(self)
            }
        }
    };
}

operand!(i32, pop_i32, from_i32);
operand!(u32, pop_i32, from_u32, u32);
operand!(i64, pop_i64, from_i64);
operand!(u64, pop_i64, from_u64, u64);
operand!(f32, pop_f32, from_f32);
operand!(f64, pop_f64, from_f64);

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::from_bool(self)
    }
}

/// Pop one operand, apply `f`, push the result.
pub(crate) fn unary<A: Operand, R: IntoValue>(
    stack: &mut Stack,
    f: impl FnOnce(A) -> Result<R, RuntimeError>,
) -> Result<(), RuntimeError> {
    let a = A::pop(stack)?;
    stack.push(f(a)?.into_value());
    Ok(())
}

/// Pop `c2` then `c1`, push `f(c1, c2)`.
pub(crate) fn binary<A: Operand, R: IntoValue>(
    stack: &mut Stack,
    f: impl FnOnce(A, A) -> Result<R, RuntimeError>,
) -> Result<(), RuntimeError> {
    let c2 = A::pop(stack)?;
    let c1 = A::pop(stack)?;
    stack.push(f(c1, c2)?.into_value());
    Ok(())
}
