//! Parametric instructions

use super::{RuntimeError, Stack};

/// drop: discard the top operand.
pub fn drop(stack: &mut Stack) -> Result<(), RuntimeError> {
    stack.pop()?;
    Ok(())
}

/// select: pop the i32 condition and two operands of one type, keep the
/// first when the condition is non-zero, else the second.
pub fn select(stack: &mut Stack) -> Result<(), RuntimeError> {
    let condition = stack.pop_i32()?;
    let val2 = stack.pop()?;
    let val1 = stack.pop()?;
    if val1.typ() != val2.typ() {
        return Err(RuntimeError::TypeMismatch {
            expected: val1.typ().to_string(),
            actual: val2.typ().to_string(),
        });
    }
    stack.push(if condition != 0 { val1 } else { val2 });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Value;

    #[test]
    fn test_drop() {
        let mut stack = Stack::new();
        stack.push(Value::from_i32(1));
        stack.push(Value::from_i64(2));
        drop(&mut stack).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::from_i32(1));
        assert!(drop(&mut stack).is_err());
    }

    #[test]
    fn test_select() {
        for (condition, expected) in [(1, 10.0), (-5, 10.0), (0, 20.0)] {
            let mut stack = Stack::new();
            stack.push(Value::from_f64(10.0));
            stack.push(Value::from_f64(20.0));
            stack.push(Value::from_i32(condition));
            select(&mut stack).unwrap();
            assert_eq!(stack.pop_f64().unwrap(), expected);
        }
    }

    #[test]
    fn test_select_operand_types_must_agree() {
        let mut stack = Stack::new();
        stack.push(Value::from_i32(1));
        stack.push(Value::from_i64(2));
        stack.push(Value::from_i32(1));
        assert!(matches!(select(&mut stack), Err(RuntimeError::TypeMismatch { .. })));
    }
}
