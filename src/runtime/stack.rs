//! The operand/label/frame stack

use super::control::Label;
use super::{RuntimeError, Value};
use crate::parser::module::ValueType;

/// One slot of the machine stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StackEntry {
    Value(Value),
    Label(Label),
    /// Marks the bottom of a call; holds the function's result arity.
    Frame { arity: usize },
}

impl StackEntry {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            StackEntry::Value(_) => "value",
            StackEntry::Label(_) => "label",
            StackEntry::Frame { .. } => "frame",
        }
    }
}

#[derive(Debug, Default)]
pub struct Stack {
    entries: Vec<StackEntry>,
}

impl Stack {
    pub fn new() -> Self {
        Stack { entries: Vec::new() }
    }

    pub fn push(&mut self, value: Value) {
        self.entries.push(StackEntry::Value(value));
    }

    pub fn push_all(&mut self, values: impl IntoIterator<Item = Value>) {
        self.entries.extend(values.into_iter().map(StackEntry::Value));
    }

    pub fn push_label(&mut self, label: Label) {
        self.entries.push(StackEntry::Label(label));
    }

    pub fn push_frame(&mut self, arity: usize) {
        self.entries.push(StackEntry::Frame { arity });
    }

    pub fn pop_entry(&mut self) -> Result<StackEntry, RuntimeError> {
        self.entries.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop an operand; a label or frame on top is a shape violation.
    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        match self.pop_entry()? {
            StackEntry::Value(value) => Ok(value),
            other => {
                self.entries.push(other);
                Err(RuntimeError::UnexpectedEntry {
                    expected: "value",
                    found: other.name(),
                })
            }
        }
    }

    pub fn pop_typed(&mut self, expected: ValueType) -> Result<Value, RuntimeError> {
        let value = self.pop()?;
        if value.typ() != expected {
            return Err(RuntimeError::TypeMismatch {
                expected: expected.to_string(),
                actual: value.typ().to_string(),
            });
        }
        Ok(value)
    }

    pub fn pop_i32(&mut self) -> Result<i32, RuntimeError> {
        Ok(self.pop_typed(ValueType::I32)?.to_i32())
    }

    pub fn pop_i64(&mut self) -> Result<i64, RuntimeError> {
        Ok(self.pop_typed(ValueType::I64)?.to_i64())
    }

    pub fn pop_f32(&mut self) -> Result<f32, RuntimeError> {
        Ok(self.pop_typed(ValueType::F32)?.to_f32())
    }

    pub fn pop_f64(&mut self) -> Result<f64, RuntimeError> {
        Ok(self.pop_typed(ValueType::F64)?.to_f64())
    }

    /// Pop `n` operands, returned in the order they were pushed.
    pub fn pop_values(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(self.pop()?);
        }
        values.reverse();
        Ok(values)
    }

    /// The `n`th enclosing label, innermost first, within the current call.
    pub fn get_nth_label(&self, n: u32) -> Result<Label, RuntimeError> {
        let mut seen = 0;
        for entry in self.entries.iter().rev() {
            match entry {
                StackEntry::Label(label) => {
                    if seen == n {
                        return Ok(*label);
                    }
                    seen += 1;
                }
                StackEntry::Frame { .. } => break,
                StackEntry::Value(_) => {}
            }
        }
        Err(RuntimeError::InvalidLabel(n))
    }

    /// Discard entries until `count` labels have been removed.
    pub fn pop_labels(&mut self, count: usize) -> Result<(), RuntimeError> {
        let mut popped = 0;
        while popped < count {
            match self.pop_entry()? {
                StackEntry::Label(_) => popped += 1,
                StackEntry::Value(_) => {}
                frame @ StackEntry::Frame { .. } => {
                    self.entries.push(frame);
                    return Err(RuntimeError::UnexpectedEntry {
                        expected: "label",
                        found: "frame",
                    });
                }
            }
        }
        Ok(())
    }

    /// Discard operands down to the innermost label, leaving the label.
    pub fn unwind_to_label(&mut self) -> Result<(), RuntimeError> {
        while let Some(StackEntry::Value(_)) = self.entries.last() {
            self.entries.pop();
        }
        match self.entries.last() {
            Some(StackEntry::Label(_)) => Ok(()),
            Some(other) => Err(RuntimeError::UnexpectedEntry {
                expected: "label",
                found: other.name(),
            }),
            None => Err(RuntimeError::StackUnderflow),
        }
    }

    /// Discard everything above the current frame marker, leaving the marker.
    pub fn unwind_to_frame(&mut self) -> Result<usize, RuntimeError> {
        loop {
            match self.entries.last() {
                Some(StackEntry::Frame { arity }) => return Ok(*arity),
                Some(_) => {
                    self.entries.pop();
                }
                None => return Err(RuntimeError::StackUnderflow),
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn peek(&self) -> Option<&StackEntry> {
        self.entries.last()
    }
}
