//! Function activation frames

use std::rc::Rc;

use super::instance::ModuleInstance;
use super::{RuntimeError, Value};
use crate::parser::expression::Expression;

/// One active call: its locals, the module instance it resolves globals,
/// memories and tables through, and the expression being executed.
#[derive(Debug, Clone)]
pub struct Frame {
    pub module: Rc<ModuleInstance>,
    pub locals: Vec<Value>,
    pub expr: Rc<Expression>,
    /// Number of values the function returns.
    pub arity: usize,
}

impl Frame {
    pub fn new(module: Rc<ModuleInstance>, locals: Vec<Value>, expr: Rc<Expression>, arity: usize) -> Self {
        Frame {
            module,
            locals,
            expr,
            arity,
        }
    }

    pub fn local(&self, idx: u32) -> Result<Value, RuntimeError> {
        self.locals
            .get(idx as usize)
            .copied()
            .ok_or(RuntimeError::LocalIndexOutOfBounds(idx))
    }

    /// Overwrite a local; the new value must keep the local's type.
    pub fn set_local(&mut self, idx: u32, value: Value) -> Result<(), RuntimeError> {
        let slot = self
            .locals
            .get_mut(idx as usize)
            .ok_or(RuntimeError::LocalIndexOutOfBounds(idx))?;
        if slot.typ() != value.typ() {
            return Err(RuntimeError::TypeMismatch {
                expected: slot.typ().to_string(),
                actual: value.typ().to_string(),
            });
        }
        *slot = value;
        Ok(())
    }
}
