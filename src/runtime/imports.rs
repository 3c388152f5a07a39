//! Host bindings for module imports
//!
//! An [`ImportObject`] maps `(module, name)` pairs to a [`HostBinding`]. At
//! instantiation each import of the module is looked up and checked against
//! its declared kind and type before anything is allocated.

use super::instance::ExternVal;
use super::store::GlobalInstance;
use super::{Memory, RuntimeError, Table, Value};
use crate::parser::module::{FunctionType, ValueType};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Signature of a host callable: the arguments plus the declared parameter
/// types, returning the result values.
pub type HostCallable = dyn Fn(&[Value], &[ValueType]) -> Result<Vec<Value>, RuntimeError>;

/// A function implemented by the embedder.
#[derive(Clone)]
pub struct HostFunc {
    func_type: FunctionType,
    callable: Rc<HostCallable>,
}

impl HostFunc {
    pub fn new<F>(func_type: FunctionType, callable: F) -> Self
    where
        F: Fn(&[Value], &[ValueType]) -> Result<Vec<Value>, RuntimeError> + 'static,
    {
        HostFunc {
            func_type,
            callable: Rc::new(callable),
        }
    }

    pub fn func_type(&self) -> &FunctionType {
        &self.func_type
    }

    /// Run the callable and check that it produced the declared results.
    pub fn call(&self, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        let results = (self.callable)(args, &self.func_type.params)?;
        let actual: Vec<ValueType> = results.iter().map(Value::typ).collect();
        if actual != self.func_type.results {
            return Err(RuntimeError::TypeMismatch {
                expected: format!("{:?}", self.func_type.results),
                actual: format!("{actual:?}"),
            });
        }
        Ok(results)
    }
}

impl fmt::Debug for HostFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFunc({})", self.func_type)
    }
}

/// What an import can be bound to.
#[derive(Debug, Clone)]
pub enum HostBinding {
    Function(HostFunc),
    Table(Table),
    Memory(Memory),
    Global(GlobalInstance),
    /// An export of another instance already living in the same store.
    Extern(ExternVal),
}

impl HostBinding {
    pub fn kind(&self) -> &'static str {
        match self {
            HostBinding::Function(_) => "func",
            HostBinding::Table(_) => "table",
            HostBinding::Memory(_) => "memory",
            HostBinding::Global(_) => "global",
            HostBinding::Extern(ext) => ext.kind(),
        }
    }
}

/// Bindings keyed by `(module, name)`.
#[derive(Debug, Clone, Default)]
pub struct ImportObject {
    bindings: HashMap<(String, String), HostBinding>,
}

impl ImportObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: impl Into<String>, name: impl Into<String>, binding: HostBinding) {
        self.bindings.insert((module.into(), name.into()), binding);
    }

    /// Bind a host closure as a function import.
    pub fn add_function<F>(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        func_type: FunctionType,
        callable: F,
    ) where
        F: Fn(&[Value], &[ValueType]) -> Result<Vec<Value>, RuntimeError> + 'static,
    {
        self.insert(module, name, HostBinding::Function(HostFunc::new(func_type, callable)));
    }

    pub fn add_global(&mut self, module: impl Into<String>, name: impl Into<String>, value: Value, mutable: bool) {
        self.insert(module, name, HostBinding::Global(GlobalInstance::new(value, mutable)));
    }

    pub fn add_memory(&mut self, module: impl Into<String>, name: impl Into<String>, memory: Memory) {
        self.insert(module, name, HostBinding::Memory(memory));
    }

    pub fn add_table(&mut self, module: impl Into<String>, name: impl Into<String>, table: Table) {
        self.insert(module, name, HostBinding::Table(table));
    }

    pub fn add_extern(&mut self, module: impl Into<String>, name: impl Into<String>, ext: ExternVal) {
        self.insert(module, name, HostBinding::Extern(ext));
    }

    pub fn get(&self, module: &str, name: &str) -> Option<&HostBinding> {
        self.bindings.get(&(module.to_string(), name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unary_i32() -> FunctionType {
        FunctionType::new(vec![ValueType::I32], vec![ValueType::I32])
    }

    #[test]
    fn test_host_func_call() {
        let double = HostFunc::new(unary_i32(), |args, types| {
            assert_eq!(types, &[ValueType::I32]);
            Ok(vec![Value::from_i32(args[0].to_i32() * 2)])
        });
        assert_eq!(double.call(&[Value::from_i32(21)]).unwrap(), vec![Value::from_i32(42)]);
    }

    #[test]
    fn test_host_func_result_types_checked() {
        let wrong = HostFunc::new(unary_i32(), |_, _| Ok(vec![Value::from_f32(1.0)]));
        assert!(matches!(
            wrong.call(&[Value::from_i32(0)]),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_host_error_propagates() {
        let failing = HostFunc::new(unary_i32(), |_, _| Err(RuntimeError::HostError("boom".into())));
        assert!(matches!(failing.call(&[Value::from_i32(0)]), Err(RuntimeError::HostError(_))));
    }

    #[test]
    fn test_import_object_lookup() {
        let mut imports = ImportObject::new();
        imports.add_global("env", "base", Value::from_i32(8), false);
        imports.add_function("env", "print", FunctionType::new(vec![ValueType::I32], vec![]), |_, _| {
            Ok(vec![])
        });

        assert_eq!(imports.len(), 2);
        assert_eq!(imports.get("env", "base").unwrap().kind(), "global");
        assert_eq!(imports.get("env", "print").unwrap().kind(), "func");
        assert!(imports.get("env", "missing").is_none());
        assert!(imports.get("other", "print").is_none());
    }
}
