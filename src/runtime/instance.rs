//! Module instances and the embedder-facing [`Instance`] handle

use super::store::{FuncAddr, GlobalAddr, MemoryAddr, Store, TableAddr};
use super::{EngineConfig, ImportObject, RuntimeError, Value};
use crate::parser::module::{FunctionType, Module, ValueType};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A typed address of something importable or exportable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternVal {
    Func(FuncAddr),
    Table(TableAddr),
    Memory(MemoryAddr),
    Global(GlobalAddr),
}

impl ExternVal {
    pub fn kind(&self) -> &'static str {
        match self {
            ExternVal::Func(_) => "func",
            ExternVal::Table(_) => "table",
            ExternVal::Memory(_) => "memory",
            ExternVal::Global(_) => "global",
        }
    }
}

/// The per-instantiation view of a module: its index spaces resolved to
/// store addresses, and its exports.
///
/// Every wasm function allocated for the module holds an `Rc` to this, so the
/// function resolves its own globals, memory and tables wherever it is
/// called from.
#[derive(Debug, Default)]
pub struct ModuleInstance {
    pub types: Vec<FunctionType>,
    pub func_addrs: Vec<FuncAddr>,
    pub table_addrs: Vec<TableAddr>,
    pub mem_addrs: Vec<MemoryAddr>,
    pub global_addrs: Vec<GlobalAddr>,
    pub exports: HashMap<String, ExternVal>,
}

impl ModuleInstance {
    pub fn export(&self, name: &str) -> Option<ExternVal> {
        self.exports.get(name).copied()
    }

    pub fn func_addr(&self, idx: u32) -> Result<FuncAddr, RuntimeError> {
        self.func_addrs
            .get(idx as usize)
            .copied()
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(idx))
    }

    pub fn global_addr(&self, idx: u32) -> Result<GlobalAddr, RuntimeError> {
        self.global_addrs
            .get(idx as usize)
            .copied()
            .ok_or(RuntimeError::GlobalIndexOutOfBounds(idx))
    }

    /// The single memory of a 1.0 module.
    pub fn memory_addr(&self) -> Result<MemoryAddr, RuntimeError> {
        self.mem_addrs
            .first()
            .copied()
            .ok_or_else(|| RuntimeError::MemoryError("module has no memory".to_string()))
    }

    pub fn table_addr(&self) -> Option<TableAddr> {
        self.table_addrs.first().copied()
    }

    pub fn func_type(&self, idx: u32) -> Result<&FunctionType, RuntimeError> {
        self.types
            .get(idx as usize)
            .ok_or_else(|| RuntimeError::TypeMismatch {
                expected: format!("type index below {}", self.types.len()),
                actual: idx.to_string(),
            })
    }
}

/// An argument as supplied by an embedder or the command line, converted to
/// the declared parameter type at call time.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
}

impl Input {
    pub fn to_value(&self, typ: ValueType) -> Result<Value, RuntimeError> {
        let value = match (self, typ) {
            (Input::Str(s), _) => return parse_input(s, typ),
            (Input::I32(v), ValueType::I32) => Value::from_i32(*v),
            (Input::I32(v), ValueType::I64) => Value::from_i64(*v as i64),
            (Input::I32(v), ValueType::F32) => Value::from_f32(*v as f32),
            (Input::I32(v), ValueType::F64) => Value::from_f64(*v as f64),
            (Input::I64(v), ValueType::I32) => Value::from_i32(*v as i32),
            (Input::I64(v), ValueType::I64) => Value::from_i64(*v),
            (Input::I64(v), ValueType::F32) => Value::from_f32(*v as f32),
            (Input::I64(v), ValueType::F64) => Value::from_f64(*v as f64),
            (Input::F32(v), ValueType::I32) => Value::from_i32(*v as i32),
            (Input::F32(v), ValueType::I64) => Value::from_i64(*v as i64),
            (Input::F32(v), ValueType::F32) => Value::from_f32(*v),
            (Input::F32(v), ValueType::F64) => Value::from_f64(*v as f64),
            (Input::F64(v), ValueType::I32) => Value::from_i32(*v as i32),
            (Input::F64(v), ValueType::I64) => Value::from_i64(*v as i64),
            (Input::F64(v), ValueType::F32) => Value::from_f32(*v as f32),
            (Input::F64(v), ValueType::F64) => Value::from_f64(*v),
        };
        Ok(value)
    }
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Input::Str(s.to_string())
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::I32(v) => write!(f, "{v}"),
            Input::I64(v) => write!(f, "{v}"),
            Input::F32(v) => write!(f, "{v}"),
            Input::F64(v) => write!(f, "{v}"),
            Input::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Integers accept decimal or `0x` hex with an optional sign, and any bit
/// pattern of the target width (so `0xffffffff` is `-1` as i32).
fn parse_int(s: &str) -> Option<i128> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits = digits.replace('_', "");
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i128>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_input(s: &str, typ: ValueType) -> Result<Value, RuntimeError> {
    let invalid = || RuntimeError::InvalidInput(format!("cannot read {s:?} as {typ}"));
    let s = s.trim();
    match typ {
        ValueType::I32 => {
            let v = parse_int(s).ok_or_else(invalid)?;
            if v < i32::MIN as i128 || v > u32::MAX as i128 {
                return Err(invalid());
            }
            Ok(Value::from_i32(v as i32))
        }
        ValueType::I64 => {
            let v = parse_int(s).ok_or_else(invalid)?;
            if v < i64::MIN as i128 || v > u64::MAX as i128 {
                return Err(invalid());
            }
            Ok(Value::from_i64(v as i64))
        }
        ValueType::F32 => s.parse::<f32>().map(Value::from_f32).map_err(|_| invalid()),
        ValueType::F64 => s.parse::<f64>().map(Value::from_f64).map_err(|_| invalid()),
    }
}

/// A module instantiated into its own store.
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use wasmstack::{decode, instantiate, ImportObject, Value};
///
/// // (func (export "answer") (result i32) i32.const 42)
/// let bytes = [
///     0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00,
///     0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7f,
///     0x03, 0x02, 0x01, 0x00,
///     0x07, 0x0a, 0x01, 0x06, b'a', b'n', b's', b'w', b'e', b'r', 0x00, 0x00,
///     0x0a, 0x06, 0x01, 0x04, 0x00, 0x41, 0x2a, 0x0b,
/// ];
/// let module = decode(&bytes)?;
/// let mut instance = instantiate(&module, &ImportObject::new())?;
/// assert_eq!(instance.invoke("answer", &[])?, vec![Value::from_i32(42)]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Instance {
    store: Store,
    module: Rc<ModuleInstance>,
}

impl Instance {
    pub fn new(module: &Module, imports: &ImportObject, config: EngineConfig) -> Result<Self, RuntimeError> {
        let mut store = Store::with_config(config);
        let instance = store.instantiate(module, imports)?;
        Ok(Instance {
            store,
            module: instance,
        })
    }

    pub fn invoke(&mut self, name: &str, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        self.store.invoke(&self.module, name, args)
    }

    /// Invoke with loosely typed inputs converted to the export's parameter types.
    pub fn invoke_inputs(&mut self, name: &str, inputs: &[Input]) -> Result<Vec<Value>, RuntimeError> {
        let addr = self.store.exported_function(&self.module, name)?;
        let params = self.store.function(addr)?.func_type().params.clone();
        if params.len() != inputs.len() {
            return Err(RuntimeError::ArgumentCountMismatch {
                expected: params.len(),
                actual: inputs.len(),
            });
        }
        let args = inputs
            .iter()
            .zip(&params)
            .map(|(input, typ)| input.to_value(*typ))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.invoke_func(addr, &args)
    }

    pub fn module_instance(&self) -> &Rc<ModuleInstance> {
        &self.module
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Current value of an exported global.
    pub fn global(&self, name: &str) -> Option<Value> {
        match self.module.export(name)? {
            ExternVal::Global(addr) => self.store.global_value(addr),
            _ => None,
        }
    }
}
