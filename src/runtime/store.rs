//! The Store: owner of every runtime instance
//!
//! Functions, tables, memories and globals live in flat lists; an address is
//! the index an entity was appended at and stays valid for the store's
//! lifetime. Module instances only hold addresses, so several instances can
//! share one store and link against each other's exports.
//!
//! # Instantiation
//!
//! ```text
//!  imports ──► bind (type-checked) ──► evaluate global initializers
//!          ──► allocate functions, tables, memories
//!          ──► bounds-check every element/data segment, then write them
//!          ──► exports ──► start function
//! ```

use super::executor::Configuration;
use super::imports::{HostBinding, HostFunc};
use super::instance::{ExternVal, ModuleInstance};
use super::{EngineConfig, ImportObject, Memory, RuntimeError, Table, Value};
use crate::parser::expression::Expression;
use crate::parser::instruction::InstructionKind;
use crate::parser::module::{
    ExportDesc, Function, FunctionType, GlobalType, ImportDesc, Limits, Module, ValueType,
};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncAddr(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableAddr(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryAddr(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalAddr(pub usize);

/// A callable in the store: wasm code bound to its module instance, or a
/// host function.
#[derive(Debug, Clone)]
pub enum FunctionInstance {
    Wasm {
        func_type: FunctionType,
        module: Rc<ModuleInstance>,
        code: Function,
    },
    Host(HostFunc),
}

impl FunctionInstance {
    pub fn func_type(&self) -> &FunctionType {
        match self {
            FunctionInstance::Wasm { func_type, .. } => func_type,
            FunctionInstance::Host(host) => host.func_type(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalInstance {
    pub global_type: GlobalType,
    pub value: Value,
}

impl GlobalInstance {
    pub fn new(value: Value, mutable: bool) -> Self {
        GlobalInstance {
            global_type: GlobalType {
                value_type: value.typ(),
                mutable,
            },
            value,
        }
    }
}

/// Imported entities must be at least as large as declared, and no less
/// bounded.
fn limits_match(actual_min: u32, actual_max: Option<u32>, expected: &Limits) -> bool {
    if actual_min < expected.min {
        return false;
    }
    match (expected.max, actual_max) {
        (None, _) => true,
        (Some(expected_max), Some(actual_max)) => actual_max <= expected_max,
        (Some(_), None) => false,
    }
}

fn import_mismatch(module: &str, name: &str, expected: impl ToString, actual: impl ToString) -> RuntimeError {
    RuntimeError::ImportTypeMismatch {
        module: module.to_string(),
        name: name.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

/// Evaluate a constant initializer: one constant or `global.get`, then `end`.
///
/// `globals` are the only globals visible to the expression, the imported
/// ones for global initializers and all of them for segment offsets.
fn eval_const(store: &Store, expr: &Expression, globals: &[GlobalAddr]) -> Result<Value, RuntimeError> {
    let invalid = || RuntimeError::InvalidConstExpr(expr.to_string());
    let [first, last] = expr.instructions() else {
        return Err(invalid());
    };
    if last.kind != InstructionKind::End {
        return Err(invalid());
    }
    match first.kind {
        InstructionKind::I32Const { value } => Ok(Value::from_i32(value)),
        InstructionKind::I64Const { value } => Ok(Value::from_i64(value)),
        InstructionKind::F32Const { value } => Ok(Value::from_f32(value)),
        InstructionKind::F64Const { value } => Ok(Value::from_f64(value)),
        InstructionKind::GlobalGet { global_idx } => {
            let addr = globals.get(global_idx as usize).ok_or_else(|| {
                RuntimeError::InvalidConstExpr(format!(
                    "global.get {global_idx} does not refer to an imported global"
                ))
            })?;
            store.global_value(*addr).ok_or(RuntimeError::GlobalIndexOutOfBounds(global_idx))
        }
        _ => Err(invalid()),
    }
}

fn eval_offset(store: &Store, expr: &Expression, globals: &[GlobalAddr]) -> Result<u32, RuntimeError> {
    let value = eval_const(store, expr, globals)?;
    if value.typ() != ValueType::I32 {
        return Err(RuntimeError::InvalidConstExpr(format!("offset must be i32, got {}", value.typ())));
    }
    Ok(value.to_u32())
}

#[derive(Debug, Default)]
pub struct Store {
    config: EngineConfig,
    functions: Vec<FunctionInstance>,
    tables: Vec<Table>,
    memories: Vec<Memory>,
    globals: Vec<GlobalInstance>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Store {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn allocate_function(&mut self, func: FunctionInstance) -> FuncAddr {
        self.functions.push(func);
        FuncAddr(self.functions.len() - 1)
    }

    pub fn allocate_table(&mut self, table: Table) -> TableAddr {
        self.tables.push(table);
        TableAddr(self.tables.len() - 1)
    }

    pub fn allocate_memory(&mut self, memory: Memory) -> MemoryAddr {
        self.memories.push(memory);
        MemoryAddr(self.memories.len() - 1)
    }

    pub fn allocate_global(&mut self, global: GlobalInstance) -> GlobalAddr {
        self.globals.push(global);
        GlobalAddr(self.globals.len() - 1)
    }

    pub fn function(&self, addr: FuncAddr) -> Result<&FunctionInstance, RuntimeError> {
        self.functions
            .get(addr.0)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(addr.0 as u32))
    }

    pub fn table(&self, addr: TableAddr) -> Option<&Table> {
        self.tables.get(addr.0)
    }

    pub fn table_mut(&mut self, addr: TableAddr) -> Option<&mut Table> {
        self.tables.get_mut(addr.0)
    }

    pub fn memory(&self, addr: MemoryAddr) -> Option<&Memory> {
        self.memories.get(addr.0)
    }

    pub fn memory_mut(&mut self, addr: MemoryAddr) -> Option<&mut Memory> {
        self.memories.get_mut(addr.0)
    }

    pub fn global(&self, addr: GlobalAddr) -> Option<&GlobalInstance> {
        self.globals.get(addr.0)
    }

    pub fn global_value(&self, addr: GlobalAddr) -> Option<Value> {
        self.global(addr).map(|global| global.value)
    }

    /// Store into a mutable global; the value must keep the global's type.
    pub fn set_global(&mut self, addr: GlobalAddr, value: Value) -> Result<(), RuntimeError> {
        let global = self
            .globals
            .get_mut(addr.0)
            .ok_or(RuntimeError::GlobalIndexOutOfBounds(addr.0 as u32))?;
        if !global.global_type.mutable {
            return Err(RuntimeError::ImmutableGlobal(addr.0 as u32));
        }
        if global.global_type.value_type != value.typ() {
            return Err(RuntimeError::TypeMismatch {
                expected: global.global_type.value_type.to_string(),
                actual: value.typ().to_string(),
            });
        }
        global.value = value;
        Ok(())
    }

    /// Instantiate `module` into this store.
    ///
    /// # Errors
    ///
    /// Link errors (`UnknownImport`, `ImportTypeMismatch`), initializer
    /// errors (`InvalidConstExpr`), segment bounds traps, and any trap raised
    /// by the start function.
    pub fn instantiate(&mut self, module: &Module, imports: &ImportObject) -> Result<Rc<ModuleInstance>, RuntimeError> {
        let mut instance = ModuleInstance {
            types: module.types.clone(),
            ..Default::default()
        };

        self.bind_imports(module, imports, &mut instance)?;
        debug!(
            functions = instance.func_addrs.len(),
            globals = instance.global_addrs.len(),
            "bound imports"
        );

        // Initializers only see imported globals.
        let imported_globals = instance.global_addrs.clone();
        for global in &module.globals {
            let value = eval_const(self, &global.init, &imported_globals)?;
            if value.typ() != global.global_type.value_type {
                return Err(RuntimeError::InvalidConstExpr(format!(
                    "initializer of type {} for {} global",
                    value.typ(),
                    global.global_type.value_type
                )));
            }
            let addr = self.allocate_global(GlobalInstance {
                global_type: global.global_type,
                value,
            });
            instance.global_addrs.push(addr);
        }

        // Function addresses are fixed before allocation so the instance can
        // be shared with its functions.
        let first = self.functions.len();
        instance
            .func_addrs
            .extend((0..module.functions.len()).map(|i| FuncAddr(first + i)));

        for table_type in &module.tables {
            let table = Table::new(table_type.limits, self.config.max_table_size)?;
            instance.table_addrs.push(self.allocate_table(table));
        }
        for memory_type in &module.memories {
            let limits = memory_type.limits;
            if limits.min > self.config.max_memory_pages {
                return Err(RuntimeError::MemoryError(format!(
                    "initial size {} pages exceeds limit {}",
                    limits.min, self.config.max_memory_pages
                )));
            }
            instance.mem_addrs.push(self.allocate_memory(Memory::new(limits.min, limits.max)?));
        }

        instance.exports = self.resolve_exports(module, &instance)?;

        let instance = Rc::new(instance);
        for function in &module.functions {
            let func_type = instance.func_type(function.type_index)?.clone();
            self.allocate_function(FunctionInstance::Wasm {
                func_type,
                module: Rc::clone(&instance),
                code: function.clone(),
            });
        }
        debug!(
            functions = module.functions.len(),
            tables = module.tables.len(),
            memories = module.memories.len(),
            "allocated module entities"
        );

        self.initialize_segments(module, &instance)?;

        if let Some(start) = module.start {
            let addr = instance.func_addr(start)?;
            debug!(func = addr.0, "running start function");
            self.invoke_func(addr, &[])?;
        }

        Ok(instance)
    }

    fn bind_imports(
        &mut self,
        module: &Module,
        imports: &ImportObject,
        instance: &mut ModuleInstance,
    ) -> Result<(), RuntimeError> {
        for import in &module.imports {
            let (m, n) = (import.module.as_str(), import.name.as_str());
            let binding = imports.get(m, n).ok_or_else(|| RuntimeError::UnknownImport {
                module: m.to_string(),
                name: n.to_string(),
            })?;

            match (&import.desc, binding) {
                (ImportDesc::Function(type_idx), HostBinding::Function(host)) => {
                    let expected = instance.func_type(*type_idx)?;
                    if host.func_type() != expected {
                        return Err(import_mismatch(m, n, expected, host.func_type()));
                    }
                    instance
                        .func_addrs
                        .push(self.allocate_function(FunctionInstance::Host(host.clone())));
                }
                (ImportDesc::Function(type_idx), HostBinding::Extern(ExternVal::Func(addr))) => {
                    let expected = instance.func_type(*type_idx)?;
                    let actual = self.function(*addr)?.func_type();
                    if actual != expected {
                        return Err(import_mismatch(m, n, expected, actual));
                    }
                    instance.func_addrs.push(*addr);
                }
                (ImportDesc::Table(table_type), HostBinding::Table(table)) => {
                    if !limits_match(table.size(), table.limits().max, &table_type.limits) {
                        return Err(import_mismatch(m, n, table_type.limits, table.limits()));
                    }
                    instance.table_addrs.push(self.allocate_table(table.clone()));
                }
                (ImportDesc::Table(table_type), HostBinding::Extern(ExternVal::Table(addr))) => {
                    let table = self.table(*addr).ok_or_else(|| import_mismatch(m, n, "table", "dangling address"))?;
                    if !limits_match(table.size(), table.limits().max, &table_type.limits) {
                        return Err(import_mismatch(m, n, table_type.limits, table.limits()));
                    }
                    instance.table_addrs.push(*addr);
                }
                (ImportDesc::Memory(memory_type), HostBinding::Memory(memory)) => {
                    if !limits_match(memory.size(), memory.max_pages(), &memory_type.limits) {
                        return Err(import_mismatch(m, n, memory_type.limits, memory.size()));
                    }
                    instance.mem_addrs.push(self.allocate_memory(memory.clone()));
                }
                (ImportDesc::Memory(memory_type), HostBinding::Extern(ExternVal::Memory(addr))) => {
                    let memory = self
                        .memory(*addr)
                        .ok_or_else(|| import_mismatch(m, n, "memory", "dangling address"))?;
                    if !limits_match(memory.size(), memory.max_pages(), &memory_type.limits) {
                        return Err(import_mismatch(m, n, memory_type.limits, memory.size()));
                    }
                    instance.mem_addrs.push(*addr);
                }
                (ImportDesc::Global(global_type), HostBinding::Global(global)) => {
                    if global.global_type != *global_type {
                        return Err(import_mismatch(m, n, global_type, global.global_type));
                    }
                    instance.global_addrs.push(self.allocate_global(*global));
                }
                (ImportDesc::Global(global_type), HostBinding::Extern(ExternVal::Global(addr))) => {
                    let global = self
                        .global(*addr)
                        .ok_or_else(|| import_mismatch(m, n, "global", "dangling address"))?;
                    if global.global_type != *global_type {
                        return Err(import_mismatch(m, n, global_type, global.global_type));
                    }
                    instance.global_addrs.push(*addr);
                }
                (desc, binding) => return Err(import_mismatch(m, n, desc.kind(), binding.kind())),
            }
        }
        Ok(())
    }

    fn resolve_exports(
        &self,
        module: &Module,
        instance: &ModuleInstance,
    ) -> Result<HashMap<String, ExternVal>, RuntimeError> {
        let mut exports = HashMap::new();
        for export in &module.exports {
            let missing = || RuntimeError::UnknownExport(export.name.clone());
            let ext = match export.desc {
                ExportDesc::Function(idx) => ExternVal::Func(instance.func_addr(idx)?),
                ExportDesc::Table(idx) => ExternVal::Table(*instance.table_addrs.get(idx as usize).ok_or_else(missing)?),
                ExportDesc::Memory(idx) => ExternVal::Memory(*instance.mem_addrs.get(idx as usize).ok_or_else(missing)?),
                ExportDesc::Global(idx) => ExternVal::Global(instance.global_addr(idx)?),
            };
            exports.insert(export.name.clone(), ext);
        }
        Ok(exports)
    }

    /// Write element and data segments, after checking that every one of them
    /// fits so a failing instantiation writes nothing.
    fn initialize_segments(&mut self, module: &Module, instance: &ModuleInstance) -> Result<(), RuntimeError> {
        let globals = &instance.global_addrs;

        let mut elements = Vec::with_capacity(module.elements.len());
        for element in &module.elements {
            let offset = eval_offset(self, &element.offset, globals)?;
            let addr = *instance
                .table_addrs
                .get(element.table_index as usize)
                .ok_or(RuntimeError::ElementSegmentOutOfBounds)?;
            let table = self.table(addr).ok_or(RuntimeError::ElementSegmentOutOfBounds)?;
            if !table.fits(offset, element.init.len()) {
                return Err(RuntimeError::ElementSegmentOutOfBounds);
            }
            let funcs = element
                .init
                .iter()
                .map(|idx| instance.func_addr(*idx))
                .collect::<Result<Vec<_>, _>>()?;
            elements.push((addr, offset, funcs));
        }

        let mut data = Vec::with_capacity(module.data.len());
        for segment in &module.data {
            let offset = eval_offset(self, &segment.offset, globals)?;
            let addr = *instance
                .mem_addrs
                .get(segment.memory_index as usize)
                .ok_or(RuntimeError::DataSegmentOutOfBounds)?;
            let memory = self.memory(addr).ok_or(RuntimeError::DataSegmentOutOfBounds)?;
            if offset as usize + segment.init.len() > memory.byte_len() {
                return Err(RuntimeError::DataSegmentOutOfBounds);
            }
            data.push((addr, offset, &segment.init));
        }

        for (addr, offset, funcs) in elements {
            if let Some(table) = self.table_mut(addr) {
                table.initialize(offset, &funcs)?;
            }
        }
        for (addr, offset, bytes) in data {
            if let Some(memory) = self.memory_mut(addr) {
                memory
                    .store(offset as u64, bytes)
                    .map_err(|_| RuntimeError::DataSegmentOutOfBounds)?;
            }
        }
        Ok(())
    }

    /// Address of the function exported as `name`.
    pub fn exported_function(&self, instance: &ModuleInstance, name: &str) -> Result<FuncAddr, RuntimeError> {
        match instance.export(name) {
            Some(ExternVal::Func(addr)) => Ok(addr),
            Some(_) => Err(RuntimeError::NotAFunction(name.to_string())),
            None => Err(RuntimeError::UnknownExport(name.to_string())),
        }
    }

    /// Call an exported function.
    pub fn invoke(&mut self, instance: &ModuleInstance, name: &str, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        let addr = self.exported_function(instance, name)?;
        debug!(name, func = addr.0, "invoke");
        self.invoke_func(addr, args)
    }

    /// Call a function by address; arguments are checked against its type.
    pub fn invoke_func(&mut self, addr: FuncAddr, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        Configuration::new(self).invoke(addr, args.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::instruction::{BlockType, Instruction};
    use crate::parser::module::{Data, Element, Export, Global, Import, MemoryType, TableType};

    fn expr(kinds: Vec<InstructionKind>) -> Expression {
        let mut instructions: Vec<Instruction> = kinds.into_iter().map(|k| Instruction::new(0, k)).collect();
        instructions.push(Instruction::new(0x0b, InstructionKind::End));
        Expression::new(instructions).unwrap()
    }

    fn i32_const(value: i32) -> Expression {
        expr(vec![InstructionKind::I32Const { value }])
    }

    fn function(type_index: u32, body: Vec<InstructionKind>) -> Function {
        Function {
            type_index,
            locals: vec![],
            body: Rc::new(expr(body)),
        }
    }

    fn returns_i32() -> FunctionType {
        FunctionType::new(vec![], vec![ValueType::I32])
    }

    fn import(desc: ImportDesc) -> Import {
        Import {
            module: "env".into(),
            name: "x".into(),
            desc,
        }
    }

    #[test]
    fn test_allocation_addresses_are_sequential() {
        let mut store = Store::new();
        let a = store.allocate_global(GlobalInstance::new(Value::from_i32(1), false));
        let b = store.allocate_global(GlobalInstance::new(Value::from_i32(2), true));
        assert_eq!((a, b), (GlobalAddr(0), GlobalAddr(1)));
        assert_eq!(store.allocate_memory(Memory::new(0, None).unwrap()), MemoryAddr(0));
    }

    #[test]
    fn test_set_global_rules() {
        let mut store = Store::new();
        let constant = store.allocate_global(GlobalInstance::new(Value::from_i32(1), false));
        let var = store.allocate_global(GlobalInstance::new(Value::from_i32(1), true));

        assert!(matches!(
            store.set_global(constant, Value::from_i32(2)),
            Err(RuntimeError::ImmutableGlobal(_))
        ));
        assert!(matches!(
            store.set_global(var, Value::from_i64(2)),
            Err(RuntimeError::TypeMismatch { .. })
        ));
        store.set_global(var, Value::from_i32(9)).unwrap();
        assert_eq!(store.global_value(var), Some(Value::from_i32(9)));
    }

    #[test]
    fn test_unknown_import() {
        let module = Module {
            types: vec![returns_i32()],
            imports: vec![import(ImportDesc::Function(0))],
            ..Default::default()
        };
        let err = Store::new().instantiate(&module, &ImportObject::new()).unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownImport { .. }));
    }

    #[test]
    fn test_import_kind_and_type_mismatch() {
        let module = Module {
            types: vec![returns_i32()],
            imports: vec![import(ImportDesc::Function(0))],
            ..Default::default()
        };

        let mut imports = ImportObject::new();
        imports.add_global("env", "x", Value::from_i32(0), false);
        let err = Store::new().instantiate(&module, &imports).unwrap_err();
        assert!(matches!(err, RuntimeError::ImportTypeMismatch { .. }));

        let mut imports = ImportObject::new();
        imports.add_function("env", "x", FunctionType::new(vec![], vec![]), |_, _| Ok(vec![]));
        let err = Store::new().instantiate(&module, &imports).unwrap_err();
        assert!(matches!(err, RuntimeError::ImportTypeMismatch { .. }));
    }

    #[test]
    fn test_imported_memory_limits_checked() {
        let module = Module {
            imports: vec![import(ImportDesc::Memory(MemoryType {
                limits: Limits { min: 2, max: None },
            }))],
            ..Default::default()
        };
        let mut imports = ImportObject::new();
        imports.add_memory("env", "x", Memory::new(1, None).unwrap());
        assert!(Store::new().instantiate(&module, &imports).is_err());

        let mut imports = ImportObject::new();
        imports.add_memory("env", "x", Memory::new(2, Some(4)).unwrap());
        assert!(Store::new().instantiate(&module, &imports).is_ok());
    }

    #[test]
    fn test_global_init_sees_only_imported_globals() {
        let i32_const_global = |init| Global {
            global_type: GlobalType {
                value_type: ValueType::I32,
                mutable: false,
            },
            init,
        };
        let module = Module {
            imports: vec![import(ImportDesc::Global(GlobalType {
                value_type: ValueType::I32,
                mutable: false,
            }))],
            globals: vec![
                i32_const_global(expr(vec![InstructionKind::GlobalGet { global_idx: 0 }])),
                i32_const_global(expr(vec![InstructionKind::GlobalGet { global_idx: 1 }])),
            ],
            ..Default::default()
        };
        let mut imports = ImportObject::new();
        imports.add_global("env", "x", Value::from_i32(5), false);
        let err = Store::new().instantiate(&module, &imports).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConstExpr(_)));

        let module = Module {
            globals: module.globals[..1].to_vec(),
            ..module
        };
        let mut store = Store::new();
        let instance = store.instantiate(&module, &imports).unwrap();
        assert_eq!(store.global_value(instance.global_addrs[1]), Some(Value::from_i32(5)));
    }

    #[test]
    fn test_const_expr_must_be_single_constant() {
        let module = Module {
            globals: vec![Global {
                global_type: GlobalType {
                    value_type: ValueType::I32,
                    mutable: false,
                },
                init: expr(vec![
                    InstructionKind::I32Const { value: 1 },
                    InstructionKind::I32Const { value: 2 },
                    InstructionKind::I32Add,
                ]),
            }],
            ..Default::default()
        };
        let err = Store::new().instantiate(&module, &ImportObject::new()).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConstExpr(_)));
    }

    fn module_with_segments(element_offset: i32, data_offset: i32) -> Module {
        Module {
            types: vec![returns_i32()],
            functions: vec![function(0, vec![InstructionKind::I32Const { value: 1 }])],
            tables: vec![TableType {
                limits: Limits { min: 2, max: None },
            }],
            memories: vec![MemoryType {
                limits: Limits { min: 1, max: None },
            }],
            elements: vec![Element {
                table_index: 0,
                offset: i32_const(element_offset),
                init: vec![0],
            }],
            data: vec![Data {
                memory_index: 0,
                offset: i32_const(data_offset),
                init: b"hi".to_vec(),
            }],
            exports: vec![Export {
                name: "mem".into(),
                desc: ExportDesc::Memory(0),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_segments_initialized() {
        let mut store = Store::new();
        let instance = store.instantiate(&module_with_segments(1, 10), &ImportObject::new()).unwrap();

        let table = store.table(instance.table_addrs[0]).unwrap();
        assert_eq!(table.get(1).unwrap(), Some(instance.func_addrs[0]));
        assert_eq!(table.get(0).unwrap(), None);

        let Some(ExternVal::Memory(mem)) = instance.export("mem") else {
            panic!("memory export missing");
        };
        assert_eq!(store.memory(mem).unwrap().read_bytes(10, 2).unwrap(), b"hi");
    }

    #[test]
    fn test_segment_bounds_checked_before_writes() {
        let mut store = Store::new();
        let err = store.instantiate(&module_with_segments(2, 0), &ImportObject::new()).unwrap_err();
        assert!(matches!(err, RuntimeError::ElementSegmentOutOfBounds));
        assert_eq!(store.memory(MemoryAddr(0)).unwrap().read_bytes(0, 2).unwrap(), vec![0, 0]);

        let mut store = Store::new();
        let err = store
            .instantiate(&module_with_segments(0, 65535), &ImportObject::new())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::DataSegmentOutOfBounds));
        assert_eq!(store.table(TableAddr(0)).unwrap().get(0).unwrap(), None);
    }

    #[test]
    fn test_start_function_runs() {
        let global = Global {
            global_type: GlobalType {
                value_type: ValueType::I32,
                mutable: true,
            },
            init: i32_const(0),
        };
        let module = Module {
            types: vec![FunctionType::new(vec![], vec![])],
            functions: vec![function(
                0,
                vec![
                    InstructionKind::I32Const { value: 7 },
                    InstructionKind::GlobalSet { global_idx: 0 },
                ],
            )],
            globals: vec![global],
            start: Some(0),
            ..Default::default()
        };
        let mut store = Store::new();
        let instance = store.instantiate(&module, &ImportObject::new()).unwrap();
        assert_eq!(store.global_value(instance.global_addrs[0]), Some(Value::from_i32(7)));
    }

    #[test]
    fn test_invoke_checks_arguments() {
        let module = Module {
            types: vec![FunctionType::new(vec![ValueType::I32], vec![ValueType::I32])],
            functions: vec![function(0, vec![InstructionKind::LocalGet { local_idx: 0 }])],
            exports: vec![Export {
                name: "id".into(),
                desc: ExportDesc::Function(0),
            }],
            ..Default::default()
        };
        let mut store = Store::new();
        let instance = store.instantiate(&module, &ImportObject::new()).unwrap();

        assert_eq!(
            store.invoke(&instance, "id", &[Value::from_i32(3)]).unwrap(),
            vec![Value::from_i32(3)]
        );
        assert!(matches!(
            store.invoke(&instance, "id", &[]),
            Err(RuntimeError::ArgumentCountMismatch { expected: 1, actual: 0 })
        ));
        assert!(matches!(
            store.invoke(&instance, "id", &[Value::from_f32(1.0)]),
            Err(RuntimeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            store.invoke(&instance, "nope", &[]),
            Err(RuntimeError::UnknownExport(_))
        ));
    }

    #[test]
    fn test_cross_instance_linking() {
        let provider = Module {
            types: vec![returns_i32()],
            functions: vec![function(0, vec![InstructionKind::I32Const { value: 11 }])],
            exports: vec![Export {
                name: "eleven".into(),
                desc: ExportDesc::Function(0),
            }],
            ..Default::default()
        };
        let consumer = Module {
            types: vec![returns_i32()],
            imports: vec![import(ImportDesc::Function(0))],
            functions: vec![function(
                0,
                vec![
                    InstructionKind::Call { func_idx: 0 },
                    InstructionKind::Block {
                        block_type: BlockType::Empty,
                    },
                    InstructionKind::End,
                ],
            )],
            exports: vec![Export {
                name: "run".into(),
                desc: ExportDesc::Function(1),
            }],
            ..Default::default()
        };

        let mut store = Store::new();
        let first = store.instantiate(&provider, &ImportObject::new()).unwrap();
        let mut imports = ImportObject::new();
        imports.add_extern("env", "x", first.export("eleven").unwrap());
        let second = store.instantiate(&consumer, &imports).unwrap();

        assert_eq!(store.invoke(&second, "run", &[]).unwrap(), vec![Value::from_i32(11)]);
    }
}
