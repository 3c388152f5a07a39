//! Common test utilities shared between integration tests
//!
//! [`ModuleBuilder`] assembles binary modules section by section with the
//! crate's own encoders, so fixtures stay readable without a text-format
//! assembler.

#![allow(dead_code)]

pub use wasmstack::parser::encoding::*;

pub const I32: u8 = TYPE_I32;
pub const I64: u8 = TYPE_I64;
pub const F32: u8 = TYPE_F32;
pub const F64: u8 = TYPE_F64;

/// Opcodes used by the fixtures.
pub mod op {
    pub const UNREACHABLE: u8 = 0x00;
    pub const BLOCK: u8 = 0x02;
    pub const LOOP: u8 = 0x03;
    pub const IF: u8 = 0x04;
    pub const ELSE: u8 = 0x05;
    pub const END: u8 = 0x0b;
    pub const BR: u8 = 0x0c;
    pub const BR_IF: u8 = 0x0d;
    pub const RETURN: u8 = 0x0f;
    pub const CALL: u8 = 0x10;
    pub const CALL_INDIRECT: u8 = 0x11;
    pub const DROP: u8 = 0x1a;
    pub const LOCAL_GET: u8 = 0x20;
    pub const LOCAL_SET: u8 = 0x21;
    pub const LOCAL_TEE: u8 = 0x22;
    pub const GLOBAL_GET: u8 = 0x23;
    pub const GLOBAL_SET: u8 = 0x24;
    pub const I32_LOAD: u8 = 0x28;
    pub const I32_STORE: u8 = 0x36;
    pub const MEMORY_SIZE: u8 = 0x3f;
    pub const MEMORY_GROW: u8 = 0x40;
    pub const I32_CONST: u8 = 0x41;
    pub const I64_CONST: u8 = 0x42;
    pub const F64_CONST: u8 = 0x44;
    pub const I32_EQZ: u8 = 0x45;
    pub const I64_LT_S: u8 = 0x53;
    pub const I32_ADD: u8 = 0x6a;
    pub const I32_SUB: u8 = 0x6b;
    pub const I32_MUL: u8 = 0x6c;
    pub const I32_DIV_S: u8 = 0x6d;
    pub const I64_ADD: u8 = 0x7c;
    pub const I64_SUB: u8 = 0x7d;
    pub const F64_ADD: u8 = 0xa0;
    pub const I32_TRUNC_F64_S: u8 = 0xaa;
}

pub fn i32_const(v: i32) -> Vec<u8> {
    let mut code = vec![op::I32_CONST];
    write_vs32(&mut code, v);
    code
}

pub fn i64_const(v: i64) -> Vec<u8> {
    let mut code = vec![op::I64_CONST];
    write_vs64(&mut code, v);
    code
}

pub fn f64_const(v: f64) -> Vec<u8> {
    let mut code = vec![op::F64_CONST];
    write_f64(&mut code, v);
    code
}

/// An opcode followed by one unsigned immediate.
pub fn with_index(opcode: u8, idx: u32) -> Vec<u8> {
    let mut code = vec![opcode];
    write_vu32(&mut code, idx);
    code
}

pub fn local_get(idx: u32) -> Vec<u8> {
    with_index(op::LOCAL_GET, idx)
}

pub fn call(idx: u32) -> Vec<u8> {
    with_index(op::CALL, idx)
}

/// A memory instruction with `align=2` and the given offset.
pub fn mem(opcode: u8, offset: u32) -> Vec<u8> {
    let mut code = vec![opcode, 0x02];
    write_vu32(&mut code, offset);
    code
}

struct Func {
    type_index: u32,
    locals: Vec<(u32, u8)>,
    code: Option<Vec<u8>>,
}

#[derive(Default)]
pub struct ModuleBuilder {
    types: Vec<(Vec<u8>, Vec<u8>)>,
    imports: Vec<(String, String, u32)>,
    functions: Vec<Func>,
    table: Option<u32>,
    memory: Option<(u32, Option<u32>)>,
    globals: Vec<(u8, bool, Vec<u8>)>,
    exports: Vec<(String, u8, u32)>,
    start: Option<u32>,
    elements: Vec<(i32, Vec<u32>)>,
    data: Vec<(i32, Vec<u8>)>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function type and return its index.
    pub fn typ(&mut self, params: &[u8], results: &[u8]) -> u32 {
        self.types.push((params.to_vec(), results.to_vec()));
        self.types.len() as u32 - 1
    }

    /// Import a function; imports must be added before any local function.
    pub fn import_func(&mut self, module: &str, name: &str, type_index: u32) -> u32 {
        assert!(self.functions.is_empty(), "imports come before local functions");
        self.imports.push((module.to_string(), name.to_string(), type_index));
        self.imports.len() as u32 - 1
    }

    /// Add a function whose body is `code` (without the final `end`) and
    /// return its index in the function index space.
    pub fn func(&mut self, type_index: u32, locals: &[(u32, u8)], code: &[u8]) -> u32 {
        self.functions.push(Func {
            type_index,
            locals: locals.to_vec(),
            code: Some(code.to_vec()),
        });
        (self.imports.len() + self.functions.len()) as u32 - 1
    }

    /// Declare a function in the function section without a code entry.
    pub fn declare_only(&mut self, type_index: u32) {
        self.functions.push(Func {
            type_index,
            locals: vec![],
            code: None,
        });
    }

    pub fn table(&mut self, min: u32) -> &mut Self {
        self.table = Some(min);
        self
    }

    pub fn memory(&mut self, min: u32, max: Option<u32>) -> &mut Self {
        self.memory = Some((min, max));
        self
    }

    /// Add a global with a constant initializer (without the final `end`).
    pub fn global(&mut self, value_type: u8, mutable: bool, init: &[u8]) -> u32 {
        self.globals.push((value_type, mutable, init.to_vec()));
        self.globals.len() as u32 - 1
    }

    pub fn export(&mut self, name: &str, desc: u8, idx: u32) -> &mut Self {
        self.exports.push((name.to_string(), desc, idx));
        self
    }

    pub fn export_func(&mut self, name: &str, idx: u32) -> &mut Self {
        self.export(name, DESC_FUNC, idx)
    }

    pub fn start(&mut self, idx: u32) -> &mut Self {
        self.start = Some(idx);
        self
    }

    pub fn element(&mut self, offset: i32, funcs: &[u32]) -> &mut Self {
        self.elements.push((offset, funcs.to_vec()));
        self
    }

    pub fn data(&mut self, offset: i32, bytes: &[u8]) -> &mut Self {
        self.data.push((offset, bytes.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&VERSION.to_le_bytes());

        if !self.types.is_empty() {
            let mut payload = Vec::new();
            write_vu32(&mut payload, self.types.len() as u32);
            for (params, results) in &self.types {
                payload.push(TYPE_FUNC);
                write_bytes(&mut payload, params);
                write_bytes(&mut payload, results);
            }
            write_section(&mut out, SECTION_TYPE, &payload);
        }

        if !self.imports.is_empty() {
            let mut payload = Vec::new();
            write_vu32(&mut payload, self.imports.len() as u32);
            for (module, name, type_index) in &self.imports {
                write_name(&mut payload, module);
                write_name(&mut payload, name);
                payload.push(DESC_FUNC);
                write_vu32(&mut payload, *type_index);
            }
            write_section(&mut out, SECTION_IMPORT, &payload);
        }

        if !self.functions.is_empty() {
            let mut payload = Vec::new();
            write_vu32(&mut payload, self.functions.len() as u32);
            for func in &self.functions {
                write_vu32(&mut payload, func.type_index);
            }
            write_section(&mut out, SECTION_FUNCTION, &payload);
        }

        if let Some(min) = self.table {
            let mut payload = Vec::new();
            write_vu32(&mut payload, 1);
            payload.push(ELEM_TYPE_FUNCREF);
            write_limits(&mut payload, min, None);
            write_section(&mut out, SECTION_TABLE, &payload);
        }

        if let Some((min, max)) = self.memory {
            let mut payload = Vec::new();
            write_vu32(&mut payload, 1);
            write_limits(&mut payload, min, max);
            write_section(&mut out, SECTION_MEMORY, &payload);
        }

        if !self.globals.is_empty() {
            let mut payload = Vec::new();
            write_vu32(&mut payload, self.globals.len() as u32);
            for (value_type, mutable, init) in &self.globals {
                payload.push(*value_type);
                payload.push(if *mutable { MUT_VAR } else { MUT_CONST });
                payload.extend_from_slice(init);
                payload.push(OP_END);
            }
            write_section(&mut out, SECTION_GLOBAL, &payload);
        }

        if !self.exports.is_empty() {
            let mut payload = Vec::new();
            write_vu32(&mut payload, self.exports.len() as u32);
            for (name, desc, idx) in &self.exports {
                write_name(&mut payload, name);
                payload.push(*desc);
                write_vu32(&mut payload, *idx);
            }
            write_section(&mut out, SECTION_EXPORT, &payload);
        }

        if let Some(idx) = self.start {
            let mut payload = Vec::new();
            write_vu32(&mut payload, idx);
            write_section(&mut out, SECTION_START, &payload);
        }

        if !self.elements.is_empty() {
            let mut payload = Vec::new();
            write_vu32(&mut payload, self.elements.len() as u32);
            for (offset, funcs) in &self.elements {
                write_vu32(&mut payload, 0);
                payload.extend(i32_const(*offset));
                payload.push(OP_END);
                write_vu32(&mut payload, funcs.len() as u32);
                for idx in funcs {
                    write_vu32(&mut payload, *idx);
                }
            }
            write_section(&mut out, SECTION_ELEMENT, &payload);
        }

        let codes: Vec<&Func> = self.functions.iter().filter(|f| f.code.is_some()).collect();
        if !codes.is_empty() {
            let mut payload = Vec::new();
            write_vu32(&mut payload, codes.len() as u32);
            for func in codes {
                let mut body = Vec::new();
                write_vu32(&mut body, func.locals.len() as u32);
                for (count, value_type) in &func.locals {
                    write_vu32(&mut body, *count);
                    body.push(*value_type);
                }
                body.extend_from_slice(func.code.as_deref().unwrap_or_default());
                body.push(OP_END);
                write_bytes(&mut payload, &body);
            }
            write_section(&mut out, SECTION_CODE, &payload);
        }

        if !self.data.is_empty() {
            let mut payload = Vec::new();
            write_vu32(&mut payload, self.data.len() as u32);
            for (offset, bytes) in &self.data {
                write_vu32(&mut payload, 0);
                payload.extend(i32_const(*offset));
                payload.push(OP_END);
                write_bytes(&mut payload, bytes);
            }
            write_section(&mut out, SECTION_DATA, &payload);
        }

        out
    }
}

fn write_limits(buf: &mut Vec<u8>, min: u32, max: Option<u32>) {
    match max {
        Some(max) => {
            buf.push(LIMITS_MIN_MAX);
            write_vu32(buf, min);
            write_vu32(buf, max);
        }
        None => {
            buf.push(LIMITS_MIN);
            write_vu32(buf, min);
        }
    }
}
