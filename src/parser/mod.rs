//! WebAssembly binary decoder
//!
//! [`decode`] turns a byte slice into a [`Module`]. Sections must appear in
//! canonical order, at most once each (custom sections excepted), and every
//! section parser must consume exactly the declared section size.

pub mod encoding;
pub mod expression;
pub mod instruction;
pub mod limits;
pub mod module;
pub mod reader;

use std::rc::Rc;

use tracing::{debug, warn};

use self::encoding::*;
use self::expression::Expression;
use self::module::{
    CustomSection, Data, Element, Export, ExportDesc, Function, FunctionType, Global, GlobalType,
    Import, ImportDesc, Limits, MemoryType, Module, TableType, ValueType,
};
use self::reader::Reader;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("magic header not detected")]
    InvalidMagic,
    #[error("unknown binary version: {0}")]
    UnsupportedVersion(u32),
    #[error("unknown section id: {0}")]
    UnknownSection(u8),
    #[error("section {id} out of order after section {previous}")]
    SectionOutOfOrder { id: u8, previous: u8 },
    #[error("duplicate section id: {0}")]
    DuplicateSection(u8),
    #[error("section {id} size mismatch: declared {declared} bytes, consumed {consumed}")]
    SectionSizeMismatch { id: u8, declared: usize, consumed: usize },
    #[error("function body {index} size mismatch: declared {declared} bytes, consumed {consumed}")]
    FunctionBodySizeMismatch {
        index: usize,
        declared: usize,
        consumed: usize,
    },
    #[error("function and code section have inconsistent lengths: {functions} functions, {codes} bodies")]
    FunctionCodeMismatch { functions: usize, codes: usize },
    #[error("unbalanced block nesting at instruction {0}")]
    UnbalancedNesting(usize),
    #[error("expression did not end with end opcode")]
    MissingEnd,
    #[error("invalid value type: {0:#04x}")]
    InvalidValueType(u8),
    #[error("invalid function type marker: {0:#04x}")]
    InvalidFunctionType(u8),
    #[error("invalid import/export descriptor: {0:#04x}")]
    InvalidDescriptor(u8),
    #[error("invalid limits flag: {0:#04x}")]
    InvalidLimits(u8),
    #[error("invalid global mutability: {0:#04x}")]
    InvalidMutability(u8),
    #[error("invalid table element type: {0:#04x}")]
    InvalidElementType(u8),
    #[error("integer representation too long")]
    IntegerOverflow,
    #[error("malformed UTF-8 encoding")]
    InvalidUtf8,
    #[error("too many locals: {0}")]
    TooManyLocals(u64),
    #[error("too many {what}: {count}")]
    TooManyEntries { what: &'static str, count: u32 },
}

/// Decode a complete binary module.
pub fn decode(bytes: &[u8]) -> Result<Module, DecodeError> {
    let mut reader = Reader::new(bytes.to_vec());

    if reader.read_bytes(4).map_err(|_| DecodeError::InvalidMagic)? != MAGIC {
        return Err(DecodeError::InvalidMagic);
    }
    let version = reader.read_u32()?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let mut module = Module::default();
    let mut function_types: Vec<u32> = Vec::new();
    let mut code_seen = false;
    let mut previous: Option<u8> = None;

    while !reader.is_empty() {
        let id = reader.read_byte()?;
        let size = reader.read_vu32()? as usize;
        let mut section = reader.sub_reader(size)?;
        debug!(id, size, "decoding section");

        if id != SECTION_CUSTOM {
            if id > SECTION_DATA {
                return Err(DecodeError::UnknownSection(id));
            }
            match previous {
                Some(prev) if prev == id => return Err(DecodeError::DuplicateSection(id)),
                Some(prev) if prev > id => {
                    return Err(DecodeError::SectionOutOfOrder { id, previous: prev })
                }
                _ => previous = Some(id),
            }
        }

        match id {
            SECTION_CUSTOM => {
                let name = section.read_string()?;
                let payload_len = section.remaining();
                // skip the payload, it is opaque to this engine
                section.read_bytes(payload_len)?;
                warn!(%name, payload_len, "skipping custom section");
                module.customs.push(CustomSection { name, payload_len });
            }
            SECTION_TYPE => module.types = read_section_type(&mut section)?,
            SECTION_IMPORT => module.imports = read_section_import(&mut section)?,
            SECTION_FUNCTION => function_types = read_section_function(&mut section)?,
            SECTION_TABLE => module.tables = read_section_table(&mut section)?,
            SECTION_MEMORY => module.memories = read_section_memory(&mut section)?,
            SECTION_GLOBAL => module.globals = read_section_global(&mut section)?,
            SECTION_EXPORT => module.exports = read_section_export(&mut section)?,
            SECTION_START => module.start = Some(section.read_vu32()?),
            SECTION_ELEMENT => module.elements = read_section_element(&mut section)?,
            SECTION_CODE => {
                module.functions = read_section_code(&mut section, &function_types)?;
                code_seen = true;
            }
            SECTION_DATA => module.data = read_section_data(&mut section)?,
            _ => return Err(DecodeError::UnknownSection(id)),
        }

        if !section.is_empty() {
            return Err(DecodeError::SectionSizeMismatch {
                id,
                declared: size,
                consumed: section.pos(),
            });
        }
    }

    if !code_seen && !function_types.is_empty() {
        return Err(DecodeError::FunctionCodeMismatch {
            functions: function_types.len(),
            codes: 0,
        });
    }

    debug!(
        types = module.types.len(),
        imports = module.imports.len(),
        functions = module.functions.len(),
        exports = module.exports.len(),
        "module decoded"
    );
    Ok(module)
}

/// Read a vector length, bounded by the given ceiling.
fn read_count(reader: &mut Reader, what: &'static str, max: u32) -> Result<u32, DecodeError> {
    let count = reader.read_vu32()?;
    if count > max {
        return Err(DecodeError::TooManyEntries { what, count });
    }
    Ok(count)
}

fn read_value_types(reader: &mut Reader, what: &'static str) -> Result<Vec<ValueType>, DecodeError> {
    let count = read_count(reader, what, limits::MAX_FUNCTION_TYPE_ARITY)?;
    (0..count)
        .map(|_| ValueType::decode(reader.read_byte()?))
        .collect()
}

fn read_limits(reader: &mut Reader) -> Result<Limits, DecodeError> {
    match reader.read_byte()? {
        LIMITS_MIN => Ok(Limits {
            min: reader.read_vu32()?,
            max: None,
        }),
        LIMITS_MIN_MAX => Ok(Limits {
            min: reader.read_vu32()?,
            max: Some(reader.read_vu32()?),
        }),
        flag => Err(DecodeError::InvalidLimits(flag)),
    }
}

fn read_table_type(reader: &mut Reader) -> Result<TableType, DecodeError> {
    let element_type = reader.read_byte()?;
    if element_type != ELEM_TYPE_FUNCREF {
        return Err(DecodeError::InvalidElementType(element_type));
    }
    Ok(TableType {
        limits: read_limits(reader)?,
    })
}

fn read_global_type(reader: &mut Reader) -> Result<GlobalType, DecodeError> {
    let value_type = ValueType::decode(reader.read_byte()?)?;
    let mutable = match reader.read_byte()? {
        MUT_CONST => false,
        MUT_VAR => true,
        flag => return Err(DecodeError::InvalidMutability(flag)),
    };
    Ok(GlobalType { value_type, mutable })
}

fn read_section_type(reader: &mut Reader) -> Result<Vec<FunctionType>, DecodeError> {
    let count = read_count(reader, "types", limits::MAX_SECTION_ENTRIES)?;
    let mut types = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let marker = reader.read_byte()?;
        if marker != TYPE_FUNC {
            return Err(DecodeError::InvalidFunctionType(marker));
        }
        let params = read_value_types(reader, "parameters")?;
        let results = read_value_types(reader, "results")?;
        types.push(FunctionType { params, results });
    }
    Ok(types)
}

fn read_section_import(reader: &mut Reader) -> Result<Vec<Import>, DecodeError> {
    let count = read_count(reader, "imports", limits::MAX_SECTION_ENTRIES)?;
    let mut imports = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let module = reader.read_string()?;
        let name = reader.read_string()?;
        let desc = match reader.read_byte()? {
            DESC_FUNC => ImportDesc::Function(reader.read_vu32()?),
            DESC_TABLE => ImportDesc::Table(read_table_type(reader)?),
            DESC_MEMORY => ImportDesc::Memory(MemoryType {
                limits: read_limits(reader)?,
            }),
            DESC_GLOBAL => ImportDesc::Global(read_global_type(reader)?),
            tag => return Err(DecodeError::InvalidDescriptor(tag)),
        };
        imports.push(Import { module, name, desc });
    }
    Ok(imports)
}

fn read_section_function(reader: &mut Reader) -> Result<Vec<u32>, DecodeError> {
    let count = read_count(reader, "functions", limits::MAX_SECTION_ENTRIES)?;
    (0..count).map(|_| reader.read_vu32()).collect()
}

fn read_section_table(reader: &mut Reader) -> Result<Vec<TableType>, DecodeError> {
    let count = read_count(reader, "tables", limits::MAX_SECTION_ENTRIES)?;
    (0..count).map(|_| read_table_type(reader)).collect()
}

fn read_section_memory(reader: &mut Reader) -> Result<Vec<MemoryType>, DecodeError> {
    let count = read_count(reader, "memories", limits::MAX_SECTION_ENTRIES)?;
    (0..count)
        .map(|_| {
            Ok(MemoryType {
                limits: read_limits(reader)?,
            })
        })
        .collect()
}

fn read_section_global(reader: &mut Reader) -> Result<Vec<Global>, DecodeError> {
    let count = read_count(reader, "globals", limits::MAX_SECTION_ENTRIES)?;
    let mut globals = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let global_type = read_global_type(reader)?;
        let init = Expression::decode(reader)?;
        globals.push(Global { global_type, init });
    }
    Ok(globals)
}

fn read_section_export(reader: &mut Reader) -> Result<Vec<Export>, DecodeError> {
    let count = read_count(reader, "exports", limits::MAX_SECTION_ENTRIES)?;
    let mut exports = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = reader.read_string()?;
        let tag = reader.read_byte()?;
        let desc = ExportDesc::decode(tag, reader.read_vu32()?)?;
        exports.push(Export { name, desc });
    }
    Ok(exports)
}

fn read_section_element(reader: &mut Reader) -> Result<Vec<Element>, DecodeError> {
    let count = read_count(reader, "element segments", limits::MAX_SECTION_ENTRIES)?;
    let mut elements = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let table_index = reader.read_vu32()?;
        let offset = Expression::decode(reader)?;
        let len = read_count(reader, "element indices", limits::MAX_ELEMENT_INDICES)?;
        let init = (0..len)
            .map(|_| reader.read_vu32())
            .collect::<Result<Vec<u32>, DecodeError>>()?;
        elements.push(Element {
            table_index,
            offset,
            init,
        });
    }
    Ok(elements)
}

fn read_section_code(reader: &mut Reader, function_types: &[u32]) -> Result<Vec<Function>, DecodeError> {
    let count = read_count(reader, "function bodies", limits::MAX_SECTION_ENTRIES)? as usize;
    if count != function_types.len() {
        return Err(DecodeError::FunctionCodeMismatch {
            functions: function_types.len(),
            codes: count,
        });
    }

    let mut functions = Vec::with_capacity(count);
    for (index, &type_index) in function_types.iter().enumerate() {
        let size = reader.read_vu32()? as usize;
        let mut body = reader.sub_reader(size)?;

        let groups = read_count(&mut body, "local declarations", limits::MAX_SECTION_ENTRIES)?;
        let mut declared: Vec<(u32, ValueType)> = Vec::with_capacity(groups as usize);
        let mut total: u64 = 0;
        for _ in 0..groups {
            let n = body.read_vu32()?;
            total += u64::from(n);
            if total > limits::MAX_LOCALS {
                return Err(DecodeError::TooManyLocals(total));
            }
            declared.push((n, ValueType::decode(body.read_byte()?)?));
        }
        let locals = declared
            .into_iter()
            .flat_map(|(n, value_type)| std::iter::repeat(value_type).take(n as usize))
            .collect();

        let expression = Expression::decode(&mut body)?;
        if !body.is_empty() {
            return Err(DecodeError::FunctionBodySizeMismatch {
                index,
                declared: size,
                consumed: body.pos(),
            });
        }

        functions.push(Function {
            type_index,
            locals,
            body: Rc::new(expression),
        });
    }
    Ok(functions)
}

fn read_section_data(reader: &mut Reader) -> Result<Vec<Data>, DecodeError> {
    let count = read_count(reader, "data segments", limits::MAX_SECTION_ENTRIES)?;
    let mut data = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let memory_index = reader.read_vu32()?;
        let offset = Expression::decode(reader)?;
        let init = reader.read_u8vec()?;
        data.push(Data {
            memory_index,
            offset,
            init,
        });
    }
    Ok(data)
}
