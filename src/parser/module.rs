//! Decoded module data model.
//!
//! A [`Module`] is produced once by [`super::decode`] and is read-only
//! afterwards. Function bodies are held behind `Rc` so runtime frames can share
//! them with the module without copying instruction streams.

use std::fmt;
use std::rc::Rc;

use super::encoding;
use super::expression::Expression;
use super::DecodeError;

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    pub fn decode(byte: u8) -> Result<Self, DecodeError> {
        match byte {
            encoding::TYPE_I32 => Ok(ValueType::I32),
            encoding::TYPE_I64 => Ok(ValueType::I64),
            encoding::TYPE_F32 => Ok(ValueType::F32),
            encoding::TYPE_F64 => Ok(ValueType::F64),
            _ => Err(DecodeError::InvalidValueType(byte)),
        }
    }

    pub fn encode(&self) -> u8 {
        match self {
            ValueType::I32 => encoding::TYPE_I32,
            ValueType::I64 => encoding::TYPE_I64,
            ValueType::F32 => encoding::TYPE_F32,
            ValueType::F64 => encoding::TYPE_F64,
        }
    }

    /// Width in bytes of the raw representation.
    pub fn width(&self) -> usize {
        match self {
            ValueType::I32 | ValueType::F32 => 4,
            ValueType::I64 | ValueType::F64 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionType {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

impl FunctionType {
    pub fn new(params: Vec<ValueType>, results: Vec<ValueType>) -> Self {
        FunctionType { params, results }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |types: &[ValueType]| {
            types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(", ")
        };
        match self.results.len() {
            0 => write!(f, "({}) -> nil", join(&self.params)),
            1 => write!(f, "({}) -> {}", join(&self.params), self.results[0]),
            _ => write!(f, "({}) -> ({})", join(&self.params), join(&self.results)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "initial={} max={}", self.min, max),
            None => write!(f, "initial={}", self.min),
        }
    }
}

/// Tables only hold function references in this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

impl fmt::Display for GlobalType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.value_type,
            if self.mutable { "mutable" } else { "const" }
        )
    }
}

/// What an import asks the embedder to supply.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportDesc {
    Function(u32), // typeidx
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

impl ImportDesc {
    pub fn kind(&self) -> &'static str {
        match self {
            ImportDesc::Function(_) => "func",
            ImportDesc::Table(_) => "table",
            ImportDesc::Memory(_) => "memory",
            ImportDesc::Global(_) => "global",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub desc: ImportDesc,
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.desc {
            ImportDesc::Function(type_index) => {
                write!(f, "func sig={} <- {}.{}", type_index, self.module, self.name)
            }
            ImportDesc::Table(t) => write!(f, "table {} <- {}.{}", t.limits, self.module, self.name),
            ImportDesc::Memory(m) => write!(f, "memory {} <- {}.{}", m.limits, self.module, self.name),
            ImportDesc::Global(g) => write!(f, "global {} <- {}.{}", g, self.module, self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportDesc {
    Function(u32),
    Table(u32),
    Memory(u32),
    Global(u32),
}

impl ExportDesc {
    pub fn decode(byte: u8, idx: u32) -> Result<ExportDesc, DecodeError> {
        match byte {
            encoding::DESC_FUNC => Ok(ExportDesc::Function(idx)),
            encoding::DESC_TABLE => Ok(ExportDesc::Table(idx)),
            encoding::DESC_MEMORY => Ok(ExportDesc::Memory(idx)),
            encoding::DESC_GLOBAL => Ok(ExportDesc::Global(idx)),
            _ => Err(DecodeError::InvalidDescriptor(byte)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExportDesc::Function(_) => "func",
            ExportDesc::Table(_) => "table",
            ExportDesc::Memory(_) => "memory",
            ExportDesc::Global(_) => "global",
        }
    }

    pub fn index(&self) -> u32 {
        match *self {
            ExportDesc::Function(i)
            | ExportDesc::Table(i)
            | ExportDesc::Memory(i)
            | ExportDesc::Global(i) => i,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub name: String,
    pub desc: ExportDesc,
}

impl fmt::Display for Export {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{}] -> \"{}\"", self.desc.kind(), self.desc.index(), self.name)
    }
}

/// A locally defined function: the function-section type index joined with
/// its code-section body.
#[derive(Debug, Clone)]
pub struct Function {
    pub type_index: u32,
    /// Declared locals, expanded one entry per local (parameters excluded).
    pub locals: Vec<ValueType>,
    pub body: Rc<Expression>,
}

#[derive(Debug, Clone)]
pub struct Global {
    pub global_type: GlobalType,
    pub init: Expression,
}

/// Active element segment: function indices written into a table.
#[derive(Debug, Clone)]
pub struct Element {
    pub table_index: u32,
    pub offset: Expression,
    pub init: Vec<u32>,
}

/// Active data segment: raw bytes written into a memory.
#[derive(Debug, Clone)]
pub struct Data {
    pub memory_index: u32,
    pub offset: Expression,
    pub init: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomSection {
    pub name: String,
    pub payload_len: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub types: Vec<FunctionType>,
    pub imports: Vec<Import>,
    pub functions: Vec<Function>,
    pub tables: Vec<TableType>,
    pub memories: Vec<MemoryType>,
    pub globals: Vec<Global>,
    pub exports: Vec<Export>,
    pub start: Option<u32>,
    pub elements: Vec<Element>,
    pub data: Vec<Data>,
    pub customs: Vec<CustomSection>,
}

impl Module {
    pub fn imported_function_count(&self) -> usize {
        self.imports
            .iter()
            .filter(|import| matches!(import.desc, ImportDesc::Function(_)))
            .count()
    }

    pub fn imported_global_types(&self) -> impl Iterator<Item = &GlobalType> {
        self.imports.iter().filter_map(|import| match &import.desc {
            ImportDesc::Global(global_type) => Some(global_type),
            _ => None,
        })
    }

    /// Type of a function in the combined (imports first) function index space.
    pub fn function_type(&self, func_idx: u32) -> Option<&FunctionType> {
        let imported = self.imported_function_count();
        let idx = func_idx as usize;
        let type_index = if idx < imported {
            self.imports
                .iter()
                .filter_map(|import| match import.desc {
                    ImportDesc::Function(type_index) => Some(type_index),
                    _ => None,
                })
                .nth(idx)?
        } else {
            self.functions.get(idx - imported)?.type_index
        };
        self.types.get(type_index as usize)
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|export| export.name == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Type[{}]:", self.types.len())?;
        for (i, function_type) in self.types.iter().enumerate() {
            writeln!(f, " - type[{}] {}", i, function_type)?;
        }
        writeln!(f, "Import[{}]:", self.imports.len())?;
        for (i, import) in self.imports.iter().enumerate() {
            writeln!(f, " - import[{}] {}", i, import)?;
        }
        let imported = self.imported_function_count();
        writeln!(f, "Function[{}]:", self.functions.len())?;
        for (i, function) in self.functions.iter().enumerate() {
            writeln!(
                f,
                " - func[{}] sig={} locals={} instructions={}",
                i + imported,
                function.type_index,
                function.locals.len(),
                function.body.len()
            )?;
        }
        writeln!(f, "Table[{}]:", self.tables.len())?;
        for (i, table) in self.tables.iter().enumerate() {
            writeln!(f, " - table[{}] funcref {}", i, table.limits)?;
        }
        writeln!(f, "Memory[{}]:", self.memories.len())?;
        for (i, memory) in self.memories.iter().enumerate() {
            writeln!(f, " - memory[{}] pages: {}", i, memory.limits)?;
        }
        writeln!(f, "Global[{}]:", self.globals.len())?;
        for (i, global) in self.globals.iter().enumerate() {
            writeln!(f, " - global[{}] {} init {}", i, global.global_type, global.init)?;
        }
        writeln!(f, "Export[{}]:", self.exports.len())?;
        for export in &self.exports {
            writeln!(f, " - {}", export)?;
        }
        if let Some(start) = self.start {
            writeln!(f, "Start: func[{}]", start)?;
        }
        writeln!(f, "Elem[{}]:", self.elements.len())?;
        for (i, element) in self.elements.iter().enumerate() {
            writeln!(
                f,
                " - segment[{}] table={} count={} offset {}",
                i,
                element.table_index,
                element.init.len(),
                element.offset
            )?;
        }
        writeln!(f, "Data[{}]:", self.data.len())?;
        for (i, data) in self.data.iter().enumerate() {
            writeln!(
                f,
                " - segment[{}] memory={} size={} offset {}",
                i,
                data.memory_index,
                data.init.len(),
                data.offset
            )?;
        }
        for custom in &self.customs {
            writeln!(f, "Custom: \"{}\" ({} bytes)", custom.name, custom.payload_len)?;
        }
        Ok(())
    }
}
