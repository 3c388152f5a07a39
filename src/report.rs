//! Module introspection
//!
//! A [`ModuleReport`] borrows a decoded [`Module`] and renders it either as
//! JSON (for tooling) or as the plain section summary from `Module`'s
//! `Display` impl.

use crate::parser::module::{ExportDesc, ImportDesc, Module, ValueType};
use serde::Serialize;
use std::fmt;

/// Bytes of each data segment shown in the hex preview.
const PREVIEW_BYTES: usize = 16;

#[derive(Serialize)]
pub struct ModuleReport<'a> {
    types: Vec<TypeReport>,
    imports: Vec<ImportReport<'a>>,
    functions: Vec<FunctionReport>,
    exports: Vec<ExportReport<'a>>,
    tables: Vec<LimitsReport>,
    memories: Vec<LimitsReport>,
    globals: Vec<GlobalReport>,
    start: Option<u32>,
    data: Vec<DataReport>,
    customs: Vec<CustomReport<'a>>,
    #[serde(skip)]
    module: &'a Module,
}

#[derive(Serialize)]
struct TypeReport {
    params: Vec<&'static str>,
    results: Vec<&'static str>,
}

#[derive(Serialize)]
struct ImportReport<'a> {
    module: &'a str,
    name: &'a str,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    type_index: Option<u32>,
}

#[derive(Serialize)]
struct FunctionReport {
    index: usize,
    type_index: u32,
    locals: Vec<&'static str>,
    instruction_count: usize,
    opcodes: Vec<&'static str>,
}

#[derive(Serialize)]
struct ExportReport<'a> {
    name: &'a str,
    kind: &'static str,
    index: u32,
}

#[derive(Serialize)]
struct LimitsReport {
    min: u32,
    max: Option<u32>,
}

#[derive(Serialize)]
struct GlobalReport {
    value_type: &'static str,
    mutable: bool,
    init: String,
}

#[derive(Serialize)]
struct DataReport {
    memory_index: u32,
    offset: String,
    size: usize,
    preview: String,
}

#[derive(Serialize)]
struct CustomReport<'a> {
    name: &'a str,
    size: usize,
}

fn type_names(types: &[ValueType]) -> Vec<&'static str> {
    types.iter().map(ValueType::name).collect()
}

impl<'a> ModuleReport<'a> {
    pub fn new(module: &'a Module) -> Self {
        let imported = module.imported_function_count();
        ModuleReport {
            types: module
                .types
                .iter()
                .map(|t| TypeReport {
                    params: type_names(&t.params),
                    results: type_names(&t.results),
                })
                .collect(),
            imports: module
                .imports
                .iter()
                .map(|import| ImportReport {
                    module: &import.module,
                    name: &import.name,
                    kind: import.desc.kind(),
                    type_index: match import.desc {
                        ImportDesc::Function(type_index) => Some(type_index),
                        _ => None,
                    },
                })
                .collect(),
            functions: module
                .functions
                .iter()
                .enumerate()
                .map(|(i, function)| FunctionReport {
                    index: i + imported,
                    type_index: function.type_index,
                    locals: type_names(&function.locals),
                    instruction_count: function.body.len(),
                    opcodes: function
                        .body
                        .instructions()
                        .iter()
                        .map(|instruction| instruction.kind.mnemonic())
                        .collect(),
                })
                .collect(),
            exports: module
                .exports
                .iter()
                .map(|export| ExportReport {
                    name: &export.name,
                    kind: export.desc.kind(),
                    index: export.desc.index(),
                })
                .collect(),
            tables: module
                .tables
                .iter()
                .map(|t| LimitsReport {
                    min: t.limits.min,
                    max: t.limits.max,
                })
                .collect(),
            memories: module
                .memories
                .iter()
                .map(|m| LimitsReport {
                    min: m.limits.min,
                    max: m.limits.max,
                })
                .collect(),
            globals: module
                .globals
                .iter()
                .map(|g| GlobalReport {
                    value_type: g.global_type.value_type.name(),
                    mutable: g.global_type.mutable,
                    init: g.init.to_string(),
                })
                .collect(),
            start: module.start,
            data: module
                .data
                .iter()
                .map(|d| DataReport {
                    memory_index: d.memory_index,
                    offset: d.offset.to_string(),
                    size: d.init.len(),
                    preview: hex::encode(&d.init[..d.init.len().min(PREVIEW_BYTES)]),
                })
                .collect(),
            customs: module
                .customs
                .iter()
                .map(|c| CustomReport {
                    name: &c.name,
                    size: c.payload_len,
                })
                .collect(),
            module,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Names of the exported functions, in export order.
    pub fn exported_functions(&self) -> impl Iterator<Item = &str> {
        self.module.exports.iter().filter_map(|export| match export.desc {
            ExportDesc::Function(_) => Some(export.name.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for ModuleReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::expression::Expression;
    use crate::parser::instruction::{Instruction, InstructionKind};
    use crate::parser::module::{Data, Export, Function, FunctionType, Import, MemoryType, Limits};
    use serde_json::Value as Json;
    use std::rc::Rc;

    fn body(kinds: Vec<InstructionKind>) -> Expression {
        let mut instructions: Vec<Instruction> = kinds.into_iter().map(|k| Instruction::new(0, k)).collect();
        instructions.push(Instruction::new(0x0b, InstructionKind::End));
        Expression::new(instructions).unwrap()
    }

    fn sample() -> Module {
        Module {
            types: vec![FunctionType::new(vec![ValueType::I32, ValueType::I32], vec![ValueType::I32])],
            imports: vec![Import {
                module: "env".to_string(),
                name: "print".to_string(),
                desc: ImportDesc::Function(0),
            }],
            functions: vec![Function {
                type_index: 0,
                locals: vec![ValueType::F64],
                body: Rc::new(body(vec![
                    InstructionKind::LocalGet { local_idx: 0 },
                    InstructionKind::LocalGet { local_idx: 1 },
                    InstructionKind::I32Add,
                ])),
            }],
            memories: vec![MemoryType {
                limits: Limits { min: 1, max: Some(4) },
            }],
            exports: vec![
                Export {
                    name: "add".to_string(),
                    desc: ExportDesc::Function(1),
                },
                Export {
                    name: "mem".to_string(),
                    desc: ExportDesc::Memory(0),
                },
            ],
            data: vec![Data {
                memory_index: 0,
                offset: body(vec![InstructionKind::I32Const { value: 8 }]),
                init: (0u8..20).collect(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_json_report() {
        let module = sample();
        let json: Json = serde_json::from_str(&ModuleReport::new(&module).to_json().unwrap()).unwrap();

        assert_eq!(json["types"][0]["params"], serde_json::json!(["i32", "i32"]));
        assert_eq!(json["imports"][0]["kind"], "func");
        assert_eq!(json["imports"][0]["type_index"], 0);

        let function = &json["functions"][0];
        assert_eq!(function["index"], 1);
        assert_eq!(function["locals"], serde_json::json!(["f64"]));
        assert_eq!(function["instruction_count"], 4);
        assert_eq!(
            function["opcodes"],
            serde_json::json!(["local.get", "local.get", "i32.add", "end"])
        );

        assert_eq!(json["exports"][1]["kind"], "memory");
        assert_eq!(json["memories"][0]["max"], 4);
        assert_eq!(json["start"], Json::Null);
        assert_eq!(json["data"][0]["size"], 20);
        assert_eq!(json["data"][0]["preview"], "000102030405060708090a0b0c0d0e0f");
        assert_eq!(json["data"][0]["offset"], "[i32.const 8 end]");
    }

    #[test]
    fn test_exported_functions_and_text() {
        let module = sample();
        let report = ModuleReport::new(&module);
        assert_eq!(report.exported_functions().collect::<Vec<_>>(), vec!["add"]);

        let text = report.to_string();
        assert!(text.contains("Import[1]:"));
        assert!(text.contains("func[1] sig=0 locals=1 instructions=4"));
        assert!(text.contains("func[1] -> \"add\""));
    }
}
