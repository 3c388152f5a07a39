//! Instruction decoding from binary format

use super::{BlockType, Instruction, InstructionKind, MemArg};
use crate::parser::encoding;
use crate::parser::limits;
use crate::parser::module::ValueType;
use crate::parser::reader::Reader;
use crate::parser::DecodeError;

impl MemArg {
    /// Decode a memory argument from the reader
    pub fn decode(reader: &mut Reader) -> Result<Self, DecodeError> {
        let align = reader.read_vu32()?;
        let offset = reader.read_vu32()?;
        Ok(MemArg { align, offset })
    }
}

impl BlockType {
    /// Decode a block type from the reader
    pub fn decode(reader: &mut Reader) -> Result<Self, DecodeError> {
        let b = reader.read_byte()?;
        if b == encoding::BLOCK_TYPE_EMPTY {
            Ok(BlockType::Empty)
        } else {
            Ok(BlockType::Value(ValueType::decode(b)?))
        }
    }
}

impl Instruction {
    /// Decode one instruction, opcode byte plus immediates.
    ///
    /// Unknown opcodes are accepted without immediates; the execution layer
    /// rejects them.
    pub fn decode(reader: &mut Reader) -> Result<Self, DecodeError> {
        let opcode = reader.read_byte()?;
        let kind = InstructionKind::decode_immediates(opcode, reader)?;
        Ok(Instruction { opcode, kind })
    }
}

impl InstructionKind {
    fn decode_immediates(opcode: u8, reader: &mut Reader) -> Result<Self, DecodeError> {
        if let Some(kind) = InstructionKind::plain(opcode) {
            return Ok(kind);
        }

        use InstructionKind::*;
        match opcode {
            // Control instructions
            0x02 => Ok(Block {
                block_type: BlockType::decode(reader)?,
            }),
            0x03 => Ok(Loop {
                block_type: BlockType::decode(reader)?,
            }),
            0x04 => Ok(If {
                block_type: BlockType::decode(reader)?,
            }),
            0x0C => Ok(Br {
                label_idx: reader.read_vu32()?,
            }),
            0x0D => Ok(BrIf {
                label_idx: reader.read_vu32()?,
            }),
            0x0E => {
                let count = reader.read_vu32()?;
                if count > limits::MAX_BR_TABLE_LABELS {
                    return Err(DecodeError::TooManyEntries {
                        what: "br_table labels",
                        count,
                    });
                }
                let mut labels = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    labels.push(reader.read_vu32()?);
                }
                let default = reader.read_vu32()?;
                Ok(BrTable { labels, default })
            }
            0x10 => Ok(Call {
                func_idx: reader.read_vu32()?,
            }),
            // The reserved byte is kept so execution can reject non-zero values.
            0x11 => Ok(CallIndirect {
                type_idx: reader.read_vu32()?,
                reserved: reader.read_byte()?,
            }),

            // Variable instructions
            0x20 => Ok(LocalGet {
                local_idx: reader.read_vu32()?,
            }),
            0x21 => Ok(LocalSet {
                local_idx: reader.read_vu32()?,
            }),
            0x22 => Ok(LocalTee {
                local_idx: reader.read_vu32()?,
            }),
            0x23 => Ok(GlobalGet {
                global_idx: reader.read_vu32()?,
            }),
            0x24 => Ok(GlobalSet {
                global_idx: reader.read_vu32()?,
            }),

            // Memory instructions
            0x28 => Ok(I32Load { memarg: MemArg::decode(reader)? }),
            0x29 => Ok(I64Load { memarg: MemArg::decode(reader)? }),
            0x2A => Ok(F32Load { memarg: MemArg::decode(reader)? }),
            0x2B => Ok(F64Load { memarg: MemArg::decode(reader)? }),
            0x2C => Ok(I32Load8S { memarg: MemArg::decode(reader)? }),
            0x2D => Ok(I32Load8U { memarg: MemArg::decode(reader)? }),
            0x2E => Ok(I32Load16S { memarg: MemArg::decode(reader)? }),
            0x2F => Ok(I32Load16U { memarg: MemArg::decode(reader)? }),
            0x30 => Ok(I64Load8S { memarg: MemArg::decode(reader)? }),
            0x31 => Ok(I64Load8U { memarg: MemArg::decode(reader)? }),
            0x32 => Ok(I64Load16S { memarg: MemArg::decode(reader)? }),
            0x33 => Ok(I64Load16U { memarg: MemArg::decode(reader)? }),
            0x34 => Ok(I64Load32S { memarg: MemArg::decode(reader)? }),
            0x35 => Ok(I64Load32U { memarg: MemArg::decode(reader)? }),
            0x36 => Ok(I32Store { memarg: MemArg::decode(reader)? }),
            0x37 => Ok(I64Store { memarg: MemArg::decode(reader)? }),
            0x38 => Ok(F32Store { memarg: MemArg::decode(reader)? }),
            0x39 => Ok(F64Store { memarg: MemArg::decode(reader)? }),
            0x3A => Ok(I32Store8 { memarg: MemArg::decode(reader)? }),
            0x3B => Ok(I32Store16 { memarg: MemArg::decode(reader)? }),
            0x3C => Ok(I64Store8 { memarg: MemArg::decode(reader)? }),
            0x3D => Ok(I64Store16 { memarg: MemArg::decode(reader)? }),
            0x3E => Ok(I64Store32 { memarg: MemArg::decode(reader)? }),
            0x3F => Ok(MemorySize {
                reserved: reader.read_byte()?,
            }),
            0x40 => Ok(MemoryGrow {
                reserved: reader.read_byte()?,
            }),

            // Numeric constants
            0x41 => Ok(I32Const {
                value: reader.read_vs32()?,
            }),
            0x42 => Ok(I64Const {
                value: reader.read_vs64()?,
            }),
            0x43 => Ok(F32Const {
                value: reader.read_f32()?,
            }),
            0x44 => Ok(F64Const {
                value: reader.read_f64()?,
            }),

            _ => Ok(Unknown { opcode }),
        }
    }
}
