//! Instruction sequences and control-flow resolution.
//!
//! An [`Expression`] is a decoded instruction stream terminated by `end`,
//! together with a position map built in a single pass over the stream. For
//! every `block`, `loop` and `if`, and for the `else` and `end` that belong to
//! it, the map holds `[open, end]` or `[open, end, else]`, keyed by each of
//! those indices. The stack machine uses it to find branch targets without
//! scanning.

use std::collections::HashMap;
use std::fmt;

use super::instruction::{Instruction, InstructionKind};
use super::reader::Reader;
use super::DecodeError;

pub type PositionMap = HashMap<usize, Vec<usize>>;

#[derive(Debug, Clone, Default)]
pub struct Expression {
    instructions: Vec<Instruction>,
    positions: PositionMap,
}

impl Expression {
    /// Build an expression from an already decoded instruction stream.
    pub fn new(instructions: Vec<Instruction>) -> Result<Self, DecodeError> {
        match instructions.last() {
            Some(last) if last.kind == InstructionKind::End => {}
            _ => return Err(DecodeError::MissingEnd),
        }
        let positions = resolve(&instructions)?;
        Ok(Expression {
            instructions,
            positions,
        })
    }

    /// Decode instructions until the `end` that closes nesting depth zero.
    pub fn decode(reader: &mut Reader) -> Result<Self, DecodeError> {
        let mut instructions = Vec::new();
        let mut depth: usize = 1;
        while depth > 0 {
            let instruction = Instruction::decode(reader).map_err(|e| match e {
                DecodeError::UnexpectedEof => DecodeError::MissingEnd,
                other => other,
            })?;
            if instruction.kind.opens_block() {
                depth += 1;
            } else if instruction.kind == InstructionKind::End {
                depth -= 1;
            }
            instructions.push(instruction);
        }
        Expression::new(instructions)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    /// Index of the `end` matching the structured instruction at `index`.
    pub fn end_of(&self, index: usize) -> Option<usize> {
        self.positions.get(&index).map(|p| p[1])
    }

    /// Index of the `else` belonging to the `if` at `index`, if it has one.
    pub fn else_of(&self, index: usize) -> Option<usize> {
        self.positions.get(&index).and_then(|p| p.get(2).copied())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, instruction) in self.instructions.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", instruction)?;
        }
        write!(f, "]")
    }
}

/// Pair every `block`/`loop`/`if` with its optional `else` and its `end`.
///
/// The only unmatched `end` allowed is the final one that closes the
/// expression itself.
pub fn resolve(instructions: &[Instruction]) -> Result<PositionMap, DecodeError> {
    let mut open: Vec<Vec<usize>> = Vec::new();
    let mut positions = PositionMap::new();
    let last = instructions.len().saturating_sub(1);

    for (index, instruction) in instructions.iter().enumerate() {
        match instruction.kind {
            InstructionKind::Block { .. }
            | InstructionKind::Loop { .. }
            | InstructionKind::If { .. } => open.push(vec![index]),
            InstructionKind::Else => match open.last_mut() {
                Some(entry)
                    if entry.len() == 1
                        && matches!(instructions[entry[0]].kind, InstructionKind::If { .. }) =>
                {
                    entry.push(index)
                }
                _ => return Err(DecodeError::UnbalancedNesting(index)),
            },
            // the final `end` must close the expression, not a block
            InstructionKind::End if index == last => {
                if let Some(entry) = open.first() {
                    return Err(DecodeError::UnbalancedNesting(entry[0]));
                }
            }
            InstructionKind::End => match open.pop() {
                Some(mut entry) => {
                    entry.insert(1, index);
                    for &i in &entry {
                        positions.insert(i, entry.clone());
                    }
                }
                None => return Err(DecodeError::UnbalancedNesting(index)),
            },
            _ => {}
        }
    }

    match open.first() {
        Some(entry) => Err(DecodeError::UnbalancedNesting(entry[0])),
        None => Ok(positions),
    }
}
