//! Function tables
//!
//! A table is a vector of optional function addresses used by
//! `call_indirect`. Empty slots are holes: calling through one traps with
//! `UndefinedElement`, indexing past the end traps with `TableOutOfBounds`.

use super::store::FuncAddr;
use super::RuntimeError;
use crate::parser::module::Limits;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    elements: Vec<Option<FuncAddr>>,
    limits: Limits,
}

impl Table {
    /// Create a table of `limits.min` empty slots.
    ///
    /// # Errors
    ///
    /// `MemoryError` when the initial size is above the declared maximum or
    /// the engine's table ceiling.
    pub fn new(limits: Limits, ceiling: u32) -> Result<Self, RuntimeError> {
        if limits.max.is_some_and(|max| limits.min > max) {
            return Err(RuntimeError::MemoryError(format!(
                "table initial size {} exceeds declared maximum",
                limits.min
            )));
        }
        if limits.min > ceiling {
            return Err(RuntimeError::MemoryError(format!(
                "table initial size {} exceeds limit {ceiling}",
                limits.min
            )));
        }
        Ok(Table {
            elements: vec![None; limits.min as usize],
            limits,
        })
    }

    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn get(&self, index: u32) -> Result<Option<FuncAddr>, RuntimeError> {
        self.elements
            .get(index as usize)
            .copied()
            .ok_or(RuntimeError::TableOutOfBounds(index))
    }

    pub fn set(&mut self, index: u32, value: Option<FuncAddr>) -> Result<(), RuntimeError> {
        let slot = self
            .elements
            .get_mut(index as usize)
            .ok_or(RuntimeError::TableOutOfBounds(index))?;
        *slot = value;
        Ok(())
    }

    /// Whether `len` slots starting at `offset` fit in the table.
    pub fn fits(&self, offset: u32, len: usize) -> bool {
        (offset as u64).saturating_add(len as u64) <= self.elements.len() as u64
    }

    /// Copy `funcs` into consecutive slots from `offset`; the table never grows.
    pub fn initialize(&mut self, offset: u32, funcs: &[FuncAddr]) -> Result<(), RuntimeError> {
        if !self.fits(offset, funcs.len()) {
            return Err(RuntimeError::ElementSegmentOutOfBounds);
        }
        let start = offset as usize;
        for (slot, func) in self.elements[start..start + funcs.len()].iter_mut().zip(funcs) {
            *slot = Some(*func);
        }
        Ok(())
    }
}
