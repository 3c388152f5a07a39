//! Variable instructions
//!
//! Locals live in the current [`Frame`]; globals are resolved through the
//! frame's module instance to store addresses.

use super::{RuntimeError, Stack};
use crate::runtime::frame::Frame;
use crate::runtime::store::Store;

pub fn local_get(frame: &Frame, stack: &mut Stack, idx: u32) -> Result<(), RuntimeError> {
    stack.push(frame.local(idx)?);
    Ok(())
}

pub fn local_set(frame: &mut Frame, stack: &mut Stack, idx: u32) -> Result<(), RuntimeError> {
    let value = stack.pop()?;
    frame.set_local(idx, value)
}

/// Like `local.set`, but leaves the value on the stack.
pub fn local_tee(frame: &mut Frame, stack: &mut Stack, idx: u32) -> Result<(), RuntimeError> {
    let value = stack.pop()?;
    frame.set_local(idx, value)?;
    stack.push(value);
    Ok(())
}

pub fn global_get(store: &Store, frame: &Frame, stack: &mut Stack, idx: u32) -> Result<(), RuntimeError> {
    let addr = frame.module.global_addr(idx)?;
    let value = store
        .global_value(addr)
        .ok_or(RuntimeError::GlobalIndexOutOfBounds(idx))?;
    stack.push(value);
    Ok(())
}

pub fn global_set(store: &mut Store, frame: &Frame, stack: &mut Stack, idx: u32) -> Result<(), RuntimeError> {
    let addr = frame.module.global_addr(idx)?;
    let value = stack.pop()?;
    store.set_global(addr, value).map_err(|e| match e {
        RuntimeError::ImmutableGlobal(_) => RuntimeError::ImmutableGlobal(idx),
        other => other,
    })
}
