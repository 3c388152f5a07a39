//! The stack machine
//!
//! A [`Configuration`] runs one invocation against a [`Store`]. The body is
//! walked by instruction index; structured control flow jumps using the block
//! positions resolved at decode time, so a branch is a label lookup followed
//! by a single `pc` assignment.
//!
//! Wasm-to-wasm calls do not recurse natively. The caller is suspended as an
//! [`Activation`] on an explicit call stack and the loop carries on in the
//! callee, so the depth allowed by [`EngineConfig::max_call_depth`] does not
//! depend on the host thread's stack size.
//!
//! [`EngineConfig::max_call_depth`]: super::EngineConfig

use super::control::Label;
use super::frame::Frame;
use super::memory::Memory;
use super::ops::{self, bitwise, comparison, conversion, numeric, parametric, variable};
use super::stack::{Stack, StackEntry};
use super::store::{FuncAddr, FunctionInstance, Store};
use super::{RuntimeError, Value};
use crate::parser::expression::Expression;
use crate::parser::instruction::{Instruction, InstructionKind};
use crate::parser::module::{FunctionType, ValueType};
use std::mem;
use std::rc::Rc;
use tracing::{debug, trace};

/// Check call arguments against a signature.
pub(crate) fn check_args(func_type: &FunctionType, args: &[Value]) -> Result<(), RuntimeError> {
    if func_type.params.len() != args.len() {
        return Err(RuntimeError::ArgumentCountMismatch {
            expected: func_type.params.len(),
            actual: args.len(),
        });
    }
    check_types(&func_type.params, args)
}

fn check_types(expected: &[ValueType], values: &[Value]) -> Result<(), RuntimeError> {
    for (value, typ) in values.iter().zip(expected) {
        if value.typ() != *typ {
            return Err(RuntimeError::TypeMismatch {
                expected: typ.to_string(),
                actual: value.typ().to_string(),
            });
        }
    }
    Ok(())
}

/// The memory of the frame's module; split out so the store and the operand
/// stack can be borrowed at the same time.
fn memory<'a>(store: &'a mut Store, frame: &Frame) -> Result<&'a mut Memory, RuntimeError> {
    let addr = frame.module.memory_addr()?;
    store
        .memory_mut(addr)
        .ok_or_else(|| RuntimeError::MemoryError(format!("no memory at address {}", addr.0)))
}

fn check_reserved(byte: u8) -> Result<(), RuntimeError> {
    match byte {
        0 => Ok(()),
        other => Err(RuntimeError::InvalidReservedByte(other)),
    }
}

/// One wasm function call in progress.
struct Activation {
    frame: Frame,
    results: Vec<ValueType>,
    /// Where the caller resumes once its callee returns.
    pc: usize,
}

/// Outcome of entering a function.
enum Entered {
    Host(Vec<Value>),
    Wasm(Activation),
}

pub struct Configuration<'s> {
    store: &'s mut Store,
    stack: Stack,
    /// Suspended callers, outermost first.
    callers: Vec<Activation>,
    /// Set by `call`/`call_indirect`; taken by the run loop after the step.
    pending_call: Option<FuncAddr>,
    pc: usize,
}

impl<'s> Configuration<'s> {
    pub fn new(store: &'s mut Store) -> Self {
        Configuration {
            store,
            stack: Stack::new(),
            callers: Vec::new(),
            pending_call: None,
            pc: 0,
        }
    }

    /// Run the function at `addr` to completion and return its results.
    pub fn invoke(&mut self, addr: FuncAddr, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
        match self.enter(addr, args, 0)? {
            Entered::Host(results) => Ok(results),
            Entered::Wasm(activation) => self.run(activation),
        }
    }

    /// Start a call at `depth`. Host functions run to completion here; wasm
    /// functions get their frame marker and body label pushed.
    fn enter(&mut self, addr: FuncAddr, args: Vec<Value>, depth: usize) -> Result<Entered, RuntimeError> {
        if depth >= self.store.config().max_call_depth {
            return Err(RuntimeError::CallStackExhausted);
        }

        let (func_type, module, code) = match self.store.function(addr)? {
            FunctionInstance::Host(host) => {
                let host = host.clone();
                check_args(host.func_type(), &args)?;
                debug!(func = addr.0, depth, "host call");
                return host.call(&args).map(Entered::Host);
            }
            FunctionInstance::Wasm {
                func_type,
                module,
                code,
            } => (func_type.clone(), Rc::clone(module), code.clone()),
        };
        check_args(&func_type, &args)?;
        debug!(func = addr.0, depth, signature = %func_type, "call");

        let arity = func_type.results.len();
        let mut locals = args;
        locals.extend(code.locals.iter().map(|typ| Value::zero(*typ)));
        let frame = Frame::new(module, locals, code.body, arity);

        self.stack.push_frame(arity);
        self.stack
            .push_label(Label::new(arity, frame.expr.len().saturating_sub(1)));
        Ok(Entered::Wasm(Activation {
            frame,
            results: func_type.results,
            pc: 0,
        }))
    }

    /// Drive `current` and everything it calls until it returns.
    fn run(&mut self, mut current: Activation) -> Result<Vec<Value>, RuntimeError> {
        self.pc = 0;
        loop {
            let expr = Rc::clone(&current.frame.expr);
            let Some(instruction) = expr.get(self.pc) else {
                let results = self.leave(&current)?;
                match self.callers.pop() {
                    Some(caller) => {
                        current = caller;
                        self.pc = current.pc;
                        self.stack.push_all(results);
                        continue;
                    }
                    None => return Ok(results),
                }
            };

            trace!(pc = self.pc, depth = self.callers.len(), op = instruction.kind.mnemonic());
            self.step(&mut current.frame, &expr, instruction)?;
            self.pc += 1;

            if let Some(addr) = self.pending_call.take() {
                let params = self.store.function(addr)?.func_type().params.len();
                let args = self.stack.pop_values(params)?;
                match self.enter(addr, args, self.callers.len() + 1)? {
                    Entered::Host(results) => self.stack.push_all(results),
                    Entered::Wasm(callee) => {
                        current.pc = self.pc;
                        self.callers.push(mem::replace(&mut current, callee));
                        self.pc = 0;
                    }
                }
            }
        }
    }

    /// Pop the finished function's results and its frame marker.
    fn leave(&mut self, activation: &Activation) -> Result<Vec<Value>, RuntimeError> {
        let results = self.stack.pop_values(activation.frame.arity)?;
        let marker = self.stack.pop_entry()?;
        if !matches!(marker, StackEntry::Frame { .. }) {
            return Err(RuntimeError::UnexpectedEntry {
                expected: "frame",
                found: marker.name(),
            });
        }
        check_types(&activation.results, &results)?;
        Ok(results)
    }

    fn end_of(&self, expr: &Expression) -> Result<usize, RuntimeError> {
        expr.end_of(self.pc)
            .ok_or(RuntimeError::InvalidLabel(self.pc as u32))
    }

    /// Leave the innermost construct, keeping its result values.
    fn end_block(&mut self) -> Result<(), RuntimeError> {
        let label = self.stack.get_nth_label(0)?;
        let values = self.stack.pop_values(label.arity)?;
        self.stack.pop_labels(1)?;
        self.stack.push_all(values);
        Ok(())
    }

    /// Branch to the `n`th enclosing label.
    ///
    /// A backward target is a loop header: the loop label stays and its
    /// operands are dropped. A forward target pops `n + 1` labels, carrying
    /// the label's arity in values. `pc` lands on the target and the main loop
    /// steps past it.
    fn br(&mut self, n: u32) -> Result<(), RuntimeError> {
        let label = self.stack.get_nth_label(n)?;
        if label.is_backward(self.pc) {
            self.stack.pop_labels(n as usize)?;
            self.stack.unwind_to_label()?;
        } else {
            let values = self.stack.pop_values(label.arity)?;
            self.stack.pop_labels(n as usize + 1)?;
            self.stack.push_all(values);
        }
        self.pc = label.continuation;
        Ok(())
    }

    /// Resolve a `call_indirect` target, checking the table slot and the
    /// callee's signature.
    fn indirect_target(&mut self, frame: &Frame, type_idx: u32) -> Result<FuncAddr, RuntimeError> {
        let expected = frame.module.func_type(type_idx)?;
        let elem = self.stack.pop_i32()? as u32;
        let table = frame
            .module
            .table_addr()
            .and_then(|addr| self.store.table(addr))
            .ok_or(RuntimeError::TableOutOfBounds(elem))?;
        let addr = table.get(elem)?.ok_or(RuntimeError::UndefinedElement(elem))?;
        let actual = self.store.function(addr)?.func_type();
        if actual != expected {
            return Err(RuntimeError::IndirectCallTypeMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(addr)
    }

    fn step(&mut self, frame: &mut Frame, expr: &Expression, instruction: &Instruction) -> Result<(), RuntimeError> {
        use InstructionKind::*;

        match &instruction.kind {
            // Control
            Unreachable => Err(RuntimeError::Unreachable),
            Nop => Ok(()),
            Block { block_type } => {
                let end = self.end_of(expr)?;
                self.stack.push_label(Label::new(block_type.arity(), end));
                Ok(())
            }
            Loop { block_type } => {
                self.stack.push_label(Label::new(block_type.arity(), self.pc));
                Ok(())
            }
            If { block_type } => {
                let condition = self.stack.pop_i32()?;
                let end = self.end_of(expr)?;
                self.stack.push_label(Label::new(block_type.arity(), end));
                if condition == 0 {
                    match expr.else_of(self.pc) {
                        Some(else_pc) => self.pc = else_pc,
                        None => {
                            self.stack.pop_labels(1)?;
                            self.pc = end;
                        }
                    }
                }
                Ok(())
            }
            Else => {
                self.end_block()?;
                self.pc = self.end_of(expr)?;
                Ok(())
            }
            End => self.end_block(),
            Br { label_idx } => self.br(*label_idx),
            BrIf { label_idx } => {
                if self.stack.pop_i32()? != 0 {
                    self.br(*label_idx)?;
                }
                Ok(())
            }
            BrTable { labels, default } => {
                let idx = self.stack.pop_i32()? as u32;
                let target = labels.get(idx as usize).copied().unwrap_or(*default);
                self.br(target)
            }
            Return => {
                let values = self.stack.pop_values(frame.arity)?;
                self.stack.unwind_to_frame()?;
                self.stack.push_all(values);
                self.pc = expr.len().saturating_sub(1);
                Ok(())
            }
            Call { func_idx } => {
                self.pending_call = Some(frame.module.func_addr(*func_idx)?);
                Ok(())
            }
            CallIndirect { type_idx, reserved } => {
                check_reserved(*reserved)?;
                self.pending_call = Some(self.indirect_target(frame, *type_idx)?);
                Ok(())
            }

            // Parametric
            Drop => parametric::drop(&mut self.stack),
            Select => parametric::select(&mut self.stack),

            // Variable
            LocalGet { local_idx } => variable::local_get(frame, &mut self.stack, *local_idx),
            LocalSet { local_idx } => variable::local_set(frame, &mut self.stack, *local_idx),
            LocalTee { local_idx } => variable::local_tee(frame, &mut self.stack, *local_idx),
            GlobalGet { global_idx } => variable::global_get(self.store, frame, &mut self.stack, *global_idx),
            GlobalSet { global_idx } => variable::global_set(self.store, frame, &mut self.stack, *global_idx),

            // Memory
            I32Load { memarg } => ops::memory::i32_load(memory(self.store, frame)?, &mut self.stack, memarg),
            I64Load { memarg } => ops::memory::i64_load(memory(self.store, frame)?, &mut self.stack, memarg),
            F32Load { memarg } => ops::memory::f32_load(memory(self.store, frame)?, &mut self.stack, memarg),
            F64Load { memarg } => ops::memory::f64_load(memory(self.store, frame)?, &mut self.stack, memarg),
            I32Load8S { memarg } => ops::memory::i32_load8_s(memory(self.store, frame)?, &mut self.stack, memarg),
            I32Load8U { memarg } => ops::memory::i32_load8_u(memory(self.store, frame)?, &mut self.stack, memarg),
            I32Load16S { memarg } => ops::memory::i32_load16_s(memory(self.store, frame)?, &mut self.stack, memarg),
            I32Load16U { memarg } => ops::memory::i32_load16_u(memory(self.store, frame)?, &mut self.stack, memarg),
            I64Load8S { memarg } => ops::memory::i64_load8_s(memory(self.store, frame)?, &mut self.stack, memarg),
            I64Load8U { memarg } => ops::memory::i64_load8_u(memory(self.store, frame)?, &mut self.stack, memarg),
            I64Load16S { memarg } => ops::memory::i64_load16_s(memory(self.store, frame)?, &mut self.stack, memarg),
            I64Load16U { memarg } => ops::memory::i64_load16_u(memory(self.store, frame)?, &mut self.stack, memarg),
            I64Load32S { memarg } => ops::memory::i64_load32_s(memory(self.store, frame)?, &mut self.stack, memarg),
            I64Load32U { memarg } => ops::memory::i64_load32_u(memory(self.store, frame)?, &mut self.stack, memarg),
            I32Store { memarg } => ops::memory::i32_store(memory(self.store, frame)?, &mut self.stack, memarg),
            I64Store { memarg } => ops::memory::i64_store(memory(self.store, frame)?, &mut self.stack, memarg),
            F32Store { memarg } => ops::memory::f32_store(memory(self.store, frame)?, &mut self.stack, memarg),
            F64Store { memarg } => ops::memory::f64_store(memory(self.store, frame)?, &mut self.stack, memarg),
            I32Store8 { memarg } => ops::memory::i32_store8(memory(self.store, frame)?, &mut self.stack, memarg),
            I32Store16 { memarg } => ops::memory::i32_store16(memory(self.store, frame)?, &mut self.stack, memarg),
            I64Store8 { memarg } => ops::memory::i64_store8(memory(self.store, frame)?, &mut self.stack, memarg),
            I64Store16 { memarg } => ops::memory::i64_store16(memory(self.store, frame)?, &mut self.stack, memarg),
            I64Store32 { memarg } => ops::memory::i64_store32(memory(self.store, frame)?, &mut self.stack, memarg),
            MemorySize { reserved } => {
                check_reserved(*reserved)?;
                ops::memory::memory_size(memory(self.store, frame)?, &mut self.stack)
            }
            MemoryGrow { reserved } => {
                check_reserved(*reserved)?;
                let ceiling = self.store.config().max_memory_pages;
                ops::memory::memory_grow(memory(self.store, frame)?, &mut self.stack, ceiling)
            }

            // Constants
            I32Const { value } => {
                self.stack.push(Value::from_i32(*value));
                Ok(())
            }
            I64Const { value } => {
                self.stack.push(Value::from_i64(*value));
                Ok(())
            }
            F32Const { value } => {
                self.stack.push(Value::from_f32(*value));
                Ok(())
            }
            F64Const { value } => {
                self.stack.push(Value::from_f64(*value));
                Ok(())
            }

            // Comparison
            I32Eqz => comparison::i32_eqz(&mut self.stack),
            I32Eq => comparison::i32_eq(&mut self.stack),
            I32Ne => comparison::i32_ne(&mut self.stack),
            I32LtS => comparison::i32_lt_s(&mut self.stack),
            I32LtU => comparison::i32_lt_u(&mut self.stack),
            I32GtS => comparison::i32_gt_s(&mut self.stack),
            I32GtU => comparison::i32_gt_u(&mut self.stack),
            I32LeS => comparison::i32_le_s(&mut self.stack),
            I32LeU => comparison::i32_le_u(&mut self.stack),
            I32GeS => comparison::i32_ge_s(&mut self.stack),
            I32GeU => comparison::i32_ge_u(&mut self.stack),
            I64Eqz => comparison::i64_eqz(&mut self.stack),
            I64Eq => comparison::i64_eq(&mut self.stack),
            I64Ne => comparison::i64_ne(&mut self.stack),
            I64LtS => comparison::i64_lt_s(&mut self.stack),
            I64LtU => comparison::i64_lt_u(&mut self.stack),
            I64GtS => comparison::i64_gt_s(&mut self.stack),
            I64GtU => comparison::i64_gt_u(&mut self.stack),
            I64LeS => comparison::i64_le_s(&mut self.stack),
            I64LeU => comparison::i64_le_u(&mut self.stack),
            I64GeS => comparison::i64_ge_s(&mut self.stack),
            I64GeU => comparison::i64_ge_u(&mut self.stack),
            F32Eq => comparison::f32_eq(&mut self.stack),
            F32Ne => comparison::f32_ne(&mut self.stack),
            F32Lt => comparison::f32_lt(&mut self.stack),
            F32Gt => comparison::f32_gt(&mut self.stack),
            F32Le => comparison::f32_le(&mut self.stack),
            F32Ge => comparison::f32_ge(&mut self.stack),
            F64Eq => comparison::f64_eq(&mut self.stack),
            F64Ne => comparison::f64_ne(&mut self.stack),
            F64Lt => comparison::f64_lt(&mut self.stack),
            F64Gt => comparison::f64_gt(&mut self.stack),
            F64Le => comparison::f64_le(&mut self.stack),
            F64Ge => comparison::f64_ge(&mut self.stack),

            // i32 arithmetic
            I32Clz => bitwise::i32_clz(&mut self.stack),
            I32Ctz => bitwise::i32_ctz(&mut self.stack),
            I32Popcnt => bitwise::i32_popcnt(&mut self.stack),
            I32Add => numeric::i32_add(&mut self.stack),
            I32Sub => numeric::i32_sub(&mut self.stack),
            I32Mul => numeric::i32_mul(&mut self.stack),
            I32DivS => numeric::i32_div_s(&mut self.stack),
            I32DivU => numeric::i32_div_u(&mut self.stack),
            I32RemS => numeric::i32_rem_s(&mut self.stack),
            I32RemU => numeric::i32_rem_u(&mut self.stack),
            I32And => bitwise::i32_and(&mut self.stack),
            I32Or => bitwise::i32_or(&mut self.stack),
            I32Xor => bitwise::i32_xor(&mut self.stack),
            I32Shl => bitwise::i32_shl(&mut self.stack),
            I32ShrS => bitwise::i32_shr_s(&mut self.stack),
            I32ShrU => bitwise::i32_shr_u(&mut self.stack),
            I32Rotl => bitwise::i32_rotl(&mut self.stack),
            I32Rotr => bitwise::i32_rotr(&mut self.stack),

            // i64 arithmetic
            I64Clz => bitwise::i64_clz(&mut self.stack),
            I64Ctz => bitwise::i64_ctz(&mut self.stack),
            I64Popcnt => bitwise::i64_popcnt(&mut self.stack),
            I64Add => numeric::i64_add(&mut self.stack),
            I64Sub => numeric::i64_sub(&mut self.stack),
            I64Mul => numeric::i64_mul(&mut self.stack),
            I64DivS => numeric::i64_div_s(&mut self.stack),
            I64DivU => numeric::i64_div_u(&mut self.stack),
            I64RemS => numeric::i64_rem_s(&mut self.stack),
            I64RemU => numeric::i64_rem_u(&mut self.stack),
            I64And => bitwise::i64_and(&mut self.stack),
            I64Or => bitwise::i64_or(&mut self.stack),
            I64Xor => bitwise::i64_xor(&mut self.stack),
            I64Shl => bitwise::i64_shl(&mut self.stack),
            I64ShrS => bitwise::i64_shr_s(&mut self.stack),
            I64ShrU => bitwise::i64_shr_u(&mut self.stack),
            I64Rotl => bitwise::i64_rotl(&mut self.stack),
            I64Rotr => bitwise::i64_rotr(&mut self.stack),

            // f32 arithmetic
            F32Abs => numeric::f32_abs(&mut self.stack),
            F32Neg => numeric::f32_neg(&mut self.stack),
            F32Ceil => numeric::f32_ceil(&mut self.stack),
            F32Floor => numeric::f32_floor(&mut self.stack),
            F32Trunc => numeric::f32_trunc(&mut self.stack),
            F32Nearest => numeric::f32_nearest(&mut self.stack),
            F32Sqrt => numeric::f32_sqrt(&mut self.stack),
            F32Add => numeric::f32_add(&mut self.stack),
            F32Sub => numeric::f32_sub(&mut self.stack),
            F32Mul => numeric::f32_mul(&mut self.stack),
            F32Div => numeric::f32_div(&mut self.stack),
            F32Min => numeric::f32_min(&mut self.stack),
            F32Max => numeric::f32_max(&mut self.stack),
            F32Copysign => numeric::f32_copysign(&mut self.stack),

            // f64 arithmetic
            F64Abs => numeric::f64_abs(&mut self.stack),
            F64Neg => numeric::f64_neg(&mut self.stack),
            F64Ceil => numeric::f64_ceil(&mut self.stack),
            F64Floor => numeric::f64_floor(&mut self.stack),
            F64Trunc => numeric::f64_trunc(&mut self.stack),
            F64Nearest => numeric::f64_nearest(&mut self.stack),
            F64Sqrt => numeric::f64_sqrt(&mut self.stack),
            F64Add => numeric::f64_add(&mut self.stack),
            F64Sub => numeric::f64_sub(&mut self.stack),
            F64Mul => numeric::f64_mul(&mut self.stack),
            F64Div => numeric::f64_div(&mut self.stack),
            F64Min => numeric::f64_min(&mut self.stack),
            F64Max => numeric::f64_max(&mut self.stack),
            F64Copysign => numeric::f64_copysign(&mut self.stack),

            // Conversions
            I32WrapI64 => conversion::i32_wrap_i64(&mut self.stack),
            I32TruncF32S => conversion::i32_trunc_f32_s(&mut self.stack),
            I32TruncF32U => conversion::i32_trunc_f32_u(&mut self.stack),
            I32TruncF64S => conversion::i32_trunc_f64_s(&mut self.stack),
            I32TruncF64U => conversion::i32_trunc_f64_u(&mut self.stack),
            I64ExtendI32S => conversion::i64_extend_i32_s(&mut self.stack),
            I64ExtendI32U => conversion::i64_extend_i32_u(&mut self.stack),
            I64TruncF32S => conversion::i64_trunc_f32_s(&mut self.stack),
            I64TruncF32U => conversion::i64_trunc_f32_u(&mut self.stack),
            I64TruncF64S => conversion::i64_trunc_f64_s(&mut self.stack),
            I64TruncF64U => conversion::i64_trunc_f64_u(&mut self.stack),
            F32ConvertI32S => conversion::f32_convert_i32_s(&mut self.stack),
            F32ConvertI32U => conversion::f32_convert_i32_u(&mut self.stack),
            F32ConvertI64S => conversion::f32_convert_i64_s(&mut self.stack),
            F32ConvertI64U => conversion::f32_convert_i64_u(&mut self.stack),
            F32DemoteF64 => conversion::f32_demote_f64(&mut self.stack),
            F64ConvertI32S => conversion::f64_convert_i32_s(&mut self.stack),
            F64ConvertI32U => conversion::f64_convert_i32_u(&mut self.stack),
            F64ConvertI64S => conversion::f64_convert_i64_s(&mut self.stack),
            F64ConvertI64U => conversion::f64_convert_i64_u(&mut self.stack),
            F64PromoteF32 => conversion::f64_promote_f32(&mut self.stack),

            // Reinterpretations
            I32ReinterpretF32 => conversion::reinterpret(&mut self.stack, ValueType::F32, ValueType::I32),
            I64ReinterpretF64 => conversion::reinterpret(&mut self.stack, ValueType::F64, ValueType::I64),
            F32ReinterpretI32 => conversion::reinterpret(&mut self.stack, ValueType::I32, ValueType::F32),
            F64ReinterpretI64 => conversion::reinterpret(&mut self.stack, ValueType::I64, ValueType::F64),

            Unknown { opcode } => Err(RuntimeError::UnimplementedInstruction(format!("opcode {opcode:#04x}"))),
        }
    }
}
