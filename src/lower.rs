//! The combined validator/lowerer: a single type-directed pass per function
//! body that both checks Wasm's static rules and rewrites the instruction
//! stream into the fixed-width form the interpreter consumes.
//!
//! There is no separate validation crate: a combined pass matches this
//! engine's actual instruction set more closely than a two-pass design
//! would, since there is exactly one thing to compute (the lowered stream)
//! and the type checks are just the precondition for emitting each word
//! correctly.
use alloc::vec::Vec;

use wembed_core::ValueType;

use crate::{
    decode::RawFunction,
    error::{LowerError, LowerErrorKind},
    isa::{opcode, Code},
    leb,
    types::Signature,
};

/// One local slot: its value type and its storage width in bytes, both of
/// which the interpreter needs to size and address the locals frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Local {
    pub value_type: ValueType,
    pub byte_size: u32,
}

/// A function body after lowering: fixed-size locals layout, byte-sized
/// result, and the lowered instruction stream.
#[derive(Debug, Clone)]
pub struct LoweredFunction {
    pub param_count: u32,
    pub locals: Vec<Local>,
    pub result: Option<ValueType>,
    pub code: Code,
}

struct BodyReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> BodyReader<'a> {
    fn map_err(&self, kind: crate::error::DecodeErrorKind) -> LowerErrorKind {
        use crate::error::DecodeErrorKind as D;
        match kind {
            D::UnexpectedEof | D::IntegerTooLarge => LowerErrorKind::UnexpectedEnd,
            _ => LowerErrorKind::UnexpectedEnd,
        }
    }

    fn byte(&mut self) -> Result<u8, LowerErrorKind> {
        leb::read_byte(self.bytes, &mut self.offset).map_err(|k| self.map_err(k))
    }

    fn u32(&mut self) -> Result<u32, LowerErrorKind> {
        leb::read_u32(self.bytes, &mut self.offset).map_err(|k| self.map_err(k))
    }

    fn i32(&mut self) -> Result<i32, LowerErrorKind> {
        leb::read_i32(self.bytes, &mut self.offset).map_err(|k| self.map_err(k))
    }

    fn i64(&mut self) -> Result<i64, LowerErrorKind> {
        leb::read_i64(self.bytes, &mut self.offset).map_err(|k| self.map_err(k))
    }

    fn raw(&mut self, n: usize) -> Result<&'a [u8], LowerErrorKind> {
        leb::read_bytes(self.bytes, &mut self.offset, n).map_err(|k| self.map_err(k))
    }

    fn value_type(&mut self) -> Result<ValueType, LowerErrorKind> {
        let byte = self.byte()?;
        value_type_from_byte(byte).ok_or(LowerErrorKind::UnknownOpcode(byte))
    }

    fn at_end(&self) -> bool {
        self.offset >= self.bytes.len()
    }
}

fn value_type_from_byte(byte: u8) -> Option<ValueType> {
    match byte {
        0x7F => Some(ValueType::I32),
        0x7E => Some(ValueType::I64),
        0x7D => Some(ValueType::F32),
        0x7C => Some(ValueType::F64),
        0x70 => Some(ValueType::FuncRef),
        0x6F => Some(ValueType::ExternRef),
        _ => None,
    }
}

/// Opcodes this engine recognizes syntactically but deliberately does not
/// lower: control flow, globals, tables, and the system/vector prefix.
fn unsupported_feature(op: u8) -> bool {
    matches!(
        op,
        opcode::BLOCK
            | opcode::LOOP
            | opcode::IF
            | opcode::ELSE
            | opcode::BR
            | opcode::BR_IF
            | opcode::BR_TABLE
            | opcode::CALL_INDIRECT
            | opcode::SELECT
            | opcode::SELECT_T
            | opcode::GLOBAL_GET
            | opcode::GLOBAL_SET
            | opcode::TABLE_GET
            | opcode::TABLE_SET
            | opcode::SYSTEM_PREFIX
    )
}

struct Lowerer<'a> {
    function_index: u32,
    reader: BodyReader<'a>,
    operand_stack: Vec<ValueType>,
    locals: &'a [Local],
    signature: &'a Signature,
    all_function_types: &'a [u32],
    types: &'a [Signature],
    has_memory: bool,
    code: Code,
    after_return: bool,
    instr_offset: usize,
}

impl<'a> Lowerer<'a> {
    fn error(&self, kind: LowerErrorKind) -> LowerError {
        LowerError { function_index: self.function_index, offset: Some(self.instr_offset), kind }
    }

    fn pop(&mut self, expected: ValueType) -> Result<(), LowerError> {
        if self.after_return {
            return Ok(());
        }
        match self.operand_stack.pop() {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(self.error(LowerErrorKind::TypeMismatch { expected, found: Some(actual) })),
            None => Err(self.error(LowerErrorKind::TypeMismatch { expected, found: None })),
        }
    }

    fn pop_any(&mut self) -> Result<Option<ValueType>, LowerError> {
        if self.after_return {
            return Ok(None);
        }
        self.operand_stack.pop().map(Some).ok_or_else(|| self.error(LowerErrorKind::StackUnderflow))
    }

    fn push(&mut self, ty: ValueType) {
        if !self.after_return {
            self.operand_stack.push(ty);
        }
    }

    fn local(&self, index: u32) -> Result<&'a Local, LowerError> {
        self.locals
            .get(index as usize)
            .ok_or_else(|| self.error(LowerErrorKind::InvalidLocalIndex(index)))
    }

    fn check_result_arity(&self) -> Result<(), LowerError> {
        if self.after_return {
            return Ok(());
        }
        match self.signature.result {
            Some(ty) => {
                if self.operand_stack.len() == 1 && self.operand_stack[0] == ty {
                    Ok(())
                } else {
                    Err(self.error(LowerErrorKind::StackHeightMismatchAtEnd))
                }
            }
            None => {
                if self.operand_stack.is_empty() {
                    Ok(())
                } else {
                    Err(self.error(LowerErrorKind::StackHeightMismatchAtEnd))
                }
            }
        }
    }

    fn memory_immediate(&mut self) -> Result<u32, LowerError> {
        if !self.has_memory {
            return Err(self.error(LowerErrorKind::InvalidMemoryIndex));
        }
        self.reader.u32().map_err(|k| self.error(k))?; // align, unused: only offset is used
        self.reader.u32().map_err(|k| self.error(k))
    }

    fn lower(mut self) -> Result<Code, LowerError> {
        loop {
            if self.reader.at_end() {
                return Err(self.error(LowerErrorKind::UnexpectedEnd));
            }
            self.instr_offset = self.reader.offset;
            let op = self.reader.byte().map_err(|k| self.error(k))?;

            if op == opcode::END {
                self.check_result_arity()?;
                return Ok(self.code);
            }

            if unsupported_feature(op) {
                return Err(self.error(LowerErrorKind::UnsupportedFeature(op)));
            }

            self.step(op)?;
        }
    }

    fn step(&mut self, op: u8) -> Result<(), LowerError> {
        use opcode::*;
        use ValueType::{ExternRef, FuncRef, F32, F64, I32, I64};

        match op {
            UNREACHABLE => {
                if !self.after_return {
                    self.code.emit_op(op, 0);
                }
            }
            NOP => {
                if !self.after_return {
                    self.code.emit_op(op, 0);
                }
            }
            RETURN => {
                self.check_result_arity()?;
                if !self.after_return {
                    self.code.emit_op(op, 0);
                }
                self.after_return = true;
            }
            CALL => {
                let index = self.reader.u32().map_err(|k| self.error(k))?;
                let type_index = *self
                    .all_function_types
                    .get(index as usize)
                    .ok_or_else(|| self.error(LowerErrorKind::InvalidFunctionIndex(index)))?;
                let callee = self
                    .types
                    .get(type_index as usize)
                    .ok_or_else(|| self.error(LowerErrorKind::InvalidTypeIndex(type_index)))?;
                for param in callee.params.iter().rev() {
                    self.pop(*param)?;
                }
                if let Some(result) = callee.result {
                    self.push(result);
                }
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u32(index);
                }
            }
            DROP => {
                let ty = self.pop_any()?;
                if !self.after_return {
                    let size = ty.map(|t| t.byte_size()).unwrap_or(4) as u8;
                    self.code.emit_op(op, size);
                }
            }
            LOCAL_GET => {
                let index = self.reader.u32().map_err(|k| self.error(k))?;
                let local = *self.local(index)?;
                self.push(local.value_type);
                if !self.after_return {
                    let narrow = u16::try_from(index)
                        .map_err(|_| self.error(LowerErrorKind::InvalidLocalIndex(index)))?;
                    self.code.emit_op(op, local.byte_size as u8);
                    self.code.emit_u16(narrow);
                }
            }
            LOCAL_SET => {
                let index = self.reader.u32().map_err(|k| self.error(k))?;
                let local = *self.local(index)?;
                self.pop(local.value_type)?;
                if !self.after_return {
                    let narrow = u16::try_from(index)
                        .map_err(|_| self.error(LowerErrorKind::InvalidLocalIndex(index)))?;
                    self.code.emit_op(op, local.byte_size as u8);
                    self.code.emit_u16(narrow);
                }
            }
            LOCAL_TEE => {
                let index = self.reader.u32().map_err(|k| self.error(k))?;
                let local = *self.local(index)?;
                self.pop(local.value_type)?;
                self.push(local.value_type);
                if !self.after_return {
                    let narrow = u16::try_from(index)
                        .map_err(|_| self.error(LowerErrorKind::InvalidLocalIndex(index)))?;
                    self.code.emit_op(op, local.byte_size as u8);
                    self.code.emit_u16(narrow);
                }
            }
            MEMORY_SIZE => {
                let reserved = self.reader.byte().map_err(|k| self.error(k))?;
                if reserved != 0 {
                    return Err(self.error(LowerErrorKind::InvalidMemoryIndex));
                }
                if !self.has_memory {
                    return Err(self.error(LowerErrorKind::InvalidMemoryIndex));
                }
                self.push(I32);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                }
            }
            MEMORY_GROW => {
                let reserved = self.reader.byte().map_err(|k| self.error(k))?;
                if reserved != 0 {
                    return Err(self.error(LowerErrorKind::InvalidMemoryIndex));
                }
                if !self.has_memory {
                    return Err(self.error(LowerErrorKind::InvalidMemoryIndex));
                }
                self.pop(I32)?;
                self.push(I32);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                }
            }
            I32_CONST => {
                let value = self.reader.i32().map_err(|k| self.error(k))?;
                self.push(I32);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u32(value as u32);
                }
            }
            I64_CONST => {
                let value = self.reader.i64().map_err(|k| self.error(k))?;
                self.push(I64);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u64(value as u64);
                }
            }
            F32_CONST => {
                let bytes = self.reader.raw(4).map_err(|k| self.error(k))?;
                let value = f32::from_le_bytes(bytes.try_into().unwrap());
                self.push(F32);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_f32(value);
                }
            }
            F64_CONST => {
                let bytes = self.reader.raw(8).map_err(|k| self.error(k))?;
                let value = f64::from_le_bytes(bytes.try_into().unwrap());
                self.push(F64);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_f64(value);
                }
            }
            REF_NULL => {
                let byte = self.reader.byte().map_err(|k| self.error(k))?;
                let ty = match byte {
                    0x70 => FuncRef,
                    0x6F => ExternRef,
                    other => return Err(self.error(LowerErrorKind::UnknownOpcode(other))),
                };
                self.push(ty);
                if !self.after_return {
                    self.code.emit_op(op, if ty == FuncRef { 0 } else { 1 });
                }
            }
            REF_IS_NULL => {
                match self.pop_any()? {
                    None | Some(FuncRef) | Some(ExternRef) => {}
                    Some(other) => return Err(self.error(LowerErrorKind::TypeMismatch { expected: FuncRef, found: Some(other) })),
                }
                self.push(I32);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                }
            }
            REF_FUNC => {
                let index = self.reader.u32().map_err(|k| self.error(k))?;
                if index as usize >= self.all_function_types.len() {
                    return Err(self.error(LowerErrorKind::InvalidFunctionIndex(index)));
                }
                self.push(FuncRef);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u32(index);
                }
            }

            // Memory loads.
            I32_LOAD | I32_LOAD8_S | I32_LOAD8_U | I32_LOAD16_S | I32_LOAD16_U => {
                let offset = self.memory_immediate()?;
                self.pop(I32)?;
                self.push(I32);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u32(offset);
                }
            }
            I64_LOAD | I64_LOAD8_S | I64_LOAD8_U | I64_LOAD16_S | I64_LOAD16_U | I64_LOAD32_S | I64_LOAD32_U => {
                let offset = self.memory_immediate()?;
                self.pop(I32)?;
                self.push(I64);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u32(offset);
                }
            }
            F32_LOAD => {
                let offset = self.memory_immediate()?;
                self.pop(I32)?;
                self.push(F32);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u32(offset);
                }
            }
            F64_LOAD => {
                let offset = self.memory_immediate()?;
                self.pop(I32)?;
                self.push(F64);
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u32(offset);
                }
            }
            // Memory stores.
            I32_STORE | I32_STORE8 | I32_STORE16 => {
                let offset = self.memory_immediate()?;
                self.pop(I32)?;
                self.pop(I32)?;
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u32(offset);
                }
            }
            I64_STORE | I64_STORE8 | I64_STORE16 | I64_STORE32 => {
                let offset = self.memory_immediate()?;
                self.pop(I64)?;
                self.pop(I32)?;
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u32(offset);
                }
            }
            F32_STORE => {
                let offset = self.memory_immediate()?;
                self.pop(F32)?;
                self.pop(I32)?;
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u32(offset);
                }
            }
            F64_STORE => {
                let offset = self.memory_immediate()?;
                self.pop(F64)?;
                self.pop(I32)?;
                if !self.after_return {
                    self.code.emit_op(op, 0);
                    self.code.emit_u32(offset);
                }
            }

            // Comparisons (push i32).
            I32_EQZ => self.unop_cmp(op, I32)?,
            I32_EQ | I32_NE | I32_LT_S | I32_LT_U | I32_GT_S | I32_GT_U | I32_LE_S | I32_LE_U | I32_GE_S | I32_GE_U => {
                self.binop_cmp(op, I32)?
            }
            I64_EQZ => self.unop_cmp(op, I64)?,
            I64_EQ | I64_NE | I64_LT_S | I64_LT_U | I64_GT_S | I64_GT_U | I64_LE_S | I64_LE_U | I64_GE_S | I64_GE_U => {
                self.binop_cmp(op, I64)?
            }
            F32_EQ | F32_NE | F32_LT | F32_GT | F32_LE | F32_GE => self.binop_cmp(op, F32)?,
            F64_EQ | F64_NE | F64_LT | F64_GT | F64_LE | F64_GE => self.binop_cmp(op, F64)?,

            // Integer unary.
            I32_CLZ | I32_CTZ | I32_POPCNT => self.unop(op, I32)?,
            I64_CLZ | I64_CTZ | I64_POPCNT => self.unop(op, I64)?,

            // Integer binary.
            I32_ADD | I32_SUB | I32_MUL | I32_DIV_S | I32_DIV_U | I32_REM_S | I32_REM_U | I32_AND | I32_OR
            | I32_XOR | I32_SHL | I32_SHR_S | I32_SHR_U | I32_ROTL | I32_ROTR => self.binop(op, I32)?,
            I64_ADD | I64_SUB | I64_MUL | I64_DIV_S | I64_DIV_U | I64_REM_S | I64_REM_U | I64_AND | I64_OR
            | I64_XOR | I64_SHL | I64_SHR_S | I64_SHR_U | I64_ROTL | I64_ROTR => self.binop(op, I64)?,

            // Float unary.
            F32_ABS | F32_NEG | F32_CEIL | F32_FLOOR | F32_TRUNC | F32_NEAREST | F32_SQRT => self.unop(op, F32)?,
            F64_ABS | F64_NEG | F64_CEIL | F64_FLOOR | F64_TRUNC | F64_NEAREST | F64_SQRT => self.unop(op, F64)?,

            // Float binary.
            F32_ADD | F32_SUB | F32_MUL | F32_DIV | F32_MIN | F32_MAX | F32_COPYSIGN => self.binop(op, F32)?,
            F64_ADD | F64_SUB | F64_MUL | F64_DIV | F64_MIN | F64_MAX | F64_COPYSIGN => self.binop(op, F64)?,

            // Conversions.
            I32_WRAP_I64 => self.convert(op, I64, I32)?,
            I32_TRUNC_F32_S | I32_TRUNC_F32_U => self.convert(op, F32, I32)?,
            I32_TRUNC_F64_S | I32_TRUNC_F64_U => self.convert(op, F64, I32)?,
            I64_EXTEND_I32_S | I64_EXTEND_I32_U => self.convert(op, I32, I64)?,
            I64_TRUNC_F32_S | I64_TRUNC_F32_U => self.convert(op, F32, I64)?,
            I64_TRUNC_F64_S | I64_TRUNC_F64_U => self.convert(op, F64, I64)?,
            F32_CONVERT_I32_S | F32_CONVERT_I32_U => self.convert(op, I32, F32)?,
            F32_CONVERT_I64_S | F32_CONVERT_I64_U => self.convert(op, I64, F32)?,
            F32_DEMOTE_F64 => self.convert(op, F64, F32)?,
            F64_CONVERT_I32_S | F64_CONVERT_I32_U => self.convert(op, I32, F64)?,
            F64_CONVERT_I64_S | F64_CONVERT_I64_U => self.convert(op, I64, F64)?,
            F64_PROMOTE_F32 => self.convert(op, F32, F64)?,
            I32_REINTERPRET_F32 => self.convert(op, F32, I32)?,
            I64_REINTERPRET_F64 => self.convert(op, F64, I64)?,
            F32_REINTERPRET_I32 => self.convert(op, I32, F32)?,
            F64_REINTERPRET_I64 => self.convert(op, I64, F64)?,
            I32_EXTEND8_S | I32_EXTEND16_S => self.unop(op, I32)?,
            I64_EXTEND8_S | I64_EXTEND16_S | I64_EXTEND32_S => self.unop(op, I64)?,

            other => return Err(self.error(LowerErrorKind::UnknownOpcode(other))),
        }
        Ok(())
    }

    fn unop(&mut self, op: u8, ty: ValueType) -> Result<(), LowerError> {
        self.pop(ty)?;
        self.push(ty);
        if !self.after_return {
            self.code.emit_op(op, 0);
        }
        Ok(())
    }

    fn unop_cmp(&mut self, op: u8, ty: ValueType) -> Result<(), LowerError> {
        self.pop(ty)?;
        self.push(ValueType::I32);
        if !self.after_return {
            self.code.emit_op(op, 0);
        }
        Ok(())
    }

    fn binop(&mut self, op: u8, ty: ValueType) -> Result<(), LowerError> {
        self.pop(ty)?;
        self.pop(ty)?;
        self.push(ty);
        if !self.after_return {
            self.code.emit_op(op, 0);
        }
        Ok(())
    }

    fn binop_cmp(&mut self, op: u8, ty: ValueType) -> Result<(), LowerError> {
        self.pop(ty)?;
        self.pop(ty)?;
        self.push(ValueType::I32);
        if !self.after_return {
            self.code.emit_op(op, 0);
        }
        Ok(())
    }

    fn convert(&mut self, op: u8, src: ValueType, dst: ValueType) -> Result<(), LowerError> {
        self.pop(src)?;
        self.push(dst);
        if !self.after_return {
            self.code.emit_op(op, 0);
        }
        Ok(())
    }
}

/// Parses a function body's local-declaration prelude into a flat, indexable
/// vector, with `params` as its first entries.
fn build_locals(params: &[ValueType], body: &[u8], offset: &mut usize) -> Result<Vec<Local>, LowerErrorKind> {
    let mut locals: Vec<Local> = params.iter().map(|&value_type| Local { value_type, byte_size: value_type.byte_size() }).collect();
    let run_count = leb::read_u32(body, offset)?;
    for _ in 0..run_count {
        let count = leb::read_u32(body, offset)?;
        let byte = leb::read_byte(body, offset)?;
        let value_type = value_type_from_byte(byte).ok_or(LowerErrorKind::UnknownOpcode(byte))?;
        for _ in 0..count {
            locals.push(Local { value_type, byte_size: value_type.byte_size() });
        }
    }
    Ok(locals)
}

/// Lowers one raw function body into its compact instruction-stream form.
///
/// `all_function_types` maps every function index (imported functions first,
/// then defined functions, matching Wasm's index-space ordering) to its type
/// index in `types`; it's how `call` and `ref.func` resolve their targets.
pub fn lower_function(
    function_index: u32,
    raw: &RawFunction,
    types: &[Signature],
    all_function_types: &[u32],
    has_memory: bool,
) -> Result<LoweredFunction, LowerError> {
    let signature = types.get(raw.type_index as usize).ok_or(LowerError {
        function_index,
        offset: None,
        kind: LowerErrorKind::InvalidTypeIndex(raw.type_index),
    })?;

    let mut offset = 0usize;
    let locals = build_locals(&signature.params, &raw.body, &mut offset).map_err(|kind| LowerError {
        function_index,
        offset: Some(offset),
        kind,
    })?;
    let param_count = signature.params.len() as u32;

    let lowerer = Lowerer {
        function_index,
        reader: BodyReader { bytes: &raw.body, offset },
        operand_stack: Vec::new(),
        locals: &locals,
        signature,
        all_function_types,
        types,
        has_memory,
        code: Code::new(),
        after_return: false,
        instr_offset: offset,
    };

    let code = lowerer.lower()?;
    Ok(LoweredFunction { param_count, locals, result: signature.result, code })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::RawFunction;
    use wembed_core::ValueType::I32;

    fn sig(params: &[ValueType], result: Option<ValueType>) -> Signature {
        Signature::new(params.to_vec(), result)
    }

    #[test]
    fn lowers_add_function() {
        let types = [sig(&[I32, I32], Some(I32))];
        let body = vec![0x00, 0x20, 0x00, 0x20, 0x01, 0x6A, 0x0B];
        let raw = RawFunction { type_index: 0, body };
        let lowered = lower_function(0, &raw, &types, &[0], false).unwrap();
        assert_eq!(lowered.param_count, 2);
        assert_eq!(lowered.result, Some(I32));
        assert!(!lowered.code.0.is_empty());
    }

    #[test]
    fn rejects_type_mismatch() {
        let types = [sig(&[I32, I32], Some(I32))];
        // local.get 0; f32.neg; i32.add -- type error
        let body = vec![0x00, 0x20, 0x00, 0x8C, 0x20, 0x01, 0x6A, 0x0B];
        let raw = RawFunction { type_index: 0, body };
        let err = lower_function(0, &raw, &types, &[0], false).unwrap_err();
        assert!(matches!(err.kind, LowerErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn rejects_control_flow_as_unsupported() {
        let types = [sig(&[], None)];
        // block ... (0x02 0x40 is `block` with empty block type) then end end
        let body = vec![0x00, 0x02, 0x40, 0x0B, 0x0B];
        let raw = RawFunction { type_index: 0, body };
        let err = lower_function(0, &raw, &types, &[0], false).unwrap_err();
        assert_eq!(err.kind, LowerErrorKind::UnsupportedFeature(opcode::BLOCK));
    }

    #[test]
    fn rejects_memory_op_without_memory() {
        let types = [sig(&[I32], Some(I32))];
        // local.get 0; i32.load offset=0 align=0; end
        let body = vec![0x00, 0x20, 0x00, 0x28, 0x00, 0x00, 0x0B];
        let raw = RawFunction { type_index: 0, body };
        let err = lower_function(0, &raw, &types, &[0], false).unwrap_err();
        assert_eq!(err.kind, LowerErrorKind::InvalidMemoryIndex);
    }

    #[test]
    fn ignores_instructions_after_return() {
        let types = [sig(&[I32], Some(I32))];
        // local.get 0; return; local.get 0; i32.const 1; i32.add (never type-checked); end
        let body = vec![0x00, 0x20, 0x00, 0x0F, 0x20, 0x00, 0x41, 0x01, 0x6A, 0x0B];
        let raw = RawFunction { type_index: 0, body };
        let lowered = lower_function(0, &raw, &types, &[0], false).unwrap();
        assert_eq!(lowered.result, Some(I32));
    }
}
