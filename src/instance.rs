//! The interpreter: the call/return protocol and the fetch-decode-dispatch
//! loop over a lowered instruction stream.
//!
//! The evaluation stack and locals stack are both byte-addressed, so
//! most opcodes here never need to know whether a 4-byte slot holds an `i32`
//! or an `f32`: `LOCAL_GET`/`LOCAL_SET`/`LOCAL_TEE`/`DROP` move raw bytes by
//! width alone. Only the opcodes that actually compute something reinterpret
//! those bytes as the type their name says.
use alloc::{sync::Arc, vec::Vec};

use wembed_core::{ArithmeticOps, Float, Integer, TrapCode, TryTruncateInto, Value, ValueCell, ValueType, WrapInto};

use crate::{
    error::{CallError, GlobalError},
    isa::{opcode, CodeCursor},
    lower::LoweredFunction,
    memory::Memory,
    module::Module,
    stack::{Locals, ValueStack},
    types::ExternalKind,
};

struct CallFrame {
    function: Arc<LoweredFunction>,
    ip: usize,
    locals_base: usize,
}

/// What the inner fetch loop stopped for; the outer loop decides what to do
/// about it, since both outcomes need access to the call stack.
enum StepOutcome {
    Call(u32),
    Return,
}

/// A running instance of a module source.
///
/// Deliberately not shared across threads: every stack here is mutated
/// in place by a single fetch/decode/dispatch loop, with no synchronization.
/// Many instances may share one [`Module`] behind an [`Arc`]; each gets its
/// own stacks and linear memory.
pub struct Instance {
    source: Arc<Module>,
    values: ValueStack,
    locals: Locals,
    memory: Memory,
    call_stack: Vec<CallFrame>,
    trapped: bool,
}

impl Instance {
    /// Builds a fresh instance over a module source. Linear memory is sized
    /// from the module's declared limits, or one page if it declares none.
    pub fn new(source: Arc<Module>) -> Self {
        let memory = Memory::new(source.memory);
        Instance { source, values: ValueStack::new(), locals: Locals::new(), memory, call_stack: Vec::new(), trapped: false }
    }

    pub fn is_trapped(&self) -> bool {
        self.trapped
    }

    /// Clears the trapped flag. Linear memory is left exactly as the trap
    /// left it; only the evaluation stack, locals stack and call stack were
    /// ever dropped.
    pub fn restart(&mut self) {
        self.trapped = false;
        self.values.clear();
        self.locals.clear();
        self.call_stack.clear();
    }

    /// A host-facing pointer into this instance's linear memory, or `None`
    /// if `address` is out of bounds.
    pub fn get_pointer(&mut self, address: u32) -> Option<*mut u8> {
        self.memory.host_pointer(address)
    }

    /// Reads a global's current value by name.
    ///
    /// Always rejects: this instance stores no global values.
    pub fn get_global(&self, _name: &str) -> Result<Value, GlobalError> {
        Err(GlobalError::NotFound)
    }

    /// Writes a global's value by name.
    ///
    /// Always rejects, for the same reason as [`get_global`](Self::get_global).
    pub fn set_global(&mut self, _name: &str, _value: Value) -> Result<(), GlobalError> {
        Err(GlobalError::NotFound)
    }

    /// Calls an exported function by name.
    ///
    /// Arguments and the result cross the host boundary as [`ValueCell`]s,
    /// each read or written using the width the callee's signature declares
    /// for that slot; a cell carries no type tag of its own.
    ///
    /// Resolution and argument checking happen before anything is pushed
    /// onto any stack, so a rejected call leaves the instance exactly as it
    /// found it. A call made while the instance is already trapped is
    /// rejected the same way, without even resolving the export.
    pub fn call(&mut self, name: &str, args: &[ValueCell]) -> Result<Option<ValueCell>, CallError> {
        if self.trapped {
            return Ok(None);
        }

        let export = self.source.export(name).ok_or(CallError::ExportNotFound)?;
        if export.kind != ExternalKind::Function {
            return Err(CallError::NotAFunction);
        }
        let function_index = export.index;
        let signature = self.source.signature(function_index).expect("exported function index has a signature");

        if args.len() != signature.params.len() {
            return Err(CallError::ArityMismatch { expected: signature.params.len(), found: args.len() });
        }

        let function = self.source.lowered_function(function_index).map_err(CallError::LowerFailed)?;
        let result_type = function.result;

        for (cell, param_type) in args.iter().zip(signature.params.iter()) {
            push_value(&mut self.values, cell.to_value(*param_type));
        }
        self.enter_call(function);

        match self.run() {
            Ok(()) => Ok(result_type.map(|ty| ValueCell::from_value(pop_value(&mut self.values, ty)))),
            Err(_trap) => Ok(None),
        }
    }

    /// Pushes a fresh call frame, popping the callee's parameters off the
    /// evaluation stack into the first slots of its locals frame.
    ///
    /// Parameters were pushed onto the evaluation stack in declared order
    /// (lowest-indexed parameter pushed first), so the last one pushed sits
    /// on top; popping from the top while filling local slots from the
    /// highest index down restores declared order using a stack that grows
    /// upward.
    fn enter_call(&mut self, function: Arc<LoweredFunction>) {
        let locals_base = self.locals.push_frame(function.locals.len() as u32);
        for i in (0..function.param_count as usize).rev() {
            match function.locals[i].byte_size {
                4 => {
                    let v = self.values.pop_i32();
                    self.locals.set_i32(locals_base, i as u16, v);
                }
                8 => {
                    let v = self.values.pop_i64();
                    self.locals.set_i64(locals_base, i as u16, v);
                }
                other => unreachable!("parameter byte size {other} is neither 4 nor 8"),
            }
        }
        self.call_stack.push(CallFrame { function, ip: 0, locals_base });
    }

    /// Runs call frames until the call stack empties or a trap occurs.
    fn run(&mut self) -> Result<(), TrapCode> {
        loop {
            let frame_index = self.call_stack.len() - 1;
            let function = self.call_stack[frame_index].function.clone();
            let locals_base = self.call_stack[frame_index].locals_base;
            let ip = self.call_stack[frame_index].ip;

            let mut cursor = CodeCursor::new(&function.code.0, ip);
            let outcome = self.dispatch(&mut cursor, locals_base).map_err(|trap| {
                self.trap();
                trap
            })?;
            self.call_stack[frame_index].ip = cursor.ip;

            match outcome {
                StepOutcome::Call(target) => {
                    let callee = self.source.lowered_function(target).map_err(|_| {
                        self.trap();
                        TrapCode::Unreachable
                    })?;
                    self.enter_call(callee);
                }
                StepOutcome::Return => {
                    let frame = self.call_stack.pop().expect("call stack is non-empty in the run loop");
                    self.locals.pop_frame(frame.locals_base);
                    if self.call_stack.is_empty() {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn trap(&mut self) {
        self.trapped = true;
        self.values.clear();
        self.locals.clear();
        self.call_stack.clear();
    }

    /// Fetches and executes instructions until a `call`, a `return`, or the
    /// natural end of the function body (equivalent to `return`, since the
    /// lowerer never emits reachable code past a `return` and a function
    /// body always ends with one stack-height-matching path to `end`).
    fn dispatch(&mut self, cursor: &mut CodeCursor, locals_base: usize) -> Result<StepOutcome, TrapCode> {
        loop {
            if cursor.is_at_end() {
                return Ok(StepOutcome::Return);
            }
            let (op, aux) = cursor.fetch_op();

            match op {
                opcode::UNREACHABLE => return Err(TrapCode::Unreachable),
                opcode::NOP => {}
                opcode::RETURN => return Ok(StepOutcome::Return),
                opcode::CALL => {
                    let index = cursor.fetch_u32();
                    return Ok(StepOutcome::Call(index));
                }

                opcode::DROP => self.values.drop_width(aux as usize),

                opcode::LOCAL_GET => {
                    let index = cursor.fetch_u16();
                    match aux {
                        4 => {
                            let v = self.locals.get_i32(locals_base, index);
                            self.values.push_i32(v)?;
                        }
                        _ => {
                            let v = self.locals.get_i64(locals_base, index);
                            self.values.push_i64(v)?;
                        }
                    }
                }
                opcode::LOCAL_SET => {
                    let index = cursor.fetch_u16();
                    match aux {
                        4 => {
                            let v = self.values.pop_i32();
                            self.locals.set_i32(locals_base, index, v);
                        }
                        _ => {
                            let v = self.values.pop_i64();
                            self.locals.set_i64(locals_base, index, v);
                        }
                    }
                }
                opcode::LOCAL_TEE => {
                    let index = cursor.fetch_u16();
                    match aux {
                        4 => {
                            let v = self.values.pop_i32();
                            self.locals.set_i32(locals_base, index, v);
                            self.values.push_i32(v)?;
                        }
                        _ => {
                            let v = self.values.pop_i64();
                            self.locals.set_i64(locals_base, index, v);
                            self.values.push_i64(v)?;
                        }
                    }
                }

                opcode::MEMORY_SIZE => self.values.push_i32(self.memory.size_pages() as i32)?,
                opcode::MEMORY_GROW => {
                    let delta = self.values.pop_i32() as u32;
                    let previous = self.memory.grow(delta);
                    self.values.push_i32(previous)?;
                }

                opcode::I32_CONST => {
                    let v = cursor.fetch_u32() as i32;
                    self.values.push_i32(v)?;
                }
                opcode::I64_CONST => {
                    let v = cursor.fetch_u64() as i64;
                    self.values.push_i64(v)?;
                }
                opcode::F32_CONST => {
                    let v = cursor.fetch_f32();
                    self.values.push_f32(v)?;
                }
                opcode::F64_CONST => {
                    let v = cursor.fetch_f64();
                    self.values.push_f64(v)?;
                }

                // Null is represented on the stack as `-1`; no valid
                // `ref.func` index can collide with it in practice, since
                // the function index space this engine addresses is tiny.
                opcode::REF_NULL => self.values.push_i32(-1)?,
                opcode::REF_IS_NULL => {
                    let v = self.values.pop_i32();
                    self.values.push_i32((v == -1) as i32)?;
                }
                opcode::REF_FUNC => {
                    let index = cursor.fetch_u32();
                    self.values.push_i32(index as i32)?;
                }

                // Memory loads.
                opcode::I32_LOAD => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: i32 = self.memory.load(addr, offset)?;
                    self.values.push_i32(v)?;
                }
                opcode::I32_LOAD8_S => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: i8 = self.memory.load(addr, offset)?;
                    self.values.push_i32(v as i32)?;
                }
                opcode::I32_LOAD8_U => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: u8 = self.memory.load(addr, offset)?;
                    self.values.push_i32(v as i32)?;
                }
                opcode::I32_LOAD16_S => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: i16 = self.memory.load(addr, offset)?;
                    self.values.push_i32(v as i32)?;
                }
                opcode::I32_LOAD16_U => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: u16 = self.memory.load(addr, offset)?;
                    self.values.push_i32(v as i32)?;
                }
                opcode::I64_LOAD => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: i64 = self.memory.load(addr, offset)?;
                    self.values.push_i64(v)?;
                }
                opcode::I64_LOAD8_S => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: i8 = self.memory.load(addr, offset)?;
                    self.values.push_i64(v as i64)?;
                }
                opcode::I64_LOAD8_U => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: u8 = self.memory.load(addr, offset)?;
                    self.values.push_i64(v as i64)?;
                }
                opcode::I64_LOAD16_S => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: i16 = self.memory.load(addr, offset)?;
                    self.values.push_i64(v as i64)?;
                }
                opcode::I64_LOAD16_U => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: u16 = self.memory.load(addr, offset)?;
                    self.values.push_i64(v as i64)?;
                }
                opcode::I64_LOAD32_S => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: i32 = self.memory.load(addr, offset)?;
                    self.values.push_i64(v as i64)?;
                }
                opcode::I64_LOAD32_U => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: u32 = self.memory.load(addr, offset)?;
                    self.values.push_i64(v as i64)?;
                }
                opcode::F32_LOAD => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: f32 = self.memory.load(addr, offset)?;
                    self.values.push_f32(v)?;
                }
                opcode::F64_LOAD => {
                    let offset = cursor.fetch_u32();
                    let addr = self.values.pop_i32() as u32;
                    let v: f64 = self.memory.load(addr, offset)?;
                    self.values.push_f64(v)?;
                }

                // Memory stores. Value is on top of the stack, address below
                // it, matching the order they were pushed in.
                opcode::I32_STORE => {
                    let offset = cursor.fetch_u32();
                    let value = self.values.pop_i32();
                    let addr = self.values.pop_i32() as u32;
                    self.memory.store(addr, offset, value)?;
                }
                opcode::I32_STORE8 => {
                    let offset = cursor.fetch_u32();
                    let value = self.values.pop_i32() as u8;
                    let addr = self.values.pop_i32() as u32;
                    self.memory.store(addr, offset, value)?;
                }
                opcode::I32_STORE16 => {
                    let offset = cursor.fetch_u32();
                    let value = self.values.pop_i32() as u16;
                    let addr = self.values.pop_i32() as u32;
                    self.memory.store(addr, offset, value)?;
                }
                opcode::I64_STORE => {
                    let offset = cursor.fetch_u32();
                    let value = self.values.pop_i64();
                    let addr = self.values.pop_i32() as u32;
                    self.memory.store(addr, offset, value)?;
                }
                opcode::I64_STORE8 => {
                    let offset = cursor.fetch_u32();
                    let value = self.values.pop_i64() as u8;
                    let addr = self.values.pop_i32() as u32;
                    self.memory.store(addr, offset, value)?;
                }
                opcode::I64_STORE16 => {
                    let offset = cursor.fetch_u32();
                    let value = self.values.pop_i64() as u16;
                    let addr = self.values.pop_i32() as u32;
                    self.memory.store(addr, offset, value)?;
                }
                opcode::I64_STORE32 => {
                    let offset = cursor.fetch_u32();
                    let value = self.values.pop_i64() as u32;
                    let addr = self.values.pop_i32() as u32;
                    self.memory.store(addr, offset, value)?;
                }
                opcode::F32_STORE => {
                    let offset = cursor.fetch_u32();
                    let value = self.values.pop_f32();
                    let addr = self.values.pop_i32() as u32;
                    self.memory.store(addr, offset, value)?;
                }
                opcode::F64_STORE => {
                    let offset = cursor.fetch_u32();
                    let value = self.values.pop_f64();
                    let addr = self.values.pop_i32() as u32;
                    self.memory.store(addr, offset, value)?;
                }

                // Comparisons.
                opcode::I32_EQZ => {
                    let v = self.values.pop_i32();
                    self.values.push_i32((v == 0) as i32)?;
                }
                opcode::I32_EQ => self.cmp_i32(|a, b| a == b)?,
                opcode::I32_NE => self.cmp_i32(|a, b| a != b)?,
                opcode::I32_LT_S => self.cmp_i32(|a, b| a < b)?,
                opcode::I32_LT_U => self.cmp_u32(|a, b| a < b)?,
                opcode::I32_GT_S => self.cmp_i32(|a, b| a > b)?,
                opcode::I32_GT_U => self.cmp_u32(|a, b| a > b)?,
                opcode::I32_LE_S => self.cmp_i32(|a, b| a <= b)?,
                opcode::I32_LE_U => self.cmp_u32(|a, b| a <= b)?,
                opcode::I32_GE_S => self.cmp_i32(|a, b| a >= b)?,
                opcode::I32_GE_U => self.cmp_u32(|a, b| a >= b)?,

                opcode::I64_EQZ => {
                    let v = self.values.pop_i64();
                    self.values.push_i32((v == 0) as i32)?;
                }
                opcode::I64_EQ => self.cmp_i64(|a, b| a == b)?,
                opcode::I64_NE => self.cmp_i64(|a, b| a != b)?,
                opcode::I64_LT_S => self.cmp_i64(|a, b| a < b)?,
                opcode::I64_LT_U => self.cmp_u64(|a, b| a < b)?,
                opcode::I64_GT_S => self.cmp_i64(|a, b| a > b)?,
                opcode::I64_GT_U => self.cmp_u64(|a, b| a > b)?,
                opcode::I64_LE_S => self.cmp_i64(|a, b| a <= b)?,
                opcode::I64_LE_U => self.cmp_u64(|a, b| a <= b)?,
                opcode::I64_GE_S => self.cmp_i64(|a, b| a >= b)?,
                opcode::I64_GE_U => self.cmp_u64(|a, b| a >= b)?,

                opcode::F32_EQ => self.cmp_f32(|a, b| a == b)?,
                opcode::F32_NE => self.cmp_f32(|a, b| a != b)?,
                opcode::F32_LT => self.cmp_f32(|a, b| a < b)?,
                opcode::F32_GT => self.cmp_f32(|a, b| a > b)?,
                opcode::F32_LE => self.cmp_f32(|a, b| a <= b)?,
                opcode::F32_GE => self.cmp_f32(|a, b| a >= b)?,

                opcode::F64_EQ => self.cmp_f64(|a, b| a == b)?,
                opcode::F64_NE => self.cmp_f64(|a, b| a != b)?,
                opcode::F64_LT => self.cmp_f64(|a, b| a < b)?,
                opcode::F64_GT => self.cmp_f64(|a, b| a > b)?,
                opcode::F64_LE => self.cmp_f64(|a, b| a <= b)?,
                opcode::F64_GE => self.cmp_f64(|a, b| a >= b)?,

                // Integer unary.
                opcode::I32_CLZ => {
                    let v = self.values.pop_i32();
                    self.values.push_i32(Integer::leading_zeros(v))?;
                }
                opcode::I32_CTZ => {
                    let v = self.values.pop_i32();
                    self.values.push_i32(Integer::trailing_zeros(v))?;
                }
                opcode::I32_POPCNT => {
                    let v = self.values.pop_i32();
                    self.values.push_i32(Integer::count_ones(v))?;
                }
                opcode::I64_CLZ => {
                    let v = self.values.pop_i64();
                    self.values.push_i64(Integer::leading_zeros(v))?;
                }
                opcode::I64_CTZ => {
                    let v = self.values.pop_i64();
                    self.values.push_i64(Integer::trailing_zeros(v))?;
                }
                opcode::I64_POPCNT => {
                    let v = self.values.pop_i64();
                    self.values.push_i64(Integer::count_ones(v))?;
                }

                // Integer binary, 32-bit.
                opcode::I32_ADD => self.binop_i32(|a, b| a.wrapping_add(b))?,
                opcode::I32_SUB => self.binop_i32(|a, b| a.wrapping_sub(b))?,
                opcode::I32_MUL => self.binop_i32(|a, b| a.wrapping_mul(b))?,
                opcode::I32_DIV_S => self.try_binop_i32(|a, b| ArithmeticOps::div(a, b))?,
                opcode::I32_DIV_U => self.try_binop_u32(|a, b| ArithmeticOps::div(a, b))?,
                opcode::I32_REM_S => self.try_binop_i32(|a, b| Integer::rem(a, b))?,
                opcode::I32_REM_U => self.try_binop_u32(|a, b| Integer::rem(a, b))?,
                opcode::I32_AND => self.binop_i32(|a, b| a & b)?,
                opcode::I32_OR => self.binop_i32(|a, b| a | b)?,
                opcode::I32_XOR => self.binop_i32(|a, b| a ^ b)?,
                opcode::I32_SHL => self.binop_i32(|a, b| a.wrapping_shl(b as u32))?,
                opcode::I32_SHR_S => self.binop_i32(|a, b| a.wrapping_shr(b as u32))?,
                opcode::I32_SHR_U => self.binop_u32(|a, b| a.wrapping_shr(b))?,
                opcode::I32_ROTL => self.binop_i32(|a, b| Integer::rotl(a, b))?,
                opcode::I32_ROTR => self.binop_i32(|a, b| Integer::rotr(a, b))?,

                // Integer binary, 64-bit.
                opcode::I64_ADD => self.binop_i64(|a, b| a.wrapping_add(b))?,
                opcode::I64_SUB => self.binop_i64(|a, b| a.wrapping_sub(b))?,
                opcode::I64_MUL => self.binop_i64(|a, b| a.wrapping_mul(b))?,
                opcode::I64_DIV_S => self.try_binop_i64(|a, b| ArithmeticOps::div(a, b))?,
                opcode::I64_DIV_U => self.try_binop_u64(|a, b| ArithmeticOps::div(a, b))?,
                opcode::I64_REM_S => self.try_binop_i64(|a, b| Integer::rem(a, b))?,
                opcode::I64_REM_U => self.try_binop_u64(|a, b| Integer::rem(a, b))?,
                opcode::I64_AND => self.binop_i64(|a, b| a & b)?,
                opcode::I64_OR => self.binop_i64(|a, b| a | b)?,
                opcode::I64_XOR => self.binop_i64(|a, b| a ^ b)?,
                opcode::I64_SHL => self.binop_i64(|a, b| a.wrapping_shl(b as u32))?,
                opcode::I64_SHR_S => self.binop_i64(|a, b| a.wrapping_shr(b as u32))?,
                opcode::I64_SHR_U => self.binop_u64(|a, b| a.wrapping_shr(b as u32))?,
                opcode::I64_ROTL => self.binop_i64(|a, b| Integer::rotl(a, b as i64))?,
                opcode::I64_ROTR => self.binop_i64(|a, b| Integer::rotr(a, b as i64))?,

                // Float unary.
                opcode::F32_ABS => self.unop_f32(|v| Float::abs(v))?,
                opcode::F32_NEG => self.unop_f32(|v| -v)?,
                opcode::F32_CEIL => self.unop_f32(|v| Float::ceil(v))?,
                opcode::F32_FLOOR => self.unop_f32(|v| Float::floor(v))?,
                opcode::F32_TRUNC => self.unop_f32(|v| Float::trunc(v))?,
                opcode::F32_NEAREST => self.unop_f32(|v| Float::nearest(v))?,
                opcode::F32_SQRT => self.unop_f32(|v| Float::sqrt(v))?,
                opcode::F64_ABS => self.unop_f64(|v| Float::abs(v))?,
                opcode::F64_NEG => self.unop_f64(|v| -v)?,
                opcode::F64_CEIL => self.unop_f64(|v| Float::ceil(v))?,
                opcode::F64_FLOOR => self.unop_f64(|v| Float::floor(v))?,
                opcode::F64_TRUNC => self.unop_f64(|v| Float::trunc(v))?,
                opcode::F64_NEAREST => self.unop_f64(|v| Float::nearest(v))?,
                opcode::F64_SQRT => self.unop_f64(|v| Float::sqrt(v))?,

                // Float binary.
                opcode::F32_ADD => self.binop_f32(|a, b| a + b)?,
                opcode::F32_SUB => self.binop_f32(|a, b| a - b)?,
                opcode::F32_MUL => self.binop_f32(|a, b| a * b)?,
                opcode::F32_DIV => self.binop_f32(|a, b| a / b)?,
                opcode::F32_MIN => self.binop_f32(|a, b| Float::min(a, b))?,
                opcode::F32_MAX => self.binop_f32(|a, b| Float::max(a, b))?,
                opcode::F32_COPYSIGN => self.binop_f32(|a, b| Float::copysign(a, b))?,
                opcode::F64_ADD => self.binop_f64(|a, b| a + b)?,
                opcode::F64_SUB => self.binop_f64(|a, b| a - b)?,
                opcode::F64_MUL => self.binop_f64(|a, b| a * b)?,
                opcode::F64_DIV => self.binop_f64(|a, b| a / b)?,
                opcode::F64_MIN => self.binop_f64(|a, b| Float::min(a, b))?,
                opcode::F64_MAX => self.binop_f64(|a, b| Float::max(a, b))?,
                opcode::F64_COPYSIGN => self.binop_f64(|a, b| Float::copysign(a, b))?,

                // Conversions.
                opcode::I32_WRAP_I64 => {
                    let v = self.values.pop_i64();
                    self.values.push_i32(WrapInto::wrap_into(v))?;
                }
                opcode::I32_TRUNC_F32_S => {
                    let v = self.values.pop_f32();
                    let r: i32 = TryTruncateInto::try_truncate_into(v)?;
                    self.values.push_i32(r)?;
                }
                opcode::I32_TRUNC_F32_U => {
                    let v = self.values.pop_f32();
                    let r: u32 = TryTruncateInto::try_truncate_into(v)?;
                    self.values.push_i32(r as i32)?;
                }
                opcode::I32_TRUNC_F64_S => {
                    let v = self.values.pop_f64();
                    let r: i32 = TryTruncateInto::try_truncate_into(v)?;
                    self.values.push_i32(r)?;
                }
                opcode::I32_TRUNC_F64_U => {
                    let v = self.values.pop_f64();
                    let r: u32 = TryTruncateInto::try_truncate_into(v)?;
                    self.values.push_i32(r as i32)?;
                }
                opcode::I64_EXTEND_I32_S => {
                    let v = self.values.pop_i32();
                    self.values.push_i64(v as i64)?;
                }
                opcode::I64_EXTEND_I32_U => {
                    let v = self.values.pop_i32() as u32;
                    self.values.push_i64(v as i64)?;
                }
                opcode::I64_TRUNC_F32_S => {
                    let v = self.values.pop_f32();
                    let r: i64 = TryTruncateInto::try_truncate_into(v)?;
                    self.values.push_i64(r)?;
                }
                opcode::I64_TRUNC_F32_U => {
                    let v = self.values.pop_f32();
                    let r: u64 = TryTruncateInto::try_truncate_into(v)?;
                    self.values.push_i64(r as i64)?;
                }
                opcode::I64_TRUNC_F64_S => {
                    let v = self.values.pop_f64();
                    let r: i64 = TryTruncateInto::try_truncate_into(v)?;
                    self.values.push_i64(r)?;
                }
                opcode::I64_TRUNC_F64_U => {
                    let v = self.values.pop_f64();
                    let r: u64 = TryTruncateInto::try_truncate_into(v)?;
                    self.values.push_i64(r as i64)?;
                }
                opcode::F32_CONVERT_I32_S => {
                    let v = self.values.pop_i32();
                    self.values.push_f32(v as f32)?;
                }
                opcode::F32_CONVERT_I32_U => {
                    let v = self.values.pop_i32() as u32;
                    self.values.push_f32(v as f32)?;
                }
                opcode::F32_CONVERT_I64_S => {
                    let v = self.values.pop_i64();
                    self.values.push_f32(v as f32)?;
                }
                opcode::F32_CONVERT_I64_U => {
                    let v = self.values.pop_i64() as u64;
                    self.values.push_f32(v as f32)?;
                }
                opcode::F32_DEMOTE_F64 => {
                    let v = self.values.pop_f64();
                    self.values.push_f32(v as f32)?;
                }
                opcode::F64_CONVERT_I32_S => {
                    let v = self.values.pop_i32();
                    self.values.push_f64(v as f64)?;
                }
                opcode::F64_CONVERT_I32_U => {
                    let v = self.values.pop_i32() as u32;
                    self.values.push_f64(v as f64)?;
                }
                opcode::F64_CONVERT_I64_S => {
                    let v = self.values.pop_i64();
                    self.values.push_f64(v as f64)?;
                }
                opcode::F64_CONVERT_I64_U => {
                    let v = self.values.pop_i64() as u64;
                    self.values.push_f64(v as f64)?;
                }
                opcode::F64_PROMOTE_F32 => {
                    let v = self.values.pop_f32();
                    self.values.push_f64(v as f64)?;
                }
                opcode::I32_REINTERPRET_F32 => {
                    let v = self.values.pop_f32();
                    self.values.push_i32(v.to_bits() as i32)?;
                }
                opcode::I64_REINTERPRET_F64 => {
                    let v = self.values.pop_f64();
                    self.values.push_i64(v.to_bits() as i64)?;
                }
                opcode::F32_REINTERPRET_I32 => {
                    let v = self.values.pop_i32();
                    self.values.push_f32(f32::from_bits(v as u32))?;
                }
                opcode::F64_REINTERPRET_I64 => {
                    let v = self.values.pop_i64();
                    self.values.push_f64(f64::from_bits(v as u64))?;
                }
                opcode::I32_EXTEND8_S => {
                    let v = self.values.pop_i32();
                    self.values.push_i32((v as i8) as i32)?;
                }
                opcode::I32_EXTEND16_S => {
                    let v = self.values.pop_i32();
                    self.values.push_i32((v as i16) as i32)?;
                }
                opcode::I64_EXTEND8_S => {
                    let v = self.values.pop_i64();
                    self.values.push_i64((v as i8) as i64)?;
                }
                opcode::I64_EXTEND16_S => {
                    let v = self.values.pop_i64();
                    self.values.push_i64((v as i16) as i64)?;
                }
                opcode::I64_EXTEND32_S => {
                    let v = self.values.pop_i64();
                    self.values.push_i64((v as i32) as i64)?;
                }

                other => unreachable!("opcode 0x{other:02x} never appears in lowered code"),
            }
        }
    }

    fn cmp_i32(&mut self, f: impl FnOnce(i32, i32) -> bool) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i32();
        let lhs = self.values.pop_i32();
        self.values.push_i32(f(lhs, rhs) as i32)
    }

    fn cmp_u32(&mut self, f: impl FnOnce(u32, u32) -> bool) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i32() as u32;
        let lhs = self.values.pop_i32() as u32;
        self.values.push_i32(f(lhs, rhs) as i32)
    }

    fn cmp_i64(&mut self, f: impl FnOnce(i64, i64) -> bool) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i64();
        let lhs = self.values.pop_i64();
        self.values.push_i32(f(lhs, rhs) as i32)
    }

    fn cmp_u64(&mut self, f: impl FnOnce(u64, u64) -> bool) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i64() as u64;
        let lhs = self.values.pop_i64() as u64;
        self.values.push_i32(f(lhs, rhs) as i32)
    }

    fn cmp_f32(&mut self, f: impl FnOnce(f32, f32) -> bool) -> Result<(), TrapCode> {
        let rhs = self.values.pop_f32();
        let lhs = self.values.pop_f32();
        self.values.push_i32(f(lhs, rhs) as i32)
    }

    fn cmp_f64(&mut self, f: impl FnOnce(f64, f64) -> bool) -> Result<(), TrapCode> {
        let rhs = self.values.pop_f64();
        let lhs = self.values.pop_f64();
        self.values.push_i32(f(lhs, rhs) as i32)
    }

    fn binop_i32(&mut self, f: impl FnOnce(i32, i32) -> i32) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i32();
        let lhs = self.values.pop_i32();
        self.values.push_i32(f(lhs, rhs))
    }

    fn binop_u32(&mut self, f: impl FnOnce(u32, u32) -> u32) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i32() as u32;
        let lhs = self.values.pop_i32() as u32;
        self.values.push_i32(f(lhs, rhs) as i32)
    }

    fn try_binop_i32(&mut self, f: impl FnOnce(i32, i32) -> Result<i32, TrapCode>) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i32();
        let lhs = self.values.pop_i32();
        self.values.push_i32(f(lhs, rhs)?)
    }

    fn try_binop_u32(&mut self, f: impl FnOnce(u32, u32) -> Result<u32, TrapCode>) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i32() as u32;
        let lhs = self.values.pop_i32() as u32;
        self.values.push_i32(f(lhs, rhs)? as i32)
    }

    fn binop_i64(&mut self, f: impl FnOnce(i64, i64) -> i64) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i64();
        let lhs = self.values.pop_i64();
        self.values.push_i64(f(lhs, rhs))
    }

    fn binop_u64(&mut self, f: impl FnOnce(u64, u64) -> u64) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i64() as u64;
        let lhs = self.values.pop_i64() as u64;
        self.values.push_i64(f(lhs, rhs) as i64)
    }

    fn try_binop_i64(&mut self, f: impl FnOnce(i64, i64) -> Result<i64, TrapCode>) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i64();
        let lhs = self.values.pop_i64();
        self.values.push_i64(f(lhs, rhs)?)
    }

    fn try_binop_u64(&mut self, f: impl FnOnce(u64, u64) -> Result<u64, TrapCode>) -> Result<(), TrapCode> {
        let rhs = self.values.pop_i64() as u64;
        let lhs = self.values.pop_i64() as u64;
        self.values.push_i64(f(lhs, rhs)? as i64)
    }

    fn unop_f32(&mut self, f: impl FnOnce(f32) -> f32) -> Result<(), TrapCode> {
        let v = self.values.pop_f32();
        self.values.push_f32(f(v))
    }

    fn unop_f64(&mut self, f: impl FnOnce(f64) -> f64) -> Result<(), TrapCode> {
        let v = self.values.pop_f64();
        self.values.push_f64(f(v))
    }

    fn binop_f32(&mut self, f: impl FnOnce(f32, f32) -> f32) -> Result<(), TrapCode> {
        let rhs = self.values.pop_f32();
        let lhs = self.values.pop_f32();
        self.values.push_f32(f(lhs, rhs))
    }

    fn binop_f64(&mut self, f: impl FnOnce(f64, f64) -> f64) -> Result<(), TrapCode> {
        let rhs = self.values.pop_f64();
        let lhs = self.values.pop_f64();
        self.values.push_f64(f(lhs, rhs))
    }
}

/// Pushes a host-supplied argument onto the evaluation stack in its native
/// width. Reference types are represented on the byte stack as an `i32`:
/// `-1` for null, the index itself otherwise.
fn push_value(stack: &mut ValueStack, value: Value) {
    let pushed = match value {
        Value::I32(v) => stack.push_i32(v),
        Value::I64(v) => stack.push_i64(v),
        Value::F32(v) => stack.push_f32(v.into()),
        Value::F64(v) => stack.push_f64(v.into()),
        Value::FuncRef(index) => stack.push_i32(index.map(|i| i as i32).unwrap_or(-1)),
        Value::ExternRef(index) => stack.push_i32(index.map(|i| i as i32).unwrap_or(-1)),
    };
    pushed.expect("a fresh argument push never exceeds the operand stack's height limit");
}

/// Pops a result of the given type off the evaluation stack.
fn pop_value(stack: &mut ValueStack, ty: ValueType) -> Value {
    match ty {
        ValueType::I32 => Value::I32(stack.pop_i32()),
        ValueType::I64 => Value::I64(stack.pop_i64()),
        ValueType::F32 => Value::F32(stack.pop_f32().into()),
        ValueType::F64 => Value::F64(stack.pop_f64().into()),
        ValueType::FuncRef => {
            let v = stack.pop_i32();
            Value::FuncRef(if v == -1 { None } else { Some(v as u32) })
        }
        ValueType::ExternRef => {
            let v = stack.pop_i32();
            Value::ExternRef(if v == -1 { None } else { Some(v as u32) })
        }
        ValueType::V128 => unreachable!("v128 never reaches the evaluation stack"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn wat_bytes(text: &str) -> Vec<u8> {
        wat::parse_str(text).unwrap()
    }

    fn instance(text: &str) -> Instance {
        let module = Module::from_buffer(&wat_bytes(text)).unwrap();
        Instance::new(Arc::new(module))
    }

    #[test]
    fn add_returns_the_sum() {
        let mut i = instance(
            r#"(module (func (export "add") (param i32 i32) (result i32)
                 local.get 0 local.get 1 i32.add))"#,
        );
        let result = i.call("add", &[ValueCell::from(7i32), ValueCell::from(35i32)]).unwrap();
        assert_eq!(result, Some(ValueCell::from(42i32)));
    }

    #[test]
    fn div_by_zero_traps_and_restart_recovers() {
        let mut i = instance(
            r#"(module (func (export "div") (param i32 i32) (result i32)
                 local.get 0 local.get 1 i32.div_s))"#,
        );
        assert_eq!(i.call("div", &[ValueCell::from(10i32), ValueCell::from(3i32)]).unwrap(), Some(ValueCell::from(3i32)));
        assert_eq!(i.call("div", &[ValueCell::from(10i32), ValueCell::from(0i32)]).unwrap(), None);
        assert!(i.is_trapped());
        i.restart();
        assert!(!i.is_trapped());
        assert_eq!(i.call("div", &[ValueCell::from(10i32), ValueCell::from(3i32)]).unwrap(), Some(ValueCell::from(3i32)));
    }

    #[test]
    fn memory_access_past_the_end_traps() {
        let mut i = instance(
            r#"(module (memory 1) (func (export "load32") (param i32) (result i32)
                 local.get 0 i32.load))"#,
        );
        assert_eq!(i.call("load32", &[ValueCell::from(0i32)]).unwrap(), Some(ValueCell::from(0i32)));
        assert_eq!(i.call("load32", &[ValueCell::from(65_534i32)]).unwrap(), None);
        assert!(i.is_trapped());
    }

    #[test]
    fn unknown_export_is_rejected_without_trapping() {
        let mut i = instance(r#"(module (func (export "f") (result i32) i32.const 0))"#);
        assert_matches!(i.call("missing", &[]), Err(CallError::ExportNotFound));
        assert!(!i.is_trapped());
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let mut i = instance(r#"(module (func (export "f") (param i32) (result i32) local.get 0))"#);
        assert_matches!(i.call("f", &[]), Err(CallError::ArityMismatch { expected: 1, found: 0 }));
    }

    #[test]
    fn globals_are_always_not_found() {
        let mut i = instance(r#"(module (func (export "f") (result i32) i32.const 0))"#);
        assert_matches!(i.get_global("counter"), Err(GlobalError::NotFound));
        assert_matches!(i.set_global("counter", Value::I32(1)), Err(GlobalError::NotFound));
    }
}
