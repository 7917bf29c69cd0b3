//! Structured error types for the two static error domains (decode and lower)
//! and for host-side pre-call rejections.
//!
//! These are hand-rolled enums with manual `Display` impls, not `thiserror`:
//! matches the rest of this crate, which never pulls in an error-derive
//! macro crate for its own public error surface.
use alloc::string::String;
use core::fmt;

use wembed_core::{TrapCode, ValueType};

/// A decode failure: the byte slice handed to [`Module::from_buffer`] is not
/// a well-formed binary module this engine accepts.
///
/// [`Module::from_buffer`]: crate::module::Module::from_buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// The section in which decoding stopped, or `None` for the header.
    pub section: Option<u8>,
    /// The byte offset at which decoding stopped.
    pub offset: usize,
    /// What went wrong.
    pub kind: DecodeErrorKind,
}

/// The specific reason a [`DecodeError`] occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// The first four bytes were not `\0asm`.
    InvalidMagic,
    /// The byte slice ended before a length-prefixed field did.
    UnexpectedEof,
    /// A section id this engine does not recognize.
    UnknownSectionId(u8),
    /// A non-custom section id that already appeared earlier in the module.
    DuplicateSection(u8),
    /// A section's declared payload size did not match the bytes it consumed.
    SectionSizeMismatch,
    /// A byte that was supposed to select a value type did not name one.
    InvalidValueType(u8),
    /// A function type was not prefixed by the `0x60` form tag.
    InvalidTypeForm(u8),
    /// A function signature declared more than one result.
    TooManyResults,
    /// A limits flag byte was neither `0x00` nor `0x01`.
    InvalidLimitsFlag(u8),
    /// An import or export kind tag byte was out of range.
    InvalidExternalKind(u8),
    /// A name field was not valid UTF-8.
    InvalidUtf8,
    /// Two exports declared the same name.
    DuplicateExport(String),
    /// Two imports declared the same `(module, field)` pair.
    DuplicateImport(String, String),
    /// A LEB128-encoded integer did not fit in the target width.
    IntegerTooLarge,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "invalid magic number"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::UnknownSectionId(id) => write!(f, "unknown section id {id}"),
            Self::DuplicateSection(id) => write!(f, "duplicate section with id {id}"),
            Self::SectionSizeMismatch => write!(f, "section payload size did not match declared size"),
            Self::InvalidValueType(byte) => write!(f, "invalid value type byte 0x{byte:02x}"),
            Self::InvalidTypeForm(byte) => write!(f, "invalid function type form byte 0x{byte:02x}"),
            Self::TooManyResults => write!(f, "function type declares more than one result"),
            Self::InvalidLimitsFlag(byte) => write!(f, "invalid limits flag byte 0x{byte:02x}"),
            Self::InvalidExternalKind(byte) => write!(f, "invalid import/export kind byte 0x{byte:02x}"),
            Self::InvalidUtf8 => write!(f, "name is not valid utf-8"),
            Self::DuplicateExport(name) => write!(f, "duplicate export name {name:?}"),
            Self::DuplicateImport(module, field) => write!(f, "duplicate import {module:?}.{field:?}"),
            Self::IntegerTooLarge => write!(f, "leb128 integer does not fit in target width"),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.section {
            Some(id) => write!(f, "decode error in section {id} at offset {}: {}", self.offset, self.kind),
            None => write!(f, "decode error in header at offset {}: {}", self.offset, self.kind),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// A lowering failure: the raw body of function `function_index` does not
/// satisfy Wasm's static typing rules, or uses a feature this engine does
/// not lower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowerError {
    /// Index of the function whose body failed to lower.
    pub function_index: u32,
    /// Byte offset within the function body the offending instruction starts
    /// at, when known.
    pub offset: Option<usize>,
    /// What went wrong.
    pub kind: LowerErrorKind,
}

/// The specific reason a [`LowerError`] occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowerErrorKind {
    /// The instruction stream ended before an `end` was reached.
    UnexpectedEnd,
    /// The operand stack did not hold the expected type at this point.
    TypeMismatch {
        /// Type the instruction required.
        expected: ValueType,
        /// Type actually found, or `None` if the stack was empty.
        found: Option<ValueType>,
    },
    /// An operand was required but the stack was empty.
    StackUnderflow,
    /// A `local.*` instruction named a local index out of range.
    InvalidLocalIndex(u32),
    /// A `call` instruction named a function index out of range.
    InvalidFunctionIndex(u32),
    /// A type index referenced a signature out of range.
    InvalidTypeIndex(u32),
    /// A memory instruction referenced a memory index other than 0.
    InvalidMemoryIndex,
    /// An opcode this engine recognizes but does not lower (control flow,
    /// globals, tables, SIMD, the `0xFC` system prefix).
    UnsupportedFeature(u8),
    /// An opcode byte this engine does not recognize at all.
    UnknownOpcode(u8),
    /// The operand stack height at `end` did not match the function's
    /// declared result arity.
    StackHeightMismatchAtEnd,
}

impl fmt::Display for LowerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "function body ended without a terminating `end`"),
            Self::TypeMismatch { expected, found: Some(found) } => {
                write!(f, "expected operand of type {expected}, found {found}")
            }
            Self::TypeMismatch { expected, found: None } => {
                write!(f, "expected operand of type {expected}, found empty stack")
            }
            Self::StackUnderflow => write!(f, "operand stack underflow"),
            Self::InvalidLocalIndex(index) => write!(f, "invalid local index {index}"),
            Self::InvalidFunctionIndex(index) => write!(f, "invalid function index {index}"),
            Self::InvalidTypeIndex(index) => write!(f, "invalid type index {index}"),
            Self::InvalidMemoryIndex => write!(f, "invalid memory index"),
            Self::UnsupportedFeature(opcode) => write!(f, "unsupported feature: opcode 0x{opcode:02x}"),
            Self::UnknownOpcode(opcode) => write!(f, "unknown opcode 0x{opcode:02x}"),
            Self::StackHeightMismatchAtEnd => write!(f, "operand stack height mismatch at function end"),
        }
    }
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(
                f,
                "lower error in function {} at offset {offset}: {}",
                self.function_index, self.kind
            ),
            None => write!(f, "lower error in function {}: {}", self.function_index, self.kind),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LowerError {}

/// A host-side pre-call rejection: the request to [`Instance::call`] could
/// not even begin, because the export doesn't exist or the caller's
/// arguments don't match the callee's signature.
///
/// Distinguished from a [`TrapCode`] by *not* setting the instance's trapped
/// flag — the call never started, so there is nothing to recover from.
///
/// [`Instance::call`]: crate::instance::Instance::call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// No export with this name exists.
    ExportNotFound,
    /// The export exists but does not name a function.
    NotAFunction,
    /// The function was never successfully lowered.
    LowerFailed(LowerError),
    /// Caller supplied the wrong number of arguments.
    ArityMismatch {
        /// Number of parameters the callee's signature declares.
        expected: usize,
        /// Number of arguments the caller supplied.
        found: usize,
    },
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ExportNotFound => write!(f, "no export with this name"),
            Self::NotAFunction => write!(f, "export does not name a function"),
            Self::LowerFailed(err) => write!(f, "function failed to lower: {err}"),
            Self::ArityMismatch { expected, found } => {
                write!(f, "expected {expected} arguments, found {found}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CallError {}

/// Why a call returned without a result.
///
/// This is distinct from [`CallError`]: a call can be well-formed and still
/// trap partway through execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trap(pub TrapCode);

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "trap: {}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Trap {}

/// Why [`Instance::get_global`] or [`Instance::set_global`] could not
/// complete.
///
/// This core exposes a slot interface for globals but does not store
/// values behind it: every name is reported not found, regardless of
/// whether the module actually declares a global under it.
///
/// [`Instance::get_global`]: crate::instance::Instance::get_global
/// [`Instance::set_global`]: crate::instance::Instance::set_global
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalError {
    /// No global with this name is readable or writable.
    NotFound,
}

impl fmt::Display for GlobalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no global with this name"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GlobalError {}
