//! Shared data model for the `wembed` WebAssembly engine.
//!
//! This crate has no knowledge of modules, instances or the interpreter loop.
//! It only defines the vocabulary every other crate agrees on: value types,
//! the numeric traits that give each value type its Wasm-mandated arithmetic,
//! the trap taxonomy, and the host-facing parameter/result cell.
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std as alloc;

mod cell;
mod nan_preserving_float;
mod trap;
mod value;

pub use self::{
    cell::ValueCell,
    nan_preserving_float::{F32, F64},
    trap::TrapCode,
    value::{
        ArithmeticOps,
        ExtendInto,
        Float,
        FromValue,
        Integer,
        LittleEndianConvert,
        SignExtendFrom,
        TransmuteInto,
        TruncateSaturateInto,
        TryTruncateInto,
        Value,
        ValueType,
        WrapInto,
    },
};
