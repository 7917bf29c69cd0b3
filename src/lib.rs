//! # wembed
//!
//! An embeddable WebAssembly execution engine: decode a binary module,
//! lower its functions to a fixed-width instruction stream on first use,
//! and run them on a byte-addressed interpreter.
//!
//! # Pipeline
//!
//! 1. [`Module::from_buffer`] decodes a `.wasm` byte slice into its
//!    descriptor tables (types, imports, exports, memory limits, ...) plus
//!    a vector of not-yet-validated function bodies.
//! 2. [`Instance::new`] wraps a shared [`Module`] (behind an [`Arc`]) with
//!    its own evaluation stack, locals stack, linear memory and call
//!    stack.
//! 3. [`Instance::call`] resolves an export by name, lowers its function
//!    body the first time it's called (caching the result on the shared
//!    module source so sibling instances reuse it), and runs it.
//!
//! A function that never validates, or a call that traps, never brings
//! the process down: lowering failures surface as [`CallError`], and a
//! trap mid-execution clears the instance's stacks and sets a sticky
//! trapped flag that only [`Instance::restart`] clears.
//!
//! This engine does not implement host-function imports, globals, tables,
//! control flow, or SIMD; see the crate's design notes for what a module
//! using any of these gets instead (a decode or lowering error, never a
//! silent miscompile).
//!
//! [`Arc`]: alloc::sync::Arc
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std as alloc;

mod decode;
mod error;
mod instance;
mod isa;
mod leb;
mod lower;
mod memory;
mod module;
mod stack;
mod types;

pub use error::{CallError, DecodeError, DecodeErrorKind, GlobalError, LowerError, LowerErrorKind, Trap};
pub use instance::Instance;
pub use lower::{Local, LoweredFunction};
pub use memory::PAGE_SIZE;
pub use module::Module;
pub use types::{Export, ExternalKind, GlobalType, Import, ImportKind, Limits, RefType, Signature, TableType};

pub use wembed_core::{TrapCode, Value, ValueCell, ValueType, F32, F64};
