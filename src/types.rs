//! Module-level descriptor types: signatures, limits, tables, globals,
//! imports and exports. These are the decoder's output vocabulary, consumed
//! unchanged by the lowerer and the instance.
use alloc::string::String;

use wembed_core::ValueType;

/// A function signature: an ordered parameter list plus an optional single
/// result.
///
/// Wasm 1.0 function types may declare any number of results; this engine
/// only accepts 0 or 1; multi-result signatures are rejected at decode
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: alloc::vec::Vec<ValueType>,
    pub result: Option<ValueType>,
}

impl Signature {
    pub fn new(params: alloc::vec::Vec<ValueType>, result: Option<ValueType>) -> Self {
        Signature { params, result }
    }
}

/// A `(min, max?)` pair of 32-bit counts. Absent `max` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

/// Reference type a table can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    FuncRef,
    ExternRef,
}

/// A table descriptor: element type plus limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub element: RefType,
    pub limits: Limits,
}

/// A global descriptor: value type plus mutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

/// What kind of definition an import or export names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    Function,
    Table,
    Memory,
    Global,
}

/// The kind-specific payload of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Function(u32),
    Table(TableType),
    Memory(Limits),
    Global(GlobalType),
}

impl ImportKind {
    pub fn external_kind(&self) -> ExternalKind {
        match self {
            ImportKind::Function(_) => ExternalKind::Function,
            ImportKind::Table(_) => ExternalKind::Table,
            ImportKind::Memory(_) => ExternalKind::Memory,
            ImportKind::Global(_) => ExternalKind::Global,
        }
    }
}

/// `(module-name, field-name, kind)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub field: String,
    pub kind: ImportKind,
}

/// `(name, kind, index)`, the index selecting within the kind's index space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub kind: ExternalKind,
    pub index: u32,
}
