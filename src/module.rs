//! The module source: decoded tables plus a lazily-lowered function vector.
//!
//! Each function body starts raw and is replaced by its lowered form on
//! first use, under a per-function lock, so instances sharing one source
//! via [`Arc`] never serialize on functions they don't call.
use alloc::{collections::BTreeMap, string::String, sync::Arc, vec::Vec};

use spin::Mutex;

use crate::{
    decode::{self, RawFunction},
    error::{DecodeError, LowerError},
    lower::{lower_function, LoweredFunction},
    types::{Export, GlobalType, Import, Limits, Signature, TableType},
};

enum FunctionSlot {
    Raw(RawFunction),
    Lowered(Arc<LoweredFunction>),
}

/// A decoded module: its descriptor tables, plus a vector of function bodies
/// that move from raw to lowered on first call.
///
/// Function indices throughout this type address only *defined* functions
/// (the code section), not an imports-prefixed index space: this engine does
/// not implement function imports, so the usual Wasm convention of imported functions occupying
/// the low indices collapses to the single defined-function space.
pub struct Module {
    pub types: Vec<Signature>,
    pub func_type_indices: Vec<u32>,
    pub tables: Vec<TableType>,
    pub memory: Option<Limits>,
    pub globals: Vec<GlobalType>,
    pub imports: BTreeMap<(String, String), Import>,
    pub exports: BTreeMap<String, Export>,
    /// The start function's export name, or `None` if the module declares no
    /// start function, or declares one that isn't exported.
    pub start: Option<String>,
    functions: Vec<Mutex<FunctionSlot>>,
}

impl Module {
    /// Decodes a binary module into a module source. The function bodies
    /// remain unvalidated until first called.
    pub fn from_buffer(bytes: &[u8]) -> Result<Self, DecodeError> {
        let decoded = decode::decode(bytes)?;
        let functions = decoded.functions.into_iter().map(|raw| Mutex::new(FunctionSlot::Raw(raw))).collect();
        Ok(Module {
            types: decoded.types,
            func_type_indices: decoded.func_type_indices,
            tables: decoded.tables,
            memory: decoded.memory,
            globals: decoded.globals,
            imports: decoded.imports,
            exports: decoded.exports,
            start: decoded.start,
            functions,
        })
    }

    pub fn function_count(&self) -> u32 {
        self.functions.len() as u32
    }

    pub fn signature(&self, function_index: u32) -> Option<&Signature> {
        let type_index = *self.func_type_indices.get(function_index as usize)?;
        self.types.get(type_index as usize)
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    /// Returns this function's lowered form, lowering it first if this is
    /// the first call to touch it. Idempotent: a function already lowered by
    /// another instance sharing this source is returned directly.
    pub fn lowered_function(&self, function_index: u32) -> Result<Arc<LoweredFunction>, LowerError> {
        let slot = self.functions.get(function_index as usize).expect("valid function index");
        let mut guard = slot.lock();
        match &*guard {
            FunctionSlot::Lowered(lowered) => Ok(lowered.clone()),
            FunctionSlot::Raw(raw) => {
                let lowered = Arc::new(lower_function(
                    function_index,
                    raw,
                    &self.types,
                    &self.func_type_indices,
                    self.memory.is_some(),
                )?);
                *guard = FunctionSlot::Lowered(lowered.clone());
                Ok(lowered)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_module_bytes() -> Vec<u8> {
        let mut bytes = vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0x01, 0x07, 0x01, 0x60, 0x02, 0x7F, 0x7F, 0x01, 0x7F]);
        bytes.extend_from_slice(&[0x03, 0x02, 0x01, 0x00]);
        bytes.extend_from_slice(&[0x07, 0x07, 0x01, 0x03, b'a', b'd', b'd', 0x00, 0x00]);
        let body = vec![0x00, 0x20, 0x00, 0x20, 0x01, 0x6A, 0x0B];
        let mut code_section = vec![0x01];
        code_section.push(body.len() as u8);
        code_section.extend_from_slice(&body);
        bytes.push(0x0A);
        bytes.push(code_section.len() as u8);
        bytes.extend_from_slice(&code_section);
        bytes
    }

    #[test]
    fn lowers_on_first_call_and_caches() {
        let module = Module::from_buffer(&add_module_bytes()).unwrap();
        let export = module.export("add").unwrap();
        let first = module.lowered_function(export.index).unwrap();
        let second = module.lowered_function(export.index).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_export_is_none() {
        let module = Module::from_buffer(&add_module_bytes()).unwrap();
        assert!(module.export("missing").is_none());
    }
}
