//! The binary decoder: header check, section splitting, and parsing of
//! every section into its corresponding descriptor vocabulary from
//! [`crate::types`].
//!
//! Hand-implemented directly against the binary grammar rather than
//! delegated to an external parsing crate — binary decoding is one of the
//! three components this engine exists to provide.
use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};

use wembed_core::ValueType;

use crate::{
    error::{DecodeError, DecodeErrorKind},
    isa::opcode,
    leb,
    types::{Export, ExternalKind, GlobalType, Import, ImportKind, Limits, RefType, Signature, TableType},
};

const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];

/// One raw (unvalidated) function body paired with its signature's type
/// index, exactly as stored in the code section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFunction {
    pub type_index: u32,
    pub body: Vec<u8>,
}

/// The flattened output of decoding a binary module: every section's
/// contents, keyed the way the module source needs them.
#[derive(Debug, Clone, Default)]
pub struct DecodedModule {
    pub types: Vec<Signature>,
    pub imports: BTreeMap<(String, String), Import>,
    pub func_type_indices: Vec<u32>,
    pub tables: Vec<TableType>,
    pub memory: Option<Limits>,
    pub globals: Vec<GlobalType>,
    pub exports: BTreeMap<String, Export>,
    /// The start function's export name, or `None` if the module declares no
    /// start function or the start function isn't exported (this engine has
    /// no unnamed-function entry point, so an unexported start function is
    /// unreachable).
    pub start: Option<String>,
    pub functions: Vec<RawFunction>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
    section: Option<u8>,
}

impl<'a> Reader<'a> {
    fn u32(&mut self) -> Result<u32, DecodeError> {
        leb::read_u32(self.bytes, &mut self.offset).map_err(|kind| self.err_at(kind))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        leb::read_u64(self.bytes, &mut self.offset).map_err(|kind| self.err_at(kind))
    }

    fn i32(&mut self) -> Result<i32, DecodeError> {
        leb::read_i32(self.bytes, &mut self.offset).map_err(|kind| self.err_at(kind))
    }

    fn i64(&mut self) -> Result<i64, DecodeError> {
        leb::read_i64(self.bytes, &mut self.offset).map_err(|kind| self.err_at(kind))
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        leb::read_byte(self.bytes, &mut self.offset).map_err(|kind| self.err_at(kind))
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        leb::read_bytes(self.bytes, &mut self.offset, n).map_err(|kind| self.err_at(kind))
    }

    fn err_at(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError { section: self.section, offset: self.offset, kind }
    }

    fn name(&mut self) -> Result<String, DecodeError> {
        let len = self.u32()? as usize;
        let bytes = self.bytes(len)?;
        core::str::from_utf8(bytes)
            .map(|s| s.to_string())
            .map_err(|_| self.err_at(DecodeErrorKind::InvalidUtf8))
    }

    fn value_type(&mut self) -> Result<ValueType, DecodeError> {
        let byte = self.byte()?;
        value_type_from_byte(byte).ok_or_else(|| self.err_at(DecodeErrorKind::InvalidValueType(byte)))
    }

    fn ref_type(&mut self) -> Result<RefType, DecodeError> {
        let byte = self.byte()?;
        match byte {
            0x70 => Ok(RefType::FuncRef),
            0x6F => Ok(RefType::ExternRef),
            other => Err(self.err_at(DecodeErrorKind::InvalidValueType(other))),
        }
    }

    fn limits(&mut self) -> Result<Limits, DecodeError> {
        let flag = self.byte()?;
        match flag {
            0x00 => Ok(Limits { min: self.u32()?, max: None }),
            0x01 => {
                let min = self.u32()?;
                let max = self.u32()?;
                Ok(Limits { min, max: Some(max) })
            }
            other => Err(self.err_at(DecodeErrorKind::InvalidLimitsFlag(other))),
        }
    }

    /// Skips a constant init expression (the only kind Wasm 1.0 allows in
    /// global initializers, and table/memory offset expressions). Its value
    /// is never evaluated; globals are out of scope for this core.
    fn skip_init_expr(&mut self) -> Result<(), DecodeError> {
        let op = self.byte()?;
        match op {
            opcode::I32_CONST => {
                self.i32()?;
            }
            opcode::I64_CONST => {
                self.i64()?;
            }
            opcode::F32_CONST => {
                self.bytes(4)?;
            }
            opcode::F64_CONST => {
                self.bytes(8)?;
            }
            opcode::GLOBAL_GET => {
                self.u32()?;
            }
            opcode::REF_NULL => {
                self.ref_type()?;
            }
            opcode::REF_FUNC => {
                self.u32()?;
            }
            other => return Err(self.err_at(DecodeErrorKind::InvalidValueType(other))),
        }
        let end = self.byte()?;
        if end != opcode::END {
            return Err(self.err_at(DecodeErrorKind::UnexpectedEof));
        }
        Ok(())
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
        0x7B => Some(ValueType::V128),
        _ => None,
    }
}

/// Decodes a complete binary module.
pub fn decode(bytes: &[u8]) -> Result<DecodedModule, DecodeError> {
    let mut reader = Reader { bytes, offset: 0, section: None };
    if bytes.len() < 8 || bytes[0..4] != MAGIC {
        return Err(reader.err_at(DecodeErrorKind::InvalidMagic));
    }
    // The version field's value is not enforced beyond its presence.
    reader.offset = 8;

    let mut module = DecodedModule::default();
    let mut seen: Vec<u8> = Vec::new();
    let mut start_function_index: Option<u32> = None;

    while reader.offset < bytes.len() {
        let id = reader.byte().map_err(|mut e| {
            e.section = None;
            e
        })?;
        reader.section = Some(id);
        let size = reader.u32()? as usize;
        let payload_start = reader.offset;
        let payload_end = payload_start
            .checked_add(size)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| reader.err_at(DecodeErrorKind::UnexpectedEof))?;

        if id != 0 {
            if seen.contains(&id) {
                return Err(reader.err_at(DecodeErrorKind::DuplicateSection(id)));
            }
            seen.push(id);
        }

        match id {
            0 => {
                // Custom sections are skipped outright.
            }
            1 => parse_type_section(&mut reader, &mut module)?,
            2 => parse_import_section(&mut reader, &mut module)?,
            3 => parse_function_section(&mut reader, &mut module)?,
            4 => parse_table_section(&mut reader, &mut module)?,
            5 => parse_memory_section(&mut reader, &mut module)?,
            6 => parse_global_section(&mut reader, &mut module)?,
            7 => parse_export_section(&mut reader, &mut module)?,
            8 => {
                start_function_index = Some(reader.u32()?);
            }
            9 => parse_element_section(&mut reader)?,
            10 => parse_code_section(&mut reader, &mut module)?,
            11 => parse_data_section(&mut reader)?,
            12 => {
                reader.u32()?;
            }
            other => return Err(reader.err_at(DecodeErrorKind::UnknownSectionId(other))),
        }

        if reader.offset != payload_end {
            return Err(reader.err_at(DecodeErrorKind::SectionSizeMismatch));
        }
    }

    // Resolve the start section's function index against the export table
    // now that both have been fully decoded, regardless of which section
    // happened to appear first in the binary. A start function that isn't
    // exported has no name this engine can call it by, so it is simply not
    // an entry point.
    module.start = start_function_index.and_then(|index| {
        module
            .exports
            .values()
            .find(|export| export.kind == ExternalKind::Function && export.index == index)
            .map(|export| export.name.clone())
    });

    Ok(module)
}

fn parse_type_section(reader: &mut Reader, module: &mut DecodedModule) -> Result<(), DecodeError> {
    let count = reader.u32()?;
    module.types.reserve(count as usize);
    for _ in 0..count {
        let form = reader.byte()?;
        if form != 0x60 {
            return Err(reader.err_at(DecodeErrorKind::InvalidTypeForm(form)));
        }
        let param_count = reader.u32()?;
        let mut params = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            params.push(reader.value_type()?);
        }
        let result_count = reader.u32()?;
        if result_count > 1 {
            return Err(reader.err_at(DecodeErrorKind::TooManyResults));
        }
        let result = if result_count == 1 { Some(reader.value_type()?) } else { None };
        module.types.push(Signature::new(params, result));
    }
    Ok(())
}

fn parse_import_section(reader: &mut Reader, module: &mut DecodedModule) -> Result<(), DecodeError> {
    let count = reader.u32()?;
    for _ in 0..count {
        let module_name = reader.name()?;
        let field = reader.name()?;
        let kind_tag = reader.byte()?;
        let kind = match kind_tag {
            0 => ImportKind::Function(reader.u32()?),
            1 => ImportKind::Table(TableType { element: reader.ref_type()?, limits: reader.limits()? }),
            2 => ImportKind::Memory(reader.limits()?),
            3 => ImportKind::Global(GlobalType { value_type: reader.value_type()?, mutable: reader.byte()? != 0 }),
            other => return Err(reader.err_at(DecodeErrorKind::InvalidExternalKind(other))),
        };
        let key = (module_name.clone(), field.clone());
        if module.imports.contains_key(&key) {
            return Err(reader.err_at(DecodeErrorKind::DuplicateImport(module_name, field)));
        }
        module.imports.insert(key, Import { module: module_name, field, kind });
    }
    Ok(())
}

fn parse_function_section(reader: &mut Reader, module: &mut DecodedModule) -> Result<(), DecodeError> {
    let count = reader.u32()?;
    module.func_type_indices.reserve(count as usize);
    for _ in 0..count {
        module.func_type_indices.push(reader.u32()?);
    }
    Ok(())
}

fn parse_table_section(reader: &mut Reader, module: &mut DecodedModule) -> Result<(), DecodeError> {
    let count = reader.u32()?;
    for _ in 0..count {
        let element = reader.ref_type()?;
        let limits = reader.limits()?;
        module.tables.push(TableType { element, limits });
    }
    Ok(())
}

fn parse_memory_section(reader: &mut Reader, module: &mut DecodedModule) -> Result<(), DecodeError> {
    let count = reader.u32()?;
    for i in 0..count {
        let limits = reader.limits()?;
        if i == 0 {
            module.memory = Some(limits);
        }
    }
    Ok(())
}

fn parse_global_section(reader: &mut Reader, module: &mut DecodedModule) -> Result<(), DecodeError> {
    let count = reader.u32()?;
    for _ in 0..count {
        let value_type = reader.value_type()?;
        let mutable = reader.byte()? != 0;
        reader.skip_init_expr()?;
        module.globals.push(GlobalType { value_type, mutable });
    }
    Ok(())
}

fn parse_export_section(reader: &mut Reader, module: &mut DecodedModule) -> Result<(), DecodeError> {
    let count = reader.u32()?;
    for _ in 0..count {
        let name = reader.name()?;
        let kind_tag = reader.byte()?;
        let kind = match kind_tag {
            0 => ExternalKind::Function,
            1 => ExternalKind::Table,
            2 => ExternalKind::Memory,
            3 => ExternalKind::Global,
            other => return Err(reader.err_at(DecodeErrorKind::InvalidExternalKind(other))),
        };
        let index = reader.u32()?;
        if module.exports.contains_key(&name) {
            return Err(reader.err_at(DecodeErrorKind::DuplicateExport(name)));
        }
        module.exports.insert(name.clone(), Export { name, kind, index });
    }
    Ok(())
}

/// Parses the element section enough to skip it cleanly; segment contents
/// are never applied to a table; element initialization is out of scope.
fn parse_element_section(reader: &mut Reader) -> Result<(), DecodeError> {
    let count = reader.u32()?;
    for _ in 0..count {
        reader.u32()?; // table index, always 0 in the Wasm 1.0 encoding.
        reader.skip_init_expr()?;
        let func_count = reader.u32()?;
        for _ in 0..func_count {
            reader.u32()?;
        }
    }
    Ok(())
}

fn parse_code_section(reader: &mut Reader, module: &mut DecodedModule) -> Result<(), DecodeError> {
    let count = reader.u32()?;
    module.functions.reserve(count as usize);
    for i in 0..count {
        let body_size = reader.u32()? as usize;
        let body_start = reader.offset;
        let body = reader.bytes(body_size)?.to_vec();
        debug_assert_eq!(reader.offset, body_start + body_size);
        let type_index = module.func_type_indices.get(i as usize).copied().unwrap_or(0);
        module.functions.push(RawFunction { type_index, body });
    }
    Ok(())
}

/// Parses the data section enough to skip it cleanly; segment contents are
/// never applied to memory; data initialization is out of scope.
fn parse_data_section(reader: &mut Reader) -> Result<(), DecodeError> {
    let count = reader.u32()?;
    for _ in 0..count {
        reader.u32()?; // memory index, always 0 in the Wasm 1.0 encoding.
        reader.skip_init_expr()?;
        let byte_count = reader.u32()? as usize;
        reader.bytes(byte_count)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_module() -> Vec<u8> {
        vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]
    }

    #[test]
    fn empty_module_decodes() {
        let module = decode(&minimal_module()).unwrap();
        assert!(module.types.is_empty());
        assert!(module.functions.is_empty());
    }

    #[test]
    fn bad_magic_fails() {
        let mut bytes = minimal_module();
        bytes[0] = 0xff;
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidMagic);
        assert_eq!(err.section, None);
    }

    #[test]
    fn unknown_section_id_fails() {
        let mut bytes = minimal_module();
        bytes.extend_from_slice(&[0x0D, 0x00]); // id 13, empty payload
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnknownSectionId(13));
    }

    #[test]
    fn duplicate_section_fails() {
        let mut bytes = minimal_module();
        // Two empty type sections.
        bytes.extend_from_slice(&[0x01, 0x01, 0x00]);
        bytes.extend_from_slice(&[0x01, 0x01, 0x00]);
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::DuplicateSection(1));
    }

    #[test]
    fn duplicate_import_fails() {
        let mut bytes = minimal_module();
        // import section: two identical ("a", "b") function imports.
        let mut payload = vec![0x02u8];
        for _ in 0..2 {
            payload.extend_from_slice(&[0x01, b'a', 0x01, b'b', 0x00, 0x00]);
        }
        bytes.push(0x02);
        bytes.push(payload.len() as u8);
        bytes.extend_from_slice(&payload);

        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::DuplicateImport("a".to_string(), "b".to_string()));
    }

    #[test]
    fn type_section_with_too_many_results_fails() {
        let mut bytes = minimal_module();
        // type section: count=1, form=0x60, params=0, results=2
        bytes.extend_from_slice(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x02]);
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::TooManyResults);
    }

    #[test]
    fn decodes_add_function_signature_and_body() {
        // (func (param i32 i32) (result i32) local.get 0 local.get 1 i32.add)
        let mut bytes = minimal_module();
        // type section
        bytes.extend_from_slice(&[0x01, 0x07, 0x01, 0x60, 0x02, 0x7F, 0x7F, 0x01, 0x7F]);
        // function section
        bytes.extend_from_slice(&[0x03, 0x02, 0x01, 0x00]);
        // export section: export "add" as function 0
        bytes.extend_from_slice(&[0x07, 0x07, 0x01, 0x03, b'a', b'd', b'd', 0x00, 0x00]);
        // code section
        let body = vec![0x00, 0x20, 0x00, 0x20, 0x01, 0x6A, 0x0B];
        let mut code_section = vec![0x01];
        code_section.push(body.len() as u8);
        code_section.extend_from_slice(&body);
        bytes.push(0x0A);
        bytes.push(code_section.len() as u8);
        bytes.extend_from_slice(&code_section);

        let module = decode(&bytes).unwrap();
        assert_eq!(module.types.len(), 1);
        assert_eq!(module.functions.len(), 1);
        assert_eq!(module.functions[0].type_index, 0);
        assert_eq!(module.exports.get("add").unwrap().index, 0);
    }

    fn nullary_function_module(export_name: Option<&str>, with_start: bool) -> Vec<u8> {
        // (func (nop))
        let mut bytes = minimal_module();
        // type section: one signature, no params, no results
        bytes.extend_from_slice(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
        // function section
        bytes.extend_from_slice(&[0x03, 0x02, 0x01, 0x00]);
        if let Some(name) = export_name {
            let mut payload = vec![0x01u8, name.len() as u8];
            payload.extend_from_slice(name.as_bytes());
            payload.push(0x00); // function export
            payload.push(0x00); // function index 0
            bytes.push(0x07);
            bytes.push(payload.len() as u8);
            bytes.extend_from_slice(&payload);
        }
        if with_start {
            bytes.extend_from_slice(&[0x08, 0x01, 0x00]); // start: function index 0
        }
        // code section
        let body = vec![0x01, 0x0B];
        let mut code_section = vec![0x01];
        code_section.push(body.len() as u8);
        code_section.extend_from_slice(&body);
        bytes.push(0x0A);
        bytes.push(code_section.len() as u8);
        bytes.extend_from_slice(&code_section);
        bytes
    }

    #[test]
    fn start_function_resolves_to_its_export_name() {
        let bytes = nullary_function_module(Some("run"), true);
        let module = decode(&bytes).unwrap();
        assert_eq!(module.start, Some("run".to_string()));
    }

    #[test]
    fn start_function_not_exported_resolves_to_none() {
        let bytes = nullary_function_module(None, true);
        let module = decode(&bytes).unwrap();
        assert_eq!(module.start, None);
    }
}
