//! WASM Module Loader
//!
//! Checks a guest module against what the shim can satisfy before handing it
//! to the engine, so a missing import or export is reported by name instead
//! of as an opaque `LinkError`.

use super::abi::{IMPORT_NAMESPACE, syscalls};
use super::error::{ShimError, ShimResult};

/// WASM magic number: \0asm
const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];

/// WASM version 1
const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

const SECTION_IMPORT: u8 = 2;
const SECTION_EXPORT: u8 = 7;

/// Kind of an import or export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternKind {
    Func,
    Table,
    Memory,
    Global,
    Tag,
}

impl ExternKind {
    fn from_byte(byte: u8) -> ShimResult<Self> {
        match byte {
            0 => Ok(Self::Func),
            1 => Ok(Self::Table),
            2 => Ok(Self::Memory),
            3 => Ok(Self::Global),
            4 => Ok(Self::Tag),
            other => Err(invalid(format!("unknown external kind {:#x}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Func => "Function",
            Self::Table => "Table",
            Self::Memory => "Memory",
            Self::Global => "Global",
            Self::Tag => "Tag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub kind: ExternKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub kind: ExternKind,
    pub index: u32,
}

/// Imports and exports decoded from a module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleInfo {
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
}

impl ModuleInfo {
    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|e| e.name == name)
    }
}

/// Validates guest modules against the shim's import table
pub struct ModuleValidator;

impl ModuleValidator {
    /// Validate a WASM module binary
    ///
    /// Checks:
    /// - Valid WASM magic number and version
    /// - Every import is a function the shim provides
    /// - `memory_export` is an exported memory and `entry` an exported function
    pub fn validate(bytes: &[u8], memory_export: &str, entry: &str) -> ShimResult<ModuleInfo> {
        let info = Self::parse(bytes)?;

        for import in &info.imports {
            let provided = import.module == IMPORT_NAMESPACE
                && import.kind == ExternKind::Func
                && syscalls::ALL.contains(&import.name.as_str());
            if !provided {
                return Err(ShimError::UnsupportedImport {
                    module: import.module.clone(),
                    name: import.name.clone(),
                });
            }
        }

        require_export(&info, memory_export, ExternKind::Memory)?;
        require_export(&info, entry, ExternKind::Func)?;

        Ok(info)
    }

    /// Decode the import and export sections without checking them
    pub fn parse(bytes: &[u8]) -> ShimResult<ModuleInfo> {
        // Check minimum size (magic + version)
        if bytes.len() < 8 {
            return Err(invalid("module too small"));
        }
        if bytes[0..4] != WASM_MAGIC {
            return Err(invalid("invalid magic number"));
        }
        if bytes[4..8] != WASM_VERSION {
            return Err(invalid("unsupported WASM version"));
        }

        let mut info = ModuleInfo::default();
        let mut reader = Reader::new(&bytes[8..]);

        while !reader.is_empty() {
            let section_id = reader.byte()?;
            let size = reader.u32()? as usize;
            let section = reader
                .take(size)
                .map_err(|_| invalid("section extends past end of module"))?;

            match section_id {
                SECTION_IMPORT => info.imports = parse_import_section(section)?,
                SECTION_EXPORT => info.exports = parse_export_section(section)?,
                _ => {}
            }
        }

        Ok(info)
    }
}

fn require_export(info: &ModuleInfo, name: &str, kind: ExternKind) -> ShimResult<()> {
    match info.export(name) {
        None => Err(ShimError::MissingExport {
            name: name.to_string(),
        }),
        Some(export) if export.kind != kind => Err(ShimError::WrongExportType {
            name: name.to_string(),
            expected: kind.as_str(),
            got: export.kind.as_str().to_string(),
        }),
        Some(_) => Ok(()),
    }
}

fn invalid(reason: impl Into<String>) -> ShimError {
    ShimError::InvalidModule {
        reason: reason.into(),
    }
}

/// Parse import section entries
fn parse_import_section(data: &[u8]) -> ShimResult<Vec<Import>> {
    let mut reader = Reader::new(data);
    let count = reader.u32()?;
    let mut imports = Vec::new();

    for _ in 0..count {
        let module = reader.name()?;
        let name = reader.name()?;
        let kind = ExternKind::from_byte(reader.byte()?)?;

        // Skip the type descriptor
        match kind {
            ExternKind::Func => {
                reader.u32()?;
            }
            ExternKind::Table => {
                reader.byte()?; // reftype
                reader.limits()?;
            }
            ExternKind::Memory => reader.limits()?,
            ExternKind::Global => {
                reader.byte()?; // valtype
                reader.byte()?; // mutability
            }
            ExternKind::Tag => {
                reader.byte()?; // attribute
                reader.u32()?;
            }
        }

        imports.push(Import { module, name, kind });
    }

    Ok(imports)
}

/// Parse export section entries
fn parse_export_section(data: &[u8]) -> ShimResult<Vec<Export>> {
    let mut reader = Reader::new(data);
    let count = reader.u32()?;
    let mut exports = Vec::new();

    for _ in 0..count {
        let name = reader.name()?;
        let kind = ExternKind::from_byte(reader.byte()?)?;
        let index = reader.u32()?;
        exports.push(Export { name, kind, index });
    }

    Ok(exports)
}

/// Read an unsigned LEB128 value of at most `max_bytes` bytes
fn read_leb128(bytes: &[u8], max_bytes: usize) -> ShimResult<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (i, &byte) in bytes.iter().take(max_bytes).enumerate() {
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
        shift += 7;
    }

    Err(invalid("invalid LEB128"))
}

/// Forward-only cursor over section bytes
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    fn byte(&mut self) -> ShimResult<u8> {
        let byte = *self
            .data
            .get(self.offset)
            .ok_or_else(|| invalid("unexpected end of section"))?;
        self.offset += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> ShimResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| invalid("unexpected end of section"))?;
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn leb128(&mut self, max_bytes: usize) -> ShimResult<u64> {
        let (value, len) = read_leb128(&self.data[self.offset..], max_bytes)?;
        self.offset += len;
        Ok(value)
    }

    fn u32(&mut self) -> ShimResult<u32> {
        u32::try_from(self.leb128(5)?).map_err(|_| invalid("LEB128 value exceeds u32"))
    }

    fn name(&mut self) -> ShimResult<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| invalid("name is not valid UTF-8"))
    }

    /// Skip table/memory limits (memory64 bounds may take up to 10 bytes)
    fn limits(&mut self) -> ShimResult<()> {
        let flags = self.byte()?;
        self.leb128(10)?;
        if flags & 0x01 != 0 {
            self.leb128(10)?;
        }
        Ok(())
    }
}
