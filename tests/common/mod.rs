//! Hand-assembled guest modules for tests
//!
//! Every guest has the same shape: a fixed type table, function imports,
//! one page of memory, one entry function with no locals and optional data
//! segments.

#![allow(dead_code)]

use wasi_shim::shim::{IMPORT_NAMESPACE, syscalls};

/// Type indices in the fixed type table
const TYPE_FD_WRITE: u8 = 0; // (i32, i32, i32, i32) -> i32
const TYPE_PROC_EXIT: u8 = 1; // (i32) -> ()
const TYPE_VOID: u8 = 2; // () -> ()

pub const PAGE_SIZE: usize = 65536;

fn push_leb128(bytes: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            bytes.push(byte);
            break;
        } else {
            bytes.push(byte | 0x80);
        }
    }
}

fn push_sleb128(bytes: &mut Vec<u8>, mut value: i64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            bytes.push(byte);
            break;
        } else {
            bytes.push(byte | 0x80);
        }
    }
}

fn push_name(bytes: &mut Vec<u8>, name: &str) {
    push_leb128(bytes, name.len() as u32);
    bytes.extend_from_slice(name.as_bytes());
}

/// Builder for guest modules
#[derive(Debug, Clone)]
pub struct GuestBuilder {
    imports: Vec<(String, String)>,
    memory_export: Option<String>,
    entry_export: Option<String>,
    raw_exports: Vec<(String, u8, u32)>,
    data: Vec<(u32, Vec<u8>)>,
    code: Vec<u8>,
}

impl GuestBuilder {
    /// A guest with no imports exporting `memory` and `_start`
    pub fn new() -> Self {
        Self {
            imports: Vec::new(),
            memory_export: Some("memory".to_string()),
            entry_export: Some("_start".to_string()),
            raw_exports: Vec::new(),
            data: Vec::new(),
            code: Vec::new(),
        }
    }

    /// A guest importing both shim syscalls
    pub fn wasi() -> Self {
        Self::new()
            .import(IMPORT_NAMESPACE, syscalls::FD_WRITE)
            .import(IMPORT_NAMESPACE, syscalls::PROC_EXIT)
    }

    pub fn import(mut self, module: &str, name: &str) -> Self {
        self.imports.push((module.to_string(), name.to_string()));
        self
    }

    pub fn memory_export(mut self, name: Option<&str>) -> Self {
        self.memory_export = name.map(str::to_string);
        self
    }

    pub fn entry_export(mut self, name: Option<&str>) -> Self {
        self.entry_export = name.map(str::to_string);
        self
    }

    /// Extra export entry, written verbatim
    pub fn raw_export(mut self, name: &str, kind: u8, index: u32) -> Self {
        self.raw_exports.push((name.to_string(), kind, index));
        self
    }

    pub fn data(mut self, offset: u32, bytes: &[u8]) -> Self {
        self.data.push((offset, bytes.to_vec()));
        self
    }

    /// Lay out `(ptr, len)` descriptors at `base`
    pub fn iovecs(self, base: u32, list: &[(u32, u32)]) -> Self {
        let mut bytes = Vec::with_capacity(list.len() * 8);
        for (ptr, len) in list {
            bytes.extend_from_slice(&ptr.to_le_bytes());
            bytes.extend_from_slice(&len.to_le_bytes());
        }
        self.data(base, &bytes)
    }

    fn import_index(&self, name: &str) -> u32 {
        self.imports
            .iter()
            .position(|(m, n)| m == IMPORT_NAMESPACE && n == name)
            .unwrap_or_else(|| panic!("guest does not import {}", name)) as u32
    }

    fn i32_const(&mut self, value: i32) {
        self.code.push(0x41);
        push_sleb128(&mut self.code, value as i64);
    }

    fn call(&mut self, index: u32) {
        self.code.push(0x10);
        push_leb128(&mut self.code, index);
    }

    /// `fd_write(fd, iovs, count, retptr)`, storing the errno at `errno_at`
    pub fn call_fd_write(
        mut self,
        fd: i32,
        iovs: u32,
        count: u32,
        retptr: u32,
        errno_at: u32,
    ) -> Self {
        let index = self.import_index(syscalls::FD_WRITE);
        self.i32_const(errno_at as i32);
        self.i32_const(fd);
        self.i32_const(iovs as i32);
        self.i32_const(count as i32);
        self.i32_const(retptr as i32);
        self.call(index);
        // i32.store align=2 offset=0
        self.code.extend_from_slice(&[0x36, 0x02, 0x00]);
        self
    }

    /// `memory.grow(pages)`, discarding the previous size
    pub fn call_memory_grow(mut self, pages: u32) -> Self {
        self.i32_const(pages as i32);
        self.code.extend_from_slice(&[0x40, 0x00]);
        self.code.push(0x1A); // drop
        self
    }

    /// `i32.store` of `value` at `addr`
    pub fn call_store_u32(mut self, addr: u32, value: u32) -> Self {
        self.i32_const(addr as i32);
        self.i32_const(value as i32);
        self.code.extend_from_slice(&[0x36, 0x02, 0x00]);
        self
    }

    pub fn call_proc_exit(mut self, code: i32) -> Self {
        let index = self.import_index(syscalls::PROC_EXIT);
        self.i32_const(code);
        self.call(index);
        self
    }

    fn section(bytes: &mut Vec<u8>, id: u8, content: &[u8]) {
        bytes.push(id);
        push_leb128(bytes, content.len() as u32);
        bytes.extend_from_slice(content);
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = vec![
            0x00, 0x61, 0x73, 0x6D, // magic: \0asm
            0x01, 0x00, 0x00, 0x00, // version: 1
        ];

        #[rustfmt::skip]
        let types = [
            0x03,
            0x60, 0x04, 0x7F, 0x7F, 0x7F, 0x7F, 0x01, 0x7F,
            0x60, 0x01, 0x7F, 0x00,
            0x60, 0x00, 0x00,
        ];
        Self::section(&mut bytes, 0x01, &types);

        if !self.imports.is_empty() {
            let mut content = Vec::new();
            push_leb128(&mut content, self.imports.len() as u32);
            for (module, name) in &self.imports {
                push_name(&mut content, module);
                push_name(&mut content, name);
                content.push(0x00); // kind = func
                content.push(match (module.as_str(), name.as_str()) {
                    (IMPORT_NAMESPACE, syscalls::FD_WRITE) => TYPE_FD_WRITE,
                    (IMPORT_NAMESPACE, syscalls::PROC_EXIT) => TYPE_PROC_EXIT,
                    _ => TYPE_VOID,
                });
            }
            Self::section(&mut bytes, 0x02, &content);
        }

        // 1 function of type () -> ()
        Self::section(&mut bytes, 0x03, &[0x01, TYPE_VOID]);

        // 1 memory, no max, 1 page min
        Self::section(&mut bytes, 0x05, &[0x01, 0x00, 0x01]);

        let entry_index = self.imports.len() as u32;
        let mut exports: Vec<(String, u8, u32)> = Vec::new();
        if let Some(name) = &self.memory_export {
            exports.push((name.clone(), 0x02, 0));
        }
        if let Some(name) = &self.entry_export {
            exports.push((name.clone(), 0x00, entry_index));
        }
        exports.extend(self.raw_exports.iter().cloned());

        let mut content = Vec::new();
        push_leb128(&mut content, exports.len() as u32);
        for (name, kind, index) in &exports {
            push_name(&mut content, name);
            content.push(*kind);
            push_leb128(&mut content, *index);
        }
        Self::section(&mut bytes, 0x07, &content);

        let mut body = vec![0x00]; // no locals
        body.extend_from_slice(&self.code);
        body.push(0x0B); // end
        let mut content = vec![0x01];
        push_leb128(&mut content, body.len() as u32);
        content.extend_from_slice(&body);
        Self::section(&mut bytes, 0x0A, &content);

        if !self.data.is_empty() {
            let mut content = Vec::new();
            push_leb128(&mut content, self.data.len() as u32);
            for (offset, data) in &self.data {
                content.push(0x00); // active, memory 0
                content.push(0x41); // i32.const
                push_sleb128(&mut content, *offset as i64);
                content.push(0x0B); // end
                push_leb128(&mut content, data.len() as u32);
                content.extend_from_slice(data);
            }
            Self::section(&mut bytes, 0x0B, &content);
        }

        bytes
    }

    /// The guest's initial linear memory: one zeroed page plus data segments
    pub fn memory_image(&self) -> Vec<u8> {
        let mut memory = vec![0u8; PAGE_SIZE];
        for (offset, data) in &self.data {
            let start = *offset as usize;
            memory[start..start + data.len()].copy_from_slice(data);
        }
        memory
    }
}

impl Default for GuestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
