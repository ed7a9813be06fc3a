//! Guest linear memory access
//!
//! All accesses are little-endian and bounds-checked against the size of the
//! memory at the time of the call. A view must never outlive the syscall it
//! was created for: the guest may grow its memory between calls, which
//! detaches the previous buffer.

use super::error::{ShimError, ShimResult};
use std::borrow::Cow;
use std::ops::Range;

#[cfg(target_arch = "wasm32")]
use js_sys::{Uint8Array, WebAssembly};

/// Typed accessor over a guest's linear memory
pub trait GuestMemory {
    /// Current memory size in bytes
    fn size(&self) -> u32;

    /// Read a little-endian u32 at `offset`
    fn read_u32(&self, offset: u32) -> ShimResult<u32>;

    /// Write a little-endian u32 at `offset`
    fn write_u32(&mut self, offset: u32, value: u32) -> ShimResult<()>;

    /// Read-only view of `len` bytes at `offset`
    fn slice_bytes(&self, offset: u32, len: u32) -> ShimResult<Cow<'_, [u8]>>;
}

/// Validate `offset..offset + len` against a memory of `memory_size` bytes
pub fn check_bounds(offset: u32, len: u32, memory_size: u32) -> ShimResult<Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= memory_size => Ok(offset as usize..end as usize),
        _ => Err(ShimError::MemoryAccessOutOfBounds {
            address: offset,
            size: len,
            memory_size,
        }),
    }
}

impl GuestMemory for [u8] {
    fn size(&self) -> u32 {
        u32::try_from(self.len()).unwrap_or(u32::MAX)
    }

    fn read_u32(&self, offset: u32) -> ShimResult<u32> {
        let range = check_bounds(offset, 4, self.size())?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self[range]);
        Ok(u32::from_le_bytes(word))
    }

    fn write_u32(&mut self, offset: u32, value: u32) -> ShimResult<()> {
        let range = check_bounds(offset, 4, self.size())?;
        self[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn slice_bytes(&self, offset: u32, len: u32) -> ShimResult<Cow<'_, [u8]>> {
        let range = check_bounds(offset, len, self.size())?;
        Ok(Cow::Borrowed(&self[range]))
    }
}

impl GuestMemory for Vec<u8> {
    fn size(&self) -> u32 {
        self.as_slice().size()
    }

    fn read_u32(&self, offset: u32) -> ShimResult<u32> {
        self.as_slice().read_u32(offset)
    }

    fn write_u32(&mut self, offset: u32, value: u32) -> ShimResult<()> {
        self.as_mut_slice().write_u32(offset, value)
    }

    fn slice_bytes(&self, offset: u32, len: u32) -> ShimResult<Cow<'_, [u8]>> {
        self.as_slice().slice_bytes(offset, len)
    }
}

/// View over a `WebAssembly.Memory` owned by the guest instance
///
/// Built from `memory.buffer()` at construction, so one must be created per
/// syscall. The guest's bytes live outside the host's own linear memory, so
/// `slice_bytes` has to copy them across.
#[cfg(target_arch = "wasm32")]
pub struct JsMemoryView {
    bytes: Uint8Array,
}

#[cfg(target_arch = "wasm32")]
impl JsMemoryView {
    pub fn new(memory: &WebAssembly::Memory) -> Self {
        Self {
            bytes: Uint8Array::new(&memory.buffer()),
        }
    }

    fn subarray(&self, range: Range<usize>) -> Uint8Array {
        self.bytes.subarray(range.start as u32, range.end as u32)
    }
}

#[cfg(target_arch = "wasm32")]
impl GuestMemory for JsMemoryView {
    fn size(&self) -> u32 {
        self.bytes.length()
    }

    fn read_u32(&self, offset: u32) -> ShimResult<u32> {
        let range = check_bounds(offset, 4, self.size())?;
        let mut word = [0u8; 4];
        self.subarray(range).copy_to(&mut word);
        Ok(u32::from_le_bytes(word))
    }

    fn write_u32(&mut self, offset: u32, value: u32) -> ShimResult<()> {
        let range = check_bounds(offset, 4, self.size())?;
        self.subarray(range).copy_from(&value.to_le_bytes());
        Ok(())
    }

    fn slice_bytes(&self, offset: u32, len: u32) -> ShimResult<Cow<'_, [u8]>> {
        let range = check_bounds(offset, len, self.size())?;
        Ok(Cow::Owned(self.subarray(range).to_vec()))
    }
}
