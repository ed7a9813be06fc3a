//! WASI preview1 ABI types and constants
//!
//! Only the slice of the ABI this shim implements lives here.

use super::error::{ShimError, ShimResult};
use super::memory::GuestMemory;

/// Import module namespace
pub const IMPORT_NAMESPACE: &str = "wasi_snapshot_preview1";

/// Syscall function names (imported by the guest)
pub mod syscalls {
    pub const FD_WRITE: &str = "fd_write";
    pub const PROC_EXIT: &str = "proc_exit";

    /// Every function the shim provides under the import namespace
    pub const ALL: [&str; 2] = [FD_WRITE, PROC_EXIT];
}

/// Default export names
pub mod exports {
    /// The linear memory export name
    pub const MEMORY: &str = "memory";
    /// The command entry point
    pub const START: &str = "_start";
}

/// Standard file descriptors
pub mod fd {
    pub const STDIN: i32 = 0;
    pub const STDOUT: i32 = 1;
    pub const STDERR: i32 = 2;
}

/// Status codes returned to the guest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Errno {
    /// No error occurred
    Success = 0,
    /// Bad file descriptor
    Badf = 8,
}

impl Errno {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// Output stream a descriptor refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    /// Map a guest descriptor to a writable stream, if it is one
    pub fn from_fd(fd: i32) -> Option<Self> {
        match fd {
            fd::STDOUT => Some(Self::Stdout),
            fd::STDERR => Some(Self::Stderr),
            _ => None,
        }
    }
}

/// A `ciovec` record: (pointer, length), both little-endian u32
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoVec {
    /// Byte offset into linear memory
    pub ptr: u32,
    /// Byte count
    pub len: u32,
}

impl IoVec {
    pub const SIZE: u32 = 8;

    /// Decode the `index`th descriptor of the list based at `base`
    pub fn read_at<M: GuestMemory + ?Sized>(
        memory: &M,
        base: u32,
        index: u32,
    ) -> ShimResult<Self> {
        let addr = index
            .checked_mul(Self::SIZE)
            .and_then(|off| base.checked_add(off))
            .filter(|addr| addr.checked_add(Self::SIZE).is_some())
            .ok_or_else(|| ShimError::MemoryAccessOutOfBounds {
                address: base.wrapping_add(index.wrapping_mul(Self::SIZE)),
                size: Self::SIZE,
                memory_size: memory.size(),
            })?;

        Ok(Self {
            ptr: memory.read_u32(addr)?,
            len: memory.read_u32(addr + 4)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iovec_read_at() {
        let mut mem = vec![0u8; 32];
        mem.write_u32(16, 0x400).unwrap();
        mem.write_u32(20, 5).unwrap();

        let iov = IoVec::read_at(&mem, 8, 1).unwrap();
        assert_eq!(iov, IoVec { ptr: 0x400, len: 5 });
        assert!(!iov.is_empty());
    }

    #[test]
    fn test_iovec_overflow_reports_descriptor_address() {
        let mem = vec![0u8; 32];

        // 0xFFFF_FFF0 + 8 * 1 fits, but its 8 bytes run past u32::MAX
        let err = IoVec::read_at(&mem, 0xFFFF_FFF0, 1).unwrap_err();
        assert_eq!(
            err,
            ShimError::MemoryAccessOutOfBounds {
                address: 0xFFFF_FFF8,
                size: IoVec::SIZE,
                memory_size: 32,
            }
        );

        // index * 8 itself overflows
        let err = IoVec::read_at(&mem, 0x10, 0x2000_0001).unwrap_err();
        assert!(matches!(
            err,
            ShimError::MemoryAccessOutOfBounds { address: 0x18, .. }
        ));
    }

    #[test]
    fn test_stream_from_fd() {
        assert_eq!(Stream::from_fd(fd::STDOUT), Some(Stream::Stdout));
        assert_eq!(Stream::from_fd(fd::STDERR), Some(Stream::Stderr));
        assert_eq!(Stream::from_fd(fd::STDIN), None);
        assert_eq!(Stream::from_fd(-1), None);
    }
}
