//! Syscall trampoline
//!
//! Host side of the two WASI calls the guest links against. Arguments arrive
//! as raw i32 values (addresses and lengths into guest memory); results are
//! encoded back into that memory and reported as an [`Errno`].

use super::abi::{Errno, IoVec, Stream};
use super::console::ConsoleSink;
use super::error::ShimResult;
use super::memory::GuestMemory;

/// Host implementations of `fd_write` and `proc_exit`
pub struct Trampoline<S: ConsoleSink> {
    console: S,
    /// Last code passed to `proc_exit`
    exit_code: Option<i32>,
    /// Log syscall diagnostics to the host console
    trace: bool,
}

impl<S: ConsoleSink> Trampoline<S> {
    pub fn new(console: S) -> Self {
        Self {
            console,
            exit_code: None,
            trace: false,
        }
    }

    /// Enable or disable syscall diagnostics
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn trace(&self) -> bool {
        self.trace
    }

    pub fn console(&self) -> &S {
        &self.console
    }

    /// Code from the most recent `proc_exit` call, if any
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// `fd_write(fd, iovs_ptr, iovs_len, retptr) -> errno`
    ///
    /// Emits one console line per non-empty vector, in list order, and
    /// stores the total byte count at `retptr`. Empty vectors are skipped
    /// without touching the bytes they point at. Any fd other than stdout or
    /// stderr stops the call at the first non-empty vector with
    /// [`Errno::Badf`] and leaves `retptr` unwritten.
    ///
    /// # Errors
    ///
    /// Out-of-bounds descriptors, data or `retptr` are host-fatal and
    /// returned as `Err`; nothing is written in that case either.
    pub fn fd_write<M: GuestMemory + ?Sized>(
        &mut self,
        memory: &mut M,
        fd: i32,
        iovs_ptr: i32,
        iovs_len: i32,
        retptr: i32,
    ) -> ShimResult<Errno> {
        let base = iovs_ptr as u32;
        let mut written = 0u32;

        for index in 0..iovs_len as u32 {
            let iov = IoVec::read_at(memory, base, index)?;
            if iov.is_empty() {
                continue;
            }

            let Some(stream) = Stream::from_fd(fd) else {
                if self.trace {
                    console_log!("[wasi] fd_write: unsupported fd {}", fd);
                }
                return Ok(Errno::Badf);
            };

            let bytes = memory.slice_bytes(iov.ptr, iov.len)?;
            self.console.emit(stream, &String::from_utf8_lossy(&bytes));
            written = written.wrapping_add(iov.len);
        }

        memory.write_u32(retptr as u32, written)?;
        Ok(Errno::Success)
    }

    /// `proc_exit(code)`
    ///
    /// Does not stop the guest: control returns to it and it keeps running
    /// (usually straight back out of its entry point). The code is only
    /// remembered for reporting, and logged when tracing is on.
    pub fn proc_exit(&mut self, code: i32) {
        if self.trace {
            console_log!("[wasi] proc_exit({}) ignored, guest continues", code);
        }
        self.exit_code = Some(code);
    }
}
