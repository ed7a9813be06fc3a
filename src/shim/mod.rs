//! WASI Command Shim
//!
//! Hosts a single WASI command module that only needs to print and exit.
//!
//! # Import namespace
//!
//! The guest links against `wasi_snapshot_preview1` and may import only:
//!
//! ```text
//! fd_write(fd: i32, iovs_ptr: i32, iovs_len: i32, retptr: i32) -> i32
//!   Writes each (ptr, len) vector in order to fd 1 (stdout) or 2 (stderr).
//!   Every non-empty vector becomes one console line, decoded as UTF-8 with
//!   invalid sequences replaced by U+FFFD. The total byte count is stored at
//!   retptr. Any other fd returns 8 (badf) and leaves retptr untouched.
//!
//! proc_exit(code: i32)
//!   Accepted and ignored. The guest is NOT stopped; it keeps running and
//!   normally returns from its entry point right after the call.
//! ```
//!
//! ## I/O vector layout
//!
//! ```text
//! iovs_ptr + 8*i + 0: ptr (u32, little-endian)
//! iovs_ptr + 8*i + 4: len (u32, little-endian)
//! ```
//!
//! ## Required exports
//!
//! | Export   | Type     | Description                  |
//! |----------|----------|------------------------------|
//! | `memory` | Memory   | Linear memory the calls read |
//! | `_start` | `() -> *`| Entry point, result ignored  |
//!
//! Both names are configurable, see [`ShimConfig`].
//!
//! # Memory safety
//!
//! Every guest pointer is bounds-checked against the memory size at the time
//! of the call. A failed check is host-fatal: it is thrown back into the
//! engine, which traps the guest. The memory buffer is re-read on every call
//! because growth detaches the old one.

mod abi;
mod config;
mod console;
mod error;
mod executor;
mod fetch;
mod loader;
mod memory;
mod trampoline;

pub use abi::*;
pub use config::*;
pub use console::*;
pub use error::*;
#[cfg(target_arch = "wasm32")]
pub use executor::*;
#[cfg(target_arch = "wasm32")]
pub use fetch::*;
pub use loader::*;
pub use memory::*;
pub use trampoline::*;
