//! Error types for the shim
//!
//! These are host-level failures. Conditions the guest is expected to handle
//! are reported to it as [`Errno`](super::abi::Errno) values instead.

use std::fmt;

/// Result type for shim operations
pub type ShimResult<T> = Result<T, ShimError>;

/// Errors that stop the host from loading or running a guest module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShimError {
    /// Module binary is malformed or invalid
    InvalidModule {
        reason: String,
    },

    /// Required export is missing
    MissingExport {
        name: String,
    },

    /// Export has wrong type
    WrongExportType {
        name: String,
        expected: &'static str,
        got: String,
    },

    /// Guest imports something the shim does not provide
    UnsupportedImport {
        module: String,
        name: String,
    },

    /// Guest-supplied pointer/length falls outside linear memory
    MemoryAccessOutOfBounds {
        address: u32,
        size: u32,
        memory_size: u32,
    },

    /// A syscall arrived before the memory export was captured
    MemoryUnavailable,

    /// Module compilation or instantiation failed
    InstantiationFailed {
        reason: String,
    },

    /// Guest execution trapped or threw
    Aborted {
        reason: String,
    },

    /// Module bytes could not be fetched
    Fetch {
        url: String,
        reason: String,
    },

    /// Configuration could not be parsed
    Config {
        reason: String,
    },
}

impl fmt::Display for ShimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidModule { reason } => {
                write!(f, "invalid WASM module: {}", reason)
            }
            Self::MissingExport { name } => {
                write!(f, "missing required export: '{}'", name)
            }
            Self::WrongExportType {
                name,
                expected,
                got,
            } => {
                write!(
                    f,
                    "export '{}' has wrong type: expected {}, got {}",
                    name, expected, got
                )
            }
            Self::UnsupportedImport { module, name } => {
                write!(f, "unsupported import: '{}'.'{}'", module, name)
            }
            Self::MemoryAccessOutOfBounds {
                address,
                size,
                memory_size,
            } => {
                write!(
                    f,
                    "memory access out of bounds: address {} + size {} > memory size {}",
                    address, size, memory_size
                )
            }
            Self::MemoryUnavailable => {
                write!(f, "guest memory is not available yet")
            }
            Self::InstantiationFailed { reason } => {
                write!(f, "module instantiation failed: {}", reason)
            }
            Self::Aborted { reason } => {
                write!(f, "guest aborted: {}", reason)
            }
            Self::Fetch { url, reason } => {
                write!(f, "failed to fetch '{}': {}", url, reason)
            }
            Self::Config { reason } => {
                write!(f, "invalid configuration: {}", reason)
            }
        }
    }
}

impl std::error::Error for ShimError {}
