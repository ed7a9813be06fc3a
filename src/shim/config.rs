//! Runtime configuration
//!
//! Supplied by the embedding page as a JSON object. Every field is optional:
//!
//! ```json
//! {
//!   "module_url": "client.wasm",
//!   "entry": "_start",
//!   "memory_export": "memory",
//!   "validate": true,
//!   "log_instance": true,
//!   "trace_syscalls": false
//! }
//! ```

use super::abi::exports;
use super::error::{ShimError, ShimResult};
use serde::Deserialize;

/// Default location of the guest module, relative to the page
pub const DEFAULT_MODULE_URL: &str = "client.wasm";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShimConfig {
    /// Where to fetch the guest module from
    pub module_url: String,
    /// Exported function invoked after instantiation
    pub entry: String,
    /// Exported memory the syscalls read from
    pub memory_export: String,
    /// Check imports/exports before handing the module to the engine
    pub validate: bool,
    /// Log the instance object once instantiated
    pub log_instance: bool,
    /// Log syscall diagnostics (`proc_exit`, rejected fds)
    pub trace_syscalls: bool,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            module_url: DEFAULT_MODULE_URL.to_string(),
            entry: exports::START.to_string(),
            memory_export: exports::MEMORY.to_string(),
            validate: true,
            log_instance: true,
            trace_syscalls: false,
        }
    }
}

impl ShimConfig {
    /// Parse a config from JSON; `None` or a blank string yields the defaults
    pub fn from_json(json: Option<&str>) -> ShimResult<Self> {
        match json.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(json) => serde_json::from_str(json).map_err(|e| ShimError::Config {
                reason: e.to_string(),
            }),
        }
    }
}
