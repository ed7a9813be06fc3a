//! wasi-shim - run a WASI command module in the browser
//!
//! Loads one guest module, satisfies the two `wasi_snapshot_preview1` calls
//! it needs to print and exit, and invokes its `_start`. Guest output goes to
//! the developer console, one line per written buffer.
//!
//! Platform support:
//! - Browser (wasm32-unknown-unknown): fetch, instantiate and run via the
//!   JavaScript WebAssembly API
//! - Native: the ABI core, module checks and config, for tests and tooling

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Console logging helper
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[doc(hidden)]
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

/// Log to browser console (WASM)
#[cfg(target_arch = "wasm32")]
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        $crate::log(&format!($($t)*))
    };
}

/// Log to stderr (native)
#[cfg(not(target_arch = "wasm32"))]
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        eprintln!($($t)*)
    };
}

pub mod shim;

/// Initialize panic hook for better error messages in browser console
#[cfg(target_arch = "wasm32")]
fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    init_panic_hook();
}

/// Fetch, instantiate and run the guest module.
///
/// `config_json` is an optional JSON object, see [`shim::ShimConfig`].
/// Resolves to the code passed to `proc_exit`, if the guest called it.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub async fn run(config_json: Option<String>) -> Result<Option<i32>, JsValue> {
    let config = shim::ShimConfig::from_json(config_json.as_deref()).map_err(to_js)?;

    let bytes = shim::fetch_module(&config.module_url)
        .await
        .map_err(to_js)?;
    console_log!("[shim] fetched {} ({} bytes)", config.module_url, bytes.len());

    let report = shim::ModuleExecutor::new(config)
        .execute(&bytes, shim::BrowserConsole)
        .await
        .map_err(to_js)?;

    Ok(report.exit_code)
}

#[cfg(target_arch = "wasm32")]
fn to_js(err: shim::ShimError) -> JsValue {
    console_log!("[shim] {}", err);
    js_sys::Error::new(&err.to_string()).into()
}
