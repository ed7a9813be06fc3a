//! Guest Module Executor
//!
//! Runs a guest module on the browser's WebAssembly engine:
//! 1. Validate the bytes against the shim's import table (optional)
//! 2. Compile the module
//! 3. Build the import object with the syscall trampolines
//! 4. Instantiate, then capture the memory export
//! 5. Call the entry point and ignore its return value

#![cfg(target_arch = "wasm32")]

use super::abi::{Errno, IMPORT_NAMESPACE, syscalls};
use super::config::ShimConfig;
use super::console::ConsoleSink;
use super::error::{ShimError, ShimResult};
use super::loader::ModuleValidator;
use super::memory::JsMemoryView;
use super::trampoline::Trampoline;
use js_sys::{Function, Object, Reflect, Uint8Array, WebAssembly};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// Shared state for syscall handlers
pub type SharedRuntime<S> = Rc<RefCell<RuntimeState<S>>>;

/// Runtime state accessible by syscall handlers
///
/// Created once per instance. The memory handle is filled in after
/// instantiation; the buffer behind it is re-read on every call.
pub struct RuntimeState<S: ConsoleSink> {
    pub trampoline: Trampoline<S>,
    pub memory: Option<WebAssembly::Memory>,
}

impl<S: ConsoleSink> RuntimeState<S> {
    pub fn new(console: S, trace: bool) -> Self {
        Self {
            trampoline: Trampoline::new(console).with_trace(trace),
            memory: None,
        }
    }

    fn fd_write(
        &mut self,
        fd: i32,
        iovs_ptr: i32,
        iovs_len: i32,
        retptr: i32,
    ) -> ShimResult<Errno> {
        let memory = self.memory.as_ref().ok_or(ShimError::MemoryUnavailable)?;
        let mut view = JsMemoryView::new(memory);
        self.trampoline
            .fd_write(&mut view, fd, iovs_ptr, iovs_len, retptr)
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Last code the guest passed to `proc_exit`, if it called it
    pub exit_code: Option<i32>,
}

/// Guest module executor
pub struct ModuleExecutor {
    config: ShimConfig,
}

impl ModuleExecutor {
    pub fn new(config: ShimConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    /// Instantiate `module_bytes` and run its entry point to completion
    pub async fn execute<S: ConsoleSink + 'static>(
        &self,
        module_bytes: &[u8],
        console: S,
    ) -> ShimResult<RunReport> {
        if self.config.validate {
            let info = ModuleValidator::validate(
                module_bytes,
                &self.config.memory_export,
                &self.config.entry,
            )?;
            console_log!(
                "[shim] module ok: {} imports, {} exports",
                info.imports.len(),
                info.exports.len()
            );
        }

        let runtime = RuntimeState::new(console, self.config.trace_syscalls);
        let state = Rc::new(RefCell::new(runtime));

        let module = self.compile_module(module_bytes).await?;
        let imports = self.create_imports(Rc::clone(&state))?;
        let instance = self.instantiate_module(&module, &imports).await?;

        if self.config.log_instance {
            web_sys::console::log_2(&JsValue::from_str("[shim] instance"), &instance);
        }

        let exports = instance.exports();
        let memory: WebAssembly::Memory =
            self.get_export(&exports, &self.config.memory_export, "Memory")?;
        state.borrow_mut().memory = Some(memory);

        let entry: Function = self.get_export(&exports, &self.config.entry, "Function")?;
        console_log!("[shim] calling {}", self.config.entry);
        entry.call0(&JsValue::NULL).map_err(|e| ShimError::Aborted {
            reason: describe(&e),
        })?;

        let exit_code = state.borrow().trampoline.exit_code();
        Ok(RunReport { exit_code })
    }

    /// Compile WASM bytecode into a module
    async fn compile_module(&self, bytes: &[u8]) -> ShimResult<WebAssembly::Module> {
        let array = Uint8Array::new_with_length(bytes.len() as u32);
        array.copy_from(bytes);

        let promise = WebAssembly::compile(&array.buffer());
        let result = wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(|e| ShimError::InstantiationFailed {
                reason: describe(&e),
            })?;

        result
            .dyn_into::<WebAssembly::Module>()
            .map_err(|_| ShimError::InstantiationFailed {
                reason: "failed to cast to Module".to_string(),
            })
    }

    /// Create import object with syscall implementations
    fn create_imports<S: ConsoleSink + 'static>(
        &self,
        state: SharedRuntime<S>,
    ) -> ShimResult<Object> {
        let imports = Object::new();
        let wasi = Object::new();

        self.add_fd_write(&wasi, Rc::clone(&state))?;
        self.add_proc_exit(&wasi, state)?;

        set_property(&imports, IMPORT_NAMESPACE, &wasi)?;
        Ok(imports)
    }

    /// Add fd_write(fd, iovs_ptr, iovs_len, retptr) -> errno
    fn add_fd_write<S: ConsoleSink + 'static>(
        &self,
        wasi: &Object,
        state: SharedRuntime<S>,
    ) -> ShimResult<()> {
        let closure = Closure::wrap(Box::new(
            move |fd: i32, iovs_ptr: i32, iovs_len: i32, retptr: i32| -> i32 {
                let result = state.borrow_mut().fd_write(fd, iovs_ptr, iovs_len, retptr);
                match result {
                    Ok(errno) => errno.code(),
                    // The borrow is released above; throwing skips destructors
                    Err(e) => wasm_bindgen::throw_str(&e.to_string()),
                }
            },
        ) as Box<dyn Fn(i32, i32, i32, i32) -> i32>);

        set_property(wasi, syscalls::FD_WRITE, closure.as_ref())?;
        closure.forget();
        Ok(())
    }

    /// Add proc_exit(code)
    fn add_proc_exit<S: ConsoleSink + 'static>(
        &self,
        wasi: &Object,
        state: SharedRuntime<S>,
    ) -> ShimResult<()> {
        let closure = Closure::wrap(Box::new(move |code: i32| {
            state.borrow_mut().trampoline.proc_exit(code);
        }) as Box<dyn Fn(i32)>);

        set_property(wasi, syscalls::PROC_EXIT, closure.as_ref())?;
        closure.forget();
        Ok(())
    }

    /// Instantiate a compiled module with imports
    async fn instantiate_module(
        &self,
        module: &WebAssembly::Module,
        imports: &Object,
    ) -> ShimResult<WebAssembly::Instance> {
        let promise = WebAssembly::instantiate_module(module, imports);
        let result = wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(|e| ShimError::InstantiationFailed {
                reason: describe(&e),
            })?;

        result
            .dyn_into::<WebAssembly::Instance>()
            .map_err(|_| ShimError::InstantiationFailed {
                reason: "failed to cast to Instance".to_string(),
            })
    }

    fn get_export<T: JsCast>(
        &self,
        exports: &Object,
        name: &str,
        expected: &'static str,
    ) -> ShimResult<T> {
        let value = Reflect::get(exports, &JsValue::from_str(name))
            .ok()
            .filter(|v| !v.is_undefined())
            .ok_or_else(|| ShimError::MissingExport {
                name: name.to_string(),
            })?;

        value.dyn_into::<T>().map_err(|v| ShimError::WrongExportType {
            name: name.to_string(),
            expected,
            got: v.js_typeof().as_string().unwrap_or_default(),
        })
    }
}

fn set_property(target: &Object, key: &str, value: &JsValue) -> ShimResult<()> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|_| ShimError::InstantiationFailed {
            reason: format!("failed to set {} import", key),
        })
}

/// Best-effort message for a thrown JS value
fn describe(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{:?}", value)
}
