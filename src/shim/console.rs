//! Console sinks for guest output
//!
//! Every non-empty vector passed to `fd_write` becomes one line here.

use super::abi::Stream;
use std::cell::RefCell;
use std::rc::Rc;

/// Destination for decoded guest output
pub trait ConsoleSink {
    /// Emit one line of guest text
    fn emit(&mut self, stream: Stream, line: &str);
}

/// Browser developer console (`console.log` / `console.error`)
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserConsole;

impl ConsoleSink for BrowserConsole {
    #[cfg(target_arch = "wasm32")]
    fn emit(&mut self, stream: Stream, line: &str) {
        let line = wasm_bindgen::JsValue::from_str(line);
        match stream {
            Stream::Stdout => web_sys::console::log_1(&line),
            Stream::Stderr => web_sys::console::error_1(&line),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn emit(&mut self, stream: Stream, line: &str) {
        StdConsole.emit(stream, line);
    }
}

/// Process stdout/stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl ConsoleSink for StdConsole {
    fn emit(&mut self, stream: Stream, line: &str) {
        match stream {
            Stream::Stdout => println!("{}", line),
            Stream::Stderr => eprintln!("{}", line),
        }
    }
}

/// A line captured by [`RecordingConsole`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub stream: Stream,
    pub text: String,
}

/// Captures emitted lines in memory
///
/// Clones share the same buffer, so one handle can be given to the runtime
/// while another is kept for inspection.
#[derive(Debug, Default, Clone)]
pub struct RecordingConsole {
    lines: Rc<RefCell<Vec<ConsoleLine>>>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line emitted so far
    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.lines.borrow().clone()
    }

    /// Text of every line emitted so far
    pub fn texts(&self) -> Vec<String> {
        self.lines.borrow().iter().map(|l| l.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl ConsoleSink for RecordingConsole {
    fn emit(&mut self, stream: Stream, line: &str) {
        self.lines.borrow_mut().push(ConsoleLine {
            stream,
            text: line.to_string(),
        });
    }
}
