//! `tracing` setup.
//!
//! Formatted lines go to `console.log` in the browser and to stderr in native
//! builds (tests, tools). Installing twice is harmless: the second call keeps
//! the first subscriber.

use std::io::{self, Write};

use tracing_subscriber::EnvFilter;

/// Buffers one formatted event and emits it as a single console line on drop.
#[derive(Default)]
pub struct ConsoleWriter {
    buf: Vec<u8>,
}

impl Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buf);
        emit(line.trim_end());
    }
}

#[cfg(target_arch = "wasm32")]
fn emit(line: &str) {
    web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(line));
}

#[cfg(not(target_arch = "wasm32"))]
fn emit(line: &str) {
    let _ = writeln!(io::stderr(), "{line}");
}

/// Filter for `level`; anything `EnvFilter` cannot parse falls back to `info`.
pub fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Returns false when one was already set.
pub fn init(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_writer(ConsoleWriter::default)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init("debug");
        assert!(!init("warn"));
        tracing::info!("still logging");
    }

    #[test]
    fn bad_level_falls_back() {
        assert_eq!(filter_for("app=shouty").to_string(), "info");
        assert!(filter_for("debug").to_string().contains("debug"));
    }
}
