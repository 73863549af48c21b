//! Result printing. Data goes to stdout, failures to stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use serde::Serialize;

/// Prints command results as text or JSON.
pub struct Output {
    json: bool,
}

impl Output {
    pub const fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `value` as JSON, or `text` lines otherwise.
    pub fn show<T: Serialize>(&self, value: &T, text: impl FnOnce() -> Vec<String>) {
        if self.json {
            match serde_json::to_string_pretty(value) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::error!(error = %e, "failed to encode output"),
            }
        } else {
            for line in text() {
                println!("{line}");
            }
        }
    }

    /// A one-line confirmation.
    pub fn done(&self, message: &str) {
        if self.json {
            println!("{}", serde_json::json!({ "ok": true, "message": message }));
        } else {
            println!("{message}");
        }
    }

    pub fn error(&self, message: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "ok": false, "error": message }));
        } else {
            eprintln!("{message}");
        }
    }
}
