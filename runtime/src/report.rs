use crate::engine::Engine;
use crate::sink::Sink;
use mlua::Value;

/// Title of every script failure message.
pub const ERROR_TITLE: &str = "LUA Error";

/// Title used when the engine cannot be created at all.
pub const INIT_TITLE: &str = "Initialization failure";

/// Shown when the error object has no text representation.
pub const NOT_A_STRING: &str = "(error object is not a string)";

/// Removes every occurrence of `exe_path` and widens tabs to two spaces.
pub fn sanitize(message: &str, exe_path: &str) -> String {
    let stripped = if exe_path.is_empty() {
        message.to_string()
    } else {
        message.replace(exe_path, "")
    };
    stripped.replace('\t', "  ")
}

/// Delivers a script failure to the user.
pub struct ErrorReporter<'a> {
    sink: &'a dyn Sink,
    exe_path: &'a str,
}

impl<'a> ErrorReporter<'a> {
    pub fn new(sink: &'a dyn Sink, exe_path: &'a str) -> Self {
        Self { sink, exe_path }
    }

    /// Shows `err` through the sink, then runs a full collection.
    ///
    /// A nil error object is not reported.
    pub fn report(&self, engine: &Engine, err: Value) {
        if err.is_nil() {
            return;
        }
        let message = match engine.lua().coerce_string(err) {
            Ok(Some(text)) => text.to_string_lossy(),
            _ => NOT_A_STRING.to_string(),
        };
        self.sink
            .show(ERROR_TITLE, &sanitize(&message, self.exe_path));
        engine.collect_garbage().ok();
    }

    /// Shows a failure raised by the launcher itself rather than by the script.
    pub fn report_text(&self, title: &str, message: &str) {
        self.sink.show(title, &sanitize(message, self.exe_path));
    }
}
