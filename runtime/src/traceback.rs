//! Message handlers for the protected call of the main chunk.
//!
//! Two engine generations disagree on what a handler should do with the error
//! object, so each gets its own [`TracebackHandler`]. The one matching the
//! linked engine is picked by [`TracebackProtocol::linked`].

use mlua::{Function, Lua, Table, Value};

/// Returned when an error object has no usable text.
pub const NO_ERROR_MESSAGE: &str = "(no error message)";

/// Levels skipped when the traceback is produced: the traceback function
/// itself and the handler that called it.
const TRACEBACK_LEVEL: i64 = 2;

pub trait TracebackHandler {
    /// Turns the raised error object into the value the protected call reports.
    ///
    /// # Errors
    /// Returns whatever the engine raised while describing `err`; the protected
    /// call then fails with that error instead.
    fn handle(&self, lua: &Lua, err: Value) -> mlua::Result<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracebackProtocol {
    /// 5.1 and `LuaJIT`: only text gets a traceback, anything else passes through.
    Legacy,
    /// 5.2 onwards: every error is turned into text.
    Modern,
}

impl TracebackProtocol {
    /// The protocol of the engine this binary was built against.
    pub const fn linked() -> Self {
        if cfg!(any(feature = "lua51", feature = "luajit")) {
            Self::Legacy
        } else {
            Self::Modern
        }
    }

    pub fn handler(self, lua: &Lua) -> Box<dyn TracebackHandler> {
        match self {
            Self::Legacy => Box::new(LegacyTraceback),
            Self::Modern => Box::new(ModernTraceback::capture(lua)),
        }
    }
}

/// Registers `handler` as an engine function usable with `xpcall`.
///
/// # Errors
/// Returns an error if the engine cannot create the function.
pub fn install(lua: &Lua, handler: Box<dyn TracebackHandler>) -> mlua::Result<Function> {
    lua.create_function(move |lua, err: Value| handler.handle(lua, err))
}

/// Looks up `debug.traceback` at the time of the error.
pub struct LegacyTraceback;

impl TracebackHandler for LegacyTraceback {
    fn handle(&self, lua: &Lua, err: Value) -> mlua::Result<Value> {
        if !is_text(&err) {
            return Ok(err);
        }
        let Ok(Value::Table(debug)) = lua.globals().get::<Value>("debug") else {
            return Ok(err);
        };
        let Ok(Value::Function(traceback)) = debug.get::<Value>("traceback") else {
            return Ok(err);
        };
        traceback.call::<Value>((err, TRACEBACK_LEVEL))
    }
}

/// Uses the debug facilities captured before the script ran, so scripts that
/// replace `debug` still get tracebacks.
pub struct ModernTraceback {
    traceback: Option<Function>,
    getmetatable: Option<Function>,
}

impl ModernTraceback {
    pub fn capture(lua: &Lua) -> Self {
        let debug = lua.globals().get::<Table>("debug").ok();
        let field = |name: &str| debug.as_ref().and_then(|d| d.get::<Function>(name).ok());
        Self {
            traceback: field("traceback"),
            getmetatable: field("getmetatable"),
        }
    }

    fn tostring_metamethod(&self, err: &Value) -> mlua::Result<Option<Value>> {
        let Some(getmetatable) = &self.getmetatable else {
            return Ok(None);
        };
        let Value::Table(metatable) = getmetatable.call::<Value>(err.clone())? else {
            return Ok(None);
        };
        let Value::Function(tostring) = metatable.raw_get::<Value>("__tostring")? else {
            return Ok(None);
        };
        tostring.call::<Value>(err.clone()).map(Some)
    }
}

impl TracebackHandler for ModernTraceback {
    fn handle(&self, lua: &Lua, err: Value) -> mlua::Result<Value> {
        if let Ok(Some(message)) = lua.coerce_string(err.clone()) {
            return match &self.traceback {
                Some(traceback) => traceback.call::<Value>((message, TRACEBACK_LEVEL)),
                None => Ok(Value::String(message)),
            };
        }
        let described = if err.is_nil() {
            None
        } else {
            self.tostring_metamethod(&err)?
        };
        match described {
            Some(value) => Ok(value),
            None => lua.create_string(NO_ERROR_MESSAGE).map(Value::String),
        }
    }
}

/// Strings and numbers count as text, as they do for the engine's own `tostring` fast path.
fn is_text(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Integer(_) | Value::Number(_)
    )
}
