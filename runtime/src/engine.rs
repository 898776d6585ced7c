use crate::context::LaunchContext;
use crate::error::LaunchError;
use glue_format::ChunkReader;
use mlua::{Function, Lua, LuaOptions, MultiValue, StdLib, Value, ffi};
use std::ffi::{CString, c_char, c_int, c_void};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Chunk name given to a glued payload.
pub const GLUE_CHUNK_NAME: &str = "MAIN";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const BYTECODE_MARK: u8 = 0x1b;

/// Result of loading or running a chunk. The error side is the engine's error object.
pub type ScriptResult<T> = Result<T, Value>;

/// The embedded interpreter.
pub struct Engine {
    lua: Lua,
}

impl Engine {
    /// Creates a bare interpreter with no libraries registered.
    ///
    /// # Errors
    /// Returns [`LaunchError::Initialization`] if the engine cannot allocate its state.
    pub fn new() -> Result<Self, LaunchError> {
        // SAFETY: scripts get the full standard set, debug library included; the
        // launcher never hands them anything that relies on the safe subset.
        let lua = std::panic::catch_unwind(|| unsafe {
            Lua::unsafe_new_with(StdLib::NONE, LuaOptions::new())
        })
        .map_err(|_| LaunchError::Initialization)?;
        Ok(Self { lua })
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Registers every standard library.
    ///
    /// # Errors
    /// Returns an error if a library fails to open.
    pub fn open_libs(&self) -> Result<(), LaunchError> {
        self.lua.load_std_libs(StdLib::ALL)?;
        Ok(())
    }

    /// Binds the argument vector as the global `arg`.
    ///
    /// # Errors
    /// Returns an error if the table cannot be built or assigned.
    pub fn bind_args(&self, ctx: &LaunchContext) -> Result<(), LaunchError> {
        let arg = self.lua.create_table()?;
        for (index, value) in ctx.argument_vector().into_iter().enumerate() {
            arg.raw_set(index, value)?;
        }
        self.lua.globals().set("arg", arg)?;
        Ok(())
    }

    /// Feeds `reader` to the engine's loader one pull at a time and compiles the chunk.
    ///
    /// Source text and precompiled bytecode are both accepted.
    ///
    /// # Errors
    /// Returns the engine's error object if the bytes do not form a valid chunk.
    pub fn load_stream<R: Read>(
        &self,
        reader: &mut ChunkReader<R>,
        name: &str,
    ) -> ScriptResult<Function> {
        let name = CString::new(name).map_err(|err| self.message_value(&err.to_string()))?;
        let data = std::ptr::from_mut(reader).cast::<c_void>();
        let mut status = ffi::LUA_OK;

        // SAFETY: `pull_chunk::<R>` is only handed `data`, which points at `reader`
        // and outlives the call. The loader leaves one value on the stack.
        let loaded: Value = unsafe {
            self.lua.exec_raw((), |state| {
                status = raw_load(state, pull_chunk::<R>, data, name.as_ptr());
            })
        }
        .map_err(|err| self.error_value(err))?;

        match (status, loaded) {
            (ffi::LUA_OK, Value::Function(chunk)) => Ok(chunk),
            (_, err) => Err(err),
        }
    }

    /// Loads a script file the way the stock interpreter does.
    ///
    /// A leading UTF-8 byte order mark is skipped, and so is a first line starting
    /// with `#`. Line numbers in diagnostics still count from the top of the file.
    ///
    /// # Errors
    /// Returns the engine's error object if the file cannot be read or compiled.
    pub fn load_file(&self, path: &Path) -> ScriptResult<Function> {
        let file = File::open(path).map_err(|err| {
            self.message_value(&format!("cannot open {}: {err}", path.display()))
        })?;
        let mut file = BufReader::new(file);
        let prefix = skip_script_header(&mut file).map_err(|err| {
            self.message_value(&format!("cannot read {}: {err}", path.display()))
        })?;

        let mut reader = ChunkReader::new(prefix.chain(file), u64::MAX);
        self.load_stream(&mut reader, &format!("@{}", path.display()))
    }

    /// Calls `chunk` with no arguments under `handler`, discarding its results.
    ///
    /// # Errors
    /// Returns whatever `handler` made of the raised error object.
    pub fn protected_call(&self, chunk: Function, handler: Function) -> ScriptResult<()> {
        let xpcall: Function = self
            .lua
            .globals()
            .get("xpcall")
            .map_err(|err| self.error_value(err))?;
        let results: MultiValue = xpcall
            .call((chunk, handler))
            .map_err(|err| self.error_value(err))?;

        let mut results = results.into_iter();
        match results.next() {
            Some(Value::Boolean(true)) => Ok(()),
            _ => Err(results.next().unwrap_or(Value::Nil)),
        }
    }

    /// Wraps plain text as an engine error object.
    pub fn message_value(&self, text: &str) -> Value {
        self.lua.create_string(text).map_or(Value::Nil, Value::String)
    }

    /// Runs a full garbage-collection cycle.
    ///
    /// # Errors
    /// Returns an error if a finalizer raised during the cycle.
    pub fn collect_garbage(&self) -> mlua::Result<()> {
        self.lua.gc_collect()
    }

    /// Destroys the interpreter.
    pub fn close(self) {
        drop(self.lua);
    }

    fn error_value(&self, err: mlua::Error) -> Value {
        let text = match err {
            mlua::Error::SyntaxError { message, .. }
            | mlua::Error::RuntimeError(message)
            | mlua::Error::MemoryError(message) => message,
            other => other.to_string(),
        };
        self.message_value(&text)
    }
}

/// Drops a byte order mark and a `#` first line from `reader`.
///
/// Returns the bytes to put back in front of the rest: a newline when a text line
/// was dropped, so the chunk keeps its line numbering.
fn skip_script_header<R: BufRead>(reader: &mut R) -> io::Result<&'static [u8]> {
    if reader.fill_buf()?.starts_with(UTF8_BOM) {
        reader.consume(UTF8_BOM.len());
    }
    if reader.fill_buf()?.first() != Some(&b'#') {
        return Ok(b"");
    }

    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    if reader.fill_buf()?.first() == Some(&BYTECODE_MARK) {
        Ok(b"")
    } else {
        Ok(b"\n")
    }
}

/// Loader callback handing the engine one buffer of `ChunkReader` at a time.
unsafe extern "C-unwind" fn pull_chunk<R: Read>(
    _state: *mut ffi::lua_State,
    data: *mut c_void,
    size: *mut usize,
) -> *const c_char {
    // SAFETY: `data` is the `ChunkReader<R>` passed to `load_stream`, and the
    // returned slice stays untouched until the loader calls back again.
    let reader = unsafe { &mut *data.cast::<ChunkReader<R>>() };
    match reader.pull() {
        Some(bytes) => {
            unsafe { *size = bytes.len() };
            bytes.as_ptr().cast::<c_char>()
        }
        None => {
            unsafe { *size = 0 };
            std::ptr::null()
        }
    }
}

#[cfg(any(feature = "lua51", feature = "luajit"))]
unsafe fn raw_load(
    state: *mut ffi::lua_State,
    reader: ffi::lua_Reader,
    data: *mut c_void,
    name: *const c_char,
) -> c_int {
    unsafe { ffi::lua_load(state, reader, data, name) }
}

#[cfg(not(any(feature = "lua51", feature = "luajit")))]
unsafe fn raw_load(
    state: *mut ffi::lua_State,
    reader: ffi::lua_Reader,
    data: *mut c_void,
    name: *const c_char,
) -> c_int {
    unsafe { ffi::lua_load(state, reader, data, name, std::ptr::null()) }
}
