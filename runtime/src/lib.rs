//! Launcher for Lua programs glued onto a native executable.
//!
//! At startup the launcher looks for a payload appended to its own file. If
//! one is found it is streamed into the interpreter as chunk `MAIN`; otherwise
//! the companion script next to the executable runs instead. Failures are
//! reported once through a [`Sink`](sink::Sink).

mod context;
mod engine;
mod error;
pub mod preload;
mod report;
pub mod sink;
pub mod traceback;

pub use context::{LaunchContext, SCRIPT_EXTENSION, companion_script_path};
pub use engine::{Engine, GLUE_CHUNK_NAME, ScriptResult};
pub use error::{LaunchError, Outcome};
pub use mlua;
pub use report::{ERROR_TITLE, ErrorReporter, INIT_TITLE, NOT_A_STRING, sanitize};

use preload::Preload;
use sink::{Sink, default_sink};
use traceback::TracebackProtocol;

pub struct Launcher {
    sink: Box<dyn Sink>,
    preload: Preload,
    protocol: TracebackProtocol,
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new(default_sink())
    }
}

impl Launcher {
    pub fn new(sink: Box<dyn Sink>) -> Self {
        Self {
            sink,
            preload: Preload::default(),
            protocol: TracebackProtocol::linked(),
        }
    }

    #[must_use]
    pub fn with_preload(mut self, preload: Preload) -> Self {
        self.preload = preload;
        self
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: TracebackProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Runs the glued payload, or the companion script, to completion.
    pub fn run(&self, ctx: &LaunchContext) -> Outcome {
        let reporter = ErrorReporter::new(self.sink.as_ref(), ctx.exe_display());

        let engine = match Engine::new() {
            Ok(engine) => engine,
            Err(err) => {
                self.sink.show(INIT_TITLE, &err.to_string());
                return Outcome::InitFailed;
            }
        };

        let outcome = match self.execute(&engine, ctx, &reporter) {
            Ok(outcome) => outcome,
            Err(err) => {
                reporter.report_text(ERROR_TITLE, &err.to_string());
                Outcome::InitFailed
            }
        };

        engine.close();
        outcome
    }

    fn execute(
        &self,
        engine: &Engine,
        ctx: &LaunchContext,
        reporter: &ErrorReporter<'_>,
    ) -> Result<Outcome, LaunchError> {
        engine.open_libs()?;
        self.preload.attach(engine.lua())?;
        engine.bind_args(ctx)?;

        let loaded = match glue_format::locate(ctx.exe_path()) {
            Some(glued) => {
                let mut reader = glued.into_reader();
                let chunk = engine.load_stream(&mut reader, GLUE_CHUNK_NAME);
                drop(reader.into_inner());
                chunk
            }
            None => engine.load_file(&ctx.companion_script()),
        };

        let chunk = match loaded {
            Ok(chunk) => chunk,
            Err(err) => {
                reporter.report(engine, err);
                return Ok(Outcome::LoadFailed);
            }
        };

        let handler = traceback::install(engine.lua(), self.protocol.handler(engine.lua()))?;
        match engine.protected_call(chunk, handler) {
            Ok(()) => Ok(Outcome::Success),
            Err(err) => {
                reporter.report(engine, err);
                Ok(Outcome::ExecFailed)
            }
        }
    }
}
