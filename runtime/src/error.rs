use std::process::ExitCode;

/// Failures of the launcher itself, as opposed to failures of the script.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Couldn't initialize a luastate")]
    Initialization,
    #[error(transparent)]
    Engine(#[from] mlua::Error),
}

/// How a launch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The engine could not be created or prepared.
    InitFailed,
    /// The payload or companion script did not load.
    LoadFailed,
    /// The chunk raised an error while running.
    ExecFailed,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    pub fn exit_code(self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}
