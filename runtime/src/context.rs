use clap_lex::RawArgs;
use std::path::{Path, PathBuf};

/// Extension given to the companion script looked up when nothing is glued.
pub const SCRIPT_EXTENSION: &str = ".lua";

/// Everything the launcher knows about the current process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchContext {
    exe_path: PathBuf,
    exe_display: String,
    args: Vec<String>,
}

impl LaunchContext {
    pub fn new(exe_path: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let exe_path = exe_path.into();
        let exe_display = exe_path.display().to_string();
        Self {
            exe_path,
            exe_display,
            args,
        }
    }

    /// Builds the context of the running process.
    ///
    /// The executable path comes from the OS, falling back to `argv[0]`.
    pub fn from_env() -> Self {
        let raw = RawArgs::from_args();
        let mut cursor = raw.cursor();
        let argv0 = raw.next_os(&mut cursor).map(PathBuf::from);

        let exe_path = std::env::current_exe()
            .ok()
            .or(argv0)
            .unwrap_or_default();
        let args = raw
            .remaining(&mut cursor)
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        Self::new(exe_path, args)
    }

    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    /// Executable path as handed to scripts and stripped from error messages.
    pub fn exe_display(&self) -> &str {
        &self.exe_display
    }

    /// `arg[0]` is the executable, followed by the command-line arguments in order.
    pub fn argument_vector(&self) -> Vec<&str> {
        std::iter::once(self.exe_display.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    pub fn companion_script(&self) -> PathBuf {
        PathBuf::from(companion_script_path(&self.exe_display))
    }
}

/// Replaces the last four characters of `exe` with [`SCRIPT_EXTENSION`].
pub fn companion_script_path(exe: &str) -> String {
    let keep = exe.chars().count().saturating_sub(4);
    let mut path: String = exe.chars().take(keep).collect();
    path.push_str(SCRIPT_EXTENSION);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_companion_replaces_exe_suffix() {
        assert_eq!(companion_script_path("prog.exe"), "prog.lua");
        assert_eq!(
            companion_script_path(r"C:\tools\build.exe"),
            r"C:\tools\build.lua"
        );
    }

    #[test]
    fn test_companion_counts_characters() {
        assert_eq!(companion_script_path("/opt/ünïcödé.exe"), "/opt/ünïcödé.lua");
    }

    #[test]
    fn test_companion_without_extension() {
        // Four characters go regardless of what they are.
        assert_eq!(companion_script_path("/usr/bin/tool"), "/usr/bin/.lua");
        assert_eq!(companion_script_path("ab"), ".lua");
    }

    #[test]
    fn test_argument_vector_order() {
        let ctx = LaunchContext::new(
            "/apps/demo.exe",
            vec!["first".to_string(), "--flag".to_string(), "last".to_string()],
        );
        assert_eq!(
            ctx.argument_vector(),
            vec!["/apps/demo.exe", "first", "--flag", "last"]
        );
    }

    #[test]
    fn test_argument_vector_without_args() {
        let ctx = LaunchContext::new("/apps/demo.exe", Vec::new());
        assert_eq!(ctx.argument_vector(), vec!["/apps/demo.exe"]);
        assert_eq!(ctx.companion_script(), PathBuf::from("/apps/demo.lua"));
    }

    #[test]
    fn test_from_env_has_absolute_exe() {
        let ctx = LaunchContext::from_env();
        assert!(ctx.exe_path().is_absolute());
    }
}
