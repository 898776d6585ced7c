#![cfg_attr(all(windows, feature = "gui"), windows_subsystem = "windows")]

use luastub::{LaunchContext, Launcher};
use std::process::ExitCode;

fn main() -> ExitCode {
    let ctx = LaunchContext::from_env();
    Launcher::default().run(&ctx).exit_code()
}
