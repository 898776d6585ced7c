use deno_terminal::colors;
use std::cell::RefCell;
use std::rc::Rc;

/// Destination for the single message a failed launch produces.
pub trait Sink {
    fn show(&self, title: &str, message: &str);
}

/// The sink this binary was built with.
pub fn default_sink() -> Box<dyn Sink> {
    #[cfg(all(windows, feature = "gui"))]
    {
        Box::new(DialogSink)
    }
    #[cfg(not(all(windows, feature = "gui")))]
    {
        Box::new(ConsoleSink)
    }
}

/// Writes to stderr.
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn show(&self, title: &str, message: &str) {
        eprintln!("{}: {message}", colors::red_bold(title));
    }
}

#[cfg(windows)]
pub use dialog::DialogSink;

#[cfg(windows)]
mod dialog {
    use super::Sink;
    use std::ffi::{OsStr, c_void};
    use std::os::windows::ffi::OsStrExt;

    const MB_OK: u32 = 0x0000_0000;
    const MB_ICONERROR: u32 = 0x0000_0010;

    #[link(name = "user32")]
    unsafe extern "system" {
        fn MessageBoxW(hwnd: *mut c_void, text: *const u16, caption: *const u16, kind: u32)
        -> i32;
    }

    /// Modal error box, for builds without a console.
    pub struct DialogSink;

    impl Sink for DialogSink {
        fn show(&self, title: &str, message: &str) {
            let text = wide(message);
            let caption = wide(title);
            // SAFETY: both buffers are NUL-terminated and outlive the call.
            unsafe {
                MessageBoxW(
                    std::ptr::null_mut(),
                    text.as_ptr(),
                    caption.as_ptr(),
                    MB_OK | MB_ICONERROR,
                );
            }
        }
    }

    fn wide(s: &str) -> Vec<u16> {
        OsStr::new(s)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }
}

/// Keeps messages in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    messages: Rc<RefCell<Vec<(String, String)>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(title, message)` pairs in the order they were shown.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.borrow().clone()
    }
}

impl Sink for CaptureSink {
    fn show(&self, title: &str, message: &str) {
        self.messages
            .borrow_mut()
            .push((title.to_string(), message.to_string()));
    }
}
