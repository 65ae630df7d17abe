use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

/// Injects a paste keystroke into whichever window has focus.
///
/// Fire-and-forget: callers never learn whether the paste landed.
pub trait PasteInjector {
    fn inject(&self);
}

/// Sends Ctrl+V through `xdotool` after a short delay.
///
/// Only Linux is supported; elsewhere this does nothing.
pub struct XdotoolInjector {
    delay: Duration,
}

impl XdotoolInjector {
    pub fn new(delay: Duration) -> Self {
        XdotoolInjector { delay }
    }
}

impl PasteInjector for XdotoolInjector {
    fn inject(&self) {
        if !cfg!(target_os = "linux") {
            debug!("Auto-paste not supported on this platform");
            return;
        }

        std::thread::sleep(self.delay);
        let spawned = Command::new("xdotool")
            .args(["key", "--clearmodifiers", "ctrl+v"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(_) => debug!("Sent ctrl+v via xdotool"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("xdotool not found, auto-paste skipped (install xdotool to enable it)");
            }
            Err(e) => warn!("xdotool paste error: {}", e),
        }
    }
}

/// Injector that does nothing, for when auto-paste is turned off.
pub struct NoopInjector;

impl PasteInjector for NoopInjector {
    fn inject(&self) {}
}
