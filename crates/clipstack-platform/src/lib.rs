pub mod clipboard;
pub mod paste;

pub use clipboard::{ClipboardError, ClipboardPort, SystemClipboard};
pub use paste::{NoopInjector, PasteInjector, XdotoolInjector};
