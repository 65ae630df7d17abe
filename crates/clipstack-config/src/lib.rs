pub mod config;
pub mod keybindings;
pub mod options;
pub mod parser;

pub use config::Config;
pub use keybindings::{KeyBinding, KeyTable, PopupAction};
pub use options::Options;
