pub mod error;
pub mod history;
pub mod store;
pub mod sync;

pub use error::StoreError;
pub use history::{History, Pushed};
pub use store::{HistoryStore, Mutation, StoreLock};
pub use sync::SyncPoller;

/// Default number of entries kept.
pub const DEFAULT_MAX_HISTORY: usize = 20;
