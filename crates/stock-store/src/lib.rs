//! # Stock Store
//!
//! 記憶體交易式帳本儲存

pub mod memory;
pub mod undo_log;

// Re-export 主要類型
pub use memory::{LedgerState, MemoryStore, MemoryTransaction};
pub use undo_log::{RecordKey, UndoLog};
