//! Backend storage implementations for notification records
//!
//! - `memory`: In-memory storage for tests and development
//! - `file`: One file per record, for production use

pub mod file;
pub mod memory;

pub use file::{FileRecordStore, FileRecordStoreBuilder};
pub use memory::MemoryRecordStore;
