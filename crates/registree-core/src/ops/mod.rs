pub mod store;

pub use store::{MemoryStore, RecordFilter, RecordStore};
