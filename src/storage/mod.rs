pub mod file;
pub mod memory;
pub mod trait_def;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use trait_def::{Storage, StorageError, StorageResult};
