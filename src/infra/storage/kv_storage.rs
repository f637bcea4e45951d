// Implementations of the core `KvStore` trait.

pub mod in_memory;
pub mod json_store;
pub mod sqlite_store;

pub use in_memory::InMemoryKvStore;
pub use json_store::JsonKvStore;
pub use sqlite_store::SqliteKvStore;
