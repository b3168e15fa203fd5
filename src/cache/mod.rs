pub mod persistence;
pub mod store;

pub use persistence::{FilePersistence, MemoryPersistence, NoopPersistence, PersistedEntry, Persistence};
pub use store::{CacheStats, CacheStore};
