//! The committee's fact store: an async key-value contract, a couple of concrete
//! implementations, and a read-through LRU cache layer.

pub mod bucketed;
pub mod errors;
pub mod fact_cache;
pub mod map_storage;
pub mod storage_trait;

pub use bucketed::BucketedStorage;
pub use errors::StorageError;
pub use fact_cache::FactCache;
pub use map_storage::MapStorage;
pub use storage_trait::Storage;
