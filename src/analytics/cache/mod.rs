pub mod daily_cache;
pub mod kv_store;

pub use daily_cache::{CacheEntry, DailyCache, DEFAULT_CACHE_PREFIX};
pub use kv_store::{KvStore, MemoryKvStore, RedisKvStore};
