use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::kv_store::KvStore;
use crate::time_util::{next_jakarta_midnight, Clock};

pub const DEFAULT_CACHE_PREFIX: &str = "app_cache_";

/// 缓存条目，`expiry` 为毫秒时间戳
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub expiry: i64,
}

/// 当日有效的缓存：写入时过期时间固定为下一个雅加达零点
///
/// 读失败、解析失败、过期都当作未命中；过期条目不主动删除。
#[derive(Clone)]
pub struct DailyCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    prefix: String,
}

impl DailyCache {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_prefix(store, clock, DEFAULT_CACHE_PREFIX)
    }

    pub fn with_prefix(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, prefix: &str) -> Self {
        Self {
            store,
            clock,
            prefix: prefix.to_string(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn read_raw(&self, key: &str) -> Option<String> {
        match self.store.get(&self.full_key(key)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("cache read {} failed: {}", key, e);
                None
            }
        }
    }

    fn expiry_of(raw: &str) -> Option<i64> {
        serde_json::from_str::<serde_json::Value>(raw)
            .ok()?
            .get("expiry")?
            .as_i64()
    }

    pub async fn is_valid(&self, key: &str) -> bool {
        let now = self.clock.now().timestamp_millis();
        self.read_raw(key)
            .await
            .and_then(|raw| Self::expiry_of(&raw))
            .map(|expiry| now < expiry)
            .unwrap_or(false)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key).await?;
        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("cache entry {} undecodable: {}", key, e);
                return None;
            }
        };
        if self.clock.now().timestamp_millis() >= entry.expiry {
            debug!("cache entry {} expired", key);
            return None;
        }
        Some(entry.data)
    }

    pub async fn set<T: Serialize + Sync>(&self, key: &str, data: &T) {
        let entry = CacheEntry {
            data,
            expiry: next_jakarta_midnight(self.clock.now()).timestamp_millis(),
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("cache entry {} not serializable: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.full_key(key), &raw).await {
            warn!("cache write {} failed: {}", key, e);
        }
    }

    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.store.remove(&self.full_key(key)).await {
            warn!("cache remove {} failed: {}", key, e);
        }
    }

    /// 只删除带前缀的键
    pub async fn invalidate_all(&self) {
        let keys = match self.store.keys_with_prefix(&self.prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("cache key listing failed: {}", e);
                return;
            }
        };
        for key in keys {
            if let Err(e) = self.store.remove(&key).await {
                warn!("cache remove {} failed: {}", key, e);
            }
        }
    }
}
