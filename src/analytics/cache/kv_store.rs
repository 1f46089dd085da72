use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::OnceCell;

use crate::app_config::redis as app_redis;

/// 抽象：字符串键值存储
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
    async fn keys_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>>;
}

/// 进程内实现(DashMap)，进程退出即丢失
#[derive(Default)]
pub struct MemoryKvStore {
    map: DashMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.map.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .map
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect())
    }
}

/// Redis 实现，重启后数据仍在
///
/// 首次使用时建立一条多路复用连接，之后各调用克隆共享
pub struct RedisKvStore {
    client: redis::Client,
    conn: OnceCell<MultiplexedConnection>,
}

impl RedisKvStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            conn: OnceCell::new(),
        }
    }

    pub fn connect(url: &str) -> anyhow::Result<Self> {
        Ok(Self::new(app_redis::redis_client_for(url)?))
    }

    async fn connection(&self) -> anyhow::Result<MultiplexedConnection> {
        let conn = self
            .conn
            .get_or_try_init(|| app_redis::multiplexed_connection(&self.client))
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = conn.keys(format!("{}*", prefix)).await?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_prefix_listing() -> anyhow::Result<()> {
        let store = MemoryKvStore::new();
        store.set("app_cache_a", "1").await?;
        store.set("app_cache_b", "2").await?;
        store.set("other", "3").await?;
        let mut keys = store.keys_with_prefix("app_cache_").await?;
        keys.sort();
        assert_eq!(keys, vec!["app_cache_a", "app_cache_b"]);

        store.remove("app_cache_a").await?;
        assert_eq!(store.get("app_cache_a").await?, None);
        assert_eq!(store.get("other").await?.as_deref(), Some("3"));
        Ok(())
    }

    #[tokio::test]
    async fn test_redis_unreachable_is_error() {
        // 端口 1 上没有 redis，连接失败应作为错误返回而不是阻塞或 panic
        let store = RedisKvStore::connect("redis://127.0.0.1:1/").unwrap();
        assert!(store.get("app_cache_k").await.is_err());
        assert!(store.set("app_cache_k", "1").await.is_err());
    }
}
