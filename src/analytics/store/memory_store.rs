//! 进程内文档存储（DashMap），用于测试和离线快照

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{
    ChangeKind, ChangeNotice, Document, DocumentStore, SortDirection, DOCUMENT_ID_FIELD,
    MAX_KEYS_PER_FETCH,
};
use crate::error::{to_err, AppError};
use crate::time_util::parse_store_timestamp;

const CHANNEL_CAPACITY: usize = 64;

pub struct MemoryDocumentStore {
    collections: DashMap<String, BTreeMap<String, Value>>,
    channels: DashMap<String, broadcast::Sender<ChangeNotice>>,
    unavailable: AtomicBool,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            channels: DashMap::new(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// 从 `{集合: {文档id: 数据}}` 结构的 JSON 载入
    pub fn from_snapshot(snapshot: Value) -> Result<Self, AppError> {
        let Value::Object(collections) = snapshot else {
            return Err(AppError::Parse("snapshot root must be an object".to_string()));
        };
        let store = Self::new();
        for (collection, docs) in collections {
            let Value::Object(docs) = docs else {
                return Err(AppError::Parse(format!(
                    "collection {} must be an object",
                    collection
                )));
            };
            store
                .collections
                .insert(collection, docs.into_iter().collect());
        }
        Ok(store)
    }

    pub fn load_snapshot_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let snapshot: Value = serde_json::from_str(&raw)?;
        let store = Self::from_snapshot(snapshot)?;
        info!(
            "载入快照 {}，集合数: {}",
            path.display(),
            store.collections.len()
        );
        Ok(store)
    }

    /// 模拟数据源不可用，之后的读取全部返回错误
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn upsert(&self, collection: &str, id: &str, data: Value) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        self.notify(collection, id, ChangeKind::Upserted);
    }

    pub fn delete(&self, collection: &str, id: &str) {
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|mut docs| docs.remove(id));
        if removed.is_some() {
            self.notify(collection, id, ChangeKind::Deleted);
        }
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn notify(&self, collection: &str, id: &str, kind: ChangeKind) {
        if let Some(sender) = self.channels.get(collection) {
            let notice = ChangeNotice {
                collection: collection.to_string(),
                document_id: id.to_string(),
                kind,
            };
            // 没有订阅者时发送失败，忽略
            if sender.send(notice).is_err() {
                debug!("no subscriber for {}", collection);
            }
        }
    }

    fn ensure_available(&self) -> anyhow::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Store("document store unavailable".to_string()).into());
        }
        Ok(())
    }

    fn snapshot_of(&self, collection: &str) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// 排序键：数字、时间戳、字符串依次比较
#[derive(Debug, PartialEq, PartialOrd)]
enum OrderKey {
    Number(f64),
    Text(String),
}

fn order_key(doc: &Document, field: &str) -> Option<OrderKey> {
    if field == DOCUMENT_ID_FIELD {
        return Some(OrderKey::Text(doc.id.clone()));
    }
    let value = doc.data.get(field)?;
    match value {
        Value::Number(n) => n.as_f64().map(OrderKey::Number),
        Value::Object(_) => {
            parse_store_timestamp(value).map(|ts| OrderKey::Number(ts.timestamp_millis() as f64))
        }
        Value::String(s) => match parse_store_timestamp(value) {
            Some(ts) => Some(OrderKey::Number(ts.timestamp_millis() as f64)),
            None => Some(OrderKey::Text(s.clone())),
        },
        _ => None,
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn fetch_by_keys(&self, collection: &str, keys: &[String]) -> anyhow::Result<Vec<Document>> {
        self.ensure_available()?;
        if keys.len() > MAX_KEYS_PER_FETCH {
            return Err(AppError::BatchTooLarge {
                requested: keys.len(),
                max: MAX_KEYS_PER_FETCH,
            }
            .into());
        }
        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(keys
            .iter()
            .filter_map(|key| {
                docs.get(key)
                    .map(|data| Document::new(key.clone(), data.clone()))
            })
            .collect())
    }

    async fn fetch_ordered_limited(
        &self,
        collection: &str,
        order_field: &str,
        direction: SortDirection,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Document>> {
        self.ensure_available()?;
        let mut keyed: Vec<(OrderKey, Document)> = self
            .snapshot_of(collection)
            .into_iter()
            .filter_map(|doc| order_key(&doc, order_field).map(|key| (key, doc)))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| {
            let ord = a.partial_cmp(b).unwrap_or(CmpOrdering::Equal);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        let docs = keyed.into_iter().map(|(_, doc)| doc);
        Ok(match limit {
            Some(limit) => docs.take(limit).collect(),
            None => docs.collect(),
        })
    }

    async fn fetch_where_timestamp_after(
        &self,
        collection: &str,
        field: &str,
        threshold: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Document>> {
        self.ensure_available()?;
        Ok(self
            .snapshot_of(collection)
            .into_iter()
            .filter(|doc| {
                doc.data
                    .get(field)
                    .and_then(parse_store_timestamp)
                    .map(|ts| ts >= threshold)
                    .unwrap_or(false)
            })
            .collect())
    }

    async fn fetch_all(&self, collection: &str) -> anyhow::Result<Vec<Document>> {
        self.ensure_available()?;
        Ok(self.snapshot_of(collection))
    }

    fn subscribe(&self, collection: &str) -> anyhow::Result<broadcast::Receiver<ChangeNotice>> {
        let sender = self
            .channels
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        Ok(sender.subscribe())
    }
}

impl MemoryDocumentStore {
    /// 导出当前全部数据，结构与 [`MemoryDocumentStore::from_snapshot`] 一致
    pub fn to_snapshot(&self) -> anyhow::Result<Value> {
        let mut root = serde_json::Map::new();
        for entry in self.collections.iter() {
            let docs: serde_json::Map<String, Value> = entry
                .value()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            root.insert(entry.key().clone(), Value::Object(docs));
        }
        serde_json::to_value(root).map_err(|e| to_err(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryDocumentStore {
        MemoryDocumentStore::from_snapshot(json!({
            "MonthlyTransaction": {
                "2024-01": {"total": 10, "timestamp": 1704042000000i64},
                "2024-02": {"total": 20, "timestamp": 1706720400000i64},
                "2024-03": {"total": 30, "timestamp": 1709226000000i64},
                "broken": {"total": 1}
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_ordered_limited_skips_missing_field() {
        let store = store();
        let docs = store
            .fetch_ordered_limited("MonthlyTransaction", "timestamp", SortDirection::Desc, Some(2))
            .await
            .unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["2024-03", "2024-02"]);

        let by_id = store
            .fetch_ordered_limited("MonthlyTransaction", DOCUMENT_ID_FIELD, SortDirection::Asc, None)
            .await
            .unwrap();
        assert_eq!(by_id.len(), 4);
        assert_eq!(by_id[0].id, "2024-01");
    }

    #[tokio::test]
    async fn test_fetch_by_keys_limit() {
        let store = store();
        let keys: Vec<String> = (0..11).map(|i| format!("k{}", i)).collect();
        let err = store.fetch_by_keys("MonthlyTransaction", &keys).await.unwrap_err();
        assert!(err.to_string().contains("10"));

        let found = store
            .fetch_by_keys("MonthlyTransaction", &["2024-02".to_string(), "nope".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_receives_changes() {
        let store = store();
        let mut rx = store.subscribe("Status").unwrap();
        store.upsert("Status", "order-1", json!({"status": "pending"}));
        store.delete("Status", "order-1");
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Upserted);
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Deleted);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = store();
        store.set_unavailable(true);
        assert!(store.fetch_all("MonthlyTransaction").await.is_err());
    }

    #[test]
    fn test_snapshot_roundtrip_shape() {
        let store = store();
        let snapshot = store.to_snapshot().unwrap();
        let reloaded = MemoryDocumentStore::from_snapshot(snapshot).unwrap();
        assert_eq!(reloaded.len("MonthlyTransaction"), 4);
    }
}
