//! 文档存储接口
//!
//! 核心只依赖这几个查询原语：按主键批量读取、排序限量读取、按时间戳过滤读取、订阅变更。

pub mod memory_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

pub use memory_store::MemoryDocumentStore;

pub const DAILY_COLLECTION: &str = "DailyTransaction";
pub const MONTHLY_COLLECTION: &str = "MonthlyTransaction";
pub const YEARLY_COLLECTION: &str = "YearlyTransaction";
pub const SERVED_COLLECTION: &str = "RecentlyServed";
pub const PENDING_COLLECTION: &str = "Status";

/// 按文档 id 排序时使用的字段名
pub const DOCUMENT_ID_FIELD: &str = "__name__";

/// 单次按主键查询的最大键数
pub const MAX_KEYS_PER_FETCH: usize = 10;

/// 文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Upserted,
    Deleted,
}

/// 集合变更通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotice {
    pub collection: String,
    pub document_id: String,
    pub kind: ChangeKind,
}

/// 文档存储提供者
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 按主键读取，`keys` 不能超过 [`MAX_KEYS_PER_FETCH`]；不存在的键直接忽略
    async fn fetch_by_keys(&self, collection: &str, keys: &[String]) -> anyhow::Result<Vec<Document>>;

    /// 按字段排序读取；`limit` 为 None 时不限量。缺少排序字段的文档不返回
    async fn fetch_ordered_limited(
        &self,
        collection: &str,
        order_field: &str,
        direction: SortDirection,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Document>>;

    /// 时间戳字段 >= threshold 的文档
    async fn fetch_where_timestamp_after(
        &self,
        collection: &str,
        field: &str,
        threshold: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Document>>;

    /// 读取整个集合
    async fn fetch_all(&self, collection: &str) -> anyhow::Result<Vec<Document>>;

    /// 订阅集合变更，drop 接收端即取消订阅
    fn subscribe(&self, collection: &str) -> anyhow::Result<broadcast::Receiver<ChangeNotice>>;
}

/// 按每批最多 10 个键分批读取并拼接结果
pub async fn fetch_by_keys_batched(
    store: &dyn DocumentStore,
    collection: &str,
    keys: &[String],
) -> anyhow::Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(keys.len());
    for batch in keys.chunks(MAX_KEYS_PER_FETCH) {
        let fetched = store.fetch_by_keys(collection, batch).await?;
        debug!(
            "fetched {} of {} keys from {}",
            fetched.len(),
            batch.len(),
            collection
        );
        documents.extend(fetched);
    }
    Ok(documents)
}

/// 读取单个文档
pub async fn fetch_one(
    store: &dyn DocumentStore,
    collection: &str,
    key: &str,
) -> anyhow::Result<Option<Document>> {
    let mut docs = store.fetch_by_keys(collection, &[key.to_string()]).await?;
    Ok(docs.pop())
}
