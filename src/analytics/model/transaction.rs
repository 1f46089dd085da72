use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::lenient;
use crate::analytics::store::Document;

/// 旧版扁平记录中不属于商品的顶层字段
pub const EXCLUDED_FIELDS: [&str; 8] = [
    "year",
    "date",
    "month",
    "timestamp",
    "customerNumber",
    "total",
    "voucher",
    "day",
];

/// 日/月/年交易汇总文档
///
/// 新记录把商品放在 `items` 下；旧记录把商品数量直接写在顶层字段，保留在 `extra` 中
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransactionRecord {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total: f64,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub customer_number: u64,
    #[serde(default, deserialize_with = "lenient::object_or_empty")]
    pub items: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawTransactionRecord {
    /// 由文档构建，`date` 取文档 id；数据无法解析时退化为只有 id 的空记录
    pub fn from_document(doc: &Document) -> Self {
        let mut record = match serde_json::from_value::<RawTransactionRecord>(doc.data.clone()) {
            Ok(record) => record,
            Err(e) => {
                warn!("malformed transaction document {}: {}", doc.id, e);
                RawTransactionRecord::default()
            }
        };
        record.date = doc.id.clone();
        record
    }

    pub fn from_documents(docs: &[Document]) -> Vec<Self> {
        docs.iter().map(Self::from_document).collect()
    }
}

/// 商品类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Food,
    Beverage,
}

/// 规范化后的商品行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedLineItem {
    pub name: String,
    pub quantity: u32,
    pub category: ItemCategory,
}

/// 当前日/月/年的汇总快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSnapshot {
    pub key: String,
    pub total: f64,
    pub customer_number: u64,
    pub items: Vec<NormalizedLineItem>,
    /// 嵌套 `items` 的全部键，包括数量为 0 的商品
    #[serde(default)]
    pub item_keys: Vec<String>,
}
