use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::lenient;
use crate::analytics::store::Document;
use crate::time_util::{parse_timestamp_string, time_diff_minutes};

pub const DINE_IN: &str = "dine-in";
pub const TAKE_AWAY: &str = "take-away";

fn default_order_type() -> String {
    DINE_IN.to_string()
}

/// 已出餐订单中的商品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServedItem {
    #[serde(default, alias = "namaPesanan", deserialize_with = "lenient::string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub prepared_quantity: f64,
    #[serde(default = "default_order_type")]
    pub order_type: String,
}

/// 已出餐订单（RecentlyServed）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServedOrder {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub customer_number: String,
    #[serde(default, alias = "namaCustomer", deserialize_with = "lenient::string_or_empty")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "lenient::vec_skip_invalid")]
    pub order_items: Vec<ServedItem>,
    /// 下单时间，旧版字符串格式
    #[serde(default, alias = "waktuPesan", deserialize_with = "lenient::string_or_empty")]
    pub ordered_at_raw: String,
    #[serde(default, alias = "timestampServe", deserialize_with = "lenient::timestamp_opt")]
    pub served_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total: f64,
    /// 出餐耗时（分钟），缺少任一时间时为 0
    #[serde(default)]
    pub serve_time_minutes: i64,
}

impl ServedOrder {
    pub fn from_document(doc: &Document) -> Option<Self> {
        match serde_json::from_value::<ServedOrder>(doc.data.clone()) {
            Ok(mut order) => {
                order.id = doc.id.clone();
                order.serve_time_minutes = order.compute_serve_minutes();
                Some(order)
            }
            Err(e) => {
                warn!("skip malformed served order {}: {}", doc.id, e);
                None
            }
        }
    }

    pub fn from_documents(docs: &[Document]) -> Vec<Self> {
        docs.iter().filter_map(Self::from_document).collect()
    }

    pub fn item_quantity(&self) -> f64 {
        self.order_items.iter().map(|item| item.quantity).sum()
    }

    fn compute_serve_minutes(&self) -> i64 {
        match (parse_timestamp_string(&self.ordered_at_raw), self.served_at) {
            (Some(ordered), Some(served)) => time_diff_minutes(ordered, served),
            _ => 0,
        }
    }
}

/// 制作中订单的商品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    #[serde(default, alias = "namaPesanan", deserialize_with = "lenient::string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub dine_in_quantity: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub take_away_quantity: f64,
    #[serde(default = "default_order_type")]
    pub order_type: String,
}

impl PendingItem {
    pub fn total_quantity(&self) -> f64 {
        self.dine_in_quantity + self.take_away_quantity
    }
}

/// 制作中订单（Status）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrder {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub customer_number: String,
    #[serde(default, alias = "namaCustomer", deserialize_with = "lenient::string_or_empty")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "lenient::vec_skip_invalid")]
    pub order_items: Vec<PendingItem>,
    #[serde(default, alias = "waktuPesan", deserialize_with = "lenient::timestamp_opt")]
    pub ordered_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total: f64,
    #[serde(default, alias = "waktuPengambilan", deserialize_with = "lenient::string_or_empty")]
    pub pickup_time: String,
    #[serde(default, alias = "bungkus", deserialize_with = "lenient::f64_or_zero")]
    pub take_away_count: f64,
}

impl PendingOrder {
    pub fn from_document(doc: &Document) -> Option<Self> {
        match serde_json::from_value::<PendingOrder>(doc.data.clone()) {
            Ok(mut order) => {
                order.id = doc.id.clone();
                for item in order.order_items.iter_mut() {
                    item.order_type = if item.take_away_quantity > 0.0 {
                        TAKE_AWAY.to_string()
                    } else {
                        DINE_IN.to_string()
                    };
                }
                Some(order)
            }
            Err(e) => {
                warn!("skip malformed pending order {}: {}", doc.id, e);
                None
            }
        }
    }

    pub fn from_documents(docs: &[Document]) -> Vec<Self> {
        docs.iter().filter_map(Self::from_document).collect()
    }

    pub fn item_quantity(&self) -> f64 {
        self.order_items.iter().map(PendingItem::total_quantity).sum()
    }
}

/// 小时柱状图的一个时段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBucket {
    /// 形如 "8:00-9:00"
    pub hour: String,
    pub start_hour: u32,
    /// 已出餐商品数量
    pub total: f64,
    /// 制作中商品数量
    pub pending_total: f64,
    pub revenue: f64,
    pub customer_count: usize,
    pub is_current: bool,
}
