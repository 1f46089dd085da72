//! 交易记录规范化
//!
//! 新记录的商品在 `items` 下，旧记录的商品是顶层数值字段。
//! 两种结构只在 [`RecordShape::of`] 判别一次，调用方不再各自判断。

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::analytics::model::lenient::value_as_number;
use crate::analytics::model::{
    ItemCategory, NormalizedLineItem, RawTransactionRecord, EXCLUDED_FIELDS,
};

const BEVERAGE_PREFIXES: [&str; 3] = ["es ", "kopi", "air"];

/// 记录结构
#[derive(Debug, Clone, Copy)]
pub enum RecordShape<'a> {
    /// `items` 非空
    Nested(&'a Map<String, Value>),
    /// 旧版：顶层字段即商品
    LegacyFlat(&'a Map<String, Value>),
}

impl<'a> RecordShape<'a> {
    pub fn of(record: &'a RawTransactionRecord) -> Self {
        if record.items.is_empty() {
            RecordShape::LegacyFlat(&record.extra)
        } else {
            RecordShape::Nested(&record.items)
        }
    }

    /// (商品名, 数量) 列表，已过滤非数值和排除字段
    fn numeric_fields(self) -> impl Iterator<Item = (&'a str, f64)> {
        let (map, skip_excluded) = match self {
            RecordShape::Nested(map) => (map, false),
            RecordShape::LegacyFlat(map) => (map, true),
        };
        map.iter().filter_map(move |(name, value)| {
            if skip_excluded && is_excluded_field(name) {
                return None;
            }
            value_as_number(value).map(|quantity| (name.as_str(), quantity))
        })
    }
}

pub fn is_excluded_field(name: &str) -> bool {
    EXCLUDED_FIELDS.contains(&name)
}

/// 按名称前缀推断类别
pub fn categorize_item(name: &str) -> ItemCategory {
    let lower = name.to_lowercase();
    if BEVERAGE_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        ItemCategory::Beverage
    } else {
        ItemCategory::Food
    }
}

/// 规范化商品行，只保留正数数量
pub fn normalize(record: &RawTransactionRecord) -> Vec<NormalizedLineItem> {
    RecordShape::of(record)
        .numeric_fields()
        .filter(|(_, quantity)| *quantity > 0.0)
        .filter_map(|(name, quantity)| {
            let quantity = quantity.round() as u32;
            (quantity > 0).then(|| NormalizedLineItem {
                name: name.to_string(),
                quantity,
                category: categorize_item(name),
            })
        })
        .collect()
}

/// 所有记录中出现过的商品名（两种结构都统计），按字典序排列
pub fn extract_unique_item_names(records: &[RawTransactionRecord]) -> Vec<String> {
    let mut names = BTreeSet::new();
    for record in records {
        let nested = RecordShape::Nested(&record.items).numeric_fields();
        let flat = RecordShape::LegacyFlat(&record.extra).numeric_fields();
        for (name, _) in nested.chain(flat) {
            names.insert(name.to_string());
        }
    }
    names.into_iter().collect()
}

/// 指标选择：记录中某商品的数量
///
/// 先查 `items`，再查同名顶层字段，都没有则为 0。
/// 商品名与 `total` 等保留字段重名的情况没有校验。
pub fn item_quantity(record: &RawTransactionRecord, name: &str) -> f64 {
    if let Some(quantity) = record.items.get(name).and_then(value_as_number) {
        return quantity;
    }
    record
        .extra
        .get(name)
        .and_then(value_as_number)
        .unwrap_or(0.0)
}

/// 名称包含 voucher（不区分大小写）的商品数量之和
pub fn voucher_count(items: &[NormalizedLineItem]) -> u32 {
    items
        .iter()
        .filter(|item| item.name.to_lowercase().contains("voucher"))
        .map(|item| item.quantity)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::store::Document;
    use serde_json::json;

    fn record(id: &str, data: Value) -> RawTransactionRecord {
        RawTransactionRecord::from_document(&Document::new(id, data))
    }

    #[test]
    fn test_nested_items() {
        let r = record(
            "2024-01-01",
            json!({"total": 50000, "items": {"Kopi Susu": 3, "Nasi Goreng": 2}}),
        );
        let items = normalize(&r);
        assert_eq!(
            items,
            vec![
                NormalizedLineItem {
                    name: "Kopi Susu".to_string(),
                    quantity: 3,
                    category: ItemCategory::Beverage,
                },
                NormalizedLineItem {
                    name: "Nasi Goreng".to_string(),
                    quantity: 2,
                    category: ItemCategory::Food,
                },
            ]
        );
        assert_eq!(voucher_count(&items), 0);
    }

    #[test]
    fn test_legacy_flat_fields() {
        let r = record(
            "2023-05-02",
            json!({
                "total": 120000,
                "customerNumber": 14,
                "year": 2023,
                "month": 5,
                "day": "Tuesday",
                "timestamp": 1683000000,
                "voucher": 2,
                "Es Teh": 4,
                "Ayam Bakar": 3,
                "Sambal": 0,
                "note": "hujan"
            }),
        );
        let items = normalize(&r);
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Ayam Bakar", "Es Teh"]);
        assert_eq!(items[1].category, ItemCategory::Beverage);
    }

    #[test]
    fn test_nested_wins_over_flat() {
        let r = record(
            "2024-01-02",
            json!({"total": 1, "items": {"Air Mineral": 1}, "Legacy Item": 9}),
        );
        let items = normalize(&r);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Air Mineral");
    }

    #[test]
    fn test_categorize() {
        assert_eq!(categorize_item("es jeruk"), ItemCategory::Beverage);
        assert_eq!(categorize_item("KOPI hitam"), ItemCategory::Beverage);
        assert_eq!(categorize_item("Air Putih"), ItemCategory::Beverage);
        assert_eq!(categorize_item("Estrella"), ItemCategory::Food);
        assert_eq!(categorize_item("Nasi Uduk"), ItemCategory::Food);
    }

    #[test]
    fn test_unique_item_names_across_shapes() {
        let records = vec![
            record("2024-01-01", json!({"items": {"Teh": 1, "Roti": 2}})),
            record("2023-01-01", json!({"total": 3, "Bakso": 2, "Roti": 1})),
        ];
        assert_eq!(extract_unique_item_names(&records), vec!["Bakso", "Roti", "Teh"]);
    }

    #[test]
    fn test_item_quantity_lookup_order() {
        let nested = record("2024-01-01", json!({"items": {"Teh": 4}, "Teh": 9}));
        assert_eq!(item_quantity(&nested, "Teh"), 4.0);
        let flat = record("2024-01-01", json!({"Teh": 9}));
        assert_eq!(item_quantity(&flat, "Teh"), 9.0);
        assert_eq!(item_quantity(&flat, "Kopi"), 0.0);
    }

    #[test]
    fn test_voucher_count() {
        let r = record(
            "2024-01-01",
            json!({"items": {"Voucher 10k": 2, "voucher member": 1, "Teh": 5}}),
        );
        assert_eq!(voucher_count(&normalize(&r)), 3);
    }
}
