#[cfg(test)]
mod test {
    use chrono::{Duration, NaiveDate};
    use float_cmp::approx_eq;
    use serde_json::json;

    use retail_pulse::analytics::aggregate::{aggregate_by_weekday, box_plot_stats, to_daily_tiles};
    use retail_pulse::analytics::indicator::{median, quartiles};
    use retail_pulse::analytics::model::{ItemCategory, RawTransactionRecord};
    use retail_pulse::analytics::normalizer::{normalize, voucher_count};
    use retail_pulse::analytics::store::Document;

    fn record(date: NaiveDate, data: serde_json::Value) -> RawTransactionRecord {
        RawTransactionRecord::from_document(&Document::new(date.format("%Y-%m-%d").to_string(), data))
    }

    #[test]
    fn test_monday_median_uses_last_eight() {
        // 2024-01-01 周一
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let totals = [
            100000.0, 150000.0, 120000.0, 130000.0, 140000.0, 110000.0, 160000.0, 170000.0, 180000.0,
        ];
        assert!(approx_eq!(f64, median(&totals), 145000.0, ulps = 2));

        let records: Vec<RawTransactionRecord> = totals
            .iter()
            .enumerate()
            .map(|(i, total)| record(monday + Duration::weeks(i as i64), json!({ "total": total })))
            .collect();
        let buckets = aggregate_by_weekday(&records, None);
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[1].day_name, "Monday");
        assert!(approx_eq!(f64, buckets[1].median, 145000.0, ulps = 2));
        assert_eq!(buckets[1].calculation_data.len(), 9);
        assert!(buckets.iter().enumerate().all(|(i, b)| i == 1 || b.calculation_data.is_empty()));
    }

    #[test]
    fn test_item_selector_excludes_zero() {
        let tuesday = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let records = vec![
            record(tuesday, json!({"total": 100, "items": {"Teh": 2}})),
            record(tuesday + Duration::weeks(1), json!({"total": 200, "items": {"Kopi": 5}})),
            // 旧版扁平结构
            record(tuesday + Duration::weeks(2), json!({"total": 300, "Teh": 6, "year": 2024})),
        ];
        let buckets = aggregate_by_weekday(&records, Some("Teh"));
        let values = buckets[2].totals();
        assert_eq!(values, vec![2.0, 6.0]);
        assert!(approx_eq!(f64, buckets[2].median, 4.0, ulps = 2));

        let tiles = to_daily_tiles(&records, Some("Teh"));
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[1].total, 0.0);
        assert_eq!(tiles[1].original_total, 200.0);
    }

    #[test]
    fn test_normalize_example() {
        let r = record(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            json!({"total": 50000, "items": {"Kopi Susu": 3, "Nasi Goreng": 2}}),
        );
        let items = normalize(&r);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Kopi Susu");
        assert_eq!(items[0].category, ItemCategory::Beverage);
        assert_eq!(items[1].category, ItemCategory::Food);
        assert_eq!(voucher_count(&items), 0);
    }

    #[test]
    fn test_quartile_partition() {
        let values = [10.0, 20.0, 30.0, 40.0, 100.0];
        let stats = quartiles(&values);
        assert!(stats.q1 <= stats.median && stats.median <= stats.q3);
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!((stats.min, stats.max), (10.0, 40.0));

        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let records: Vec<RawTransactionRecord> = values
            .iter()
            .enumerate()
            .map(|(i, total)| record(monday + Duration::weeks(i as i64), json!({ "total": total })))
            .collect();
        let plots = box_plot_stats(&aggregate_by_weekday(&records, None));
        assert_eq!(plots.len(), 7);
        assert_eq!(plots[1].stats, stats);
        assert!(plots[0].values.is_empty());
    }
}
