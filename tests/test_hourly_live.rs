#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use tokio::sync::watch;
    use tokio::time::timeout;

    use retail_pulse::analytics::services::{LiveHourlyService, LiveHourlySnapshot};
    use retail_pulse::analytics::store::{MemoryDocumentStore, PENDING_COLLECTION, SERVED_COLLECTION};
    use retail_pulse::time_util::FixedClock;

    // 2024-03-04 11:30 雅加达
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 4, 30, 0).unwrap()
    }

    fn served_doc(customer: &str, utc_hour: u32, quantity: u32, total: u32) -> serde_json::Value {
        let served_at = Utc.with_ymd_and_hms(2024, 3, 4, utc_hour, 15, 0).unwrap();
        json!({
            "customerNumber": customer,
            "namaCustomer": "Budi",
            "waktuPesan": format!("Timestamp(seconds={}, nanoseconds=0)", served_at.timestamp() - 600),
            "timestampServe": {"seconds": served_at.timestamp(), "nanoseconds": 0},
            "total": total,
            "orderItems": [{"namaPesanan": "Kopi Susu", "quantity": quantity, "preparedQuantity": quantity}]
        })
    }

    /// 等待直到快照满足条件
    async fn wait_for<F>(rx: &mut watch::Receiver<LiveHourlySnapshot>, pred: F) -> LiveHourlySnapshot
    where
        F: Fn(&LiveHourlySnapshot) -> bool,
    {
        timeout(StdDuration::from_secs(5), async {
            loop {
                {
                    let current = rx.borrow_and_update();
                    if pred(&current) {
                        return current.clone();
                    }
                }
                rx.changed().await.expect("sender alive");
            }
        })
        .await
        .expect("snapshot condition not reached")
    }

    #[tokio::test]
    async fn test_initial_load_and_live_updates() -> anyhow::Result<()> {
        let store = Arc::new(MemoryDocumentStore::new());
        store.upsert(SERVED_COLLECTION, "s1", served_doc("1", 2, 2, 30000));
        let service = LiveHourlyService::new(store.clone(), Arc::new(FixedClock::new(now())));

        let mut handle = service.start()?;
        let mut rx = handle.subscribe();
        let first = wait_for(&mut rx, |s| s.updated_at.is_some()).await;
        assert_eq!(first.buckets.len(), 8);
        assert_eq!(first.buckets[1].total, 2.0);
        assert_eq!(first.buckets[1].revenue, 30000.0);
        assert!(first.buckets[3].is_current);
        assert_eq!(first.served_orders.len(), 1);
        assert_eq!(first.served_orders[0].serve_time_minutes, 10);

        store.upsert(SERVED_COLLECTION, "s2", served_doc("2", 2, 1, 15000));
        let second = wait_for(&mut rx, |s| s.buckets.get(1).map(|b| b.customer_count) == Some(2)).await;
        assert_eq!(second.buckets[1].total, 3.0);

        let ordered_at = Utc.with_ymd_and_hms(2024, 3, 4, 4, 20, 0).unwrap();
        store.upsert(
            PENDING_COLLECTION,
            "p1",
            json!({
                "status": "pending",
                "waktuPesan": {"seconds": ordered_at.timestamp(), "nanoseconds": 0},
                "bungkus": 1,
                "orderItems": [{"namaPesanan": "Nasi Goreng", "dineInQuantity": 1, "takeAwayQuantity": 2}]
            }),
        );
        let third = wait_for(&mut rx, |s| s.buckets.get(3).map(|b| b.pending_total) == Some(3.0)).await;
        assert_eq!(third.pending_orders.len(), 1);
        assert_eq!(third.pending_orders[0].order_items[0].order_type, "take-away");

        // 删除后整体重建
        store.delete(SERVED_COLLECTION, "s1");
        let fourth = wait_for(&mut rx, |s| s.buckets.get(1).map(|b| b.total) == Some(1.0)).await;
        assert_eq!(fourth.served_orders.len(), 1);

        handle.unsubscribe();
        assert!(!handle.is_active());
        store.upsert(SERVED_COLLECTION, "s3", served_doc("3", 2, 5, 50000));
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        assert_eq!(handle.latest().buckets[1].total, 1.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_yesterday_served_not_counted() -> anyhow::Result<()> {
        let store = Arc::new(MemoryDocumentStore::new());
        let yesterday = Utc.with_ymd_and_hms(2024, 3, 3, 2, 0, 0).unwrap();
        store.upsert(
            SERVED_COLLECTION,
            "old",
            json!({"customerNumber": "9", "timestampServe": yesterday.timestamp_millis(), "total": 1000,
                   "orderItems": [{"namaPesanan": "Teh", "quantity": 4}]}),
        );
        let service = LiveHourlyService::new(store, Arc::new(FixedClock::new(now())));
        let snapshot = service.load_snapshot().await?;
        assert!(snapshot.buckets.iter().all(|b| b.total == 0.0));
        assert!(snapshot.served_orders.is_empty());
        Ok(())
    }
}
