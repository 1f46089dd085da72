//! 实时小时柱状图
//!
//! 订阅已出餐和制作中两个集合，任一变更都触发一次全量读取和重建，
//! 结果写入 watch 通道，后完成的覆盖先完成的。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::analytics::aggregate::HourlyAggregator;
use crate::analytics::model::{HourlyBucket, PendingOrder, ServedOrder};
use crate::analytics::store::{ChangeNotice, DocumentStore, PENDING_COLLECTION, SERVED_COLLECTION};
use crate::time_util::{jakarta_start_of_day, Clock};

/// 列表展示的最大订单数
pub const RECENT_ORDER_LIMIT: usize = 50;
pub const SERVED_AT_FIELD: &str = "timestampServe";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveHourlySnapshot {
    pub buckets: Vec<HourlyBucket>,
    /// 出餐时间新到旧
    pub served_orders: Vec<ServedOrder>,
    /// 下单时间新到旧
    pub pending_orders: Vec<PendingOrder>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn recent_served(mut orders: Vec<ServedOrder>) -> Vec<ServedOrder> {
    orders.retain(|order| order.served_at.is_some());
    orders.sort_by(|a, b| b.served_at.cmp(&a.served_at));
    orders.truncate(RECENT_ORDER_LIMIT);
    orders
}

fn recent_pending(mut orders: Vec<PendingOrder>) -> Vec<PendingOrder> {
    orders.retain(|order| order.ordered_at.is_some());
    orders.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at));
    orders.truncate(RECENT_ORDER_LIMIT);
    orders
}

#[derive(Clone)]
pub struct LiveHourlyService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl LiveHourlyService {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 一次全量读取并重建
    pub async fn load_snapshot(&self) -> anyhow::Result<LiveHourlySnapshot> {
        let now = self.clock.now();
        let day_start = jakarta_start_of_day(now);
        let (served_docs, pending_docs) = futures::try_join!(
            self.store
                .fetch_where_timestamp_after(SERVED_COLLECTION, SERVED_AT_FIELD, day_start),
            self.store.fetch_all(PENDING_COLLECTION),
        )?;
        let served = ServedOrder::from_documents(&served_docs);
        let pending = PendingOrder::from_documents(&pending_docs);
        let buckets = HourlyAggregator::rebuild(&served, &pending, now);
        debug!(
            "hourly rebuild: {} served, {} pending",
            served.len(),
            pending.len()
        );

        Ok(LiveHourlySnapshot {
            buckets,
            served_orders: recent_served(served),
            pending_orders: recent_pending(pending),
            updated_at: Some(now),
        })
    }

    /// 开始订阅；返回的句柄 drop 或调用 unsubscribe 后停止
    pub fn start(&self) -> anyhow::Result<LiveHourlyHandle> {
        let served_rx = self.store.subscribe(SERVED_COLLECTION)?;
        let pending_rx = self.store.subscribe(PENDING_COLLECTION)?;

        let (sender, _) = watch::channel(LiveHourlySnapshot::default());
        let sender = Arc::new(sender);
        let active = Arc::new(AtomicBool::new(true));

        let tasks = vec![
            self.spawn_refresh(sender.clone(), active.clone()),
            self.spawn_listener(served_rx, sender.clone(), active.clone()),
            self.spawn_listener(pending_rx, sender.clone(), active.clone()),
        ];
        info!("live hourly subscription started");

        Ok(LiveHourlyHandle {
            sender,
            active,
            tasks,
        })
    }

    fn spawn_refresh(
        &self,
        sender: Arc<watch::Sender<LiveHourlySnapshot>>,
        active: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            match service.load_snapshot().await {
                Ok(snapshot) => {
                    // 已取消订阅的结果直接丢弃
                    if active.load(Ordering::SeqCst) {
                        sender.send_replace(snapshot);
                    }
                }
                Err(e) => error!("live hourly refresh error: {}", e),
            }
        })
    }

    fn spawn_listener(
        &self,
        mut receiver: broadcast::Receiver<ChangeNotice>,
        sender: Arc<watch::Sender<LiveHourlySnapshot>>,
        active: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(notice) => {
                        debug!("{} changed: {}", notice.collection, notice.document_id);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("live hourly listener lagged by {} notices", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
                if !active.load(Ordering::SeqCst) {
                    break;
                }
                service.spawn_refresh(sender.clone(), active.clone());
            }
        })
    }
}

pub struct LiveHourlyHandle {
    sender: Arc<watch::Sender<LiveHourlySnapshot>>,
    active: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl LiveHourlyHandle {
    pub fn subscribe(&self) -> watch::Receiver<LiveHourlySnapshot> {
        self.sender.subscribe()
    }

    pub fn latest(&self) -> LiveHourlySnapshot {
        self.sender.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// 停止监听；正在进行的重建完成后不再发布
    pub fn unsubscribe(&mut self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("live hourly subscription stopped");
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for LiveHourlyHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
