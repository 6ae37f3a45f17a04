// 通知监听 - 订阅事件总线上的推送消息并合并进缓存
//
// 格式错误的消息只记录日志后跳过，不会中断监听

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::actors::{ListStoreHandle, Snapshot};
use crate::event_bus::{DashboardEvent, EventBus};
use crate::sync::notification::Notification;

pub struct NotificationListener {
    bus: Arc<EventBus>,
    store: ListStoreHandle,
}

impl NotificationListener {
    pub fn new(bus: Arc<EventBus>, store: ListStoreHandle) -> Self {
        Self { bus, store }
    }

    /// 在后台启动监听
    ///
    /// 订阅在返回前完成，之后发布的消息都不会丢失
    pub fn spawn(self) -> JoinHandle<()> {
        let receiver = self.bus.subscribe();
        tokio::spawn(async move {
            self.run(receiver).await;
        })
    }

    async fn run(self, mut receiver: broadcast::Receiver<DashboardEvent>) {
        info!("通知监听已启动");

        loop {
            match receiver.recv().await {
                Ok(DashboardEvent::NotificationReceived { message }) => {
                    self.handle_message(&message).await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("通知监听处理过慢，跳过了 {} 条事件", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }

        info!("通知监听已停止");
    }

    /// 处理一条推送消息，缓存有变化时返回新快照
    pub async fn handle_message(&self, message: &str) -> Option<Snapshot> {
        let notification = match Notification::parse(message) {
            Ok(notification) => notification,
            Err(e) => {
                warn!("忽略推送消息: {}", e);
                self.bus.publish(DashboardEvent::NotificationIgnored {
                    tag: None,
                    reason: e.to_string(),
                });
                return None;
            }
        };

        if let Notification::Unknown { tag } = &notification {
            debug!("忽略未知类型的推送: {}", tag);
            self.bus.publish(DashboardEvent::NotificationIgnored {
                tag: Some(tag.clone()),
                reason: "未知的通知类型".to_string(),
            });
            return None;
        }

        let tag = notification.tag().to_string();
        match self.store.apply(notification).await {
            Ok(Some(snapshot)) => {
                debug!("{} 通知已合并到 {} 列表, 版本 {}", tag, snapshot.entity, snapshot.version);
                self.bus.publish(DashboardEvent::ListUpdated {
                    entity: snapshot.entity,
                    version: snapshot.version,
                });
                Some(snapshot)
            }
            Ok(None) => None,
            Err(e) => {
                error!("合并 {} 通知失败: {}", tag, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::ListStoreActor;
    use crate::models::{EntityKind, PersistedAppConfig, RecordList};
    use serde_json::json;
    use std::time::Duration;

    fn spawn_store() -> ListStoreHandle {
        let (actor, handle) = ListStoreActor::new(PersistedAppConfig::default().all_profiles());
        tokio::spawn(async move {
            actor.run().await;
        });
        handle
    }

    async fn seed_shipments(store: &ListStoreHandle) {
        let records: RecordList = serde_json::from_value(json!([
            {"id": 1, "state": "Requested", "documents": {"bol": "pending"}},
            {"id": 2, "state": "Requested", "documents": {"bol": "done"}}
        ]))
        .unwrap();
        store.replace(EntityKind::Shipment, records).await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_message_merges_and_publishes() {
        let bus = Arc::new(EventBus::new(16));
        let store = spawn_store();
        seed_shipments(&store).await;
        let listener = NotificationListener::new(bus.clone(), store.clone());
        let mut events = bus.subscribe();

        let snapshot = listener
            .handle_message(r#"{"type":"confirmShipment","contractId":2,"value":{"state":"Confirmed"}}"#)
            .await
            .expect("应当更新缓存");
        assert_eq!(snapshot.records[1]["state"], json!("Confirmed"));

        match events.try_recv() {
            Ok(DashboardEvent::ListUpdated { entity, version }) => {
                assert_eq!(entity, EntityKind::Shipment);
                assert_eq!(version, 2);
            }
            other => panic!("未收到预期事件: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_message_is_ignored() {
        let bus = Arc::new(EventBus::new(16));
        let store = spawn_store();
        seed_shipments(&store).await;
        let listener = NotificationListener::new(bus.clone(), store.clone());
        let mut events = bus.subscribe();

        assert!(listener.handle_message("{oops").await.is_none());
        assert!(matches!(
            events.try_recv(),
            Ok(DashboardEvent::NotificationIgnored { tag: None, .. })
        ));
        assert_eq!(store.get(EntityKind::Shipment).await.version, 1);
    }

    #[tokio::test]
    async fn test_spawned_listener_survives_bad_messages() {
        let bus = Arc::new(EventBus::new(16));
        let store = spawn_store();
        seed_shipments(&store).await;
        let mut events = bus.subscribe();
        let task = NotificationListener::new(bus.clone(), store.clone()).spawn();

        bus.publish_notification("not json at all");
        bus.publish_notification(r#"{"type":"unheardOf","id":1}"#);
        bus.publish_notification(r#"{"type":"confirmDelivery","contractId":1,"value":{"state":"Delivered"}}"#);

        let updated = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(DashboardEvent::ListUpdated { version, .. }) = events.recv().await {
                    return version;
                }
            }
        })
        .await
        .expect("监听器应当处理第三条消息");
        assert_eq!(updated, 2);

        let snapshot = store.get(EntityKind::Shipment).await;
        assert_eq!(snapshot.records[0]["state"], json!("Delivered"));
        assert!(!task.is_finished());
        task.abort();
    }

    #[tokio::test]
    async fn test_listener_keeps_running_after_lagging() {
        // 容量为 2 的总线，一次发布远超容量的消息，监听器必然落后
        let bus = Arc::new(EventBus::new(2));
        let store = spawn_store();
        seed_shipments(&store).await;
        let task = NotificationListener::new(bus.clone(), store.clone()).spawn();

        for i in 0..16 {
            bus.publish_notification(format!(r#"{{"type":"unheardOf","id":{}}}"#, i));
        }
        bus.publish_notification(r#"{"type":"confirmDelivery","contractId":2,"value":{"state":"Delivered"}}"#);

        let snapshot = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let snapshot = store.get(EntityKind::Shipment).await;
                if snapshot.version >= 2 {
                    return snapshot;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("落后之后监听器应当继续处理最新消息");

        assert_eq!(snapshot.records[1]["state"], json!("Delivered"));
        assert!(!task.is_finished());
        task.abort();
    }
}
