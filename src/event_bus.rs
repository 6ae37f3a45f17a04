// 事件总线 - 用于模块间解耦通信
//
// 推送通道、数据拉取和视图之间通过事件总线通信
// 使用 tokio::sync::broadcast 实现高效的事件分发

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::models::EntityKind;

/// 仪表盘事件枚举 - 定义所有可能的同步事件
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    // --- 推送事件 ---

    /// 推送通道收到原始消息（由外部传输层发布）
    NotificationReceived {
        message: String,
    },

    /// 推送消息被忽略（格式错误或类型未知）
    NotificationIgnored {
        tag: Option<String>,
        reason: String,
    },

    // --- 数据事件 ---

    /// 列表拉取完成
    ListFetched {
        entity: EntityKind,
        count: usize,
        fetched_at: DateTime<Utc>,
    },

    /// 列表拉取失败，缓存保持不变
    FetchFailed {
        entity: EntityKind,
        error: String,
    },

    /// 缓存列表已更新（拉取或合并通知之后）
    ListUpdated {
        entity: EntityKind,
        version: u64,
    },
}

/// 事件总线 - 用于模块间解耦通信
///
/// 使用 broadcast channel 实现发布/订阅模式
/// 支持多个订阅者同时接收事件
pub struct EventBus {
    sender: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    /// 创建新的事件总线
    ///
    /// # 参数
    /// - `capacity`: 事件缓冲区大小,建议 100-1000
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 发布事件
    ///
    /// 如果没有订阅者,事件会被丢弃(这是正常的)
    pub fn publish(&self, event: DashboardEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                tracing::trace!("事件已发布，订阅者数量: {}", receiver_count);
            }
            Err(_) => {
                tracing::trace!("事件已发布但无订阅者");
            }
        }
    }

    /// 发布推送通道收到的原始消息
    pub fn publish_notification(&self, message: impl Into<String>) {
        self.publish(DashboardEvent::NotificationReceived {
            message: message.into(),
        });
    }

    /// 订阅事件
    ///
    /// 返回一个接收器,可以用 `.recv().await` 接收事件
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    /// 获取当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_basic() {
        let bus = EventBus::new(100);

        let mut receiver = bus.subscribe();

        bus.publish_notification(r#"{"type":"place","id":1}"#);

        match receiver.recv().await {
            Ok(DashboardEvent::NotificationReceived { message }) => {
                assert!(message.contains("place"));
            }
            _ => panic!("未收到预期事件"),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(100);

        let mut receiver1 = bus.subscribe();
        let mut receiver2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(DashboardEvent::ListUpdated {
            entity: EntityKind::Shipment,
            version: 1,
        });

        // 两个订阅者都应该收到事件
        assert!(receiver1.try_recv().is_ok());
        assert!(receiver2.try_recv().is_ok());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        bus.publish(DashboardEvent::FetchFailed {
            entity: EntityKind::Bid,
            error: "timeout".to_string(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
