// List Store Actor - 使用Actor模式管理缓存的记录列表
//
// 每种实体持有一份不可变快照，所有写操作经由消息队列串行执行，
// 读操作只拿到 Arc 快照，不会看到写到一半的列表

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::models::{EntityKind, EntityProfile, RecordList};
use crate::sync::merge;
use crate::sync::normalize::{normalize, normalize_list};
use crate::sync::notification::Notification;

/// 某种实体在某一时刻的列表快照
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub entity: EntityKind,
    pub records: Arc<RecordList>,
    /// 每次替换或有效合并后递增
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty(entity: EntityKind) -> Self {
        Self {
            entity,
            records: Arc::new(Vec::new()),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 列表缓存命令
pub enum ListStoreCommand {
    /// 用拉取结果整体替换（后写入者生效）
    Replace {
        entity: EntityKind,
        records: RecordList,
        reply: oneshot::Sender<Snapshot>,
    },

    /// 合并一条推送通知，无变化时回复 None
    Apply {
        notification: Notification,
        reply: oneshot::Sender<Option<Snapshot>>,
    },

    /// 获取快照
    Get {
        entity: EntityKind,
        reply: oneshot::Sender<Snapshot>,
    },

    /// 健康检查
    HealthCheck { reply: oneshot::Sender<()> },
}

/// 列表缓存Actor
pub struct ListStoreActor {
    receiver: mpsc::Receiver<ListStoreCommand>,
    profiles: BTreeMap<EntityKind, EntityProfile>,
    snapshots: HashMap<EntityKind, Snapshot>, // 无需RwLock
}

impl ListStoreActor {
    /// 创建新的Actor
    pub fn new(profiles: BTreeMap<EntityKind, EntityProfile>) -> (Self, ListStoreHandle) {
        let (sender, receiver) = mpsc::channel(100);
        let actor = Self {
            receiver,
            profiles,
            snapshots: HashMap::new(),
        };
        let handle = ListStoreHandle { sender };
        (actor, handle)
    }

    /// 运行Actor
    pub async fn run(mut self) {
        tracing::info!("List Store Actor 已启动");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                ListStoreCommand::Replace {
                    entity,
                    records,
                    reply,
                } => {
                    let snapshot = self.replace(entity, records);
                    let _ = reply.send(snapshot);
                }

                ListStoreCommand::Apply {
                    notification,
                    reply,
                } => {
                    let _ = reply.send(self.apply(notification));
                }

                ListStoreCommand::Get { entity, reply } => {
                    let _ = reply.send(self.snapshot(entity));
                }

                ListStoreCommand::HealthCheck { reply } => {
                    let _ = reply.send(());
                }
            }
        }

        tracing::info!("List Store Actor 已停止");
    }

    fn profile(&self, entity: EntityKind) -> EntityProfile {
        self.profiles
            .get(&entity)
            .cloned()
            .unwrap_or_else(|| EntityProfile::default_for(entity))
    }

    fn snapshot(&self, entity: EntityKind) -> Snapshot {
        self.snapshots
            .get(&entity)
            .cloned()
            .unwrap_or_else(|| Snapshot::empty(entity))
    }

    fn replace(&mut self, entity: EntityKind, records: RecordList) -> Snapshot {
        let profile = self.profile(entity);
        let version = self.snapshot(entity).version + 1;
        let snapshot = Snapshot {
            entity,
            records: Arc::new(normalize_list(&profile, records)),
            version,
            updated_at: Utc::now(),
        };
        tracing::debug!("{} 列表已替换: {} 条, 版本 {}", entity, snapshot.len(), version);
        self.snapshots.insert(entity, snapshot.clone());
        snapshot
    }

    fn apply(&mut self, notification: Notification) -> Option<Snapshot> {
        let event = match notification {
            Notification::Record(event) => event,
            Notification::Unknown { tag } => {
                tracing::debug!("忽略未知类型的通知: {}", tag);
                return None;
            }
        };

        let entity = event.entity();
        let profile = self.profile(entity);
        let event = event.map_snapshot(|snapshot| normalize(&profile, snapshot));
        let current = self.snapshot(entity);

        let Some(records) = merge::apply(&current.records, &Notification::Record(event)) else {
            tracing::debug!("{} 通知对应的记录不在当前列表中，跳过", entity);
            return None;
        };

        let snapshot = Snapshot {
            entity,
            records: Arc::new(records),
            version: current.version + 1,
            updated_at: Utc::now(),
        };
        self.snapshots.insert(entity, snapshot.clone());
        Some(snapshot)
    }
}

/// 列表缓存Handle
#[derive(Clone)]
pub struct ListStoreHandle {
    sender: mpsc::Sender<ListStoreCommand>,
}

impl ListStoreHandle {
    /// 整体替换某种实体的列表
    pub async fn replace(&self, entity: EntityKind, records: RecordList) -> Result<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(ListStoreCommand::Replace {
                entity,
                records,
                reply,
            })
            .await
            .map_err(|_| anyhow!("List Store Actor 已停止"))?;
        rx.await.map_err(|_| anyhow!("List Store Actor 未响应"))
    }

    /// 合并推送通知，返回更新后的快照（无变化时为 None）
    pub async fn apply(&self, notification: Notification) -> Result<Option<Snapshot>> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(ListStoreCommand::Apply {
                notification,
                reply,
            })
            .await
            .map_err(|_| anyhow!("List Store Actor 已停止"))?;
        rx.await.map_err(|_| anyhow!("List Store Actor 未响应"))
    }

    /// 获取快照，Actor 不可用时返回空快照
    pub async fn get(&self, entity: EntityKind) -> Snapshot {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(ListStoreCommand::Get { entity, reply })
            .await
            .ok();
        rx.await.unwrap_or_else(|_| Snapshot::empty(entity))
    }

    /// 健康检查
    pub async fn health_check(&self) -> bool {
        let (reply, rx) = oneshot::channel();

        if self
            .sender
            .send(ListStoreCommand::HealthCheck { reply })
            .await
            .is_err()
        {
            tracing::warn!("List Store Actor 健康检查失败: 通道已关闭");
            return false;
        }

        match tokio::time::timeout(std::time::Duration::from_secs(5), rx).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => {
                tracing::warn!("List Store Actor 健康检查失败: Actor已停止");
                false
            }
            Err(_) => {
                tracing::warn!("List Store Actor 健康检查失败: 响应超时");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersistedAppConfig;
    use serde_json::{json, Value};

    fn spawn_store() -> ListStoreHandle {
        let (actor, handle) = ListStoreActor::new(PersistedAppConfig::default().all_profiles());
        tokio::spawn(async move {
            actor.run().await;
        });
        handle
    }

    fn records(value: Value) -> RecordList {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_replace_normalizes_and_bumps_version() {
        let handle = spawn_store();
        let raw = records(json!([
            {"key": {"id": "s-1"}, "value": {"state": 1, "contract": {"key": {"id": "c-1"}, "value": {}}}}
        ]));

        let first = handle.replace(EntityKind::Shipment, raw.clone()).await.unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(first.records[0]["state"], json!("Requested"));
        assert_eq!(first.records[0]["contractId"], json!("c-1"));

        let second = handle.replace(EntityKind::Shipment, Vec::new()).await.unwrap();
        assert_eq!(second.version, 2);
        assert!(handle.get(EntityKind::Shipment).await.is_empty());
        // 旧快照不受影响
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_notification_updates_only_matching_entity() {
        let handle = spawn_store();
        handle
            .replace(
                EntityKind::Shipment,
                records(json!([
                    {"id": 1, "state": "Requested"},
                    {"id": 2, "state": "Requested"}
                ])),
            )
            .await
            .unwrap();

        let n = Notification::parse(r#"{"type":"confirmShipment","contractId":2,"value":{"state":2}}"#)
            .unwrap();
        let updated = handle.apply(n).await.unwrap().expect("应当产生新快照");
        assert_eq!(updated.version, 2);
        assert_eq!(updated.records[1]["state"], json!("Confirmed"));
        assert_eq!(updated.records[1]["id"], json!(2));
        assert_eq!(handle.get(EntityKind::Order).await.version, 0);
    }

    #[tokio::test]
    async fn test_apply_missing_record_keeps_version() {
        let handle = spawn_store();
        handle
            .replace(EntityKind::Proof, records(json!([{"proofId": "p-1", "state": 1}])))
            .await
            .unwrap();

        let n = Notification::parse(r#"{"type":"validateProof","proofId":"p-404","state":2}"#).unwrap();
        assert!(handle.apply(n).await.unwrap().is_none());
        assert!(handle
            .apply(Notification::Unknown { tag: "noop".to_string() })
            .await
            .unwrap()
            .is_none());
        assert_eq!(handle.get(EntityKind::Proof).await.version, 1);
    }

    #[tokio::test]
    async fn test_list_store_health_check() {
        let handle = spawn_store();
        assert!(handle.health_check().await, "ListStoreActor应该是健康的");
    }

    #[tokio::test]
    async fn test_stopped_actor() {
        let (actor, handle) = ListStoreActor::new(BTreeMap::new());
        drop(actor);

        assert!(!handle.health_check().await, "停止的Actor应该健康检查失败");
        assert!(handle.replace(EntityKind::Bid, Vec::new()).await.is_err());
        assert_eq!(handle.get(EntityKind::Bid).await.version, 0);
    }
}
