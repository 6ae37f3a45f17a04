// 仪表盘领域管理器
//
// 负责列表拉取、操作提交和视图会话
// 包含 Backend、ListStoreHandle 和 EventBus 三个核心组件

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::actors::{ListStoreHandle, Snapshot};
use crate::api::{Backend, RequestState};
use crate::event_bus::{DashboardEvent, EventBus};
use crate::models::{EntityKind, EntityProfile, RecordList};
use crate::sync::Facet;
use crate::view::ListView;

/// 仪表盘领域管理器
#[derive(Clone)]
pub struct DashboardDomain {
    backend: Arc<dyn Backend>,
    store: ListStoreHandle,
    event_bus: Arc<EventBus>,
    profiles: BTreeMap<EntityKind, EntityProfile>,
}

impl DashboardDomain {
    /// 创建新的仪表盘领域管理器
    pub fn new(
        backend: Arc<dyn Backend>,
        store: ListStoreHandle,
        event_bus: Arc<EventBus>,
        profiles: BTreeMap<EntityKind, EntityProfile>,
    ) -> Self {
        Self {
            backend,
            store,
            event_bus,
            profiles,
        }
    }

    /// 获取列表缓存
    pub fn get_store(&self) -> &ListStoreHandle {
        &self.store
    }

    /// 获取事件总线
    pub fn get_event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn profile(&self, entity: EntityKind) -> EntityProfile {
        self.profiles
            .get(&entity)
            .cloned()
            .unwrap_or_else(|| EntityProfile::default_for(entity))
    }

    /// 重新拉取某种实体的列表
    ///
    /// 拉取失败时保留现有缓存并返回当前快照，只有缓存 Actor 不可用时才返回错误
    pub async fn refresh(&self, entity: EntityKind) -> Result<Snapshot> {
        let profile = self.profile(entity);

        let records = match self.backend.fetch_list(&profile.list_method, &[]).await {
            Ok(records) => records,
            Err(e) => {
                warn!("拉取 {} 列表失败，保留缓存: {}", entity, e);
                self.event_bus.publish(DashboardEvent::FetchFailed {
                    entity,
                    error: e.to_string(),
                });
                return Ok(self.store.get(entity).await);
            }
        };

        let snapshot = self.store.replace(entity, records).await?;
        info!("{} 列表已刷新: {} 条", entity, snapshot.len());

        self.event_bus.publish(DashboardEvent::ListFetched {
            entity,
            count: snapshot.len(),
            fetched_at: Utc::now(),
        });
        self.event_bus.publish(DashboardEvent::ListUpdated {
            entity,
            version: snapshot.version,
        });
        Ok(snapshot)
    }

    /// 刷新所有实体的列表，各实体互不影响
    pub async fn refresh_all(&self) -> BTreeMap<EntityKind, Snapshot> {
        let mut snapshots = BTreeMap::new();
        for entity in EntityKind::ALL {
            match self.refresh(entity).await {
                Ok(snapshot) => {
                    snapshots.insert(entity, snapshot);
                }
                Err(e) => error!("刷新 {} 列表失败: {}", entity, e),
            }
        }
        snapshots
    }

    /// 提交操作
    pub async fn submit(&self, method: &str, body: &Value) -> RequestState {
        let state = self.backend.submit(method, body).await;
        if state.error {
            warn!("操作 {} 提交失败", method);
        } else {
            info!("操作 {} 提交成功", method);
        }
        state
    }

    /// 当前快照
    pub async fn snapshot(&self, entity: EntityKind) -> Snapshot {
        self.store.get(entity).await
    }

    /// 创建新的视图会话
    pub fn view(&self, entity: EntityKind) -> ListView {
        ListView::new(entity, self.profile(entity))
    }

    /// 视图当前可见的记录
    pub async fn visible(&self, view: &ListView) -> RecordList {
        let snapshot = self.store.get(view.entity()).await;
        view.visible(&snapshot.records)
    }

    /// 视图的筛选项
    pub async fn facets(&self, view: &ListView) -> Vec<Facet> {
        let snapshot = self.store.get(view.entity()).await;
        view.facets(&snapshot.records)
    }
}
