// 列表视图会话 - 一个标签页的状态筛选、搜索和字段筛选
//
// 进入视图时创建空状态，离开视图时丢弃

use serde::Serialize;

use crate::error::SyncError;
use crate::models::{DomainRecord, EntityKind, EntityProfile, RecordList};
use crate::sync::{Facet, FilterState, FilterValue, ListFilter};

#[derive(Debug, Clone, Serialize)]
pub struct ListView {
    entity: EntityKind,
    #[serde(skip)]
    profile: EntityProfile,
    /// 状态筛选，空字符串表示全部
    status: String,
    /// 搜索关键字
    search: String,
    filters: FilterState,
}

impl ListView {
    pub fn new(entity: EntityKind, profile: EntityProfile) -> Self {
        Self {
            entity,
            profile,
            status: String::new(),
            search: String::new(),
            filters: FilterState::new(),
        }
    }

    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    pub fn profile(&self) -> &EntityProfile {
        &self.profile
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// 设置状态筛选，只接受空字符串（全部）或配置表中的状态
    pub fn set_status(&mut self, status: impl Into<String>) -> Result<(), SyncError> {
        let status = status.into();
        if !status.is_empty() && !self.profile.is_known_status(&status) {
            return Err(SyncError::InvalidArgument(format!(
                "{} 没有状态: {}",
                self.entity.display_name(),
                status
            )));
        }
        self.status = status;
        Ok(())
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn set_filter(&mut self, field: impl Into<String>, value: FilterValue) {
        self.filters.set(field, value);
    }

    pub fn clear_filter(&mut self, field: &str) {
        self.filters.clear(field);
    }

    /// 清空所有筛选条件
    pub fn reset(&mut self) {
        self.status.clear();
        self.search.clear();
        self.filters.clear_all();
    }

    /// 计算当前可见的记录
    pub fn visible(&self, records: &[DomainRecord]) -> RecordList {
        ListFilter::new(&self.profile).apply(records, &self.status, &self.search, &self.filters)
    }

    /// 基于未筛选列表生成筛选项
    pub fn facets(&self, records: &[DomainRecord]) -> Vec<Facet> {
        ListFilter::new(&self.profile).facet_table(records)
    }
}
