// 列表筛选 - 状态、全文搜索和按字段筛选，以及筛选项（facet）推导

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{DomainRecord, EntityProfile, RecordList};
use crate::utils::{lookup, search_text};

/// 单个字段的筛选条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// 字段值为对象，条件中每个子字段都必须匹配（如运单的单据状态）
    MatchesSubfields(Map<String, Value>),
    /// 字段值必须等于该值
    Equals(Value),
}

impl FilterValue {
    pub fn matches(&self, field: Option<&Value>) -> bool {
        let Some(field) = field else {
            return false;
        };
        match self {
            FilterValue::Equals(expected) => field == expected,
            FilterValue::MatchesSubfields(expected) => match field {
                Value::Object(actual) => expected.iter().all(|(key, value)| {
                    actual
                        .get(key)
                        .map(|v| v == value)
                        .unwrap_or(false)
                }),
                _ => false,
            },
        }
    }
}

/// 按字段筛选的状态，每个视图会话单独持有一份
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterState {
    fields: BTreeMap<String, FilterValue>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.fields.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.fields.iter()
    }

    /// 设置字段筛选条件
    ///
    /// 子字段条件会与该字段已有的子字段条件合并（同名键后者覆盖），
    /// 标量条件直接覆盖
    pub fn set(&mut self, field: impl Into<String>, value: FilterValue) {
        let field = field.into();
        match value {
            FilterValue::MatchesSubfields(update) => {
                if let Some(FilterValue::MatchesSubfields(existing)) = self.fields.get_mut(&field) {
                    existing.extend(update);
                } else {
                    self.fields.insert(field, FilterValue::MatchesSubfields(update));
                }
            }
            value => {
                self.fields.insert(field, value);
            }
        }
    }

    pub fn clear(&mut self, field: &str) -> Option<FilterValue> {
        self.fields.remove(field)
    }

    pub fn clear_all(&mut self) {
        self.fields.clear();
    }

    /// 记录是否满足所有字段条件，缺失的字段视为不匹配
    pub fn matches(&self, record: &DomainRecord) -> bool {
        self.fields
            .iter()
            .all(|(field, value)| value.matches(lookup(record, field)))
    }
}

/// 某个字段的可选值集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub field: String,
    pub values: Vec<Value>,
}

/// 列表筛选器
pub struct ListFilter<'a> {
    profile: &'a EntityProfile,
}

impl<'a> ListFilter<'a> {
    pub fn new(profile: &'a EntityProfile) -> Self {
        Self { profile }
    }

    /// 状态条件，空字符串表示不限
    pub fn matches_status(&self, record: &DomainRecord, status: &str) -> bool {
        if status.is_empty() {
            return true;
        }
        lookup(record, &self.profile.state_field)
            .map(|state| state.as_str() == Some(status))
            .unwrap_or(false)
    }

    /// 全文搜索条件，空字符串表示不限
    pub fn matches_search(&self, record: &DomainRecord, search: &str) -> bool {
        if search.is_empty() {
            return true;
        }
        let needle = if self.profile.case_sensitive {
            search.to_string()
        } else {
            search.to_lowercase()
        };

        self.profile.searchable_fields.iter().any(|field| {
            lookup(record, field)
                .and_then(search_text)
                .map(|text| {
                    if self.profile.case_sensitive {
                        text.contains(&needle)
                    } else {
                        text.to_lowercase().contains(&needle)
                    }
                })
                .unwrap_or(false)
        })
    }

    pub fn matches(
        &self,
        record: &DomainRecord,
        status: &str,
        search: &str,
        filters: &FilterState,
    ) -> bool {
        self.matches_status(record, status)
            && self.matches_search(record, search)
            && filters.matches(record)
    }

    /// 计算可见记录，保持原有顺序
    pub fn apply(
        &self,
        list: &[DomainRecord],
        status: &str,
        search: &str,
        filters: &FilterState,
    ) -> RecordList {
        list.iter()
            .filter(|record| self.matches(record, status, search, filters))
            .cloned()
            .collect()
    }

    /// 为配置中的每个筛选字段生成可选值
    pub fn facet_table(&self, list: &[DomainRecord]) -> Vec<Facet> {
        self.profile
            .filter_by
            .iter()
            .map(|field| Facet {
                field: field.clone(),
                values: facets(list, field),
            })
            .collect()
    }
}

/// 字段在未筛选列表中的不同取值，按首次出现顺序，忽略缺失值和 null
pub fn facets(list: &[DomainRecord], field: &str) -> Vec<Value> {
    let mut values: Vec<Value> = Vec::new();
    for value in list.iter().filter_map(|record| lookup(record, field)) {
        if value.is_null() || values.contains(value) {
            continue;
        }
        values.push(value.clone());
    }
    values
}
