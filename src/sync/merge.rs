// 通知合并 - 把一条推送通知折叠进缓存的记录列表
//
// 写时复制：输入列表从不原地修改，调用方以返回值作为新的数据源

use crate::models::{DomainRecord, RecordList};
use crate::sync::notification::{Notification, RecordEvent};
use crate::utils::values_match;

/// 查找通知对应的记录下标
pub fn locate(list: &[DomainRecord], event: &RecordEvent) -> Option<usize> {
    let field = event.kind.record_key_field();
    list.iter().position(|record| {
        record
            .get(field)
            .map(|value| values_match(value, &event.key))
            .unwrap_or(false)
    })
}

/// 应用通知，记录不在列表中或通知类型未知时返回 None
pub fn apply(list: &[DomainRecord], notification: &Notification) -> Option<RecordList> {
    let Notification::Record(event) = notification else {
        return None;
    };
    let index = locate(list, event)?;

    let mut replacement = event.snapshot.clone();
    let key_field = event.kind.record_key_field();
    if !replacement.contains_key(key_field) {
        // 快照未带主键时沿用旧值，保证后续通知仍能定位到这条记录
        if let Some(old_key) = list[index].get(key_field) {
            replacement.insert(key_field.to_string(), old_key.clone());
        }
    }

    let mut next = list.to_vec();
    next[index] = replacement;
    Some(next)
}

/// 合并通知，无匹配时返回与输入相同的列表
pub fn merge(list: &[DomainRecord], notification: &Notification) -> RecordList {
    apply(list, notification).unwrap_or_else(|| list.to_vec())
}
