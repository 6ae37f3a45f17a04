//! JSON 字段访问工具
//!
//! 提供记录字段的路径查找、文本化和宽松相等比较

use serde_json::Value;

use crate::models::DomainRecord;

/// 按路径查找记录字段
///
/// 路径以 `.` 分隔，如 `documents.bol`；数组可用数字下标。
/// 记录中恰好存在同名字段（含 `.`）时优先返回该字段。
///
/// # 参数
/// - `record`: 记录
/// - `path`: 字段路径
///
/// # 返回
/// - `Some(&Value)`: 找到的字段值
/// - `None`: 路径上任一段不存在
pub fn lookup<'a>(record: &'a DomainRecord, path: &str) -> Option<&'a Value> {
    if let Some(value) = record.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// 标量值的文本形式（字符串、数字、布尔），其他类型返回 None
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 任意值用于搜索的文本形式，null 返回 None
pub fn search_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        _ => scalar_text(value),
    }
}

/// 通知主键比较用的宽松相等：JSON 相等，或两者均为标量且文本形式相同（`2` 与 `"2"`）
pub fn values_match(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (scalar_text(a), scalar_text(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
