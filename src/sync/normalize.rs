// 记录规范化 - 把服务端的 `{key, value}` 记录展开为表格使用的扁平记录

use serde_json::Value;

use crate::models::{DomainRecord, EntityProfile, RecordList};

/// 规范化单条记录
///
/// - `{key, value}` 形式：`value` 的字段提升到顶层，`key` 的字段覆盖同名字段
/// - 按配置的别名提升嵌套字段（如运单的 `contractId`）
/// - 数值状态替换为状态标签
///
/// 已经是扁平形式的记录只做后两步
pub fn normalize(profile: &EntityProfile, raw: DomainRecord) -> DomainRecord {
    let mut record = flatten(raw);

    for alias in &profile.aliases {
        if let Some(value) = resolve(&record, &alias.pointer).cloned() {
            record.insert(alias.target.clone(), value);
        }
    }

    let label = record
        .get(&profile.state_field)
        .and_then(Value::as_u64)
        .and_then(|code| profile.status_label(code))
        .map(str::to_string);
    if let Some(label) = label {
        record.insert(profile.state_field.clone(), Value::String(label));
    }

    record
}

pub fn normalize_list(profile: &EntityProfile, raw: RecordList) -> RecordList {
    raw.into_iter().map(|record| normalize(profile, record)).collect()
}

fn flatten(mut raw: DomainRecord) -> DomainRecord {
    let is_wrapped = matches!(raw.get("key"), Some(Value::Object(_)))
        && matches!(raw.get("value"), Some(Value::Object(_)));
    if !is_wrapped {
        return raw;
    }

    let (Some(Value::Object(key)), Some(Value::Object(mut value))) =
        (raw.remove("key"), raw.remove("value"))
    else {
        return raw;
    };
    value.extend(key);
    value
}

/// 在记录上解析 JSON Pointer（首段为顶层字段名）
fn resolve<'a>(record: &'a DomainRecord, pointer: &str) -> Option<&'a Value> {
    let rest = pointer.strip_prefix('/')?;
    match rest.split_once('/') {
        Some((head, tail)) => record.get(head)?.pointer(&format!("/{}", tail)),
        None => record.get(rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;
    use serde_json::json;

    fn record(value: Value) -> DomainRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_wrapped_shipment() {
        let profile = EntityProfile::default_for(EntityKind::Shipment);
        let raw = record(json!({
            "key": {"id": "s-1"},
            "value": {
                "state": 1,
                "shipFrom": "Shanghai",
                "contract": {
                    "key": {"id": "c-7"},
                    "value": {"productName": "Cotton", "documents": {"bol": "pending"}}
                }
            }
        }));

        let flat = normalize(&profile, raw);
        assert_eq!(flat["id"], json!("s-1"));
        assert_eq!(flat["state"], json!("Requested"));
        assert_eq!(flat["contractId"], json!("c-7"));
        assert_eq!(flat["productName"], json!("Cotton"));
        assert_eq!(flat["documents"], json!({"bol": "pending"}));
        assert_eq!(flat["shipFrom"], json!("Shanghai"));
    }

    #[test]
    fn test_normalize_flat_record_only_labels_state() {
        let profile = EntityProfile::default_for(EntityKind::Proof);
        let flat = normalize(&profile, record(json!({"proofId": "p-1", "state": 2})));
        assert_eq!(flat, record(json!({"proofId": "p-1", "state": "Validated"})));
    }

    #[test]
    fn test_unknown_state_code_is_kept() {
        let profile = EntityProfile::default_for(EntityKind::Proof);
        let flat = normalize(&profile, record(json!({"id": 1, "state": 17})));
        assert_eq!(flat["state"], json!(17));
    }

    #[test]
    fn test_key_overrides_value_fields() {
        let profile = EntityProfile::default_for(EntityKind::Contract);
        let flat = normalize(
            &profile,
            record(json!({"key": {"id": "c-1"}, "value": {"id": "stale", "state": 1}})),
        );
        assert_eq!(flat["id"], json!("c-1"));
        assert_eq!(flat["state"], json!("Signed"));
    }
}
