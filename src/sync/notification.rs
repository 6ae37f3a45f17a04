// 推送通知 - 把推送通道上的 JSON 文本解析为带标签的通知

use serde_json::{Map, Value};

use crate::error::SyncError;
use crate::models::{DomainRecord, EntityKind};

/// 推送通道上订阅的事件名
pub const NOTIFICATION_EVENT: &str = "notification";

/// 已识别的通知类型
///
/// 每种类型都显式声明：影响哪种实体、通知里用哪个字段携带主键、
/// 以及该主键与记录中哪个字段比较
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Place,
    AcceptOrder,
    ShipmentRequested,
    ShipmentConfirmed,
    ConfirmShipment,
    ConfirmDelivery,
    Proof,
    GenerateProof,
    ValidateProof,
    ContractCreated,
    PlaceInvoice,
    PlaceInvoiceForTrade,
    AcceptInvoice,
    PlaceBid,
    AcceptBid,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 15] = [
        Self::Place,
        Self::AcceptOrder,
        Self::ShipmentRequested,
        Self::ShipmentConfirmed,
        Self::ConfirmShipment,
        Self::ConfirmDelivery,
        Self::Proof,
        Self::GenerateProof,
        Self::ValidateProof,
        Self::ContractCreated,
        Self::PlaceInvoice,
        Self::PlaceInvoiceForTrade,
        Self::AcceptInvoice,
        Self::PlaceBid,
        Self::AcceptBid,
    ];

    /// 通知中的 `type` 标签
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Place => "place",
            Self::AcceptOrder => "acceptOrder",
            Self::ShipmentRequested => "shipmentRequested",
            Self::ShipmentConfirmed => "shipmentConfirmed",
            Self::ConfirmShipment => "confirmShipment",
            Self::ConfirmDelivery => "confirmDelivery",
            Self::Proof => "proof",
            Self::GenerateProof => "generateProof",
            Self::ValidateProof => "validateProof",
            Self::ContractCreated => "contractCreated",
            Self::PlaceInvoice => "placeInvoice",
            Self::PlaceInvoiceForTrade => "placeInvoiceForTrade",
            Self::AcceptInvoice => "acceptInvoice",
            Self::PlaceBid => "placeBid",
            Self::AcceptBid => "acceptBid",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// 受影响的实体类型
    pub fn entity(&self) -> EntityKind {
        match self {
            Self::Place | Self::AcceptOrder => EntityKind::Order,
            Self::ShipmentRequested
            | Self::ShipmentConfirmed
            | Self::ConfirmShipment
            | Self::ConfirmDelivery => EntityKind::Shipment,
            Self::Proof | Self::GenerateProof | Self::ValidateProof => EntityKind::Proof,
            Self::ContractCreated => EntityKind::Contract,
            Self::PlaceInvoice | Self::PlaceInvoiceForTrade | Self::AcceptInvoice => {
                EntityKind::Invoice
            }
            Self::PlaceBid | Self::AcceptBid => EntityKind::Bid,
        }
    }

    /// 通知里携带主键的字段
    pub fn key_field(&self) -> &'static str {
        match self {
            Self::ShipmentRequested
            | Self::ShipmentConfirmed
            | Self::ConfirmShipment
            | Self::ConfirmDelivery
            | Self::Proof
            | Self::GenerateProof => "contractId",
            Self::ValidateProof => "proofId",
            _ => "id",
        }
    }

    /// 记录里与主键比较的字段
    pub fn record_key_field(&self) -> &'static str {
        match self {
            // 运单列表以运单 id 展示，通知携带的是对应合同 id
            Self::ShipmentRequested
            | Self::ShipmentConfirmed
            | Self::ConfirmShipment
            | Self::ConfirmDelivery => "id",
            Self::Proof | Self::GenerateProof => "contractId",
            Self::ValidateProof => "proofId",
            _ => "id",
        }
    }
}

/// 针对单条记录的变更事件
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEvent {
    pub kind: NotificationKind,
    /// 被修改记录的主键
    pub key: Value,
    /// 服务端当前的记录快照，整体替换列表中的对应记录
    pub snapshot: DomainRecord,
}

impl RecordEvent {
    pub fn entity(&self) -> EntityKind {
        self.kind.entity()
    }

    /// 替换快照（用于合并前的规范化）
    pub fn map_snapshot(self, f: impl FnOnce(DomainRecord) -> DomainRecord) -> Self {
        Self {
            snapshot: f(self.snapshot),
            ..self
        }
    }
}

/// 推送通知
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// 已识别的记录变更
    Record(RecordEvent),
    /// 无法识别的类型，合并时忽略
    Unknown { tag: String },
}

impl Notification {
    /// 解析推送文本
    ///
    /// 快照取自 `value` 字段；没有 `value` 时依次尝试 `data.value`，
    /// 都没有则把消息中除 `type` 外的其余字段当作快照。
    pub fn parse(message: &str) -> Result<Self, SyncError> {
        let value: Value = serde_json::from_str(message)
            .map_err(|e| SyncError::MalformedNotification(format!("JSON 解析失败: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, SyncError> {
        let Value::Object(mut fields) = value else {
            return Err(SyncError::MalformedNotification(
                "通知必须是 JSON 对象".to_string(),
            ));
        };

        let tag = match fields.remove("type") {
            Some(Value::String(tag)) => tag,
            Some(other) => {
                return Err(SyncError::MalformedNotification(format!(
                    "type 字段必须是字符串，实际为: {}",
                    other
                )))
            }
            None => {
                return Err(SyncError::MalformedNotification(
                    "缺少 type 字段".to_string(),
                ))
            }
        };

        let Some(kind) = NotificationKind::from_tag(&tag) else {
            return Ok(Notification::Unknown { tag });
        };

        let key = match fields.get(kind.key_field()) {
            Some(key @ (Value::String(_) | Value::Number(_))) => key.clone(),
            _ => {
                return Err(SyncError::MalformedNotification(format!(
                    "{} 通知缺少主键字段 {}",
                    tag,
                    kind.key_field()
                )))
            }
        };

        let snapshot = extract_snapshot(&tag, fields)?;
        Ok(Notification::Record(RecordEvent { kind, key, snapshot }))
    }

    /// 通知类型标签
    pub fn tag(&self) -> &str {
        match self {
            Notification::Record(event) => event.kind.tag(),
            Notification::Unknown { tag } => tag,
        }
    }
}

fn extract_snapshot(tag: &str, mut fields: Map<String, Value>) -> Result<DomainRecord, SyncError> {
    let embedded = match fields.remove("value") {
        Some(value) => Some(value),
        None => match fields.get_mut("data") {
            Some(Value::Object(data)) => data.remove("value"),
            _ => None,
        },
    };

    match embedded {
        Some(Value::Object(snapshot)) => Ok(snapshot),
        Some(other) => Err(SyncError::MalformedNotification(format!(
            "{} 通知的 value 必须是对象，实际为: {}",
            tag, other
        ))),
        None => Ok(fields),
    }
}
