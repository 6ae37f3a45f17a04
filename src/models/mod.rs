// 数据模型模块 - 定义所有的数据结构

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SyncError;

/// 单条业务记录（订单、运单、证明、发票、竞价、合同）
pub type DomainRecord = Map<String, Value>;

/// 记录列表，顺序与上次拉取时服务端返回的顺序一致
pub type RecordList = Vec<DomainRecord>;

/// 业务实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Order,
    Shipment,
    Proof,
    Invoice,
    Bid,
    Contract,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Order,
        EntityKind::Shipment,
        EntityKind::Proof,
        EntityKind::Invoice,
        EntityKind::Bid,
        EntityKind::Contract,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Shipment => "shipment",
            Self::Proof => "proof",
            Self::Invoice => "invoice",
            Self::Bid => "bid",
            Self::Contract => "contract",
        }
    }

    /// 仪表盘标签页名称
    pub fn display_name(&self) -> &str {
        match self {
            Self::Order => "orders",
            Self::Shipment => "shipping documents",
            Self::Proof => "proofs",
            Self::Invoice => "invoices",
            Self::Bid => "bids",
            Self::Contract => "contracts",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.display_name() == s)
            .ok_or_else(|| SyncError::UnknownEntity(s.to_string()))
    }
}

/// 字段别名：把原始记录中某个 JSON Pointer 位置的值提升为顶层字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAlias {
    /// 目标字段名
    pub target: String,
    /// 源位置（相对于原始记录，如 `/contract/key/id`）
    pub pointer: String,
}

impl FieldAlias {
    pub fn new(target: &str, pointer: &str) -> Self {
        Self {
            target: target.to_string(),
            pointer: pointer.to_string(),
        }
    }
}

fn default_state_field() -> String {
    "state".to_string()
}

/// 实体配置表
///
/// 每种实体的状态标签、可搜索字段、筛选字段都在这里显式声明，
/// 不在运行时根据数据形状推断
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProfile {
    /// 列表查询方法名（如 `listShipments`）
    pub list_method: String,
    /// 状态标签，下标即服务端的数值状态
    pub statuses: Vec<String>,
    /// 状态字段
    #[serde(default = "default_state_field")]
    pub state_field: String,
    /// 参与全文搜索的字段（支持 `documents.bol` 形式的嵌套路径）
    #[serde(default)]
    pub searchable_fields: Vec<String>,
    /// 侧边栏可筛选的字段
    #[serde(default)]
    pub filter_by: Vec<String>,
    /// 搜索是否区分大小写
    #[serde(default)]
    pub case_sensitive: bool,
    /// 规范化时需要提升的嵌套字段
    #[serde(default)]
    pub aliases: Vec<FieldAlias>,
}

impl EntityProfile {
    fn build(
        list_method: &str,
        statuses: &[&str],
        searchable_fields: &[&str],
        filter_by: &[&str],
    ) -> Self {
        Self {
            list_method: list_method.to_string(),
            statuses: statuses.iter().map(|s| s.to_string()).collect(),
            state_field: default_state_field(),
            searchable_fields: searchable_fields.iter().map(|s| s.to_string()).collect(),
            filter_by: filter_by.iter().map(|s| s.to_string()).collect(),
            case_sensitive: false,
            aliases: Vec::new(),
        }
    }

    /// 默认配置表
    pub fn default_for(entity: EntityKind) -> Self {
        match entity {
            EntityKind::Order => Self::build(
                "listOrders",
                &["Unknown", "New", "Accepted", "Rejected"],
                &["id", "productName", "buyer", "destination"],
                &["productName", "destination"],
            ),
            EntityKind::Shipment => {
                let mut profile = Self::build(
                    "listShipments",
                    &["Unknown", "Requested", "Confirmed", "Delivered"],
                    &["id", "contractId", "productName", "shipFrom", "shipTo", "documents.bol"],
                    &["productName", "documents"],
                );
                profile.aliases = vec![
                    FieldAlias::new("contractId", "/contract/key/id"),
                    FieldAlias::new("documents", "/contract/value/documents"),
                    FieldAlias::new("productName", "/contract/value/productName"),
                ];
                profile
            }
            EntityKind::Proof => Self::build(
                "listProofs",
                &["Unknown", "Generated", "Validated"],
                &["id", "proofId", "contractId", "agency"],
                &["agency"],
            ),
            EntityKind::Invoice => Self::build(
                "listInvoices",
                &["Unknown", "Issued", "Signed", "Rejected", "For sale", "Removed", "Sold"],
                &["id", "debtor", "beneficiary"],
                &["debtor", "beneficiary"],
            ),
            EntityKind::Bid => Self::build(
                "listBids",
                &["Unknown", "Issued", "Canceled", "Accepted"],
                &["id", "invoiceId", "factor"],
                &["invoiceId", "factor"],
            ),
            EntityKind::Contract => Self::build(
                "listContracts",
                &["Unknown", "Signed", "Completed"],
                &["id", "consignorName", "consigneeName", "destination"],
                &["consignorName", "consigneeName", "destination"],
            ),
        }
    }

    /// 数值状态对应的标签
    pub fn status_label(&self, code: u64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|index| self.statuses.get(index))
            .map(String::as_str)
    }

    pub fn is_known_status(&self, status: &str) -> bool {
        self.statuses.iter().any(|s| s == status)
    }
}

/// 链码方法描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    /// 链码方法名
    pub cc_method: String,
    pub channel: Option<String>,
    pub chaincode: Option<String>,
}

impl MethodSpec {
    fn on(chaincode: &str, cc_method: &str) -> Self {
        Self {
            cc_method: cc_method.to_string(),
            channel: Some("common".to_string()),
            chaincode: Some(chaincode.to_string()),
        }
    }

    /// 默认方法表
    pub fn default_table() -> Vec<MethodSpec> {
        const SUPPLY_CHAIN: &str = "supply-chain-chaincode";
        const TRADE_FINANCE: &str = "trade-finance-chaincode";

        let supply = [
            "listOrders",
            "listShipments",
            "listProofs",
            "listContracts",
            "placeOrder",
            "acceptOrder",
            "requestShipment",
            "confirmShipment",
            "confirmDelivery",
            "generateProof",
            "validateProof",
        ];
        let finance = [
            "listInvoices",
            "listBids",
            "listBidsForInvoice",
            "registerInvoice",
            "acceptInvoice",
            "rejectInvoice",
            "placeInvoice",
            "removeInvoice",
            "placeBid",
            "editBid",
            "cancelBid",
            "acceptBid",
        ];

        supply
            .iter()
            .map(|m| Self::on(SUPPLY_CHAIN, m))
            .chain(finance.iter().map(|m| Self::on(TRADE_FINANCE, m)))
            .collect()
    }
}

/// 后端 API 设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// 后端地址
    pub base_url: String,
    /// 是否使用 mock 接口（`/{ccMethod}`）
    pub mock_api: bool,
    /// 当前组织，用于拼接 `peer={org}/peer0`
    pub org: String,
    /// 登录后获得的令牌（由外部认证模块写入）
    #[serde(default)]
    pub token: Option<String>,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            mock_api: false,
            org: "a".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

/// 应用配置（部分更新）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// API 设置
    pub api: Option<ApiSettings>,
    /// 方法表
    pub methods: Option<Vec<MethodSpec>>,
    /// 实体配置表
    pub profiles: Option<BTreeMap<EntityKind, EntityProfile>>,
    /// 事件总线缓冲区大小
    pub event_bus_capacity: Option<usize>,
}

fn default_profiles() -> BTreeMap<EntityKind, EntityProfile> {
    EntityKind::ALL
        .into_iter()
        .map(|entity| (entity, EntityProfile::default_for(entity)))
        .collect()
}

fn default_event_bus_capacity() -> usize {
    256
}

/// 持久化的应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAppConfig {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default = "MethodSpec::default_table")]
    pub methods: Vec<MethodSpec>,
    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<EntityKind, EntityProfile>,
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl Default for PersistedAppConfig {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            methods: MethodSpec::default_table(),
            profiles: default_profiles(),
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

impl PersistedAppConfig {
    /// 获取实体配置，配置文件缺失时回退到默认表
    pub fn profile(&self, entity: EntityKind) -> EntityProfile {
        self.profiles
            .get(&entity)
            .cloned()
            .unwrap_or_else(|| EntityProfile::default_for(entity))
    }

    /// 所有实体的配置（缺失项补默认值）
    pub fn all_profiles(&self) -> BTreeMap<EntityKind, EntityProfile> {
        EntityKind::ALL
            .into_iter()
            .map(|entity| (entity, self.profile(entity)))
            .collect()
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.cc_method == name)
    }
}
