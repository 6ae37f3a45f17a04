// 贸易融资仪表盘 - 列表同步核心库

// 声明模块
pub mod actors;
pub mod api;
pub mod app;
pub mod domains;
pub mod error;
pub mod event_bus;
pub mod logger;
pub mod models;
pub mod settings;
pub mod sync;
pub mod utils;
pub mod view;

use std::sync::Arc;

use domains::DashboardDomain;
use event_bus::EventBus;
use logger::LogBroadcaster;
use settings::SettingsManager;

pub use app::run;
pub use error::SyncError;

/// 应用状态
///
/// - 仪表盘领域：负责列表拉取、缓存同步和视图
/// - 设置管理器：负责配置读写
/// - 日志广播器：负责把日志推送给界面
/// - 事件总线：外部推送通道在这里发布原始消息
#[derive(Clone)]
pub struct AppState {
    /// 仪表盘领域管理器
    pub dashboard_domain: Arc<DashboardDomain>,
    /// 设置管理器
    pub settings: Arc<SettingsManager>,
    /// 日志广播器
    pub log_broadcaster: Arc<LogBroadcaster>,
    /// 事件总线
    pub event_bus: Arc<EventBus>,
}
