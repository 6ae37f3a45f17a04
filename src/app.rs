// 应用启动入口

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::actors::ListStoreActor;
use crate::api::ApiClient;
use crate::domains::DashboardDomain;
use crate::event_bus::EventBus;
use crate::logger::{self, LogBroadcaster};
use crate::settings::SettingsManager;
use crate::sync::{NotificationListener, NOTIFICATION_EVENT};
use crate::AppState;

/// 应用数据目录，可用 `TFSC_DASHBOARD_HOME` 覆盖
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TFSC_DASHBOARD_HOME") {
        return PathBuf::from(dir);
    }
    if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join("tfsc-dashboard")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".local/share/tfsc-dashboard")
    }
}

/// 根据配置组装应用状态，并启动列表缓存 Actor 和通知监听
pub async fn build_app_state(
    settings: Arc<SettingsManager>,
    log_broadcaster: Arc<LogBroadcaster>,
) -> Result<AppState> {
    let config = settings.get().await;
    let profiles = config.all_profiles();

    let event_bus = Arc::new(EventBus::new(config.event_bus_capacity));

    // 列表缓存只由 Actor 持有
    let (store_actor, store) = ListStoreActor::new(profiles.clone());
    tokio::spawn(async move {
        store_actor.run().await;
    });

    let client = ApiClient::new(config.api.clone(), config.methods.clone())?;
    info!(
        "后端地址: {} (mock: {})",
        client.settings().base_url,
        client.settings().mock_api
    );

    let dashboard_domain = Arc::new(DashboardDomain::new(
        Arc::new(client),
        store.clone(),
        event_bus.clone(),
        profiles,
    ));

    NotificationListener::new(event_bus.clone(), store).spawn();

    Ok(AppState {
        dashboard_domain,
        settings,
        log_broadcaster,
        event_bus,
    })
}

/// 启动应用
///
/// 1. 日志系统初始化
/// 2. 读取配置
/// 3. 启动 Actor 和通知监听
/// 4. 拉取所有列表
/// 5. 把标准输入的每一行当作一条推送消息，直到输入结束
pub fn run() -> Result<()> {
    let log_broadcaster = Arc::new(LogBroadcaster::new(256));
    let app_dir = app_data_dir();

    let log_dir = if std::env::var_os("TFSC_DASHBOARD_HOME").is_some() {
        app_dir.join("logs")
    } else {
        logger::default_log_dir()
    };

    if let Err(e) = logger::init_with_broadcaster(log_broadcaster.clone(), log_dir) {
        eprintln!("日志系统初始化失败: {}", e);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        info!("初始化贸易融资仪表盘...");

        let settings = Arc::new(SettingsManager::new(app_dir.join("config.json")).await?);
        let state = build_app_state(settings, log_broadcaster).await?;

        for (entity, snapshot) in state.dashboard_domain.refresh_all().await {
            info!("{}: {} 条记录", entity.display_name(), snapshot.len());
        }

        info!("等待推送消息 ({})...", NOTIFICATION_EVENT);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            state.event_bus.publish_notification(line);
        }

        if !state.dashboard_domain.get_store().health_check().await {
            warn!("列表缓存 Actor 已不可用");
        }
        info!("推送输入已结束，退出");
        Ok::<(), anyhow::Error>(())
    })
}
