// 自定义日志层 - 支持将日志实时推送给界面宿主

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// 日志消息
#[derive(Clone, Debug, serde::Serialize)]
pub struct LogMessage {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// 日志推送器 - 将日志广播给订阅者（如仪表盘的日志面板）
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogMessage>,
    enabled: AtomicBool,
}

impl LogBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            enabled: AtomicBool::new(true),
        }
    }

    /// 订阅日志
    pub fn subscribe(&self) -> broadcast::Receiver<LogMessage> {
        self.sender.subscribe()
    }

    /// 设置日志推送开关
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// 获取日志推送状态
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn emit_log(&self, log: LogMessage) {
        if !self.is_enabled() {
            return;
        }
        // 没有订阅者时丢弃
        let _ = self.sender.send(log);
    }
}

/// 自定义日志层
pub struct BroadcastLogLayer {
    broadcaster: Arc<LogBroadcaster>,
}

impl BroadcastLogLayer {
    pub fn new(broadcaster: Arc<LogBroadcaster>) -> Self {
        Self { broadcaster }
    }
}

impl<S: Subscriber> Layer<S> for BroadcastLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = metadata.level().to_string();
        let target = metadata.target().to_string();

        struct MessageVisitor {
            message: String,
        }

        impl tracing::field::Visit for MessageVisitor {
            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = format!("{:?}", value);
                    // 移除首尾引号
                    if self.message.len() >= 2
                        && self.message.starts_with('"')
                        && self.message.ends_with('"')
                    {
                        self.message = self.message[1..self.message.len() - 1].to_string();
                    }
                }
            }
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        self.broadcaster.emit_log(LogMessage {
            timestamp,
            level,
            target,
            message: visitor.message,
        });
    }
}

/// 默认日志目录
pub fn default_log_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join("Library/Logs/tfsc-dashboard")
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join("tfsc-dashboard").join("logs")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".local/share/tfsc-dashboard/logs")
    }
}

/// 初始化日志系统（带推送功能）
pub fn init_with_broadcaster(
    broadcaster: Arc<LogBroadcaster>,
    log_dir: PathBuf,
) -> Result<(), SetGlobalDefaultError> {
    use tracing_subscriber::fmt::time::LocalTime;
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all(&log_dir).ok();

    // 配置日志输出到文件（每天轮转）
    let file_appender = tracing_appender::rolling::daily(log_dir.clone(), "dashboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 保持 guard 在整个程序生命周期
    std::mem::forget(guard);

    let writer = std::io::stdout.and(non_blocking);

    let timer = LocalTime::new(time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(writer)
        .with_timer(timer)
        .with_ansi(cfg!(debug_assertions))
        .finish()
        .with(BroadcastLogLayer::new(broadcaster));

    tracing::subscriber::set_global_default(subscriber)?;

    eprintln!("日志文件位置: {:?}", log_dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_forwards_events() {
        let broadcaster = Arc::new(LogBroadcaster::new(8));
        let mut receiver = broadcaster.subscribe();
        let subscriber =
            tracing_subscriber::registry().with(BroadcastLogLayer::new(broadcaster.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("列表拉取失败: {}", "timeout");
        });

        let log = receiver.try_recv().unwrap();
        assert_eq!(log.level, "WARN");
        assert_eq!(log.message, "列表拉取失败: timeout");
    }

    #[test]
    fn test_disabled_broadcaster_drops_events() {
        let broadcaster = Arc::new(LogBroadcaster::new(8));
        broadcaster.set_enabled(false);
        let mut receiver = broadcaster.subscribe();
        let subscriber =
            tracing_subscriber::registry().with(BroadcastLogLayer::new(broadcaster.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("不会被推送");
        });

        assert!(receiver.try_recv().is_err());
        assert!(!broadcaster.is_enabled());
    }
}
