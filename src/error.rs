// 同步层错误类型

use thiserror::Error;

/// 列表同步与筛选相关错误
#[derive(Debug, Error)]
pub enum SyncError {
    /// 推送消息无法解析为通知
    #[error("推送通知格式错误: {0}")]
    MalformedNotification(String),
    #[error("未知的实体类型: {0}")]
    UnknownEntity(String),
    #[error("方法表中不存在方法: {0}")]
    UnknownMethod(String),
    #[error("无效的请求参数: {0}")]
    InvalidArgument(String),
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("接口返回格式错误: {0}")]
    InvalidResponse(String),
}
