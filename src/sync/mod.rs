// 列表同步模块 - 推送通知合并与列表筛选
//
// 子模块:
// - notification: 推送消息解析为带标签的通知
// - merge: 通知合并进缓存列表（写时复制）
// - filter: 状态 / 搜索 / 字段筛选与筛选项推导
// - normalize: 服务端记录展开为扁平记录
// - listener: 订阅事件总线的后台监听

pub mod filter;
pub mod listener;
pub mod merge;
pub mod normalize;
pub mod notification;

pub use filter::{facets, Facet, FilterState, FilterValue, ListFilter};
pub use listener::NotificationListener;
pub use merge::merge;
pub use normalize::{normalize, normalize_list};
pub use notification::{Notification, NotificationKind, RecordEvent, NOTIFICATION_EVENT};
