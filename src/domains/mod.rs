// 领域模块 - 用于组织应用的业务逻辑
//
// 仪表盘领域负责列表拉取、缓存同步、操作提交和视图会话

pub mod dashboard;

pub use dashboard::DashboardDomain;
