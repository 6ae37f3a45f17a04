// Actor模块 - 使用Actor模式管理并发状态
//
// 缓存列表只由 ListStoreActor 持有，通过消息传递串行修改

pub mod list_store;

pub use list_store::{ListStoreActor, ListStoreCommand, ListStoreHandle, Snapshot};
