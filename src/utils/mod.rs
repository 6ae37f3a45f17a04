//! 工具函数模块
//!
//! 提供各类通用工具函数，包括：
//! - 输入验证
//! - JSON 字段访问

pub mod json_path;
pub mod validation;

// 重新导出常用函数
pub use json_path::*;
pub use validation::*;
