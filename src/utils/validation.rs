//! 输入验证工具函数
//!
//! 提供链码方法名的验证，避免拼接出非法的请求地址

/// 验证链码方法名是否有效
///
/// # 参数
/// - `method`: 方法名
///
/// # 返回
/// - `Ok(())`: 验证通过
/// - `Err(String)`: 错误信息
pub fn validate_method_name(method: &str) -> Result<(), String> {
    if method.is_empty() {
        return Err("方法名不能为空".to_string());
    }
    if !method.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("无效的方法名: {}", method));
    }
    Ok(())
}
