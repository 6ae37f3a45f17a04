// 后端 API 模块

pub mod client;

pub use client::{parse_list_response, ApiClient, Backend, RequestState};
