// 后端 API 客户端
// 负责按方法表拼接请求地址、拉取列表和提交操作

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::models::{ApiSettings, MethodSpec, RecordList};
use crate::utils::validate_method_name;

/// 后端接口
#[async_trait]
pub trait Backend: Send + Sync {
    /// 调用列表查询方法，返回 `{ result: [...] }` 中的记录
    async fn fetch_list(&self, method: &str, args: &[String]) -> Result<RecordList, SyncError>;

    /// 提交操作（下单、确认运单、验证证明等）
    ///
    /// 网络或服务端错误不会向上抛出，而是体现在返回状态的 `error` 标记上
    async fn submit(&self, method: &str, body: &Value) -> RequestState;
}

/// 提交请求的状态，与前端表单使用的结构一致
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestState {
    pub data: Option<Value>,
    pub pending: bool,
    pub error: bool,
    pub complete: bool,
}

impl RequestState {
    pub fn pending() -> Self {
        Self {
            pending: true,
            ..Self::default()
        }
    }

    pub fn success(data: Value) -> Self {
        Self {
            data: Some(data),
            pending: false,
            error: false,
            complete: true,
        }
    }

    pub fn failure() -> Self {
        Self {
            data: None,
            pending: false,
            error: true,
            complete: true,
        }
    }
}

/// 后端 API 客户端
#[derive(Clone)]
pub struct ApiClient {
    settings: ApiSettings,
    methods: Vec<MethodSpec>,
    client: Client,
}

impl ApiClient {
    /// 创建新的 API 客户端
    pub fn new(settings: ApiSettings, methods: Vec<MethodSpec>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            settings,
            methods,
            client,
        })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    fn method(&self, name: &str) -> Result<&MethodSpec, SyncError> {
        validate_method_name(name).map_err(SyncError::UnknownMethod)?;
        self.methods
            .iter()
            .find(|m| m.cc_method == name)
            .ok_or_else(|| SyncError::UnknownMethod(name.to_string()))
    }

    fn base(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    fn channel_path(&self, spec: &MethodSpec) -> String {
        let mut url = format!("{}/api/channels", self.base());
        if let Some(channel) = &spec.channel {
            url.push('/');
            url.push_str(channel);
        }
        if let Some(chaincode) = &spec.chaincode {
            url.push_str("/chaincodes/");
            url.push_str(chaincode);
        }
        url
    }

    /// 列表查询地址
    ///
    /// - mock 模式: `{base}/{ccMethod}`
    /// - 正常模式: `{base}/api/channels/{channel}/chaincodes/{chaincode}?peer={org}/peer0&fcn={ccMethod}&args=...`（参数经过 URL 编码）
    pub fn list_url(&self, method: &str, args: &[String]) -> Result<String, SyncError> {
        let spec = self.method(method)?;
        if self.settings.mock_api {
            return Ok(format!("{}/{}", self.base(), spec.cc_method));
        }

        let peer = format!("{}/peer0", self.settings.org);
        let mut params = vec![("peer", peer.as_str()), ("fcn", spec.cc_method.as_str())];
        params.extend(args.iter().map(|arg| ("args", arg.as_str())));

        let url = Url::parse_with_params(&self.channel_path(spec), &params)
            .map_err(|e| SyncError::InvalidArgument(format!("无效的请求地址: {}", e)))?;
        Ok(url.to_string())
    }

    /// 提交操作地址
    pub fn submit_url(&self, method: &str) -> Result<String, SyncError> {
        let spec = self.method(method)?;
        if self.settings.mock_api {
            return Ok(format!("{}/{}", self.base(), spec.cc_method));
        }
        Ok(self.channel_path(spec))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.settings.token {
            Some(token) if !token.is_empty() => request.bearer_auth(token),
            _ => request,
        }
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn fetch_list(&self, method: &str, args: &[String]) -> Result<RecordList, SyncError> {
        let url = self.list_url(method, args)?;
        debug!("拉取列表: {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SyncError::InvalidResponse(format!(
                "{} 返回 {}: {}",
                method, status, error_text
            )));
        }

        let body: Value = response.json().await?;
        parse_list_response(body)
    }

    async fn submit(&self, method: &str, body: &Value) -> RequestState {
        let url = match self.submit_url(method) {
            Ok(url) => url,
            Err(e) => {
                warn!("提交 {} 失败: {}", method, e);
                return RequestState::failure();
            }
        };

        info!("提交操作: {}", method);
        let response = match self.authorize(self.client.post(&url)).json(body).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("提交 {} 请求失败: {}", method, e);
                return RequestState::failure();
            }
        };

        if !response.status().is_success() {
            warn!("提交 {} 返回错误状态: {}", method, response.status());
            return RequestState::failure();
        }

        match response.json::<Value>().await {
            Ok(data) => RequestState::success(data),
            Err(e) => {
                warn!("提交 {} 的响应无法解析: {}", method, e);
                RequestState::failure()
            }
        }
    }
}

/// 从 `{ result: [...] }` 中取出记录列表
pub fn parse_list_response(body: Value) -> Result<RecordList, SyncError> {
    let Value::Object(mut body) = body else {
        return Err(SyncError::InvalidResponse("响应不是 JSON 对象".to_string()));
    };

    match body.remove("result") {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(SyncError::InvalidResponse(format!(
                    "列表项不是对象: {}",
                    other
                ))),
            })
            .collect(),
        // 链码在没有数据时返回 null
        Some(Value::Null) => Ok(Vec::new()),
        Some(other) => Err(SyncError::InvalidResponse(format!(
            "result 字段不是数组: {}",
            other
        ))),
        None => Err(SyncError::InvalidResponse("缺少 result 字段".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(mock_api: bool) -> ApiClient {
        let settings = ApiSettings {
            base_url: "http://localhost:4000/".to_string(),
            mock_api,
            org: "b".to_string(),
            ..Default::default()
        };
        ApiClient::new(settings, MethodSpec::default_table()).unwrap()
    }

    #[test]
    fn test_list_url_with_channel_and_args() {
        let url = client(false)
            .list_url("listBidsForInvoice", &["inv-1".to_string(), "x".to_string()])
            .unwrap();
        assert_eq!(
            url,
            "http://localhost:4000/api/channels/common/chaincodes/trade-finance-chaincode?peer=b%2Fpeer0&fcn=listBidsForInvoice&args=inv-1&args=x"
        );
    }

    #[test]
    fn test_mock_urls() {
        let client = client(true);
        assert_eq!(client.list_url("listShipments", &[]).unwrap(), "http://localhost:4000/listShipments");
        assert_eq!(client.submit_url("placeOrder").unwrap(), "http://localhost:4000/placeOrder");
    }

    #[test]
    fn test_submit_url() {
        assert_eq!(
            client(false).submit_url("confirmShipment").unwrap(),
            "http://localhost:4000/api/channels/common/chaincodes/supply-chain-chaincode"
        );
    }

    #[test]
    fn test_url_without_channel() {
        let methods = vec![MethodSpec {
            cc_method: "health".to_string(),
            channel: None,
            chaincode: None,
        }];
        let client = ApiClient::new(ApiSettings::default(), methods).unwrap();
        assert_eq!(
            client.list_url("health", &[]).unwrap(),
            "http://localhost:4000/api/channels?peer=a%2Fpeer0&fcn=health"
        );
    }

    #[test]
    fn test_unknown_method() {
        let client = client(false);
        assert!(matches!(client.list_url("dropTables", &[]), Err(SyncError::UnknownMethod(_))));
    }

    #[test]
    fn test_list_args_are_encoded() {
        let args = vec!["a+b".to_string(), "x=1%2".to_string(), "a&fcn=x".to_string(), "c d".to_string()];
        let url = client(false).list_url("listBidsForInvoice", &args).unwrap();

        let parsed = Url::parse(&url).unwrap();
        let decoded: Vec<String> = parsed
            .query_pairs()
            .filter(|(k, _)| k == "args")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(decoded, args);

        let fcn: Vec<String> = parsed
            .query_pairs()
            .filter(|(k, _)| k == "fcn")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(fcn, vec!["listBidsForInvoice".to_string()]);
    }

    #[test]
    fn test_parse_list_response() {
        let records = parse_list_response(json!({"result": [{"key": {"id": "1"}}, {"key": {"id": "2"}}]})).unwrap();
        assert_eq!(records.len(), 2);
        assert!(parse_list_response(json!({"result": null})).unwrap().is_empty());
        assert!(parse_list_response(json!({"data": []})).is_err());
        assert!(parse_list_response(json!({"result": [1]})).is_err());
        assert!(parse_list_response(json!([])).is_err());
    }

    #[tokio::test]
    async fn test_submit_failure_sets_error_flag() {
        let settings = ApiSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..Default::default()
        };
        let client = ApiClient::new(settings, MethodSpec::default_table()).unwrap();
        let state = client.submit("placeOrder", &json!({"productName": "Cotton"})).await;
        assert_eq!(state, RequestState::failure());

        let state = client.submit("notInTable", &json!({})).await;
        assert!(state.error && state.complete);
    }
}
