//! HTTP 传输层
//!
//! 执行器只依赖 [`HttpTransport`] trait，生产环境使用基于 reqwest 的实现，
//! 单元测试使用 mockall 生成的 `MockHttpTransport`。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use loadtest_shared::error::LoadTestError;
use serde_json::Value;
use thiserror::Error;

use crate::scenarios::HttpMethod;

/// 传输层错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("请求超时: {url}")]
    Timeout { url: String },

    #[error("请求失败: {url}: {message}")]
    Request { url: String, message: String },

    #[error("HTTP 客户端构建失败: {0}")]
    Client(String),
}

/// 只有客户端构建失败会上抛到进程入口，单次请求的错误留在步骤结果里
impl From<TransportError> for LoadTestError {
    fn from(err: TransportError) -> Self {
        LoadTestError::Transport(err.to_string())
    }
}

/// 替换完成、可直接发送的请求
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: IndexMap<String, String>,
    /// 只有 POST/PUT/PATCH 携带请求体
    pub body: Option<Value>,
    /// 指标和日志中使用的名称
    pub name: String,
}

impl PreparedRequest {
    /// 大小写不敏感地查找请求头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 目标服务响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// 键统一为小写
    headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// 状态码是否为 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 大小写不敏感地读取响应头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// 将响应体解析为 JSON
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// HTTP 传输抽象
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// 发送请求。非 2xx 状态码不是错误，由调用方分类
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError>;
}

/// 基于 reqwest 的传输实现
///
/// 内部 Client 自带连接池，可在所有虚拟用户间共享
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            // 显式设置了 Content-Type 时不让 .json() 覆盖
            builder = match request.header("content-type") {
                Some(_) => builder.body(body.to_string()),
                None => builder.json(body),
            };
        }

        let url = request.url.clone();
        let response = builder.send().await.map_err(|e| map_error(&url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| map_error(&url, e))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_error(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Request {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
