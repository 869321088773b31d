//! 响应提取模块
//!
//! 提取指令格式为 `<sourceType>:<path>`：
//! - `json:$.access_token` 按 JSONPath 子集从响应体取第一个匹配值
//! - `header:X-Request-Id` 读取响应头（大小写不敏感）
//!
//! 未知的来源类型在执行时跳过，不算失败。

mod path;

pub use path::{JsonPath, PathError};

use std::fmt;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::transport::TransportResponse;

/// 提取来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractSource {
    Json,
    Header,
    Unknown(String),
}

impl ExtractSource {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "header" => Self::Header,
            _ => Self::Unknown(name.trim().to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Json => "json",
            Self::Header => "header",
            Self::Unknown(name) => name,
        }
    }
}

/// 一条解析后的提取指令
///
/// JSON 路径在加载时编译，语法错误留到执行时以 `InvalidPath` 报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionDirective {
    pub source: ExtractSource,
    pub path: String,
    compiled: Option<Result<JsonPath, PathError>>,
}

impl ExtractionDirective {
    pub fn parse(raw: &str) -> Self {
        let (source, path) = match raw.trim().split_once(':') {
            Some((source, path)) => (ExtractSource::from_name(source), path.trim().to_string()),
            None => (ExtractSource::Unknown(raw.trim().to_string()), String::new()),
        };

        let compiled = match source {
            ExtractSource::Json => Some(JsonPath::parse(&path)),
            _ => None,
        };

        Self {
            source,
            path,
            compiled,
        }
    }

    pub fn json(path: &str) -> Self {
        Self::parse(&format!("json:{path}"))
    }

    pub fn header(name: &str) -> Self {
        Self::parse(&format!("header:{name}"))
    }

    /// JSON 路径的编译错误（非 JSON 来源返回 None）
    pub fn path_error(&self) -> Option<&PathError> {
        self.compiled.as_ref().and_then(|c| c.as_ref().err())
    }
}

impl fmt::Display for ExtractionDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source.name(), self.path)
    }
}

/// 提取失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// 路径没有匹配或响应头不存在
    #[error("not found: {path}")]
    NotFound { path: String },

    /// 响应体不是合法 JSON
    #[error("invalid body: {0}")]
    InvalidBody(String),

    #[error("invalid path: {path}: {message}")]
    InvalidPath { path: String, message: String },
}

impl ExtractionError {
    /// 用作指标标签的失败类别
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidBody(_) => "invalid_body",
            Self::InvalidPath { .. } => "invalid_path",
        }
    }
}

/// 响应值提取器
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 执行一条提取指令
    ///
    /// 返回 `Ok(None)` 表示来源类型未知，指令被跳过
    pub fn extract(
        &self,
        response: &TransportResponse,
        directive: &ExtractionDirective,
    ) -> Result<Option<Value>, ExtractionError> {
        let mut body = None;
        self.extract_cached(response, directive, &mut body)
    }

    /// 按顺序执行多条提取指令，响应体只解析一次
    ///
    /// 每条指令独立求值，一条失败不影响其余指令
    pub fn extract_all<'a, I>(
        &self,
        response: &TransportResponse,
        directives: I,
    ) -> Vec<(&'a str, Result<Option<Value>, ExtractionError>)>
    where
        I: IntoIterator<Item = (&'a String, &'a ExtractionDirective)>,
    {
        let mut body = None;
        directives
            .into_iter()
            .map(|(variable, directive)| {
                (
                    variable.as_str(),
                    self.extract_cached(response, directive, &mut body),
                )
            })
            .collect()
    }

    fn extract_cached(
        &self,
        response: &TransportResponse,
        directive: &ExtractionDirective,
        body: &mut Option<Result<Value, String>>,
    ) -> Result<Option<Value>, ExtractionError> {
        match &directive.source {
            ExtractSource::Json => {
                let path = match &directive.compiled {
                    Some(Ok(path)) => path,
                    Some(Err(e)) => {
                        return Err(ExtractionError::InvalidPath {
                            path: directive.path.clone(),
                            message: e.to_string(),
                        });
                    }
                    None => {
                        return Err(ExtractionError::InvalidPath {
                            path: directive.path.clone(),
                            message: "路径未编译".to_string(),
                        });
                    }
                };

                let parsed = body.get_or_insert_with(|| response.json().map_err(|e| e.to_string()));
                let root = parsed
                    .as_ref()
                    .map_err(|e| ExtractionError::InvalidBody(e.clone()))?;

                path.first(root)
                    .cloned()
                    .map(Some)
                    .ok_or_else(|| ExtractionError::NotFound {
                        path: directive.path.clone(),
                    })
            }
            ExtractSource::Header => response
                .header(&directive.path)
                .map(|v| Some(Value::String(v.to_string())))
                .ok_or_else(|| ExtractionError::NotFound {
                    path: directive.path.clone(),
                }),
            ExtractSource::Unknown(name) => {
                debug!(source = %name, "未知的提取来源，跳过");
                Ok(None)
            }
        }
    }
}
