//! 场景数据模型

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::extractor::ExtractionDirective;
use crate::generators::GeneratorDirective;

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    /// 该方法是否携带请求体
    pub fn carries_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl FromStr for HttpMethod {
    type Err = InvalidScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            _ => Err(InvalidScenario::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单条场景无效的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidScenario {
    #[error("缺少 endpoint 字段")]
    MissingEndpoint,

    #[error("不支持的 HTTP 方法: {0}")]
    UnknownMethod(String),

    #[error("场景格式错误: {0}")]
    Malformed(String),
}

/// 一个场景步骤
///
/// 加载后不可变，通过 `Arc<[ScenarioDefinition]>` 在所有虚拟用户间共享
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioDefinition {
    /// 报告名称，默认为 endpoint
    pub name: String,
    pub method: HttpMethod,
    pub endpoint: String,
    pub headers: IndexMap<String, String>,
    pub body: Value,
    pub generate: IndexMap<String, GeneratorDirective>,
    pub save: IndexMap<String, ExtractionDirective>,
}

impl ScenarioDefinition {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            name: endpoint.clone(),
            method,
            endpoint,
            headers: IndexMap::new(),
            body: Value::Object(Map::new()),
            generate: IndexMap::new(),
            save: IndexMap::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn generate(mut self, variable: impl Into<String>, directive: &str) -> Self {
        self.generate
            .insert(variable.into(), GeneratorDirective::parse(directive));
        self
    }

    pub fn save(mut self, variable: impl Into<String>, directive: &str) -> Self {
        self.save
            .insert(variable.into(), ExtractionDirective::parse(directive));
        self
    }
}

/// 场景文件中的原始条目
///
/// 映射字段为 `null` 时视为空；映射内单个值类型不对只跳过该项，不影响整条场景
#[derive(Debug, Deserialize)]
struct RawScenario {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    headers: Option<IndexMap<String, Value>>,
    #[serde(default, alias = "payload")]
    body: Option<Value>,
    #[serde(default)]
    generate: Option<IndexMap<String, Value>>,
    #[serde(default)]
    save: Option<IndexMap<String, Value>>,
}

/// 取出字符串形式的指令，非字符串的条目记录告警后跳过
fn string_directives(
    field: &'static str,
    entries: Option<IndexMap<String, Value>>,
) -> impl Iterator<Item = (String, String)> {
    entries
        .unwrap_or_default()
        .into_iter()
        .filter_map(move |(variable, value)| match value {
            Value::String(directive) => Some((variable, directive)),
            other => {
                warn!(field, variable = %variable, value = %other, "指令不是字符串，跳过该变量");
                None
            }
        })
}

impl TryFrom<Value> for ScenarioDefinition {
    type Error = InvalidScenario;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        if !value.is_object() {
            return Err(InvalidScenario::Malformed("条目不是对象".to_string()));
        }

        let raw: RawScenario =
            serde_json::from_value(value).map_err(|e| InvalidScenario::Malformed(e.to_string()))?;

        let endpoint = raw
            .endpoint
            .filter(|e| !e.trim().is_empty())
            .ok_or(InvalidScenario::MissingEndpoint)?;

        let method = match raw.method.as_deref() {
            None => HttpMethod::Get,
            Some(m) => m.parse()?,
        };

        let headers = raw
            .headers
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, value)| match value {
                Value::String(s) => Some((name, s)),
                Value::Null => {
                    warn!(header = %name, "请求头的值为 null，跳过");
                    None
                }
                other => Some((name, other.to_string())),
            })
            .collect();

        Ok(Self {
            name: raw.name.unwrap_or_else(|| endpoint.clone()),
            method,
            endpoint,
            headers,
            body: raw.body.unwrap_or_else(|| Value::Object(Map::new())),
            generate: string_directives("generate", raw.generate)
                .map(|(var, d)| (var, GeneratorDirective::parse(&d)))
                .collect(),
            save: string_directives("save", raw.save)
                .map(|(var, d)| (var, ExtractionDirective::parse(&d)))
                .collect(),
        })
    }
}
