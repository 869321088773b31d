//! 场景加载
//!
//! 文档顶层必须有 `scenarios` 列表，每个元素是一个场景步骤。
//! `load` 为软失败：文件缺失、格式错误或缺少列表时返回空序列并记录日志，
//! 需要拿到具体错误的调用方（如 `check` 命令）使用 `try_load`。

use std::path::Path;

use loadtest_shared::error::LoadTestError;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use super::models::ScenarioDefinition;

/// 场景文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
}

impl SourceFormat {
    /// 按扩展名判断格式，`.yaml` / `.yml` 为 YAML，其余按 JSON 处理
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// 场景加载错误
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("无法读取场景文件 {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("场景文件格式错误 ({format:?}): {message}")]
    Parse {
        format: SourceFormat,
        message: String,
    },

    #[error("场景文件缺少顶层 scenarios 列表")]
    MissingScenarios,
}

impl From<LoadError> for LoadTestError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Io { path, source } => LoadTestError::ScenarioSource { path, source },
            other => LoadTestError::ScenarioParse(other.to_string()),
        }
    }
}

/// 场景存储
pub struct ScenarioStore;

impl ScenarioStore {
    /// 加载场景文件，任何错误都降级为空序列
    pub fn load(path: impl AsRef<Path>) -> Vec<ScenarioDefinition> {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(scenarios) => {
                if scenarios.is_empty() {
                    warn!(path = %path.display(), "场景文件中没有可用的场景");
                } else {
                    info!(path = %path.display(), count = scenarios.len(), "场景加载完成");
                }
                scenarios
            }
            Err(LoadError::Io { path, source }) => {
                warn!(path = %path, error = %source, "场景文件不可读，使用空场景列表");
                Vec::new()
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "场景文件解析失败，使用空场景列表");
                Vec::new()
            }
        }
    }

    /// 加载场景文件并返回具体错误
    pub fn try_load(path: impl AsRef<Path>) -> Result<Vec<ScenarioDefinition>, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, SourceFormat::from_path(path))
    }

    /// 解析内存中的场景文档
    ///
    /// 单条无效的场景会被跳过，其余场景保持原有顺序
    pub fn parse(content: &str, format: SourceFormat) -> Result<Vec<ScenarioDefinition>, LoadError> {
        let document: Value = match format {
            SourceFormat::Json => serde_json::from_str(content).map_err(|e| LoadError::Parse {
                format,
                message: e.to_string(),
            })?,
            SourceFormat::Yaml => serde_yaml::from_str(content).map_err(|e| LoadError::Parse {
                format,
                message: e.to_string(),
            })?,
        };

        let Some(entries) = document.get("scenarios").and_then(Value::as_array) else {
            return Err(LoadError::MissingScenarios);
        };

        let scenarios = entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match ScenarioDefinition::try_from(entry.clone()) {
                Ok(scenario) => Some(scenario),
                Err(e) => {
                    warn!(index, error = %e, "跳过无效的场景");
                    None
                }
            })
            .collect();

        Ok(scenarios)
    }
}
