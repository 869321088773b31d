//! 统一错误处理模块
//!
//! 定义基础设施层共享的错误类型，使用 thiserror 提供良好的错误信息。
//! 引擎内部的步骤级错误（生成、提取、传输）由各自模块定义，
//! 只有需要上抛到进程入口的错误才归入此处。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum LoadTestError {
    // ==================== 配置错误 ====================
    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    #[error("无效的配置项: {field} - {message}")]
    InvalidConfig { field: String, message: String },

    // ==================== 场景错误 ====================
    #[error("场景文件读取失败: {path}")]
    ScenarioSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("场景文件解析失败: {0}")]
    ScenarioParse(String),

    // ==================== 目标服务错误 ====================
    #[error("HTTP 传输层初始化失败: {0}")]
    Transport(String),

    // ==================== 可观测性错误 ====================
    #[error("指标导出初始化失败: {0}")]
    Metrics(String),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, LoadTestError>;

impl LoadTestError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::ScenarioSource { .. } => "SCENARIO_SOURCE_ERROR",
            Self::ScenarioParse(_) => "SCENARIO_PARSE_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Metrics(_) => "METRICS_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
