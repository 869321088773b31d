//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{LoadTestError, Result};
use crate::observability::ObservabilityConfig;

/// 压测目标配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// 目标服务基础地址，场景中的相对 endpoint 会拼接在其后
    pub host: String,
    /// 单个请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl TargetConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 负载形态配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// 虚拟用户总数
    pub users: usize,
    /// 每秒启动的虚拟用户数
    pub spawn_rate: f64,
    /// 运行时长（秒），为空时一直运行到收到 Ctrl+C
    pub run_time_secs: Option<u64>,
    /// 两轮循环之间的最小思考时间（毫秒）
    pub min_wait_ms: u64,
    /// 两轮循环之间的最大思考时间（毫秒）
    pub max_wait_ms: u64,
}

impl Default for LoadConfig {
    /// 默认 10 个用户，每秒启动 1 个，思考时间 1-3 秒
    fn default() -> Self {
        Self {
            users: 10,
            spawn_rate: 1.0,
            run_time_secs: None,
            min_wait_ms: 1_000,
            max_wait_ms: 3_000,
        }
    }
}

impl LoadConfig {
    pub fn run_time(&self) -> Option<Duration> {
        self.run_time_secs.map(Duration::from_secs)
    }
}

/// 场景来源配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScenarioSourceConfig {
    pub path: String,
}

impl Default for ScenarioSourceConfig {
    fn default() -> Self {
        Self {
            path: "locust/scenarios.json".to_string(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub target: TargetConfig,
    pub load: LoadConfig,
    pub scenarios: ScenarioSourceConfig,
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "loadtest".to_string(),
            environment: "development".to_string(),
            target: TargetConfig::default(),
            load: LoadConfig::default(),
            scenarios: ScenarioSourceConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. .env 文件（仅补充进程环境变量）
    /// 2. config/default.toml（默认配置）
    /// 3. config/{environment}.toml（环境特定配置）
    /// 4. config/{service_name}.toml（服务特定配置）
    /// 5. 环境变量（LOADTEST_ 前缀，层级用双下划线分隔，
    ///    如 LOADTEST_TARGET__REQUEST_TIMEOUT_SECS -> target.request_timeout_secs）
    pub fn load(service_name: &str) -> std::result::Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let env = std::env::var("LOADTEST_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("LOADTEST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 校验配置的取值范围
    ///
    /// 在启动虚拟用户之前调用，避免非法取值在调度阶段才暴露
    pub fn validate(&self) -> Result<()> {
        if self.target.host.trim().is_empty() {
            return Err(invalid("target.host", "不能为空"));
        }
        if self.load.users == 0 {
            return Err(invalid("load.users", "必须大于 0"));
        }
        if self.load.spawn_rate.is_nan() || self.load.spawn_rate <= 0.0 {
            return Err(invalid("load.spawn_rate", "必须大于 0"));
        }
        if self.load.min_wait_ms > self.load.max_wait_ms {
            return Err(invalid(
                "load.min_wait_ms",
                &format!(
                    "不能大于 max_wait_ms ({} > {})",
                    self.load.min_wait_ms, self.load.max_wait_ms
                ),
            ));
        }
        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn invalid(field: &str, message: &str) -> LoadTestError {
    LoadTestError::InvalidConfig {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.target.request_timeout_secs, 30);
        assert_eq!(config.load.users, 10);
        assert_eq!(config.scenarios.path, "locust/scenarios.json");
        assert_eq!(config.observability.metrics_port, 9646);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_users() {
        let config = AppConfig {
            load: LoadConfig {
                users: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIG");
        assert!(err.to_string().contains("load.users"));
    }

    #[test]
    fn test_validate_rejects_inverted_wait_range() {
        let config = AppConfig {
            load: LoadConfig {
                min_wait_ms: 5_000,
                max_wait_ms: 1_000,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive_spawn_rate() {
        let config = AppConfig {
            load: LoadConfig {
                spawn_rate: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_source_falls_back_to_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(
                "[target]\nhost = \"http://api.internal:9000\"\n\n[load]\nusers = 50\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.target.host, "http://api.internal:9000");
        assert_eq!(config.target.request_timeout_secs, 30);
        assert_eq!(config.load.users, 50);
        assert_eq!(config.load.max_wait_ms, 3_000);
        assert_eq!(config.service_name, "loadtest");
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.target.request_timeout(), Duration::from_secs(30));
        assert!(config.load.run_time().is_none());
    }
}
