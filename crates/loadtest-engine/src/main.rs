//! 负载测试 CLI
//!
//! 加载分层配置，初始化日志和指标导出，然后分派到子命令。

use anyhow::Context as _;
use clap::Parser;
use loadtest_engine::cli::{Cli, CommandRunner, Commands, Overrides, error_code};
use loadtest_shared::config::AppConfig;
use loadtest_shared::observability;

const SERVICE_NAME: &str = "loadtest";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match AppConfig::load(SERVICE_NAME) {
        Ok(config) => config,
        Err(e) => {
            // 日志尚未初始化，直接输出到 stderr
            eprintln!("配置加载失败，使用默认配置: {e}");
            AppConfig::default()
        }
    };

    let mut obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    if let Some(level) = &cli.log_level {
        obs_config = obs_config.with_log_level(level);
    }
    // 只有完整压测需要对外暴露指标
    obs_config.metrics_enabled &= matches!(cli.command, Commands::Run { .. });

    let _guard = observability::init(&obs_config)
        .await
        .context("初始化可观测性失败")?;

    let runner = CommandRunner::new(config);

    let result = match cli.command {
        Commands::Run {
            host,
            users,
            spawn_rate,
            run_time,
            scenarios,
        } => {
            runner
                .run_load(Overrides {
                    host,
                    users,
                    spawn_rate,
                    run_time,
                    scenarios,
                })
                .await
        }
        Commands::Check { scenarios } => runner.run_check(scenarios),
        Commands::Once { scenarios, host } => runner.run_once(scenarios, host).await,
    };

    if let Err(e) = &result {
        tracing::error!(code = error_code(e), error = %format!("{e:#}"), "命令执行失败");
    }
    result
}
