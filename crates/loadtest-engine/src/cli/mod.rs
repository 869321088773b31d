//! CLI 模块
//!
//! - `run` - 启动完整压测
//! - `check` - 校验场景文件
//! - `once` - 单个虚拟用户执行一轮
//!
//! # 使用示例
//!
//! ```bash
//! loadtest run --host http://localhost:8080 --users 50 --spawn-rate 5 --run-time 300
//! loadtest check --scenarios locust/scenarios.json
//! loadtest once -H http://localhost:8080
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::{CommandRunner, Overrides, error_code};
