//! 共享库
//!
//! 包含负载测试引擎与各命令行入口共用的配置、错误处理和可观测性基础设施代码。

pub mod config;
pub mod error;
pub mod observability;
