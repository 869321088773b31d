//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。
//! 命令行参数优先于配置文件和环境变量。

use clap::{Parser, Subcommand};

/// 场景驱动的负载测试工具
#[derive(Parser, Debug)]
#[command(name = "loadtest")]
#[command(version, about = "场景驱动的 HTTP 负载测试工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 启动完整压测
    ///
    /// 按 spawn-rate 逐步启动虚拟用户，直到运行时长到期或收到 Ctrl+C。
    Run {
        /// 目标服务地址
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// 虚拟用户数
        #[arg(short, long)]
        users: Option<usize>,

        /// 每秒启动的用户数
        #[arg(short = 'r', long)]
        spawn_rate: Option<f64>,

        /// 运行时长（秒）
        #[arg(short = 't', long)]
        run_time: Option<u64>,

        /// 场景文件路径（JSON/YAML）
        #[arg(short, long)]
        scenarios: Option<String>,
    },

    /// 校验场景文件并列出步骤
    ///
    /// 文件无法读取或解析时以非零状态退出。
    Check {
        /// 场景文件路径（JSON/YAML）
        #[arg(short, long)]
        scenarios: Option<String>,
    },

    /// 单个虚拟用户执行一轮并打印每个步骤的结果
    Once {
        /// 场景文件路径（JSON/YAML）
        #[arg(short, long)]
        scenarios: Option<String>,

        /// 目标服务地址
        #[arg(short = 'H', long)]
        host: Option<String>,
    },
}
