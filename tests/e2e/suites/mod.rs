//! 测试套件模块

pub mod journey;
pub mod swarm;
