//! 生成器模块
//!
//! 在请求发出前为场景变量合成数据（邮箱、密码、UUID 等）。
//! 生成函数是一个封闭的注册表，未知函数名只会跳过对应变量而不会中断执行。

pub mod data_generator;
pub mod directive;

pub use data_generator::{
    DEFAULT_PASSWORD_LENGTH, DataGenerator, GenerateError, PASSWORD_CHARSET,
};
pub use directive::{GeneratorDirective, GeneratorFn};
