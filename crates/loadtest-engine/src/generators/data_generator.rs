//! 数据生成器
//!
//! 为场景变量生成合成数据。除随机源和时钟外不依赖任何外部状态。

use fake::Fake;
use fake::faker::internet::en::{SafeEmail, Username};
use rand::Rng;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::directive::{GeneratorDirective, GeneratorFn};

/// 密码字符集
pub const PASSWORD_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";

/// 未指定长度时的密码长度
pub const DEFAULT_PASSWORD_LENGTH: usize = 12;

/// 密码长度上限，超过时按参数无效处理
pub const MAX_PASSWORD_LENGTH: usize = 4096;

const DEFAULT_NUMBER_RANGE: (i64, i64) = (0, 1000);

/// 生成失败原因
///
/// 生成失败只影响对应变量，不会让步骤失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("未知的生成函数: {0}")]
    UnknownFunction(String),

    #[error("生成函数 {function} 的参数无效: {message}")]
    InvalidArgument {
        function: &'static str,
        message: String,
    },
}

/// 合成数据生成器
#[derive(Debug, Clone, Copy, Default)]
pub struct DataGenerator;

impl DataGenerator {
    pub fn new() -> Self {
        Self
    }

    /// 执行一条生成指令
    pub fn generate_directive(&self, directive: &GeneratorDirective) -> Result<Value, GenerateError> {
        self.generate(&directive.function, &directive.args)
    }

    /// 按函数和参数生成一个值
    pub fn generate(&self, function: &GeneratorFn, args: &[String]) -> Result<Value, GenerateError> {
        match function {
            GeneratorFn::Email => Ok(Value::String(SafeEmail().fake())),
            GeneratorFn::Password => {
                let length = parse_password_length(args.first())?;
                Ok(Value::String(random_password(length)))
            }
            GeneratorFn::Uuid => Ok(Value::String(Uuid::new_v4().to_string())),
            GeneratorFn::Username => Ok(Value::String(Username().fake())),
            GeneratorFn::Number => {
                let (min, max) = parse_number_range(args)?;
                Ok(Value::from(rand::rng().random_range(min..=max)))
            }
            GeneratorFn::Timestamp => Ok(Value::from(chrono::Utc::now().timestamp_millis())),
            GeneratorFn::Unknown(name) => Err(GenerateError::UnknownFunction(name.clone())),
        }
    }
}

/// 生成指定长度的随机密码，每个字符都取自 [`PASSWORD_CHARSET`]
fn random_password(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| PASSWORD_CHARSET[rng.random_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

fn parse_password_length(arg: Option<&String>) -> Result<usize, GenerateError> {
    let Some(raw) = arg.filter(|a| !a.is_empty()) else {
        return Ok(DEFAULT_PASSWORD_LENGTH);
    };

    match raw.parse::<usize>() {
        Ok(0) => Err(GenerateError::InvalidArgument {
            function: "password",
            message: "长度必须大于 0".to_string(),
        }),
        Ok(length) if length > MAX_PASSWORD_LENGTH => Err(GenerateError::InvalidArgument {
            function: "password",
            message: format!("长度 {length} 超过上限 {MAX_PASSWORD_LENGTH}"),
        }),
        Ok(length) => Ok(length),
        Err(_) => Err(GenerateError::InvalidArgument {
            function: "password",
            message: format!("长度不是整数: {raw}"),
        }),
    }
}

fn parse_number_range(args: &[String]) -> Result<(i64, i64), GenerateError> {
    let parse = |index: usize, default: i64| -> Result<i64, GenerateError> {
        match args.get(index).filter(|a| !a.is_empty()) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| GenerateError::InvalidArgument {
                function: "number",
                message: format!("边界不是整数: {raw}"),
            }),
        }
    };

    let min = parse(0, DEFAULT_NUMBER_RANGE.0)?;
    let max = parse(1, DEFAULT_NUMBER_RANGE.1)?;
    if min > max {
        return Err(GenerateError::InvalidArgument {
            function: "number",
            message: format!("min ({min}) 大于 max ({max})"),
        });
    }
    Ok((min, max))
}
