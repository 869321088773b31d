//! 生成指令解析
//!
//! 指令格式为 `dynamic:<func>|<arg1>|<arg2>...`，例如 `dynamic:password|12`。
//! 在场景加载时解析为封闭的 [`GeneratorFn`] 枚举，执行期不再做字符串分派。

use std::fmt;

const DYNAMIC_PREFIX: &str = "dynamic:";

/// 已注册的生成函数
///
/// `Unknown` 保留原始名称，执行时对应变量被跳过
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorFn {
    /// 随机邮箱
    Email,
    /// 随机密码，参数为长度
    Password,
    /// 随机 UUID v4
    Uuid,
    /// 随机用户名
    Username,
    /// 闭区间随机整数，参数为 min、max
    Number,
    /// 当前 Unix 毫秒时间戳
    Timestamp,
    /// 未注册的函数名
    Unknown(String),
}

impl GeneratorFn {
    /// 所有内置函数名，用于帮助信息和校验提示
    pub const BUILTINS: &'static [&'static str] =
        &["email", "password", "uuid", "username", "number", "timestamp"];

    /// 按名称解析（大小写不敏感）
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "email" => Self::Email,
            "password" => Self::Password,
            "uuid" => Self::Uuid,
            "username" => Self::Username,
            "number" => Self::Number,
            "timestamp" => Self::Timestamp,
            _ => Self::Unknown(name.trim().to_string()),
        }
    }

    /// 函数名
    pub fn name(&self) -> &str {
        match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::Uuid => "uuid",
            Self::Username => "username",
            Self::Number => "number",
            Self::Timestamp => "timestamp",
            Self::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

/// 一条解析后的生成指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorDirective {
    pub function: GeneratorFn,
    pub args: Vec<String>,
    raw: String,
}

impl GeneratorDirective {
    /// 解析生成指令
    ///
    /// 解析本身不会失败：缺少 `dynamic:` 前缀或函数名未注册时，
    /// 得到 `GeneratorFn::Unknown`，由执行阶段决定跳过。
    pub fn parse(raw: &str) -> Self {
        let Some(body) = raw.trim().strip_prefix(DYNAMIC_PREFIX) else {
            return Self {
                function: GeneratorFn::Unknown(raw.trim().to_string()),
                args: Vec::new(),
                raw: raw.to_string(),
            };
        };

        let mut parts = body.split('|');
        let function = GeneratorFn::from_name(parts.next().unwrap_or_default());
        let args = parts.map(|arg| arg.trim().to_string()).collect();

        Self {
            function,
            args,
            raw: raw.to_string(),
        }
    }

    /// 原始指令文本
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for GeneratorDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
