//! 统一错误处理
//!
//! 提供结构化错误类型。注意：“未找到”和“已处于目标状态”不是错误，
//! 它们分别以 `Ok(None)` 和结果枚举的形式返回。

use std::fmt;

use thiserror::Error;

/// 词汇服务错误类型
#[derive(Error, Debug, Clone)]
pub enum VocabError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 存储层错误
    #[error("存储错误: {0}")]
    Store(String),

    /// 外部词典查询错误（网络、状态码、响应格式）
    #[error("词典查询错误: {0}")]
    Lookup(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    Timeout(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 存储数据不一致，例如链接指向不存在的词条
    #[error("数据不一致: {0}")]
    Inconsistent(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl VocabError {
    /// 检查错误是否可重试
    ///
    /// 本crate自身从不重试，这个判断留给调用方（传输层）使用。
    pub fn is_retryable(&self) -> bool {
        match self {
            VocabError::Lookup(_) => true,
            VocabError::Timeout(_) => true,
            VocabError::Store(_) => true,
            VocabError::Config(_) => false,
            VocabError::Parse(_) => false,
            VocabError::Serialization(_) => false,
            VocabError::Inconsistent(_) => false,
            VocabError::InvalidInput(_) => false,
            VocabError::Internal(_) => false,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            VocabError::Config(_) => ErrorCategory::Configuration,
            VocabError::Store(_) | VocabError::Inconsistent(_) => ErrorCategory::Collaborator,
            VocabError::Lookup(_) | VocabError::Timeout(_) | VocabError::Parse(_) => {
                ErrorCategory::Collaborator
            }
            VocabError::Serialization(_) => ErrorCategory::Serialization,
            VocabError::InvalidInput(_) => ErrorCategory::Input,
            VocabError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let current_msg = match &self {
            VocabError::Config(msg)
            | VocabError::Store(msg)
            | VocabError::Lookup(msg)
            | VocabError::Timeout(msg)
            | VocabError::Parse(msg)
            | VocabError::Serialization(msg)
            | VocabError::Inconsistent(msg)
            | VocabError::InvalidInput(msg)
            | VocabError::Internal(msg) => msg.clone(),
        };
        let new_msg = format!("{}: {}", context, current_msg);

        match &mut self {
            VocabError::Config(msg)
            | VocabError::Store(msg)
            | VocabError::Lookup(msg)
            | VocabError::Timeout(msg)
            | VocabError::Parse(msg)
            | VocabError::Serialization(msg)
            | VocabError::Inconsistent(msg)
            | VocabError::InvalidInput(msg)
            | VocabError::Internal(msg) => *msg = new_msg,
        }

        self
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    /// 存储或外部词典失败
    Collaborator,
    Serialization,
    Input,
    Internal,
}

impl From<std::io::Error> for VocabError {
    fn from(error: std::io::Error) -> Self {
        VocabError::Store(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for VocabError {
    fn from(error: serde_json::Error) -> Self {
        VocabError::Serialization(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for VocabError {
    fn from(error: toml::de::Error) -> Self {
        VocabError::Parse(format!("TOML解析错误: {}", error))
    }
}

impl From<reqwest::Error> for VocabError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            VocabError::Timeout(format!("HTTP请求超时: {}", error))
        } else {
            VocabError::Lookup(format!("HTTP请求失败: {}", error))
        }
    }
}

impl From<tokio::time::error::Elapsed> for VocabError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        VocabError::Timeout(format!("异步操作超时: {}", error))
    }
}

impl From<crate::env::EnvError> for VocabError {
    fn from(error: crate::env::EnvError) -> Self {
        VocabError::Config(error.to_string())
    }
}

/// 错误结果类型别名
pub type VocabResult<T> = Result<T, VocabError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 创建存储错误
    pub fn store_error<T: fmt::Display>(msg: T) -> VocabError {
        VocabError::Store(msg.to_string())
    }

    /// 创建词典查询错误
    pub fn lookup_error<T: fmt::Display>(msg: T) -> VocabError {
        VocabError::Lookup(msg.to_string())
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> VocabError {
        VocabError::Config(msg.to_string())
    }

    /// 创建输入验证错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> VocabError {
        VocabError::InvalidInput(msg.to_string())
    }
}
