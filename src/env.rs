//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，用于覆盖配置文件中的值

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// 仅在变量被显式设置时返回值，未设置返回 `None`，格式错误返回错误
    fn get_override() -> EnvResult<Option<T>> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value).map(Some),
            Err(_) => Ok(None),
        }
    }
}

/// 日志相关环境变量
pub mod logging {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "VOCAB_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            parse_log_level(value, Self::NAME)
        }
    }

    /// 日志文件
    pub struct LogFile;
    impl EnvVar<String> for LogFile {
        const NAME: &'static str = "VOCAB_LOG_FILE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Append logs to this file instead of stderr";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }
}

/// 词典服务相关环境变量
pub mod dictionary {
    use super::*;

    /// 词典 API 地址
    pub struct Url;
    impl EnvVar<String> for Url {
        const NAME: &'static str = "VOCAB_DICTIONARY_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Dictionary lookup endpoint (http or https)";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "URL must start with http:// or https://".to_string(),
                });
            }
            Ok(url.to_string())
        }
    }

    /// 词典 API 令牌
    pub struct Token;
    impl EnvVar<String> for Token {
        const NAME: &'static str = "VOCAB_DICTIONARY_TOKEN";
        const DEFAULT: Option<String> = None; // 无默认值，查词时必须设置
        const DESCRIPTION: &'static str = "Dictionary API key";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// 语言方向
    pub struct Lang;
    impl EnvVar<String> for Lang {
        const NAME: &'static str = "VOCAB_DICTIONARY_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Language pair, e.g. en-ru";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("en-ru".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            let lang = value.trim().to_lowercase();
            let valid = lang
                .split_once('-')
                .map(|(from, to)| from.len() == 2 && to.len() == 2)
                .unwrap_or(false);
            if !valid {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Language pair must look like 'en-ru'".to_string(),
                });
            }
            Ok(lang)
        }
    }

    /// 请求超时
    pub struct Timeout;
    impl EnvVar<Duration> for Timeout {
        const NAME: &'static str = "VOCAB_DICTIONARY_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(5));
        const DESCRIPTION: &'static str = "Dictionary request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds: u64 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of seconds".to_string(),
            })?;

            if seconds == 0 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout must be greater than 0".to_string(),
                });
            }

            if seconds > 120 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout too long (max 120 seconds)".to_string(),
                });
            }

            Ok(Duration::from_secs(seconds))
        }
    }
}

/// 存储相关环境变量
pub mod storage {
    use super::*;

    /// 快照文件路径
    pub struct DataFile;
    impl EnvVar<String> for DataFile {
        const NAME: &'static str = "VOCAB_DATA_FILE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Path of the JSON snapshot used by the in-memory store";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }
}

/// 辅助函数
fn parse_log_level(value: &str, var_name: &str) -> EnvResult<String> {
    match value.trim().to_lowercase().as_str() {
        level @ ("trace" | "debug" | "info" | "warn" | "error") => Ok(level.to_string()),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                value
            ),
        }),
    }
}

fn parse_non_empty(value: &str, var_name: &str) -> EnvResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: "Value must not be empty".to_string(),
        });
    }
    Ok(value.to_string())
}

/// 检查日志级别字符串，供配置校验复用
pub fn validate_log_level(value: &str) -> EnvResult<String> {
    parse_log_level(value, logging::LogLevel::NAME)
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    docs.push_str("## Logging\n\n");
    docs.push_str(&format!("- `{}`: {}\n", logging::LogLevel::NAME, logging::LogLevel::DESCRIPTION));
    docs.push_str(&format!("- `{}`: {}\n", logging::LogFile::NAME, logging::LogFile::DESCRIPTION));

    docs.push_str("\n## Dictionary\n\n");
    docs.push_str(&format!("- `{}`: {}\n", dictionary::Url::NAME, dictionary::Url::DESCRIPTION));
    docs.push_str(&format!("- `{}`: {}\n", dictionary::Token::NAME, dictionary::Token::DESCRIPTION));
    docs.push_str(&format!("- `{}`: {}\n", dictionary::Lang::NAME, dictionary::Lang::DESCRIPTION));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        dictionary::Timeout::NAME,
        dictionary::Timeout::DESCRIPTION,
        dictionary::Timeout::DEFAULT
    ));

    docs.push_str("\n## Storage\n\n");
    docs.push_str(&format!("- `{}`: {}\n", storage::DataFile::NAME, storage::DataFile::DESCRIPTION));

    docs
}
