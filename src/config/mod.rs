//! 配置管理模块
//!
//! 支持配置文件、环境变量和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, VocabConfig};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 词典设置
    pub const DEFAULT_DICTIONARY_URL: &str =
        "https://dictionary.yandex.net/api/v1/dicservice.json/lookup";
    pub const DEFAULT_DICTIONARY_LANG: &str = "en-ru";
    pub const DEFAULT_DICTIONARY_TIMEOUT: Duration = Duration::from_secs(5);

    // 存储设置
    pub const DEFAULT_DATA_FILE: &str = "~/.vocab-keeper/vocab.json";

    pub const DEFAULT_LOG_LEVEL: &str = "info";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "vocab-keeper.toml",
        "config.toml",
        ".vocab-keeper.toml",
        "~/.vocab-keeper/config.toml",
        "~/.config/vocab-keeper/config.toml",
        "/etc/vocab-keeper/config.toml",
    ];
}
