//! 配置管理器
//!
//! 提供统一的配置接口，按 默认值 → 配置文件 → 环境变量 的顺序叠加

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::error::{VocabError, VocabResult};

/// 词汇服务配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VocabConfig {
    // 日志配置
    pub log_level: String,
    pub log_file: Option<String>,

    // 词典配置
    pub dictionary_url: String,
    pub dictionary_token: String,
    pub dictionary_lang: String,
    pub dictionary_timeout_secs: u64,

    // 存储配置
    pub data_file: String,
}

impl Default for VocabConfig {
    fn default() -> Self {
        Self {
            log_level: constants::DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,

            dictionary_url: constants::DEFAULT_DICTIONARY_URL.to_string(),
            dictionary_token: String::new(),
            dictionary_lang: constants::DEFAULT_DICTIONARY_LANG.to_string(),
            dictionary_timeout_secs: constants::DEFAULT_DICTIONARY_TIMEOUT.as_secs(),

            data_file: constants::DEFAULT_DATA_FILE.to_string(),
        }
    }
}

impl VocabConfig {
    /// 验证配置
    ///
    /// 词典令牌不在这里检查，只有真正查词时才需要它，见 [`VocabConfig::require_dictionary_token`]。
    pub fn validate(&self) -> VocabResult<()> {
        crate::env::validate_log_level(&self.log_level)?;

        url::Url::parse(&self.dictionary_url)
            .map_err(|e| VocabError::Config(format!("词典地址无效 '{}': {}", self.dictionary_url, e)))?;

        if self.dictionary_timeout_secs == 0 {
            return Err(VocabError::Config("词典请求超时不能为0".to_string()));
        }

        if self.data_file.trim().is_empty() {
            return Err(VocabError::Config("数据文件路径不能为空".to_string()));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) -> VocabResult<()> {
        use crate::env::{dictionary, logging, storage, EnvVar};

        if let Some(level) = logging::LogLevel::get_override()? {
            self.log_level = level;
        }

        if let Some(file) = logging::LogFile::get_override()? {
            self.log_file = Some(file);
        }

        if let Some(url) = dictionary::Url::get_override()? {
            tracing::info!("环境变量覆盖词典地址: {}", url);
            self.dictionary_url = url;
        }

        if let Some(token) = dictionary::Token::get_override()? {
            self.dictionary_token = token;
        }

        if let Some(lang) = dictionary::Lang::get_override()? {
            self.dictionary_lang = lang;
        }

        if let Some(timeout) = dictionary::Timeout::get_override()? {
            self.dictionary_timeout_secs = timeout.as_secs();
        }

        if let Some(data_file) = storage::DataFile::get_override()? {
            self.data_file = data_file;
        }

        Ok(())
    }

    /// 转换为Duration类型
    pub fn dictionary_timeout(&self) -> Duration {
        Duration::from_secs(self.dictionary_timeout_secs)
    }

    /// 展开 `~` 后的数据文件路径
    pub fn data_file_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.data_file).as_ref())
    }

    /// 查词前调用，令牌缺失时返回配置错误
    pub fn require_dictionary_token(&self) -> VocabResult<&str> {
        if self.dictionary_token.trim().is_empty() {
            return Err(VocabError::Config(format!(
                "未配置词典令牌，请在配置文件中设置 dictionary_token 或设置 {}",
                <crate::env::dictionary::Token as crate::env::EnvVar<String>>::NAME
            )));
        }
        Ok(&self.dictionary_token)
    }
}

/// 配置管理器
pub struct ConfigManager {
    config: VocabConfig,
}

impl ConfigManager {
    /// 从默认搜索路径加载配置
    pub fn new() -> VocabResult<Self> {
        Self::load_dotenv();
        let config = Self::load_config()?;
        Self::finish(config)
    }

    /// 从指定文件加载配置
    pub fn from_path<P: AsRef<Path>>(path: P) -> VocabResult<Self> {
        Self::load_dotenv();
        let expanded = shellexpand::tilde(&path.as_ref().to_string_lossy()).into_owned();
        tracing::info!("加载配置文件: {}", expanded);
        let config = Self::load_from_file(&expanded)?;
        Self::finish(config)
    }

    /// 获取配置
    pub fn get_config(&self) -> &VocabConfig {
        &self.config
    }

    /// 取出配置
    pub fn into_config(self) -> VocabConfig {
        self.config
    }

    fn finish(mut config: VocabConfig) -> VocabResult<Self> {
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(Self { config })
    }

    fn load_config() -> VocabResult<VocabConfig> {
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(VocabConfig::default())
    }

    fn load_from_file(path: &str) -> VocabResult<VocabConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VocabError::Config(format!("读取配置文件失败 {}: {}", path, e)))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .map_err(|e| VocabError::Config(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| VocabError::Config(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> VocabResult<()> {
        let config = VocabConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| VocabError::Config(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VocabError::Config(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
