//! Yandex.Dictionary 查词实现
//!
//! 请求 `lookup?key=<token>&lang=<lang>&text=<text>`，把返回的释义转换为词条。

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::LookupProvider;
use crate::config::VocabConfig;
use crate::domain::{Translation, VocabEntry};
use crate::error::helpers::{config_error, lookup_error};
use crate::error::{VocabError, VocabResult};

/// 词典响应
#[derive(Debug, Default, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub def: Vec<Definition>,
}

/// 一个词性下的释义
#[derive(Debug, Default, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pos: String,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub tr: Vec<DefinitionTranslation>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DefinitionTranslation {
    #[serde(default)]
    pub text: String,
}

/// Yandex.Dictionary 客户端
#[derive(Debug, Clone)]
pub struct YandexDictionary {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    lang: String,
}

impl YandexDictionary {
    /// 创建客户端，`timeout` 限制单次请求的总耗时
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        lang: impl Into<String>,
        timeout: Duration,
    ) -> VocabResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| config_error(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
            lang: lang.into(),
        })
    }

    /// 按配置创建，缺少令牌时返回配置错误
    pub fn from_config(config: &VocabConfig) -> VocabResult<Self> {
        let token = config.require_dictionary_token()?;
        Self::new(
            config.dictionary_url.clone(),
            token,
            config.dictionary_lang.clone(),
            config.dictionary_timeout(),
        )
    }

    fn request_url(&self, text: &str) -> VocabResult<url::Url> {
        url::Url::parse_with_params(
            &self.endpoint,
            &[
                ("key", self.token.as_str()),
                ("lang", self.lang.as_str()),
                ("text", text),
            ],
        )
        .map_err(|e| config_error(format!("词典地址无效: {}", e)))
    }
}

#[async_trait]
impl LookupProvider for YandexDictionary {
    async fn lookup(&self, text: &str) -> VocabResult<Option<VocabEntry>> {
        tracing::debug!(text, "从 Yandex 词典查询词条");
        let url = self.request_url(text)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(lookup_error(format!(
                "Yandex 词典返回状态码 {}，响应体 {}",
                status, body
            )));
        }
        tracing::debug!(text, body = %body, "Yandex 词典响应");

        let parsed = parse_response(&body)?;
        let entry = convert_to_entry(text, &parsed);
        if entry.is_none() {
            tracing::info!(text, "Yandex 词典中没有可用译文");
        }
        Ok(entry)
    }
}

/// 解析响应体
pub fn parse_response(body: &str) -> VocabResult<LookupResponse> {
    serde_json::from_str(body).map_err(|e| VocabError::Parse(format!("解析词典响应失败: {}", e)))
}

/// 把响应转换为词条
///
/// 跳过文本与查询不一致（忽略大小写）的释义和没有词性的释义；
/// 第一个非空音标作为词条音标；译文位置连续编号。没有译文时返回 `None`。
pub fn convert_to_entry(text: &str, response: &LookupResponse) -> Option<VocabEntry> {
    let query = text.to_lowercase();
    let mut entry = VocabEntry::new(text);
    let mut position = 0u32;

    for def in &response.def {
        if def.text.to_lowercase() != query {
            continue;
        }
        if entry.transcription.is_none() && !def.ts.is_empty() {
            entry.transcription = Some(def.ts.clone());
        }
        if def.pos.is_empty() {
            continue;
        }
        for tr in &def.tr {
            entry
                .translations
                .push(Translation::new(tr.text.clone(), def.pos.clone(), position));
            position += 1;
        }
    }

    entry.has_translations().then_some(entry)
}
