//! 领域模型
//!
//! 词汇本、词条与译文

use std::fmt;

use serde::{Deserialize, Serialize};

/// 用户ID（聊天平台分配）
pub type UserId = i64;
/// 存储层分配的ID
pub type EntryId = i64;
pub type VocabId = i64;
pub type TranslationId = i64;

/// 归一化查询文本：去掉首尾空白并转为小写
///
/// 存储查询键和锁键必须使用同一个归一化结果。
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// 用户的词汇本，每个用户最多一个
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocab {
    pub id: VocabId,
    pub user_id: UserId,
}

impl fmt::Display for Vocab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID: {}; UserID: {}", self.id, self.user_id)
    }
}

/// 译文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: Option<TranslationId>,
    pub text: String,
    /// 词性，可以为空
    pub class: String,
    /// 在同一词条译文中的排名，从0开始
    pub position: u32,
}

impl Translation {
    pub fn new(text: impl Into<String>, class: impl Into<String>, position: u32) -> Self {
        Self {
            id: None,
            text: text.into(),
            class: class.into(),
            position,
        }
    }
}

/// 词条
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabEntry {
    /// 持久化之前为 `None`
    pub id: Option<EntryId>,
    pub text: String,
    pub transcription: Option<String>,
    pub translations: Vec<Translation>,
}

impl VocabEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            transcription: None,
            translations: Vec::new(),
        }
    }

    pub fn with_transcription(mut self, transcription: impl Into<String>) -> Self {
        let transcription = transcription.into();
        self.transcription = (!transcription.is_empty()).then_some(transcription);
        self
    }

    /// 追加一条译文，位置取当前译文数量
    pub fn with_translation(mut self, text: impl Into<String>, class: impl Into<String>) -> Self {
        let position = self.translations.len() as u32;
        self.translations.push(Translation::new(text, class, position));
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// 没有译文的词条一律视为“未找到”
    pub fn has_translations(&self) -> bool {
        !self.translations.is_empty()
    }

    /// 按位置排序译文
    pub fn sort_translations(&mut self) {
        self.translations.sort_by_key(|t| t.position);
    }

    /// 主译文：位置为0的译文
    pub fn main_translation(&self) -> Option<&str> {
        self.translations
            .iter()
            .min_by_key(|t| t.position)
            .map(|t| t.text.as_str())
    }

    /// 简短描述：音标加主译文
    pub fn short_desc(&self) -> String {
        let main = self.main_translation().unwrap_or_default();
        match self.transcription.as_deref() {
            Some(ts) => format!("[{}]\n{}", ts, main),
            None => main.to_string(),
        }
    }

    /// 完整描述：按词性分组列出全部译文
    pub fn full_desc(&self, print_text: bool) -> String {
        let mut out = String::new();
        if print_text {
            out.push_str(&self.text);
            out.push('\n');
        }
        if let Some(ts) = self.transcription.as_deref() {
            out.push_str(&format!("[{}]", ts));
        }

        let mut ordered: Vec<&Translation> = self.translations.iter().collect();
        ordered.sort_by_key(|t| t.position);

        let mut last_class: Option<&str> = None;
        for t in ordered {
            if last_class != Some(t.class.as_str()) {
                out.push_str(&format!("\n\n{}: {}", t.class, t.text));
                last_class = Some(t.class.as_str());
            } else {
                out.push_str(&format!(", {}", t.text));
            }
        }
        out
    }
}

impl fmt::Display for VocabEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {:?}; Text: {}; Transcription: {}; MainTranslation: {}; Translations: {}",
            self.id,
            self.text,
            self.transcription.as_deref().unwrap_or_default(),
            self.main_translation().unwrap_or_default(),
            self.translations.len()
        )
    }
}
