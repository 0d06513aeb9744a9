//! 外部词典
//!
//! - [`LookupProvider`] - 本地存储未命中时使用的查词接口
//! - `yandex` - Yandex.Dictionary HTTP 实现

pub mod yandex;

pub use yandex::YandexDictionary;

use async_trait::async_trait;

use crate::domain::VocabEntry;
use crate::error::VocabResult;

/// 外部查词接口
///
/// 找到时返回未持久化（`id` 为空）且至少含一条译文的词条；未找到返回 `None`。
/// 网络错误、非成功状态码和格式错误的响应都以错误返回，而不是 `None`。
/// 调用超时由实现自己限制。
#[async_trait]
pub trait LookupProvider: Send + Sync {
    async fn lookup(&self, text: &str) -> VocabResult<Option<VocabEntry>>;
}
