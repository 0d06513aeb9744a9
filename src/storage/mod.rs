//! 存储层
//!
//! - [`EntryStore`] - 词汇本、词条和成员链接的持久化接口
//! - `memory` - 内存实现，可选JSON快照文件

pub mod memory;

pub use memory::{MemoryStore, StoreStats};

use async_trait::async_trait;

use crate::domain::{EntryId, UserId, Vocab, VocabEntry};
use crate::error::VocabResult;

/// 存储接口
///
/// 所有方法都可能返回存储错误，上层不重试。上层的“先查后写”依赖按键锁，
/// 不依赖存储事务。
#[async_trait]
pub trait EntryStore: Send + Sync {
    // ── 词汇本 ──

    async fn get_vocab_by_user(&self, user_id: UserId) -> VocabResult<Option<Vocab>>;
    async fn create_vocab(&self, user_id: UserId) -> VocabResult<Vocab>;
    /// 删除用户的全部成员链接，词条本身保留
    async fn clear_vocab_links(&self, user_id: UserId) -> VocabResult<()>;

    // ── 词条 ──

    async fn get_entry_by_text(&self, text: &str) -> VocabResult<Option<VocabEntry>>;
    async fn get_entry_by_id(&self, id: EntryId) -> VocabResult<Option<VocabEntry>>;
    /// 保存词条及其译文，返回带有存储ID的副本
    async fn create_entry(&self, entry: VocabEntry) -> VocabResult<VocabEntry>;

    // ── 成员链接 ──

    async fn link_entry_to_user(&self, entry_id: EntryId, user_id: UserId) -> VocabResult<()>;
    async fn unlink_entry_from_user(&self, entry_id: EntryId, user_id: UserId) -> VocabResult<()>;
    async fn is_linked(&self, entry_id: EntryId, user_id: UserId) -> VocabResult<bool>;
    async fn list_linked_entry_ids(&self, user_id: UserId) -> VocabResult<Vec<EntryId>>;
    async fn list_linked_entries(&self, user_id: UserId) -> VocabResult<Vec<VocabEntry>>;
}
