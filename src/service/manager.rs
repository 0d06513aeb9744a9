//! 词汇本管理
//!
//! 每个操作都持有该用户ID的按键锁，先查后写的路径（创建词汇本、添加/移除词条）
//! 因此不会与同一用户的其他操作交错。锁不可重入，锁内只调用不加锁的内部方法。

use std::sync::Arc;

use crate::domain::{EntryId, UserId, Vocab, VocabEntry};
use crate::error::{VocabError, VocabResult};
use crate::service::picker::pick_random_id;
use crate::service::resolver::EntryResolver;
use crate::storage::EntryStore;
use crate::sync::VocabLocks;

/// 创建词汇本的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateVocabOutcome {
    /// 新建的词汇本
    Created(Vocab),
    /// 用户已有词汇本，什么也没做
    AlreadyExists,
}

impl CreateVocabOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, CreateVocabOutcome::Created(_))
    }
}

/// 添加/移除链接的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// 链接状态已改变
    Applied,
    /// 已处于目标状态，什么也没做
    AlreadyInState,
}

/// 词汇本管理器
pub struct VocabManager {
    store: Arc<dyn EntryStore>,
    resolver: Arc<EntryResolver>,
    locks: Arc<VocabLocks>,
}

impl VocabManager {
    pub fn new(
        store: Arc<dyn EntryStore>,
        resolver: Arc<EntryResolver>,
        locks: Arc<VocabLocks>,
    ) -> Self {
        Self {
            store,
            resolver,
            locks,
        }
    }

    /// 为用户创建词汇本，已存在时返回 [`CreateVocabOutcome::AlreadyExists`]
    pub async fn create_vocab(&self, user_id: UserId) -> VocabResult<CreateVocabOutcome> {
        let _guard = self.locks.users.acquire(user_id).await;

        tracing::debug!(user_id, "检查用户是否已有词汇本");
        let existing = self
            .store
            .get_vocab_by_user(user_id)
            .await
            .map_err(|e| e.with_context("按用户ID查询词汇本"))?;
        if existing.is_some() {
            tracing::info!(user_id, "用户已有词汇本，无需创建");
            return Ok(CreateVocabOutcome::AlreadyExists);
        }

        tracing::debug!(user_id, "创建词汇本");
        let vocab = self
            .store
            .create_vocab(user_id)
            .await
            .map_err(|e| e.with_context("创建词汇本"))?;
        metrics::counter!("vocab_vocabs_created_total").increment(1);
        tracing::info!(user_id, vocab_id = vocab.id, "词汇本已创建");
        Ok(CreateVocabOutcome::Created(vocab))
    }

    /// 把词条加入用户的词汇本，已在其中时什么也不做
    pub async fn add_entry_to_user_vocab(
        &self,
        entry_id: EntryId,
        user_id: UserId,
    ) -> VocabResult<MembershipChange> {
        let _guard = self.locks.users.acquire(user_id).await;

        if self.check_locked(entry_id, user_id).await? {
            return Ok(MembershipChange::AlreadyInState);
        }

        tracing::debug!(user_id, entry_id, "把词条加入用户的词汇本");
        self.store
            .link_entry_to_user(entry_id, user_id)
            .await
            .map_err(|e| e.with_context("把词条加入词汇本"))?;
        tracing::info!(user_id, entry_id, "词条已加入用户的词汇本");
        Ok(MembershipChange::Applied)
    }

    /// 把词条移出用户的词汇本，不在其中时什么也不做
    pub async fn remove_entry_from_user_vocab(
        &self,
        entry_id: EntryId,
        user_id: UserId,
    ) -> VocabResult<MembershipChange> {
        let _guard = self.locks.users.acquire(user_id).await;

        if !self.check_locked(entry_id, user_id).await? {
            return Ok(MembershipChange::AlreadyInState);
        }

        tracing::debug!(user_id, entry_id, "把词条移出用户的词汇本");
        self.store
            .unlink_entry_from_user(entry_id, user_id)
            .await
            .map_err(|e| e.with_context("把词条移出词汇本"))?;
        tracing::info!(user_id, entry_id, "词条已移出用户的词汇本");
        Ok(MembershipChange::Applied)
    }

    /// 词条是否在用户的词汇本中
    pub async fn check_entry_in_user_vocab(
        &self,
        entry_id: EntryId,
        user_id: UserId,
    ) -> VocabResult<bool> {
        let _guard = self.locks.users.acquire(user_id).await;
        self.check_locked(entry_id, user_id).await
    }

    async fn check_locked(&self, entry_id: EntryId, user_id: UserId) -> VocabResult<bool> {
        tracing::debug!(user_id, entry_id, "检查词条是否在用户的词汇本中");
        let linked = self
            .store
            .is_linked(entry_id, user_id)
            .await
            .map_err(|e| e.with_context("检查词条是否在词汇本中"))?;
        if linked {
            tracing::info!(user_id, entry_id, "词条在用户的词汇本中");
        } else {
            tracing::info!(user_id, entry_id, "词条不在用户的词汇本中");
        }
        Ok(linked)
    }

    /// 列出用户词汇本中的全部词条，按文本排序
    pub async fn list_entries(&self, user_id: UserId) -> VocabResult<Vec<VocabEntry>> {
        let _guard = self.locks.users.acquire(user_id).await;

        tracing::debug!(user_id, "获取词汇本中的词条");
        let mut entries = self
            .store
            .list_linked_entries(user_id)
            .await
            .map_err(|e| e.with_context("按用户ID获取词条"))?;
        entries.sort_by(|a, b| a.text.cmp(&b.text));
        tracing::info!(user_id, "找到 {} 个词条", entries.len());
        Ok(entries)
    }

    /// 随机取一个用于复习的词条，尽量不与 `exclude` 相同
    ///
    /// 词汇本为空时返回 `None`；只有一个词条时即使与 `exclude` 相同也返回它。
    /// 链接指向的词条不存在时返回 [`VocabError::Inconsistent`]。
    pub async fn pick_random_entry(
        &self,
        user_id: UserId,
        exclude: Option<EntryId>,
    ) -> VocabResult<Option<VocabEntry>> {
        let _guard = self.locks.users.acquire(user_id).await;

        tracing::debug!(user_id, exclude = ?exclude, "随机选取词条");
        let ids = self
            .store
            .list_linked_entry_ids(user_id)
            .await
            .map_err(|e| e.with_context("按用户ID获取词条ID"))?;

        let picked = {
            let mut rng = rand::thread_rng();
            pick_random_id(&ids, exclude, &mut rng)
        };
        let Some(id) = picked else {
            tracing::info!(user_id, "用户的词汇本为空");
            return Ok(None);
        };

        match self.resolver.resolve_by_id(id).await? {
            Some(entry) => {
                tracing::info!(user_id, entry_id = id, "选中词条");
                Ok(Some(entry))
            }
            None => Err(VocabError::Inconsistent(format!(
                "用户 {} 的词汇本链接了不存在的词条 {}",
                user_id, id
            ))),
        }
    }

    /// 清空用户的词汇本，只删除链接，词条保留（多个用户共享）
    pub async fn clear_user_vocab(&self, user_id: UserId) -> VocabResult<()> {
        let _guard = self.locks.users.acquire(user_id).await;

        tracing::debug!(user_id, "清空用户的词汇本");
        self.store
            .clear_vocab_links(user_id)
            .await
            .map_err(|e| e.with_context("清空词汇本"))?;
        tracing::info!(user_id, "用户的词汇本已清空");
        Ok(())
    }
}
