//! 词汇服务
//!
//! 本模块把按键锁、词条解析器和词汇本管理器组装成一个对外服务。
//! 传输层（聊天机器人、CLI）只与 [`VocabService`] 打交道。
//!
//! ## 模块依赖关系
//!
//! ```text
//! VocabService
//!     ├── VocabManager (manager.rs)  ── 按用户ID加锁
//!     │       └── pick_random_id (picker.rs)
//!     └── EntryResolver (resolver.rs) ── 按归一化文本加锁
//!             ├── EntryStore (storage)
//!             └── LookupProvider (dictionary)
//! ```
//!
//! ## 使用示例
//!
//! ```no_run
//! use std::sync::Arc;
//! use vocab_keeper::{MemoryStore, VocabService, YandexDictionary};
//! use vocab_keeper::config::VocabConfig;
//!
//! # async fn run() -> vocab_keeper::VocabResult<()> {
//! let config = VocabConfig::default();
//! let store = Arc::new(MemoryStore::new());
//! let dictionary = Arc::new(YandexDictionary::from_config(&config)?);
//! let service = VocabService::new(store, dictionary);
//!
//! service.create_vocab(42).await?;
//! if let Some(entry) = service.resolve_by_text("Hello").await? {
//!     if let Some(id) = entry.id {
//!         service.add_entry_to_user_vocab(id, 42).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod picker;
pub mod resolver;

pub use manager::{CreateVocabOutcome, MembershipChange, VocabManager};
pub use resolver::{EntryResolver, ResolverStats, ResolverStatsSnapshot};

use std::sync::Arc;

use crate::dictionary::LookupProvider;
use crate::domain::{EntryId, UserId, VocabEntry};
use crate::error::VocabResult;
use crate::storage::EntryStore;
use crate::sync::VocabLocks;

/// 对外的词汇服务
pub struct VocabService {
    resolver: Arc<EntryResolver>,
    manager: VocabManager,
    locks: Arc<VocabLocks>,
}

impl VocabService {
    /// 使用新的锁管理器组装服务
    pub fn new(store: Arc<dyn EntryStore>, provider: Arc<dyn LookupProvider>) -> Self {
        Self::with_locks(store, provider, Arc::new(VocabLocks::new()))
    }

    /// 使用调用方提供的锁管理器组装服务
    ///
    /// 同一进程内操作同一份存储的多个服务实例必须共享同一个 `locks`。
    pub fn with_locks(
        store: Arc<dyn EntryStore>,
        provider: Arc<dyn LookupProvider>,
        locks: Arc<VocabLocks>,
    ) -> Self {
        let resolver = Arc::new(EntryResolver::new(
            Arc::clone(&store),
            provider,
            Arc::clone(&locks),
        ));
        let manager = VocabManager::new(store, Arc::clone(&resolver), Arc::clone(&locks));

        Self {
            resolver,
            manager,
            locks,
        }
    }

    pub fn resolver(&self) -> &EntryResolver {
        &self.resolver
    }

    pub fn manager(&self) -> &VocabManager {
        &self.manager
    }

    pub fn locks(&self) -> &Arc<VocabLocks> {
        &self.locks
    }

    pub async fn resolve_by_text(&self, text: &str) -> VocabResult<Option<VocabEntry>> {
        self.resolver.resolve_by_text(text).await
    }

    pub async fn resolve_by_id(&self, id: EntryId) -> VocabResult<Option<VocabEntry>> {
        self.resolver.resolve_by_id(id).await
    }

    pub async fn create_vocab(&self, user_id: UserId) -> VocabResult<CreateVocabOutcome> {
        self.manager.create_vocab(user_id).await
    }

    pub async fn add_entry_to_user_vocab(
        &self,
        entry_id: EntryId,
        user_id: UserId,
    ) -> VocabResult<MembershipChange> {
        self.manager.add_entry_to_user_vocab(entry_id, user_id).await
    }

    pub async fn remove_entry_from_user_vocab(
        &self,
        entry_id: EntryId,
        user_id: UserId,
    ) -> VocabResult<MembershipChange> {
        self.manager.remove_entry_from_user_vocab(entry_id, user_id).await
    }

    pub async fn check_entry_in_user_vocab(
        &self,
        entry_id: EntryId,
        user_id: UserId,
    ) -> VocabResult<bool> {
        self.manager.check_entry_in_user_vocab(entry_id, user_id).await
    }

    pub async fn list_entries(&self, user_id: UserId) -> VocabResult<Vec<VocabEntry>> {
        self.manager.list_entries(user_id).await
    }

    pub async fn pick_random_entry(
        &self,
        user_id: UserId,
        exclude: Option<EntryId>,
    ) -> VocabResult<Option<VocabEntry>> {
        self.manager.pick_random_entry(user_id, exclude).await
    }

    pub async fn clear_user_vocab(&self, user_id: UserId) -> VocabResult<()> {
        self.manager.clear_user_vocab(user_id).await
    }

    /// 解析器统计快照
    pub fn stats(&self) -> ResolverStatsSnapshot {
        self.resolver.stats()
    }
}
