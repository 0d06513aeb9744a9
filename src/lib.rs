//! # Vocab Keeper
//!
//! 个人词汇本服务的核心：用户查词、把词条加入自己的词汇本、随机复习。
//!
//! ## 模块组织
//!
//! - `sync` - 按键互斥锁，同一个键上的临界区串行执行
//! - `service` - 词条解析（旁路缓存）、词汇本管理和随机选词
//! - `storage` - 存储接口和内存实现
//! - `dictionary` - 外部词典接口和 Yandex 实现
//! - `domain` - 词汇本、词条、译文
//! - `config` / `env` - 配置文件和环境变量
//! - `error` - 统一错误类型

pub mod config;
pub mod dictionary;
pub mod domain;
pub mod env;
pub mod error;
pub mod service;
pub mod storage;
pub mod sync;

// Re-export commonly used items for convenience
pub use dictionary::{LookupProvider, YandexDictionary};
pub use domain::{normalize, EntryId, Translation, UserId, Vocab, VocabEntry};
pub use error::{VocabError, VocabResult};
pub use service::{
    CreateVocabOutcome, EntryResolver, MembershipChange, VocabManager, VocabService,
};
pub use storage::{EntryStore, MemoryStore};
pub use sync::{KeyGuard, KeyedMutex, VocabLocks};
