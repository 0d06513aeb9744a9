//! 并发控制
//!
//! - `keyed_mutex` - 按键互斥的锁原语
//!
//! [`VocabLocks`] 是整个服务共享的一份锁管理器，通过 `Arc` 注入给需要它的组件。

pub mod keyed_mutex;

pub use keyed_mutex::{KeyGuard, KeyedMutex};

use crate::domain::UserId;

/// 服务使用的两类按键锁
#[derive(Debug, Default)]
pub struct VocabLocks {
    /// 按用户ID串行化词汇本操作
    pub users: KeyedMutex<UserId>,
    /// 按归一化文本串行化查词
    pub texts: KeyedMutex<String>,
}

impl VocabLocks {
    pub fn new() -> Self {
        Self::default()
    }
}
