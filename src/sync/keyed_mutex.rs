//! 按键互斥锁
//!
//! 同一个键同一时刻最多只有一个持有者；不同键之间互不阻塞。
//!
//! 内部维护 `键 -> 完成信号` 的映射，由一把短临界区的 `std::sync::Mutex` 保护，
//! 临界区内从不 `.await`。持有者的完成信号是一个 `watch` 通道的发送端：
//! 释放时先从映射中移除条目，再丢弃发送端，所有等待者的 `changed()` 随即返回，
//! 然后各自重新尝试获取。没有公平性保证。

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// 按键互斥锁
pub struct KeyedMutex<K> {
    in_work: Mutex<HashMap<K, watch::Receiver<()>>>,
}

/// 持有某个键的凭证，丢弃即释放
///
/// 释放发生在所有退出路径上：正常返回、`?` 提前返回、持有者的 future 被取消。
#[must_use = "键在凭证被丢弃时立即释放"]
pub struct KeyGuard<'a, K>
where
    K: Eq + Hash,
{
    owner: &'a KeyedMutex<K>,
    key: K,
    _done: watch::Sender<()>,
}

impl<K> KeyedMutex<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            in_work: Mutex::new(HashMap::new()),
        }
    }

    /// 获取键，键被占用时挂起直到可用
    pub async fn acquire(&self, key: K) -> KeyGuard<'_, K> {
        loop {
            let mut done = match self.try_insert(&key) {
                Ok(guard) => return guard,
                Err(done) => done,
            };
            // 持有者丢弃发送端后返回 Err，之后重新竞争
            let _ = done.changed().await;
        }
    }

    /// 非阻塞获取，键被占用时返回 `None`
    pub fn try_acquire(&self, key: K) -> Option<KeyGuard<'_, K>> {
        self.try_insert(&key).ok()
    }

    /// 在持有键的情况下执行一段异步代码
    pub async fn run<F, T>(&self, key: K, section: F) -> T
    where
        F: Future<Output = T>,
    {
        let _guard = self.acquire(key).await;
        section.await
    }

    /// 键当前是否被持有
    pub fn is_locked(&self, key: &K) -> bool {
        self.lock_map().contains_key(key)
    }

    /// 当前被持有的键数量
    pub fn len(&self) -> usize {
        self.lock_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn try_insert(&self, key: &K) -> Result<KeyGuard<'_, K>, watch::Receiver<()>> {
        let mut in_work = self.lock_map();
        if let Some(done) = in_work.get(key) {
            return Err(done.clone());
        }
        let (tx, rx) = watch::channel(());
        in_work.insert(key.clone(), rx);
        Ok(KeyGuard {
            owner: self,
            key: key.clone(),
            _done: tx,
        })
    }
}

impl<K> KeyedMutex<K>
where
    K: Eq + Hash,
{
    // 映射里只有插入和删除，中毒时数据仍然一致
    fn lock_map(&self) -> MutexGuard<'_, HashMap<K, watch::Receiver<()>>> {
        self.in_work.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K> Default for KeyedMutex<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            in_work: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> fmt::Debug for KeyedMutex<K>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedMutex")
            .field("held_keys", &self.lock_map().len())
            .finish()
    }
}

impl<K> KeyGuard<'_, K>
where
    K: Eq + Hash,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    /// 显式释放，等同于丢弃凭证
    pub fn release(self) {}
}

impl<K> Drop for KeyGuard<'_, K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        // 先移除条目，字段析构时发送端才被丢弃并唤醒等待者
        self.owner.lock_map().remove(&self.key);
    }
}

impl<K> fmt::Debug for KeyGuard<'_, K>
where
    K: Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_guard_release_frees_entry() {
        let locks: KeyedMutex<u32> = KeyedMutex::new();
        let guard = locks.acquire(1).await;
        assert!(locks.is_locked(&1));
        assert_eq!(locks.len(), 1);

        guard.release();
        assert!(!locks.is_locked(&1));
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_try_acquire_on_busy_key() {
        let locks: KeyedMutex<&str> = KeyedMutex::new();
        let held = locks.acquire("a").await;

        assert!(locks.try_acquire("a").is_none());
        assert!(locks.try_acquire("b").is_some());

        drop(held);
        assert!(locks.try_acquire("a").is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_sections_never_overlap() {
        let locks = Arc::new(KeyedMutex::<u32>::new());
        let active = Arc::new(AtomicUsize::new(0));
        let intervals = Arc::new(Mutex::new(Vec::new()));

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let active = Arc::clone(&active);
                let intervals = Arc::clone(&intervals);
                tokio::spawn(async move {
                    let _guard = locks.acquire(7).await;
                    assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0);
                    let start = Instant::now();
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    let end = Instant::now();
                    active.fetch_sub(1, Ordering::SeqCst);
                    intervals.lock().unwrap().push((start, end));
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        let mut intervals = intervals.lock().unwrap().clone();
        intervals.sort_by_key(|(start, _)| *start);
        assert_eq!(intervals.len(), 20);
        for pair in intervals.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "guarded sections overlapped");
        }
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_distinct_keys_do_not_block() {
        let locks = Arc::new(KeyedMutex::<u32>::new());
        let _held = locks.acquire(1).await;

        let other = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.run(2, async { "done" }).await })
        };

        let result = tokio::time::timeout(Duration::from_secs(1), other)
            .await
            .expect("key 2 waited on key 1")
            .unwrap();
        assert_eq!(result, "done");
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let locks = Arc::new(KeyedMutex::<u32>::new());
        let held = locks.acquire(3).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(3).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter never woke up")
            .unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_holder_releases_key() {
        let locks = Arc::new(KeyedMutex::<u32>::new());

        let holder = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(9).await;
                tokio::time::sleep(Duration::from_secs(3600)).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(locks.is_locked(&9));

        holder.abort();
        let _ = holder.await;

        let guard = tokio::time::timeout(Duration::from_secs(1), locks.acquire(9))
            .await
            .expect("aborted holder kept the key");
        assert_eq!(*guard.key(), 9);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_no_trace() {
        let locks = KeyedMutex::<u32>::new();
        let held = locks.acquire(4).await;

        let attempt = tokio::time::timeout(Duration::from_millis(10), locks.acquire(4)).await;
        assert!(attempt.is_err());

        drop(held);
        assert!(locks.is_empty());
    }
}
