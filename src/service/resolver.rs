//! 词条解析器
//!
//! 旁路缓存：先查本地存储，未命中再查外部词典并写回存储。
//! 查文本的整个过程持有该文本（归一化后）的按键锁，
//! 所以同一个词并发请求时只会有一次外部查询和一次写入。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::dictionary::LookupProvider;
use crate::domain::{normalize, EntryId, VocabEntry};
use crate::error::{helpers::validation_error, VocabResult};
use crate::storage::EntryStore;
use crate::sync::VocabLocks;

/// 解析器统计信息
#[derive(Debug, Default)]
pub struct ResolverStats {
    /// 本地存储命中次数
    pub store_hits: AtomicU64,
    /// 本地存储未命中次数
    pub store_misses: AtomicU64,
    /// 外部词典调用次数
    pub external_lookups: AtomicU64,
    /// 外部词典未找到次数
    pub not_found: AtomicU64,
    /// 写入存储的新词条数量
    pub entries_created: AtomicU64,
}

/// 解析器统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStatsSnapshot {
    pub store_hits: u64,
    pub store_misses: u64,
    pub external_lookups: u64,
    pub not_found: u64,
    pub entries_created: u64,
}

impl ResolverStats {
    pub fn snapshot(&self) -> ResolverStatsSnapshot {
        ResolverStatsSnapshot {
            store_hits: self.store_hits.load(Ordering::Relaxed),
            store_misses: self.store_misses.load(Ordering::Relaxed),
            external_lookups: self.external_lookups.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            entries_created: self.entries_created.load(Ordering::Relaxed),
        }
    }

    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl ResolverStatsSnapshot {
    /// 本地存储命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.store_hits + self.store_misses;
        if total == 0 {
            0.0
        } else {
            self.store_hits as f64 / total as f64
        }
    }
}

/// 词条解析器
pub struct EntryResolver {
    store: Arc<dyn EntryStore>,
    provider: Arc<dyn LookupProvider>,
    locks: Arc<VocabLocks>,
    stats: ResolverStats,
}

impl EntryResolver {
    pub fn new(
        store: Arc<dyn EntryStore>,
        provider: Arc<dyn LookupProvider>,
        locks: Arc<VocabLocks>,
    ) -> Self {
        Self {
            store,
            provider,
            locks,
            stats: ResolverStats::default(),
        }
    }

    /// 按文本解析词条
    ///
    /// 找到返回 `Some`，外部词典也没有译文时返回 `None`（不写存储）。
    /// 归一化后为空的文本返回 `InvalidInput` 错误。
    pub async fn resolve_by_text(&self, text: &str) -> VocabResult<Option<VocabEntry>> {
        let key = normalize(text);
        if key.is_empty() {
            return Err(validation_error("查询文本为空"));
        }

        let _guard = self.locks.texts.acquire(key.clone()).await;
        self.resolve_locked(&key).await
    }

    async fn resolve_locked(&self, key: &str) -> VocabResult<Option<VocabEntry>> {
        tracing::debug!(text = key, "在本地存储中查找词条");
        let cached = self
            .store
            .get_entry_by_text(key)
            .await
            .map_err(|e| e.with_context("按文本查询本地词条"))?;

        if let Some(entry) = cached {
            if !entry.has_translations() {
                tracing::warn!(text = key, entry_id = ?entry.id, "本地词条没有译文，视为未找到");
                return Ok(None);
            }
            ResolverStats::inc(&self.stats.store_hits);
            metrics::counter!("vocab_store_hits_total").increment(1);
            tracing::info!(text = key, entry_id = ?entry.id, "本地存储命中");
            return Ok(Some(entry));
        }

        ResolverStats::inc(&self.stats.store_misses);
        tracing::info!(text = key, "本地存储未命中，查询外部词典");

        ResolverStats::inc(&self.stats.external_lookups);
        metrics::counter!("vocab_external_lookups_total").increment(1);
        let looked_up = self
            .provider
            .lookup(key)
            .await
            .map_err(|e| e.with_context("从外部词典查询词条"))?;

        let Some(mut entry) = looked_up.filter(VocabEntry::has_translations) else {
            ResolverStats::inc(&self.stats.not_found);
            metrics::counter!("vocab_lookup_not_found_total").increment(1);
            tracing::info!(text = key, "外部词典中没有该词条");
            return Ok(None);
        };

        // 存储键必须与锁键一致
        entry.text = key.to_string();
        entry.id = None;
        for translation in &mut entry.translations {
            translation.id = None;
        }

        let persisted = self
            .store
            .create_entry(entry)
            .await
            .map_err(|e| e.with_context("写入本地词条"))?;

        ResolverStats::inc(&self.stats.entries_created);
        metrics::counter!("vocab_entries_created_total").increment(1);
        tracing::info!(text = key, entry_id = ?persisted.id, "词条已写入本地存储");
        Ok(Some(persisted))
    }

    /// 按ID读取词条
    ///
    /// 词条写入后不可变，按ID读取不需要加锁，也从不调用外部词典。
    pub async fn resolve_by_id(&self, id: EntryId) -> VocabResult<Option<VocabEntry>> {
        tracing::debug!(entry_id = id, "按ID读取词条");
        let entry = self
            .store
            .get_entry_by_id(id)
            .await
            .map_err(|e| e.with_context(format!("按ID {} 查询本地词条", id)))?;
        Ok(entry.filter(VocabEntry::has_translations))
    }

    pub fn stats(&self) -> ResolverStatsSnapshot {
        self.stats.snapshot()
    }
}
