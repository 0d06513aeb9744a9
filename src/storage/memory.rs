//! 内存存储
//!
//! [`EntryStore`] 的内存实现，语义与关系型存储一致：
//!
//! - 每个用户只有一个词汇本
//! - 词条文本唯一，写入后不再修改
//! - 译文按位置返回
//! - 链接前用户必须已有词汇本，重复链接会被拒绝
//!
//! 可以通过 [`MemoryStore::open`] 绑定一个JSON快照文件，[`MemoryStore::flush`] 写回。

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::EntryStore;
use crate::domain::{EntryId, UserId, Vocab, VocabEntry, VocabId};
use crate::error::{helpers::store_error, VocabResult};

/// 存储内容，也是快照文件的格式
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    next_vocab_id: VocabId,
    next_entry_id: EntryId,
    next_translation_id: i64,
    vocabs: BTreeMap<UserId, Vocab>,
    entries: BTreeMap<EntryId, VocabEntry>,
    links: BTreeMap<VocabId, BTreeSet<EntryId>>,
    /// 文本索引，加载快照后重建
    #[serde(skip)]
    text_index: HashMap<String, EntryId>,
}

impl StoreState {
    fn rebuild_index(&mut self) {
        self.text_index = self
            .entries
            .iter()
            .map(|(id, entry)| (entry.text.clone(), *id))
            .collect();
    }

    fn vocab_id(&self, user_id: UserId) -> VocabResult<VocabId> {
        self.vocabs
            .get(&user_id)
            .map(|v| v.id)
            .ok_or_else(|| store_error(format!("用户 {} 没有词汇本", user_id)))
    }
}

/// 存储统计信息
#[derive(Debug, Default)]
pub struct StoreStats {
    pub vocabs_created: AtomicU64,
    pub entries_created: AtomicU64,
    pub links_created: AtomicU64,
    pub links_removed: AtomicU64,
}

/// 存储统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    pub vocabs_created: u64,
    pub entries_created: u64,
    pub links_created: u64,
    pub links_removed: u64,
}

impl StoreStats {
    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            vocabs_created: self.vocabs_created.load(Ordering::Relaxed),
            entries_created: self.entries_created.load(Ordering::Relaxed),
            links_created: self.links_created.load(Ordering::Relaxed),
            links_removed: self.links_removed.load(Ordering::Relaxed),
        }
    }
}

/// 内存存储
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
    stats: Arc<StoreStats>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// 创建空的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开快照文件，文件不存在时从空存储开始
    pub async fn open<P: AsRef<Path>>(path: P) -> VocabResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut state = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read(&path).await?;
            let state: StoreState = serde_json::from_slice(&content)?;
            tracing::info!(
                "已加载快照 {}: {} 个词汇本, {} 个词条",
                path.display(),
                state.vocabs.len(),
                state.entries.len()
            );
            state
        } else {
            tracing::info!("快照文件 {} 不存在，使用空存储", path.display());
            StoreState::default()
        };
        state.rebuild_index();

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            stats: Arc::new(StoreStats::default()),
            snapshot_path: Some(path),
        })
    }

    /// 将当前内容写回快照文件，未绑定文件时什么也不做
    ///
    /// 先写临时文件再重命名，中途失败不会破坏旧快照。
    pub async fn flush(&self) -> VocabResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let content = {
            let state = self.state.read().await;
            serde_json::to_vec_pretty(&*state)?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;

        tracing::debug!("快照已写入 {}", path.display());
        Ok(())
    }

    pub fn stats(&self) -> StoreStatsSnapshot {
        self.stats.snapshot()
    }

    /// 存储中的词条数量
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// 存储中的词汇本数量
    pub async fn vocab_count(&self) -> usize {
        self.state.read().await.vocabs.len()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn get_vocab_by_user(&self, user_id: UserId) -> VocabResult<Option<Vocab>> {
        let state = self.state.read().await;
        Ok(state.vocabs.get(&user_id).cloned())
    }

    async fn create_vocab(&self, user_id: UserId) -> VocabResult<Vocab> {
        let mut state = self.state.write().await;
        if state.vocabs.contains_key(&user_id) {
            return Err(store_error(format!("用户 {} 的词汇本已存在", user_id)));
        }

        state.next_vocab_id += 1;
        let vocab = Vocab {
            id: state.next_vocab_id,
            user_id,
        };
        state.vocabs.insert(user_id, vocab.clone());
        self.stats.vocabs_created.fetch_add(1, Ordering::Relaxed);
        Ok(vocab)
    }

    async fn clear_vocab_links(&self, user_id: UserId) -> VocabResult<()> {
        let mut state = self.state.write().await;
        let Some(vocab_id) = state.vocabs.get(&user_id).map(|v| v.id) else {
            return Ok(());
        };
        if let Some(removed) = state.links.remove(&vocab_id) {
            self.stats
                .links_removed
                .fetch_add(removed.len() as u64, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn get_entry_by_text(&self, text: &str) -> VocabResult<Option<VocabEntry>> {
        let state = self.state.read().await;
        Ok(state
            .text_index
            .get(text)
            .and_then(|id| state.entries.get(id))
            .cloned())
    }

    async fn get_entry_by_id(&self, id: EntryId) -> VocabResult<Option<VocabEntry>> {
        let state = self.state.read().await;
        Ok(state.entries.get(&id).cloned())
    }

    async fn create_entry(&self, mut entry: VocabEntry) -> VocabResult<VocabEntry> {
        if entry.is_persisted() {
            return Err(store_error(format!("词条 {:?} 已经持久化", entry.id)));
        }

        let mut state = self.state.write().await;
        if state.text_index.contains_key(&entry.text) {
            return Err(store_error(format!("词条文本重复: {}", entry.text)));
        }

        state.next_entry_id += 1;
        let entry_id = state.next_entry_id;
        entry.id = Some(entry_id);
        entry.sort_translations();
        for translation in &mut entry.translations {
            state.next_translation_id += 1;
            translation.id = Some(state.next_translation_id);
        }

        state.text_index.insert(entry.text.clone(), entry_id);
        state.entries.insert(entry_id, entry.clone());
        self.stats.entries_created.fetch_add(1, Ordering::Relaxed);
        Ok(entry)
    }

    async fn link_entry_to_user(&self, entry_id: EntryId, user_id: UserId) -> VocabResult<()> {
        let mut state = self.state.write().await;
        let vocab_id = state.vocab_id(user_id)?;
        if !state.entries.contains_key(&entry_id) {
            return Err(store_error(format!("词条 {} 不存在", entry_id)));
        }
        if !state.links.entry(vocab_id).or_default().insert(entry_id) {
            return Err(store_error(format!(
                "词条 {} 已在用户 {} 的词汇本中",
                entry_id, user_id
            )));
        }
        self.stats.links_created.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn unlink_entry_from_user(&self, entry_id: EntryId, user_id: UserId) -> VocabResult<()> {
        let mut state = self.state.write().await;
        let vocab_id = state.vocab_id(user_id)?;
        let removed = state
            .links
            .get_mut(&vocab_id)
            .map(|ids| ids.remove(&entry_id))
            .unwrap_or(false);
        if removed {
            self.stats.links_removed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn is_linked(&self, entry_id: EntryId, user_id: UserId) -> VocabResult<bool> {
        let state = self.state.read().await;
        let Some(vocab) = state.vocabs.get(&user_id) else {
            return Ok(false);
        };
        Ok(state
            .links
            .get(&vocab.id)
            .map(|ids| ids.contains(&entry_id))
            .unwrap_or(false))
    }

    async fn list_linked_entry_ids(&self, user_id: UserId) -> VocabResult<Vec<EntryId>> {
        let state = self.state.read().await;
        let Some(vocab) = state.vocabs.get(&user_id) else {
            return Ok(Vec::new());
        };
        Ok(state
            .links
            .get(&vocab.id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn list_linked_entries(&self, user_id: UserId) -> VocabResult<Vec<VocabEntry>> {
        let state = self.state.read().await;
        let Some(vocab) = state.vocabs.get(&user_id) else {
            return Ok(Vec::new());
        };
        let Some(ids) = state.links.get(&vocab.id) else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let entry = state
                .entries
                .get(id)
                .ok_or_else(|| store_error(format!("链接指向不存在的词条 {}", id)))?;
            entries.push(entry.clone());
        }
        entries.sort_by(|a, b| a.text.cmp(&b.text));
        Ok(entries)
    }
}
