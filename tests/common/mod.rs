// 集成测试公共模块
//
// 提供可计数的存储、可控的词典桩和测试环境

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vocab_keeper::{
    EntryId, EntryStore, LookupProvider, MemoryStore, UserId, Vocab, VocabEntry, VocabError,
    VocabResult, VocabService,
};

/// 构造一个带译文的词条
pub fn sample_entry(text: &str) -> VocabEntry {
    VocabEntry::new(text)
        .with_transcription(format!("[{}]", text))
        .with_translation(format!("{}-перевод", text), "noun")
        .with_translation(format!("{}-вариант", text), "verb")
}

/// 词典桩：只认识预先登记的词，记录每次调用
#[derive(Default)]
pub struct StubDictionary {
    known: HashMap<String, VocabEntry>,
    delay: Duration,
    fail: bool,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl StubDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_word(mut self, text: &str) -> Self {
        self.known.insert(text.to_string(), sample_entry(text));
        self
    }

    /// 登记一个没有任何译文的词
    pub fn with_empty_word(mut self, text: &str) -> Self {
        self.known.insert(text.to_string(), VocabEntry::new(text));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LookupProvider for StubDictionary {
    async fn lookup(&self, text: &str) -> VocabResult<Option<VocabEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(text.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(VocabError::Lookup("词典服务不可用".to_string()));
        }
        Ok(self.known.get(text).cloned())
    }
}

/// 进行中调用计数，同一个键上出现重叠时记录下来
#[derive(Default)]
struct OverlapTracker<K> {
    in_flight: Mutex<HashMap<K, usize>>,
    overlaps: AtomicUsize,
}

impl<K: std::hash::Hash + Eq + Clone> OverlapTracker<K> {
    fn enter(&self, key: K) -> OverlapGuard<'_, K> {
        let mut in_flight = self.in_flight.lock().unwrap();
        let count = in_flight.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        OverlapGuard { tracker: self, key }
    }
}

struct OverlapGuard<'a, K: std::hash::Hash + Eq + Clone> {
    tracker: &'a OverlapTracker<K>,
    key: K,
}

impl<K: std::hash::Hash + Eq + Clone> Drop for OverlapGuard<'_, K> {
    fn drop(&mut self) {
        let mut in_flight = self.tracker.in_flight.lock().unwrap();
        if let Some(count) = in_flight.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(&self.key);
            }
        }
    }
}

/// 包装 [`MemoryStore`]，统计写入次数并检测同一用户/同一文本上的并发调用
pub struct CountingStore {
    inner: MemoryStore,
    delay: Duration,
    users: OverlapTracker<UserId>,
    texts: OverlapTracker<String>,
    create_vocab_calls: AtomicUsize,
    create_entry_calls: AtomicUsize,
    get_by_text_calls: AtomicUsize,
    hidden_entries: Mutex<HashSet<EntryId>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(2))
    }

    /// 每次存储调用都挂起 `delay`，放大竞争窗口
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
            users: OverlapTracker::default(),
            texts: OverlapTracker::default(),
            create_vocab_calls: AtomicUsize::new(0),
            create_entry_calls: AtomicUsize::new(0),
            get_by_text_calls: AtomicUsize::new(0),
            hidden_entries: Mutex::new(HashSet::new()),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn create_vocab_calls(&self) -> usize {
        self.create_vocab_calls.load(Ordering::SeqCst)
    }

    pub fn create_entry_calls(&self) -> usize {
        self.create_entry_calls.load(Ordering::SeqCst)
    }

    pub fn get_by_text_calls(&self) -> usize {
        self.get_by_text_calls.load(Ordering::SeqCst)
    }

    pub fn user_overlaps(&self) -> usize {
        self.users.overlaps.load(Ordering::SeqCst)
    }

    pub fn text_overlaps(&self) -> usize {
        self.texts.overlaps.load(Ordering::SeqCst)
    }

    /// 让按ID读取返回“不存在”，模拟链接指向已消失的词条
    pub fn hide_entry(&self, id: EntryId) {
        self.hidden_entries.lock().unwrap().insert(id);
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl EntryStore for CountingStore {
    async fn get_vocab_by_user(&self, user_id: UserId) -> VocabResult<Option<Vocab>> {
        let _g = self.users.enter(user_id);
        self.pause().await;
        self.inner.get_vocab_by_user(user_id).await
    }

    async fn create_vocab(&self, user_id: UserId) -> VocabResult<Vocab> {
        let _g = self.users.enter(user_id);
        self.create_vocab_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.inner.create_vocab(user_id).await
    }

    async fn clear_vocab_links(&self, user_id: UserId) -> VocabResult<()> {
        let _g = self.users.enter(user_id);
        self.pause().await;
        self.inner.clear_vocab_links(user_id).await
    }

    async fn get_entry_by_text(&self, text: &str) -> VocabResult<Option<VocabEntry>> {
        let _g = self.texts.enter(text.to_string());
        self.get_by_text_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.inner.get_entry_by_text(text).await
    }

    async fn get_entry_by_id(&self, id: EntryId) -> VocabResult<Option<VocabEntry>> {
        if self.hidden_entries.lock().unwrap().contains(&id) {
            return Ok(None);
        }
        self.inner.get_entry_by_id(id).await
    }

    async fn create_entry(&self, entry: VocabEntry) -> VocabResult<VocabEntry> {
        let _g = self.texts.enter(entry.text.clone());
        self.create_entry_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.inner.create_entry(entry).await
    }

    async fn link_entry_to_user(&self, entry_id: EntryId, user_id: UserId) -> VocabResult<()> {
        let _g = self.users.enter(user_id);
        self.pause().await;
        self.inner.link_entry_to_user(entry_id, user_id).await
    }

    async fn unlink_entry_from_user(&self, entry_id: EntryId, user_id: UserId) -> VocabResult<()> {
        let _g = self.users.enter(user_id);
        self.pause().await;
        self.inner.unlink_entry_from_user(entry_id, user_id).await
    }

    async fn is_linked(&self, entry_id: EntryId, user_id: UserId) -> VocabResult<bool> {
        let _g = self.users.enter(user_id);
        self.pause().await;
        self.inner.is_linked(entry_id, user_id).await
    }

    async fn list_linked_entry_ids(&self, user_id: UserId) -> VocabResult<Vec<EntryId>> {
        let _g = self.users.enter(user_id);
        self.pause().await;
        self.inner.list_linked_entry_ids(user_id).await
    }

    async fn list_linked_entries(&self, user_id: UserId) -> VocabResult<Vec<VocabEntry>> {
        let _g = self.users.enter(user_id);
        self.pause().await;
        self.inner.list_linked_entries(user_id).await
    }
}

/// 测试环境
pub struct TestEnvironment {
    pub store: Arc<CountingStore>,
    pub dictionary: Arc<StubDictionary>,
    pub service: Arc<VocabService>,
}

impl TestEnvironment {
    pub fn new(dictionary: StubDictionary) -> Self {
        Self::with_store(CountingStore::new(), dictionary)
    }

    pub fn with_store(store: CountingStore, dictionary: StubDictionary) -> Self {
        let store = Arc::new(store);
        let dictionary = Arc::new(dictionary);
        let service = Arc::new(VocabService::new(store.clone(), dictionary.clone()));
        Self {
            store,
            dictionary,
            service,
        }
    }

    /// 解析一个词并返回其ID，词典必须认识它
    pub async fn entry_id(&self, text: &str) -> EntryId {
        self.service
            .resolve_by_text(text)
            .await
            .unwrap()
            .and_then(|e| e.id)
            .unwrap_or_else(|| panic!("词典中没有 {}", text))
    }
}
