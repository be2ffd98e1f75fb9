/*!
 * Translation caching functionality.
 *
 * Content-addressed memoization of translations keyed by
 * `(normalized source text, target language, model)`. The cache fails open:
 * a store error is logged and treated as a miss, never aborting a
 * translation. The backing store sits behind the `CacheStore` trait so an
 * externally hosted key-value store can replace the in-memory default.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::errors::CacheStoreError;

/// Collapse runs of Unicode whitespace to a single ASCII space and trim.
///
/// Trivially-different source strings (trailing newline, double spaces,
/// tab-indented table cells) normalize to the same key so they hit the same
/// cache entry. This is the documented normalization rule; key derivation
/// and the planning dedup both rely on it.
pub fn normalize_source_text(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_space = false;
            normalized.push(ch);
        }
    }
    normalized
}

/// Derive the content-addressed cache key.
///
/// The three components are newline-separated before hashing; normalization
/// strips newlines from the text component, so distinct
/// text/language/model combinations cannot collide by concatenation.
fn cache_key(normalized_text: &str, target_language: &str, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_text.as_bytes());
    hasher.update(b"\n");
    hasher.update(target_language.as_bytes());
    hasher.update(b"\n");
    hasher.update(model.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A cached translation with its insertion timestamp.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The translated text
    pub translated_text: String,

    /// When the entry was inserted
    pub inserted_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry timestamped now
    pub fn new(translated_text: impl Into<String>) -> Self {
        Self {
            translated_text: translated_text.into(),
            inserted_at: Utc::now(),
        }
    }
}

/// Eviction strategy for the in-memory store.
///
/// `get` never returns a logically expired entry regardless of when the
/// eviction sweep actually removes it.
#[derive(Debug, Clone, Default)]
pub enum EvictionPolicy {
    /// Keep everything
    #[default]
    Unbounded,

    /// Expire entries older than the given duration
    Ttl(Duration),

    /// Cap the number of entries, evicting the oldest on overflow
    MaxEntries(usize),

    /// Combine TTL expiry with an entry cap
    TtlAndMaxEntries {
        /// Entry lifetime
        ttl: Duration,
        /// Maximum entries retained
        max_entries: usize,
    },
}

impl EvictionPolicy {
    fn ttl(&self) -> Option<Duration> {
        match self {
            Self::Ttl(ttl) | Self::TtlAndMaxEntries { ttl, .. } => Some(*ttl),
            _ => None,
        }
    }

    fn max_entries(&self) -> Option<usize> {
        match self {
            Self::MaxEntries(max) | Self::TtlAndMaxEntries { max_entries: max, .. } => Some(*max),
            _ => None,
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        match self.ttl() {
            Some(ttl) => {
                let age = now.signed_duration_since(entry.inserted_at);
                age >= chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX)
            }
            None => false,
        }
    }
}

/// Key-value backing store for the translation cache.
///
/// The engine is agnostic to whether the store is in-process or externally
/// hosted; implementations only need `get`/`set` with low latency.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch an entry, `None` on miss. Must never return an expired entry.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheStoreError>;

    /// Insert or overwrite an entry. Idempotent.
    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), CacheStoreError>;
}

/// Default in-process store backed by a hash map.
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    policy: EvictionPolicy,
}

impl InMemoryCacheStore {
    /// Create a store with the given eviction policy
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheStoreError> {
        let now = Utc::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !self.policy.is_expired(entry, now) => {
                    return Ok(Some(entry.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired entry found: drop it lazily under the write lock
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), CacheStoreError> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), entry);

        if let Some(max) = self.policy.max_entries() {
            while entries.len() > max {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        entries.remove(&k);
                    }
                    None => break,
                }
            }
        }
        Ok(())
    }
}

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: usize,

    /// Lookups that fell through to the API
    pub misses: usize,

    /// Store operations that failed (counted as misses)
    pub errors: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Translation cache for storing and retrieving translations.
pub struct TranslationCache {
    store: Arc<dyn CacheStore>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    errors: AtomicUsize,
    enabled: bool,
}

impl TranslationCache {
    /// Create a cache backed by an in-memory store
    pub fn in_memory(policy: EvictionPolicy) -> Self {
        Self::with_store(Arc::new(InMemoryCacheStore::new(policy)))
    }

    /// Create a cache backed by an arbitrary store
    pub fn with_store(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            enabled: true,
        }
    }

    /// Create a cache that never hits, for callers that opt out
    pub fn disabled() -> Self {
        let mut cache = Self::in_memory(EvictionPolicy::Unbounded);
        cache.enabled = false;
        cache
    }

    /// Whether the cache is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Look up a translation.
    ///
    /// A store error is downgraded to a miss: cache unavailability must
    /// never abort translation.
    pub async fn get(
        &self,
        original: &str,
        target_language: &str,
        model: &str,
    ) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let key = cache_key(&normalize_source_text(original), target_language, model);
        match self.store.get(&key).await {
            Ok(Some(entry)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cache hit for '{}' ({} / {})",
                    truncate_text(original, 30),
                    target_language,
                    model
                );
                Some(entry.translated_text)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cache miss for '{}' ({} / {})",
                    truncate_text(original, 30),
                    target_language,
                    model
                );
                None
            }
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                warn!("Cache get failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Store a translation. Re-inserting the same key overwrites silently;
    /// a store error is logged and swallowed.
    pub async fn insert(
        &self,
        original: &str,
        target_language: &str,
        model: &str,
        translated: &str,
    ) {
        if !self.enabled {
            return;
        }

        let key = cache_key(&normalize_source_text(original), target_language, model);
        if let Err(e) = self.store.set(&key, CacheEntry::new(translated)).await {
            self.errors.fetch_add(1, Ordering::Relaxed);
            warn!("Cache insert failed, continuing without caching: {}", e);
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Truncate text to a maximum length with ellipsis
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_length).collect::<String>())
    }
}
