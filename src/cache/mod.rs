//! Bounded on-disk cache of NPORT-P primary documents.
//!
//! Entries are files named `{cik10}-{accession without dashes}` under the
//! cache root. Once written an entry is never modified; when the cache is
//! full the entry with the oldest modification time is removed before a
//! new one is written.

use log::{debug, info, warn};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::sync::Mutex;

use crate::edgar::cik::{Accession, Cik};
use crate::edgar::client::EdgarSource;
use crate::error::Result;

pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const DEFAULT_CAPACITY: usize = 5;

const PARTIAL_PREFIX: char = '.';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub modified: SystemTime,
}

pub struct DocumentCache {
    root: PathBuf,
    capacity: usize,
    // Serializes count, evict and write so concurrent misses cannot
    // overshoot the capacity.
    write_lock: Mutex<()>,
}

impl DocumentCache {
    /// Creates the cache root if needed.
    pub fn open(root: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            capacity: capacity.max(1),
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn key(cik: &Cik, accession: &Accession) -> String {
        format!("{}-{}", cik.padded(), accession.without_dashes())
    }

    /// Returns the filing's primary document, fetching it from `source`
    /// only when it is not cached yet.
    pub async fn get_document(
        &self,
        source: &dyn EdgarSource,
        cik: &Cik,
        accession: &Accession,
    ) -> Result<Vec<u8>> {
        let key = Self::key(cik, accession);
        let path = self.root.join(&key);

        match fs::read(&path).await {
            Ok(content) => {
                info!("Cache hit for {}", key);
                return Ok(content);
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                info!("Cache miss for {}", key);
            }
            Err(e) => return Err(e.into()),
        }

        let content = source.primary_document(cik, accession).await?;
        self.store(&key, &content).await?;
        Ok(content)
    }

    async fn store(&self, key: &str, content: &[u8]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.root.join(key);

        if fs::try_exists(&path).await? {
            debug!("{} was cached by a concurrent request", key);
            return Ok(());
        }

        if fs::try_exists(&self.root).await? {
            self.evict_for_new_entry().await?;
        } else {
            fs::create_dir_all(&self.root).await?;
        }

        // Readers never observe a half-written entry.
        let partial = self.root.join(format!("{}{}", PARTIAL_PREFIX, key));
        fs::write(&partial, content).await?;
        fs::rename(&partial, &path).await?;
        debug!("Cached {} ({} bytes)", key, content.len());
        Ok(())
    }

    async fn evict_for_new_entry(&self) -> Result<()> {
        let mut entries = self.entries().await?;
        if entries.len() < self.capacity {
            return Ok(());
        }

        entries.sort_by(|a, b| (a.modified, &a.key).cmp(&(b.modified, &b.key)));
        let excess = entries.len() + 1 - self.capacity;
        for entry in entries.into_iter().take(excess) {
            info!("Evicting {} from document cache", entry.key);
            remove_if_present(&self.root.join(&entry.key)).await?;
        }
        Ok(())
    }

    /// Current entries, in no particular order. Files whose names are not
    /// cache keys are ignored.
    pub async fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let key = item.file_name().to_string_lossy().into_owned();
            if !is_cache_key(&key) {
                continue;
            }
            let metadata = item.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(CacheEntry {
                key,
                modified: metadata.modified()?,
            });
        }
        Ok(entries)
    }

    /// Removes every entry, any partial writes, and then the cache root.
    /// Other files are left alone, and their presence makes removing the
    /// root fail. Safe to call repeatedly.
    pub async fn teardown(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                debug!("Document cache at {:?} already removed", self.root);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(item) = dir.next_entry().await? {
            let name = item.file_name().to_string_lossy().into_owned();
            let owned = is_cache_key(name.strip_prefix(PARTIAL_PREFIX).unwrap_or(&name));
            if owned && item.file_type().await?.is_file() {
                remove_if_present(&item.path()).await?;
            }
        }

        match fs::remove_dir(&self.root).await {
            Ok(()) => {
                info!("Removed document cache at {:?}", self.root);
                Ok(())
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to remove document cache at {:?}: {}", self.root, e);
                Err(e.into())
            }
        }
    }
}

/// `{10-digit CIK}-{accession digits}`
fn is_cache_key(name: &str) -> bool {
    match name.split_once('-') {
        Some((cik, accession)) => {
            cik.len() == 10
                && cik.bytes().all(|b| b.is_ascii_digit())
                && !accession.is_empty()
                && accession.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, NportError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EdgarSource for CountingSource {
        async fn submissions(&self, _cik: &Cik) -> Result<Vec<u8>> {
            unreachable!("cache never reads submissions")
        }

        async fn primary_document(&self, cik: &Cik, accession: &Accession) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(NportError::RemoteStatus {
                    url: "https://www.sec.gov".to_string(),
                    status: 503,
                });
            }
            Ok(format!("<doc cik=\"{}\" acc=\"{}\"/>", cik, accession).into_bytes())
        }
    }

    fn accession(n: usize) -> Accession {
        Accession::parse(&format!("0000000000-25-{:06}", n)).unwrap()
    }

    fn set_age(cache: &DocumentCache, key: &str, secs_ago: u64) {
        let file = std::fs::File::options()
            .write(true)
            .open(cache.root().join(key))
            .unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs_ago))
            .unwrap();
    }

    async fn keys(cache: &DocumentCache) -> Vec<String> {
        let mut keys: Vec<_> = cache
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_second_read_is_a_hit() {
        let dir = tempdir().unwrap();
        let cache = DocumentCache::open(dir.path().join("cache"), DEFAULT_CAPACITY).unwrap();
        let source = CountingSource::default();
        let cik = Cik::parse("320193").unwrap();

        let first = cache.get_document(&source, &cik, &accession(1)).await.unwrap();
        let second = cache.get_document(&source, &cik, &accession(1)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(keys(&cache).await, vec!["0000320193-000000000025000001"]);
    }

    #[tokio::test]
    async fn test_evicts_oldest_entry() {
        let dir = tempdir().unwrap();
        let cache = DocumentCache::open(dir.path(), DEFAULT_CAPACITY).unwrap();
        let source = CountingSource::default();
        let cik = Cik::parse("320193").unwrap();

        for n in 1..=5 {
            cache.get_document(&source, &cik, &accession(n)).await.unwrap();
        }
        // Entry 3 is the oldest, entry 1 the newest.
        for (n, age) in [(1, 10), (2, 40), (3, 50), (4, 30), (5, 20)] {
            set_age(&cache, &DocumentCache::key(&cik, &accession(n)), age);
        }

        cache.get_document(&source, &cik, &accession(6)).await.unwrap();

        let remaining = keys(&cache).await;
        assert_eq!(remaining.len(), 5);
        assert!(!remaining.contains(&DocumentCache::key(&cik, &accession(3))));
        assert!(remaining.contains(&DocumentCache::key(&cik, &accession(6))));
    }

    #[tokio::test]
    async fn test_reads_do_not_refresh_age() {
        let dir = tempdir().unwrap();
        let cache = DocumentCache::open(dir.path(), 2).unwrap();
        let source = CountingSource::default();
        let cik = Cik::parse("1").unwrap();

        cache.get_document(&source, &cik, &accession(1)).await.unwrap();
        cache.get_document(&source, &cik, &accession(2)).await.unwrap();
        set_age(&cache, &DocumentCache::key(&cik, &accession(1)), 100);
        set_age(&cache, &DocumentCache::key(&cik, &accession(2)), 50);

        // A hit on the oldest entry does not save it from eviction.
        cache.get_document(&source, &cik, &accession(1)).await.unwrap();
        cache.get_document(&source, &cik, &accession(3)).await.unwrap();

        assert_eq!(
            keys(&cache).await,
            vec![
                DocumentCache::key(&cik, &accession(2)),
                DocumentCache::key(&cik, &accession(3)),
            ]
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_each_overflow_evicts_the_oldest() {
        let dir = tempdir().unwrap();
        let cache = DocumentCache::open(dir.path(), DEFAULT_CAPACITY).unwrap();
        let source = CountingSource::default();
        let cik = Cik::parse("320193").unwrap();

        // Ages deliberately out of insertion order.
        let ages = [300, 900, 100, 700, 500, 200, 800, 400, 600, 1000, 50, 650];
        let mut live: Vec<(String, u64)> = Vec::new();

        for (i, age) in ages.iter().enumerate() {
            let acc = accession(i + 1);
            let expected_evicted = if live.len() == DEFAULT_CAPACITY {
                let oldest = live
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, (_, age))| *age)
                    .map(|(pos, _)| pos)
                    .unwrap();
                Some(live.remove(oldest).0)
            } else {
                None
            };

            cache.get_document(&source, &cik, &acc).await.unwrap();
            let key = DocumentCache::key(&cik, &acc);
            set_age(&cache, &key, *age);
            live.push((key, *age));

            let mut expected: Vec<_> = live.iter().map(|(k, _)| k.clone()).collect();
            expected.sort();
            assert_eq!(keys(&cache).await, expected);
            if let Some(evicted) = expected_evicted {
                assert!(!cache.root().join(evicted).exists());
            }
            assert!(cache.entries().await.unwrap().len() <= cache.capacity());
        }
    }

    #[tokio::test]
    async fn test_foreign_files_are_left_alone() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("cache");
        std::fs::create_dir_all(root.join("subdir")).unwrap();
        std::fs::write(root.join("notes.txt"), "keep me").unwrap();
        std::fs::write(root.join("subdir").join("keep.txt"), "keep me too").unwrap();
        let notes = std::fs::File::options()
            .write(true)
            .open(root.join("notes.txt"))
            .unwrap();
        notes
            .set_modified(SystemTime::now() - Duration::from_secs(1000))
            .unwrap();

        let cache = DocumentCache::open(&root, DEFAULT_CAPACITY).unwrap();
        let source = CountingSource::default();
        let cik = Cik::parse("320193").unwrap();
        for n in 1..=6 {
            cache.get_document(&source, &cik, &accession(n)).await.unwrap();
        }

        assert!(root.join("notes.txt").exists());
        assert_eq!(cache.entries().await.unwrap().len(), DEFAULT_CAPACITY);

        let err = cache.teardown().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(cache.entries().await.unwrap().is_empty());
        assert!(root.join("notes.txt").exists());
        assert!(root.join("subdir").join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_concurrent_misses_respect_capacity() {
        let dir = tempdir().unwrap();
        let cache = Arc::new(DocumentCache::open(dir.path(), DEFAULT_CAPACITY).unwrap());
        let source = Arc::new(CountingSource::default());

        let handles: Vec<_> = (1..=20)
            .map(|n| {
                let cache = Arc::clone(&cache);
                let source = Arc::clone(&source);
                tokio::spawn(async move {
                    let cik = Cik::parse("320193").unwrap();
                    cache
                        .get_document(source.as_ref(), &cik, &accession(n))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(cache.entries().await.unwrap().len(), DEFAULT_CAPACITY);
    }

    #[tokio::test]
    async fn test_remote_failure_is_not_cached() {
        let dir = tempdir().unwrap();
        let cache = DocumentCache::open(dir.path(), DEFAULT_CAPACITY).unwrap();
        let source = CountingSource {
            fail: true,
            ..Default::default()
        };
        let cik = Cik::parse("320193").unwrap();

        let err = cache
            .get_document(&source, &cik, &accession(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(cache.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recreates_missing_root() {
        let dir = tempdir().unwrap();
        let cache = DocumentCache::open(dir.path().join("cache"), DEFAULT_CAPACITY).unwrap();
        let source = CountingSource::default();
        let cik = Cik::parse("320193").unwrap();

        cache.teardown().await.unwrap();
        assert!(!cache.root().exists());

        cache.get_document(&source, &cik, &accession(1)).await.unwrap();
        assert_eq!(cache.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let dir = tempdir().unwrap();
        let cache = DocumentCache::open(dir.path().join("cache"), DEFAULT_CAPACITY).unwrap();
        let source = CountingSource::default();
        let cik = Cik::parse("320193").unwrap();
        cache.get_document(&source, &cik, &accession(1)).await.unwrap();

        cache.teardown().await.unwrap();
        assert!(!cache.root().exists());
        cache.teardown().await.unwrap();
    }
}
