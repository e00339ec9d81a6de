use chrono::Local;
use rw_core::{NormalizedArticle, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

pub const SNAPSHOT_PREFIX: &str = "readwise_archived_articles_";
pub const SNAPSHOT_SUFFIX: &str = ".json";
pub const INDEX_DIR_NAME: &str = "index";

/// Snapshots younger than this are reused instead of refetching.
pub const FRESHNESS_THRESHOLD: Duration = Duration::from_secs(24 * 60 * 60);

/// The on-disk cache: timestamped article snapshots plus the persisted index.
///
/// Nothing here is locked. Two processes sharing a directory can observe a
/// half-written snapshot.
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

/// Latest entry by time; ties go to the entry seen last.
fn newest_of(entries: impl IntoIterator<Item = (SystemTime, PathBuf)>) -> Option<(SystemTime, PathBuf)> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for (created, path) in entries {
        if newest.as_ref().map_or(true, |(time, _)| created >= *time) {
            newest = Some((created, path));
        }
    }
    newest
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_dir(&self) -> PathBuf {
        self.root.join(INDEX_DIR_NAME)
    }

    /// All files following the snapshot naming pattern, in no particular order.
    pub fn snapshots(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(SNAPSHOT_PREFIX)
                && name.ends_with(SNAPSHOT_SUFFIX)
                && entry.file_type()?.is_file()
            {
                snapshots.push(entry.path());
            }
        }
        Ok(snapshots)
    }

    /// Creation time of a snapshot, or its modification time on filesystems
    /// that do not record creation.
    pub fn snapshot_time(path: &Path) -> Result<SystemTime> {
        let metadata = fs::metadata(path)?;
        Ok(metadata.created().or_else(|_| metadata.modified())?)
    }

    /// Path of the newest snapshot if it is still fresh.
    pub fn locate(&self) -> Result<Option<PathBuf>> {
        self.locate_at(SystemTime::now())
    }

    /// The most recently created snapshot, fresh or not.
    pub fn newest(&self) -> Result<Option<(SystemTime, PathBuf)>> {
        let mut timed = Vec::new();
        for path in self.snapshots()? {
            timed.push((Self::snapshot_time(&path)?, path));
        }
        Ok(newest_of(timed))
    }

    pub fn locate_at(&self, now: SystemTime) -> Result<Option<PathBuf>> {
        let Some((created, path)) = self.newest()? else {
            debug!("No cache snapshots in {}", self.root.display());
            return Ok(None);
        };

        let age = now.duration_since(created).unwrap_or(Duration::ZERO);
        if age < FRESHNESS_THRESHOLD {
            debug!("Using cache snapshot {} ({}s old)", path.display(), age.as_secs());
            Ok(Some(path))
        } else {
            debug!("Cache snapshot {} is stale ({}s old)", path.display(), age.as_secs());
            Ok(None)
        }
    }

    /// Write a new snapshot named after the local clock and return its path.
    pub fn write_snapshot(&self, articles: &[NormalizedArticle]) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .root
            .join(format!("{}{}{}", SNAPSHOT_PREFIX, timestamp, SNAPSHOT_SUFFIX));
        fs::write(&path, serde_json::to_string_pretty(articles)?)?;
        Ok(path)
    }

    pub fn read_snapshot(path: &Path) -> Result<Vec<NormalizedArticle>> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn article(title: &str) -> NormalizedArticle {
        NormalizedArticle {
            title: title.to_string(),
            author: "Ana Souza".to_string(),
            site_name: "example.com".to_string(),
            link: "https://example.com/a".to_string(),
            summary: "Ação e reação".to_string(),
            tags: vec!["physics".to_string()],
        }
    }

    #[test]
    fn test_locate_without_snapshots() {
        let dir = tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        assert_eq!(cache.locate().unwrap(), None);

        // unrelated files are not snapshots
        fs::write(dir.path().join("notes.json"), "[]").unwrap();
        fs::write(dir.path().join("readwise_archived_articles_x.txt"), "[]").unwrap();
        assert_eq!(cache.locate().unwrap(), None);
    }

    #[test]
    fn test_locate_missing_directory() {
        let dir = tempdir().unwrap();
        let cache = CacheDir::new(dir.path().join("does-not-exist"));
        assert_eq!(cache.locate().unwrap(), None);
    }

    #[test]
    fn test_locate_respects_freshness() {
        let dir = tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        let path = cache.write_snapshot(&[article("a")]).unwrap();
        let created = CacheDir::snapshot_time(&path).unwrap();

        assert_eq!(cache.locate_at(created + 23 * HOUR).unwrap(), Some(path.clone()));
        assert_eq!(cache.locate_at(created + 25 * HOUR).unwrap(), None);
        assert_eq!(cache.locate().unwrap(), Some(path));
    }

    #[test]
    fn test_newest_goes_by_time_not_name() {
        let base = SystemTime::UNIX_EPOCH + 1000 * HOUR;
        let older = PathBuf::from("readwise_archived_articles_20240101_000000.json");
        let newer = PathBuf::from("readwise_archived_articles_20230101_000000.json");
        let middle = PathBuf::from("readwise_archived_articles_20220101_000000.json");

        let picked = newest_of(vec![
            (base, older.clone()),
            (base + 2 * HOUR, newer.clone()),
            (base + HOUR, middle),
        ]);
        assert_eq!(picked, Some((base + 2 * HOUR, newer)));
        assert_eq!(newest_of(Vec::new()), None);
    }

    #[test]
    fn test_newest_on_disk_is_fresh_at_its_own_time() {
        let dir = tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        let path = dir.path().join("readwise_archived_articles_20240101_000000.json");
        fs::write(&path, "[]").unwrap();

        let (created, newest) = cache.newest().unwrap().unwrap();
        assert_eq!(newest, path);
        assert_eq!(created, CacheDir::snapshot_time(&path).unwrap());
        assert_eq!(cache.locate_at(created + HOUR).unwrap(), Some(path));
        assert_eq!(cache.locate_at(created + FRESHNESS_THRESHOLD).unwrap(), None);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempdir().unwrap();
        let cache = CacheDir::new(dir.path().join("cache"));
        let articles = vec![article("first"), article("second")];
        let path = cache.write_snapshot(&articles).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(SNAPSHOT_PREFIX));
        assert_eq!(name.len(), SNAPSHOT_PREFIX.len() + "YYYYMMDD_HHMMSS".len() + SNAPSHOT_SUFFIX.len());

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Ação e reação"));
        assert_eq!(CacheDir::read_snapshot(&path).unwrap(), articles);
    }
}
