//! Directory-backed store namespace
//!
//! Layout: `<root>/<store name>/<key digest>.entry.json`, one JSON document
//! per entry with the body base64-encoded. Header values are kept as text
//! when they are visible ASCII and base64-encoded otherwise. Writes go to a
//! unique temporary file in the same directory and are renamed into place,
//! so readers never observe a partially written entry.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

use super::PersistentStore;
use crate::cache::{CacheEntry, CacheKey};
use crate::error::StoreError;

const ENTRY_SUFFIX: &str = ".entry.json";
const TEMP_MARKER: &str = ".tmp-";

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    key: String,
    status: u16,
    headers: Vec<(String, PersistedValue)>,
    body: String,
    size_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PersistedValue {
    Text(String),
    Bytes { base64: String },
}

impl PersistedValue {
    fn from_header(value: &HeaderValue) -> Self {
        match value.to_str() {
            Ok(text) => Self::Text(text.to_string()),
            Err(_) => Self::Bytes {
                base64: STANDARD.encode(value.as_bytes()),
            },
        }
    }

    fn into_header(self) -> Result<HeaderValue, String> {
        match self {
            Self::Text(text) => HeaderValue::from_str(&text).map_err(|e| e.to_string()),
            Self::Bytes { base64 } => {
                let raw = STANDARD.decode(base64.as_bytes()).map_err(|e| e.to_string())?;
                HeaderValue::from_bytes(&raw).map_err(|e| e.to_string())
            }
        }
    }
}

impl PersistedEntry {
    fn from_entry(entry: &CacheEntry) -> Self {
        let headers = entry
            .metadata
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), PersistedValue::from_header(value)))
            .collect();

        Self {
            key: entry.key.as_str().to_string(),
            status: entry.status.as_u16(),
            headers,
            body: STANDARD.encode(&entry.body),
            size_bytes: entry.size_bytes,
        }
    }

    fn into_entry(self, expected: &CacheKey) -> Result<CacheEntry, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            key: expected.to_string(),
            reason,
        };

        if self.key != expected.as_str() {
            return Err(corrupt(format!("file holds entry for {}", self.key)));
        }

        let status = StatusCode::from_u16(self.status)
            .map_err(|e| corrupt(format!("status {}: {e}", self.status)))?;

        let mut metadata = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| corrupt(format!("header name {name:?}: {e}")))?;
            let value = value
                .into_header()
                .map_err(|e| corrupt(format!("header value for {name}: {e}")))?;
            metadata.append(name, value);
        }

        let body = STANDARD
            .decode(self.body.as_bytes())
            .map_err(|e| corrupt(format!("body encoding: {e}")))?;

        Ok(CacheEntry {
            key: expected.clone(),
            status,
            metadata,
            body: Bytes::from(body),
            size_bytes: self.size_bytes,
        })
    }
}

/// Store persisting each entry as a file under one directory.
#[derive(Debug)]
pub struct DiskStore {
    name: String,
    dir: PathBuf,
    temp_seq: AtomicU64,
}

impl DiskStore {
    /// Open (creating if needed) the namespace `name` under `root`.
    ///
    /// # Errors
    ///
    /// `StoreError::Io` if the directory cannot be created.
    pub async fn open(root: impl AsRef<Path>, name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        let dir = root.as_ref().join(&name);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                key: dir.display().to_string(),
                source,
            })?;

        tracing::debug!(
            target: "fetchcache::cache::store",
            store = %name,
            dir = %dir.display(),
            "Opened disk store"
        );

        Ok(Self {
            name,
            dir,
            temp_seq: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}{ENTRY_SUFFIX}"))
    }

    /// Temp files written by this process may belong to a `put` in progress.
    fn is_own_live_temp(&self, file_name: &str) -> bool {
        file_name
            .split_once(TEMP_MARKER)
            .and_then(|(_, suffix)| suffix.split_once('-'))
            .is_some_and(|(pid, _)| pid == std::process::id().to_string())
    }

    fn temp_path(&self, key: &CacheKey) -> PathBuf {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!("{key}{TEMP_MARKER}{}-{seq}", std::process::id()))
    }
}

fn io_error(key: &CacheKey, source: io::Error) -> StoreError {
    StoreError::Io {
        key: key.to_string(),
        source,
    }
}

impl PersistentStore for DiskStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let raw = match tokio::fs::read(self.entry_path(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(key, e)),
        };

        let persisted: PersistedEntry =
            serde_json::from_slice(&raw).map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            })?;

        persisted.into_entry(key).map(Some)
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(&PersistedEntry::from_entry(&entry)).map_err(|source| {
            StoreError::Serialization {
                key: key.to_string(),
                source,
            }
        })?;

        let temp = self.temp_path(key);
        if let Err(e) = tokio::fs::write(&temp, &encoded).await {
            return Err(io_error(key, e));
        }

        if let Err(e) = tokio::fs::rename(&temp, self.entry_path(key)).await {
            // Best effort: the temp file is garbage either way.
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(io_error(key, e));
        }

        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        let unavailable = |e: io::Error| {
            StoreError::Unavailable(format!("cannot list {}: {e}", self.dir.display()))
        };

        let mut dir = tokio::fs::read_dir(&self.dir).await.map_err(unavailable)?;
        let mut keys = Vec::new();

        while let Some(file) = dir.next_entry().await.map_err(unavailable)? {
            let file_name = file.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.contains(TEMP_MARKER) && !self.is_own_live_temp(file_name) {
                // Left behind by a writer that died between write and rename.
                if let Err(e) = tokio::fs::remove_file(file.path()).await
                    && e.kind() != io::ErrorKind::NotFound
                {
                    tracing::debug!(
                        target: "fetchcache::cache::store",
                        file = file_name,
                        error = %e,
                        "Could not remove orphaned temp file"
                    );
                }
                continue;
            }
            if let Some(key) = file_name
                .strip_suffix(ENTRY_SUFFIX)
                .and_then(CacheKey::from_digest)
            {
                keys.push(key);
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::header::CONTENT_TYPE;

    use super::*;
    use crate::cache::CacheKeyBuilder;
    use crate::http::FetchResponse;

    fn entry(target: &str, body: &'static [u8]) -> CacheEntry {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        let response = FetchResponse::new(StatusCode::CREATED, headers, body);
        CacheEntry::from_response(
            CacheKeyBuilder::build(target, None),
            &response,
            1_700_000_000_000,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn entries_survive_reopening() {
        let root = tempfile::tempdir().expect("tempdir");
        let original = entry("https://example.com/a", b"\x00\x01binary\xff");
        let key = original.key.clone();

        {
            let store = DiskStore::open(root.path(), "bvFetchCache").await.expect("open");
            store.put(&key, original.clone()).await.expect("put");
        }

        let store = DiskStore::open(root.path(), "bvFetchCache").await.expect("reopen");
        assert_eq!(store.name(), "bvFetchCache");
        assert_eq!(store.get(&key).await.expect("get"), Some(original));
        assert_eq!(store.keys().await.expect("keys"), vec![key]);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let root = tempfile::tempdir().expect("tempdir");
        let a = DiskStore::open(root.path(), "a").await.expect("open a");
        let b = DiskStore::open(root.path(), "b").await.expect("open b");
        let item = entry("/x", b"x");

        a.put(&item.key, item.clone()).await.expect("put");
        assert_eq!(b.get(&item.key).await.expect("get"), None);
        assert!(b.keys().await.expect("keys").is_empty());
    }

    #[tokio::test]
    async fn delete_and_stray_files() {
        let root = tempfile::tempdir().expect("tempdir");
        let store = DiskStore::open(root.path(), "ns").await.expect("open");
        let item = entry("/y", b"y");

        store.put(&item.key, item.clone()).await.expect("put");
        tokio::fs::write(store.dir().join("README"), b"not an entry")
            .await
            .expect("stray file");

        assert_eq!(store.keys().await.expect("keys"), vec![item.key.clone()]);

        store.delete(&item.key).await.expect("delete");
        store.delete(&item.key).await.expect("delete missing");
        assert!(store.keys().await.expect("keys").is_empty());
    }

    #[tokio::test]
    async fn non_ascii_header_bytes_survive_reopening() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut original = entry("https://example.com/latin1", b"body");
        original.metadata.insert(
            "content-disposition",
            HeaderValue::from_bytes(b"attachment; filename=caf\xe9.txt").expect("latin-1 value"),
        );
        let key = original.key.clone();

        {
            let store = DiskStore::open(root.path(), "ns").await.expect("open");
            store.put(&key, original.clone()).await.expect("put");
        }

        let store = DiskStore::open(root.path(), "ns").await.expect("reopen");
        let loaded = store.get(&key).await.expect("get").expect("present");
        assert_eq!(
            loaded.metadata["content-disposition"].as_bytes(),
            b"attachment; filename=caf\xe9.txt"
        );
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn orphaned_temp_files_are_removed_on_listing() {
        let root = tempfile::tempdir().expect("tempdir");
        let store = DiskStore::open(root.path(), "ns").await.expect("open");
        let item = entry("/kept", b"kept");
        store.put(&item.key, item.clone()).await.expect("put");

        let orphan = store.dir().join(format!("{}{TEMP_MARKER}0-0", item.key));
        tokio::fs::write(&orphan, b"{ half").await.expect("orphan");

        assert_eq!(store.keys().await.expect("keys"), vec![item.key.clone()]);
        assert!(!orphan.exists());
    }

    #[tokio::test]
    async fn corrupt_files_are_reported() {
        let root = tempfile::tempdir().expect("tempdir");
        let store = DiskStore::open(root.path(), "ns").await.expect("open");
        let key = CacheKeyBuilder::build("/z", None);

        tokio::fs::write(store.entry_path(&key), b"{ truncated")
            .await
            .expect("write garbage");

        assert!(matches!(
            store.get(&key).await,
            Err(StoreError::Serialization { .. })
        ));
    }
}
