#![allow(async_fn_in_trait)]

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use badgegate_core::constants::RECORD_TERMINATOR;
use badgegate_core::{HolderName, TagId, Timestamp};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::record::{TagRecord, record_key};

/// Repository trait for the tag registry
///
/// Implementations hold at most one record per [`TagId`] and apply each
/// mutation atomically: after any call returns (or the process dies while
/// it runs) the backing store holds either the old or the new contents.
///
/// # Implementation Note
///
/// Native async trait methods (Edition 2024); dispatch is static.
pub trait TagRegistry: Send + Sync {
    /// Find the record for a tag
    async fn lookup(&self, tag: &TagId) -> StorageResult<Option<TagRecord>>;

    /// Insert or replace the record for a tag, stamping it with the current time
    ///
    /// A replaced record moves to the end of the scan order.
    async fn upsert(&self, tag: &TagId, name: &HolderName) -> StorageResult<TagRecord>;

    /// Remove the record for a tag; `false` if there was none
    async fn delete(&self, tag: &TagId) -> StorageResult<bool>;

    /// All records in file order
    async fn list(&self) -> StorageResult<Vec<TagRecord>>;
}

/// Timestamp for a record being created or modified right now.
#[must_use]
pub fn touch_timestamp() -> Timestamp {
    Timestamp::now()
}

/// Flat-file implementation of [`TagRegistry`]
///
/// One record per line. Lookups scan the file linearly; mutations rewrite
/// the whole file into `<path>.tmp`, fsync it and rename it over `path`.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    /// Create a registry backed by `path` without touching the file system.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a registry and make sure its file exists.
    ///
    /// Missing parent directories are created, and a missing file is created
    /// empty. An existing file is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory or file cannot be created.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let registry = Self::new(path);

        if let Some(parent) = registry.parent_dir() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }

        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&registry.path)
            .await
            .map_err(|e| StorageError::io(&registry.path, e))?;

        info!(path = %registry.path.display(), "Tag registry opened");
        Ok(registry)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the scratch file used by rewrites.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Read the whole file; a missing file reads as empty.
    async fn read_contents(&self) -> StorageResult<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }

    /// Read the file and split it into record lines.
    ///
    /// A non-empty file must end with a terminator; a trailing fragment is
    /// reported as malformed rather than silently kept or dropped.
    async fn read_lines(&self) -> StorageResult<Vec<String>> {
        let contents = self.read_contents().await?;
        if !contents.is_empty() && !contents.ends_with(RECORD_TERMINATOR) {
            let line = contents.split(RECORD_TERMINATOR).count();
            return Err(StorageError::malformed(line, "unterminated record"));
        }

        Ok(contents
            .split_terminator(RECORD_TERMINATOR)
            .map(str::to_owned)
            .collect())
    }

    /// Atomically replace the file with `lines`.
    async fn replace(&self, lines: &[String]) -> StorageResult<()> {
        if let Some(parent) = self.parent_dir() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }

        let tmp = self.temp_path();

        let mut contents = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            contents.push_str(line);
            contents.push(RECORD_TERMINATOR);
        }

        if let Err(e) = write_synced(&tmp, contents.as_bytes()).await {
            discard(&tmp).await;
            return Err(StorageError::io(&tmp, e));
        }

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            discard(&tmp).await;
            return Err(StorageError::io(&self.path, e));
        }

        debug!(path = %self.path.display(), records = lines.len(), "Tag registry rewritten");
        Ok(())
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
    }
}

/// Index of the line keyed by `tag`, checking every key on the way.
fn position_of(lines: &[String], tag: &TagId) -> StorageResult<Option<usize>> {
    for (idx, line) in lines.iter().enumerate() {
        if record_key(line, idx + 1)? == tag.as_bytes() {
            return Ok(Some(idx));
        }
    }
    Ok(None)
}

impl TagRegistry for FileRegistry {
    async fn lookup(&self, tag: &TagId) -> StorageResult<Option<TagRecord>> {
        let lines = self.read_lines().await?;

        match position_of(&lines, tag)? {
            Some(idx) => {
                let record = TagRecord::decode(&lines[idx], idx + 1)?;
                debug!(tag = %tag, "Tag found");
                Ok(Some(record))
            }
            None => {
                debug!(tag = %tag, "Tag not found");
                Ok(None)
            }
        }
    }

    async fn upsert(&self, tag: &TagId, name: &HolderName) -> StorageResult<TagRecord> {
        let mut lines = self.read_lines().await?;
        let record = TagRecord::new(tag.clone(), name.clone(), touch_timestamp());
        let encoded = record.encode().trim_end_matches(RECORD_TERMINATOR).to_owned();

        match position_of(&lines, tag)? {
            Some(idx) => {
                lines.remove(idx);
                lines.push(encoded);
                self.replace(&lines).await?;
                info!(tag = %tag, name = %name, "Tag record updated");
            }
            None => {
                lines.push(encoded);
                self.replace(&lines).await?;
                info!(tag = %tag, name = %name, "Tag record added");
            }
        }

        Ok(record)
    }

    async fn delete(&self, tag: &TagId) -> StorageResult<bool> {
        let mut lines = self.read_lines().await?;

        let Some(idx) = position_of(&lines, tag)? else {
            debug!(tag = %tag, "Delete of unknown tag");
            return Ok(false);
        };

        lines.remove(idx);
        self.replace(&lines).await?;
        info!(tag = %tag, "Tag record deleted");
        Ok(true)
    }

    async fn list(&self) -> StorageResult<Vec<TagRecord>> {
        self.read_lines()
            .await?
            .iter()
            .enumerate()
            .map(|(idx, line)| TagRecord::decode(line, idx + 1))
            .collect()
    }
}
