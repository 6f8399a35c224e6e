//! Where downloaded files and run logs are written
//!
//! Writes go through the [`Persistence`] trait so runs can be pointed at
//! something other than the local filesystem in tests.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// Destination for everything a run writes
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Creates `dir` and its parents if they are missing
    async fn ensure_directory(&self, dir: &Path) -> io::Result<()>;

    /// Writes `contents` to `path`, replacing an existing file
    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    async fn exists(&self, path: &Path) -> io::Result<bool>;
}

/// Local filesystem persistence on `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPersistence;

#[async_trait]
impl Persistence for FsPersistence {
    async fn ensure_directory(&self, dir: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(dir).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, contents).await
    }

    async fn exists(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(path).await
    }
}

/// Picks the path a new file called `file_name` is written to in `dir`
///
/// With `clone_files`, an existing file is kept and the first free numbered
/// name is used instead: `photo.jpg`, `photo1.jpg`, `photo2.jpg`, ...
pub async fn unique_file_path(
    persistence: &dyn Persistence,
    dir: &Path,
    file_name: &str,
    clone_files: bool,
) -> io::Result<PathBuf> {
    let path = dir.join(file_name);
    if !clone_files || !persistence.exists(&path).await? {
        return Ok(path);
    }

    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (file_name, None),
    };

    let mut counter = 1u32;
    loop {
        let candidate = match extension {
            Some(extension) => dir.join(format!("{}{}.{}", stem, counter, extension)),
            None => dir.join(format!("{}{}", stem, counter)),
        };

        if !persistence.exists(&candidate).await? {
            return Ok(candidate);
        }
        counter += 1;
    }
}
