//! Directory handles the walker can enumerate.
//!
//! A handle is whatever the user granted access to: a path on the local
//! filesystem, or an in-memory tree in tests. Files expose their metadata
//! up front and their bytes on demand.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// A single file inside a granted directory.
#[async_trait]
pub trait FileHandle: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Content type as reported by the platform; empty when unknown.
    fn content_type(&self) -> &str;

    fn size(&self) -> u64;

    fn last_modified(&self) -> Option<DateTime<Utc>>;

    async fn read(&self) -> io::Result<Vec<u8>>;
}

/// A directory the user granted access to.
#[async_trait]
pub trait DirectoryHandle: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Enumerate immediate children. Fails if access was revoked.
    async fn entries(&self) -> io::Result<Vec<DirEntry>>;
}

#[derive(Debug, Clone)]
pub enum DirEntry {
    File(Arc<dyn FileHandle>),
    Directory(Arc<dyn DirectoryHandle>),
}

impl DirEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::File(f) => f.name(),
            Self::Directory(d) => d.name(),
        }
    }
}

/// A directory on the local filesystem. Symlinks are skipped.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    path: PathBuf,
    name: String,
}

impl LocalDirectory {
    /// Open a directory, expanding a leading `~`.
    pub async fn open(path: &str) -> io::Result<Self> {
        let expanded = PathBuf::from(shellexpand::tilde(path).to_string());
        let meta = fs::metadata(&expanded).await?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", expanded.display()),
            ));
        }
        Ok(Self::from_path(expanded))
    }

    fn from_path(path: PathBuf) -> Self {
        let name = display_name(&path);
        Self { path, name }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[async_trait]
impl DirectoryHandle for LocalDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn entries(&self) -> io::Result<Vec<DirEntry>> {
        let mut reader = fs::read_dir(&self.path).await?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let file_type = entry.file_type().await?;
            let path = entry.path();
            if file_type.is_dir() {
                entries.push(DirEntry::Directory(Arc::new(Self::from_path(path))));
            } else if file_type.is_file() {
                let meta = entry.metadata().await?;
                let last_modified = meta.modified().ok().map(DateTime::<Utc>::from);
                entries.push(DirEntry::File(Arc::new(LocalFile {
                    name: display_name(&path),
                    path,
                    size: meta.len(),
                    last_modified,
                })));
            }
        }
        Ok(entries)
    }
}

#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
    size: u64,
    last_modified: Option<DateTime<Utc>>,
}

#[async_trait]
impl FileHandle for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    // The filesystem carries no content type; the walker falls back to
    // the extension.
    fn content_type(&self) -> &str {
        ""
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    async fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path).await
    }
}

pub mod memory {
    //! In-memory directory trees, for tests and embedding callers that
    //! already hold file contents.

    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone)]
    pub struct MemoryFile {
        name: String,
        content_type: String,
        data: Vec<u8>,
    }

    impl MemoryFile {
        pub fn new(name: &str, content_type: &str, data: impl Into<Vec<u8>>) -> Self {
            Self {
                name: name.to_string(),
                content_type: content_type.to_string(),
                data: data.into(),
            }
        }
    }

    #[async_trait]
    impl FileHandle for MemoryFile {
        fn name(&self) -> &str {
            &self.name
        }

        fn content_type(&self) -> &str {
            &self.content_type
        }

        fn size(&self) -> u64 {
            self.data.len() as u64
        }

        fn last_modified(&self) -> Option<DateTime<Utc>> {
            None
        }

        async fn read(&self) -> io::Result<Vec<u8>> {
            Ok(self.data.clone())
        }
    }

    /// Children are enumerated in insertion order. Clones share the
    /// revoked flag.
    #[derive(Debug, Clone)]
    pub struct MemoryDirectory {
        name: String,
        children: Vec<DirEntry>,
        revoked: Arc<AtomicBool>,
    }

    impl MemoryDirectory {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                children: Vec::new(),
                revoked: Arc::new(AtomicBool::new(false)),
            }
        }

        /// Add a file with an empty reported content type.
        pub fn file(self, name: &str, data: impl Into<Vec<u8>>) -> Self {
            self.typed_file(name, "", data)
        }

        pub fn typed_file(mut self, name: &str, content_type: &str, data: impl Into<Vec<u8>>) -> Self {
            self.children
                .push(DirEntry::File(Arc::new(MemoryFile::new(name, content_type, data))));
            self
        }

        pub fn dir(mut self, child: MemoryDirectory) -> Self {
            self.children.push(DirEntry::Directory(Arc::new(child)));
            self
        }

        /// Make enumeration fail as if permission had been revoked.
        pub fn denied(self) -> Self {
            self.revoke();
            self
        }

        /// Revoke access after the handle was granted.
        pub fn revoke(&self) {
            self.revoked.store(true, Ordering::Relaxed);
        }
    }

    #[async_trait]
    impl DirectoryHandle for MemoryDirectory {
        fn name(&self) -> &str {
            &self.name
        }

        async fn entries(&self) -> io::Result<Vec<DirEntry>> {
            if self.revoked.load(Ordering::Relaxed) {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("access to {} was revoked", self.name),
                ));
            }
            Ok(self.children.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_directory_lists_files_and_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();

        let dir = LocalDirectory::open(tmp.path().to_str().unwrap()).await.unwrap();
        let mut entries = dir.entries().await.unwrap();
        entries.sort_by(|a, b| a.name().cmp(b.name()));

        assert_eq!(entries.len(), 2);
        match &entries[0] {
            DirEntry::File(f) => {
                assert_eq!(f.name(), "a.txt");
                assert_eq!(f.size(), 5);
                assert_eq!(f.content_type(), "");
                assert_eq!(f.read().await.unwrap(), b"hello");
            }
            other => panic!("expected file, got {other:?}"),
        }
        assert!(matches!(&entries[1], DirEntry::Directory(d) if d.name() == "sub"));
    }

    #[tokio::test]
    async fn opening_a_file_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.txt");
        std::fs::write(&file, b"x").unwrap();

        let err = LocalDirectory::open(file.to_str().unwrap()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn denied_memory_directory_fails_enumeration() {
        let dir = memory::MemoryDirectory::new("root").file("a.txt", "x").denied();
        let err = dir.entries().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
