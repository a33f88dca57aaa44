use super::directory::{DirEntry, DirectoryHandle};
use super::exclude::ExclusionRules;
use super::mime::{MimeType, ACCEPTED_FILE_TYPES};
use super::schema::FileEntry;
use crate::error::{FolderError, Result};
use std::collections::HashSet;

/// Path used for files that sit directly in the walked root.
pub const ROOT_PATH: &str = ".";

/// What the walker keeps and what it prunes.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub accepted: HashSet<MimeType>,
    pub exclusions: ExclusionRules,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            accepted: ACCEPTED_FILE_TYPES.iter().copied().collect(),
            exclusions: ExclusionRules::default(),
        }
    }
}

impl WalkOptions {
    pub fn new(accepted: impl IntoIterator<Item = MimeType>, exclusions: ExclusionRules) -> Self {
        Self {
            accepted: accepted.into_iter().filter(|t| *t != MimeType::Unknown).collect(),
            exclusions,
        }
    }
}

/// Flattens a directory tree into uploadable [`FileEntry`] values.
#[derive(Debug, Clone, Default)]
pub struct DirectoryWalker {
    options: WalkOptions,
}

struct Frame {
    path: String,
    pending: std::vec::IntoIter<DirEntry>,
}

impl DirectoryWalker {
    pub fn new(options: WalkOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WalkOptions {
        &self.options
    }

    /// Walk `root` depth-first. Sub-directories are finished before the
    /// next sibling is visited; siblings keep the handle's order.
    ///
    /// Any enumeration failure aborts the whole walk and nothing collected
    /// so far is returned.
    pub async fn walk(&self, root: &dyn DirectoryHandle) -> Result<Vec<FileEntry>> {
        let mut files = Vec::new();
        let mut stack = vec![Frame {
            path: ROOT_PATH.to_string(),
            pending: self.list(root, ROOT_PATH).await?.into_iter(),
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(entry) = frame.pending.next() else {
                stack.pop();
                continue;
            };
            let parent = frame.path.clone();

            if self.options.exclusions.is_excluded(entry.name()) {
                tracing::debug!(path = %parent, name = entry.name(), "Skipping excluded entry");
                continue;
            }

            match entry {
                DirEntry::File(file) => {
                    let mime_type = MimeType::resolve(file.content_type(), file.name());
                    if !self.options.accepted.contains(&mime_type) {
                        tracing::debug!(
                            path = %parent,
                            name = file.name(),
                            reported = file.content_type(),
                            "Skipping file with unaccepted type"
                        );
                        continue;
                    }
                    files.push(FileEntry {
                        relative_path: parent,
                        original_name: file.name().to_string(),
                        mime_type,
                        blob: file,
                    });
                }
                DirEntry::Directory(dir) => {
                    let path = join_path(&parent, dir.name());
                    let pending = self.list(dir.as_ref(), &path).await?.into_iter();
                    stack.push(Frame { path, pending });
                }
            }
        }

        tracing::debug!(folder = root.name(), files = files.len(), "Walk finished");
        Ok(files)
    }

    async fn list(&self, dir: &dyn DirectoryHandle, path: &str) -> Result<Vec<DirEntry>> {
        dir.entries().await.map_err(|e| FolderError::DirectoryAccess {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent == ROOT_PATH {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
