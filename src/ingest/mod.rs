//! Folder ingestion
//!
//! Walks a granted directory into uploadable files, uploads them as a
//! folder, and keeps conversation file state in sync with the backend.

pub mod client;
pub mod directory;
pub mod exclude;
pub mod mime;
pub mod orchestrator;
pub mod schema;
pub mod store;
pub mod walker;

pub use client::{FolderApi, HttpFolderClient};
pub use directory::{DirEntry, DirectoryHandle, FileHandle, LocalDirectory};
pub use mime::MimeType;
pub use orchestrator::FolderUploader;
pub use schema::{AssociableItem, ConversationFile, FileEntry, FolderFile, ItemType, UploadingFolder};
pub use store::Store;
pub use walker::{DirectoryWalker, WalkOptions};
