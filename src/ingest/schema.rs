use super::directory::{DirectoryHandle, FileHandle};
use super::mime::MimeType;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// A file picked up by the walker, ready to upload.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Directory holding the file, relative to the walked root. Root-level
    /// files use `"."`.
    pub relative_path: String,
    pub original_name: String,
    pub mime_type: MimeType,
    pub blob: Arc<dyn FileHandle>,
}

/// A folder upload in flight, or one that failed and is awaiting retry.
#[derive(Debug, Clone)]
pub struct UploadingFolder {
    pub id: String,
    pub folder: Arc<dyn DirectoryHandle>,
    pub error: Option<String>,
    pub progress: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    File,
    Folder,
}

/// A file or folder as returned by the upload endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationFile {
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub conversation_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub file_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub file_size: u64,
    pub file_path: Option<String>,
    pub item_type: ItemType,
    pub folder_id: Option<String>,
    pub files: Option<Vec<ConversationFile>>,
}

// The backend sends `null` for some optional string fields.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A file or folder the user may attach to or detach from a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssociableItem {
    #[serde(flatten)]
    pub item: ConversationFile,
    #[serde(default)]
    pub is_associated: bool,
}

/// File metadata from the list-folder-files endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderFile {
    pub id: String,
    pub file_name: String,
    pub file_path: Option<String>,
    pub file_size: u64,
    pub conversation_id: Option<String>,
}
