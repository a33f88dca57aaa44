//! Folder upload and association flows.
//!
//! Each upload runs walk, stage, upload, reconcile in that order. The
//! staged record is visible in the store before the network call starts
//! and stays there with its error text if the call fails.

use super::client::FolderApi;
use super::directory::DirectoryHandle;
use super::schema::{AssociableItem, FolderFile, UploadingFolder};
use super::store::{Store, LIST_FOLDER_FILES_QUERY};
use super::walker::DirectoryWalker;
use crate::error::{ApiError, FolderError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Time-based id, unique within the process even for uploads started in
/// the same millisecond.
fn next_upload_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{seq}")
}

/// An empty id means "no conversation yet", same as `None`.
fn normalize(conversation_id: Option<&str>) -> Option<&str> {
    conversation_id.filter(|id| !id.is_empty())
}

pub struct FolderUploader {
    api: Arc<dyn FolderApi>,
    store: Arc<Store>,
    walker: DirectoryWalker,
}

impl FolderUploader {
    pub fn new(api: Arc<dyn FolderApi>, store: Arc<Store>, walker: DirectoryWalker) -> Self {
        Self { api, store, walker }
    }

    /// Upload every accepted file under `folder` and attach the results to
    /// the conversation. Returns the conversation's file ids afterwards.
    ///
    /// With no `conversation_id`, the conversation created by the backend
    /// becomes the active one.
    pub async fn upload_folder(
        &self,
        folder: Arc<dyn DirectoryHandle>,
        agent_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<Vec<String>> {
        self.run_upload(folder, agent_id, conversation_id, None).await
    }

    /// Re-run a failed upload with the folder it was started from. The
    /// failed record is replaced once the new attempt is staged; if the
    /// folder can no longer be walked it stays listed with the new error.
    pub async fn retry_upload(
        &self,
        upload_id: &str,
        agent_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<Vec<String>> {
        let failed = self
            .store
            .uploading_folder(upload_id)
            .filter(|f| f.error.is_some())
            .ok_or_else(|| FolderError::UnknownUpload(upload_id.to_string()))?;

        tracing::info!(upload_id, folder = failed.folder.name(), "Retrying upload");
        self.run_upload(failed.folder, agent_id, conversation_id, Some(upload_id))
            .await
    }

    async fn run_upload(
        &self,
        folder: Arc<dyn DirectoryHandle>,
        agent_id: &str,
        conversation_id: Option<&str>,
        retry_of: Option<&str>,
    ) -> Result<Vec<String>> {
        let conversation_id = normalize(conversation_id);
        let folder_name = folder.name().to_string();

        let files = match self.walker.walk(folder.as_ref()).await {
            Ok(files) if files.is_empty() => {
                tracing::info!(folder = %folder_name, "No uploadable files found");
                Err(FolderError::EmptyFolder { folder: folder_name.clone() })
            }
            walked => walked,
        };
        let files = match (files, retry_of) {
            (Ok(files), _) => files,
            (Err(e), Some(old_id)) => {
                tracing::warn!(upload_id = old_id, error = %e, "Retry could not walk folder");
                self.store.set_upload_error(old_id, &e.to_string());
                return Err(e);
            }
            (Err(e), None) => return Err(e),
        };

        let upload_id = next_upload_id();
        let record = UploadingFolder {
            id: upload_id.clone(),
            folder: Arc::clone(&folder),
            error: None,
            progress: 0,
        };
        match retry_of {
            Some(old_id) => self.store.replace_uploading_folder(old_id, record),
            None => self.store.add_uploading_folder(record),
        }
        tracing::info!(
            upload_id = %upload_id,
            folder = %folder_name,
            files = files.len(),
            conversation_id = conversation_id.unwrap_or("-"),
            "Uploading folder"
        );

        let uploaded = match self
            .api
            .upload_folder(agent_id, conversation_id, &folder_name, &files)
            .await
        {
            Ok(uploaded) => uploaded,
            Err(e) => {
                tracing::warn!(upload_id = %upload_id, error = %e, "Folder upload failed");
                self.store.set_upload_error(&upload_id, &e.to_string());
                return Err(FolderError::Upload(e));
            }
        };

        let adopted = match (conversation_id, uploaded.first()) {
            (Some(_), _) => None,
            (None, Some(first)) if !first.conversation_id.is_empty() => {
                tracing::info!(conversation_id = %first.conversation_id, "Adopting new conversation");
                Some(first.conversation_id.as_str())
            }
            (None, _) => {
                tracing::warn!(upload_id = %upload_id, "Upload response carried no conversation id");
                None
            }
        };
        let file_ids = self.store.complete_upload(
            &upload_id,
            uploaded.iter().map(|f| f.id.clone()),
            adopted,
        );

        tracing::info!(upload_id = %upload_id, items = uploaded.len(), "Folder uploaded");
        Ok(file_ids)
    }

    pub async fn associate_item(
        &self,
        item_id: &str,
        conversation_id: Option<&str>,
        agent_id: &str,
    ) -> Result<()> {
        let conversation_id = normalize(conversation_id);
        let items = self
            .api
            .associate_item(item_id, conversation_id, agent_id)
            .await;
        self.apply_items(item_id, conversation_id, items)
    }

    pub async fn deassociate_item(
        &self,
        item_id: &str,
        conversation_id: Option<&str>,
        agent_id: &str,
    ) -> Result<()> {
        let conversation_id = normalize(conversation_id);
        let items = self
            .api
            .deassociate_item(item_id, conversation_id, agent_id)
            .await;
        self.apply_items(item_id, conversation_id, items)
    }

    // The response is the full list; it replaces local state wholesale.
    fn apply_items(
        &self,
        item_id: &str,
        conversation_id: Option<&str>,
        items: std::result::Result<Vec<AssociableItem>, ApiError>,
    ) -> Result<()> {
        let items = items.map_err(|e| {
            tracing::warn!(item_id, error = %e, "Association request failed");
            FolderError::Association(e)
        })?;

        let server_id = items
            .iter()
            .map(|i| i.item.conversation_id.as_str())
            .find(|id| !id.is_empty())
            .filter(|id| Some(*id) != conversation_id)
            .map(str::to_string);
        if let Some(id) = &server_id {
            tracing::info!(conversation_id = %id, "Adopting conversation from server");
        }
        self.store.replace_associable_items(items, server_id.as_deref());
        Ok(())
    }

    /// Fetch the user's files and folders as seen from `conversation_id`.
    pub async fn refresh_associable_items(&self, conversation_id: Option<&str>) -> Result<()> {
        let items = self
            .api
            .list_associable_items(normalize(conversation_id))
            .await?;
        self.store.replace_associable_items(items, None);
        Ok(())
    }

    /// Files in a folder, served from the store until invalidated.
    pub async fn list_folder_files(&self, folder_id: &str) -> Result<Vec<FolderFile>> {
        if let Some(files) = self.store.cached_folder_files(folder_id) {
            return Ok(files);
        }
        let generation = self.store.query_generation(LIST_FOLDER_FILES_QUERY);
        let files = self.api.list_folder_files(folder_id).await?;
        if !self.store.cache_folder_files(folder_id, generation, files.clone()) {
            tracing::debug!(folder_id, "Folder listing went stale while fetching");
        }
        Ok(files)
    }

    /// Delete a file from a folder. Cached listings are invalidated even
    /// when the call fails.
    pub async fn delete_folder_file(&self, folder_id: &str, file_id: &str) -> Result<()> {
        let result = self.api.delete_folder_file(folder_id, file_id).await;
        self.store.invalidate_queries(LIST_FOLDER_FILES_QUERY);
        if let Err(e) = &result {
            tracing::warn!(folder_id, file_id, error = %e, "Failed to delete folder file");
        }
        Ok(result?)
    }
}
