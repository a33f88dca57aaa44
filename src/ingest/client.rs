use super::schema::{AssociableItem, ConversationFile, FileEntry, FolderFile};
use crate::config::ApiConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Path segment standing in for "no conversation yet" on the wire.
pub const NO_CONVERSATION_SEGMENT: &str = "all";

/// The slice of the chat backend the uploader talks to.
#[async_trait]
pub trait FolderApi: Send + Sync {
    /// Upload a whole folder in one request. With no `conversation_id` the
    /// backend creates a conversation and reports its id on every item.
    async fn upload_folder(
        &self,
        agent_id: &str,
        conversation_id: Option<&str>,
        folder_name: &str,
        files: &[FileEntry],
    ) -> Result<Vec<ConversationFile>, ApiError>;

    async fn associate_item(
        &self,
        item_id: &str,
        conversation_id: Option<&str>,
        agent_id: &str,
    ) -> Result<Vec<AssociableItem>, ApiError>;

    async fn deassociate_item(
        &self,
        item_id: &str,
        conversation_id: Option<&str>,
        agent_id: &str,
    ) -> Result<Vec<AssociableItem>, ApiError>;

    /// Every file and folder the user owns, flagged by whether it is
    /// attached to `conversation_id`.
    async fn list_associable_items(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Vec<AssociableItem>, ApiError>;

    async fn list_folder_files(&self, folder_id: &str) -> Result<Vec<FolderFile>, ApiError>;

    async fn delete_folder_file(&self, folder_id: &str, file_id: &str) -> Result<(), ApiError>;
}

/// `FolderApi` over the backend's HTTP routes.
#[derive(Debug, Clone)]
pub struct HttpFolderClient {
    http: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpFolderClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Transport(format!("invalid base url {}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Transport(format!(
                "invalid base url {}",
                config.base_url
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    /// `<base>/v1/conversations/<segments...>`, each segment escaped.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["v1", "conversations"])
                .extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn build_upload_form(
        agent_id: &str,
        conversation_id: Option<&str>,
        folder_name: &str,
        files: &[FileEntry],
    ) -> Result<Form, ApiError> {
        let mut form = Form::new()
            .text("agent_id", agent_id.to_string())
            .text("folder_name", folder_name.to_string());
        if let Some(id) = conversation_id {
            form = form.text("conversation_id", id.to_string());
        }

        let mut sorted: Vec<&FileEntry> = files.iter().collect();
        sorted.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        for entry in sorted {
            let data = entry.blob.read().await.map_err(|e| ApiError::Read {
                name: entry.original_name.clone(),
                reason: e.to_string(),
            })?;
            let part = Part::bytes(data)
                .file_name(entry.original_name.clone())
                .mime_str(entry.mime_type.as_str())?;
            form = form
                .part("files", part)
                .text("paths", entry.relative_path.clone())
                .text("names", entry.original_name.clone());
        }
        Ok(form)
    }
}

fn conversation_segment(conversation_id: Option<&str>) -> &str {
    conversation_id.unwrap_or(NO_CONVERSATION_SEGMENT)
}

#[async_trait]
impl FolderApi for HttpFolderClient {
    async fn upload_folder(
        &self,
        agent_id: &str,
        conversation_id: Option<&str>,
        folder_name: &str,
        files: &[FileEntry],
    ) -> Result<Vec<ConversationFile>, ApiError> {
        let form = Self::build_upload_form(agent_id, conversation_id, folder_name, files).await?;
        let url = self.endpoint(&["upload_folder"]);
        tracing::debug!(%url, files = files.len(), "Uploading folder");
        Self::send(self.request(Method::POST, url).multipart(form)).await
    }

    async fn associate_item(
        &self,
        item_id: &str,
        conversation_id: Option<&str>,
        agent_id: &str,
    ) -> Result<Vec<AssociableItem>, ApiError> {
        let url = self.endpoint(&[conversation_segment(conversation_id), "associate", item_id]);
        Self::send(
            self.request(Method::POST, url)
                .query(&[("agent_id", agent_id)]),
        )
        .await
    }

    async fn deassociate_item(
        &self,
        item_id: &str,
        conversation_id: Option<&str>,
        agent_id: &str,
    ) -> Result<Vec<AssociableItem>, ApiError> {
        let url = self.endpoint(&[conversation_segment(conversation_id), "deassociate", item_id]);
        Self::send(
            self.request(Method::DELETE, url)
                .query(&[("agent_id", agent_id)]),
        )
        .await
    }

    async fn list_associable_items(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Vec<AssociableItem>, ApiError> {
        let url = self.endpoint(&["files-and-folders", conversation_segment(conversation_id)]);
        Self::send(self.request(Method::GET, url)).await
    }

    async fn list_folder_files(&self, folder_id: &str) -> Result<Vec<FolderFile>, ApiError> {
        let url = self.endpoint(&[NO_CONVERSATION_SEGMENT, "folders", folder_id, "files"]);
        Self::send(self.request(Method::GET, url)).await
    }

    async fn delete_folder_file(&self, folder_id: &str, file_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&[NO_CONVERSATION_SEGMENT, "folders", folder_id, "files", file_id]);
        Self::check(self.request(Method::DELETE, url).send().await?).await?;
        Ok(())
    }
}
