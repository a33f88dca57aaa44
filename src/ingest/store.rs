use super::schema::{AssociableItem, FolderFile, UploadingFolder};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Query key for the conversation file list.
pub const LIST_FILES_QUERY: &str = "listFiles";
/// Query key for per-folder file listings.
pub const LIST_FOLDER_FILES_QUERY: &str = "listFolderFiles";

#[derive(Debug, Clone, Default)]
pub struct FoldersState {
    pub uploading_folders: Vec<UploadingFolder>,
    /// One `"<upload id>: <message>"` line per failed upload.
    pub folder_errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub id: Option<String>,
    pub associable_items: Vec<AssociableItem>,
}

#[derive(Debug, Clone, Default)]
pub struct ParamsState {
    /// Files attached to the next chat request. Never holds duplicates.
    pub file_ids: Vec<String>,
}

#[derive(Debug, Default)]
struct QueryState {
    generations: HashMap<String, u64>,
    folder_files: HashMap<String, Vec<FolderFile>>,
}

#[derive(Debug, Default)]
struct StoreState {
    folders: FoldersState,
    conversation: ConversationState,
    params: ParamsState,
    queries: QueryState,
}

fn error_prefix(id: &str) -> String {
    format!("{id}: ")
}

impl FoldersState {
    fn remove(&mut self, id: &str) -> Option<UploadingFolder> {
        let idx = self.uploading_folders.iter().position(|f| f.id == id)?;
        let prefix = error_prefix(id);
        self.folder_errors.retain(|e| !e.starts_with(&prefix));
        Some(self.uploading_folders.remove(idx))
    }
}

impl ParamsState {
    fn merge<I, S>(&mut self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            if !self.file_ids.contains(&id) {
                self.file_ids.push(id);
            }
        }
        self.file_ids.clone()
    }
}

impl QueryState {
    fn generation(&self, key: &str) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }

    fn invalidate(&mut self, key: &str) {
        *self.generations.entry(key.to_string()).or_default() += 1;
        if key == LIST_FOLDER_FILES_QUERY {
            self.folder_files.clear();
        }
    }
}

/// Client-side state shared by every upload and association call.
///
/// All mutation goes through methods that hold the lock for the whole
/// read-modify-write, so concurrent uploads finishing together cannot lose
/// each other's updates. Reads return cloned snapshots.
#[derive(Debug, Default)]
pub struct Store {
    state: Mutex<StoreState>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folders(&self) -> FoldersState {
        self.state.lock().folders.clone()
    }

    pub fn conversation(&self) -> ConversationState {
        self.state.lock().conversation.clone()
    }

    pub fn params(&self) -> ParamsState {
        self.state.lock().params.clone()
    }

    fn update<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        f(&mut self.state.lock())
    }

    // Folders

    pub fn add_uploading_folder(&self, folder: UploadingFolder) {
        self.update(|s| s.folders.uploading_folders.push(folder));
    }

    pub fn uploading_folder(&self, id: &str) -> Option<UploadingFolder> {
        self.state
            .lock()
            .folders
            .uploading_folders
            .iter()
            .find(|f| f.id == id)
            .cloned()
    }

    /// Remove a record along with its line in the error log.
    pub fn remove_uploading_folder(&self, id: &str) -> Option<UploadingFolder> {
        self.update(|s| s.folders.remove(id))
    }

    /// Swap a failed record for the freshly staged attempt that retries it.
    pub fn replace_uploading_folder(&self, old_id: &str, folder: UploadingFolder) {
        self.update(|s| {
            s.folders.remove(old_id);
            s.folders.uploading_folders.push(folder);
        });
    }

    /// Finish a successful upload in one update: drop its record, attach
    /// `file_ids`, adopt `conversation_id` when given and mark the
    /// conversation file list stale. Returns the resulting file ids.
    pub fn complete_upload(
        &self,
        upload_id: &str,
        file_ids: impl IntoIterator<Item = String>,
        conversation_id: Option<&str>,
    ) -> Vec<String> {
        self.update(|s| {
            s.folders.remove(upload_id);
            if let Some(id) = conversation_id {
                s.conversation.id = Some(id.to_string());
            }
            s.queries.invalidate(LIST_FILES_QUERY);
            s.params.merge(file_ids)
        })
    }

    /// Mark an upload as failed and log the error. Returns false if no
    /// record with `id` is active.
    pub fn set_upload_error(&self, id: &str, error: &str) -> bool {
        self.update(|s| {
            let Some(folder) = s.folders.uploading_folders.iter_mut().find(|f| f.id == id) else {
                return false;
            };
            folder.error = Some(error.to_string());

            let line = format!("{id}: {error}");
            let prefix = error_prefix(id);
            let errors = &mut s.folders.folder_errors;
            match errors.iter_mut().find(|e| e.starts_with(&prefix)) {
                Some(existing) => *existing = line,
                None => errors.push(line),
            }
            true
        })
    }

    /// Drop every record that carries an error, and its log line.
    pub fn clear_failed_uploads(&self) {
        self.update(|s| {
            let failed: Vec<String> = s
                .folders
                .uploading_folders
                .iter()
                .filter(|f| f.error.is_some())
                .map(|f| f.id.clone())
                .collect();
            for id in &failed {
                s.folders.remove(id);
            }
        });
    }

    pub fn clear_uploads(&self) {
        self.update(|s| {
            let ids: Vec<String> = s.folders.uploading_folders.iter().map(|f| f.id.clone()).collect();
            for id in &ids {
                s.folders.remove(id);
            }
        });
    }

    pub fn clear_folder_errors(&self) {
        self.update(|s| s.folders.folder_errors.clear());
    }

    // Conversation and params

    /// Replace the associable items with a server response, optionally
    /// adopting the conversation id the server reported, in one update.
    pub fn replace_associable_items(&self, items: Vec<AssociableItem>, conversation_id: Option<&str>) {
        self.update(|s| {
            if let Some(id) = conversation_id {
                s.conversation.id = Some(id.to_string());
            }
            s.conversation.associable_items = items;
        });
    }

    /// Forget the active conversation, its items and attached file ids.
    pub fn reset_conversation(&self) {
        self.update(|s| {
            s.conversation = ConversationState::default();
            s.params.file_ids.clear();
        });
    }

    // Queries

    /// Mark every cached result under `key` stale.
    pub fn invalidate_queries(&self, key: &str) {
        self.update(|s| s.queries.invalidate(key));
    }

    /// How many times `key` has been invalidated. Views compare this to
    /// decide whether to refetch.
    pub fn query_generation(&self, key: &str) -> u64 {
        self.state.lock().queries.generation(key)
    }

    pub fn cached_folder_files(&self, folder_id: &str) -> Option<Vec<FolderFile>> {
        self.state.lock().queries.folder_files.get(folder_id).cloned()
    }

    /// Cache a folder listing fetched while `listFolderFiles` was at
    /// `generation`. A listing that raced an invalidation is dropped;
    /// returns whether it was cached.
    pub fn cache_folder_files(&self, folder_id: &str, generation: u64, files: Vec<FolderFile>) -> bool {
        self.update(|s| {
            if s.queries.generation(LIST_FOLDER_FILES_QUERY) != generation {
                return false;
            }
            s.queries.folder_files.insert(folder_id.to_string(), files);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::directory::memory::MemoryDirectory;
    use std::sync::Arc;

    fn record(id: &str) -> UploadingFolder {
        UploadingFolder {
            id: id.to_string(),
            folder: Arc::new(MemoryDirectory::new("docs")),
            error: None,
            progress: 0,
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn complete_upload_skips_duplicate_ids() {
        let store = Store::new();
        store.add_uploading_folder(record("1"));
        store.add_uploading_folder(record("2"));
        store.complete_upload("1", ids(&["a", "b"]), None);

        let file_ids = store.complete_upload("2", ids(&["b", "c", "a"]), None);

        assert_eq!(file_ids, vec!["a", "b", "c"]);
        assert_eq!(store.params().file_ids, file_ids);
    }

    #[test]
    fn complete_upload_applies_everything_at_once() {
        let store = Store::new();
        store.add_uploading_folder(record("1"));

        store.complete_upload("1", ids(&["f1"]), Some("c-new"));

        assert!(store.folders().uploading_folders.is_empty());
        assert_eq!(store.params().file_ids, vec!["f1"]);
        assert_eq!(store.conversation().id.as_deref(), Some("c-new"));
        assert_eq!(store.query_generation(LIST_FILES_QUERY), 1);
    }

    #[test]
    fn upload_error_is_recorded_once_per_id() {
        let store = Store::new();
        store.add_uploading_folder(record("1"));

        assert!(store.set_upload_error("1", "timeout"));
        assert!(store.set_upload_error("1", "refused"));
        assert!(!store.set_upload_error("missing", "x"));

        let folders = store.folders();
        assert_eq!(folders.uploading_folders[0].error.as_deref(), Some("refused"));
        assert_eq!(folders.folder_errors, vec!["1: refused"]);
    }

    #[test]
    fn clear_failed_uploads_keeps_pending_ones() {
        let store = Store::new();
        store.add_uploading_folder(record("ok"));
        store.add_uploading_folder(record("bad"));
        store.set_upload_error("bad", "boom");

        store.clear_failed_uploads();

        let folders = store.folders();
        let ids: Vec<_> = folders.uploading_folders.into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["ok"]);
        assert!(folders.folder_errors.is_empty());
    }

    #[test]
    fn removing_a_record_drops_its_error_line_only() {
        let store = Store::new();
        store.add_uploading_folder(record("1"));
        store.add_uploading_folder(record("12"));
        store.set_upload_error("1", "timeout");
        store.set_upload_error("12", "refused");

        store.remove_uploading_folder("1");

        assert_eq!(store.folders().folder_errors, vec!["12: refused"]);
        store.clear_folder_errors();
        assert!(store.folders().folder_errors.is_empty());
        assert_eq!(store.folders().uploading_folders.len(), 1);
    }

    #[test]
    fn replacing_a_failed_record_keeps_one_entry() {
        let store = Store::new();
        store.add_uploading_folder(record("old"));
        store.set_upload_error("old", "timeout");

        store.replace_uploading_folder("old", record("new"));

        let folders = store.folders();
        let ids: Vec<_> = folders.uploading_folders.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["new"]);
        assert!(folders.folder_errors.is_empty());
    }

    #[test]
    fn reset_conversation_wipes_ids_and_items() {
        let store = Store::new();
        store.add_uploading_folder(record("1"));
        store.complete_upload("1", ids(&["f1"]), None);
        store.replace_associable_items(vec![AssociableItem::default()], Some("c1"));

        store.reset_conversation();

        let conversation = store.conversation();
        assert_eq!(conversation.id, None);
        assert!(conversation.associable_items.is_empty());
        assert!(store.params().file_ids.is_empty());
    }

    #[test]
    fn invalidating_folder_files_drops_cache() {
        let store = Store::new();
        assert!(store.cache_folder_files("folder", 0, vec![FolderFile::default()]));
        assert!(store.cached_folder_files("folder").is_some());

        store.invalidate_queries(LIST_FOLDER_FILES_QUERY);

        assert!(store.cached_folder_files("folder").is_none());
        assert_eq!(store.query_generation(LIST_FOLDER_FILES_QUERY), 1);
        assert_eq!(store.query_generation(LIST_FILES_QUERY), 0);
    }

    #[test]
    fn listing_from_an_older_generation_is_not_cached() {
        let store = Store::new();
        let generation = store.query_generation(LIST_FOLDER_FILES_QUERY);
        store.invalidate_queries(LIST_FOLDER_FILES_QUERY);

        assert!(!store.cache_folder_files("folder", generation, vec![FolderFile::default()]));
        assert!(store.cached_folder_files("folder").is_none());
    }

    #[test]
    fn concurrent_completions_do_not_lose_updates() {
        let store = Arc::new(Store::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let id = format!("{t}-{i}");
                        store.add_uploading_folder(record(&id));
                        store.complete_upload(&id, [format!("file-{id}")], None);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.params().file_ids.len(), 400);
        assert!(store.folders().uploading_folders.is_empty());
    }
}
