use thiserror::Error;

/// Failures reported by a [`crate::ingest::FolderApi`] implementation.
///
/// The display string is what ends up in an upload record's `error` field,
/// so variants carrying a message print it verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Transport(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("failed to read {name}: {reason}")]
    Read { name: String, reason: String },
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by the walker and the upload orchestrator.
#[derive(Debug, Error)]
pub enum FolderError {
    /// The directory handle was revoked or access was denied mid-walk.
    #[error("cannot read directory {path}: {reason}")]
    DirectoryAccess { path: String, reason: String },

    /// The walk finished without a single accepted file.
    #[error("folder {folder} has no files that can be uploaded")]
    EmptyFolder { folder: String },

    #[error("{0}")]
    Upload(#[source] ApiError),

    #[error("association failed: {0}")]
    Association(#[source] ApiError),

    #[error("no failed upload with id {0}")]
    UnknownUpload(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type Result<T, E = FolderError> = std::result::Result<T, E>;
