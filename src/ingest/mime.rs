use serde::{Deserialize, Serialize};
use std::fmt;

/// Content types the backend knows how to ingest, plus `Unknown` for
/// everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MimeType {
    PlainText,
    Markdown,
    Csv,
    TabSeparated,
    Html,
    Json,
    Pdf,
    Epub,
    Word,
    WordOpenXml,
    PowerPointOpenXml,
    Excel,
    ExcelOpenXml,
    Parquet,
    Unknown,
}

/// Every ingestible type, in the order the upload dialog lists them.
pub const ACCEPTED_FILE_TYPES: &[MimeType] = &[
    MimeType::Csv,
    MimeType::PlainText,
    MimeType::Html,
    MimeType::Markdown,
    MimeType::TabSeparated,
    MimeType::Word,
    MimeType::WordOpenXml,
    MimeType::PowerPointOpenXml,
    MimeType::Json,
    MimeType::Pdf,
    MimeType::Epub,
    MimeType::Excel,
    MimeType::ExcelOpenXml,
    MimeType::Parquet,
];

impl MimeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::Markdown => "text/markdown",
            Self::Csv => "text/csv",
            Self::TabSeparated => "text/tab-separated-values",
            Self::Html => "text/html",
            Self::Json => "application/json",
            Self::Pdf => "application/pdf",
            Self::Epub => "application/epub+zip",
            Self::Word => "application/msword",
            Self::WordOpenXml => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::PowerPointOpenXml => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Excel => "application/vnd.ms-excel",
            Self::ExcelOpenXml => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Parquet => "application/vnd.apache.parquet",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// Parse a platform-reported content type. Parameters such as
    /// `; charset=utf-8` are ignored.
    pub fn parse(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/plain" => Self::PlainText,
            "text/markdown" | "text/x-markdown" => Self::Markdown,
            "text/csv" => Self::Csv,
            "text/tab-separated-values" => Self::TabSeparated,
            "text/html" => Self::Html,
            "application/json" => Self::Json,
            "application/pdf" => Self::Pdf,
            "application/epub+zip" => Self::Epub,
            "application/msword" => Self::Word,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Self::WordOpenXml
            }
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                Self::PowerPointOpenXml
            }
            "application/vnd.ms-excel" => Self::Excel,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Self::ExcelOpenXml
            }
            "application/vnd.apache.parquet" | "application/x-parquet" => Self::Parquet,
            _ => Self::Unknown,
        }
    }

    /// Map a file extension (without the dot, any case) to its type.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "text" | "log" => Self::PlainText,
            "md" | "markdown" | "mdx" => Self::Markdown,
            "csv" => Self::Csv,
            "tsv" => Self::TabSeparated,
            "html" | "htm" => Self::Html,
            "json" => Self::Json,
            "pdf" => Self::Pdf,
            "epub" => Self::Epub,
            "doc" => Self::Word,
            "docx" => Self::WordOpenXml,
            "pptx" => Self::PowerPointOpenXml,
            "xls" => Self::Excel,
            "xlsx" => Self::ExcelOpenXml,
            "parquet" => Self::Parquet,
            _ => Self::Unknown,
        }
    }

    /// Infer from a filename's last extension. Names without an extension
    /// (or dotfiles such as `.bashrc`) are `Unknown`.
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Self::from_extension(ext),
            _ => Self::Unknown,
        }
    }

    /// Resolve the type of a file: the reported content type wins when the
    /// platform supplies one, otherwise the extension decides.
    pub fn resolve(reported: &str, filename: &str) -> Self {
        if reported.trim().is_empty() {
            Self::from_filename(filename)
        } else {
            Self::parse(reported)
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
