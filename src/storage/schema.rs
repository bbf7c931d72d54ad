use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Schema version reported with every file entry.
pub const FILE_INFO_VERSION: u32 = 2;

/// Metadata for a stored file, in the shape the document editor expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub version: u32,
    /// Filename followed by the modification time in milliseconds.
    pub id: String,
    pub content_length: String,
    pub pure_content_length: u64,
    pub title: String,
    /// ISO-8601, UTC, millisecond precision.
    pub updated: String,
}

impl FileInfo {
    pub fn new(filename: &str, size: u64, modified: SystemTime) -> Self {
        let modified: DateTime<Utc> = modified.into();
        Self {
            version: FILE_INFO_VERSION,
            id: format!("{}{}", filename, modified.timestamp_millis()),
            content_length: format_file_size(size),
            pure_content_length: size,
            title: filename.to_string(),
            updated: modified.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Response body for a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub message: String,
    pub filename: String,
    pub size: String,
    pub file_info: FileInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
}

impl UploadReceipt {
    /// Build the receipt, explaining any change between what the client sent
    /// and the name the file was stored under.
    pub fn new(original: &str, sanitized: &str, info: FileInfo) -> Self {
        let mut adjustments = Vec::new();
        if sanitized != original {
            adjustments.push("cleaned special characters");
        }
        if info.title != sanitized {
            adjustments.push("added number suffix to avoid duplication");
        }

        let (message, original_filename) = if adjustments.is_empty() {
            ("File uploaded successfully".to_string(), None)
        } else {
            (
                format!(
                    "File uploaded successfully (filename automatically adjusted: {})",
                    adjustments.join(", ")
                ),
                Some(original.to_string()),
            )
        };

        Self {
            message,
            filename: info.title.clone(),
            size: info.content_length.clone(),
            file_info: info,
            original_filename,
        }
    }
}

/// Human-readable size with two decimals, e.g. `"12.34 KB"`.
pub fn format_file_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} TB")
}
