//! Upload source
//!
//! What the embedding application hands to the [`Brewery`](crate::Brewery):
//! the uploaded files and a flat metadata mapping.

use malt_common::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Flat request metadata (form fields other than the file)
pub type RequestMeta = BTreeMap<String, String>;

/// Request metadata key holding the creation timestamp in milliseconds
pub const DATE_KEY: &str = "date";

/// Request metadata key naming the handler to re-edit
pub const VIEW_NAME_KEY: &str = "view_name";

/// One uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was sent under
    pub field: String,
    /// Original file name
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(field: impl Into<String>, name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            name: name.into(),
            content,
        }
    }

    /// Read a file from disk, refusing anything larger than `max_size`
    ///
    /// The size is checked from file metadata before any byte is read.
    pub fn from_path(path: &Path, field: &str, max_size: u64) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(Error::InvalidInput(format!(
                "Not a file: {}",
                path.display()
            )));
        }
        if metadata.len() > max_size {
            return Err(Error::InvalidInput(format!(
                "File too large: {} bytes (max {} bytes)",
                metadata.len(),
                max_size
            )));
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidInput(format!("No file name: {}", path.display())))?;
        let content = std::fs::read(path)?;

        Ok(Self::new(field, name, content))
    }
}
