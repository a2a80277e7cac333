//! Test Helper Utilities
//!
//! Shared utilities for testing malt-brew

#![allow(dead_code, unused_imports)]

pub mod archives;
pub mod yeasts;

// Re-export commonly used items
pub use archives::{
    bzip, gzip, tar_archive, zip_archive, zip_archive_deflated, zip_archive_with, Entry,
};
pub use yeasts::{registry, CallLog, Pass};

use malt_brew::{RequestMeta, UploadedFile};

/// Request metadata with a fixed creation date
pub fn request_meta(date: i64) -> RequestMeta {
    let mut meta = RequestMeta::new();
    meta.insert("date".to_string(), date.to_string());
    meta
}

/// A single upload under the default field name
pub fn upload(name: &str, content: &[u8]) -> Vec<UploadedFile> {
    vec![UploadedFile::new("file", name, content.to_vec())]
}
