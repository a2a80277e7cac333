//! Archive decoders
//!
//! An [`Enzyme`] turns an uploaded archive into a flat list of regular-file
//! [`Member`]s. Every enzyme checks the total declared size of the members
//! before reading any of them, so an archive whose headers announce more
//! than the configured cap is rejected without being decompressed.
//!
//! The cap trusts the declared sizes. A member whose header understates its
//! real size is still read in full.

use crate::brewing::Member;
use bzip2::read::BzDecoder;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use malt_common::config::DEFAULT_MAX_SIZE;
use std::io::{Cursor, Read};
use thiserror::Error;
use zip::ZipArchive;

/// Container does not match, is empty, or is too large
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnzymeError {
    #[error("could not open: {0}")]
    Open(String),

    #[error("empty")]
    Empty,

    #[error("cannot have more than {0} bytes uncompressed")]
    TooLarge(u64),

    #[error("could not read {0}")]
    Read(String),
}

/// Archive format decoder
pub trait Enzyme: Send + Sync {
    /// Short format name used in history entries
    fn extension(&self) -> &'static str;

    /// Decode `content` into its regular-file members, in archive order
    fn convert(&self, content: &[u8]) -> Result<Vec<Member>, EnzymeError>;
}

/// The shipped decoders in priority order: zip, then tar
pub fn default_enzymes(max_size: u64) -> Vec<Box<dyn Enzyme>> {
    vec![
        Box::new(ZipEnzyme::new(max_size)),
        Box::new(TarEnzyme::new(max_size)),
    ]
}

/// Header data gathered before any member is read
struct Info {
    name: String,
    size: u64,
    date: Option<DateTime<Utc>>,
}

fn check_infos(infos: &[Info], max_size: u64) -> Result<(), EnzymeError> {
    if infos.is_empty() {
        return Err(EnzymeError::Empty);
    }

    let size = infos
        .iter()
        .fold(0u64, |total, info| total.saturating_add(info.size));
    if size > max_size {
        return Err(EnzymeError::TooLarge(max_size));
    }

    Ok(())
}

/// Zip archives
///
/// Zip headers store local time without a zone, so members carry no
/// logical timestamp.
pub struct ZipEnzyme {
    max_size: u64,
}

impl ZipEnzyme {
    pub fn new(max_size: u64) -> Self {
        Self { max_size }
    }
}

impl Default for ZipEnzyme {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}

impl Enzyme for ZipEnzyme {
    fn extension(&self) -> &'static str {
        "zip"
    }

    fn convert(&self, content: &[u8]) -> Result<Vec<Member>, EnzymeError> {
        let mut archive =
            ZipArchive::new(Cursor::new(content)).map_err(|e| EnzymeError::Open(e.to_string()))?;

        let mut indices = Vec::new();
        let mut infos = Vec::new();
        for index in 0..archive.len() {
            let file = archive
                .by_index(index)
                .map_err(|e| EnzymeError::Open(e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            indices.push(index);
            infos.push(Info {
                name: file.name().to_string(),
                size: file.size(),
                date: None,
            });
        }

        check_infos(&infos, self.max_size)?;

        let mut members = Vec::with_capacity(infos.len());
        for (index, info) in indices.into_iter().zip(infos) {
            let mut file = archive
                .by_index(index)
                .map_err(|_| EnzymeError::Read(info.name.clone()))?;
            let mut buffer = Vec::with_capacity(info.size as usize);
            file.read_to_end(&mut buffer)
                .map_err(|_| EnzymeError::Read(info.name.clone()))?;
            members.push(Member::new(info.date, info.name, buffer));
        }

        Ok(members)
    }
}

/// Tar archives, plain or compressed with gzip or bzip2
pub struct TarEnzyme {
    max_size: u64,
}

impl TarEnzyme {
    pub fn new(max_size: u64) -> Self {
        Self { max_size }
    }

    /// Pick a decompressor from the leading magic bytes
    fn reader<'a>(content: &'a [u8]) -> Box<dyn Read + 'a> {
        match content {
            [0x1f, 0x8b, ..] => Box::new(GzDecoder::new(content)),
            [b'B', b'Z', b'h', ..] => Box::new(BzDecoder::new(content)),
            _ => Box::new(content),
        }
    }

    fn infos(content: &[u8]) -> Result<Vec<Info>, EnzymeError> {
        let mut archive = tar::Archive::new(Self::reader(content));
        let entries = archive
            .entries()
            .map_err(|e| EnzymeError::Open(e.to_string()))?;

        let mut infos = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EnzymeError::Open(e.to_string()))?;
            let header = entry.header();
            if !header.entry_type().is_file() {
                continue;
            }
            let date = header.mtime().ok().and_then(malt_common::time::from_secs);
            let name = entry
                .path()
                .map_err(|e| EnzymeError::Open(e.to_string()))?
                .to_string_lossy()
                .into_owned();
            infos.push(Info {
                name,
                size: entry.size(),
                date,
            });
        }

        Ok(infos)
    }
}

impl Default for TarEnzyme {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}

impl Enzyme for TarEnzyme {
    fn extension(&self) -> &'static str {
        "tar"
    }

    fn convert(&self, content: &[u8]) -> Result<Vec<Member>, EnzymeError> {
        // Tar is sequential: one pass over the headers, a second for the data
        let infos = Self::infos(content)?;
        check_infos(&infos, self.max_size)?;

        let mut archive = tar::Archive::new(Self::reader(content));
        let entries = archive
            .entries()
            .map_err(|e| EnzymeError::Open(e.to_string()))?;

        let mut infos = infos.into_iter();
        let mut members = Vec::new();
        for entry in entries {
            let mut entry = entry.map_err(|e| EnzymeError::Open(e.to_string()))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let info = match infos.next() {
                Some(info) => info,
                None => break,
            };
            let mut buffer = Vec::with_capacity(info.size as usize);
            entry
                .read_to_end(&mut buffer)
                .map_err(|_| EnzymeError::Read(info.name.clone()))?;
            members.push(Member::new(info.date, info.name, buffer));
        }

        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(size: u64) -> Info {
        Info {
            name: "a".to_string(),
            size,
            date: None,
        }
    }

    #[test]
    fn test_check_infos_empty() {
        assert_eq!(check_infos(&[], 10), Err(EnzymeError::Empty));
    }

    #[test]
    fn test_check_infos_at_cap() {
        assert!(check_infos(&[info(4), info(6)], 10).is_ok());
    }

    #[test]
    fn test_check_infos_over_cap() {
        assert_eq!(
            check_infos(&[info(4), info(7)], 10),
            Err(EnzymeError::TooLarge(10))
        );
    }

    #[test]
    fn test_check_infos_saturates() {
        assert!(check_infos(&[info(u64::MAX), info(u64::MAX)], u64::MAX - 1).is_err());
    }

    #[test]
    fn test_default_priority_order() {
        let extensions: Vec<_> = default_enzymes(DEFAULT_MAX_SIZE)
            .iter()
            .map(|enzyme| enzyme.extension())
            .collect();
        assert_eq!(extensions, ["zip", "tar"]);
    }

    #[test]
    fn test_zip_rejects_text() {
        let result = ZipEnzyme::default().convert(b"type: node\n...\n");
        assert!(matches!(result, Err(EnzymeError::Open(_))));
    }

    #[test]
    fn test_tar_rejects_empty_content() {
        assert!(TarEnzyme::default().convert(b"").is_err());
    }
}
