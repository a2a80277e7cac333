//! Front matter detection
//!
//! A content unit is UTF-8 text with a YAML preamble, a line whose trimmed
//! content is exactly `...`, and a body. The [`Grower`] decides whether a
//! member is a content unit; every outcome is recorded in the history and a
//! negative outcome simply makes the member an attachment.

use crate::brewing::{History, Meta};
use crate::yeast::{Culture, Yeasts};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Line separating preamble from body
pub const SEPARATOR: &str = "...";

/// Text cut at its first separator line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// 1-based line number of the separator
    pub line: usize,
    /// Lines strictly above the separator
    pub preamble: String,
    /// Lines strictly below the separator
    pub body: String,
}

/// Cut `text` at the first separator line
///
/// Lines are split on `\n` with a trailing `\r` dropped, so the parts come
/// back with `\n` endings only. Later separator lines stay in the body.
pub fn split(text: &str) -> Option<Split> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let index = lines.iter().position(|line| line.trim() == SEPARATOR)?;

    Some(Split {
        line: index + 1,
        preamble: lines[..index].join("\n"),
        body: lines[index + 1..].join("\n"),
    })
}

/// Preamble that cannot be used as metadata
#[derive(Debug, Error)]
pub enum PreambleError {
    #[error("{0}")]
    Invalid(#[from] serde_yaml::Error),

    #[error("not a dictionary")]
    NotMapping,
}

/// Parse a preamble into a mapping
///
/// An empty preamble (or one holding only comments) is an empty mapping.
pub fn parse_preamble(preamble: &str) -> Result<Mapping, PreambleError> {
    match serde_yaml::from_str::<Value>(preamble)? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(PreambleError::NotMapping),
    }
}

/// A member recognized as a content unit
pub struct Grown<'a> {
    pub culture: &'a dyn Culture,
    pub meta: Meta,
    pub body: String,
}

/// Recognizes content units against a handler registry
pub struct Grower<'a> {
    yeasts: &'a Yeasts,
}

impl<'a> Grower<'a> {
    pub fn new(yeasts: &'a Yeasts) -> Self {
        Self { yeasts }
    }

    /// Try to read `content` as a content unit
    pub fn grow(&self, content: &[u8], history: &mut History) -> Option<Grown<'a>> {
        let text = match std::str::from_utf8(content) {
            Ok(text) => text,
            Err(_) => {
                history.push("File seems to be binary.");
                return None;
            }
        };
        history.push("File does not seem to be binary.");

        let split = match split(text) {
            Some(split) => split,
            None => {
                history.push("Separator not found.");
                return None;
            }
        };
        history.push(format!("Separator found in line {}.", split.line));

        let mut mapping = match parse_preamble(&split.preamble) {
            Ok(mapping) => mapping,
            Err(PreambleError::NotMapping) => {
                history.push("Preamble is valid YAML.");
                history.push("Preamble is not a dictionary.");
                return None;
            }
            Err(error) => {
                history.push(format!("Preamble is not valid YAML: {}", error));
                return None;
            }
        };
        history.push("Preamble is valid YAML.");
        history.push("Preamble is a dictionary.");

        let type_name = match mapping.remove("type") {
            Some(Value::String(type_name)) => type_name,
            Some(_) => {
                history.push("Preamble type is not a string.");
                return None;
            }
            None => {
                history.push("Preamble does not have a type.");
                return None;
            }
        };
        history.push("Preamble has a type.");

        let culture = match self.yeasts.get(&type_name) {
            Some(culture) => culture,
            None => {
                history.push(format!("Preamble type {} does not exist.", type_name));
                return None;
            }
        };
        history.push(format!("Preamble type {} exists.", type_name));

        let meta = match culture.clean(&mapping) {
            Ok(meta) => meta,
            Err(error) => {
                history.push(format!(
                    "Preamble does not describe a valid {}: {}",
                    type_name, error
                ));
                return None;
            }
        };
        history.push(format!("Preamble describes a valid {}.", type_name));

        Some(Grown {
            culture,
            meta,
            body: split.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic() {
        let split = split("type: pass\n...\nBODY").unwrap();
        assert_eq!(split.line, 2);
        assert_eq!(split.preamble, "type: pass");
        assert_eq!(split.body, "BODY");
    }

    #[test]
    fn test_split_keeps_trailing_newline() {
        let split = split("type: pass\n...\nc\n").unwrap();
        assert_eq!(split.body, "c\n");
    }

    #[test]
    fn test_split_first_separator_wins() {
        let split = split("type: pass\n...\n...\nc\n...\n").unwrap();
        assert_eq!(split.line, 2);
        assert_eq!(split.body, "...\nc\n...\n");
    }

    #[test]
    fn test_split_trims_whitespace() {
        let split = split("a: 1\n  ...\t\nb").unwrap();
        assert_eq!(split.line, 2);
        assert_eq!(split.body, "b");
    }

    #[test]
    fn test_split_normalizes_crlf() {
        let split = split("a: 1\r\n...\r\nb\r\nc").unwrap();
        assert_eq!(split.preamble, "a: 1");
        assert_eq!(split.body, "b\nc");
    }

    #[test]
    fn test_split_requires_exact_token() {
        assert!(split("a: 1\n....\nb").is_none());
        assert!(split("a: 1\n... x\nb").is_none());
        assert!(split("a: 1\n. . .\nb").is_none());
        assert!(split("a: 1\n---\nb").is_none());
    }

    #[test]
    fn test_split_on_first_line() {
        let split = split("...\nbody").unwrap();
        assert_eq!(split.line, 1);
        assert_eq!(split.preamble, "");
    }

    #[test]
    fn test_parse_empty_preamble() {
        assert!(parse_preamble("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_list_preamble() {
        assert!(matches!(
            parse_preamble("- a\n- b"),
            Err(PreambleError::NotMapping)
        ));
    }

    #[test]
    fn test_parse_invalid_preamble() {
        assert!(matches!(
            parse_preamble("a: [1, 2"),
            Err(PreambleError::Invalid(_))
        ));
    }
}
