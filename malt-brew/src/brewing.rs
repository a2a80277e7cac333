//! Shared brewing types
//!
//! The diagnostic history threaded through one ingestion call, the terminal
//! [`BrewError`], raw archive members and typed metadata values.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Cleaned metadata, keyed by field name
pub type Meta = BTreeMap<String, MetaValue>;

/// Terminal failure of one ingestion call
///
/// Carries every history entry recorded before the failure plus the message
/// explaining it. Never retried.
#[derive(Debug, Clone, Error, Serialize, PartialEq)]
#[error("{message}")]
pub struct BrewError {
    pub history: Vec<String>,
    pub message: String,
}

/// Ordered, append-only record of every decision taken during one call
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry (also emitted as a debug event)
    pub fn push(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        tracing::debug!(target: "malt_brew::history", "{}", entry);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the terminal error for this call
    pub fn error(&self, message: impl Into<String>) -> BrewError {
        BrewError {
            history: self.entries.clone(),
            message: message.into(),
        }
    }
}

/// One file extracted from an archive, or the upload itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Logical timestamp, when the container records one
    pub date: Option<DateTime<Utc>>,
    pub name: String,
    pub content: Vec<u8>,
}

impl Member {
    pub fn new(date: Option<DateTime<Utc>>, name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            date,
            name: name.into(),
            content,
        }
    }
}

/// Schema violation found while cleaning metadata
#[derive(Debug, Clone, Error, PartialEq)]
pub enum YeastError {
    #[error("expected {0}")]
    Missing(String),

    #[error("{key} must be {expected}")]
    WrongType { key: String, expected: FieldType },

    #[error("unexpected key {0}")]
    Unexpected(String),

    #[error("{0}")]
    Invalid(String),
}

/// Declared type of a metadata field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
    /// ISO 8601 calendar date, `YYYY-MM-DD`
    Date,
    Seq,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Str => "str",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Date => "date",
            FieldType::Seq => "list",
        };
        f.write_str(name)
    }
}

impl FieldType {
    /// Type-check a raw preamble value
    pub fn check(self, key: &str, value: &Value) -> Result<MetaValue, YeastError> {
        let wrong = || YeastError::WrongType {
            key: key.to_string(),
            expected: self,
        };

        match (self, value) {
            (FieldType::Str, Value::String(s)) => Ok(MetaValue::Str(s.clone())),
            (FieldType::Int, Value::Number(n)) => n.as_i64().map(MetaValue::Int).ok_or_else(wrong),
            (FieldType::Float, Value::Number(n)) => {
                n.as_f64().map(MetaValue::Float).ok_or_else(wrong)
            }
            (FieldType::Bool, Value::Bool(b)) => Ok(MetaValue::Bool(*b)),
            (FieldType::Date, Value::String(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(MetaValue::Date)
                .map_err(|_| wrong()),
            (FieldType::Seq, Value::Sequence(items)) => Ok(MetaValue::Seq(items.clone())),
            _ => Err(wrong()),
        }
    }
}

/// A cleaned, type-checked metadata value
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Seq(Vec<Value>),
}

impl MetaValue {
    /// Infer the type of an undeclared value
    ///
    /// Used by handlers that accept their preamble as-is.
    pub fn infer(key: &str, value: &Value) -> Result<Self, YeastError> {
        match value {
            Value::String(s) => Ok(MetaValue::Str(s.clone())),
            Value::Bool(b) => Ok(MetaValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(MetaValue::Int(i)),
                None => n
                    .as_f64()
                    .map(MetaValue::Float)
                    .ok_or_else(|| YeastError::Invalid(format!("{} is not a number", key))),
            },
            Value::Sequence(items) => Ok(MetaValue::Seq(items.clone())),
            _ => Err(YeastError::Invalid(format!("{} has an unsupported value", key))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            MetaValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Str(s) => f.write_str(s),
            MetaValue::Int(i) => write!(f, "{}", i),
            MetaValue::Float(x) => write!(f, "{}", x),
            MetaValue::Bool(b) => write!(f, "{}", b),
            MetaValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            MetaValue::Seq(items) => {
                let rendered: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => serde_yaml::to_string(other)
                            .map(|s| s.trim_end().to_string())
                            .unwrap_or_default(),
                    })
                    .collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}
