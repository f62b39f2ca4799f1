//! Records: the unit of data flowing between pipeline stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One line of data, optionally pre-split into fields.
///
/// Records are immutable once produced. Sending a record through a link
/// moves it; the producer keeps no reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<String>>,
}

impl Record {
    /// Create a record from a raw line.
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            fields: None,
        }
    }

    /// Create a record with an explicit field list.
    pub fn with_fields(line: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            line: line.into(),
            fields: Some(fields),
        }
    }

    /// Split the line into fields on `separator`.
    ///
    /// A whitespace-only separator splits on runs of whitespace and drops
    /// empty fields, so `"a   b"` with `" "` yields `["a", "b"]`.
    pub fn split(self, separator: &str) -> Self {
        let fields = if separator.trim().is_empty() {
            self.line.split_whitespace().map(str::to_string).collect()
        } else {
            self.line.split(separator).map(str::to_string).collect()
        };
        Self {
            line: self.line,
            fields: Some(fields),
        }
    }

    /// The raw payload.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Pre-split fields, if the record was split.
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    /// Field by zero-based index. An unsplit record has a single field 0.
    pub fn field(&self, index: usize) -> Option<&str> {
        match &self.fields {
            Some(fields) => fields.get(index).map(String::as_str),
            None if index == 0 => Some(&self.line),
            None => None,
        }
    }

    /// Consume the record, returning the raw line.
    pub fn into_line(self) -> String {
        self.line
    }
}

impl From<&str> for Record {
    fn from(line: &str) -> Self {
        Self::new(line)
    }
}

impl From<String> for Record {
    fn from(line: String) -> Self {
        Self::new(line)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}
