use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CorpusError;

/// Closed set of classification labels.
///
/// The numeric codes match the datasets the corpus is built from
/// (`0 = legal/benign`, `1 = illegal/malicious`). Anything else is rejected at
/// ingestion time rather than silently mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "LabelRepr", into = "u8")]
pub enum Label {
    /// Benign input (legal SQL, harmless markup).
    Legal,
    /// Malicious input (injection, XSS payload).
    Illegal,
}

impl Label {
    /// Every known label, ordered by numeric code.
    pub const ALL: [Label; 2] = [Label::Legal, Label::Illegal];

    /// Numeric code used in datasets and persisted snapshots.
    pub const fn code(self) -> u8 {
        match self {
            Label::Legal => 0,
            Label::Illegal => 1,
        }
    }

    /// Inverse of [`Label::code`].
    pub fn from_code(code: u8) -> Result<Self, CorpusError> {
        match code {
            0 => Ok(Label::Legal),
            1 => Ok(Label::Illegal),
            other => Err(CorpusError::UnknownLabel(other.to_string())),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Label::Legal => "legal",
            Label::Illegal => "illegal",
        }
    }

    pub const fn is_malicious(self) -> bool {
        matches!(self, Label::Illegal)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "legal" | "benign" => Ok(Label::Legal),
            "1" | "illegal" | "malicious" => Ok(Label::Illegal),
            _ => Err(CorpusError::UnknownLabel(s.to_string())),
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label.code()
    }
}

impl TryFrom<u8> for Label {
    type Error = CorpusError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Label::from_code(code)
    }
}

/// Wire representation accepted for labels: an integer code or a name.
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelRepr {
    Code(i64),
    Name(String),
}

impl TryFrom<LabelRepr> for Label {
    type Error = CorpusError;

    fn try_from(repr: LabelRepr) -> Result<Self, Self::Error> {
        match repr {
            LabelRepr::Code(code) => u8::try_from(code)
                .map_err(|_| CorpusError::UnknownLabel(code.to_string()))
                .and_then(Label::from_code),
            LabelRepr::Name(name) => name.parse(),
        }
    }
}
