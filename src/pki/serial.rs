use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SerialError {
    #[error("serial number is empty")]
    Empty,
    #[error("invalid serial number {0:?}: {1}")]
    InvalidHex(String, hex::FromHexError),
}

/// Canonical certificate serial number.
///
/// Rendered as lowercase, colon-separated hex of the minimal big-endian
/// encoding of the serial integer (`1f:2a:03`). Storage keys use the
/// hyphenated variant (`1f-2a-03`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerialNumber(String);

impl SerialNumber {
    /// Builds a serial from the big-endian bytes of the serial integer.
    ///
    /// Leading zero bytes are dropped; a zero serial renders as `00`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let start = bytes
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(bytes.len().saturating_sub(1));
        let significant = if bytes.is_empty() { &[0u8][..] } else { &bytes[start..] };

        let formatted = significant
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":");
        Self(formatted)
    }

    /// Parses a serial given in colon or hyphen form, in any letter case.
    pub fn parse(value: &str) -> Result<Self, SerialError> {
        let compact: String = value
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        if compact.is_empty() {
            return Err(SerialError::Empty);
        }
        let padded = if compact.len() % 2 == 1 {
            format!("0{compact}")
        } else {
            compact
        };
        let bytes =
            hex::decode(&padded).map_err(|e| SerialError::InvalidHex(value.to_string(), e))?;
        Ok(Self::from_bytes(&bytes))
    }

    /// The colon-separated form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hyphenated form used in storage paths.
    pub fn storage_key(&self) -> String {
        self.0.replace(':', "-")
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SerialNumber {
    type Error = SerialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SerialNumber> for String {
    fn from(value: SerialNumber) -> Self {
        value.0
    }
}
