//! Line terminators appended by line-oriented writes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Terminator sequence appended by [`Framer::print_line`](crate::Framer::print_line).
///
/// Reads never consult this; the read terminator is always explicit per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `"\r\n"`
    CrLf,
    /// `"\n"`, the default and what most sketches expect.
    #[default]
    Lf,
    /// `"\r"`
    Cr,
    /// `"\n\r"`
    LfCr,
}

impl LineEnding {
    /// The literal terminator.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CrLf => "\r\n",
            Self::Lf => "\n",
            Self::Cr => "\r",
            Self::LfCr => "\n\r",
        }
    }

    pub const fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a line ending name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown line ending '{0}' (expected crlf, lf, cr or lfcr)")]
pub struct ParseLineEndingError(String);

impl FromStr for LineEnding {
    type Err = ParseLineEndingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crlf" | "rn" | "\\r\\n" | "\r\n" => Ok(Self::CrLf),
            "lf" | "n" | "\\n" | "\n" => Ok(Self::Lf),
            "cr" | "r" | "\\r" | "\r" => Ok(Self::Cr),
            "lfcr" | "nr" | "\\n\\r" | "\n\r" => Ok(Self::LfCr),
            _ => Err(ParseLineEndingError(s.to_string())),
        }
    }
}
