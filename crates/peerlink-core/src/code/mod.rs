//! Share code generation and validation.
//!
//! A share code is a plain decimal number that is also the TCP port on which
//! the shared file is offered. Codes are drawn from a configurable port range,
//! by default the IANA dynamic range `49152-65535`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use peerlink_core::code::{CodeGenerator, ShareCode};
//!
//! let generator = CodeGenerator::new(49152, 65535)?;
//! let code = generator.generate();
//! println!("Generated code: {}", code);
//!
//! let code = ShareCode::parse("51234")?;
//! assert_eq!(code.port(), 51234);
//! ```

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A validated share code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareCode(u16);

impl ShareCode {
    /// Wrap a port number as a share code.
    ///
    /// # Errors
    ///
    /// Returns an error for port 0, which cannot be dialled.
    pub fn new(port: u16) -> Result<Self> {
        if port == 0 {
            return Err(Error::InvalidCodeFormat("code must not be 0".to_string()));
        }
        Ok(Self(port))
    }

    /// Parse and validate a share code from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a decimal number in `1..=65535`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();

        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidCodeFormat(format!(
                "'{trimmed}' is not a decimal number"
            )));
        }

        let port: u16 = trimmed
            .parse()
            .map_err(|_| Error::InvalidCodeFormat(format!("'{trimmed}' is out of range")))?;

        Self::new(port)
    }

    /// Returns the TCP port this code is served on.
    #[must_use]
    pub const fn port(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generator for share codes within an inclusive port range.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    start: u16,
    end: u16,
}

impl CodeGenerator {
    /// Create a generator for codes in `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is empty or includes port 0.
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if start == 0 || start > end {
            return Err(Error::InvalidConfig {
                key: "share.code_range".to_string(),
                reason: format!("{start}-{end} is not a usable port range"),
            });
        }
        Ok(Self { start, end })
    }

    /// First code of the range.
    #[must_use]
    pub const fn start(&self) -> u16 {
        self.start
    }

    /// Last code of the range.
    #[must_use]
    pub const fn end(&self) -> u16 {
        self.end
    }

    /// Number of codes the range can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    /// Whether the code lies within this generator's range.
    #[must_use]
    pub fn contains(&self, code: ShareCode) -> bool {
        (self.start..=self.end).contains(&code.port())
    }

    /// Draw a random candidate code.
    #[must_use]
    pub fn generate(&self) -> ShareCode {
        let port = rand::thread_rng().gen_range(self.start..=self.end);
        ShareCode(port)
    }

    /// Iterate every code of the range, starting at `from` and wrapping
    /// around once.
    pub fn scan_from(&self, from: ShareCode) -> impl Iterator<Item = ShareCode> + '_ {
        let offset = usize::from(from.port().saturating_sub(self.start));
        (0..self.capacity()).map(move |i| {
            let idx = (offset + i) % self.capacity();
            // idx < capacity, so start + idx <= end
            #[allow(clippy::cast_possible_truncation)]
            let port = self.start + idx as u16;
            ShareCode(port)
        })
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self {
            start: crate::DEFAULT_CODE_RANGE_START,
            end: crate::DEFAULT_CODE_RANGE_END,
        }
    }
}
