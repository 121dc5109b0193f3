//! Frame identities and stall trace records.
//!
//! A frame is an opaque token: either a bare hexadecimal return address or
//! a `(module, address)` pair when the backtrace spans several binaries.
//! Two frames are the same node in the call graph iff their tokens are equal.

use crate::utils::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One stack entry of a stall backtrace
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Frame {
    /// Binary the address belongs to, when the backtrace names one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Return address as written in the log (e.g. `0x4a3b2c`)
    pub address: String,
}

impl Frame {
    /// Bare address frame, resolved against the main executable
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            module: None,
            address: address.into(),
        }
    }

    /// Module-qualified frame
    pub fn in_module(module: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            address: address.into(),
        }
    }

    /// The empty token carried by the graph's head and tail sentinels
    pub fn sentinel() -> Self {
        Self::default()
    }

    pub fn is_sentinel(&self) -> bool {
        self.module.is_none() && self.address.is_empty()
    }

    /// Numeric value of a bare address.
    ///
    /// Module-qualified frames hold module-relative offsets, which are not
    /// comparable with absolute addresses, so they yield `None`.
    pub fn absolute_address(&self) -> Option<u64> {
        if self.module.is_some() {
            return None;
        }
        parse_hex(&self.address)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "{}+{}", module, self.address),
            None => f.write_str(&self.address),
        }
    }
}

impl FromStr for Frame {
    type Err = ParseError;

    /// Parse `0x<hex>` or `<path>+0x<hex>`
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidAddress(token.to_string());

        match token.rsplit_once('+') {
            Some((module, address)) => {
                if module.is_empty() || parse_hex(address).is_none() {
                    return Err(invalid());
                }
                Ok(Frame::in_module(module, address))
            }
            None => {
                parse_hex(token).ok_or_else(invalid)?;
                Ok(Frame::new(token))
            }
        }
    }
}

/// Parse a `0x`-prefixed hexadecimal value
fn parse_hex(text: &str) -> Option<u64> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// One captured stall: a duration and its backtrace, innermost frame first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StallTrace {
    /// Stall duration in milliseconds
    pub duration: i64,

    /// Frames ordered innermost (the stalling site) to outermost
    pub frames: Vec<Frame>,
}

impl StallTrace {
    pub fn new(duration: i64, frames: Vec<Frame>) -> Self {
        Self { duration, frames }
    }
}
