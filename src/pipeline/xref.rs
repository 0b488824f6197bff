//! Trailer repair: make `startxref` point at a real cross-reference section.
//!
//! A PDF carved out of a dump often keeps its objects intact but carries a
//! `startxref` offset that is wrong: the dump lost or gained bytes before the
//! header, or the file was concatenated from pieces. Readers then fail to
//! open it even though the xref table is right there.
//!
//! ```text
//! Locate ──▶ Parse offset ──▶ Validate ──▶ Valid
//!   │             │               │
//!   ▼             ▼               ▼
//! Unrepairable  Unrepairable    Repair ──▶ Repaired
//!                                 │
//!                                 ▼
//!                            Unrepairable
//! ```
//!
//! Only the trailer is rewritten. The entries of the table itself are
//! neither checked nor rebuilt.

use crate::config::RecoveryConfig;
use crate::pipeline::scan::{find_from, rfind};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

const STARTXREF: &[u8] = b"startxref";
const XREF: &[u8] = b"xref";
const ENDOBJ: &[u8] = b"endobj";

static RE_OBJ_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)[0-9]+[ \t\r\n\x0C\x00]+[0-9]+[ \t\r\n\x0C\x00]+obj").unwrap());

static RE_XREF_STREAM_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)/Type[ \t\r\n\x0C\x00]*/XRef").unwrap());

/// Kind of cross-reference section a `startxref` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XrefTarget {
    /// Classic `xref` table.
    Table,
    /// Cross-reference stream object (`/Type /XRef`).
    Stream,
}

/// Why the trailer could not be repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnrepairableReason {
    NoStartxref,
    IllegibleOffset,
    NoXrefCandidate,
    /// Repair switched off in the configuration.
    Disabled,
}

impl fmt::Display for UnrepairableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnrepairableReason::NoStartxref => "no startxref",
            UnrepairableReason::IllegibleOffset => "illegible offset",
            UnrepairableReason::NoXrefCandidate => "no xref candidate found",
            UnrepairableReason::Disabled => "repair disabled",
        })
    }
}

/// Result of validating a trailer without changing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefCheck {
    /// `startxref` resolves to a cross-reference section.
    Valid { offset: usize, target: XrefTarget },
    /// `startxref` is legible but points at nothing useful.
    Broken {
        /// Position of the `startxref` keyword.
        keyword_at: usize,
        declared: u64,
    },
    /// The trailer is too damaged to even validate.
    Unrepairable { reason: UnrepairableReason },
}

/// Final outcome for one PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum XrefStatus {
    Valid {
        offset: usize,
        target: XrefTarget,
    },
    Repaired {
        declared: u64,
        offset: usize,
        target: XrefTarget,
    },
    Unrepairable {
        reason: UnrepairableReason,
    },
}

/// Outcome plus the rewritten PDF when a repair happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrefRepair {
    pub status: XrefStatus,
    pub repaired: Option<Vec<u8>>,
}

/// Validates and patches `startxref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrefRepairer {
    /// Bytes scanned after the declared offset for an xref stream object.
    pub window: usize,
    /// Bytes scanned before a `/Type /XRef` tag for its `obj` header.
    pub backtrack: usize,
}

impl Default for XrefRepairer {
    fn default() -> Self {
        Self {
            window: 2048,
            backtrack: 200,
        }
    }
}

impl XrefRepairer {
    pub fn new(window: usize, backtrack: usize) -> Self {
        Self { window, backtrack }
    }

    /// The repairer configured in `config`, or `None` when repair is off.
    pub fn from_config(config: &RecoveryConfig) -> Option<Self> {
        config
            .xref_repair
            .then(|| Self::new(config.xref_window, config.xref_backtrack))
    }

    /// Locate, parse and validate the last `startxref`.
    pub fn check(&self, pdf: &[u8]) -> XrefCheck {
        let Some(keyword_at) = rfind(pdf, STARTXREF) else {
            return XrefCheck::Unrepairable {
                reason: UnrepairableReason::NoStartxref,
            };
        };
        let Some(declared) = parse_offset(&pdf[keyword_at + STARTXREF.len()..]) else {
            return XrefCheck::Unrepairable {
                reason: UnrepairableReason::IllegibleOffset,
            };
        };

        let broken = XrefCheck::Broken {
            keyword_at,
            declared,
        };
        let Some(offset) = usize::try_from(declared).ok().filter(|&o| o < pdf.len()) else {
            debug!("startxref {} is past end of {}-byte PDF", declared, pdf.len());
            return broken;
        };

        if is_table_keyword(pdf, offset) {
            return XrefCheck::Valid {
                offset,
                target: XrefTarget::Table,
            };
        }
        if self.xref_stream_near(pdf, offset) {
            return XrefCheck::Valid {
                offset,
                target: XrefTarget::Stream,
            };
        }
        debug!("startxref {} does not lead to an xref section", declared);
        broken
    }

    /// Validate, and rewrite the trailer if `startxref` is wrong.
    pub fn repair(&self, pdf: &[u8]) -> XrefRepair {
        let (keyword_at, declared) = match self.check(pdf) {
            XrefCheck::Valid { offset, target } => {
                debug!("startxref {} is valid ({:?})", offset, target);
                return XrefRepair {
                    status: XrefStatus::Valid { offset, target },
                    repaired: None,
                };
            }
            XrefCheck::Unrepairable { reason } => {
                warn!("Trailer unrepairable: {}", reason);
                return XrefRepair {
                    status: XrefStatus::Unrepairable { reason },
                    repaired: None,
                };
            }
            XrefCheck::Broken {
                keyword_at,
                declared,
            } => (keyword_at, declared),
        };

        // Candidates must precede the trailer being replaced.
        let head = &pdf[..keyword_at];
        let candidate = last_xref_table(head)
            .map(|o| (o, XrefTarget::Table))
            .or_else(|| {
                self.last_xref_stream(head)
                    .map(|o| (o, XrefTarget::Stream))
            });

        let Some((offset, target)) = candidate else {
            warn!("startxref {} is wrong and no xref candidate was found", declared);
            return XrefRepair {
                status: XrefStatus::Unrepairable {
                    reason: UnrepairableReason::NoXrefCandidate,
                },
                repaired: None,
            };
        };

        let mut repaired = Vec::with_capacity(keyword_at + 32);
        repaired.extend_from_slice(head);
        repaired.extend_from_slice(format!("startxref\n{}\n%%EOF\n", offset).as_bytes());
        info!(
            "Repaired startxref: {} → {} ({:?})",
            declared, offset, target
        );
        XrefRepair {
            status: XrefStatus::Repaired {
                declared,
                offset,
                target,
            },
            repaired: Some(repaired),
        }
    }

    /// Whether an object header within `window` bytes of `offset` has an
    /// xref-stream dictionary.
    fn xref_stream_near(&self, pdf: &[u8], offset: usize) -> bool {
        let window_end = pdf.len().min(offset.saturating_add(self.window));
        RE_OBJ_HEADER
            .find_iter(&pdf[offset..window_end])
            .any(|m| {
                let body_start = offset + m.end();
                let body_limit = pdf.len().min(body_start.saturating_add(self.window));
                let body = &pdf[body_start..body_limit];
                let body = match find_from(body, ENDOBJ, 0) {
                    Some(end) => &body[..end],
                    None => body,
                };
                contains(body, b"/Type") && contains(body, b"/XRef")
            })
    }

    /// Offset of the `obj` header enclosing the last `/Type /XRef` tag.
    fn last_xref_stream(&self, pdf: &[u8]) -> Option<usize> {
        let tag = RE_XREF_STREAM_TAG.find_iter(pdf).last()?.start();
        let from = tag.saturating_sub(self.backtrack);
        let header = RE_OBJ_HEADER.find_iter(&pdf[from..tag]).last()?;
        let mut start = from + header.start();
        while start > 0 && pdf[start - 1].is_ascii_digit() {
            start -= 1;
        }
        Some(start)
    }
}

/// Integer after `startxref`, skipping leading whitespace.
///
/// A digit run too long for `u64` saturates, so it reads as past EOF.
fn parse_offset(after_keyword: &[u8]) -> Option<u64> {
    let digits: &[u8] = {
        let rest = after_keyword
            .iter()
            .position(|b| !b.is_ascii_whitespace() && *b != 0)
            .map(|p| &after_keyword[p..])?;
        let len = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        &rest[..len]
    };
    if digits.is_empty() {
        return None;
    }
    Some(std::str::from_utf8(digits).ok()?.parse().unwrap_or(u64::MAX))
}

/// Whether an `xref` keyword starts at `at` and is not the tail of `startxref`.
fn is_table_keyword(pdf: &[u8], at: usize) -> bool {
    pdf[at..].starts_with(XREF) && !(at >= 5 && &pdf[at - 5..at] == b"start")
}

/// Offset of the last `xref` table keyword.
fn last_xref_table(pdf: &[u8]) -> Option<usize> {
    (0..pdf.len()).rev().find(|&i| is_table_keyword(pdf, i))
}

fn contains(hay: &[u8], needle: &[u8]) -> bool {
    find_from(hay, needle, 0).is_some()
}
