//! Error types for BAM codec and sort operations.

use bstr::BString;
use thiserror::Error;

/// Result type alias for bamsort operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bamsort operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Inconsistent inputs at record construction.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Explanation of the inconsistency
        reason: String,
    },

    /// Attempt to encode or describe a tag absent from the registry.
    #[error("unknown tag '{}'", tag_label(.tag))]
    UnknownTag {
        /// The two-letter tag key
        tag: [u8; 2],
    },

    /// Flag validity rule violated.
    #[error(
        "malformed flag 0x{flag:04x} for read '{read_name}' (ref {reference_id}, pos {position}): {reason}"
    )]
    MalformedField {
        /// The offending flag word
        flag: u16,
        /// Read name, when a record is available
        read_name: BString,
        /// 0-based position, -1 if unmapped
        position: i32,
        /// Reference id, -1 if unmapped
        reference_id: i32,
        /// Which sub-rule failed
        reason: String,
    },

    /// A record frame reports a bad length or a truncated payload.
    #[error("malformed record: {reason}")]
    MalformedRecord {
        /// Explanation of the framing problem
        reason: String,
    },

    /// Underlying BGZF read/write/seek/close failure.
    #[error("bgzf i/o error: {0}")]
    Io(#[from] std::io::Error),
}

fn tag_label(tag: &[u8; 2]) -> String {
    format!("{}{}", tag[0] as char, tag[1] as char)
}
