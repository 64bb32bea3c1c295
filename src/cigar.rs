//! CIGAR encode/decode over raw record bytes.
//!
//! Each CIGAR operation is a `u32` word: high 28 bits are the length, low 4
//! bits are the op code. Op codes: M=0, I=1, D=2, N=3, S=4, H=5, P=6, `=`=7,
//! X=8.

use crate::errors::{Error, Result};
use crate::fields::{cigar_offset, n_cigar_op};

/// Op-code to symbol table, padded for the 4-bit code space.
const CIGAR_SYMBOLS: [u8; 16] = *b"MIDNSHP=X???????";

/// Encode a single CIGAR op word from a symbol and a length.
///
/// # Panics
///
/// Panics on an unknown op symbol or a length that overflows 28 bits. Both
/// are programmer errors, not data errors.
#[inline]
#[must_use]
pub fn encode_op(symbol: u8, len: u32) -> u32 {
    let code = match symbol {
        b'M' => 0,
        b'I' => 1,
        b'D' => 2,
        b'N' => 3,
        b'S' => 4,
        b'H' => 5,
        b'P' => 6,
        b'=' => 7,
        b'X' => 8,
        other => panic!("unknown CIGAR op symbol '{}'", other as char),
    };
    assert!(len < (1 << 28), "CIGAR op length {len} overflows 28 bits");
    (len << 4) | code
}

/// Split a CIGAR op word into `(symbol, length)`.
#[inline]
#[must_use]
pub fn decode_op(word: u32) -> (u8, u32) {
    (CIGAR_SYMBOLS[(word & 0xF) as usize], word >> 4)
}

/// Extract the raw `u32` CIGAR op words from a record.
///
/// Reads bytewise: the CIGAR region offset (`32 + l_read_name`) is not
/// guaranteed to be 4-byte aligned. Returns an empty vector for records
/// whose CIGAR region is truncated.
#[must_use]
pub fn cigar_ops_raw(record: &[u8]) -> Vec<u32> {
    let n_ops = n_cigar_op(record) as usize;
    if n_ops == 0 {
        return Vec::new();
    }
    let start = cigar_offset(record);
    let end = start + n_ops * 4;
    if end > record.len() {
        return Vec::new();
    }
    record[start..end]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Decode the CIGAR region of a record into `(symbol, length)` pairs.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] when an op word carries an undefined
/// op code.
pub fn decode_cigar(record: &[u8]) -> Result<Vec<(u8, u32)>> {
    cigar_ops_raw(record)
        .into_iter()
        .map(|word| {
            let (symbol, len) = decode_op(word);
            if symbol == b'?' {
                return Err(Error::MalformedRecord {
                    reason: format!("undefined CIGAR op code {}", word & 0xF),
                });
            }
            Ok((symbol, len))
        })
        .collect()
}

/// Append `(symbol, length)` pairs to `dst` as little-endian op words.
pub fn encode_cigar_into(dst: &mut Vec<u8>, ops: &[(u8, u32)]) {
    for &(symbol, len) in ops {
        dst.extend_from_slice(&encode_op(symbol, len).to_le_bytes());
    }
}

/// Number of read bases the alignment covers: sum of M/I/S/=/X op lengths.
#[must_use]
pub fn alignment_read_length(record: &[u8]) -> u32 {
    let mut total = 0u32;
    for word in cigar_ops_raw(record) {
        if matches!(word & 0xF, 0 | 1 | 4 | 7 | 8) {
            total += word >> 4;
        }
    }
    total
}

/// Number of reference bases the alignment spans: sum of M/D/N/=/X op lengths.
#[must_use]
pub fn alignment_reference_length(record: &[u8]) -> u32 {
    let mut total = 0u32;
    for word in cigar_ops_raw(record) {
        if matches!(word & 0xF, 0 | 2 | 3 | 7 | 8) {
            total += word >> 4;
        }
    }
    total
}
