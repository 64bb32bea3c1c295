//! Construction of packed alignment records.
//!
//! [`AlignmentRecordBuilder`] writes the 32-byte fixed header, the
//! NUL-terminated read name, CIGAR words, packed sequence, quality region,
//! and registry-encoded tags into a single exactly-sized buffer. Defaults
//! describe an unplaced record: both coordinates -1, mapping quality 0, no
//! CIGAR, quality absent, no tags.

use crate::cigar::encode_cigar_into;
use crate::errors::{Error, Result};
use crate::registry::encode_tag;
use crate::sequence::{encode_quality_into, pack_sequence_into};
use crate::tags::TagValue;

/// Builder for a packed alignment record.
pub struct AlignmentRecordBuilder<'a> {
    name: &'a str,
    seq: &'a str,
    flag: u16,
    reference_id: i32,
    position: Option<i32>,
    mate_reference_id: i32,
    mate_position: Option<i32>,
    mapping_quality: u8,
    bin: u16,
    insert_length: i32,
    cigar: Vec<(u8, u32)>,
    quality: Option<&'a str>,
    tags: Vec<([u8; 2], TagValue)>,
}

impl<'a> AlignmentRecordBuilder<'a> {
    /// Start a record from its read name, sequence, and flag word.
    #[must_use]
    pub fn new(name: &'a str, seq: &'a str, flag: u16) -> Self {
        Self {
            name,
            seq,
            flag,
            reference_id: -1,
            position: None,
            mate_reference_id: -1,
            mate_position: None,
            mapping_quality: 0,
            bin: 0,
            insert_length: 0,
            cigar: Vec::new(),
            quality: None,
            tags: Vec::new(),
        }
    }

    /// Set the reference id (default -1).
    #[must_use]
    pub fn reference_id(mut self, id: i32) -> Self {
        self.reference_id = id;
        self
    }

    /// Set the 0-based position (absent encodes as -1).
    #[must_use]
    pub fn position(mut self, pos: i32) -> Self {
        self.position = Some(pos);
        self
    }

    /// Set the mate reference id (default -1).
    #[must_use]
    pub fn mate_reference_id(mut self, id: i32) -> Self {
        self.mate_reference_id = id;
        self
    }

    /// Set the mate 0-based position (absent encodes as -1).
    #[must_use]
    pub fn mate_position(mut self, pos: i32) -> Self {
        self.mate_position = Some(pos);
        self
    }

    /// Set the mapping quality (default 0).
    #[must_use]
    pub fn mapping_quality(mut self, mapq: u8) -> Self {
        self.mapping_quality = mapq;
        self
    }

    /// Set the BAI-style bin (default 0).
    #[must_use]
    pub fn bin(mut self, bin: u16) -> Self {
        self.bin = bin;
        self
    }

    /// Set the template length (default 0).
    #[must_use]
    pub fn insert_length(mut self, tlen: i32) -> Self {
        self.insert_length = tlen;
        self
    }

    /// Set the CIGAR as `(symbol, length)` pairs (default empty).
    #[must_use]
    pub fn cigar(mut self, ops: &[(u8, u32)]) -> Self {
        self.cigar = ops.to_vec();
        self
    }

    /// Set the quality as a Phred+33 string (default absent).
    #[must_use]
    pub fn quality(mut self, quality: &'a str) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Append a registry-typed tag.
    #[must_use]
    pub fn tag(mut self, key: [u8; 2], value: TagValue) -> Self {
        self.tags.push((key, value));
        self
    }

    /// Serialize the record into an exactly-sized buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the quality length differs
    /// from the sequence length or the read name does not fit in a byte, and
    /// [`Error::UnknownTag`] for tags absent from the registry.
    pub fn build(&self) -> Result<Vec<u8>> {
        if let Some(quality) = self.quality {
            if quality.len() != self.seq.len() {
                return Err(Error::InvalidArgument {
                    reason: format!(
                        "quality length {} does not match sequence length {}",
                        quality.len(),
                        self.seq.len()
                    ),
                });
            }
        }
        if self.name.len() > 254 {
            return Err(Error::InvalidArgument {
                reason: format!("read name too long ({} bytes, max 254)", self.name.len()),
            });
        }

        let n_cigar_op = u16::try_from(self.cigar.len()).map_err(|_| Error::InvalidArgument {
            reason: format!("too many CIGAR operations ({})", self.cigar.len()),
        })?;
        let l_seq = i32::try_from(self.seq.len()).map_err(|_| Error::InvalidArgument {
            reason: format!("sequence too long ({} bases)", self.seq.len()),
        })?;

        // Tags encode first so the final buffer is sized exactly
        let mut tag_bytes = Vec::new();
        for (key, value) in &self.tags {
            encode_tag(&mut tag_bytes, key, value)?;
        }

        let l_read_name = self.name.len() + 1; // +1 for NUL
        let seq_len = self.seq.len();
        let total =
            32 + l_read_name + self.cigar.len() * 4 + seq_len.div_ceil(2) + seq_len + tag_bytes.len();
        let mut buf = Vec::with_capacity(total);

        // === Fixed 32-byte header ===
        buf.extend_from_slice(&self.reference_id.to_le_bytes());
        buf.extend_from_slice(&self.position.unwrap_or(-1).to_le_bytes());
        buf.push(l_read_name as u8);
        buf.push(self.mapping_quality);
        buf.extend_from_slice(&self.bin.to_le_bytes());
        buf.extend_from_slice(&n_cigar_op.to_le_bytes());
        buf.extend_from_slice(&self.flag.to_le_bytes());
        buf.extend_from_slice(&l_seq.to_le_bytes());
        buf.extend_from_slice(&self.mate_reference_id.to_le_bytes());
        buf.extend_from_slice(&self.mate_position.unwrap_or(-1).to_le_bytes());
        buf.extend_from_slice(&self.insert_length.to_le_bytes());

        // === Read name + NUL ===
        buf.extend_from_slice(self.name.as_bytes());
        buf.push(0);

        // === CIGAR, packed sequence, quality, tags ===
        encode_cigar_into(&mut buf, &self.cigar);
        pack_sequence_into(&mut buf, self.seq.as_bytes());
        encode_quality_into(&mut buf, self.quality, seq_len);
        buf.extend_from_slice(&tag_bytes);

        debug_assert_eq!(buf.len(), total);
        Ok(buf)
    }
}

/// Build a record with every option at its default.
///
/// # Errors
///
/// See [`AlignmentRecordBuilder::build`].
pub fn make_alignment_record(name: &str, seq: &str, flag: u16) -> Result<Vec<u8>> {
    AlignmentRecordBuilder::new(name, seq, flag).build()
}
