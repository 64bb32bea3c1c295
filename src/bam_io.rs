//! BAM wire-level I/O: header meta, reference dictionary, record framing.
//!
//! The layout after BGZF inflation:
//!
//! ```text
//! magic      4 bytes  "BAM\x01"
//! l_text     u32      length of the SAM header text
//! text       l_text   SAM header text (opaque here)
//! n_ref      u32      number of reference sequences
//! per ref:
//!   l_name   u32      reference name length including NUL
//!   name     l_name   NUL-terminated reference name
//!   l_ref    i32      reference sequence length
//! records:
//!   block_size u32    record length
//!   record   block_size bytes
//! ```

use std::io::{Read, Write};

use bstr::{BStr, BString, ByteSlice};

use crate::bgzf::ByteStream;
use crate::errors::{Error, Result};
use crate::fields::MIN_RECORD_LEN;

/// BAM magic bytes.
pub const BAM_MAGIC: [u8; 4] = *b"BAM\x01";

/// SAM header text plus the reference dictionary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderMeta {
    /// Raw SAM header text.
    pub text: BString,
    /// Reference sequences in dictionary order; ids are contiguous from 0.
    pub references: Vec<(BString, i32)>,
}

impl HeaderMeta {
    /// Number of reference sequences.
    #[must_use]
    pub fn num_references(&self) -> usize {
        self.references.len()
    }
}

/// Read the BAM magic, header text, and reference dictionary.
///
/// Leaves the stream positioned at the first alignment record.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] on a bad magic or a truncated header,
/// and [`Error::Io`] on underlying read failures.
pub fn read_header_meta<R: Read>(stream: &mut ByteStream<R>) -> Result<HeaderMeta> {
    let mut magic = [0u8; 4];
    if stream.read_into(&mut magic)? != 4 || magic != BAM_MAGIC {
        return Err(Error::MalformedRecord {
            reason: format!("not a BAM stream: bad magic {magic:02x?}"),
        });
    }

    let l_text = read_u32(stream, "header text length")? as usize;
    let mut text = vec![0u8; l_text];
    if stream.read_into(&mut text)? != l_text {
        return Err(Error::MalformedRecord { reason: "truncated header text".to_string() });
    }

    let n_ref = read_u32(stream, "reference count")? as usize;
    let mut references = Vec::with_capacity(n_ref);
    for i in 0..n_ref {
        let l_name = read_u32(stream, "reference name length")? as usize;
        if l_name == 0 {
            return Err(Error::MalformedRecord {
                reason: format!("reference {i} has an empty name field"),
            });
        }
        let mut name = vec![0u8; l_name];
        if stream.read_into(&mut name)? != l_name {
            return Err(Error::MalformedRecord {
                reason: format!("truncated name for reference {i}"),
            });
        }
        name.pop(); // drop the NUL
        let l_ref = read_u32(stream, "reference length")?.cast_signed();
        references.push((BString::from(name), l_ref));
    }

    Ok(HeaderMeta { text: BString::from(text), references })
}

/// Write the BAM magic, header text, and reference dictionary.
///
/// # Errors
///
/// Returns [`Error::Io`] on underlying write failures and
/// [`Error::InvalidArgument`] when a length field overflows its width.
pub fn write_header_meta<W: Write>(writer: &mut W, meta: &HeaderMeta) -> Result<()> {
    writer.write_all(&BAM_MAGIC)?;
    writer.write_all(&checked_u32(meta.text.len(), "header text length")?.to_le_bytes())?;
    writer.write_all(&meta.text)?;
    writer.write_all(&checked_u32(meta.references.len(), "reference count")?.to_le_bytes())?;
    for (name, length) in &meta.references {
        writer.write_all(&checked_u32(name.len() + 1, "reference name length")?.to_le_bytes())?;
        writer.write_all(name)?;
        writer.write_all(&[0])?;
        writer.write_all(&length.to_le_bytes())?;
    }
    Ok(())
}

/// Read one length-framed alignment record.
///
/// Returns `None` on a clean end of stream at a frame boundary.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] when the frame length is negative as
/// an i32, shorter than the 32-byte fixed header, or the payload is
/// truncated.
pub fn read_alignment<R: Read>(stream: &mut ByteStream<R>) -> Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; 4];
    let n = stream.read_into(&mut prefix)?;
    if n == 0 {
        return Ok(None);
    }
    if n < 4 {
        return Err(Error::MalformedRecord { reason: "truncated record length".to_string() });
    }
    let block_size = u32::from_le_bytes(prefix);
    if block_size.cast_signed() < 0 {
        return Err(Error::MalformedRecord {
            reason: format!("negative record length {}", block_size.cast_signed()),
        });
    }
    let block_size = block_size as usize;
    if block_size < MIN_RECORD_LEN {
        return Err(Error::MalformedRecord {
            reason: format!("record length {block_size} below the fixed header size"),
        });
    }
    let mut record = vec![0u8; block_size];
    if stream.read_into(&mut record)? != block_size {
        return Err(Error::MalformedRecord { reason: "truncated record payload".to_string() });
    }
    Ok(Some(record))
}

/// Write one alignment record with its 4-byte little-endian length prefix.
///
/// # Errors
///
/// Returns [`Error::Io`] on write failures and [`Error::InvalidArgument`]
/// when the record length overflows the prefix.
pub fn write_alignment<W: Write>(writer: &mut W, record: &[u8]) -> Result<()> {
    writer.write_all(&checked_u32(record.len(), "record length")?.to_le_bytes())?;
    writer.write_all(record)?;
    Ok(())
}

/// Substitute the `SO:` field of the `@HD` line, adding an `@HD` line when
/// the header has none. Every other byte of the header passes through
/// unchanged.
#[must_use]
pub fn set_sort_order(text: &BStr, sort_order: &str) -> BString {
    let mut out = BString::from(Vec::with_capacity(text.len() + 16));
    let mut saw_hd = false;

    for (i, line) in text.split_str("\n").enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        if !saw_hd && line.starts_with(b"@HD") {
            saw_hd = true;
            let mut replaced = false;
            for (j, field) in line.split_str("\t").enumerate() {
                if j > 0 {
                    out.push(b'\t');
                }
                if field.starts_with(b"SO:") {
                    out.extend_from_slice(b"SO:");
                    out.extend_from_slice(sort_order.as_bytes());
                    replaced = true;
                } else {
                    out.extend_from_slice(field);
                }
            }
            if !replaced {
                out.extend_from_slice(b"\tSO:");
                out.extend_from_slice(sort_order.as_bytes());
            }
        } else {
            out.extend_from_slice(line);
        }
    }

    if !saw_hd {
        let mut with_hd = BString::from(format!("@HD\tVN:1.6\tSO:{sort_order}\n"));
        with_hd.extend_from_slice(&out);
        return with_hd;
    }
    out
}

fn read_u32<R: Read>(stream: &mut ByteStream<R>, what: &str) -> Result<u32> {
    let mut bytes = [0u8; 4];
    if stream.read_into(&mut bytes)? != 4 {
        return Err(Error::MalformedRecord { reason: format!("truncated {what}") });
    }
    Ok(u32::from_le_bytes(bytes))
}

fn checked_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::InvalidArgument { reason: format!("{what} {value} overflows u32") })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_meta() -> HeaderMeta {
        HeaderMeta {
            text: BString::from("@HD\tVN:1.6\tSO:unsorted\n@SQ\tSN:chr1\tLN:1000\n"),
            references: vec![(BString::from("chr1"), 1000), (BString::from("chr2"), 500)],
        }
    }

    // ========================================================================
    // Header meta round-trip
    // ========================================================================

    #[test]
    fn test_header_meta_roundtrip() {
        let meta = sample_meta();
        let mut bytes = Vec::new();
        write_header_meta(&mut bytes, &meta).unwrap();
        assert_eq!(&bytes[0..4], b"BAM\x01");

        let mut stream = ByteStream::new(Cursor::new(bytes));
        let decoded = read_header_meta(&mut stream).unwrap();
        assert_eq!(decoded, meta);
        assert_eq!(decoded.num_references(), 2);
    }

    #[test]
    fn test_header_meta_no_references() {
        let meta = HeaderMeta { text: BString::from(""), references: Vec::new() };
        let mut bytes = Vec::new();
        write_header_meta(&mut bytes, &meta).unwrap();
        let mut stream = ByteStream::new(Cursor::new(bytes));
        assert_eq!(read_header_meta(&mut stream).unwrap(), meta);
    }

    #[test]
    fn test_bad_magic() {
        let mut stream = ByteStream::new(Cursor::new(b"CRAM....".to_vec()));
        assert!(read_header_meta(&mut stream).is_err());
    }

    #[test]
    fn test_truncated_header() {
        let mut bytes = Vec::new();
        write_header_meta(&mut bytes, &sample_meta()).unwrap();
        bytes.truncate(bytes.len() - 3);
        let mut stream = ByteStream::new(Cursor::new(bytes));
        assert!(read_header_meta(&mut stream).is_err());
    }

    // ========================================================================
    // Record framing
    // ========================================================================

    #[test]
    fn test_alignment_frame_roundtrip() {
        let rec = crate::builder::make_alignment_record("r1", "ACGT", 0).unwrap();
        let mut bytes = Vec::new();
        write_alignment(&mut bytes, &rec).unwrap();
        write_alignment(&mut bytes, &rec).unwrap();

        let mut stream = ByteStream::new(Cursor::new(bytes));
        assert_eq!(read_alignment(&mut stream).unwrap().unwrap(), rec);
        assert_eq!(read_alignment(&mut stream).unwrap().unwrap(), rec);
        assert_eq!(read_alignment(&mut stream).unwrap(), None);
    }

    #[test]
    fn test_alignment_frame_negative_length() {
        let bytes = (-5i32).to_le_bytes().to_vec();
        let mut stream = ByteStream::new(Cursor::new(bytes));
        let err = read_alignment(&mut stream).unwrap_err();
        assert!(format!("{err}").contains("negative record length"));
    }

    #[test]
    fn test_alignment_frame_undersized_length() {
        let mut bytes = 8u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 8]);
        let mut stream = ByteStream::new(Cursor::new(bytes));
        assert!(read_alignment(&mut stream).is_err());
    }

    #[test]
    fn test_alignment_frame_truncated_payload() {
        let rec = crate::builder::make_alignment_record("r1", "ACGT", 0).unwrap();
        let mut bytes = Vec::new();
        write_alignment(&mut bytes, &rec).unwrap();
        bytes.truncate(bytes.len() - 2);
        let mut stream = ByteStream::new(Cursor::new(bytes));
        assert!(read_alignment(&mut stream).is_err());
    }

    // ========================================================================
    // Sort order rewriting
    // ========================================================================

    #[test]
    fn test_set_sort_order_replaces_existing() {
        let text = BString::from("@HD\tVN:1.6\tSO:unsorted\n@SQ\tSN:chr1\tLN:1000\n");
        let out = set_sort_order(text.as_bstr(), "coordinate");
        assert_eq!(out, "@HD\tVN:1.6\tSO:coordinate\n@SQ\tSN:chr1\tLN:1000\n");
    }

    #[test]
    fn test_set_sort_order_appends_to_hd_without_so() {
        let text = BString::from("@HD\tVN:1.5\n@SQ\tSN:chr1\tLN:1000\n");
        let out = set_sort_order(text.as_bstr(), "queryname");
        assert_eq!(out, "@HD\tVN:1.5\tSO:queryname\n@SQ\tSN:chr1\tLN:1000\n");
    }

    #[test]
    fn test_set_sort_order_inserts_hd_line() {
        let text = BString::from("@SQ\tSN:chr1\tLN:1000\n");
        let out = set_sort_order(text.as_bstr(), "coordinate");
        assert_eq!(out, "@HD\tVN:1.6\tSO:coordinate\n@SQ\tSN:chr1\tLN:1000\n");
    }

    #[test]
    fn test_set_sort_order_empty_header() {
        let out = set_sort_order(BString::from("").as_bstr(), "coordinate");
        assert_eq!(out, "@HD\tVN:1.6\tSO:coordinate\n");
    }

    #[test]
    fn test_set_sort_order_preserves_other_lines() {
        let text = BString::from("@HD\tSO:queryname\tVN:1.6\n@PG\tID:x\tCL:y z\n@CO\tfree text\n");
        let out = set_sort_order(text.as_bstr(), "coordinate");
        assert_eq!(out, "@HD\tSO:coordinate\tVN:1.6\n@PG\tID:x\tCL:y z\n@CO\tfree text\n");
    }
}
