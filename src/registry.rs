//! Registry of recognized auxiliary tags.
//!
//! Maps each two-letter tag keyword to its declared value type and a short
//! description, and dispatches encoding by that declared type. The table is
//! fixed at startup; reads are lock-free after the first access and there is
//! no runtime deregistration.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::errors::{Error, Result};
use crate::tags::{
    TagValue, append_char_tag, append_float_tag, append_hex_tag, append_int_tag,
    append_string_tag,
};

/// Declared semantic type of a registered tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagType {
    /// Single printable character (`A`)
    Char,
    /// Printable string (`Z`)
    String,
    /// Hex-digit string (`H`)
    Hex,
    /// 32-bit signed integer, stored at the narrowest width that fits
    Int32,
    /// Single-precision float (`f`)
    Float,
}

struct TagSpec {
    tag_type: TagType,
    description: &'static str,
}

static REGISTRY: LazyLock<HashMap<[u8; 2], TagSpec>> = LazyLock::new(|| {
    use TagType::{Char, Float, Hex, Int32, String};
    let entries: [([u8; 2], TagType, &'static str); 37] = [
        (*b"RG", String, "Read group"),
        (*b"LB", String, "Library"),
        (*b"PU", String, "Platform unit"),
        (*b"PG", String, "Program that generated the alignment"),
        (*b"AS", Int32, "Alignment score"),
        (*b"SQ", Hex, "Encoded base probabilities for the suboptimal bases"),
        (*b"MQ", Int32, "Mapping quality of the mate"),
        (*b"NM", Int32, "Edit distance to the reference"),
        (*b"H0", Int32, "Number of perfect hits"),
        (*b"H1", Int32, "Number of 1-difference hits"),
        (*b"H2", Int32, "Number of 2-difference hits"),
        (*b"UQ", Int32, "Phred likelihood of the segment"),
        (*b"PQ", Int32, "Phred likelihood of the template"),
        (*b"NH", Int32, "Number of reported alignments"),
        (*b"IH", Int32, "Number of stored alignments"),
        (*b"HI", Int32, "Query hit index"),
        (*b"MD", String, "String encoding mismatched and deleted reference bases"),
        (*b"CS", String, "Color read sequence"),
        (*b"CQ", String, "Color read quality"),
        (*b"CM", Int32, "Edit distance in colorspace"),
        (*b"GS", String, "Sequence in the overlapping region"),
        (*b"GQ", String, "Quality in the overlapping region"),
        (*b"GC", String, "CIGAR-like encoding of the overlapping region"),
        (*b"R2", String, "Sequence of the mate"),
        (*b"Q2", String, "Quality of the mate"),
        (*b"S2", Hex, "Encoded base probabilities for the other canonical alignment"),
        (*b"CC", String, "Reference name of the next hit"),
        (*b"CP", Int32, "Leftmost coordinate of the next hit"),
        (*b"SM", Int32, "Mapping quality if mapped as a single read"),
        (*b"AM", Int32, "Smaller single-end mapping quality of the pair"),
        (*b"MF", Int32, "MAQ pair flag"),
        (*b"X0", Int32, "Number of best hits"),
        (*b"X1", Int32, "Number of suboptimal hits"),
        (*b"XG", Int32, "Number of gap extensions"),
        (*b"XM", Int32, "Number of mismatches in the alignment"),
        (*b"XO", Int32, "Number of gap opens"),
        (*b"XT", Char, "Type of hit: unique, repeat, N or mate-sw"),
    ];
    entries
        .into_iter()
        .map(|(key, tag_type, description)| (key, TagSpec { tag_type, description }))
        .collect()
});

/// Declared type of a registered tag.
#[must_use]
pub fn tag_type(key: &[u8; 2]) -> Option<TagType> {
    REGISTRY.get(key).map(|spec| spec.tag_type)
}

/// Human-readable description of a registered tag.
#[must_use]
pub fn tag_documentation(key: &[u8; 2]) -> Option<&'static str> {
    REGISTRY.get(key).map(|spec| spec.description)
}

/// Append a tag entry to `dst`, encoded per the key's declared type.
///
/// # Errors
///
/// Returns [`Error::UnknownTag`] for keys absent from the registry and
/// [`Error::InvalidArgument`] when the value does not match the declared
/// type.
pub fn encode_tag(dst: &mut Vec<u8>, key: &[u8; 2], value: &TagValue) -> Result<()> {
    let spec = REGISTRY.get(key).ok_or(Error::UnknownTag { tag: *key })?;
    match (spec.tag_type, value) {
        (TagType::Char, TagValue::Char(c)) => append_char_tag(dst, key, *c),
        (TagType::String, TagValue::String(s)) => append_string_tag(dst, key, s),
        (TagType::Hex, TagValue::Hex(h)) => append_hex_tag(dst, key, h),
        (TagType::Int32, TagValue::Int(v)) => {
            let v = i32::try_from(*v).map_err(|_| Error::InvalidArgument {
                reason: format!(
                    "tag '{}{}' value {v} does not fit in 32 bits",
                    key[0] as char, key[1] as char
                ),
            })?;
            append_int_tag(dst, key, v);
        }
        (TagType::Float, TagValue::Float(f)) => append_float_tag(dst, key, *f),
        (expected, got) => {
            return Err(Error::InvalidArgument {
                reason: format!(
                    "tag '{}{}' expects a {expected:?} value, got {got:?}",
                    key[0] as char, key[1] as char
                ),
            });
        }
    }
    Ok(())
}
