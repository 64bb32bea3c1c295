//! Alignment flag predicates, composition, and consistency validation.
//!
//! The flag word is a bitfield (see [`crate::fields::flags`]). Predicates
//! here read single bits; [`validate_flag`] enforces the cross-bit
//! consistency rules; [`compose_flags`] builds a validated flag word from
//! named bits.

use bstr::BString;

use crate::errors::{Error, Result};
use crate::fields::{self, flags};

/// Read was sequenced as part of a pair.
#[inline]
#[must_use]
pub fn is_paired(flag: u16) -> bool {
    flag & flags::PAIRED != 0
}

/// Read is mapped in a proper pair.
#[inline]
#[must_use]
pub fn is_proper_pair(flag: u16) -> bool {
    flag & flags::PROPER_PAIR != 0
}

/// Read is unmapped.
#[inline]
#[must_use]
pub fn is_unmapped(flag: u16) -> bool {
    flag & flags::UNMAPPED != 0
}

/// Read is mapped.
#[inline]
#[must_use]
pub fn is_mapped(flag: u16) -> bool {
    !is_unmapped(flag)
}

/// Mate is unmapped.
#[inline]
#[must_use]
pub fn is_mate_unmapped(flag: u16) -> bool {
    flag & flags::MATE_UNMAPPED != 0
}

/// Mate is mapped.
#[inline]
#[must_use]
pub fn is_mate_mapped(flag: u16) -> bool {
    !is_mate_unmapped(flag)
}

/// Read is on the reverse strand.
#[inline]
#[must_use]
pub fn is_reverse(flag: u16) -> bool {
    flag & flags::REVERSE != 0
}

/// Read is on the forward strand.
#[inline]
#[must_use]
pub fn is_forward(flag: u16) -> bool {
    !is_reverse(flag)
}

/// Mate is on the reverse strand.
#[inline]
#[must_use]
pub fn is_mate_reverse(flag: u16) -> bool {
    flag & flags::MATE_REVERSE != 0
}

/// Mate is on the forward strand.
#[inline]
#[must_use]
pub fn is_mate_forward(flag: u16) -> bool {
    !is_mate_reverse(flag)
}

/// Read is the first of its pair.
#[inline]
#[must_use]
pub fn is_first_in_pair(flag: u16) -> bool {
    flag & flags::FIRST_IN_PAIR != 0
}

/// Read is the second of its pair.
#[inline]
#[must_use]
pub fn is_second_in_pair(flag: u16) -> bool {
    flag & flags::SECOND_IN_PAIR != 0
}

/// Alignment is not primary.
#[inline]
#[must_use]
pub fn is_secondary(flag: u16) -> bool {
    flag & flags::SECONDARY != 0
}

/// Alignment is primary.
#[inline]
#[must_use]
pub fn is_primary(flag: u16) -> bool {
    !is_secondary(flag)
}

/// Read fails platform/vendor quality checks.
#[inline]
#[must_use]
pub fn is_qc_fail(flag: u16) -> bool {
    flag & flags::QC_FAIL != 0
}

/// Read is a PCR or optical duplicate.
#[inline]
#[must_use]
pub fn is_duplicate(flag: u16) -> bool {
    flag & flags::DUPLICATE != 0
}

/// Named flag bits for [`compose_flags`].
///
/// Most variants set their bit; the complement variants (`Mapped`,
/// `MateMapped`, `Forward`, `MateForward`, `Primary`) clear the
/// corresponding bit instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagBit {
    Paired,
    ProperPair,
    Unmapped,
    Mapped,
    MateUnmapped,
    MateMapped,
    Reverse,
    Forward,
    MateReverse,
    MateForward,
    FirstInPair,
    SecondInPair,
    Secondary,
    Primary,
    QcFail,
    Duplicate,
}

impl FlagBit {
    /// The mask this bit operates on and whether it sets (`true`) or clears.
    #[must_use]
    fn mask(self) -> (u16, bool) {
        match self {
            Self::Paired => (flags::PAIRED, true),
            Self::ProperPair => (flags::PROPER_PAIR, true),
            Self::Unmapped => (flags::UNMAPPED, true),
            Self::Mapped => (flags::UNMAPPED, false),
            Self::MateUnmapped => (flags::MATE_UNMAPPED, true),
            Self::MateMapped => (flags::MATE_UNMAPPED, false),
            Self::Reverse => (flags::REVERSE, true),
            Self::Forward => (flags::REVERSE, false),
            Self::MateReverse => (flags::MATE_REVERSE, true),
            Self::MateForward => (flags::MATE_REVERSE, false),
            Self::FirstInPair => (flags::FIRST_IN_PAIR, true),
            Self::SecondInPair => (flags::SECOND_IN_PAIR, true),
            Self::Secondary => (flags::SECONDARY, true),
            Self::Primary => (flags::SECONDARY, false),
            Self::QcFail => (flags::QC_FAIL, true),
            Self::Duplicate => (flags::DUPLICATE, true),
        }
    }
}

/// Apply named bits to `base` and validate the result.
///
/// # Errors
///
/// Returns [`Error::MalformedField`] when the composed flag violates the
/// consistency rules.
pub fn compose_flags(base: u16, bits: &[FlagBit]) -> Result<u16> {
    let mut flag = base;
    for bit in bits {
        let (mask, set) = bit.mask();
        if set {
            flag |= mask;
        } else {
            flag &= !mask;
        }
    }
    validate_flag(flag)?;
    Ok(flag)
}

/// Check the cross-bit consistency of a flag word.
///
/// The rules, in order:
///
/// 1. A proper pair must be paired, have exactly one of first/second, have
///    both ends mapped, and have the ends on opposite strands.
/// 2. Otherwise a paired read must have exactly one of first/second.
/// 3. Otherwise an unpaired read must carry none of the mate or pair-order
///    bits (mate-reverse, mate-unmapped, first, second).
///
/// # Errors
///
/// Returns [`Error::MalformedField`] naming the failed sub-rule. The error
/// carries no record context; use [`checked_flags`] when a record is
/// available.
pub fn validate_flag(flag: u16) -> Result<()> {
    validate_flag_with(flag, || (BString::from("*"), -1, -1))
}

/// Validate the flag word of a record, enriching any error with the record's
/// read name, position, and reference id.
///
/// The plain [`crate::fields::flag_word`] accessor skips this check; sorting
/// hot paths read flags unvalidated.
///
/// # Errors
///
/// Returns [`Error::MalformedField`] when the flag violates the rules.
pub fn checked_flags(record: &[u8]) -> Result<u16> {
    let flag = fields::flag_word(record);
    validate_flag_with(flag, || {
        (BString::from(fields::read_name(record)), fields::pos(record), fields::ref_id(record))
    })?;
    Ok(flag)
}

fn validate_flag_with<F>(flag: u16, context: F) -> Result<()>
where
    F: Fn() -> (BString, i32, i32),
{
    let fail = |reason: &str| {
        let (read_name, position, reference_id) = context();
        Err(Error::MalformedField {
            flag,
            read_name,
            position,
            reference_id,
            reason: reason.to_string(),
        })
    };

    if is_proper_pair(flag) {
        if !is_paired(flag) {
            return fail("proper pair requires the paired bit");
        }
        if is_first_in_pair(flag) == is_second_in_pair(flag) {
            return fail("proper pair requires exactly one of first/second in pair");
        }
        if is_unmapped(flag) || is_mate_unmapped(flag) {
            return fail("proper pair requires both ends mapped");
        }
        if is_reverse(flag) == is_mate_reverse(flag) {
            return fail("proper pair requires opposite strands");
        }
    } else if is_paired(flag) {
        if is_first_in_pair(flag) == is_second_in_pair(flag) {
            return fail("paired read requires exactly one of first/second in pair");
        }
    } else {
        if is_mate_reverse(flag) {
            return fail("unpaired read must not set mate-reverse");
        }
        if is_mate_unmapped(flag) {
            return fail("unpaired read must not set mate-unmapped");
        }
        if is_first_in_pair(flag) || is_second_in_pair(flag) {
            return fail("unpaired read must not set first/second in pair");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_bam_bytes;

    // ========================================================================
    // Predicate tests
    // ========================================================================

    #[test]
    fn test_predicates_and_complements() {
        let flag = flags::PAIRED | flags::REVERSE | flags::FIRST_IN_PAIR;
        assert!(is_paired(flag));
        assert!(is_reverse(flag));
        assert!(!is_forward(flag));
        assert!(is_first_in_pair(flag));
        assert!(!is_second_in_pair(flag));
        assert!(is_mapped(flag));
        assert!(is_mate_mapped(flag));
        assert!(is_mate_forward(flag));
        assert!(is_primary(flag));
        assert!(!is_qc_fail(flag));
        assert!(!is_duplicate(flag));
    }

    // ========================================================================
    // Validity rule tests
    // ========================================================================

    #[test]
    fn test_paired_first_passes() {
        // 0b000_0100_0001: paired + first in pair
        assert!(validate_flag(0x0041).is_ok());
    }

    #[test]
    fn test_paired_both_pair_order_bits_fails() {
        // 0b000_1100_0001: paired + first + second
        let err = validate_flag(0x00C1).unwrap_err();
        match err {
            Error::MalformedField { flag, reason, .. } => {
                assert_eq!(flag, 0x00C1);
                assert!(reason.contains("exactly one of first/second"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_paired_neither_pair_order_bit_fails() {
        assert!(validate_flag(flags::PAIRED).is_err());
    }

    #[test]
    fn test_proper_pair_valid() {
        let flag = flags::PAIRED | flags::PROPER_PAIR | flags::FIRST_IN_PAIR | flags::MATE_REVERSE;
        assert!(validate_flag(flag).is_ok());
        let flag = flags::PAIRED | flags::PROPER_PAIR | flags::SECOND_IN_PAIR | flags::REVERSE;
        assert!(validate_flag(flag).is_ok());
    }

    #[test]
    fn test_proper_pair_requires_paired() {
        let flag = flags::PROPER_PAIR | flags::FIRST_IN_PAIR | flags::MATE_REVERSE;
        let err = validate_flag(flag).unwrap_err();
        assert!(format!("{err}").contains("paired bit"));
    }

    #[test]
    fn test_proper_pair_requires_both_mapped() {
        let flag = flags::PAIRED
            | flags::PROPER_PAIR
            | flags::FIRST_IN_PAIR
            | flags::MATE_REVERSE
            | flags::UNMAPPED;
        let err = validate_flag(flag).unwrap_err();
        assert!(format!("{err}").contains("both ends mapped"));
    }

    #[test]
    fn test_proper_pair_requires_opposite_strands() {
        // Both forward
        let flag = flags::PAIRED | flags::PROPER_PAIR | flags::FIRST_IN_PAIR;
        assert!(validate_flag(flag).is_err());
        // Both reverse
        let flag = flags::PAIRED
            | flags::PROPER_PAIR
            | flags::FIRST_IN_PAIR
            | flags::REVERSE
            | flags::MATE_REVERSE;
        assert!(validate_flag(flag).is_err());
    }

    #[test]
    fn test_unpaired_rules() {
        assert!(validate_flag(0).is_ok());
        assert!(validate_flag(flags::UNMAPPED).is_ok());
        assert!(validate_flag(flags::REVERSE | flags::DUPLICATE).is_ok());
        assert!(validate_flag(flags::MATE_REVERSE).is_err());
        assert!(validate_flag(flags::MATE_UNMAPPED).is_err());
        assert!(validate_flag(flags::FIRST_IN_PAIR).is_err());
        assert!(validate_flag(flags::SECOND_IN_PAIR).is_err());
    }

    #[test]
    fn test_validity_exhaustive_against_rule() {
        // Independent statement of the three-case rule over all 2^11 values
        fn oracle(f: u16) -> bool {
            let paired = f & flags::PAIRED != 0;
            let proper = f & flags::PROPER_PAIR != 0;
            let unmapped = f & flags::UNMAPPED != 0;
            let mate_unmapped = f & flags::MATE_UNMAPPED != 0;
            let reverse = f & flags::REVERSE != 0;
            let mate_reverse = f & flags::MATE_REVERSE != 0;
            let first = f & flags::FIRST_IN_PAIR != 0;
            let second = f & flags::SECOND_IN_PAIR != 0;
            if proper {
                paired && (first ^ second) && !unmapped && !mate_unmapped && (reverse ^ mate_reverse)
            } else if paired {
                first ^ second
            } else {
                !mate_reverse && !mate_unmapped && !first && !second
            }
        }
        for flag in 0u16..0x800 {
            assert_eq!(
                validate_flag(flag).is_ok(),
                oracle(flag),
                "disagreement at flag 0x{flag:04x}"
            );
        }
    }

    // ========================================================================
    // compose_flags tests
    // ========================================================================

    #[test]
    fn test_compose_sets_and_validates() {
        let flag = compose_flags(0, &[FlagBit::Paired, FlagBit::FirstInPair]).unwrap();
        assert_eq!(flag, flags::PAIRED | flags::FIRST_IN_PAIR);
    }

    #[test]
    fn test_compose_clearing_bits() {
        let base = flags::REVERSE | flags::SECONDARY | flags::UNMAPPED;
        let flag =
            compose_flags(base, &[FlagBit::Forward, FlagBit::Primary, FlagBit::Mapped]).unwrap();
        assert_eq!(flag, 0);
    }

    #[test]
    fn test_compose_invalid_raises() {
        let err = compose_flags(0, &[FlagBit::Paired, FlagBit::FirstInPair, FlagBit::SecondInPair]);
        assert!(err.is_err());
    }

    // ========================================================================
    // checked_flags tests
    // ========================================================================

    #[test]
    fn test_checked_flags_valid_record() {
        let rec = make_bam_bytes(
            0,
            100,
            flags::PAIRED | flags::FIRST_IN_PAIR,
            b"rd1",
            &[],
            0,
            0,
            200,
            &[],
        );
        assert_eq!(checked_flags(&rec).unwrap(), flags::PAIRED | flags::FIRST_IN_PAIR);
    }

    #[test]
    fn test_checked_flags_carries_record_context() {
        let rec = make_bam_bytes(2, 345, flags::MATE_REVERSE, b"oops", &[], 0, -1, -1, &[]);
        match checked_flags(&rec).unwrap_err() {
            Error::MalformedField { read_name, position, reference_id, .. } => {
                assert_eq!(read_name.as_slice(), b"oops");
                assert_eq!(position, 345);
                assert_eq!(reference_id, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
