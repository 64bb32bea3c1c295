//! Raw record construction helpers for tests.

/// Construct a raw BAM record byte buffer for testing.
///
/// Sequence and quality bytes are left zeroed; tests that need them write
/// into the derived offsets directly.
///
/// # Panics
///
/// Panics if `name` exceeds 254 bytes, `cigar_ops` exceeds `u16::MAX`
/// entries, or `seq_len` exceeds `i32::MAX`.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn make_bam_bytes(
    tid: i32,
    pos: i32,
    flag: u16,
    name: &[u8],
    cigar_ops: &[u32],
    seq_len: usize,
    mate_tid: i32,
    mate_pos: i32,
    aux_data: &[u8],
) -> Vec<u8> {
    let l_read_name = u8::try_from(name.len() + 1).unwrap();
    let n_cigar_op = u16::try_from(cigar_ops.len()).unwrap();
    let seq_bytes = seq_len.div_ceil(2);
    let total =
        32 + l_read_name as usize + cigar_ops.len() * 4 + seq_bytes + seq_len + aux_data.len();
    let mut buf = vec![0u8; total];

    buf[0..4].copy_from_slice(&tid.to_le_bytes());
    buf[4..8].copy_from_slice(&pos.to_le_bytes());
    buf[8] = l_read_name;
    buf[9] = 0; // mapq
    buf[10..12].copy_from_slice(&0u16.to_le_bytes()); // bin
    buf[12..14].copy_from_slice(&n_cigar_op.to_le_bytes());
    buf[14..16].copy_from_slice(&flag.to_le_bytes());
    buf[16..20].copy_from_slice(&i32::try_from(seq_len).unwrap().to_le_bytes());
    buf[20..24].copy_from_slice(&mate_tid.to_le_bytes());
    buf[24..28].copy_from_slice(&mate_pos.to_le_bytes());
    buf[28..32].copy_from_slice(&0i32.to_le_bytes()); // tlen

    let name_start = 32;
    buf[name_start..name_start + name.len()].copy_from_slice(name);
    buf[name_start + name.len()] = 0;

    let cigar_start = name_start + l_read_name as usize;
    for (i, &op) in cigar_ops.iter().enumerate() {
        let offset = cigar_start + i * 4;
        buf[offset..offset + 4].copy_from_slice(&op.to_le_bytes());
    }

    let aux_start = cigar_start + cigar_ops.len() * 4 + seq_bytes + seq_len;
    buf[aux_start..aux_start + aux_data.len()].copy_from_slice(aux_data);

    buf
}

/// [`make_bam_bytes`] with a custom template length.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn make_bam_bytes_with_tlen(
    tid: i32,
    pos: i32,
    flag: u16,
    name: &[u8],
    cigar_ops: &[u32],
    seq_len: usize,
    mate_tid: i32,
    mate_pos: i32,
    tlen: i32,
    aux_data: &[u8],
) -> Vec<u8> {
    let mut buf =
        make_bam_bytes(tid, pos, flag, name, cigar_ops, seq_len, mate_tid, mate_pos, aux_data);
    buf[28..32].copy_from_slice(&tlen.to_le_bytes());
    buf
}

pub use crate::cigar::encode_op;
