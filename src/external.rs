//! External merge sort for BAM alignments.
//!
//! # Algorithm
//!
//! 1. **Run phase**: pull up to `buffer_size` records from the input stream,
//!    stable-sort them under the comparator, spill to a length-framed temp
//!    file, reopen the file as a run stream.
//! 2. **Merge phase**: k-way merge of run streams through a min-heap, run
//!    index breaking ties so the merge stays stable across runs.
//!
//! Run files are sequences of `(u32 little-endian length)(record bytes)`
//! frames; end of file marks end of run. They live in a temporary directory
//! that is removed when the sort returns, on success and on error alike.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use log::info;
use tempfile::TempDir;

use crate::bam_io::{
    read_alignment, read_header_meta, set_sort_order, write_alignment, write_header_meta,
};
use crate::bgzf::ByteStream;
use crate::errors::Result;
use crate::sort::{Comparator, SortOrder};

/// Default number of records buffered per run.
pub const DEFAULT_BUFFER_SIZE: usize = 1_000_000;

/// Statistics from a sort operation.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortStats {
    /// Records read from the input and written to the output.
    pub records_sorted: u64,
    /// Number of run files spilled to disk.
    pub runs_used: usize,
}

/// External sorter for BAM files.
pub struct ExternalSorter {
    sort_order: SortOrder,
    buffer_size: usize,
    temp_dir: Option<PathBuf>,
}

impl ExternalSorter {
    /// Create a sorter with the given output order and default buffering.
    #[must_use]
    pub fn new(sort_order: SortOrder) -> Self {
        Self { sort_order, buffer_size: DEFAULT_BUFFER_SIZE, temp_dir: None }
    }

    /// Set the number of records buffered per run.
    #[must_use]
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Set the base directory for run files.
    #[must_use]
    pub fn temp_dir(mut self, path: PathBuf) -> Self {
        self.temp_dir = Some(path);
        self
    }

    /// Sort a BAM file into a new BAM file.
    ///
    /// Reads the header and reference dictionary, rewrites the `@HD` `SO:`
    /// field to the requested order, and streams records through the
    /// run/merge pipeline. The output BGZF stream is finished (EOF block
    /// written) before returning.
    ///
    /// # Errors
    ///
    /// Any I/O or framing failure aborts the sort; partial output remains on
    /// disk but run files are removed.
    pub fn sort(&self, input: &Path, output: &Path) -> Result<SortStats> {
        info!("sorting {} by {}", input.display(), self.sort_order.as_str());

        let mut reader = ByteStream::new(noodles_bgzf::Reader::new(File::open(input)?));
        let mut meta = read_header_meta(&mut reader)?;
        meta.text = set_sort_order(meta.text.as_bstr(), self.sort_order.as_str());

        let mut writer = noodles_bgzf::Writer::new(File::create(output)?);
        write_header_meta(&mut writer, &meta)?;

        let temp = self.create_temp_dir()?;
        let stats = sort_alignments_in(
            &mut reader,
            &mut writer,
            self.sort_order.comparator(),
            self.buffer_size,
            temp.path(),
        )?;

        writer.finish()?;
        info!("sort complete: {} records in {} runs", stats.records_sorted, stats.runs_used);
        Ok(stats)
    }

    fn create_temp_dir(&self) -> Result<TempDir> {
        match &self.temp_dir {
            Some(base) => {
                std::fs::create_dir_all(base)?;
                Ok(TempDir::new_in(base)?)
            }
            None => Ok(TempDir::new()?),
        }
    }
}

/// Sort a BAM file. Convenience wrapper around [`ExternalSorter`].
///
/// Returns `(records_sorted, runs_used)` as [`SortStats`].
///
/// # Errors
///
/// See [`ExternalSorter::sort`].
pub fn sort_bam_file(
    input: &Path,
    output: &Path,
    sort_order: SortOrder,
    buffer_size: usize,
) -> Result<SortStats> {
    ExternalSorter::new(sort_order).buffer_size(buffer_size).sort(input, output)
}

/// Sort a stream of alignment records under an arbitrary comparator.
///
/// The reader must be positioned at the first record (header already
/// consumed); the header is the caller's responsibility. Run files go to a
/// fresh temporary directory removed when this returns.
///
/// # Errors
///
/// Any I/O or framing failure aborts the sort.
pub fn sort_alignments<R: Read, W: Write>(
    reader: &mut ByteStream<R>,
    writer: &mut W,
    compare: Comparator,
    buffer_size: usize,
) -> Result<SortStats> {
    let temp = TempDir::new()?;
    sort_alignments_in(reader, writer, compare, buffer_size.max(1), temp.path())
}

/// Run/merge pipeline over an explicit temp directory.
fn sort_alignments_in<R: Read, W: Write>(
    reader: &mut ByteStream<R>,
    writer: &mut W,
    compare: Comparator,
    buffer_size: usize,
    temp_path: &Path,
) -> Result<SortStats> {
    let mut stats = SortStats::default();

    // Run phase: spill sorted runs until the input is exhausted
    let mut runs: Vec<RunStream> = Vec::new();
    while let Some(run) = make_run(reader, compare, buffer_size, temp_path, runs.len())? {
        stats.records_sorted += run.records as u64;
        info!("run {} spilled with {} records", runs.len(), run.records);
        runs.push(run);
    }
    stats.runs_used = runs.len();

    // Merge phase: k-way merge keyed by the comparator, run index as the
    // stability tiebreak (earlier runs hold earlier input records)
    info!("merging {} runs", runs.len());
    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::with_capacity(runs.len());
    for (run_index, run) in runs.iter_mut().enumerate() {
        if let Some(record) = run.advance()? {
            heap.push(Reverse(HeapEntry { record, run_index, compare }));
        }
    }
    while let Some(Reverse(entry)) = heap.pop() {
        write_alignment(writer, &entry.record)?;
        if let Some(record) = runs[entry.run_index].advance()? {
            heap.push(Reverse(HeapEntry { record, run_index: entry.run_index, compare }));
        }
    }

    Ok(stats)
}

/// Pull up to `buffer_size` records, stable-sort, and spill one run.
///
/// Returns `None` when the input yields no records.
fn make_run<R: Read>(
    reader: &mut ByteStream<R>,
    compare: Comparator,
    buffer_size: usize,
    temp_path: &Path,
    run_index: usize,
) -> Result<Option<RunStream>> {
    let mut records: Vec<Vec<u8>> = Vec::new();
    while records.len() < buffer_size {
        match read_alignment(reader)? {
            Some(record) => records.push(record),
            None => break,
        }
    }
    if records.is_empty() {
        return Ok(None);
    }

    // Stable sort: equal records keep their input order
    records.sort_by(|a, b| compare(a, b));

    let path = temp_path.join(format!("run_{run_index:04}.tmp"));
    let mut out = BufWriter::new(File::create(&path)?);
    for record in &records {
        write_alignment(&mut out, record)?;
    }
    out.flush()?;

    RunStream::open(&path, records.len()).map(Some)
}

/// A spilled run, read back one framed record at a time.
struct RunStream {
    stream: ByteStream<File>,
    records: usize,
}

impl RunStream {
    fn open(path: &Path, records: usize) -> Result<Self> {
        Ok(Self { stream: ByteStream::new(File::open(path)?), records })
    }

    /// Read the next record of the run, or `None` at end of run.
    fn advance(&mut self) -> Result<Option<Vec<u8>>> {
        read_alignment(&mut self.stream)
    }
}

/// Merge-heap entry: one run's head record.
struct HeapEntry {
    record: Vec<u8>,
    run_index: usize,
    compare: Comparator,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.compare)(&self.record, &other.record)
            .then_with(|| self.run_index.cmp(&other.run_index))
    }
}
