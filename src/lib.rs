//! Raw-byte BAM record codec with an external merge sort.
//!
//! Alignment records are single packed byte buffers; field access goes
//! through free functions at fixed or derived offsets, so a record is one
//! allocation and moving it between buffers is a plain copy. On top of the
//! codec sits an external merge sort that spills length-framed runs to
//! temporary files and k-way merges them back into a BGZF output.
//!
//! ```rust,ignore
//! use bamsort::{sort_bam_file, SortOrder, DEFAULT_BUFFER_SIZE};
//!
//! let stats = sort_bam_file(
//!     "in.bam".as_ref(),
//!     "out.bam".as_ref(),
//!     SortOrder::Coordinate,
//!     DEFAULT_BUFFER_SIZE,
//! )?;
//! println!("{} records in {} runs", stats.records_sorted, stats.runs_used);
//! ```

#![deny(unsafe_code)]

pub mod bam_io;
pub mod bgzf;
pub mod binary;
pub mod builder;
pub mod cigar;
pub mod errors;
pub mod external;
pub mod fields;
pub mod flag;
pub mod registry;
pub mod sequence;
pub mod sort;
pub mod tags;

#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;

// Flat re-exports -- callers use bamsort::read_alignment() etc.
pub use bam_io::*;
pub use bgzf::*;
pub use builder::*;
pub use cigar::*;
pub use errors::{Error, Result};
pub use external::*;
pub use fields::*;
pub use flag::*;
pub use registry::*;
pub use sequence::*;
pub use sort::*;
pub use tags::*;

#[cfg(any(test, feature = "test-utils"))]
pub use testutil::*;
