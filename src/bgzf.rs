//! Buffered byte stream over a BGZF handle.
//!
//! [`ByteStream`] adapts a block-compressed handle (anything implementing
//! [`Read`], typically a [`noodles_bgzf::io::Reader`]) into a byte-oriented
//! stream with single-byte and bulk reads. The inflate/deflate codec itself
//! lives behind the handle; this type only owns the read-side buffer.
//!
//! Buffer invariant: `0 <= offset <= num_bytes <= BUFFER_SIZE`.

use std::io::{Read, Seek, SeekFrom};

use crate::errors::Result;

/// Size of the internal read buffer.
pub const BUFFER_SIZE: usize = 8192;

/// Buffered byte reader over a BGZF handle.
pub struct ByteStream<R> {
    inner: R,
    buf: Box<[u8; BUFFER_SIZE]>,
    /// Next byte to deliver.
    offset: usize,
    /// Bytes currently valid in `buf`.
    num_bytes: usize,
}

impl<R: Read> ByteStream<R> {
    /// Wrap a handle in a buffered stream.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self { inner, buf: Box::new([0; BUFFER_SIZE]), offset: 0, num_bytes: 0 }
    }

    /// Number of buffered bytes not yet delivered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.num_bytes - self.offset
    }

    /// Read one byte, refilling the buffer as needed.
    ///
    /// Returns `None` once the handle is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates underlying read failures as [`crate::Error::Io`].
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.offset == self.num_bytes && !self.refill()? {
            return Ok(None);
        }
        let byte = self.buf[self.offset];
        self.offset += 1;
        Ok(Some(byte))
    }

    /// Copy bytes into `dst`, refilling as needed, until `dst` is full or
    /// the handle is exhausted. Returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Propagates underlying read failures as [`crate::Error::Io`].
    pub fn read_into(&mut self, dst: &mut [u8]) -> Result<usize> {
        let mut copied = 0;
        while copied < dst.len() {
            if self.offset == self.num_bytes && !self.refill()? {
                break;
            }
            let n = (dst.len() - copied).min(self.buffered());
            dst[copied..copied + n].copy_from_slice(&self.buf[self.offset..self.offset + n]);
            self.offset += n;
            copied += n;
        }
        Ok(copied)
    }

    /// Release the underlying handle, discarding any buffered bytes.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Refill the buffer from the handle. Returns `false` when the handle
    /// yields no bytes (end of stream).
    fn refill(&mut self) -> Result<bool> {
        let n = self.inner.read(&mut self.buf[..])?;
        self.offset = 0;
        self.num_bytes = n;
        Ok(n > 0)
    }
}

impl<R: Read + Seek> ByteStream<R> {
    /// Position of the next byte to deliver: the handle's position minus the
    /// buffered remainder.
    ///
    /// # Errors
    ///
    /// Propagates underlying tell failures as [`crate::Error::Io`].
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()? - self.buffered() as u64)
    }

    /// Seek the handle and reset the buffer to empty.
    ///
    /// # Errors
    ///
    /// Propagates underlying seek failures as [`crate::Error::Io`].
    pub fn seek_to(&mut self, position: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(position))?;
        self.offset = 0;
        self.num_bytes = 0;
        Ok(())
    }
}
