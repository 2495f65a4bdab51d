use std::error::Error;
use std::io::{self, Read, Seek, SeekFrom};

use bytes::Bytes;
use tiff::{TiffError, TiffResult};

/// A read touched bytes of the object that were never fetched.
#[derive(thiserror::Error, Debug)]
#[error("Byte {0} of the object has not been fetched")]
pub struct NotFetched(pub u64);

/// The fetched parts of a remote object, addressed by their offset in the object.
///
/// Parts may overlap. Reading anywhere else fails with [`NotFetched`].
#[derive(Clone, Debug, Default)]
pub struct SparseBytes {
    len: u64,
    parts: Vec<(u64, Bytes)>,
}

impl SparseBytes {
    /// Nothing fetched yet of an object of `len` bytes.
    pub fn new(len: u64) -> Self {
        Self {
            len,
            parts: Vec::new(),
        }
    }

    /// Add `data`, found at `offset` of the object.
    pub fn insert(&mut self, offset: u64, data: Bytes) {
        if !data.is_empty() {
            self.parts.push((offset, data));
        }
    }

    /// Size of the whole object.
    pub fn object_size(&self) -> u64 {
        self.len
    }

    /// Number of bytes held.
    pub fn fetched(&self) -> u64 {
        self.parts.iter().map(|(_, data)| data.len() as u64).sum()
    }

    /// A copy extended with `parts`, leaving `self` untouched.
    pub fn with_parts(&self, parts: impl IntoIterator<Item = (u64, Bytes)>) -> Self {
        let mut extended = self.clone();
        for (offset, data) in parts {
            extended.insert(offset, data);
        }
        extended
    }

    pub fn reader(&self) -> SparseReader {
        SparseReader {
            bytes: self.clone(),
            position: 0,
        }
    }

    /// The fetched bytes from `position` to the end of the part holding it.
    fn tail(&self, position: u64) -> Option<&[u8]> {
        self.parts.iter().find_map(|(offset, data)| {
            let skip = usize::try_from(position.checked_sub(*offset)?).ok()?;
            data.get(skip..).filter(|tail| !tail.is_empty())
        })
    }
}

/// Reads and seeks over [`SparseBytes`] like over the whole object.
#[derive(Debug)]
pub struct SparseReader {
    bytes: SparseBytes,
    position: u64,
}

impl Read for SparseReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.position >= self.bytes.len {
            return Ok(0);
        }
        let Some(tail) = self.bytes.tail(self.position) else {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                NotFetched(self.position),
            ));
        };
        let count = tail.len().min(buf.len());
        buf[..count].copy_from_slice(&tail[..count]);
        self.position += count as u64;
        Ok(count)
    }
}

impl Seek for SparseReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let position = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.bytes.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        let Some(position) = position else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            ));
        };
        self.position = position;
        Ok(position)
    }
}

/// Whether `err` was caused by reading bytes that were not fetched.
pub fn is_not_fetched(err: &(dyn Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<io::Error>()
            && io.get_ref().is_some_and(|inner| inner.is::<NotFetched>())
        {
            return true;
        }
        source = err.source();
    }
    false
}

/// `None` for a tag the image does not have. Unfetched bytes stay an error.
pub fn optional_tag<T>(result: TiffResult<T>) -> Result<Option<T>, TiffError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if is_not_fetched(&e) => Err(e),
        Err(_) => Ok(None),
    }
}
