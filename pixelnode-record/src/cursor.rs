//! Sequential access to a region of records.
//!
//! [`RecordWriter`] appends records into a caller-supplied buffer while
//! enforcing the region budget, and [`RecordIter`] walks them back out
//! until the terminator.

use crate::record::{
    check_lengths, decode, encode, encoded_len, Decoded, Record, RecordError, RecordValue,
    TERMINATOR, TERMINATOR_LEN,
};

/// Maximum serialized size of a record list, terminator included
///
/// Leaves head-room inside a 4096-byte erase block.
pub const REGION_BUDGET: usize = 4000;

/// Appends records to a buffer and closes the list with the terminator
pub struct RecordWriter<'a> {
    buffer: &'a mut [u8],
    pos: usize,
    budget: usize,
}

impl<'a> RecordWriter<'a> {
    /// Create a writer limited to [`REGION_BUDGET`] bytes
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self::with_budget(buffer, REGION_BUDGET)
    }

    /// Create a writer with an explicit budget
    ///
    /// The effective budget never exceeds the buffer length.
    pub fn with_budget(buffer: &'a mut [u8], budget: usize) -> Self {
        let budget = budget.min(buffer.len());
        Self {
            buffer,
            pos: 0,
            budget,
        }
    }

    /// Bytes written so far, terminator excluded
    pub fn len(&self) -> usize {
        self.pos
    }

    /// True if no record has been written
    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// Append one record
    ///
    /// Fails with [`RecordError::RegionFull`] if the record plus the
    /// terminator would not fit in the budget. Nothing is written then.
    pub fn push(&mut self, name: &str, value: RecordValue<'_>) -> Result<(), RecordError> {
        let len = encoded_len(name, &value);
        if self.pos + len + TERMINATOR_LEN > self.budget {
            check_lengths(name, &value)?;
            return Err(RecordError::RegionFull);
        }

        let written = encode(name, value, &mut self.buffer[self.pos..self.budget])?;
        self.pos += written;
        Ok(())
    }

    /// Write the terminator and return the total length
    pub fn finish(self) -> Result<usize, RecordError> {
        let end = self.pos + TERMINATOR_LEN;
        if end > self.budget {
            return Err(RecordError::RegionFull);
        }
        self.buffer[self.pos..end].copy_from_slice(&TERMINATOR);
        Ok(end)
    }
}

/// Iterator over the records in a region
///
/// Yields `Ok(record)` until the terminator, or a single `Err` after which
/// iteration stops. Running off the end of the buffer without a terminator
/// yields [`RecordError::Truncated`].
pub struct RecordIter<'a> {
    buffer: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> RecordIter<'a> {
    /// Iterate over `buffer` from its start
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            pos: 0,
            done: false,
        }
    }

    /// Byte offset of the next record
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Result<Record<'a>, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match decode(&self.buffer[self.pos..]) {
            Ok(Decoded::Record(record, used)) => {
                self.pos += used;
                Some(Ok(record))
            }
            Ok(Decoded::EndOfList) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
