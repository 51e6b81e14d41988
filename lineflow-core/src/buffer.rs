//! Sample buffer: the append-only storage behind every line.
//!
//! Two storage strategies, fixed when the buffer is created:
//!
//! - **Growth**: a plain `Vec<f64>`. Appends rely on `Vec`'s geometric growth,
//!   so a push is O(1) amortized and `extend` reserves once.
//! - **Ring**: a bounded window of the newest `capacity` samples. Every slot
//!   is stored twice (`slot` and `slot + capacity`), so any run of retained
//!   positions is one contiguous slice of the backing vector. That keeps
//!   `slice()` zero-copy for batch evaluation at the price of one extra store
//!   per append.
//!
//! `length` counts every sample ever appended and keeps growing in ring mode.

use crate::cursor::{Cursor, IndexMapping};
use crate::error::{LineError, Result};

/// Storage strategy of a [`SampleBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Growth,
    Ring { capacity: usize },
}

#[derive(Debug, Clone)]
pub struct SampleBuffer {
    data: Vec<f64>,
    mapping: IndexMapping,
    length: usize,
    cursor: Cursor,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::growth()
    }
}

impl SampleBuffer {
    pub fn new(storage: Storage) -> Self {
        match storage {
            Storage::Growth => Self::growth(),
            Storage::Ring { capacity } => Self::ring(capacity),
        }
    }

    pub fn growth() -> Self {
        Self {
            data: Vec::new(),
            mapping: IndexMapping::Linear,
            length: 0,
            cursor: Cursor::new(),
        }
    }

    /// Bounded buffer retaining the newest `capacity` samples.
    pub fn ring(capacity: usize) -> Self {
        assert!(capacity >= 1, "ring capacity must be >= 1");
        Self {
            data: vec![f64::NAN; capacity * 2],
            mapping: IndexMapping::Ring { capacity },
            length: 0,
            cursor: Cursor::new(),
        }
    }

    pub fn storage(&self) -> Storage {
        match self.mapping {
            IndexMapping::Linear => Storage::Growth,
            IndexMapping::Ring { capacity } => Storage::Ring { capacity },
        }
    }

    /// Samples ever appended.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Ring capacity, `None` for growth storage.
    pub fn capacity(&self) -> Option<usize> {
        match self.mapping {
            IndexMapping::Linear => None,
            IndexMapping::Ring { capacity } => Some(capacity),
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self.mapping, IndexMapping::Ring { .. })
    }

    /// Oldest absolute position still readable.
    #[inline]
    pub fn oldest(&self) -> usize {
        self.mapping.oldest(self.length)
    }

    /// Number of samples physically retained.
    #[inline]
    pub fn retained(&self) -> usize {
        self.length - self.oldest()
    }

    /// Absolute position of the current sample.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor.position()
    }

    /// Append one sample and move the cursor onto it.
    #[inline]
    pub fn append(&mut self, value: f64) {
        self.append_deferred(value);
        self.cursor.set(self.length - 1);
    }

    /// Append one sample without moving the cursor.
    ///
    /// Used when several co-indexed buffers must all receive their value
    /// before the timestep counts as complete.
    #[inline]
    pub fn append_deferred(&mut self, value: f64) {
        match self.mapping {
            IndexMapping::Linear => self.data.push(value),
            IndexMapping::Ring { capacity } => {
                let slot = self.length % capacity;
                self.data[slot] = value;
                self.data[slot + capacity] = value;
            }
        }
        self.length += 1;
    }

    /// Append `count` copies of `value`, moving the cursor onto the last one.
    pub fn extend(&mut self, value: f64, count: usize) {
        if count == 0 {
            return;
        }
        match self.mapping {
            IndexMapping::Linear => self.data.resize(self.length + count, value),
            IndexMapping::Ring { capacity } => {
                // Older repetitions would be evicted immediately.
                let end = self.length + count;
                for position in end - count.min(capacity)..end {
                    self.store(position % capacity, value);
                }
            }
        }
        self.length += count;
        self.cursor.set(self.length - 1);
    }

    /// Append a run of samples, moving the cursor onto the last one.
    pub fn extend_from_slice(&mut self, values: &[f64]) {
        if values.is_empty() {
            return;
        }
        match self.mapping {
            IndexMapping::Linear => self.data.extend_from_slice(values),
            IndexMapping::Ring { capacity } => {
                let skip = values.len().saturating_sub(capacity);
                for (i, &value) in values.iter().enumerate().skip(skip) {
                    self.store((self.length + i) % capacity, value);
                }
            }
        }
        self.length += values.len();
        self.cursor.set(self.length - 1);
    }

    /// Sample at `cursor + offset`.
    ///
    /// Positive offsets address samples the reader has not reached yet and
    /// always fail.
    #[inline]
    pub fn read(&self, offset: isize) -> Result<f64> {
        let target = self.cursor.target(offset);
        if offset > 0 {
            return Err(self.out_of_range(target));
        }
        let slot = self.mapping.locate(target, self.length)?;
        Ok(self.data[slot])
    }

    /// Overwrite the sample at `cursor + offset`.
    ///
    /// Unlike [`read`](Self::read), a positive offset is accepted when the
    /// slot already exists (cursor deferred behind the newest sample).
    pub fn write(&mut self, offset: isize, value: f64) -> Result<()> {
        let slot = self
            .mapping
            .locate(self.cursor.target(offset), self.length)?;
        self.store(slot, value);
        Ok(())
    }

    /// Sample at absolute `position`.
    #[inline]
    pub fn get(&self, position: usize) -> Result<f64> {
        let slot = self.mapping.locate(position as i64, self.length)?;
        Ok(self.data[slot])
    }

    /// Overwrite the sample at absolute `position`.
    pub fn set(&mut self, position: usize, value: f64) -> Result<()> {
        let slot = self.mapping.locate(position as i64, self.length)?;
        self.store(slot, value);
        Ok(())
    }

    /// Read-only contiguous view of absolute positions `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<&[f64]> {
        let range = self.mapping.locate_range(start, end, self.length)?;
        Ok(&self.data[range])
    }

    /// Move the cursor to absolute `position`.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position < self.oldest() || position >= self.length {
            return Err(self.out_of_range(position as i64));
        }
        self.cursor.set(position);
        Ok(())
    }

    /// Move the cursor `steps` positions back.
    pub fn rewind(&mut self, steps: usize) -> Result<()> {
        let target = self.cursor.target(-(steps as isize));
        if target < 0 {
            return Err(self.out_of_range(target));
        }
        self.seek(target as usize)
    }

    /// Move the cursor one position forward.
    pub fn advance(&mut self) -> Result<()> {
        self.seek(self.cursor.position() + 1)
    }

    /// Move the cursor onto the newest sample. No-op on an empty buffer.
    pub fn seek_end(&mut self) {
        if self.length > 0 {
            self.cursor.set(self.length - 1);
        }
    }

    /// Retained samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let oldest = self.oldest();
        // The retained range is always addressable.
        self.slice(oldest, self.length)
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    #[inline]
    fn store(&mut self, slot: usize, value: f64) {
        match self.mapping {
            IndexMapping::Linear => self.data[slot] = value,
            IndexMapping::Ring { capacity } => {
                let slot = slot % capacity;
                self.data[slot] = value;
                self.data[slot + capacity] = value;
            }
        }
    }

    fn out_of_range(&self, position: i64) -> LineError {
        LineError::OutOfRange {
            position,
            length: self.length,
            oldest: self.oldest(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(storage: Storage, values: &[f64]) -> SampleBuffer {
        let mut buf = SampleBuffer::new(storage);
        for &v in values {
            buf.append(v);
        }
        buf
    }

    #[test]
    fn append_then_read_current() {
        let mut buf = SampleBuffer::growth();
        buf.append(1.5);
        assert_eq!(buf.read(0), Ok(1.5));
        buf.append(2.5);
        assert_eq!(buf.read(0), Ok(2.5));
        assert_eq!(buf.read(-1), Ok(1.5));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn read_empty_fails() {
        let buf = SampleBuffer::growth();
        assert!(buf.read(0).unwrap_err().is_out_of_range());
        let ring = SampleBuffer::ring(2);
        assert!(ring.read(0).unwrap_err().is_out_of_range());
    }

    #[test]
    fn read_before_start_fails() {
        let buf = filled(Storage::Growth, &[1.0, 2.0]);
        assert!(buf.read(-2).unwrap_err().is_out_of_range());
    }

    #[test]
    fn positive_offset_read_fails_even_if_slot_exists() {
        let mut buf = filled(Storage::Growth, &[1.0, 2.0]);
        buf.seek(0).unwrap();
        assert!(buf.read(1).is_err());
        // ...but a writer may fill it.
        buf.write(1, 9.0).unwrap();
        assert_eq!(buf.get(1), Ok(9.0));
    }

    #[test]
    fn ring_capacity_three_scenario() {
        let buf = filled(Storage::Ring { capacity: 3 }, &[10.0, 20.0, 30.0, 40.0]);
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.read(0), Ok(40.0));
        assert_eq!(buf.read(-1), Ok(30.0));
        assert_eq!(buf.read(-2), Ok(20.0));
        let err = buf.read(-3).unwrap_err();
        assert_eq!(
            err,
            LineError::OutOfRange {
                position: 0,
                length: 4,
                oldest: 1
            }
        );
    }

    #[test]
    fn ring_retains_exactly_newest() {
        let buf = filled(Storage::Ring { capacity: 3 }, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buf.to_vec(), vec![3.0, 4.0, 5.0]);
        assert_eq!(buf.retained(), 3);
        assert_eq!(buf.oldest(), 2);
    }

    #[test]
    fn ring_partially_filled() {
        let buf = filled(Storage::Ring { capacity: 4 }, &[1.0, 2.0]);
        assert_eq!(buf.to_vec(), vec![1.0, 2.0]);
        assert_eq!(buf.read(-1), Ok(1.0));
    }

    #[test]
    fn deferred_append_keeps_cursor() {
        let mut buf = filled(Storage::Growth, &[1.0]);
        buf.append_deferred(2.0);
        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.read(0), Ok(1.0));
        buf.seek_end();
        assert_eq!(buf.read(0), Ok(2.0));
    }

    #[test]
    fn extend_growth_repeats_value() {
        let mut buf = filled(Storage::Growth, &[1.0]);
        buf.extend(7.0, 3);
        assert_eq!(buf.to_vec(), vec![1.0, 7.0, 7.0, 7.0]);
        assert_eq!(buf.cursor(), 3);
        buf.extend(0.0, 0);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn extend_ring_longer_than_capacity() {
        let mut buf = filled(Storage::Ring { capacity: 3 }, &[1.0, 2.0]);
        buf.extend(5.0, 10);
        assert_eq!(buf.len(), 12);
        assert_eq!(buf.to_vec(), vec![5.0, 5.0, 5.0]);
        buf.append(6.0);
        assert_eq!(buf.to_vec(), vec![5.0, 5.0, 6.0]);
    }

    #[test]
    fn extend_from_slice_ring_keeps_tail() {
        let mut buf = SampleBuffer::ring(2);
        buf.extend_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.to_vec(), vec![4.0, 5.0]);
        assert_eq!(buf.read(0), Ok(5.0));
    }

    #[test]
    fn slice_is_contiguous_after_wrap() {
        let buf = filled(Storage::Ring { capacity: 3 }, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buf.slice(2, 5).unwrap(), &[3.0, 4.0, 5.0]);
        assert_eq!(buf.slice(3, 5).unwrap(), &[4.0, 5.0]);
        assert!(buf.slice(1, 3).unwrap_err().is_out_of_range());
    }

    #[test]
    fn slice_growth_bounds() {
        let buf = filled(Storage::Growth, &[1.0, 2.0, 3.0]);
        assert_eq!(buf.slice(0, 3).unwrap(), &[1.0, 2.0, 3.0]);
        assert!(buf.slice(0, 4).is_err());
    }

    #[test]
    fn set_and_write_update_ring_mirror() {
        let mut buf = filled(Storage::Ring { capacity: 2 }, &[1.0, 2.0, 3.0]);
        buf.set(2, 30.0).unwrap();
        buf.write(-1, 20.0).unwrap();
        assert_eq!(buf.slice(1, 3).unwrap(), &[20.0, 30.0]);
        assert!(buf.set(0, 1.0).is_err());
    }

    #[test]
    fn seek_rewind_advance() {
        let mut buf = filled(Storage::Growth, &[1.0, 2.0, 3.0]);
        buf.rewind(2).unwrap();
        assert_eq!(buf.read(0), Ok(1.0));
        buf.advance().unwrap();
        assert_eq!(buf.read(0), Ok(2.0));
        assert!(buf.rewind(5).is_err());
        assert!(buf.seek(3).is_err());
        assert_eq!(buf.cursor(), 1);
    }

    #[test]
    fn seek_into_evicted_region_fails() {
        let mut buf = filled(Storage::Ring { capacity: 2 }, &[1.0, 2.0, 3.0]);
        assert!(buf.seek(0).is_err());
        buf.seek(1).unwrap();
        assert_eq!(buf.read(0), Ok(2.0));
    }
}
