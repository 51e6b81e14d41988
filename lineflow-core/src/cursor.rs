//! Cursor and index mapping.
//!
//! Readers address samples relative to a cursor (`0` = current, `-1` = one
//! step back). The cursor turns an offset into an absolute position; the
//! [`IndexMapping`] turns an absolute position into a physical slot of the
//! backing storage. Only the mapping knows whether storage wraps, so buffer
//! code above it never branches on the storage strategy to compute indices.

use std::ops::Range;

use crate::error::{LineError, Result};

/// Absolute position of the "current" sample of a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    position: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub(crate) fn set(&mut self, position: usize) {
        self.position = position;
    }

    /// Absolute target of a relative offset. May be negative.
    #[inline]
    pub fn target(&self, offset: isize) -> i64 {
        self.position as i64 + offset as i64
    }
}

/// How absolute positions land in physical storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMapping {
    /// Growth storage: position `p` lives at slot `p`.
    Linear,
    /// Ring storage: position `p` lives at slot `p % capacity` and only the
    /// newest `capacity` positions are retained.
    Ring { capacity: usize },
}

impl IndexMapping {
    /// Oldest absolute position still retained after `length` appends.
    #[inline]
    pub fn oldest(&self, length: usize) -> usize {
        match *self {
            Self::Linear => 0,
            Self::Ring { capacity } => length.saturating_sub(capacity),
        }
    }

    /// Physical slot of absolute position `target`.
    #[inline]
    pub fn locate(&self, target: i64, length: usize) -> Result<usize> {
        let oldest = self.oldest(length);
        if target < oldest as i64 || target >= length as i64 {
            return Err(LineError::OutOfRange {
                position: target,
                length,
                oldest,
            });
        }
        let position = target as usize;
        Ok(match *self {
            Self::Linear => position,
            Self::Ring { capacity } => position % capacity,
        })
    }

    /// Physical slots of the absolute range `start..end`.
    ///
    /// Ring storage is mirrored (see `buffer`), so the returned range may run
    /// past `capacity` but is always contiguous.
    pub fn locate_range(&self, start: usize, end: usize, length: usize) -> Result<Range<usize>> {
        if start > end {
            return Err(LineError::InvalidRange {
                start,
                end,
                reason: "start is after end".into(),
            });
        }
        let oldest = self.oldest(length);
        if end > length {
            return Err(LineError::OutOfRange {
                position: end as i64 - 1,
                length,
                oldest,
            });
        }
        if start == end {
            return Ok(0..0);
        }
        if start < oldest {
            return Err(LineError::OutOfRange {
                position: start as i64,
                length,
                oldest,
            });
        }
        let first = self.locate(start as i64, length)?;
        Ok(first..first + (end - start))
    }
}
