//! Bounded append/evict buffer over columnar storage.

use crate::buffer::columnar::Columnar;
use crate::error::BufferError;

/// A bounded, column-oriented, append-only buffer with FIFO eviction.
///
/// The column set and element shape are adopted from the first non-empty
/// [`extend`](Buffer::extend); every later call must supply exactly that
/// layout. Once `max_size` is set the capacity is never exceeded: the oldest
/// rows are evicted first.
#[derive(Debug, Clone)]
pub struct Buffer<T> {
    max_size: Option<usize>,
    data: T,
}

impl<T: Columnar> Buffer<T> {
    /// Create a buffer, optionally bounded to `max_size` rows.
    pub fn new(max_size: Option<usize>) -> Result<Self, BufferError> {
        if let Some(n) = max_size {
            if n < 1 {
                return Err(BufferError::InvalidCapacity(n));
            }
        }
        Ok(Self {
            max_size,
            data: T::empty(),
        })
    }

    /// A buffer that never evicts.
    pub fn unbounded() -> Self {
        Self {
            max_size: None,
            data: T::empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Validate a batch against the established layout without mutating.
    pub fn check(&self, batch: &T) -> Result<(), BufferError> {
        if self.data.has_layout() && !batch.is_empty() {
            self.data.check_compatible(batch)?;
        }
        Ok(())
    }

    /// Append rows, then evict from the front down to `max_size`.
    ///
    /// Validation happens before mutation: a rejected batch leaves the
    /// buffer unchanged. Empty batches are no-ops and do not establish the
    /// column layout.
    pub fn extend(&mut self, batch: T) -> Result<(), BufferError> {
        if batch.is_empty() {
            return Ok(());
        }
        if self.data.has_layout() {
            self.data.check_compatible(&batch)?;
            self.data.concat(&batch);
        } else {
            self.data = batch;
        }
        if let Some(max) = self.max_size {
            if self.data.len() > max {
                self.data = self.data.tail(max);
            }
        }
        Ok(())
    }

    /// Append a single row; sugar for [`extend`](Buffer::extend).
    pub fn append(&mut self, row: T) -> Result<(), BufferError> {
        self.extend(row)
    }

    /// The most recent `n` rows (all rows if `n` is `None`), without
    /// mutation. Requests beyond the current length are capped silently.
    pub fn view(&self, n: Option<usize>) -> T {
        match n {
            None => self.data.clone(),
            Some(n) => self.data.tail(n),
        }
    }

    /// The oldest `n` rows without mutation, capped at the current length.
    pub fn view_front(&self, n: usize) -> T {
        self.data.head(n)
    }

    /// Remove and return the `min(n, len)` oldest rows.
    ///
    /// Fails only when the buffer holds zero rows; asking for more rows than
    /// are present drains the buffer and returns everything.
    pub fn popleft(&mut self, n: usize) -> Result<T, BufferError> {
        let len = self.data.len();
        if len == 0 {
            return Err(BufferError::EmptyBuffer);
        }
        let take = n.min(len);
        let out = self.data.head(take);
        self.data = if take == len {
            self.data.empty_like()
        } else {
            self.data.tail(len - take)
        };
        Ok(out)
    }

    /// Remove and return every row.
    pub fn popleft_all(&mut self) -> Result<T, BufferError> {
        let len = self.data.len();
        self.popleft(len)
    }

    /// Drop all rows; the column layout persists.
    pub fn clear(&mut self) {
        self.data = self.data.empty_like();
    }

    /// Drop all rows and forget the column layout.
    pub fn reset(&mut self) {
        self.data = T::empty();
    }
}
