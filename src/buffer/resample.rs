//! Fixed-stride decimation on top of a bounded buffer.

use crate::buffer::bounded::Buffer;
use crate::buffer::columnar::Columnar;
use crate::error::BufferError;

/// A buffer that keeps every `stride`-th row of the logical input stream.
///
/// The phase counter persists across calls, so the retained rows are
/// identical to decimating the whole unbounded stream no matter how the
/// stream is chopped into batches. Index 0 of the stream is always emitted.
#[derive(Debug, Clone)]
pub struct ResamplingBuffer<T> {
    inner: Buffer<T>,
    stride: usize,
    /// Raw rows observed since the last emitted row, in `[0, stride)`.
    seen: usize,
}

impl<T: Columnar> ResamplingBuffer<T> {
    pub fn new(max_size: Option<usize>, stride: usize) -> Result<Self, BufferError> {
        if stride < 1 {
            return Err(BufferError::InvalidStride(stride));
        }
        Ok(Self {
            inner: Buffer::new(max_size)?,
            stride,
            seen: 0,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Current phase: raw rows seen since the last emission.
    pub fn phase(&self) -> usize {
        self.seen
    }

    /// Feed a raw batch; only rows landing on the stride grid are retained.
    ///
    /// A batch that contains no grid row still advances the phase counter
    /// and still gets validated against the established layout.
    pub fn extend(&mut self, batch: T) -> Result<(), BufferError> {
        let n = batch.len();
        if n == 0 {
            return Ok(());
        }
        self.inner.check(&batch)?;

        let emit = self.seen == 0 || self.stride < self.seen + n;
        if emit {
            let start = (self.stride - self.seen) % self.stride;
            self.inner.extend(batch.stride(start, self.stride))?;
        }
        self.seen = (self.seen + n) % self.stride;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The most recent `n` retained rows (all if `None`).
    pub fn view(&self, n: Option<usize>) -> T {
        self.inner.view(n)
    }

    /// Remove and return the `min(n, len)` oldest retained rows.
    pub fn popleft(&mut self, n: usize) -> Result<T, BufferError> {
        self.inner.popleft(n)
    }

    pub fn popleft_all(&mut self) -> Result<T, BufferError> {
        self.inner.popleft_all()
    }

    /// Drop retained rows and reset the phase; the layout persists.
    pub fn clear(&mut self) {
        self.inner.clear();
        self.seen = 0;
    }

    /// Full reset: rows, phase and layout.
    pub fn reset(&mut self) {
        self.inner.reset();
        self.seen = 0;
    }
}
