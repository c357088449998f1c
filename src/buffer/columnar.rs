//! Column-oriented storage types.
//!
//! Two concrete storages implement the [`Columnar`] trait: [`Series`], a
//! single homogeneous column of fixed-width rows, and [`Frame`], a named
//! table of equal-length series. Buffers are generic over the trait, so the
//! storage variant is chosen at construction rather than by runtime
//! subclassing.

use std::collections::BTreeMap;

use crate::error::BufferError;

/// Storage that a bounded buffer can append to, evict from and slice.
///
/// `check_compatible` must reject anything `concat` could not merge, so that
/// a buffer can validate before it mutates.
pub trait Columnar: Clone {
    /// Storage with no rows and an undetermined layout.
    fn empty() -> Self;

    /// Whether the column set / element shape has been established.
    fn has_layout(&self) -> bool;

    /// Number of rows.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero rows, same layout.
    fn empty_like(&self) -> Self;

    /// Check that `incoming` rows could be appended after `self`'s rows.
    fn check_compatible(&self, incoming: &Self) -> Result<(), BufferError>;

    /// Append `other`'s rows after `self`'s. Layouts must already match.
    fn concat(&mut self, other: &Self);

    /// The oldest `min(n, len)` rows.
    fn head(&self, n: usize) -> Self;

    /// The newest `min(n, len)` rows.
    fn tail(&self, n: usize) -> Self;

    /// Rows at indices `start, start + step, start + 2*step, ...`.
    fn stride(&self, start: usize, step: usize) -> Self;
}

/// A homogeneous column of fixed-width `f64` rows, stored flat row-major.
///
/// Scalars are width 1; vector-valued samples use width `k`. Width 0 means
/// the layout is not yet determined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    width: usize,
    data: Vec<f64>,
}

impl Series {
    /// An empty series whose rows will be `width` values wide.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            data: Vec::new(),
        }
    }

    /// Build a series from flat row-major data.
    pub fn from_rows(width: usize, data: Vec<f64>) -> Result<Self, BufferError> {
        if width == 0 {
            return Err(BufferError::ShapeMismatch(
                "series row width must be at least 1".into(),
            ));
        }
        if data.len() % width != 0 {
            return Err(BufferError::ShapeMismatch(format!(
                "{} values do not divide into rows of width {}",
                data.len(),
                width
            )));
        }
        Ok(Self { width, data })
    }

    /// A width-1 series from scalar values.
    pub fn scalars(values: Vec<f64>) -> Self {
        Self {
            width: 1,
            data: values,
        }
    }

    /// `n` rows of zeros, `width` values wide.
    pub fn zeros(rows: usize, width: usize) -> Self {
        Self {
            width,
            data: vec![0.0; rows * width],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Flat row-major view of all values.
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// One row by index.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if self.width == 0 || index >= self.len() {
            return None;
        }
        Some(&self.data[index * self.width..(index + 1) * self.width])
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.width.max(1))
    }

    /// Explicit sub-index accessor: the `index`-th component of every row.
    pub fn component(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.width {
            return None;
        }
        Some(self.rows().map(|r| r[index]).collect())
    }

    /// Append one row.
    pub fn push_row(&mut self, row: &[f64]) -> Result<(), BufferError> {
        if self.width == 0 {
            self.width = row.len();
        }
        if row.len() != self.width {
            return Err(BufferError::ShapeMismatch(format!(
                "expected a row of width {}, got {}",
                self.width,
                row.len()
            )));
        }
        self.data.extend_from_slice(row);
        Ok(())
    }
}

impl Columnar for Series {
    fn empty() -> Self {
        Self::default()
    }

    fn has_layout(&self) -> bool {
        self.width > 0
    }

    fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.data.len() / self.width
        }
    }

    fn empty_like(&self) -> Self {
        Self::new(self.width)
    }

    fn check_compatible(&self, incoming: &Self) -> Result<(), BufferError> {
        if incoming.width != self.width {
            return Err(BufferError::ShapeMismatch(format!(
                "expected rows of width {}, got {}",
                self.width, incoming.width
            )));
        }
        Ok(())
    }

    fn concat(&mut self, other: &Self) {
        self.data.extend_from_slice(&other.data);
    }

    fn head(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            width: self.width,
            data: self.data[..n * self.width].to_vec(),
        }
    }

    fn tail(&self, n: usize) -> Self {
        let n = n.min(self.len());
        let skip = (self.len() - n) * self.width;
        Self {
            width: self.width,
            data: self.data[skip..].to_vec(),
        }
    }

    fn stride(&self, start: usize, step: usize) -> Self {
        let mut data = Vec::new();
        let mut i = start;
        while i < self.len() {
            data.extend_from_slice(self.row(i).unwrap_or(&[]));
            i += step;
        }
        Self {
            width: self.width,
            data,
        }
    }
}

/// A named table of equal-length series.
///
/// The equal-length invariant is enforced at construction, so any `Frame`
/// value a caller can hold is internally consistent. Columns iterate in name
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: BTreeMap<String, Series>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame, rejecting unequal column lengths or width-0 columns.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, BufferError>
    where
        I: IntoIterator<Item = (S, Series)>,
        S: Into<String>,
    {
        let mut out: BTreeMap<String, Series> = BTreeMap::new();
        let mut rows: Option<usize> = None;
        for (name, series) in columns {
            let name = name.into();
            if !series.has_layout() {
                return Err(BufferError::ShapeMismatch(format!(
                    "column '{name}' has no element shape"
                )));
            }
            match rows {
                None => rows = Some(series.len()),
                Some(r) if r != series.len() => {
                    return Err(BufferError::ShapeMismatch(format!(
                        "column '{}' has {} rows, expected {}",
                        name,
                        series.len(),
                        r
                    )));
                }
                Some(_) => {}
            }
            out.insert(name, series);
        }
        Ok(Self { columns: out })
    }

    /// Named-column lookup.
    pub fn column(&self, name: &str) -> Option<&Series> {
        self.columns.get(name)
    }

    /// Column names in iteration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    fn map_columns(&self, f: impl Fn(&Series) -> Series) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), f(v)))
                .collect(),
        }
    }
}

impl Columnar for Frame {
    fn empty() -> Self {
        Self::default()
    }

    fn has_layout(&self) -> bool {
        !self.columns.is_empty()
    }

    fn len(&self) -> usize {
        self.columns.values().next().map_or(0, Series::len)
    }

    fn empty_like(&self) -> Self {
        self.map_columns(Series::empty_like)
    }

    fn check_compatible(&self, incoming: &Self) -> Result<(), BufferError> {
        if !self
            .columns
            .keys()
            .eq(incoming.columns.keys())
        {
            return Err(BufferError::ColumnSetMismatch {
                expected: self.columns.keys().cloned().collect(),
                got: incoming.columns.keys().cloned().collect(),
            });
        }
        for (name, series) in &self.columns {
            let other = &incoming.columns[name];
            if other.width() != series.width() {
                return Err(BufferError::ShapeMismatch(format!(
                    "column '{}' expects width {}, got {}",
                    name,
                    series.width(),
                    other.width()
                )));
            }
        }
        Ok(())
    }

    fn concat(&mut self, other: &Self) {
        for (name, series) in &mut self.columns {
            series.concat(&other.columns[name]);
        }
    }

    fn head(&self, n: usize) -> Self {
        self.map_columns(|s| s.head(n))
    }

    fn tail(&self, n: usize) -> Self {
        self.map_columns(|s| s.tail(n))
    }

    fn stride(&self, start: usize, step: usize) -> Self {
        self.map_columns(|s| s.stride(start, step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_rows_and_width() {
        let s = Series::from_rows(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(s.component(0), Some(vec![1.0, 3.0]));
        assert!(s.component(2).is_none());
    }

    #[test]
    fn test_series_rejects_ragged_data() {
        assert!(Series::from_rows(3, vec![1.0, 2.0]).is_err());
        assert!(Series::from_rows(0, vec![]).is_err());
    }

    #[test]
    fn test_series_stride_selection() {
        let s = Series::scalars((0..7).map(f64::from).collect());
        let picked = s.stride(0, 3);
        assert_eq!(picked.values(), &[0.0, 3.0, 6.0]);
        let picked = s.stride(2, 3);
        assert_eq!(picked.values(), &[2.0, 5.0]);
    }

    #[test]
    fn test_series_head_tail_capped() {
        let s = Series::scalars(vec![1.0, 2.0, 3.0]);
        assert_eq!(s.head(10).len(), 3);
        assert_eq!(s.tail(2).values(), &[2.0, 3.0]);
    }

    #[test]
    fn test_frame_equal_length_invariant() {
        let result = Frame::from_columns([
            ("a", Series::scalars(vec![1.0, 2.0])),
            ("b", Series::scalars(vec![1.0])),
        ]);
        assert!(matches!(result, Err(BufferError::ShapeMismatch(_))));
    }

    #[test]
    fn test_frame_column_set_check() {
        let a = Frame::from_columns([("x", Series::scalars(vec![1.0]))]).unwrap();
        let b = Frame::from_columns([("y", Series::scalars(vec![1.0]))]).unwrap();
        assert!(matches!(
            a.check_compatible(&b),
            Err(BufferError::ColumnSetMismatch { .. })
        ));
    }

    #[test]
    fn test_frame_width_check() {
        let a = Frame::from_columns([("x", Series::scalars(vec![1.0]))]).unwrap();
        let b = Frame::from_columns([(
            "x",
            Series::from_rows(2, vec![1.0, 2.0]).unwrap(),
        )])
        .unwrap();
        assert!(matches!(
            a.check_compatible(&b),
            Err(BufferError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_frame_concat_and_slice() {
        let mut a = Frame::from_columns([("x", Series::scalars(vec![1.0, 2.0]))]).unwrap();
        let b = Frame::from_columns([("x", Series::scalars(vec![3.0]))]).unwrap();
        a.check_compatible(&b).unwrap();
        a.concat(&b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.tail(2).column("x").unwrap().values(), &[2.0, 3.0]);
        assert_eq!(a.head(1).column("x").unwrap().values(), &[1.0]);
    }
}
