use polars::prelude::*;

/// One boolean per row position of the table a filter pass started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMask(Vec<bool>);

impl RowMask {
    pub fn all(len: usize, value: bool) -> Self {
        Self(vec![value; len])
    }

    pub fn from_fn(len: usize, f: impl FnMut(usize) -> bool) -> Self {
        Self((0..len).map(f).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of selected rows.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|b| **b).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    #[must_use]
    pub fn and(mut self, other: &Self) -> Self {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a &= *b;
        }
        self
    }

    #[must_use]
    pub fn or(mut self, other: &Self) -> Self {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
        self
    }

    /// Selected row positions, ascending.
    pub fn positions(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect()
    }

    pub fn to_chunked(&self) -> BooleanChunked {
        BooleanChunked::from_slice("mask".into(), &self.0)
    }
}

impl From<Vec<bool>> for RowMask {
    fn from(bits: Vec<bool>) -> Self {
        Self(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinators() {
        let a = RowMask::from(vec![true, true, false, false]);
        let b = RowMask::from(vec![true, false, true, false]);
        assert_eq!(a.clone().and(&b).as_slice(), &[true, false, false, false]);
        assert_eq!(a.clone().or(&b).as_slice(), &[true, true, true, false]);
        assert_eq!(a.count(), 2);
        assert_eq!(b.positions(), vec![0, 2]);
        assert_eq!(RowMask::from_fn(6, |i| i % 3 == 0).positions(), vec![0, 3]);
    }
}
