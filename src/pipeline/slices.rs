use crate::error::{Error, Result};
use itertools::Itertools;

/// Contiguous range of spectral bins, `start..end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpectralSlice {
    pub start: usize,
    pub end: usize,
}

impl SpectralSlice {
    pub fn bins(&self) -> usize {
        self.end - self.start
    }
}

/// Ordered partition of `0..bins` into non-empty slices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpectralSlices {
    slices: Vec<SpectralSlice>,
}

impl SpectralSlices {
    /// Validates a caller supplied partition of `bins` bins.
    pub fn new(slices: Vec<SpectralSlice>, bins: usize) -> Result<SpectralSlices> {
        if slices.is_empty() {
            return Err(Error::config("at least one spectral slice is required"));
        }
        let mut next = 0;
        for (i, s) in slices.iter().enumerate() {
            if s.start != next || s.end <= s.start {
                return Err(Error::config(format!(
                    "spectral slice {} ({}..{}) must start at bin {} and be non-empty",
                    i, s.start, s.end, next
                )));
            }
            next = s.end;
        }
        if next != bins {
            return Err(Error::config(format!(
                "spectral slices cover {} bins, expected {}",
                next, bins
            )));
        }
        Ok(SpectralSlices { slices })
    }

    /// Splits `bins` bins into `count` slices whose sizes differ by at most
    /// one bin.
    pub fn partition(bins: usize, count: usize) -> Result<SpectralSlices> {
        if count == 0 || count > bins {
            return Err(Error::config(format!(
                "cannot split {} spectral bins into {} slices",
                bins, count
            )));
        }
        let slices = (0..=count)
            .map(|i| i * bins / count)
            .tuple_windows()
            .map(|(start, end)| SpectralSlice { start, end })
            .collect();
        SpectralSlices::new(slices, bins)
    }

    pub fn single(bins: usize) -> Result<SpectralSlices> {
        SpectralSlices::partition(bins, 1)
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Total number of bins covered.
    pub fn bins(&self) -> usize {
        self.slices.last().map_or(0, |s| s.end)
    }

    pub fn get(&self, slice_id: usize) -> Result<&SpectralSlice> {
        self.slices.get(slice_id).ok_or(Error::SliceOutOfBounds {
            index: slice_id,
            count: self.slices.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpectralSlice> {
        self.slices.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_is_balanced_and_contiguous() {
        let slices = SpectralSlices::partition(10, 3).unwrap();
        let sizes: Vec<usize> = slices.iter().map(|s| s.bins()).collect();
        assert_eq!(sizes, vec![3, 3, 4]);
        assert_eq!(slices.bins(), 10);
        assert_eq!(slices.get(1).unwrap(), &SpectralSlice { start: 3, end: 6 });
        assert!(matches!(slices.get(3), Err(Error::SliceOutOfBounds { index: 3, count: 3 })));
    }

    #[test]
    fn invalid_partitions_are_rejected() {
        assert!(SpectralSlices::partition(2, 3).is_err());
        assert!(SpectralSlices::partition(2, 0).is_err());
        let gap = vec![
            SpectralSlice { start: 0, end: 2 },
            SpectralSlice { start: 3, end: 4 },
        ];
        assert!(SpectralSlices::new(gap, 4).is_err());
        let short = vec![SpectralSlice { start: 0, end: 2 }];
        assert!(SpectralSlices::new(short, 4).is_err());
        assert!(SpectralSlices::new(vec![], 0).is_err());
    }
}
