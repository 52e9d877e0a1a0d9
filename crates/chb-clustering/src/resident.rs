use super::*;
use chb_core::*;
use rayon::prelude::*;
use std::borrow::Cow;

/// Distance matrix held entirely in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Resident {
    n: usize,
    values: Vec<Distance>,
}

impl Resident {
    /// Computes every row in parallel. Fails up front when N² entries
    /// cannot be addressed or reserved.
    pub fn build(samples: &Samples) -> Result<Self> {
        let n = samples.n();
        let len = n.checked_mul(n).ok_or(Error::Allocation {
            n,
            bytes: footprint(n),
        })?;
        let mut values = Vec::new();
        values
            .try_reserve_exact(len)
            .map_err(|_| Error::Allocation {
                n,
                bytes: footprint(n),
            })?;
        values.resize(len, 0.);
        values
            .par_chunks_mut(n.max(1))
            .enumerate()
            .for_each(|(i, row)| samples.fill(i, row));
        Ok(Self { n, values })
    }
}

impl Rows for Resident {
    fn n(&self) -> usize {
        self.n
    }
    fn row(&self, i: Sample) -> Cow<'_, [Distance]> {
        Cow::Borrowed(&self.values[i * self.n..(i + 1) * self.n])
    }
    fn get(&self, i: Sample, j: Sample) -> Distance {
        self.values[i * self.n + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_with_zero_diagonal() {
        let matrix = Resident::build(&Samples::random(40, 6, 1)).unwrap();
        for i in 0..40 {
            assert_eq!(matrix.get(i, i), 0.);
            for j in 0..40 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
                assert!(matrix.get(i, j) >= 0.);
            }
        }
    }

    #[test]
    fn satisfies_triangle_inequality() {
        let matrix = Resident::build(&Samples::random(20, 3, 2)).unwrap();
        for i in 0..20 {
            for j in 0..20 {
                for k in 0..20 {
                    let direct = matrix.get(i, k);
                    let detour = matrix.get(i, j) + matrix.get(j, k);
                    assert!(direct <= detour + 1e-9);
                }
            }
        }
    }

    #[test]
    fn rows_match_entries() {
        let samples = Samples::random(10, 4, 3);
        let matrix = Resident::build(&samples).unwrap();
        let row = matrix.row(7);
        assert_eq!(row.len(), 10);
        assert_eq!(row[2], samples.distance(7, 2));
    }
}
