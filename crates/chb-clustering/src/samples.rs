use chb_core::*;

/// Row-major N×D feature matrix, one row per fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    n: usize,
    d: usize,
    values: Vec<f64>,
}

impl Samples {
    pub fn n(&self) -> usize {
        self.n
    }
    pub fn d(&self) -> usize {
        self.d
    }
    pub fn row(&self, i: Sample) -> &[f64] {
        &self.values[i * self.d..(i + 1) * self.d]
    }
    pub fn distance(&self, i: Sample, j: Sample) -> Distance {
        euclidean(self.row(i), self.row(j))
    }

    /// Uniform samples in [−10, 10)ᴰ from a fixed seed.
    pub fn random(n: usize, d: usize, seed: u64) -> Self {
        use rand::Rng;
        use rand::SeedableRng;
        let ref mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
        let d = d.max(1);
        Self {
            n,
            d,
            values: (0..n * d).map(|_| rng.random_range(-10.0..10.0)).collect(),
        }
    }

    /// Writes distances from sample i to every sample into `row`.
    pub fn fill(&self, i: Sample, row: &mut [Distance]) {
        row.iter_mut()
            .enumerate()
            .for_each(|(j, d)| *d = if i == j { 0. } else { self.distance(i, j) });
    }
}

impl TryFrom<(usize, Vec<f64>)> for Samples {
    type Error = Error;
    /// Builds from a dimension and flat row-major values.
    fn try_from((d, values): (usize, Vec<f64>)) -> Result<Self> {
        if d == 0 {
            return Err(Error::InvalidConfig("samples need at least one feature"));
        }
        if values.len() % d != 0 {
            return Err(Error::DimensionMismatch {
                expected: d * (values.len() / d + 1),
                got: values.len(),
            });
        }
        Ok(Self {
            n: values.len() / d,
            d,
            values,
        })
    }
}

impl TryFrom<Vec<Vec<f64>>> for Samples {
    type Error = Error;
    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        let d = rows.first().map(|r| r.len()).unwrap_or(0);
        match rows.iter().find(|r| r.len() != d) {
            Some(bad) => Err(Error::DimensionMismatch {
                expected: d,
                got: bad.len(),
            }),
            None => Self::try_from((d, rows.into_iter().flatten().collect::<Vec<f64>>())),
        }
    }
}

/// ‖a − b‖₂, summed in index order so that it is exactly symmetric.
pub fn euclidean(a: &[f64], b: &[f64]) -> Distance {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_rows() {
        let samples = Samples::try_from(vec![vec![0., 0.], vec![3., 4.]]).unwrap();
        assert_eq!(samples.n(), 2);
        assert_eq!(samples.d(), 2);
        assert_eq!(samples.row(1), &[3., 4.]);
        assert_eq!(samples.distance(0, 1), 5.);
    }

    #[test]
    fn rejects_ragged_rows() {
        let ragged = Samples::try_from(vec![vec![0., 0.], vec![1.]]);
        assert!(matches!(
            ragged,
            Err(Error::DimensionMismatch { expected: 2, got: 1 })
        ));
    }
}
