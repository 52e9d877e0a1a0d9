use super::*;
use chb_core::*;
use std::borrow::Cow;
use std::path::Path;
use std::path::PathBuf;

/// Bytes needed for an N×N matrix of f64.
pub fn footprint(n: usize) -> u128 {
    (n as u128)
        .saturating_mul(n as u128)
        .saturating_mul(size_of::<f64>() as u128)
}

/// A distance matrix in whichever storage the run asked for.
pub enum Matrix {
    Resident(Resident),
    Mapped(Mapped),
}

impl Matrix {
    /// Failures of any kind come back as `Error::Distances`.
    pub fn build(samples: &Samples, storage: &Storage) -> Result<Self> {
        let n = samples.n();
        let start = std::time::Instant::now();
        log::info!("{:<32}{:<32}", "building distance matrix", format!("{}x{} {}", n, n, storage));
        let matrix = match storage {
            Storage::Memory => Resident::build(samples).map(Self::Resident),
            Storage::Disk { path, .. } => Mapped::grow(samples, path).map(Self::Mapped),
        }
        .map_err(stage)?;
        log::debug!("{:<32}{:<32}", "distance matrix ready", format!("{:?}", start.elapsed()));
        Ok(matrix)
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Resident(_) => None,
            Self::Mapped(mapped) => Some(mapped.path()),
        }
    }

    /// Drops the matrix, deleting its file unless it should be kept.
    /// A cache found on disk was not written by this run and is never
    /// deleted. Returns the path of a kept file.
    pub fn release(self, keep: bool) -> Result<Option<PathBuf>> {
        match self {
            Self::Resident(_) => Ok(None),
            Self::Mapped(mapped) if keep || mapped.reused() => Ok(Some(mapped.path().to_path_buf())),
            Self::Mapped(mapped) => mapped.remove().map(|_| None).map_err(stage),
        }
    }
}

fn stage(e: Error) -> Error {
    Error::Distances(Box::new(e))
}

impl Rows for Matrix {
    fn n(&self) -> usize {
        match self {
            Self::Resident(m) => m.n(),
            Self::Mapped(m) => m.n(),
        }
    }
    fn row(&self, i: Sample) -> Cow<'_, [Distance]> {
        match self {
            Self::Resident(m) => m.row(i),
            Self::Mapped(m) => m.row(i),
        }
    }
    fn get(&self, i: Sample, j: Sample) -> Distance {
        match self {
            Self::Resident(m) => m.get(i, j),
            Self::Mapped(m) => m.get(i, j),
        }
    }
}
