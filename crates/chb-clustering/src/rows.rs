use chb_core::*;
use std::borrow::Cow;

/// Read access to an N×N distance matrix, one row at a time.
///
/// The assignment loop only ever needs the distances from one query to
/// everything else, so storage can be resident or paged in from disk.
/// Implementations must tolerate concurrent readers.
pub trait Rows: Sync {
    /// Number of samples, which is both the row and column count.
    fn n(&self) -> usize;
    /// Distances from sample i to every sample.
    fn row(&self, i: Sample) -> Cow<'_, [Distance]>;
    /// Distance between samples i and j.
    fn get(&self, i: Sample, j: Sample) -> Distance {
        self.row(i)[j]
    }
}
