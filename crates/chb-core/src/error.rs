use super::Bin;
use super::Sample;

/// Why a single QP backend could not produce a solution.
///
/// Backends return this as the error half of a tagged result so that the
/// fallback policy can be an explicit pipeline instead of nested recovery.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QpFailure {
    /// Cost matrix has no Cholesky factorization.
    #[error("cost matrix is not positive definite")]
    NotPositiveDefinite,
    /// Constraints admit no feasible point (or the backend cannot find one).
    #[error("constraints are infeasible")]
    Infeasible,
    /// A linear system along the way was singular.
    #[error("singular linear system")]
    Singular,
    /// Iteration budget exhausted before meeting tolerances.
    #[error("no convergence after {iterations} iterations")]
    NotConverged { iterations: usize },
    /// NaN or infinity appeared in an iterate.
    #[error("non-finite iterate")]
    NonFinite,
    /// Matrix and vector shapes do not agree.
    #[error("inconsistent problem dimensions")]
    Dimension,
}

/// Errors that can occur while building distances or clustering samples.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Hull metric name not recognized.
    #[error("unknown hull metric {0:?} (expected convex, affine or affine-qp)")]
    UnknownMetric(String),
    /// QP solver name not recognized.
    #[error("unknown qp solver {0:?} (expected active-set or interior-point)")]
    UnknownSolver(String),
    /// Sweep policy name not recognized.
    #[error("unknown sweep policy {0:?} (expected all or unassigned)")]
    UnknownSweep(String),
    /// Parameter out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Vector or matrix dimension does not match.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// A hull distance was requested against zero reference points.
    #[error("hull distance requires at least one reference point")]
    EmptyReference,
    /// Interior-point backend failed when run on its own.
    #[error("qp solver failed: {0}")]
    Solver(QpFailure),
    /// Both backends failed, active-set first and interior-point second.
    #[error("qp solvers failed (active-set: {active}; interior-point: {interior})")]
    Fallback {
        active: QpFailure,
        interior: QpFailure,
    },
    /// Hull evaluation for one point against one cluster failed.
    #[error("solver stage failed for sample {sample} against cluster {cluster}: {source}")]
    Evaluation {
        sample: Sample,
        cluster: Bin,
        #[source]
        source: Box<Error>,
    },
    /// Points left without a cluster after all passes.
    #[error("final check failed: {count} points left unassigned (first: sample {first})")]
    Unassigned { count: usize, first: Sample },
    /// Building, mapping or releasing the distance matrix failed.
    #[error("distance matrix stage failed: {0}")]
    Distances(#[source] Box<Error>),
    /// Distance matrix could not be allocated or mapped.
    #[error("cannot allocate {n}x{n} matrix ({bytes} bytes)")]
    Allocation { n: usize, bytes: u128 },
    /// Cached distance matrix was computed for a different sample count.
    #[error("cached distance matrix has shape {found}x{found}, expected {expected}x{expected}")]
    CacheMismatch { expected: usize, found: usize },
    /// Cached distance matrix file is inconsistent with its sidecar.
    #[error("corrupt distance matrix cache: {0}")]
    CorruptCache(String),
    /// Feature table row could not be parsed.
    #[error("feature table line {line}: {reason}")]
    Table { line: usize, reason: String },
    /// Underlying i/o failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;
