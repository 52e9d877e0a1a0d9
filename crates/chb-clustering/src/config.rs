use chb_core::*;
use chb_hull::Metric;
use chb_hull::Solver;
use std::path::PathBuf;

/// Where the pairwise distance matrix lives during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Storage {
    #[default]
    Memory,
    /// Memory-mapped file at `path`, reused when already complete.
    /// Deleted after the run unless `keep` is set.
    Disk { path: PathBuf, keep: bool },
}

impl Storage {
    pub fn keep(&self) -> bool {
        match self {
            Self::Memory => false,
            Self::Disk { keep, .. } => *keep,
        }
    }
}

impl std::fmt::Display for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "in memory"),
            Self::Disk { path, .. } => write!(f, "on disk at {}", path.display()),
        }
    }
}

/// Which points a pass revisits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sweep {
    /// Every point, every pass.
    #[default]
    All,
    /// Only points that were unassigned when the pass began.
    Unassigned,
}

impl std::fmt::Display for Sweep {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Unassigned => write!(f, "unassigned"),
        }
    }
}

impl TryFrom<&str> for Sweep {
    type Error = Error;
    fn try_from(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "unassigned" => Ok(Self::Unassigned),
            _ => Err(Error::UnknownSweep(s.to_string())),
        }
    }
}

impl std::str::FromStr for Sweep {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(s)
    }
}

/// Every tunable of a binning run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub neighbors: usize,
    pub passes: usize,
    pub metric: Metric,
    pub solver: Solver,
    pub storage: Storage,
    pub sweep: Sweep,
    /// Seeds the visiting order. Unseeded runs draw from the OS.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            neighbors: DEFAULT_NEIGHBORS,
            passes: DEFAULT_PASSES,
            metric: Metric::default(),
            solver: Solver::default(),
            storage: Storage::default(),
            sweep: Sweep::default(),
            seed: None,
        }
    }
}

impl Config {
    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }
    pub fn with_passes(mut self, passes: usize) -> Self {
        self.passes = passes;
        self
    }
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }
    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }
    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }
    pub fn with_sweep(mut self, sweep: Sweep) -> Self {
        self.sweep = sweep;
        self
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.neighbors == 0 {
            return Err(Error::InvalidConfig("neighbors must be at least 1"));
        }
        if self.passes == 0 {
            return Err(Error::InvalidConfig("passes must be at least 1"));
        }
        Ok(())
    }
}
