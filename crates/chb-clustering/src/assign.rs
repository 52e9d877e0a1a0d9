use super::*;
use chb_core::*;
use chb_hull::Hull;
use nalgebra::DMatrix;
use nalgebra::DVector;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;

/// How the assignment loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// A full pass left every label unchanged.
    Converged { passes: usize },
    /// Labels were still moving when the pass budget ran out.
    Exhausted { passes: usize },
    /// A graceful shutdown was requested between passes.
    Interrupted { passes: usize },
}

impl Convergence {
    pub fn passes(&self) -> usize {
        match self {
            Self::Converged { passes }
            | Self::Exhausted { passes }
            | Self::Interrupted { passes } => *passes,
        }
    }
}

impl std::fmt::Display for Convergence {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Converged { passes } => write!(f, "converged after {} passes", passes),
            Self::Exhausted { passes } => write!(f, "exhausted after {} passes", passes),
            Self::Interrupted { passes } => write!(f, "interrupted after {} passes", passes),
        }
    }
}

/// Sequential relaxation of fragment labels against local cluster hulls.
///
/// Each visit pulls one point out of its cluster, measures it against the
/// hull of its m nearest members in every cluster, and drops it into the
/// closest one. Cluster evaluations for a point run in parallel; the label
/// write happens before the next point is visited.
pub struct Assignment<'a, R: Rows> {
    matrix: &'a R,
    samples: &'a Samples,
    config: &'a Config,
    labels: Labels,
    membership: Membership,
    rng: SmallRng,
}

impl<'a, R: Rows> Assignment<'a, R> {
    pub fn new(matrix: &'a R, samples: &'a Samples, labels: Labels, config: &'a Config) -> Result<Self> {
        config.validate()?;
        if matrix.n() != samples.n() {
            return Err(Error::DimensionMismatch {
                expected: samples.n(),
                got: matrix.n(),
            });
        }
        if labels.len() != samples.n() {
            return Err(Error::DimensionMismatch {
                expected: samples.n(),
                got: labels.len(),
            });
        }
        let k = labels.k();
        if k == 0 {
            return Err(Error::InvalidConfig("no seeded clusters"));
        }
        if k > samples.n() {
            return Err(Error::InvalidConfig("cluster ids must be below the number of samples"));
        }
        let seed = config.seed.unwrap_or_else(rand::random);
        log::debug!("{:<32}{:<32}", "assignment seed", seed);
        Ok(Self {
            matrix,
            samples,
            config,
            membership: Membership::new(&labels, k),
            labels,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Runs passes until labels settle, the budget runs out, or an
    /// interrupt arrives. Fails if any point is still unassigned.
    pub fn run(mut self) -> Result<(Labels, Convergence)> {
        let n = self.samples.n();
        let k = self.membership.k();
        log::info!("{:<32}{:<32}", "assigning points", format!("{} points {} clusters", n, k));
        let mut convergence = Convergence::Exhausted {
            passes: self.config.passes,
        };
        for pass in 1..=self.config.passes {
            let start = std::time::Instant::now();
            let changed = self.pass()?;
            log::info!(
                "{:<32}{:<32}",
                format!("pass {:>3}", pass),
                format!(
                    "{:>8} moved {:>6.2}% {:?}",
                    changed,
                    100. * changed as f64 / n as f64,
                    start.elapsed()
                )
            );
            if changed == 0 {
                convergence = Convergence::Converged { passes: pass };
                break;
            }
            if interrupted() && pass < self.config.passes {
                convergence = Convergence::Interrupted { passes: pass };
                break;
            }
        }
        match convergence {
            Convergence::Exhausted { .. } => log::warn!("{:<32}{:<32}", "assignment", convergence),
            _ => log::info!("{:<32}{:<32}", "assignment", convergence),
        }
        self.labels.bins()?;
        Ok((self.labels, convergence))
    }

    /// One sweep in random order. Returns how many labels differ from the
    /// start of the pass.
    pub fn pass(&mut self) -> Result<usize> {
        let before = self.labels.clone();
        let mut order = match self.config.sweep {
            Sweep::All => (0..self.samples.n()).collect::<Vec<Sample>>(),
            Sweep::Unassigned => self.labels.unassigned(),
        };
        order.shuffle(&mut self.rng);
        for i in order {
            self.visit(i)?;
        }
        Ok(self.labels.changes(&before))
    }

    fn visit(&mut self, i: Sample) -> Result<()> {
        let previous = self.labels.get(i);
        self.membership.remove(i);
        self.labels.set(i, Label::Unassigned);
        let label = match self.evaluate(i)? {
            Some((c, _)) => Label::Bin(c),
            None => previous,
        };
        if let Some(c) = label.bin() {
            self.membership.insert(i, c);
        }
        self.labels.set(i, label);
        Ok(())
    }

    /// Closest reachable cluster for point i, ties to the lowest id.
    fn evaluate(&self, i: Sample) -> Result<Option<(Bin, Distance)>> {
        let ref row = self.matrix.row(i);
        let ref query = DVector::from_column_slice(self.samples.row(i));
        let distances = (0..self.membership.k())
            .into_par_iter()
            .map(|c| self.distance(i, c, row, query))
            .collect::<Result<Vec<Option<Distance>>>>()?;
        Ok(distances
            .into_iter()
            .enumerate()
            .filter_map(|(c, d)| d.map(|d| (c, d)))
            .min_by(|(a, x), (b, y)| x.total_cmp(y).then(a.cmp(b))))
    }

    /// Hull distance from point i to the nearest members of cluster c,
    /// or None when c has no members.
    fn distance(&self, i: Sample, c: Bin, row: &[Distance], query: &DVector<f64>) -> Result<Option<Distance>> {
        let neighbors = select(row, i, self.membership.members(c), self.config.neighbors);
        if neighbors.is_empty() {
            return Ok(None);
        }
        let ref points = DMatrix::from_fn(self.samples.d(), neighbors.len(), |r, k| {
            self.samples.row(neighbors[k])[r]
        });
        Hull::from((query, points))
            .distance(self.config.metric, self.config.solver)
            .map(Some)
            .map_err(|e| Error::Evaluation {
                sample: i,
                cluster: c,
                source: Box::new(e),
            })
    }
}
