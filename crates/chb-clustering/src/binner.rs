use super::*;
use chb_core::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything a binning run produces.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Elected bin per parent contig.
    pub bins: BTreeMap<String, Bin>,
    /// Final bin per fragment, in table order.
    pub labels: Vec<Bin>,
    pub convergence: Convergence,
    /// Distance matrix file left on disk, when asked to keep it or when an
    /// earlier run had already cached it.
    pub matrix: Option<PathBuf>,
}

/// End-to-end driver: distances, assignment, then the per-contig vote.
#[derive(Debug, Clone, Default)]
pub struct Binner {
    config: Config,
}

impl Binner {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bin(&self, table: &Table) -> Result<Outcome> {
        let ref config = self.config;
        log::info!("{:<32}{:<32}", "hull metric", config.metric);
        log::info!("{:<32}{:<32}", "qp solver", config.solver);
        log::info!("{:<32}{:<32}", "neighbors", config.neighbors);
        log::info!("{:<32}{:<32}", "sweep", config.sweep);
        let samples = table.samples();
        let matrix = Matrix::build(samples, &config.storage)?;
        let assigned = Assignment::new(&matrix, samples, table.labels().clone(), config)
            .and_then(|assignment| assignment.run());
        let kept = matrix.release(config.storage.keep())?;
        let (labels, convergence) = assigned?;
        let labels = labels.bins()?;
        let bins = vote(table.parents(), &labels)?;
        log::info!("{:<32}{:<32}", "contigs binned", bins.len());
        Ok(Outcome {
            bins,
            labels,
            convergence,
            matrix: kept,
        })
    }
}
