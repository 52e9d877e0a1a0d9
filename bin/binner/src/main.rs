//! Binner Binary
//!
//! Reads a fragment feature table, assigns every fragment to the nearest
//! local cluster hull, and writes one bin per parent contig.
//!
//! Type "Q" + Enter to stop after the current pass.
use anyhow::Context;
use chb_clustering::*;
use chb_hull::Metric;
use chb_hull::Solver;
use clap::Parser;
use std::path::PathBuf;

const BINS_FILE: &str = "binning-assignment.csv";
const LABELS_FILE: &str = "fragment-labels.csv";

#[derive(Debug, Parser)]
#[command(name = "binner", about = "Convex hull binning of genome fragments")]
struct Args {
    /// Feature table with CONTIG_NAME, PARENT_NAME, CLUSTER and feature columns
    #[arg(long)]
    features: PathBuf,
    /// Operating directory for outputs, logs and the distance matrix
    #[arg(long, default_value = ".")]
    out: PathBuf,
    /// Nearest cluster members spanning each local hull
    #[arg(long, default_value_t = chb_core::DEFAULT_NEIGHBORS)]
    neighbors: usize,
    /// Maximum assignment passes
    #[arg(long, default_value_t = chb_core::DEFAULT_PASSES)]
    passes: usize,
    /// convex, affine or affine-qp
    #[arg(long, default_value_t = Metric::Convex)]
    metric: Metric,
    /// active-set or interior-point
    #[arg(long, default_value_t = Solver::ActiveSet)]
    solver: Solver,
    /// Memory-map the distance matrix from the operating directory
    #[arg(long)]
    disk: bool,
    /// Keep the distance matrix on disk for later runs (implies --disk)
    #[arg(long)]
    cache: bool,
    /// Revisit all points or only unassigned ones
    #[arg(long, default_value_t = Sweep::All)]
    sweep: Sweep,
    /// Seed for the visiting order
    #[arg(long)]
    seed: Option<u64>,
    /// Ground truth table with CONTIG_NAME and SPECIES columns
    #[arg(long)]
    truth: Option<PathBuf>,
    /// Also write per-fragment labels
    #[arg(long)]
    labels: bool,
}

impl Args {
    fn config(&self) -> Config {
        let storage = match self.disk || self.cache {
            false => Storage::Memory,
            true => Storage::Disk {
                path: self.out.join(chb_core::DISTANCE_MATRIX_FILE),
                keep: self.cache,
            },
        };
        let config = Config::default()
            .with_neighbors(self.neighbors)
            .with_passes(self.passes)
            .with_metric(self.metric)
            .with_solver(self.solver)
            .with_storage(storage)
            .with_sweep(self.sweep);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let logs = chb_core::log(&args.out).context("starting logs")?;
    log::debug!("{:<32}{:<32}", "log file", logs.display());
    chb_core::brb();
    let binner = Binner::new(args.config()).context("invalid configuration")?;
    let table = Table::read(&args.features).context("reading features")?;
    let outcome = binner.bin(&table).context("clustering fragments")?;
    log::info!("{:<32}{:<32}", "assignment", outcome.convergence);
    write_bins(&args.out.join(BINS_FILE), &outcome.bins).context("writing bins")?;
    if args.labels {
        write_labels(&args.out.join(LABELS_FILE), &table, &outcome.labels)
            .context("writing fragment labels")?;
    }
    if let Some(ref path) = outcome.matrix {
        log::info!("{:<32}{:<32}", "distance matrix kept", path.display());
    }
    if let Some(ref truth) = args.truth {
        let truth = read_truth(truth).context("reading ground truth")?;
        let quality = Quality::measure(&truth, &outcome.bins);
        log::info!("{:<32}{:<32}", "quality", quality);
    }
    Ok(())
}
