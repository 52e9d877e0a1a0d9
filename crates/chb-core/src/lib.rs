//! Core type aliases, constants, and errors for convex hull binning.
//!
//! This crate provides the foundational types and tunable parameters
//! shared by the hull geometry and clustering crates.
mod error;

pub use error::*;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Euclidean distances, hull distances, and QP objective values.
pub type Distance = f64;
/// Index of a cluster (bin) in [0, K).
pub type Bin = usize;
/// Index of a sample point (fragment) in [0, N).
pub type Sample = usize;

// ============================================================================
// CLUSTERING DEFAULTS
// ============================================================================
/// Nearest members of a cluster used to span its local hull.
pub const DEFAULT_NEIGHBORS: usize = 15;
/// Maximum assignment passes before giving up on convergence.
pub const DEFAULT_PASSES: usize = 10;
/// File name of the disk-backed distance matrix inside an operating directory.
pub const DISTANCE_MATRIX_FILE: &str = "distance_matrix.f64";
/// Sentinel used in feature tables for points without an initial cluster.
pub const UNASSIGNED: i64 = -1;

// ============================================================================
// QUADRATIC PROGRAMMING
// Tolerances follow the defaults of common dense QP packages.
// ============================================================================
/// Active-set iteration cap, as a multiple of (variables + constraints).
pub const ACTIVE_SET_ITERATION_FACTOR: usize = 16;
/// Below this, a step direction or curvature is treated as zero.
pub const ACTIVE_SET_EPSILON: Distance = 1e-12;
/// Interior-point Newton iterations before declaring non-convergence.
pub const INTERIOR_ITERATIONS: usize = 100;
/// Absolute duality gap tolerance.
pub const INTERIOR_ABSTOL: Distance = 1e-7;
/// Relative duality gap tolerance.
pub const INTERIOR_RELTOL: Distance = 1e-6;
/// Primal and dual residual tolerance.
pub const INTERIOR_FEASTOL: Distance = 1e-7;
/// Static regularization of the reduced KKT system (keeps PSD costs solvable).
pub const INTERIOR_REGULARIZATION: Distance = 1e-10;
/// Iterative refinement steps applied to each regularized KKT solve.
pub const INTERIOR_REFINEMENT: usize = 2;
/// Fraction of the distance to the boundary taken by each interior step.
pub const INTERIOR_STEP_DAMPING: Distance = 0.99;
/// Constraint violation accepted when validating any backend's solution.
pub const FEASIBILITY_TOLERANCE: Distance = 1e-6;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Log files live under this directory inside the operating directory.
pub const LOG_DIR: &str = "logs";

/// Start a binning run's logs: INFO to the terminal, DEBUG to
/// `<out>/logs/binner-<unix-seconds>.log`.
#[cfg(feature = "cli")]
pub fn log(out: &std::path::Path) -> std::io::Result<std::path::PathBuf> {
    let (path, file) = logfile(out)?;
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let file = simplelog::WriteLogger::new(log::LevelFilter::Debug, config.clone(), file);
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).map_err(std::io::Error::other)?;
    Ok(path)
}

/// Creates a fresh, run-stamped log file under `<out>/logs`.
pub fn logfile(out: &std::path::Path) -> std::io::Result<(std::path::PathBuf, std::fs::File)> {
    let dir = out.join(LOG_DIR);
    std::fs::create_dir_all(&dir)?;
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|t| t.as_secs())
        .unwrap_or_default();
    let path = dir.join(format!("binner-{}.log", secs));
    let file = std::fs::File::create(&path)?;
    Ok((path, file))
}

/// Global interrupt flag for graceful shutdown at pass boundaries.
static INTERRUPTED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if a graceful shutdown was requested.
pub fn interrupted() -> bool {
    INTERRUPTED.load(std::sync::atomic::Ordering::Relaxed)
}

/// Request a graceful shutdown. The assignment loop stops after its current pass.
pub fn interrupt() {
    INTERRUPTED.store(true, std::sync::atomic::Ordering::Relaxed);
}

/// Register graceful interrupt handler. Type "Q" + Enter to stop after current pass.
#[cfg(feature = "cli")]
pub fn brb() {
    std::thread::spawn(|| {
        loop {
            let ref mut buffer = String::new();
            match std::io::stdin().read_line(buffer) {
                Ok(0) | Err(_) => break,
                Ok(_) if buffer.trim().to_uppercase() == "Q" => {
                    log::warn!("graceful interrupt requested, finishing current pass...");
                    interrupt();
                    break;
                }
                Ok(_) => continue,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_into_operating_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = logfile(&dir.path().join("run")).unwrap();
        assert!(path.is_file());
        assert_eq!(path.parent(), Some(dir.path().join("run").join(LOG_DIR).as_path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("binner-") && name.ends_with(".log"));
    }

    #[test]
    fn interrupt_is_sticky() {
        assert!(!interrupted());
        interrupt();
        assert!(interrupted());
        interrupt();
        assert!(interrupted());
    }
}
