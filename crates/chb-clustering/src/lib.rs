//! Convex hull binning of genome fragments.
//!
//! Every fragment is a feature vector. Starting from a handful of seeded
//! clusters, each pass visits fragments in random order and moves every one
//! to the cluster whose local hull (spanned by its nearest members) lies
//! closest. Fragment labels are finally reconciled per parent contig by
//! majority vote.
//!
//! ## Pipeline
//!
//! 1. **Table** — read fragment features and seed labels
//! 2. **Matrix** — pairwise Euclidean distances, resident or memory-mapped
//! 3. **Assignment** — sequential relaxation until labels stop moving
//! 4. **Vote** — one bin per parent contig
//!
//! ## Core Types
//!
//! - [`Samples`] — N×D feature matrix
//! - [`Rows`] — row provider over a distance matrix
//! - [`Matrix`] — [`Resident`] or [`Mapped`] distance storage
//! - [`Label`] / [`Labels`] — per-fragment cluster state
//! - [`Membership`] — per-cluster member index with O(1) moves
//! - [`Assignment`] — the iterative assignment loop
//! - [`Config`] — every tunable of a run
//! - [`Binner`] — end-to-end driver
mod assign;
mod binner;
mod config;
mod label;
mod mapped;
mod matrix;
mod membership;
mod neighbors;
mod quality;
mod resident;
mod rows;
mod samples;
mod table;
mod vote;

pub use assign::*;
pub use binner::*;
pub use config::*;
pub use label::*;
pub use mapped::*;
pub use matrix::*;
pub use membership::*;
pub use neighbors::*;
pub use quality::*;
pub use resident::*;
pub use rows::*;
pub use samples::*;
pub use table::*;
pub use vote::*;
