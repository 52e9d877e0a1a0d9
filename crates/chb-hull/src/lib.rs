//! Quadratic programming and hull distances for polytope clustering.
//!
//! Every hull distance reduces to a small dense quadratic program over the
//! barycentric coefficients of the reference points. This crate owns that
//! reduction and the solvers behind it.
//!
//! ## Core Types
//!
//! - [`Program`] — minimize ½xᵀPx + qᵀx subject to Gx ≤ h and Ax = b
//! - [`Solver`] — backend selection with active-set → interior-point fallback
//! - [`Metric`] — convex, affine, or affine-via-QP hull distance
//! - [`Hull`] — a query point paired with its reference points
//! - [`Projection`] — nearest hull point, distance, and coefficients
//!
//! ## Algorithms
//!
//! - [`Goldfarb`] — dual active-set method (Goldfarb & Idnani 1983)
//! - [`Interior`] — primal-dual interior point with Mehrotra correction
//! - [`nearest_positive_definite`] — Higham's nearest SPD matrix
mod goldfarb;
mod hull;
mod interior;
mod nearpd;
mod program;
mod solver;

pub use goldfarb::*;
pub use hull::*;
pub use interior::*;
pub use nearpd::*;
pub use program::*;
pub use solver::*;
