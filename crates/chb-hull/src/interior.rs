use super::*;
use chb_core::*;
use nalgebra::DMatrix;
use nalgebra::DVector;
use nalgebra::Dyn;
use nalgebra::LU;

/// Primal-dual interior-point QP solver with Mehrotra predictor-corrector.
///
/// Slack variables s turn G x ≤ h into G x + s = h with s ≥ 0, and each
/// iteration takes one damped Newton step on the perturbed KKT conditions.
/// Only positive semi-definite costs are required: the reduced Newton
/// system carries P + GᵀWG plus a small static regularization, which stays
/// solvable even when P itself is singular.
///
/// Programs without inequalities skip the barrier entirely and solve the
/// equality-constrained KKT system once.
pub struct Interior;

/// Factored reduced KKT matrix [[H, Aᵀ], [A, 0]] for one iteration.
struct Newton {
    lu: LU<f64, Dyn, Dyn>,
    kkt: DMatrix<f64>,
    n: usize,
}

impl Newton {
    fn new(hessian: &DMatrix<f64>, a: &DMatrix<f64>) -> Self {
        let n = hessian.nrows();
        let p = a.nrows();
        let mut kkt = DMatrix::zeros(n + p, n + p);
        kkt.view_mut((0, 0), (n, n)).copy_from(hessian);
        kkt.view_mut((0, n), (n, p)).copy_from(&a.transpose());
        kkt.view_mut((n, 0), (p, n)).copy_from(a);
        let diagonal = DVector::from_fn(n + p, |i, _| match i < n {
            true => INTERIOR_REGULARIZATION,
            false => -INTERIOR_REGULARIZATION,
        });
        let lu = (&kkt + DMatrix::from_diagonal(&diagonal)).lu();
        Self { lu, kkt, n }
    }

    /// Solves for (Δx, Δy), refining against the unregularized matrix.
    fn solve(&self, top: &DVector<f64>, bottom: &DVector<f64>) -> Result<(DVector<f64>, DVector<f64>), QpFailure> {
        let rhs = DVector::from_iterator(
            top.len() + bottom.len(),
            top.iter().chain(bottom.iter()).copied(),
        );
        let mut solution = self.lu.solve(&rhs).ok_or(QpFailure::Singular)?;
        for _ in 0..INTERIOR_REFINEMENT {
            let residual = &rhs - &self.kkt * &solution;
            solution += self.lu.solve(&residual).ok_or(QpFailure::Singular)?;
        }
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(QpFailure::NonFinite);
        }
        let dx = solution.rows(0, self.n).into_owned();
        let dy = solution.rows(self.n, bottom.len()).into_owned();
        Ok((dx, dy))
    }
}

/// Search direction in all four blocks.
struct Direction {
    x: DVector<f64>,
    y: DVector<f64>,
    s: DVector<f64>,
    z: DVector<f64>,
}

/// KKT residuals at the current iterate.
struct Residuals {
    /// P x + q + Aᵀy + Gᵀz
    dual: DVector<f64>,
    /// A x − b
    equality: DVector<f64>,
    /// G x + s − h
    inequality: DVector<f64>,
}

impl Residuals {
    /// Newton direction for complementarity residual rc, where the last
    /// block row reads Z Δs + S Δz = −rc.
    fn direction(
        &self,
        newton: &Newton,
        g: &DMatrix<f64>,
        s: &DVector<f64>,
        w: &DVector<f64>,
        rc: &DVector<f64>,
    ) -> Result<Direction, QpFailure> {
        let correction = rc.component_div(s);
        let top = -&self.dual - g.tr_mul(&w.component_mul(&self.inequality)) + g.tr_mul(&correction);
        let bottom = -&self.equality;
        let (x, y) = newton.solve(&top, &bottom)?;
        let gx = g * &x;
        let s = -&self.inequality - &gx;
        let z = w.component_mul(&(&self.inequality + &gx)) - correction;
        Ok(Direction { x, y, s, z })
    }
}

/// Largest α ≤ ∞ keeping v + α dv ≥ 0.
fn boundary(v: &DVector<f64>, dv: &DVector<f64>) -> f64 {
    v.iter()
        .zip(dv.iter())
        .filter(|(_, d)| **d < 0.)
        .map(|(v, d)| -v / d)
        .fold(f64::INFINITY, f64::min)
}

impl Interior {
    /// Equality-constrained (or unconstrained) case: one KKT solve.
    fn direct(&self, program: &Program, p: &DMatrix<f64>) -> Result<DVector<f64>, QpFailure> {
        let newton = Newton::new(p, program.a());
        let (x, y) = newton.solve(&-program.q(), program.b())?;
        let stationarity = p * &x + program.q() + program.a().tr_mul(&y);
        let scale = 1. + program.q().norm() + p.norm() * x.norm();
        if stationarity.norm() > FEASIBILITY_TOLERANCE * scale {
            return Err(QpFailure::NotConverged { iterations: 1 });
        }
        program.accept(x)
    }
}

impl Backend for Interior {
    fn solve(&self, program: &Program) -> Result<DVector<f64>, QpFailure> {
        program.check()?;
        let ref p = program.symmetrized();
        if program.m() == 0 {
            return self.direct(program, p);
        }
        let (q, g, h, a, b) = (program.q(), program.g(), program.h(), program.a(), program.b());
        let m = program.m() as f64;
        let mut x = DVector::<f64>::zeros(program.n());
        let mut y = DVector::<f64>::zeros(program.meq());
        let mut s = DVector::<f64>::from_element(program.m(), 1.);
        let mut z = DVector::<f64>::from_element(program.m(), 1.);
        for iteration in 0..INTERIOR_ITERATIONS {
            let residuals = Residuals {
                dual: p * &x + q + a.tr_mul(&y) + g.tr_mul(&z),
                equality: a * &x - b,
                inequality: g * &x + &s - h,
            };
            let gap = s.dot(&z);
            let mu = gap / m;
            if !mu.is_finite() || residuals.dual.iter().any(|v| !v.is_finite()) {
                return Err(QpFailure::NonFinite);
            }
            let primal = (residuals.equality.norm() / b.norm().max(1.))
                .max(residuals.inequality.norm() / h.norm().max(1.));
            let dual = residuals.dual.norm() / q.norm().max(1.);
            let cost = program.objective(&x);
            if primal <= INTERIOR_FEASTOL
                && dual <= INTERIOR_FEASTOL
                && (gap <= INTERIOR_ABSTOL || gap <= INTERIOR_RELTOL * cost.abs())
            {
                log::trace!("{:<32}{:<32}", "interior point converged", iteration);
                return program.accept(x);
            }
            let w = z.component_div(&s);
            let weighted = DMatrix::from_fn(program.m(), program.n(), |i, j| w[i] * g[(i, j)]);
            let ref newton = Newton::new(&(p + g.tr_mul(&weighted)), a);
            // predictor
            let rc = s.component_mul(&z);
            let affine = residuals.direction(newton, g, &s, &w, &rc)?;
            let alpha = boundary(&s, &affine.s)
                .min(boundary(&z, &affine.z))
                .min(1.);
            let mu_affine = (&s + &affine.s * alpha).dot(&(&z + &affine.z * alpha)) / m;
            let sigma = (mu_affine / mu).powi(3).clamp(0., 1.);
            // corrector
            let rc = rc + affine.s.component_mul(&affine.z)
                - DVector::from_element(program.m(), sigma * mu);
            let step = residuals.direction(newton, g, &s, &w, &rc)?;
            let alpha = (INTERIOR_STEP_DAMPING * boundary(&s, &step.s).min(boundary(&z, &step.z))).min(1.);
            x += &step.x * alpha;
            y += &step.y * alpha;
            s += &step.s * alpha;
            z += &step.z * alpha;
        }
        Err(QpFailure::NotConverged {
            iterations: INTERIOR_ITERATIONS,
        })
    }
}
