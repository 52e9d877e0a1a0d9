use super::*;
use chb_core::*;
use nalgebra::DMatrix;
use nalgebra::DVector;

/// Dual active-set QP solver (Goldfarb & Idnani 1983).
///
/// Equalities are eliminated first: with x = x₀ + Zw and the columns of Z
/// spanning null(A), what remains is an inequality-only problem in w. The
/// dual method then starts from the unconstrained minimizer −P⁻¹q, which is
/// dual feasible, and repeatedly adds the most violated inequality while
/// keeping every active multiplier non-negative.
///
/// # Requirements
///
/// The reduced cost ZᵀPZ must be symmetric positive definite, so it is
/// passed through [`nearest_positive_definite`] first. Near-singular costs
/// still lose precision through the inverse, so every solution is checked
/// against the KKT conditions of the unrepaired problem and rejected when
/// they fail, leaving the caller free to fall back.
pub struct Goldfarb;

/// Inequality in native form nᵀx ≥ c.
#[derive(Debug, Clone)]
struct Constraint {
    normal: DVector<f64>,
    bound: f64,
}

/// Working state of the dual method.
struct Dual {
    /// Inverse of the repaired cost matrix.
    inverse: DMatrix<f64>,
    constraints: Vec<Constraint>,
    /// Indices into `constraints`, in order of activation.
    active: Vec<usize>,
    /// Lagrange multipliers aligned with `active`.
    multipliers: Vec<f64>,
    x: DVector<f64>,
    iterations: usize,
    limit: usize,
}

impl Dual {
    /// nᵀx − c. Negative means violated.
    fn slack(&self, j: usize) -> f64 {
        let ref c = self.constraints[j];
        c.normal.dot(&self.x) - c.bound
    }

    /// Primal step direction z and dual direction r for adding `normal`
    /// to the current active set N:
    /// r = (NᵀP⁻¹N)⁻¹NᵀP⁻¹n and z = P⁻¹(n − Nr).
    fn directions(&self, normal: &DVector<f64>) -> Result<(DVector<f64>, DVector<f64>), QpFailure> {
        let projected = &self.inverse * normal;
        if self.active.is_empty() {
            return Ok((projected, DVector::zeros(0)));
        }
        let columns = self
            .active
            .iter()
            .map(|&k| self.constraints[k].normal.clone())
            .collect::<Vec<DVector<f64>>>();
        let n = DMatrix::from_columns(&columns);
        let inverse_n = &self.inverse * &n;
        let r = n
            .tr_mul(&inverse_n)
            .cholesky()
            .ok_or(QpFailure::Singular)?
            .solve(&inverse_n.tr_mul(normal));
        let z = projected - inverse_n * &r;
        Ok((z, r))
    }

    /// Most violated inactive constraint, if any.
    fn violated(&self) -> Option<usize> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(j, _)| !self.active.contains(j))
            .map(|(j, c)| (j, self.slack(j), c.bound))
            .filter(|(_, s, c)| *s < -ACTIVE_SET_EPSILON * (1. + c.abs()))
            .min_by(|(_, s1, _), (_, s2, _)| s1.total_cmp(s2))
            .map(|(j, _, _)| j)
    }

    /// Makes constraint j active, dropping blocking constraints on the way.
    fn add(&mut self, j: usize) -> Result<(), QpFailure> {
        let normal = self.constraints[j].normal.clone();
        let scale = normal.dot(&(&self.inverse * &normal));
        let mut u = self.multipliers.clone();
        u.push(0.);
        loop {
            self.iterations += 1;
            if self.iterations > self.limit {
                return Err(QpFailure::NotConverged {
                    iterations: self.iterations,
                });
            }
            let (z, r) = self.directions(&normal)?;
            let slack = self.slack(j);
            if !slack.is_finite() {
                return Err(QpFailure::NonFinite);
            }
            let curvature = z.dot(&normal);
            let dependent = curvature <= ACTIVE_SET_EPSILON * scale;
            let full = match dependent {
                true => f64::INFINITY,
                false => -slack / curvature,
            };
            let (partial, blocking) = self
                .active
                .iter()
                .enumerate()
                .filter(|(i, _)| r[*i] > ACTIVE_SET_EPSILON)
                .map(|(i, _)| (u[i] / r[i], Some(i)))
                .fold((f64::INFINITY, None), |a, b| if b.0 < a.0 { b } else { a });
            let t = full.min(partial);
            if !t.is_finite() {
                return Err(QpFailure::Infeasible);
            }
            u.iter_mut()
                .zip(r.iter())
                .for_each(|(u, r)| *u -= t * r);
            if let Some(last) = u.last_mut() {
                *last += t;
            }
            if !dependent {
                self.x += &z * t;
            }
            match blocking {
                Some(i) if partial < full => {
                    self.active.remove(i);
                    u.remove(i);
                }
                _ => {
                    self.active.push(j);
                    self.multipliers = u;
                    return Ok(());
                }
            }
        }
    }

    /// Stationarity P x + q = N u against the unrepaired cost.
    fn stationary(&self, q: &DVector<f64>, p: &DMatrix<f64>) -> bool {
        let residual = self
            .active
            .iter()
            .zip(self.multipliers.iter())
            .fold(p * &self.x + q, |acc, (&k, &u)| {
                acc - &self.constraints[k].normal * u
            });
        let scale = 1. + q.norm() + p.norm() * self.x.norm();
        residual.norm() <= FEASIBILITY_TOLERANCE * scale
    }
}

/// Equality elimination x = x₀ + Zw.
struct Reduction {
    /// Least-norm solution of A x = b.
    origin: DVector<f64>,
    /// Orthonormal basis of null(A), one column per free direction.
    basis: DMatrix<f64>,
}

impl Reduction {
    fn new(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<Self, QpFailure> {
        let n = a.ncols();
        let eigen = a.tr_mul(a).symmetric_eigen();
        let cutoff = n as f64 * f64::EPSILON * eigen.eigenvalues.amax();
        let (range, null) = (0..n).partition::<Vec<usize>, _>(|&k| eigen.eigenvalues[k] > cutoff);
        let ref atb = a.tr_mul(b);
        let origin = range
            .iter()
            .map(|&k| (eigen.eigenvectors.column(k), eigen.eigenvalues[k]))
            .fold(DVector::zeros(n), |acc, (v, lambda)| acc + v * (v.dot(atb) / lambda));
        if (a * &origin - b).amax() > FEASIBILITY_TOLERANCE * (1. + b.amax()) {
            return Err(QpFailure::Infeasible);
        }
        let basis = match null.is_empty() {
            true => DMatrix::zeros(n, 0),
            false => DMatrix::from_columns(
                &null
                    .iter()
                    .map(|&k| eigen.eigenvectors.column(k).into_owned())
                    .collect::<Vec<DVector<f64>>>(),
            ),
        };
        Ok(Self { origin, basis })
    }

    /// The inequality-only problem over w.
    fn reduce(&self, program: &Program) -> Program {
        let ref z = self.basis;
        let p = z.tr_mul(&(program.p() * z));
        let q = z.tr_mul(&(program.p() * &self.origin + program.q()));
        let g = program.g() * z;
        let h = program.h() - program.g() * &self.origin;
        Program::new(p, q).subject_to(g, h)
    }

    fn lift(&self, w: &DVector<f64>) -> DVector<f64> {
        &self.origin + &self.basis * w
    }
}

impl Goldfarb {
    /// Dual method on a program without equalities.
    fn dual(program: &Program) -> Result<DVector<f64>, QpFailure> {
        let symmetric = program.symmetrized();
        let repaired = nearest_positive_definite(&symmetric)?;
        let inverse = repaired
            .cholesky()
            .ok_or(QpFailure::NotPositiveDefinite)?
            .inverse();
        let inverse = symmetrize(&inverse);
        let x = -(&inverse * program.q());
        if x.iter().any(|v| !v.is_finite()) {
            return Err(QpFailure::NonFinite);
        }
        let constraints = (0..program.m())
            .map(|i| Constraint {
                normal: -program.g().row(i).transpose(),
                bound: -program.h()[i],
            })
            .collect::<Vec<_>>();
        let limit = ACTIVE_SET_ITERATION_FACTOR * (program.n() + constraints.len() + 1);
        let mut dual = Dual {
            inverse,
            constraints,
            active: Vec::new(),
            multipliers: Vec::new(),
            x,
            iterations: 0,
            limit,
        };
        while let Some(j) = dual.violated() {
            dual.add(j)?;
        }
        if !dual.stationary(program.q(), &symmetric) {
            return Err(QpFailure::NotConverged {
                iterations: dual.iterations,
            });
        }
        Ok(dual.x)
    }
}

impl Backend for Goldfarb {
    fn solve(&self, program: &Program) -> Result<DVector<f64>, QpFailure> {
        program.check()?;
        let x = match program.meq() {
            0 => Self::dual(program)?,
            _ => {
                let reduction = Reduction::new(program.a(), program.b())?;
                match reduction.basis.ncols() {
                    0 => reduction.origin,
                    _ => reduction.lift(&Self::dual(&reduction.reduce(program))?),
                }
            }
        };
        program.accept(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(values)
    }

    #[test]
    fn solves_halfspace() {
        let program = Program::new(DMatrix::identity(2, 2), vector(&[-1., -1.]))
            .subject_to(DMatrix::from_row_slice(1, 2, &[1., 1.]), vector(&[1.]));
        let x = Goldfarb.solve(&program).unwrap();
        assert!((x - vector(&[0.5, 0.5])).norm() < 1e-9);
    }

    #[test]
    fn solves_simplex() {
        let program = Program::new(DMatrix::identity(2, 2), vector(&[0., 0.]))
            .subject_to(-DMatrix::identity(2, 2), vector(&[0., 0.]))
            .such_that(DMatrix::from_row_slice(1, 2, &[1., 1.]), vector(&[1.]));
        let x = Goldfarb.solve(&program).unwrap();
        assert!((x - vector(&[0.5, 0.5])).norm() < 1e-9);
    }

    #[test]
    fn projects_onto_face() {
        let program = Program::new(DMatrix::identity(2, 2) * 2., vector(&[-4., -2.]))
            .subject_to(
                DMatrix::from_row_slice(3, 2, &[1., 1., -1., 0., 0., -1.]),
                vector(&[1., 0., 0.]),
            );
        let x = Goldfarb.solve(&program).unwrap();
        assert!((x - vector(&[1., 0.])).norm() < 1e-9);
    }

    #[test]
    fn drops_blocking_constraint() {
        // x₁ ≥ 2 enters first, then x₁ ≥ 3 makes it redundant
        let program = Program::new(DMatrix::identity(2, 2), vector(&[0., 0.]))
            .subject_to(
                DMatrix::from_row_slice(2, 2, &[-1., 0., -0.5, 0.]),
                vector(&[-2., -1.5]),
            );
        let x = Goldfarb.solve(&program).unwrap();
        assert!((x - vector(&[3., 0.])).norm() < 1e-9);
    }

    #[test]
    fn unconstrained_minimum() {
        let p = DMatrix::from_row_slice(2, 2, &[4., 1., 1., 3.]);
        let program = Program::new(p, vector(&[1., 2.]));
        let x = Goldfarb.solve(&program).unwrap();
        let expected = vector(&[-1. / 11., -7. / 11.]);
        assert!((x - expected).norm() < 1e-9);
    }

    #[test]
    fn eliminates_equalities() {
        // singular Gram of a triangle with a vertex at the origin
        let points = DMatrix::from_row_slice(2, 3, &[0., 1., 0., 0., 0., 1.]);
        let query = vector(&[1., 1.]);
        let program = Program::new(points.tr_mul(&points) * 2., points.tr_mul(&query) * -2.)
            .subject_to(-DMatrix::identity(3, 3), DVector::zeros(3))
            .such_that(DMatrix::from_element(1, 3, 1.), vector(&[1.]));
        let x = Goldfarb.solve(&program).unwrap();
        assert!((x - vector(&[0., 0.5, 0.5])).norm() < 1e-9);
    }

    #[test]
    fn detects_infeasible() {
        let program = Program::new(DMatrix::identity(1, 1), vector(&[0.]))
            .subject_to(DMatrix::from_row_slice(2, 1, &[1., -1.]), vector(&[-1., -1.]));
        assert!(Goldfarb.solve(&program).is_err());
    }

    #[test]
    fn detects_inconsistent_equalities() {
        let program = Program::new(DMatrix::identity(2, 2), vector(&[0., 0.]))
            .such_that(DMatrix::from_row_slice(2, 2, &[1., 1., 1., 1.]), vector(&[0., 1.]));
        assert_eq!(Goldfarb.solve(&program), Err(QpFailure::Infeasible));
    }

    #[test]
    fn rejects_zero_cost() {
        let program = Program::new(DMatrix::zeros(2, 2), vector(&[1., 1.]))
            .subject_to(-DMatrix::identity(2, 2), vector(&[0., 0.]));
        assert!(Goldfarb.solve(&program).is_err());
    }
}
