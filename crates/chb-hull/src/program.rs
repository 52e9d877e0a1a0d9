use chb_core::QpFailure;
use nalgebra::DMatrix;
use nalgebra::DVector;

/// A dense convex quadratic program.
///
/// ```text
/// minimize    ½ xᵀ P x + qᵀ x
/// subject to  G x ≤ h
///             A x = b
/// ```
///
/// Either constraint block may have zero rows. Instances are transient:
/// one is built per hull evaluation and dropped after solving.
#[derive(Debug, Clone)]
pub struct Program {
    p: DMatrix<f64>,
    q: DVector<f64>,
    g: DMatrix<f64>,
    h: DVector<f64>,
    a: DMatrix<f64>,
    b: DVector<f64>,
}

impl Program {
    /// Unconstrained program over n = q.len() variables.
    pub fn new(p: DMatrix<f64>, q: DVector<f64>) -> Self {
        let n = q.len();
        Self {
            p,
            q,
            g: DMatrix::zeros(0, n),
            h: DVector::zeros(0),
            a: DMatrix::zeros(0, n),
            b: DVector::zeros(0),
        }
    }
    /// Adds the inequality block G x ≤ h.
    pub fn subject_to(mut self, g: DMatrix<f64>, h: DVector<f64>) -> Self {
        self.g = g;
        self.h = h;
        self
    }
    /// Adds the equality block A x = b.
    pub fn such_that(mut self, a: DMatrix<f64>, b: DVector<f64>) -> Self {
        self.a = a;
        self.b = b;
        self
    }

    pub fn p(&self) -> &DMatrix<f64> {
        &self.p
    }
    pub fn q(&self) -> &DVector<f64> {
        &self.q
    }
    pub fn g(&self) -> &DMatrix<f64> {
        &self.g
    }
    pub fn h(&self) -> &DVector<f64> {
        &self.h
    }
    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }
    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }
    /// Number of decision variables.
    pub fn n(&self) -> usize {
        self.q.len()
    }
    /// Number of inequality rows.
    pub fn m(&self) -> usize {
        self.h.len()
    }
    /// Number of equality rows.
    pub fn meq(&self) -> usize {
        self.b.len()
    }

    /// Verifies that every block agrees with n and that inputs are finite.
    pub fn check(&self) -> Result<(), QpFailure> {
        let n = self.n();
        let shapes = self.p.shape() == (n, n)
            && self.g.shape() == (self.m(), n)
            && self.a.shape() == (self.meq(), n);
        if !shapes {
            return Err(QpFailure::Dimension);
        }
        let finite = self.p.iter().all(|v| v.is_finite())
            && self.q.iter().all(|v| v.is_finite())
            && self.g.iter().all(|v| v.is_finite())
            && self.h.iter().all(|v| v.is_finite())
            && self.a.iter().all(|v| v.is_finite())
            && self.b.iter().all(|v| v.is_finite());
        match finite {
            true => Ok(()),
            false => Err(QpFailure::NonFinite),
        }
    }

    /// Cost matrix forced symmetric. Backends never trust P to be.
    pub fn symmetrized(&self) -> DMatrix<f64> {
        super::symmetrize(&self.p)
    }

    /// ½ xᵀ P x + qᵀ x.
    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        0.5 * x.dot(&(&self.p * x)) + self.q.dot(x)
    }

    /// Largest constraint violation at x: max |Ax − b| and max (Gx − h)₊.
    pub fn violation(&self, x: &DVector<f64>) -> f64 {
        let equalities = (&self.a * x - &self.b)
            .iter()
            .map(|r| r.abs())
            .fold(0., f64::max);
        let inequalities = (&self.g * x - &self.h)
            .iter()
            .map(|r| r.max(0.))
            .fold(0., f64::max);
        equalities.max(inequalities)
    }

    /// Accepts x only if it is finite and feasible within tolerance.
    pub fn accept(&self, x: DVector<f64>) -> Result<DVector<f64>, QpFailure> {
        if x.iter().any(|v| !v.is_finite()) {
            return Err(QpFailure::NonFinite);
        }
        let scale = 1. + self.b.amax().max(self.h.amax());
        if self.violation(&x) > chb_core::FEASIBILITY_TOLERANCE * scale {
            return Err(QpFailure::Infeasible);
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simplex(n: usize) -> Program {
        Program::new(DMatrix::identity(n, n), DVector::zeros(n))
            .subject_to(-DMatrix::identity(n, n), DVector::zeros(n))
            .such_that(DMatrix::from_element(1, n, 1.), DVector::from_element(1, 1.))
    }

    #[test]
    fn counts_rows() {
        let program = simplex(3);
        assert_eq!(program.n(), 3);
        assert_eq!(program.m(), 3);
        assert_eq!(program.meq(), 1);
        assert!(program.check().is_ok());
    }

    #[test]
    fn rejects_bad_shapes() {
        let program = Program::new(DMatrix::identity(2, 2), DVector::zeros(3));
        assert_eq!(program.check(), Err(QpFailure::Dimension));
    }

    #[test]
    fn measures_violation() {
        let program = simplex(2);
        let inside = DVector::from_vec(vec![0.5, 0.5]);
        let outside = DVector::from_vec(vec![1.5, -0.25]);
        assert!(program.violation(&inside) < 1e-15);
        assert!((program.violation(&outside) - 0.25).abs() < 1e-15);
        assert!(program.accept(inside).is_ok());
        assert_eq!(program.accept(outside), Err(QpFailure::Infeasible));
    }
}
