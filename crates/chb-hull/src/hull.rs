use super::*;
use chb_core::*;
use nalgebra::DMatrix;
use nalgebra::DVector;

/// How a query is measured against a set of reference points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// Coefficients sum to one and are non-negative.
    #[default]
    Convex,
    /// Closed-form orthogonal projection onto the affine span.
    Affine,
    /// Affine span through the QP, coefficients only sum to one.
    AffineQp,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Convex => write!(f, "convex"),
            Self::Affine => write!(f, "affine"),
            Self::AffineQp => write!(f, "affine-qp"),
        }
    }
}

impl TryFrom<&str> for Metric {
    type Error = Error;
    fn try_from(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "convex" => Ok(Self::Convex),
            "affine" => Ok(Self::Affine),
            "affine-qp" | "affine_qp" => Ok(Self::AffineQp),
            _ => Err(Error::UnknownMetric(s.to_string())),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(s)
    }
}

/// Nearest point of a hull to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub point: DVector<f64>,
    pub distance: Distance,
    /// Barycentric weights over the reference points, when a QP produced them.
    pub coefficients: Option<DVector<f64>>,
}

/// A query point and the reference points whose hull it is measured against.
///
/// Reference points are the columns of a D×n matrix.
#[derive(Debug, Clone, Copy)]
pub struct Hull<'a> {
    query: &'a DVector<f64>,
    points: &'a DMatrix<f64>,
}

impl<'a> From<(&'a DVector<f64>, &'a DMatrix<f64>)> for Hull<'a> {
    fn from((query, points): (&'a DVector<f64>, &'a DMatrix<f64>)) -> Self {
        Self { query, points }
    }
}

impl Hull<'_> {
    pub fn project(&self, metric: Metric, solver: Solver) -> Result<Projection> {
        self.check()?;
        match metric {
            Metric::Convex => self.convex(solver),
            Metric::Affine => self.affine(),
            Metric::AffineQp => self.affine_qp(solver),
        }
    }

    pub fn distance(&self, metric: Metric, solver: Solver) -> Result<Distance> {
        self.project(metric, solver).map(|p| p.distance)
    }

    /// min ‖Xα − x‖² subject to Σα = 1, α ≥ 0.
    pub fn convex(&self, solver: Solver) -> Result<Projection> {
        self.check()?;
        let n = self.points.ncols();
        if n == 1 {
            return Ok(self.combine(DVector::from_element(1, 1.)));
        }
        let program = self
            .program()
            .subject_to(-DMatrix::identity(n, n), DVector::zeros(n));
        let alpha = solver.solve(&program)?;
        Ok(self.combine(alpha))
    }

    /// min ‖Xα − x‖² subject to Σα = 1.
    pub fn affine_qp(&self, solver: Solver) -> Result<Projection> {
        self.check()?;
        if self.points.ncols() == 1 {
            return Ok(self.combine(DVector::from_element(1, 1.)));
        }
        let alpha = solver.solve(&self.program())?;
        Ok(self.combine(alpha))
    }

    /// Residual of x − μ after removing its component in the span of the
    /// centered reference points.
    pub fn affine(&self) -> Result<Projection> {
        self.check()?;
        let (d, n) = self.points.shape();
        let mean = self.points.column_mean();
        let centered = DMatrix::from_fn(d, n, |i, j| self.points[(i, j)] - mean[i]);
        let offset = self.query - &mean;
        let svd = centered.svd(true, false);
        let u = svd.u.ok_or(Error::Solver(QpFailure::Singular))?;
        let cutoff = d.max(n) as f64 * f64::EPSILON * svd.singular_values.max();
        let inside = svd
            .singular_values
            .iter()
            .enumerate()
            .filter(|(_, s)| **s > cutoff)
            .map(|(k, _)| u.column(k))
            .fold(DVector::zeros(d), |acc, q| acc + q * q.dot(&offset));
        let residual = offset - &inside;
        Ok(Projection {
            point: mean + inside,
            distance: residual.norm(),
            coefficients: None,
        })
    }

    /// P = 2XᵀX, q = −2Xᵀx, with the sum-to-one equality.
    fn program(&self) -> Program {
        let n = self.points.ncols();
        let p = self.points.tr_mul(self.points) * 2.;
        let q = self.points.tr_mul(self.query) * -2.;
        Program::new(p, q).such_that(DMatrix::from_element(1, n, 1.), DVector::from_element(1, 1.))
    }

    fn combine(&self, alpha: DVector<f64>) -> Projection {
        let point = self.points * &alpha;
        let distance = (&point - self.query).norm();
        Projection {
            point,
            distance,
            coefficients: Some(alpha),
        }
    }

    fn check(&self) -> Result<()> {
        if self.points.ncols() == 0 {
            return Err(Error::EmptyReference);
        }
        if self.points.nrows() != self.query.len() {
            return Err(Error::DimensionMismatch {
                expected: self.query.len(),
                got: self.points.nrows(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn columns(points: &[[f64; 2]]) -> DMatrix<f64> {
        DMatrix::from_fn(2, points.len(), |i, j| points[j][i])
    }

    fn triangle() -> DMatrix<f64> {
        columns(&[[0., 0.], [1., 0.], [0., 1.]])
    }

    #[test]
    fn sole_reference_is_zero() {
        let query = DVector::from_vec(vec![3., -2.]);
        let points = columns(&[[3., -2.]]);
        let hull = Hull::from((&query, &points));
        for metric in [Metric::Convex, Metric::Affine, Metric::AffineQp] {
            let d = hull.distance(metric, Solver::default()).unwrap();
            assert!(d.abs() < 1e-12, "{metric}: {d}");
        }
    }

    #[test]
    fn projects_outside_triangle() {
        let query = DVector::from_vec(vec![1., 1.]);
        let ref points = triangle();
        let projection = Hull::from((&query, points)).convex(Solver::ActiveSet).unwrap();
        assert!((projection.distance - 0.5f64.sqrt()).abs() < 1e-9);
        assert!((projection.point - DVector::from_vec(vec![0.5, 0.5])).norm() < 1e-9);
    }

    #[test]
    fn inside_triangle_is_zero() {
        let query = DVector::from_vec(vec![0.2, 0.3]);
        let ref points = triangle();
        let d = Hull::from((&query, points))
            .distance(Metric::Convex, Solver::ActiveSet)
            .unwrap();
        assert!(d < 1e-9);
    }

    #[test]
    fn affine_relaxes_convex() {
        let query = DVector::from_vec(vec![5., 3.]);
        let points = columns(&[[0., 0.], [1., 0.]]);
        let hull = Hull::from((&query, &points));
        let convex = hull.distance(Metric::Convex, Solver::ActiveSet).unwrap();
        let affine = hull.distance(Metric::Affine, Solver::ActiveSet).unwrap();
        let affine_qp = hull.distance(Metric::AffineQp, Solver::ActiveSet).unwrap();
        assert!((convex - 5.).abs() < 1e-9);
        assert!((affine - 3.).abs() < 1e-9);
        assert!((affine_qp - 3.).abs() < 1e-6);
    }

    #[test]
    fn coefficients_are_barycentric() {
        let ref mut rng = SmallRng::seed_from_u64(3);
        let query = DVector::from_fn(5, |_, _| rng.random_range(-2.0..2.0));
        let points = DMatrix::from_fn(5, 4, |_, _| rng.random_range(-1.0..1.0));
        let projection = Hull::from((&query, &points)).convex(Solver::default()).unwrap();
        let alpha = projection.coefficients.unwrap();
        assert!((alpha.sum() - 1.).abs() < 1e-6);
        assert!(alpha.min() >= -1e-6);
        assert!(projection.distance >= 0.);
    }

    #[test]
    fn solvers_agree() {
        let ref mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..8 {
            let query = DVector::from_fn(3, |_, _| rng.random_range(-2.0..2.0));
            let points = DMatrix::from_fn(3, 6, |_, _| rng.random_range(-1.0..1.0));
            let hull = Hull::from((&query, &points));
            let active = hull.distance(Metric::Convex, Solver::ActiveSet).unwrap();
            let interior = hull.distance(Metric::Convex, Solver::InteriorPoint).unwrap();
            assert!((active - interior).abs() < 1e-3, "{active} vs {interior}");
        }
    }

    #[test]
    fn rejects_empty_and_mismatched() {
        let query = DVector::from_vec(vec![0., 0.]);
        let empty = DMatrix::<f64>::zeros(2, 0);
        let wide = DMatrix::<f64>::zeros(3, 2);
        assert!(matches!(
            Hull::from((&query, &empty)).distance(Metric::Convex, Solver::default()),
            Err(Error::EmptyReference)
        ));
        assert!(matches!(
            Hull::from((&query, &wide)).affine(),
            Err(Error::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn parses_metric_names() {
        assert_eq!(Metric::try_from("convex").unwrap(), Metric::Convex);
        assert_eq!("affine".parse::<Metric>().unwrap(), Metric::Affine);
        assert_eq!("affine-qp".parse::<Metric>().unwrap(), Metric::AffineQp);
        assert_eq!(Metric::AffineQp.to_string(), "affine-qp");
        assert!(matches!(
            Metric::try_from("concave"),
            Err(Error::UnknownMetric(_))
        ));
    }
}
