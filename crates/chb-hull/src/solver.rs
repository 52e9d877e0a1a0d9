use super::*;
use chb_core::*;
use nalgebra::DVector;

/// A QP backend: one attempt, no recovery.
pub trait Backend {
    fn solve(&self, program: &Program) -> Result<DVector<f64>, QpFailure>;
}

/// Which backend leads, and whether the other one backs it up.
///
/// `ActiveSet` runs [`Goldfarb`] and hands the same program to
/// [`Interior`] when it fails. `InteriorPoint` runs [`Interior`] alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Solver {
    #[default]
    #[serde(alias = "quadprog")]
    ActiveSet,
    #[serde(alias = "cvxopt")]
    InteriorPoint,
}

impl Solver {
    pub fn solve(&self, program: &Program) -> Result<DVector<f64>> {
        match self {
            Self::InteriorPoint => Interior.solve(program).map_err(Error::Solver),
            Self::ActiveSet => match Goldfarb.solve(program) {
                Ok(x) => Ok(x),
                Err(active) => {
                    log::warn!("{:<32}{:<32}", "active set failed", active);
                    Interior
                        .solve(program)
                        .map_err(|interior| Error::Fallback { active, interior })
                }
            },
        }
    }
}

impl std::fmt::Display for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::ActiveSet => write!(f, "active-set"),
            Self::InteriorPoint => write!(f, "interior-point"),
        }
    }
}

impl TryFrom<&str> for Solver {
    type Error = Error;
    fn try_from(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active-set" | "quadprog" => Ok(Self::ActiveSet),
            "interior-point" | "cvxopt" => Ok(Self::InteriorPoint),
            _ => Err(Error::UnknownSolver(s.to_string())),
        }
    }
}

impl std::str::FromStr for Solver {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    /// min x₁ + 2x₂ over the probability simplex. The cost matrix is zero,
    /// which leaves the active-set backend without an inverse.
    fn linear() -> Program {
        Program::new(DMatrix::zeros(2, 2), DVector::from_vec(vec![1., 2.]))
            .subject_to(-DMatrix::identity(2, 2), DVector::zeros(2))
            .such_that(DMatrix::from_element(1, 2, 1.), DVector::from_element(1, 1.))
    }

    #[test]
    fn parses_names() {
        assert_eq!(Solver::try_from("active-set").unwrap(), Solver::ActiveSet);
        assert_eq!(Solver::try_from("quadprog").unwrap(), Solver::ActiveSet);
        assert_eq!(Solver::try_from("interior-point").unwrap(), Solver::InteriorPoint);
        assert_eq!("cvxopt".parse::<Solver>().unwrap(), Solver::InteriorPoint);
        assert_eq!(Solver::default().to_string(), "active-set");
    }

    #[test]
    fn rejects_unknown_name() {
        assert!(matches!(
            Solver::try_from("simplex"),
            Err(Error::UnknownSolver(name)) if name == "simplex"
        ));
    }

    #[test]
    fn falls_back_to_interior() {
        let x = Solver::ActiveSet.solve(&linear()).unwrap();
        assert!((x - DVector::from_vec(vec![1., 0.])).norm() < 1e-5);
    }

    #[test]
    fn reports_both_failures() {
        let infeasible = Program::new(DMatrix::identity(1, 1), DVector::zeros(1)).subject_to(
            DMatrix::from_column_slice(2, 1, &[1., -1.]),
            DVector::from_vec(vec![-1., -1.]),
        );
        assert!(matches!(
            Solver::ActiveSet.solve(&infeasible),
            Err(Error::Fallback { .. })
        ));
        assert!(matches!(
            Solver::InteriorPoint.solve(&infeasible),
            Err(Error::Solver(_))
        ));
    }

    #[test]
    fn serializes_kebab_case() {
        let json = serde_json::to_string(&Solver::InteriorPoint).unwrap();
        assert_eq!(json, "\"interior-point\"");
        let back = serde_json::from_str::<Solver>("\"quadprog\"").unwrap();
        assert_eq!(back, Solver::ActiveSet);
    }
}
