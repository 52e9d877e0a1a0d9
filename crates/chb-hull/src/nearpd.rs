use chb_core::QpFailure;
use nalgebra::DMatrix;

/// Nearest symmetric positive-definite matrix (Higham 1988).
///
/// Symmetrizes the input, averages it with the polar factor recovered from
/// its SVD, and then nudges the diagonal by growing multiples of the most
/// negative eigenvalue until a Cholesky factorization succeeds.
///
/// # Termination
///
/// Every correction adds at least the floating point spacing at ‖A‖_F to the
/// diagonal, and the eigenvalue term grows quadratically in the attempt
/// counter, so the diagonal eventually dominates.
pub fn nearest_positive_definite(a: &DMatrix<f64>) -> Result<DMatrix<f64>, QpFailure> {
    if !a.is_square() {
        return Err(QpFailure::Dimension);
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(QpFailure::NonFinite);
    }
    let n = a.nrows();
    if n == 0 {
        return Ok(a.clone());
    }
    let b = symmetrize(a);
    let svd = b.clone().svd(false, true);
    let ref v_t = svd.v_t.ok_or(QpFailure::Singular)?;
    let h = v_t.transpose() * DMatrix::from_diagonal(&svd.singular_values) * v_t;
    let mut a3 = symmetrize(&((b + h) * 0.5));
    if is_positive_definite(&a3) {
        return Ok(a3);
    }
    let spacing = spacing(a.norm());
    let mut k = 1.0f64;
    while !is_positive_definite(&a3) {
        let mineig = a3.clone().symmetric_eigenvalues().min().min(0.);
        a3 += DMatrix::<f64>::identity(n, n) * (-mineig * k * k + spacing);
        k += 1.;
    }
    log::trace!("{:<32}{:<32}", "positive definite repair", k as usize);
    Ok(a3)
}

/// Whether a Cholesky factorization exists.
pub fn is_positive_definite(a: &DMatrix<f64>) -> bool {
    a.clone().cholesky().is_some()
}

/// (A + Aᵀ) / 2.
pub fn symmetrize(a: &DMatrix<f64>) -> DMatrix<f64> {
    (a + a.transpose()) * 0.5
}

/// Distance from |x| to the next representable f64.
fn spacing(x: f64) -> f64 {
    let x = x.abs();
    f64::from_bits(x.to_bits() + 1) - x
}
