use glam::{DMat3, DVec3};

/// Singular value decomposition of a 3x3 matrix, `m = U * diag(s) * V^T`.
///
/// Singular values are sorted in non-increasing order.
#[derive(Debug, Clone, Copy)]
pub struct Svd3 {
    u: DMat3,
    s: DVec3,
    v: DMat3,
}

impl Svd3 {
    /// Left singular vectors (columns).
    pub fn u(&self) -> &DMat3 {
        &self.u
    }

    /// Singular values `(s0, s1, s2)` with `s0 >= s1 >= s2 >= 0`.
    pub fn s(&self) -> &DVec3 {
        &self.s
    }

    /// Right singular vectors (columns).
    pub fn v(&self) -> &DMat3 {
        &self.v
    }
}

/// Compute the singular value decomposition of a 3x3 matrix in double precision.
///
/// Example:
///
/// ```
/// use glam::{DMat3, DVec3};
/// use kornia_epipolar::linalg::svd3;
///
/// let m = DMat3::from_diagonal(DVec3::new(1.0, 3.0, 2.0));
/// let svd = svd3(&m);
/// assert!((svd.s().x - 3.0).abs() < 1e-12);
/// assert!((svd.s().z - 1.0).abs() < 1e-12);
/// ```
pub fn svd3(m: &DMat3) -> Svd3 {
    let svd = dmat3_to_faer(m).svd();
    let s = svd.s_diagonal();
    Svd3 {
        u: faer_to_dmat3(svd.u()),
        s: DVec3::new(s.read(0), s.read(1), s.read(2)),
        v: faer_to_dmat3(svd.v()),
    }
}

/// Right singular vector associated with the smallest singular value of `a`.
///
/// This is the least-squares solution of `a * x = 0` subject to `|x| = 1`.
pub fn null_vector(a: &faer::Mat<f64>) -> Vec<f64> {
    let svd = a.svd();
    let v = svd.v();
    let last = a.ncols() - 1;
    (0..a.ncols()).map(|i| v.read(i, last)).collect()
}

/// Build a 3x3 matrix from nine coefficients stored row by row.
pub fn mat3_from_row_major(h: &[f64]) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(h[0], h[3], h[6]),
        DVec3::new(h[1], h[4], h[7]),
        DVec3::new(h[2], h[5], h[8]),
    )
}

/// Build a 3x3 matrix from a row-major nested array, e.g. a calibration matrix `K`.
pub fn mat3_from_rows(rows: &[[f64; 3]; 3]) -> DMat3 {
    DMat3::from_cols_array_2d(rows).transpose()
}

/// Convert a 3x3 matrix into a row-major nested array.
pub fn mat3_to_rows(m: &DMat3) -> [[f64; 3]; 3] {
    m.transpose().to_cols_array_2d()
}

/// Frobenius norm of a 3x3 matrix.
pub fn frobenius_norm(m: &DMat3) -> f64 {
    (m.x_axis.length_squared() + m.y_axis.length_squared() + m.z_axis.length_squared()).sqrt()
}

/// Scale a matrix to unit Frobenius norm. A zero matrix is returned unchanged.
pub fn normalize_frobenius(m: &DMat3) -> DMat3 {
    let norm = frobenius_norm(m);
    if norm > 0.0 {
        *m * (1.0 / norm)
    } else {
        *m
    }
}

/// Inverse of a 3x3 matrix, or `None` when its determinant is numerically zero.
pub fn checked_inverse(m: &DMat3) -> Option<DMat3> {
    let det = m.determinant();
    if !det.is_finite() || det.abs() <= f64::EPSILON * frobenius_norm(m).powi(3) {
        return None;
    }
    Some(m.inverse())
}

/// Sum of the diagonal entries.
pub fn trace(m: &DMat3) -> f64 {
    m.x_axis.x + m.y_axis.y + m.z_axis.z
}

pub(crate) fn dmat3_to_faer(m: &DMat3) -> faer::Mat<f64> {
    faer::Mat::from_fn(3, 3, |i, j| m.col(j)[i])
}

pub(crate) fn faer_to_dmat3(m: faer::MatRef<'_, f64>) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(m.read(0, 0), m.read(1, 0), m.read(2, 0)),
        DVec3::new(m.read(0, 1), m.read(1, 1), m.read(2, 1)),
        DVec3::new(m.read(0, 2), m.read(1, 2), m.read(2, 2)),
    )
}
