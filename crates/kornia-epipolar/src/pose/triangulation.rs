use glam::{DMat3, DVec2, DVec3};

use crate::linalg::null_vector;

/// Linear (DLT) triangulation of one calibrated correspondence.
///
/// The first camera is the canonical `P1 = [I | 0]` and the second `P2 = [R | t]`.
/// Returns the point in the frame of the first camera, or `None` when the solution lies
/// at infinity (parallel rays).
pub fn triangulate_point(
    x1: &DVec2,
    x2: &DVec2,
    rotation: &DMat3,
    translation: &DVec3,
) -> Option<DVec3> {
    let p1 = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    ];
    let p2 = [0, 1, 2].map(|i| {
        let row = rotation.row(i);
        [row.x, row.y, row.z, translation[i]]
    });

    let mut a = faer::Mat::<f64>::zeros(4, 4);
    write_dlt_row(&mut a, 0, x1.x, &p1[2], &p1[0]);
    write_dlt_row(&mut a, 1, x1.y, &p1[2], &p1[1]);
    write_dlt_row(&mut a, 2, x2.x, &p2[2], &p2[0]);
    write_dlt_row(&mut a, 3, x2.y, &p2[2], &p2[1]);

    let xh = null_vector(&a);
    let w = xh[3];
    if !(w.abs() > 1e-12) {
        return None;
    }
    Some(DVec3::new(xh[0] / w, xh[1] / w, xh[2] / w))
}

/// Triangulate a batch of calibrated correspondences, see [`triangulate_point`].
pub fn triangulate_points(
    x1: &[DVec2],
    x2: &[DVec2],
    rotation: &DMat3,
    translation: &DVec3,
) -> Vec<Option<DVec3>> {
    x1.iter()
        .zip(x2.iter())
        .map(|(p1, p2)| triangulate_point(p1, p2, rotation, translation))
        .collect()
}

fn write_dlt_row(a: &mut faer::Mat<f64>, row: usize, x: f64, p3: &[f64; 4], p1: &[f64; 4]) {
    for j in 0..4 {
        a.write(row, j, x * p3[j] - p1[j]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_triangulate_point() {
        let r = DMat3::from_rotation_y(0.2);
        let t = DVec3::new(-1.0, 0.1, 0.05);
        let x = DVec3::new(0.4, -0.3, 5.0);
        let x_cam2 = r * x + t;

        let x1 = DVec2::new(x.x / x.z, x.y / x.z);
        let x2 = DVec2::new(x_cam2.x / x_cam2.z, x_cam2.y / x_cam2.z);

        let p = triangulate_point(&x1, &x2, &r, &t).expect("finite point");
        assert_relative_eq!(p.x, x.x, epsilon = 1e-9);
        assert_relative_eq!(p.y, x.y, epsilon = 1e-9);
        assert_relative_eq!(p.z, x.z, epsilon = 1e-9);
    }

    #[test]
    fn test_triangulate_parallel_rays() {
        // pure translation and identical observations: the rays meet at infinity
        let x = DVec2::new(0.1, -0.2);
        let p = triangulate_point(&x, &x, &DMat3::IDENTITY, &DVec3::X);
        assert!(p.is_none());
    }

    #[test]
    fn test_triangulate_points_batch() {
        let r = DMat3::IDENTITY;
        let t = DVec3::new(-0.5, 0.0, 0.0);
        let points = [DVec3::new(0.0, 0.0, 2.0), DVec3::new(1.0, 1.0, 4.0)];
        let x1 = points.iter().map(|p| DVec2::new(p.x / p.z, p.y / p.z)).collect::<Vec<_>>();
        let x2 = points
            .iter()
            .map(|p| {
                let q = r * *p + t;
                DVec2::new(q.x / q.z, q.y / q.z)
            })
            .collect::<Vec<_>>();
        let out = triangulate_points(&x1, &x2, &r, &t);
        assert_eq!(out.len(), 2);
        for (got, expected) in out.iter().zip(points.iter()) {
            let got = got.expect("finite point");
            assert_relative_eq!((got - *expected).length(), 0.0, epsilon = 1e-9);
        }
    }
}
