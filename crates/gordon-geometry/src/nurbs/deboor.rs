//! De Boor evaluation of B-spline and NURBS curves and surfaces.
//!
//! Rational geometry is evaluated in homogeneous coordinates `(w*x, w*y, w*z, w)`;
//! derivatives are projected back with the quotient rule (The NURBS Book, A4.2).

use gordon_math::{DVec3, DVec4, Point3, Vector3};

use super::knot::{basis_functions, ders_basis_functions, find_span};

/// Lift a weighted point into homogeneous space.
#[inline]
pub fn to_homogeneous(point: Point3, weight: f64) -> DVec4 {
    (point * weight).extend(weight)
}

/// Project a homogeneous point back to a weighted point.
#[inline]
pub fn from_homogeneous(h: DVec4) -> (Point3, f64) {
    let w = h.w;
    if w.abs() < 1e-15 {
        (h.truncate(), w)
    } else {
        (h.truncate() / w, w)
    }
}

/// Evaluate a curve given by homogeneous control points at `t`.
pub fn curve_hpoint(degree: usize, knots: &[f64], hpoints: &[DVec4], t: f64) -> DVec4 {
    let n = hpoints.len() - 1;
    let span = find_span(degree, knots, n, t);
    let basis = basis_functions(degree, knots, span, t);

    basis
        .iter()
        .enumerate()
        .fold(DVec4::ZERO, |acc, (i, &b)| acc + b * hpoints[span - degree + i])
}

/// Derivatives `0..=order` of the homogeneous curve at `t` (A3.2).
pub fn curve_hderivs(
    degree: usize,
    knots: &[f64],
    hpoints: &[DVec4],
    t: f64,
    order: usize,
) -> Vec<DVec4> {
    let n = hpoints.len() - 1;
    let span = find_span(degree, knots, n, t);
    let ders = ders_basis_functions(degree, knots, span, t, order);

    ders.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold(DVec4::ZERO, |acc, (i, &b)| acc + b * hpoints[span - degree + i])
        })
        .collect()
}

/// Euclidean derivatives from homogeneous ones (A4.2).
pub fn rational_derivs(aders: &[DVec4]) -> Vec<Vector3> {
    let w0 = aders[0].w;
    let mut ck: Vec<Vector3> = Vec::with_capacity(aders.len());
    for k in 0..aders.len() {
        let mut v = aders[k].truncate();
        let mut binom = 1.0;
        for i in 1..=k {
            binom = binom * (k + 1 - i) as f64 / i as f64;
            v -= binom * aders[i].w * ck[k - i];
        }
        ck.push(if w0.abs() < 1e-15 { v } else { v / w0 });
    }
    ck
}

/// Evaluate a rational B-spline (NURBS) curve point at parameter `t`.
#[allow(clippy::needless_range_loop)]
pub fn nurbs_curve_point(
    degree: usize,
    knots: &[f64],
    control_points: &[Point3],
    weights: &[f64],
    t: f64,
) -> Point3 {
    let n = control_points.len() - 1;
    let span = find_span(degree, knots, n, t);
    let basis = basis_functions(degree, knots, span, t);

    let mut point = DVec3::ZERO;
    let mut w = 0.0;

    for i in 0..=degree {
        let idx = span - degree + i;
        let bw = basis[i] * weights[idx];
        point += bw * control_points[idx];
        w += bw;
    }

    if w.abs() < 1e-15 {
        point
    } else {
        point / w
    }
}

/// Position and Euclidean derivatives up to `order` of a NURBS curve.
pub fn nurbs_curve_derivs(
    degree: usize,
    knots: &[f64],
    control_points: &[Point3],
    weights: &[f64],
    t: f64,
    order: usize,
) -> Vec<Vector3> {
    let hpoints: Vec<DVec4> = control_points
        .iter()
        .zip(weights)
        .map(|(&p, &w)| to_homogeneous(p, w))
        .collect();
    rational_derivs(&curve_hderivs(degree, knots, &hpoints, t, order))
}

/// Evaluate a NURBS surface point at parameters `(u, v)`.
#[allow(clippy::needless_range_loop, clippy::too_many_arguments)]
pub fn nurbs_surface_point(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    control_points: &[Vec<Point3>],
    weights: &[Vec<f64>],
    u: f64,
    v: f64,
) -> Point3 {
    let n_u = control_points.len() - 1;
    let span_u = find_span(degree_u, knots_u, n_u, u);
    let basis_u = basis_functions(degree_u, knots_u, span_u, u);

    let n_v = control_points[0].len() - 1;
    let span_v = find_span(degree_v, knots_v, n_v, v);
    let basis_v = basis_functions(degree_v, knots_v, span_v, v);

    let mut point = DVec3::ZERO;
    let mut w = 0.0;

    for i in 0..=degree_u {
        let u_idx = span_u - degree_u + i;
        for j in 0..=degree_v {
            let v_idx = span_v - degree_v + j;
            let bw = basis_u[i] * basis_v[j] * weights[u_idx][v_idx];
            point += bw * control_points[u_idx][v_idx];
            w += bw;
        }
    }

    if w.abs() < 1e-15 {
        point
    } else {
        point / w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_point_quadratic() {
        let degree = 2;
        let knots = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let cps = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(0.5, 1.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
        ];
        let w = vec![1.0; 3];

        let p = nurbs_curve_point(degree, &knots, &cps, &w, 0.0);
        assert!((p.x - 0.0).abs() < 1e-10);

        let p = nurbs_curve_point(degree, &knots, &cps, &w, 1.0);
        assert!((p.x - 1.0).abs() < 1e-10);

        let p = nurbs_curve_point(degree, &knots, &cps, &w, 0.5);
        assert!((p.x - 0.5).abs() < 1e-10);
        assert!((p.y - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_rational_derivs_quarter_circle() {
        // Quarter circle x^2 + y^2 = 1 as a rational quadratic Bezier.
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let knots = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let cps = vec![DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y];
        let w = vec![1.0, s, 1.0];

        for i in 0..=10 {
            let t = i as f64 / 10.0;
            let d = nurbs_curve_derivs(2, &knots, &cps, &w, t, 2);
            assert!((d[0].length() - 1.0).abs() < 1e-12);
            // tangent is perpendicular to the radius
            assert!(d[0].dot(d[1]).abs() < 1e-10, "t={}", t);
            // |C|^2 = 1 => C.C'' + |C'|^2 = 0
            assert!((d[0].dot(d[2]) + d[1].length_squared()).abs() < 1e-9, "t={}", t);
        }
    }

    #[test]
    fn test_surface_point_bilinear() {
        let knots = vec![0.0, 0.0, 1.0, 1.0];
        let cps = vec![
            vec![DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0)],
            vec![DVec3::new(0.0, 1.0, 0.0), DVec3::new(1.0, 1.0, 0.0)],
        ];
        let weights = vec![vec![1.0; 2]; 2];

        let p = nurbs_surface_point(1, 1, &knots, &knots, &cps, &weights, 0.5, 0.5);
        assert!((p.x - 0.5).abs() < 1e-10);
        assert!((p.y - 0.5).abs() < 1e-10);
        assert!(p.z.abs() < 1e-10);
    }
}
