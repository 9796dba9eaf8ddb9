use std::f64::consts::TAU;

use approx::assert_abs_diff_eq;
use gordon_geometry::{BSplineCurve, Curve, KnotSpline};
use gordon_math::DVec3;
use gordon_surface::{BSplineAlgorithms, BSplineApproxInterp};

/// Two parabolic arcs meeting at u = 0.5 under 45 degrees.
fn cornered_arcs() -> BSplineCurve {
    BSplineCurve::new(
        2,
        vec![0.0, 0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 1.0],
        vec![
            DVec3::new(-1.0, -0.25, 0.0),
            DVec3::new(-0.5, 0.0, 0.0),
            DVec3::ZERO,
            DVec3::new(0.5, 0.5, 0.0),
            DVec3::new(0.8, 1.2, 0.0),
        ],
    )
    .unwrap()
}

#[test]
fn integration_helix_fit_converges() {
    let radius = 2.0;
    let points: Vec<DVec3> = (0..100)
        .map(|i| {
            let t = TAU * i as f64 / 99.0;
            DVec3::new(radius * t.cos(), radius * t.sin(), 0.5 * t)
        })
        .collect();

    let mut fit = BSplineApproxInterp::new(points.clone(), 20, 3, false);
    fit.interpolate_point(0, false).unwrap();
    fit.interpolate_point(99, false).unwrap();
    let result = fit.fit_curve_optimal(&[], 4).unwrap();

    assert!(result.iterations <= 4);
    assert!(result.error <= 1e-3 * radius, "residual {}", result.error);
    assert_eq!(result.curve.degree, 3);
    assert_eq!(result.curve.ncp(), 20);
    assert!(!result.curve.periodic);
    assert!(result.curve.start_point().distance(points[0]) < 1e-10);
    assert!(result.curve.end_point().distance(points[99]) < 1e-10);
}

#[test]
fn integration_corner_survives_reparametrization() {
    let bsa = BSplineAlgorithms::default();
    let curve = cornered_arcs();
    assert_eq!(bsa.get_kink_parameters(&curve), vec![0.5]);

    let old = [0.0, 0.25, 0.75, 1.0];
    let new = [0.0, 0.3, 0.7, 1.0];
    let reparam = bsa
        .reparametrize_bspline_continuously_approx(&curve, &old, &new, 20)
        .unwrap();

    for (&o, &n) in old.iter().zip(&new) {
        assert!(reparam.point_at(n).distance(curve.point_at(o)) < 1e-9);
    }

    let kinks = bsa.get_kink_parameters(&reparam);
    assert_eq!(kinks.len(), 1);
    assert_abs_diff_eq!(kinks[0], 0.5, epsilon = 1e-9);
    let idx = BSplineAlgorithms::find_knot(&reparam, kinks[0], 1e-12).unwrap();
    assert_eq!(reparam.multiplicities()[idx], reparam.degree);

    let before = reparam.tangent_at(kinks[0] - 1e-9);
    let after = reparam.tangent_at(kinks[0] + 1e-9);
    let angle = before.angle_between(after).to_degrees();
    assert!((angle - 45.0).abs() < 1.0, "corner angle {angle}");

    assert!(reparam.point_at(kinks[0]).length() < 1e-9);
}
