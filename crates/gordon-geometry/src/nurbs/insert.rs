//! Knot insertion on homogeneous control polygons (The NURBS Book, A5.1).

use gordon_math::DVec4;

use super::knot::find_span;

/// Insert `u` into `knots` `times` times and return the refined knots and polygon.
///
/// `multiplicity` is the current multiplicity of `u`; the caller guarantees
/// `multiplicity + times <= degree`.
pub fn insert_knot(
    degree: usize,
    knots: &[f64],
    hpoints: &[DVec4],
    u: f64,
    multiplicity: usize,
    times: usize,
) -> (Vec<f64>, Vec<DVec4>) {
    if times == 0 {
        return (knots.to_vec(), hpoints.to_vec());
    }
    debug_assert!(multiplicity + times <= degree, "knot multiplicity would exceed the degree");

    let p = degree;
    let s = multiplicity;
    let r = times;
    let n = hpoints.len() - 1;
    let k = find_span(p, knots, n, u);

    let mut new_knots = Vec::with_capacity(knots.len() + r);
    new_knots.extend_from_slice(&knots[..=k]);
    new_knots.extend(std::iter::repeat(u).take(r));
    new_knots.extend_from_slice(&knots[k + 1..]);

    let mut new_points = vec![DVec4::ZERO; hpoints.len() + r];
    new_points[..=k - p].copy_from_slice(&hpoints[..=k - p]);
    for i in k - s..=n {
        new_points[i + r] = hpoints[i];
    }

    let mut temp: Vec<DVec4> = (0..=p - s).map(|i| hpoints[k - p + i]).collect();
    for j in 1..=r {
        let l = k - p + j;
        for i in 0..=p - j - s {
            let alpha = (u - knots[l + i]) / (knots[i + k + 1] - knots[l + i]);
            temp[i] = alpha * temp[i + 1] + (1.0 - alpha) * temp[i];
        }
        new_points[l] = temp[0];
        new_points[k + r - j - s] = temp[p - j - s];
    }
    let l = k - p + r;
    for i in l + 1..k - s {
        new_points[i] = temp[i - l];
    }

    (new_knots, new_points)
}
