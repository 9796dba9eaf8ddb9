//! Gordon surface from a compatible curve network.
//!
//! The surface is the Boolean sum `S_P + S_G - S_T` of the profile skin, the
//! guide skin and the tensor-product interpolant of the intersection points.
//! All three are brought to common degrees and knot vectors so the sum can be
//! taken pole by pole.

use gordon_core::{GordonError, Result, ToleranceConfig};
use gordon_geometry::{BSplineCurve, BSplineSurface, Curve, Direction};
use gordon_math::Point3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::algorithms::BSplineAlgorithms;

/// The Gordon surface of a network together with its three components.
///
/// Profiles are u-directional and meet the guides at `params_u`; guides are
/// v-directional and meet the profiles at `params_v`. The network must be
/// sorted and every curve parametrized so that profile `i` at `params_u[j]`
/// and guide `j` at `params_v[i]` are the same point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GordonSurfaceBuilder {
    profiles: Vec<BSplineCurve>,
    guides: Vec<BSplineCurve>,
    params_u: Vec<f64>,
    params_v: Vec<f64>,
    gordon: BSplineSurface,
    skin_profiles: BSplineSurface,
    skin_guides: BSplineSurface,
    tensor_product: BSplineSurface,
}

impl GordonSurfaceBuilder {
    pub fn new(
        profiles: Vec<BSplineCurve>,
        guides: Vec<BSplineCurve>,
        params_u: Vec<f64>,
        params_v: Vec<f64>,
        config: ToleranceConfig,
    ) -> Result<Self> {
        if profiles.len() < 2 || guides.len() < 2 {
            return Err(GordonError::InvalidInput(format!(
                "a Gordon surface needs at least two profiles and two guides, got {} and {}",
                profiles.len(),
                guides.len()
            )));
        }
        if params_u.len() != guides.len() || params_v.len() != profiles.len() {
            return Err(GordonError::InvalidInput(format!(
                "{} u parameters for {} guides, {} v parameters for {} profiles",
                params_u.len(),
                guides.len(),
                params_v.len(),
                profiles.len()
            )));
        }

        let bsa = BSplineAlgorithms::from_config(&config);
        check_curve_network_compatibility(&profiles, &guides, &params_u, &params_v, config.tol_3d)?;

        // grid[u_idx][v_idx]
        let grid: Vec<Vec<Point3>> = params_u
            .iter()
            .map(|&u| profiles.iter().map(|profile| profile.point_at(u)).collect())
            .collect();
        let tp_tolerance = bsa.tol_closed * BSplineAlgorithms::scale_pt_array(&grid);
        let make_u_closed = BSplineAlgorithms::is_u_dir_closed(&grid, tp_tolerance);
        let make_v_closed = BSplineAlgorithms::is_v_dir_closed(&grid, tp_tolerance);

        let mut skin_profiles = bsa.curves_to_surface(&profiles, &params_v, make_v_closed)?;
        let mut skin_guides =
            BSplineAlgorithms::flip_surface(&bsa.curves_to_surface(&guides, &params_u, make_u_closed)?);
        let mut tensor_product =
            bsa.points_to_surface(&grid, &params_u, &params_v, make_u_closed, make_v_closed)?;

        let surfaces = [&skin_guides, &skin_profiles, &tensor_product];
        let degree_u = surfaces.iter().map(|s| s.degree_u).max().unwrap_or(1);
        let degree_v = surfaces.iter().map(|s| s.degree_v).max().unwrap_or(1);
        for surface in [&mut skin_guides, &mut skin_profiles, &mut tensor_product] {
            surface.elevate_degree(degree_u, degree_v)?;
        }

        let compatible =
            bsa.create_common_knots_vector_surfaces(&[skin_guides, skin_profiles, tensor_product], config.tol_par)?;
        let [skin_guides, skin_profiles, tensor_product]: [BSplineSurface; 3] = compatible
            .try_into()
            .map_err(|v: Vec<BSplineSurface>| GordonError::Geometry(format!("expected 3 surfaces, got {}", v.len())))?;

        let dims = |s: &BSplineSurface| (s.nb_u_poles(), s.nb_v_poles());
        if dims(&skin_guides) != dims(&skin_profiles) || dims(&skin_profiles) != dims(&tensor_product) {
            return Err(GordonError::Geometry(format!(
                "component nets differ: guides {:?}, profiles {:?}, tensor product {:?}",
                dims(&skin_guides),
                dims(&skin_profiles),
                dims(&tensor_product)
            )));
        }
        if skin_guides.is_rational() || skin_profiles.is_rational() || tensor_product.is_rational() {
            warn!("rational component surface, the pole sum is not exact");
        }

        let mut gordon = skin_profiles.clone();
        let (nu, nv) = dims(&gordon);
        for i in 0..nu {
            for j in 0..nv {
                let p = skin_profiles.control_points[i][j];
                let g = skin_guides.control_points[i][j];
                let t = tensor_product.control_points[i][j];
                gordon.set_pole(i, j, p + g - t)?;
            }
        }
        let gordon = gordon.with_periodic(
            skin_profiles.is_periodic(Direction::U) && make_u_closed,
            make_v_closed,
        );

        info!(
            profiles = profiles.len(),
            guides = guides.len(),
            degree_u,
            degree_v,
            poles_u = nu,
            poles_v = nv,
            periodic_u = gordon.periodic_u,
            periodic_v = gordon.periodic_v,
            "built Gordon surface"
        );

        Ok(Self {
            profiles,
            guides,
            params_u,
            params_v,
            gordon,
            skin_profiles,
            skin_guides,
            tensor_product,
        })
    }

    pub fn surface_gordon(&self) -> &BSplineSurface {
        &self.gordon
    }

    /// Skin of the profiles, `S_P`.
    pub fn surface_profiles(&self) -> &BSplineSurface {
        &self.skin_profiles
    }

    /// Skin of the guides with u and v exchanged, `S_G`.
    pub fn surface_guides(&self) -> &BSplineSurface {
        &self.skin_guides
    }

    /// Interpolant of the intersection points, `S_T`.
    pub fn surface_intersections(&self) -> &BSplineSurface {
        &self.tensor_product
    }

    /// Profiles and guides the surface was built from.
    pub fn curve_network(&self) -> (&[BSplineCurve], &[BSplineCurve]) {
        (&self.profiles, &self.guides)
    }

    pub fn params_u(&self) -> &[f64] {
        &self.params_u
    }

    pub fn params_v(&self) -> &[f64] {
        &self.params_v
    }

    pub fn into_surface(self) -> BSplineSurface {
        self.gordon
    }
}

/// Check that the intersection parameters span [0, 1] and that profiles and
/// guides agree at every intersection, within `tol_3d` times the mean scale
/// of the two families.
pub fn check_curve_network_compatibility(
    profiles: &[BSplineCurve],
    guides: &[BSplineCurve],
    params_u: &[f64],
    params_v: &[f64],
    tol_3d: f64,
) -> Result<()> {
    let scale = 0.5 * (BSplineAlgorithms::scale(profiles) + BSplineAlgorithms::scale(guides));
    let tolerance = scale * tol_3d;

    for (name, params) in [("u", params_u), ("v", params_v)] {
        let (first, last) = match (params.first(), params.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => return Err(GordonError::InvalidInput(format!("no {name} intersection parameters"))),
        };
        if first.abs() > tolerance || (last - 1.0).abs() > tolerance {
            return Err(GordonError::IncompatibleParameterRange(format!(
                "{name} intersection parameters span [{first}, {last}], the network must cover [0, 1]"
            )));
        }
    }

    for (u_idx, (&u, guide)) in params_u.iter().zip(guides).enumerate() {
        for (v_idx, (&v, profile)) in params_v.iter().zip(profiles).enumerate() {
            let deviation = profile.point_at(u).distance(guide.point_at(v));
            if deviation > tolerance {
                return Err(GordonError::NetworkIncompatible {
                    profile: v_idx,
                    guide: u_idx,
                    deviation,
                    tolerance,
                });
            }
        }
    }
    debug!(tolerance, "curve network is compatible");
    Ok(())
}
