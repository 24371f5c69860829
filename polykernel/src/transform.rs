//! Getting coordinates into and around the plane.

use glam::{DAffine2, DVec2, DVec3};

use crate::{
    error::{Error, Result},
    geom::ProjectivePoint,
    polygon::Polygon,
    topology::Topology,
};

/// An orthonormal frame `(u, v, direction)`, right-handed.
///
/// Projecting onto `(u, v)` looks at the plane from the tip of `direction`, so
/// a face whose normal points along `direction` keeps its counter-clockwise
/// winding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionBasis {
    pub direction: DVec3,
    pub u: DVec3,
    pub v: DVec3,
}

impl ProjectionBasis {
    pub fn from_direction(direction: DVec3) -> Result<Self> {
        if !direction.is_finite() {
            return Err(Error::NonFinite);
        }
        let d = direction.normalize_or_zero();
        if d == DVec3::ZERO {
            return Err(Error::Degenerate("zero view direction"));
        }
        let helper = if d.x.abs() < 0.9 { DVec3::X } else { DVec3::Y };
        let u = (helper - d * d.dot(helper)).normalize();
        let v = d.cross(u);
        Ok(ProjectionBasis { direction: d, u, v })
    }

    pub fn project(&self, p: DVec3) -> DVec2 {
        DVec2::new(p.dot(self.u), p.dot(self.v))
    }

    /// Projects onto the exact grid.
    pub fn project_point(&self, p: DVec3) -> Result<ProjectivePoint> {
        let q = self.project(p);
        ProjectivePoint::from_f64(q.x, q.y)
    }

    /// How far `p` is along the direction.
    pub fn signed_distance(&self, p: DVec3) -> f64 {
        p.dot(self.direction)
    }
}

/// A 2D affine map.
///
/// Images are rounded back onto the grid, so only maps that send grid points
/// to grid points (integer translations, quarter turns, reflections) are
/// exact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine2(pub DAffine2);

impl Affine2 {
    pub fn translation(x: f64, y: f64) -> Self {
        Affine2(DAffine2::from_translation(DVec2::new(x, y)))
    }

    pub fn rotation(angle: f64) -> Self {
        Affine2(DAffine2::from_angle(angle))
    }

    pub fn scale(x: f64, y: f64) -> Self {
        Affine2(DAffine2::from_scale(DVec2::new(x, y)))
    }

    /// `self` followed by `after`.
    pub fn then(&self, after: &Affine2) -> Affine2 {
        Affine2(after.0 * self.0)
    }

    /// Whether the map mirrors, turning counter-clockwise loops clockwise.
    pub fn is_reflection(&self) -> bool {
        self.0.matrix2.determinant() < 0.0
    }

    pub fn apply(&self, p: &ProjectivePoint) -> Result<ProjectivePoint> {
        let (x, y) = p.to_f64();
        let q = self.0.transform_point2(DVec2::new(x, y));
        ProjectivePoint::from_f64(q.x, q.y)
    }

    pub fn apply_polygon(&self, polygon: &Polygon) -> Result<Polygon> {
        Polygon::new(
            polygon
                .points()
                .iter()
                .map(|p| self.apply(p))
                .collect::<Result<Vec<_>>>()?,
        )
    }

    /// Moves every vertex; the edge caches are reset by the topology.
    pub fn apply_topology(&self, topology: &mut Topology) -> Result<()> {
        topology.transform(|p| self.apply(p))
    }
}
