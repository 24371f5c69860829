//! An exact 2D polygon kernel.
//!
//! Coordinates are snapped to a fixed grid and every geometric decision
//! (orientation, intersection, containment) is made with exact integer
//! arithmetic. On top of that sit polygon nesting, Minkowski sums, and the
//! silhouettes of 3D meshes.

pub mod boolean;
pub mod config;
mod error;
pub mod geom;
pub mod hierarchy;
pub mod intersect;
pub mod mesh;
pub mod minkowski;
pub mod num;
pub mod polygon;
pub mod silhouette;
pub mod topology;
pub mod transform;

pub use boolean::{BooleanOps, Overlay, Resolved};
pub use config::Tolerances;
pub use error::{Error, Result};
pub use geom::{orient, BoundingBox, ProjectivePoint, MAX_COORDINATE, MAX_GRID, WEIGHT};
pub use hierarchy::{NodeIdx, PolygonTree, SignConvention};
pub use intersect::{
    classify, collinearity, find_intersections, Collinearity, Relation, SegmentIntersection,
    SegmentLocation,
};
pub use mesh::{Mesh, SolidMesh};
pub use minkowski::{
    minkowski, minkowski_difference, minkowski_sum, MinkowskiOp, MinkowskiRegion,
};
pub use num::Rational;
pub use polygon::{
    min_distance_to_polygon, min_distance_to_polygons, Containment, Location, Polygon,
};
pub use silhouette::{silhouette, silhouette_with, Silhouette, SilhouetteOptions};
pub use topology::{EdgeIdx, LoopIdx, Topology, VertexIdx};
pub use transform::{Affine2, ProjectionBasis};
