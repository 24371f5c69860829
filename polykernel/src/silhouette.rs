//! The outline of a solid seen from a direction.
//!
//! Faces are grouped into patches: connected sets of faces that all face
//! towards the viewer, or all away from it. The boundary of each patch
//! projects to a loop in the plane. The union of those loops (after untangling
//! the ones that fold over themselves) is the silhouette.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use glam::DVec3;

use crate::{
    boolean::{BooleanOps, Overlay},
    config::Tolerances,
    error::{Error, Result},
    hierarchy::{PolygonTree, SignConvention},
    mesh::{FaceIdx, MeshEdgeIdx, MeshVertexIdx, SolidMesh},
    polygon::Polygon,
    transform::ProjectionBasis,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SilhouetteOptions {
    /// If set, only faces whose centroid is at a signed distance in
    /// `[min, max]` along the view direction take part.
    pub band: Option<(f64, f64)>,
    pub tolerances: Tolerances,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Silhouette {
    /// The outline, counter-clockwise, with clockwise holes.
    pub polygons: Vec<Polygon>,
    /// Negative pieces that weren't inside anything.
    pub stray_holes: Vec<Polygon>,
}

/// Computes the silhouette of `mesh` seen along `direction`.
pub fn silhouette(
    mesh: &impl SolidMesh,
    direction: DVec3,
    options: &SilhouetteOptions,
) -> Result<Silhouette> {
    silhouette_with(mesh, direction, options, &Overlay::new(options.tolerances))
}

/// Like [`silhouette`], but with a custom Boolean service.
pub fn silhouette_with(
    mesh: &impl SolidMesh,
    direction: DVec3,
    options: &SilhouetteOptions,
    booleans: &impl BooleanOps,
) -> Result<Silhouette> {
    let basis = ProjectionBasis::from_direction(direction)?;
    let in_band = |face: FaceIdx| match options.band {
        Some((min, max)) => {
            let d = basis.signed_distance(mesh.face_centroid(face));
            min <= d && d <= max
        }
        None => true,
    };

    let mut visited = vec![false; mesh.face_count()];
    let mut loops = Vec::new();
    let mut patches = 0;
    for seed in (0..mesh.face_count()).map(FaceIdx) {
        if visited[seed.0] || !in_band(seed) {
            continue;
        }
        let facing = mesh.face_area(seed) * mesh.face_normal(seed).dot(basis.direction);
        if options.tolerances.is_negligible_facing(facing) {
            log::trace!("skipping edge-on face {seed:?}");
            continue;
        }
        let sign = mesh.facing(seed, basis.direction);
        if sign == Ordering::Equal {
            continue;
        }

        // Edges bordering the patch, directed along the winding of the patch
        // face they belong to.
        let mut outer: BTreeMap<MeshEdgeIdx, (MeshVertexIdx, MeshVertexIdx)> = BTreeMap::new();
        let mut stack = vec![seed];
        visited[seed.0] = true;
        while let Some(face) = stack.pop() {
            for &edge in mesh.face_edges(face) {
                if outer.remove(&edge).is_none() {
                    let (from, to) = mesh.edge_vertices(edge);
                    let ends = if mesh.edge_owner(edge) == face {
                        (from, to)
                    } else {
                        (to, from)
                    };
                    outer.insert(edge, ends);
                }
                if let Some(next) = mesh.neighbor(face, edge) {
                    if !visited[next.0]
                        && in_band(next)
                        && mesh.facing(next, basis.direction) == sign
                    {
                        visited[next.0] = true;
                        stack.push(next);
                    }
                }
            }
        }
        patches += 1;

        // Back-facing patches project clockwise.
        let flip = sign == Ordering::Less;
        loops.extend(trace(mesh, &basis, &outer, flip)?);
    }
    log::debug!("{patches} patches traced into {} loops", loops.len());

    let mut pieces = Vec::new();
    for l in &loops {
        let resolved = booleans.resolve_self_intersections(l)?;
        pieces.extend(resolved.positive);
        pieces.extend(resolved.negative);
    }
    // Largest first, positive before negative on ties.
    pieces.sort_by(|a, b| {
        b.twice_signed_area()
            .abs()
            .cmp(&a.twice_signed_area().abs())
            .then(b.is_positive().cmp(&a.is_positive()))
    });

    let tree = PolygonTree::build_ordered(pieces, SignConvention::Asserted)?;
    let stray_holes = tree.stray_hole_polygons();
    if !stray_holes.is_empty() {
        log::debug!("{} stray holes in the silhouette", stray_holes.len());
    }
    Ok(Silhouette {
        polygons: booleans.union(&tree.polygons())?,
        stray_holes,
    })
}

/// Walks the directed border edges of a patch into closed loops.
fn trace(
    mesh: &impl SolidMesh,
    basis: &ProjectionBasis,
    outer: &BTreeMap<MeshEdgeIdx, (MeshVertexIdx, MeshVertexIdx)>,
    flip: bool,
) -> Result<Vec<Polygon>> {
    let directed = |&(from, to): &(MeshVertexIdx, MeshVertexIdx)| {
        if flip {
            (to, from)
        } else {
            (from, to)
        }
    };
    let mut leaving: BTreeMap<MeshVertexIdx, Vec<MeshEdgeIdx>> = BTreeMap::new();
    for (&edge, ends) in outer {
        leaving.entry(directed(ends).0).or_default().push(edge);
    }

    let mut remaining: BTreeSet<MeshEdgeIdx> = outer.keys().copied().collect();
    let mut ret = Vec::new();
    while let Some(first) = remaining.pop_first() {
        let (start, mut current) = directed(&outer[&first]);
        let mut points = vec![basis.project_point(mesh.vertex_position(start))?];
        while current != start {
            points.push(basis.project_point(mesh.vertex_position(current))?);
            let next = leaving
                .get(&current)
                .and_then(|es| es.iter().find(|e| remaining.contains(*e)))
                .copied()
                .ok_or_else(|| {
                    Error::MalformedTopology(format!(
                        "silhouette boundary stops at vertex {current:?}"
                    ))
                })?;
            remaining.remove(&next);
            current = directed(&outer[&next]).1;
        }
        log::trace!("traced a loop of {} vertices", points.len());
        ret.push(Polygon::new(points)?);
    }
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use assert_matches::assert_matches;

    fn areas(s: &Silhouette) -> Vec<f64> {
        s.polygons.iter().map(Polygon::area).collect()
    }

    #[test]
    fn cube_along_each_axis() {
        let cube = Mesh::cuboid(DVec3::ZERO, DVec3::new(2.0, 3.0, 4.0)).unwrap();
        let opts = SilhouetteOptions::default();
        for (dir, area) in [
            (DVec3::Z, 6.0),
            (-DVec3::Z, 6.0),
            (DVec3::X, 12.0),
            (DVec3::Y, 8.0),
            (-DVec3::Y, 8.0),
        ] {
            let s = silhouette(&cube, dir, &opts).unwrap();
            assert_eq!(areas(&s), vec![area], "along {dir}");
            assert!(s.polygons[0].is_positive());
            assert!(s.stray_holes.is_empty());
        }
    }

    #[test]
    fn cube_from_above() {
        let cube = Mesh::cuboid(DVec3::ZERO, DVec3::ONE).unwrap();
        let s = silhouette(&cube, DVec3::Z, &SilhouetteOptions::default()).unwrap();
        insta::assert_snapshot!(
            format!("{:?}", s.polygons),
            @"[Polygon[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]]"
        );
    }

    /// An L-shaped prism of height one.
    fn ell_prism() -> Mesh {
        let outline = [(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (1.0, 2.0), (0.0, 2.0)];
        let n = outline.len();
        let positions = [0.0, 1.0]
            .iter()
            .flat_map(|&z| outline.iter().map(move |&(x, y)| DVec3::new(x, y, z)))
            .collect();
        let mut faces = vec![(0..n).rev().collect::<Vec<_>>(), (n..2 * n).collect()];
        for i in 0..n {
            let j = (i + 1) % n;
            faces.push(vec![i, j, j + n, i + n]);
        }
        Mesh::from_faces(positions, faces).unwrap()
    }

    #[test]
    fn concave_prism() {
        let ell = ell_prism();
        let opts = SilhouetteOptions::default();

        let top = silhouette(&ell, DVec3::Z, &opts).unwrap();
        assert_eq!(areas(&top), vec![3.0]);
        assert_eq!(top.polygons[0].len(), 6);

        // Two separate front patches and one back patch, merged.
        let side = silhouette(&ell, DVec3::X, &opts).unwrap();
        assert_eq!(areas(&side), vec![2.0]);
        assert_eq!(side.polygons[0].len(), 4);
    }

    #[test]
    fn bands() {
        let cube = Mesh::cuboid(DVec3::ZERO, DVec3::new(1.0, 1.0, 4.0)).unwrap();
        let only_top = SilhouetteOptions {
            band: Some((3.0, 5.0)),
            ..Default::default()
        };
        let s = silhouette(&cube, DVec3::Z, &only_top).unwrap();
        assert_eq!(areas(&s), vec![1.0]);

        let nothing = SilhouetteOptions {
            band: Some((10.0, 11.0)),
            ..Default::default()
        };
        let s = silhouette(&cube, DVec3::Z, &nothing).unwrap();
        assert_eq!(s, Silhouette::default());
    }

    #[test]
    fn zero_direction() {
        let cube = Mesh::cuboid(DVec3::ZERO, DVec3::ONE).unwrap();
        assert_matches!(
            silhouette(&cube, DVec3::ZERO, &SilhouetteOptions::default()),
            Err(Error::Degenerate(_))
        );
    }

    /// A cube that forgets one edge of its top face.
    struct Broken(Mesh);

    impl SolidMesh for Broken {
        fn face_count(&self) -> usize {
            self.0.face_count()
        }
        fn face_area(&self, face: FaceIdx) -> f64 {
            self.0.face_area(face)
        }
        fn face_normal(&self, face: FaceIdx) -> DVec3 {
            self.0.face_normal(face)
        }
        fn face_vertices(&self, face: FaceIdx) -> &[MeshVertexIdx] {
            self.0.face_vertices(face)
        }
        fn face_edges(&self, face: FaceIdx) -> &[MeshEdgeIdx] {
            let edges = self.0.face_edges(face);
            if face == FaceIdx(1) {
                &edges[1..]
            } else {
                edges
            }
        }
        fn edge_vertices(&self, edge: MeshEdgeIdx) -> (MeshVertexIdx, MeshVertexIdx) {
            self.0.edge_vertices(edge)
        }
        fn edge_owner(&self, edge: MeshEdgeIdx) -> FaceIdx {
            self.0.edge_owner(edge)
        }
        fn edge_other(&self, edge: MeshEdgeIdx) -> Option<FaceIdx> {
            self.0.edge_other(edge)
        }
        fn vertex_position(&self, vertex: MeshVertexIdx) -> DVec3 {
            self.0.vertex_position(vertex)
        }
        fn vertex_edges(&self, vertex: MeshVertexIdx) -> &[MeshEdgeIdx] {
            self.0.vertex_edges(vertex)
        }
    }

    #[test]
    fn open_boundary_is_malformed() {
        let broken = Broken(Mesh::cuboid(DVec3::ZERO, DVec3::ONE).unwrap());
        assert_matches!(
            silhouette(&broken, DVec3::Z, &SilhouetteOptions::default()),
            Err(Error::MalformedTopology(_))
        );
    }
}
