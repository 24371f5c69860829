//! What the silhouette extractor needs to know about a 3D solid, and a
//! simple indexed mesh that provides it.

use std::cmp::Ordering;
use std::collections::HashMap;

use glam::DVec3;
use robust::Coord3D;

use crate::error::{Error, Result};

/// An index for a face of a [`SolidMesh`].
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct FaceIdx(pub usize);

/// An index for an edge of a [`SolidMesh`].
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct MeshEdgeIdx(pub usize);

/// An index for a vertex of a [`SolidMesh`].
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct MeshVertexIdx(pub usize);

impl std::fmt::Debug for FaceIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f_{}", self.0)
    }
}

impl std::fmt::Debug for MeshEdgeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "me_{}", self.0)
    }
}

impl std::fmt::Debug for MeshVertexIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mv_{}", self.0)
    }
}

/// A polygonal surface with face adjacency.
///
/// Every edge belongs to an owning face, which traverses it from its first
/// vertex to its second, and to at most one other face, which traverses it the
/// other way. Faces wind counter-clockwise around their normals.
pub trait SolidMesh {
    fn face_count(&self) -> usize;
    fn face_area(&self, face: FaceIdx) -> f64;
    /// The unit normal, or zero for a degenerate face.
    fn face_normal(&self, face: FaceIdx) -> DVec3;
    /// The face's vertices, in winding order.
    fn face_vertices(&self, face: FaceIdx) -> &[MeshVertexIdx];
    fn face_edges(&self, face: FaceIdx) -> &[MeshEdgeIdx];

    /// The endpoints, in the owning face's direction.
    fn edge_vertices(&self, edge: MeshEdgeIdx) -> (MeshVertexIdx, MeshVertexIdx);
    fn edge_owner(&self, edge: MeshEdgeIdx) -> FaceIdx;
    /// `None` for an edge on the border of an open surface.
    fn edge_other(&self, edge: MeshEdgeIdx) -> Option<FaceIdx>;

    fn vertex_position(&self, vertex: MeshVertexIdx) -> DVec3;
    fn vertex_edges(&self, vertex: MeshVertexIdx) -> &[MeshEdgeIdx];

    /// The face across `edge` from `face`.
    fn neighbor(&self, face: FaceIdx, edge: MeshEdgeIdx) -> Option<FaceIdx> {
        if self.edge_owner(edge) == face {
            self.edge_other(edge)
        } else {
            Some(self.edge_owner(edge))
        }
    }

    /// The average of the face's vertices.
    fn face_centroid(&self, face: FaceIdx) -> DVec3 {
        let vs = self.face_vertices(face);
        let sum: DVec3 = vs.iter().map(|&v| self.vertex_position(v)).sum();
        sum / vs.len().max(1) as f64
    }

    /// The sign of `normal . direction`, decided exactly.
    ///
    /// The decision is made with an exact orientation predicate on the corner
    /// of the face that lines up best with its normal, so a face lying exactly
    /// along `direction` always comes out `Equal`.
    fn facing(&self, face: FaceIdx, direction: DVec3) -> Ordering {
        let vs = self.face_vertices(face);
        if vs.len() < 3 {
            return Ordering::Equal;
        }
        let normal = self.face_normal(face);
        let a = self.vertex_position(vs[0]);
        let best = (1..vs.len() - 1).max_by(|&i, &j| {
            let weight = |k: usize| {
                let b = self.vertex_position(vs[k]);
                let c = self.vertex_position(vs[k + 1]);
                (b - a).cross(c - a).dot(normal)
            };
            weight(i).total_cmp(&weight(j))
        });
        let Some(i) = best else {
            return Ordering::Equal;
        };
        let b = self.vertex_position(vs[i]);
        let c = self.vertex_position(vs[i + 1]);

        // Positive when the query point is below the plane, i.e. against the normal.
        let det = robust::orient3d(coord(a), coord(b), coord(c), coord(a + direction));
        if det < 0.0 {
            Ordering::Greater
        } else if det > 0.0 {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}

fn coord(p: DVec3) -> Coord3D<f64> {
    Coord3D {
        x: p.x,
        y: p.y,
        z: p.z,
    }
}

#[derive(Clone, Debug)]
struct Face {
    vertices: Vec<MeshVertexIdx>,
    edges: Vec<MeshEdgeIdx>,
    normal: DVec3,
    area: f64,
}

#[derive(Clone, Debug)]
struct Edge {
    from: MeshVertexIdx,
    to: MeshVertexIdx,
    owner: FaceIdx,
    other: Option<FaceIdx>,
}

/// An indexed polygon mesh.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    positions: Vec<DVec3>,
    faces: Vec<Face>,
    edges: Vec<Edge>,
    vertex_edges: Vec<Vec<MeshEdgeIdx>>,
}

/// The area-weighted normal of a planar polygon.
fn newell(points: &[DVec3]) -> DVec3 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].cross(points[(i + 1) % n]))
        .sum::<DVec3>()
        / 2.0
}

impl Mesh {
    /// Builds a mesh from vertex positions and faces given as loops of
    /// vertex indices.
    ///
    /// Faces sharing an edge must traverse it in opposite directions, and no
    /// edge may be shared by more than two faces.
    pub fn from_faces(positions: Vec<DVec3>, faces: Vec<Vec<usize>>) -> Result<Self> {
        if !positions.iter().all(|p| p.is_finite()) {
            return Err(Error::NonFinite);
        }
        let mut mesh = Mesh {
            vertex_edges: vec![Vec::new(); positions.len()],
            positions,
            faces: Vec::with_capacity(faces.len()),
            edges: Vec::new(),
        };

        // Directed edges, keyed by their endpoints in the owner's direction.
        let mut by_ends: HashMap<(usize, usize), MeshEdgeIdx> = HashMap::new();
        for (f, face) in faces.into_iter().enumerate() {
            let face_idx = FaceIdx(f);
            if face.len() < 3 {
                return Err(Error::MalformedTopology(format!(
                    "face {f} has {} vertices",
                    face.len()
                )));
            }
            if let Some(&bad) = face.iter().find(|&&v| v >= mesh.positions.len()) {
                return Err(Error::MalformedTopology(format!(
                    "face {f} refers to missing vertex {bad}"
                )));
            }

            let mut edges = Vec::with_capacity(face.len());
            for i in 0..face.len() {
                let (a, b) = (face[i], face[(i + 1) % face.len()]);
                if by_ends.contains_key(&(a, b)) {
                    return Err(Error::MalformedTopology(format!(
                        "edge {a}-{b} is traversed twice in the same direction"
                    )));
                }
                let edge = match by_ends.get(&(b, a)) {
                    Some(&e) => {
                        let other = &mut mesh.edges[e.0].other;
                        if other.is_some() {
                            return Err(Error::MalformedTopology(format!(
                                "edge {a}-{b} has more than two faces"
                            )));
                        }
                        *other = Some(face_idx);
                        e
                    }
                    None => {
                        let e = MeshEdgeIdx(mesh.edges.len());
                        mesh.edges.push(Edge {
                            from: MeshVertexIdx(a),
                            to: MeshVertexIdx(b),
                            owner: face_idx,
                            other: None,
                        });
                        by_ends.insert((a, b), e);
                        mesh.vertex_edges[a].push(e);
                        mesh.vertex_edges[b].push(e);
                        e
                    }
                };
                edges.push(edge);
            }

            let points: Vec<_> = face.iter().map(|&v| mesh.positions[v]).collect();
            let n = newell(&points);
            mesh.faces.push(Face {
                vertices: face.into_iter().map(MeshVertexIdx).collect(),
                edges,
                normal: n.normalize_or_zero(),
                area: n.length(),
            });
        }
        Ok(mesh)
    }

    /// An axis-aligned box.
    pub fn cuboid(min: DVec3, max: DVec3) -> Result<Self> {
        let corner = |i: usize| {
            DVec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        };
        Mesh::from_faces(
            (0..8).map(corner).collect(),
            vec![
                vec![0, 2, 3, 1],
                vec![4, 5, 7, 6],
                vec![0, 1, 5, 4],
                vec![2, 6, 7, 3],
                vec![0, 4, 6, 2],
                vec![1, 3, 7, 5],
            ],
        )
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl SolidMesh for Mesh {
    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn face_area(&self, face: FaceIdx) -> f64 {
        self.faces[face.0].area
    }

    fn face_normal(&self, face: FaceIdx) -> DVec3 {
        self.faces[face.0].normal
    }

    fn face_vertices(&self, face: FaceIdx) -> &[MeshVertexIdx] {
        &self.faces[face.0].vertices
    }

    fn face_edges(&self, face: FaceIdx) -> &[MeshEdgeIdx] {
        &self.faces[face.0].edges
    }

    fn edge_vertices(&self, edge: MeshEdgeIdx) -> (MeshVertexIdx, MeshVertexIdx) {
        let e = &self.edges[edge.0];
        (e.from, e.to)
    }

    fn edge_owner(&self, edge: MeshEdgeIdx) -> FaceIdx {
        self.edges[edge.0].owner
    }

    fn edge_other(&self, edge: MeshEdgeIdx) -> Option<FaceIdx> {
        self.edges[edge.0].other
    }

    fn vertex_position(&self, vertex: MeshVertexIdx) -> DVec3 {
        self.positions[vertex.0]
    }

    fn vertex_edges(&self, vertex: MeshVertexIdx) -> &[MeshEdgeIdx] {
        &self.vertex_edges[vertex.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn unit_cube() -> Mesh {
        Mesh::cuboid(DVec3::ZERO, DVec3::ONE).unwrap()
    }

    #[test]
    fn cube_is_closed() {
        let cube = unit_cube();
        assert_eq!(cube.face_count(), 6);
        assert_eq!(cube.edge_count(), 12);
        for e in 0..cube.edge_count() {
            assert!(cube.edge_other(MeshEdgeIdx(e)).is_some());
        }
        for v in 0..8 {
            assert_eq!(cube.vertex_edges(MeshVertexIdx(v)).len(), 3);
        }
    }

    #[test]
    fn normals_point_out() {
        let cube = unit_cube();
        let center = DVec3::splat(0.5);
        for f in 0..6 {
            let f = FaceIdx(f);
            assert_eq!(cube.face_area(f), 1.0);
            let out = cube.face_centroid(f) - center;
            approx::assert_relative_eq!(cube.face_normal(f).dot(out), 0.5);
        }
    }

    #[test]
    fn facing_is_exact() {
        let cube = unit_cube();
        let top = FaceIdx(1);
        let side = FaceIdx(2);
        assert_eq!(cube.facing(top, DVec3::Z), Ordering::Greater);
        assert_eq!(cube.facing(top, -DVec3::Z), Ordering::Less);
        assert_eq!(cube.facing(side, DVec3::Z), Ordering::Equal);
        assert_eq!(cube.facing(side, DVec3::new(0.0, -1e-9, 1.0)), Ordering::Greater);
    }

    #[test]
    fn neighbors() {
        let cube = unit_cube();
        let bottom = FaceIdx(0);
        let mut around: Vec<_> = cube
            .face_edges(bottom)
            .iter()
            .filter_map(|&e| cube.neighbor(bottom, e))
            .collect();
        around.sort();
        assert_eq!(around, vec![FaceIdx(2), FaceIdx(3), FaceIdx(4), FaceIdx(5)]);
    }

    #[test]
    fn bad_meshes() {
        let square = vec![DVec3::ZERO, DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y];
        assert_matches!(
            Mesh::from_faces(square.clone(), vec![vec![0, 1, 7]]),
            Err(Error::MalformedTopology(_))
        );
        assert_matches!(
            Mesh::from_faces(square.clone(), vec![vec![0, 1, 2], vec![0, 1, 3]]),
            Err(Error::MalformedTopology(_))
        );
        assert_matches!(
            Mesh::from_faces(
                square.clone(),
                vec![vec![0, 1, 2], vec![1, 0, 3], vec![1, 0, 2]]
            ),
            Err(Error::MalformedTopology(_))
        );
        assert_matches!(
            Mesh::from_faces(vec![DVec3::NAN], vec![]),
            Err(Error::NonFinite)
        );
        // An open surface is fine.
        let open = Mesh::from_faces(square, vec![vec![0, 1, 2, 3]]).unwrap();
        assert_eq!(open.edge_other(MeshEdgeIdx(0)), None);
    }
}
