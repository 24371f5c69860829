//! Polygon loops as a graph of vertices and directed edges.
//!
//! Vertices and edges live in one arena and refer to each other by index.
//! Edges compute their derived geometry (length, direction, extents...) on
//! first use and keep it until they are explicitly [`reset`](Edge::reset).
//! Moving a vertex through [`Topology`] resets the edges touching it; anyone
//! mutating positions some other way has to do the same.

use std::cell::OnceCell;

use crate::{
    error::{Error, Result},
    geom::{BoundingBox, ProjectivePoint},
    num::Rational,
    polygon::Polygon,
};

/// An index into the vertex arena of a [`Topology`].
#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, serde::Serialize)]
pub struct VertexIdx(pub usize);

/// An index into the edge arena of a [`Topology`].
///
/// Edges have identities: two edges with the same endpoints are still different edges.
#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, serde::Serialize)]
pub struct EdgeIdx(pub usize);

/// Identifies one closed loop of a [`Topology`].
#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, serde::Serialize)]
pub struct LoopIdx(pub usize);

impl std::fmt::Debug for VertexIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v_{}", self.0)
    }
}

impl std::fmt::Debug for EdgeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e_{}", self.0)
    }
}

impl std::fmt::Debug for LoopIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "l_{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Vertex {
    pub position: ProjectivePoint,
    pub loop_idx: LoopIdx,
    /// Where this vertex comes in its loop's traversal order.
    pub index: usize,
    pub outgoing: Option<EdgeIdx>,
    pub incoming: Option<EdgeIdx>,
}

/// Everything about an edge that can be derived from its endpoints.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct EdgeGeometry {
    /// `to - from`.
    pub vector: ProjectivePoint,
    pub length_squared: Rational,
    pub length: f64,
    /// The unit normal pointing to the right of the edge. For a counter-clockwise
    /// loop, this points outwards.
    pub normal: (f64, f64),
    pub center: ProjectivePoint,
    pub bbox: BoundingBox,
}

impl EdgeGeometry {
    fn compute(from: &ProjectivePoint, to: &ProjectivePoint) -> Result<Self> {
        let vector = to.checked_sub(from)?;
        let length_squared = vector.dot(&vector)?;
        let length = length_squared.to_f64().sqrt();
        let (dx, dy) = vector.to_f64();
        let normal = if length > 0.0 {
            (dy / length, -dx / length)
        } else {
            (0.0, 0.0)
        };
        let bbox = BoundingBox::from_points([from, to])?
            .ok_or(Error::Degenerate("edge without endpoints"))?;
        Ok(EdgeGeometry {
            vector,
            length_squared,
            length,
            normal,
            center: from.midpoint(to)?,
            bbox,
        })
    }
}

/// A directed edge between two vertices of the same arena.
#[derive(Clone, Debug)]
pub struct Edge {
    pub from: VertexIdx,
    pub to: VertexIdx,
    geometry: OnceCell<EdgeGeometry>,
}

impl Edge {
    pub fn new(from: VertexIdx, to: VertexIdx) -> Self {
        Edge {
            from,
            to,
            geometry: OnceCell::new(),
        }
    }

    /// Forgets the cached geometry. Call this whenever an endpoint moves.
    pub fn reset(&mut self) {
        self.geometry = OnceCell::new();
    }

    pub fn is_cached(&self) -> bool {
        self.geometry.get().is_some()
    }

    /// Can `other` directly precede or follow this edge in a traversal?
    ///
    /// Sharing an endpoint is not enough: the edges have to line up head to tail.
    pub fn is_adjacent_to(&self, other: &Edge) -> bool {
        self.from == other.to || self.to == other.from
    }

    /// The endpoint that isn't `v`, or `None` if `v` isn't an endpoint at all.
    pub fn other_point(&self, v: VertexIdx) -> Option<VertexIdx> {
        if v == self.from {
            Some(self.to)
        } else if v == self.to {
            Some(self.from)
        } else {
            None
        }
    }

    /// A new edge running the other way. The cache is not carried over.
    pub fn reverse(&self) -> Edge {
        Edge::new(self.to, self.from)
    }

    /// The derived geometry, computed on first call.
    ///
    /// `from` and `to` must be the current positions of this edge's endpoints.
    pub fn geometry(&self, from: &ProjectivePoint, to: &ProjectivePoint) -> Result<&EdgeGeometry> {
        if let Some(g) = self.geometry.get() {
            return Ok(g);
        }
        let g = EdgeGeometry::compute(from, to)?;
        Ok(self.geometry.get_or_init(|| g))
    }
}

fn cyclic_pairs<T>(xs: &[T]) -> impl Iterator<Item = (&T, &T)> {
    xs.windows(2)
        .map(|pair| (&pair[0], &pair[1]))
        .chain(xs.last().zip(xs.first()))
}

/// An arena of closed loops.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    /// For each loop, its edges in traversal order.
    loops: Vec<Vec<EdgeIdx>>,
}

impl Topology {
    pub fn from_polygons<'a>(polygons: impl IntoIterator<Item = &'a Polygon>) -> Self {
        let mut ret = Topology::default();
        for poly in polygons {
            ret.add_loop(poly.points().iter().copied());
        }
        ret
    }

    /// Adds a closed loop through the given points, returning its index.
    ///
    /// A loop with fewer than two points has no edges.
    pub fn add_loop(&mut self, points: impl IntoIterator<Item = ProjectivePoint>) -> LoopIdx {
        let loop_idx = LoopIdx(self.loops.len());
        let first = self.vertices.len();
        for (index, position) in points.into_iter().enumerate() {
            self.vertices.push(Vertex {
                position,
                loop_idx,
                index,
                outgoing: None,
                incoming: None,
            });
        }

        let vs: Vec<_> = (first..self.vertices.len()).map(VertexIdx).collect();
        let mut loop_edges = Vec::new();
        if vs.len() >= 2 {
            for (&from, &to) in cyclic_pairs(&vs) {
                let idx = EdgeIdx(self.edges.len());
                self.edges.push(Edge::new(from, to));
                self.vertices[from.0].outgoing = Some(idx);
                self.vertices[to.0].incoming = Some(idx);
                loop_edges.push(idx);
            }
        }
        self.loops.push(loop_edges);
        loop_idx
    }

    pub fn vertex(&self, v: VertexIdx) -> &Vertex {
        &self.vertices[v.0]
    }

    pub fn edge(&self, e: EdgeIdx) -> &Edge {
        &self.edges[e.0]
    }

    pub fn position(&self, v: VertexIdx) -> &ProjectivePoint {
        &self.vertices[v.0].position
    }

    pub fn endpoints(&self, e: EdgeIdx) -> (&ProjectivePoint, &ProjectivePoint) {
        let edge = self.edge(e);
        (self.position(edge.from), self.position(edge.to))
    }

    pub fn geometry(&self, e: EdgeIdx) -> Result<&EdgeGeometry> {
        let (from, to) = self.endpoints(e);
        self.edge(e).geometry(from, to)
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIdx> {
        (0..self.edges.len()).map(EdgeIdx)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    pub fn loop_edges(&self, l: LoopIdx) -> &[EdgeIdx] {
        &self.loops[l.0]
    }

    /// The loop's vertex positions, in traversal order.
    pub fn loop_points(&self, l: LoopIdx) -> Vec<ProjectivePoint> {
        self.vertices
            .iter()
            .filter(|v| v.loop_idx == l)
            .map(|v| v.position)
            .collect()
    }

    /// Moves a vertex, invalidating the edges that touch it.
    pub fn set_position(&mut self, v: VertexIdx, position: ProjectivePoint) {
        let vertex = &mut self.vertices[v.0];
        vertex.position = position;
        let touching = [vertex.incoming, vertex.outgoing];
        for e in touching.into_iter().flatten() {
            self.edges[e.0].reset();
        }
    }

    /// Moves every vertex through `f`, then invalidates every edge.
    pub fn transform(
        &mut self,
        mut f: impl FnMut(&ProjectivePoint) -> Result<ProjectivePoint>,
    ) -> Result<()> {
        for v in &mut self.vertices {
            v.position = f(&v.position)?;
        }
        for e in &mut self.edges {
            e.reset();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::WEIGHT;

    fn p(x: f64, y: f64) -> ProjectivePoint {
        ProjectivePoint::from_f64(x, y).unwrap()
    }

    fn unit_square() -> Topology {
        let mut top = Topology::default();
        top.add_loop([p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]);
        top
    }

    #[test]
    fn loop_structure() {
        let top = unit_square();
        assert_eq!(top.loop_count(), 1);
        assert_eq!(top.vertex_count(), 4);
        let edges = top.loop_edges(LoopIdx(0));
        assert_eq!(edges.len(), 4);

        let last = top.edge(edges[3]);
        assert_eq!(last.from, VertexIdx(3));
        assert_eq!(last.to, VertexIdx(0));
        assert_eq!(top.vertex(VertexIdx(0)).incoming, Some(edges[3]));
        assert_eq!(top.vertex(VertexIdx(0)).outgoing, Some(edges[0]));
        assert_eq!(top.vertex(VertexIdx(2)).index, 2);
    }

    #[test]
    fn geometry_is_lazy() {
        let top = unit_square();
        let e = EdgeIdx(0);
        assert!(!top.edge(e).is_cached());

        let g = top.geometry(e).unwrap();
        assert_eq!(g.length, 1.0);
        assert_eq!(g.length_squared, Rational::one());
        assert_eq!(g.center, p(0.5, 0.0));
        assert_eq!(g.normal, (0.0, -1.0));
        assert_eq!(g.bbox.max_x, Rational::one());
        assert!(top.edge(e).is_cached());
    }

    #[test]
    fn moving_a_vertex_resets_its_edges() {
        let mut top = unit_square();
        for e in top.edge_indices() {
            top.geometry(e).unwrap();
        }

        top.set_position(VertexIdx(1), p(3.0, 0.0));
        assert!(!top.edge(EdgeIdx(0)).is_cached());
        assert!(!top.edge(EdgeIdx(1)).is_cached());
        assert!(top.edge(EdgeIdx(2)).is_cached());

        assert_eq!(top.geometry(EdgeIdx(0)).unwrap().length, 3.0);
        assert_eq!(
            top.geometry(EdgeIdx(0)).unwrap().length_squared,
            Rational::from_int(9)
        );
    }

    #[test]
    fn transform_resets_everything() {
        let mut top = unit_square();
        top.geometry(EdgeIdx(2)).unwrap();
        top.transform(|q| Ok(ProjectivePoint::new(q.x() * 2, q.y() * 2, WEIGHT)))
            .unwrap();
        assert!(top.edge_indices().all(|e| !top.edge(e).is_cached()));
        assert_eq!(top.geometry(EdgeIdx(2)).unwrap().length, 2.0);
    }

    #[test]
    fn adjacency_is_directional() {
        let top = unit_square();
        let e0 = top.edge(EdgeIdx(0));
        let e1 = top.edge(EdgeIdx(1));
        assert!(e0.is_adjacent_to(e1));
        assert!(e1.is_adjacent_to(e0));

        // Both arrive at vertex 1.
        let wrong_way = e1.reverse();
        assert!(!e0.is_adjacent_to(&wrong_way));
    }

    #[test]
    fn other_point_and_reverse() {
        let top = unit_square();
        let e = top.edge(EdgeIdx(0));
        assert_eq!(e.other_point(VertexIdx(0)), Some(VertexIdx(1)));
        assert_eq!(e.other_point(VertexIdx(1)), Some(VertexIdx(0)));
        assert_eq!(e.other_point(VertexIdx(2)), None);

        let r = e.reverse();
        assert_eq!((r.from, r.to), (VertexIdx(1), VertexIdx(0)));
        assert_eq!((e.from, e.to), (VertexIdx(0), VertexIdx(1)));
        assert!(!r.is_cached());
    }
}
