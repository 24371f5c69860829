//! Nesting a flat set of loops into trees of solids, holes, islands...
//!
//! Loops are inserted smallest first. Each new loop adopts every earlier loop
//! that it contains and that hasn't found a parent yet (the "open branches").
//! Since anything containing a loop is bigger than it, every loop ends up
//! attached to the smallest loop around it.
//!
//! Containment alone doesn't guarantee that signs alternate, so afterwards the
//! forest is repaired: either by trusting the signs and moving loops around
//! ([`SignConvention::Asserted`]) or by trusting the nesting and reversing
//! loops ([`SignConvention::ByDepth`]).

use crate::{
    error::Result,
    polygon::{Containment, Polygon},
};

/// An index for a node within a [`PolygonTree`].
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct NodeIdx(pub usize);

impl std::fmt::Debug for NodeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n_{}", self.0)
    }
}

/// How to reconcile loop orientations with the nesting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SignConvention {
    /// The orientations are meaningful: counter-clockwise loops are solids and
    /// clockwise loops are holes. Loops are moved around the forest until signs
    /// alternate, and holes with no solid around them become stray holes.
    #[default]
    Asserted,
    /// The orientations are meaningless. Outermost loops are made solids and
    /// then signs alternate with depth; the shape of the forest is untouched.
    ByDepth,
}

#[derive(Clone, Debug, serde::Serialize)]
struct Node {
    polygon: Polygon,
    parent: Option<NodeIdx>,
    children: Vec<NodeIdx>,
    stray: bool,
}

/// A forest of nested polygons.
///
/// Every node is either a root, a descendant of a root, or a stray hole.
/// After building, roots are positive, and signs strictly alternate
/// from parent to child.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct PolygonTree {
    nodes: Vec<Node>,
}

impl PolygonTree {
    /// Nests `polygons`, whatever order they come in.
    pub fn build(polygons: Vec<Polygon>, signs: SignConvention) -> Result<Self> {
        let mut polygons = polygons;
        // The sort is stable, so equal areas keep their order.
        polygons.sort_by_key(|p| p.twice_signed_area().unsigned_abs());
        PolygonTree::build_from_smallest(polygons, signs)
    }

    /// Nests `polygons`, which must already be ordered from the largest to the
    /// smallest (in absolute area). No sorting happens: the caller's order
    /// decides ties.
    pub fn build_ordered(polygons_largest_first: Vec<Polygon>, signs: SignConvention) -> Result<Self> {
        let mut polygons = polygons_largest_first;
        polygons.reverse();
        PolygonTree::build_from_smallest(polygons, signs)
    }

    fn build_from_smallest(polygons: Vec<Polygon>, signs: SignConvention) -> Result<Self> {
        let mut tree = PolygonTree::default();
        let mut open: Vec<NodeIdx> = Vec::new();

        for poly in polygons {
            if poly.twice_signed_area() == 0 {
                log::trace!("skipping a flat loop of {} vertices", poly.len());
                continue;
            }
            let idx = tree.push(poly);

            let mut i = open.len();
            while i > 0 {
                i -= 1;
                let branch = open[i];
                let (outer, inner) = (&tree[idx], &tree[branch]);
                let encompasses = match (outer.bounding_box(), inner.bounding_box()) {
                    (Some(o), Some(b)) => o.encompasses(b),
                    _ => false,
                };
                if encompasses && outer.contains_loop(inner)? == Containment::Inside {
                    log::trace!("{idx:?} adopts {branch:?}");
                    open.remove(i);
                    tree.attach(idx, branch);
                }
            }
            open.push(idx);
        }

        match signs {
            SignConvention::Asserted => tree.repair(),
            SignConvention::ByDepth => tree.orient_by_depth(),
        }
        log::debug!(
            "nested {} loops into {} trees, {} stray holes",
            tree.nodes.len(),
            tree.roots().len(),
            tree.stray_holes().len()
        );
        Ok(tree)
    }

    fn push(&mut self, polygon: Polygon) -> NodeIdx {
        self.nodes.push(Node {
            polygon,
            parent: None,
            children: Vec::new(),
            stray: false,
        });
        NodeIdx(self.nodes.len() - 1)
    }

    fn is_positive(&self, idx: NodeIdx) -> bool {
        self.nodes[idx.0].polygon.is_positive()
    }

    /// Demotes negative top-level loops to stray holes and fixes up the signs
    /// below the positive ones.
    fn repair(&mut self) {
        let mut work = self.roots();
        work.reverse();
        while let Some(idx) = work.pop() {
            if self.is_positive(idx) {
                for up in self.repair_children(idx) {
                    work.push(up);
                }
            } else {
                log::trace!("{idx:?} is a stray hole");
                let children = std::mem::take(&mut self.nodes[idx.0].children);
                for &child in &children {
                    self.nodes[child.0].parent = None;
                }
                self.nodes[idx.0].stray = true;
                work.extend(children.into_iter().rev());
            }
        }
    }

    /// Makes signs alternate below `idx`, assuming `idx` itself is fine.
    ///
    /// Returns the children that have the same sign as `idx`. They are
    /// detached, and belong one level up.
    fn repair_children(&mut self, idx: NodeIdx) -> Vec<NodeIdx> {
        let positive = self.is_positive(idx);
        let mut pending = std::mem::take(&mut self.nodes[idx.0].children);
        let mut kept = Vec::new();
        let mut promoted = Vec::new();

        let mut i = 0;
        while i < pending.len() {
            let child = pending[i];
            i += 1;
            if self.is_positive(child) == positive {
                log::trace!("{child:?} has the same sign as its parent {idx:?}");
                self.nodes[child.0].parent = None;
                promoted.push(child);
            } else {
                self.nodes[child.0].parent = Some(idx);
                kept.push(child);
                // Whatever the child pushes up has the child's sign, so it's
                // valid here; it still needs checking below.
                pending.extend(self.repair_children(child));
            }
        }

        self.nodes[idx.0].children = kept;
        promoted
    }

    fn orient_by_depth(&mut self) {
        let mut stack: Vec<(NodeIdx, bool)> =
            self.roots().into_iter().rev().map(|r| (r, true)).collect();
        while let Some((idx, positive)) = stack.pop() {
            let node = &mut self.nodes[idx.0];
            if node.polygon.is_positive() != positive {
                node.polygon = node.polygon.reversed();
            }
            stack.extend(node.children.iter().rev().map(|&c| (c, !positive)));
        }
    }

    /// The number of nodes, stray holes included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The nodes with no parent that aren't stray holes.
    pub fn roots(&self) -> Vec<NodeIdx> {
        (0..self.nodes.len())
            .map(NodeIdx)
            .filter(|&i| self.nodes[i.0].parent.is_none() && !self.nodes[i.0].stray)
            .collect()
    }

    /// Negative loops that aren't inside any positive loop.
    pub fn stray_holes(&self) -> Vec<NodeIdx> {
        (0..self.nodes.len())
            .map(NodeIdx)
            .filter(|&i| self.nodes[i.0].stray)
            .collect()
    }

    pub fn polygon(&self, idx: NodeIdx) -> &Polygon {
        &self.nodes[idx.0].polygon
    }

    pub fn parent(&self, idx: NodeIdx) -> Option<NodeIdx> {
        self.nodes[idx.0].parent
    }

    pub fn children(&self, idx: NodeIdx) -> &[NodeIdx] {
        &self.nodes[idx.0].children
    }

    pub fn is_stray(&self, idx: NodeIdx) -> bool {
        self.nodes[idx.0].stray
    }

    /// Makes `child` a child of `parent`, detaching it from wherever it was.
    ///
    /// `parent` must not be inside `child`'s subtree.
    pub fn attach(&mut self, parent: NodeIdx, child: NodeIdx) {
        debug_assert!(!self.descendants(child).contains(&parent));
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Removes `child` from its parent's children, making it a root (unless
    /// it's a stray hole).
    pub fn detach(&mut self, child: NodeIdx) {
        if let Some(parent) = self.nodes[child.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != child);
        }
    }

    /// `idx` and everything below it, parents before children.
    pub fn descendants(&self, idx: NodeIdx) -> Vec<NodeIdx> {
        let mut ret = Vec::new();
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            ret.push(i);
            stack.extend(self.nodes[i.0].children.iter().rev());
        }
        ret
    }

    /// All of the tree nodes, grouped by root.
    ///
    /// Each inner vec starts with a root, followed by everything inside it.
    pub fn grouped(&self) -> Vec<Vec<NodeIdx>> {
        self.roots()
            .into_iter()
            .map(|r| self.descendants(r))
            .collect()
    }

    /// The polygons in the trees, flattened root by root. Stray holes are not included.
    pub fn polygons(&self) -> Vec<Polygon> {
        self.grouped()
            .into_iter()
            .flatten()
            .map(|i| self.nodes[i.0].polygon.clone())
            .collect()
    }

    pub fn stray_hole_polygons(&self) -> Vec<Polygon> {
        self.stray_holes()
            .into_iter()
            .map(|i| self.nodes[i.0].polygon.clone())
            .collect()
    }
}

impl std::ops::Index<NodeIdx> for PolygonTree {
    type Output = Polygon;

    fn index(&self, index: NodeIdx) -> &Self::Output {
        &self.nodes[index.0].polygon
    }
}
