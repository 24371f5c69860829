//! Minkowski sums and differences of polygon outlines.
//!
//! Holes are ignored: only the outer loops of the operands matter. Two convex
//! operands are merged directly, in linear time. Two non-convex operands are
//! decomposed into the parallelograms swept by every pair of edges, which are
//! then unioned.

use std::cmp::Ordering;

use crate::{
    boolean::{BooleanOps, Overlay},
    config::Tolerances,
    error::{Error, Result},
    geom::ProjectivePoint,
    polygon::Polygon,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MinkowskiOp {
    /// `{a + b}`.
    Sum,
    /// `{a - b}`.
    Difference,
}

/// `a ⊕ b`, with the default Boolean service and tolerances.
pub fn minkowski_sum(a: &Polygon, b: &Polygon) -> Result<Polygon> {
    minkowski(a, b, MinkowskiOp::Sum, &Overlay::default(), &Tolerances::default())
}

/// `a ⊖ b`, with the default Boolean service and tolerances.
pub fn minkowski_difference(a: &Polygon, b: &Polygon) -> Result<Polygon> {
    minkowski(
        a,
        b,
        MinkowskiOp::Difference,
        &Overlay::default(),
        &Tolerances::default(),
    )
}

/// Computes the Minkowski sum or difference of two outlines.
///
/// Clockwise operands are treated as their counter-clockwise reversals. The
/// result is counter-clockwise.
///
/// Mixing a convex and a non-convex operand is not supported. For two
/// non-convex operands only the outer outline of the result comes back; see
/// [`general_minkowski_region`] for the holes it may enclose.
pub fn minkowski(
    a: &Polygon,
    b: &Polygon,
    op: MinkowskiOp,
    booleans: &impl BooleanOps,
    tolerances: &Tolerances,
) -> Result<Polygon> {
    if a.len() < 2 || b.len() < 2 {
        return Err(Error::Degenerate("Minkowski operands need two vertices"));
    }
    let a = a.to_positive();
    let b = match op {
        MinkowskiOp::Sum => b.to_positive(),
        // A point reflection keeps the orientation.
        MinkowskiOp::Difference => Polygon::new(
            b.to_positive()
                .points()
                .iter()
                .map(ProjectivePoint::checked_neg)
                .collect::<Result<Vec<_>>>()?,
        )?,
    };

    match (a.is_convex(), b.is_convex()) {
        (true, true) => convex_minkowski(&a, &b),
        (false, false) => general_minkowski(&a, &b, booleans, tolerances),
        _ => Err(Error::Unsupported(
            "Minkowski sum of a convex and a non-convex polygon",
        )),
    }
}

/// The lowest vertex, taking the leftmost one on ties.
fn start_index(poly: &Polygon) -> usize {
    let pts = poly.points();
    (0..pts.len())
        .min_by(|&i, &j| pts[i].cmp(&pts[j]))
        .unwrap_or(0)
}

/// The Minkowski sum of two convex, counter-clockwise loops.
///
/// Both loops are walked from their lowest vertex, merging their edges by
/// angle. Parallel edges are taken together.
pub fn convex_minkowski(a: &Polygon, b: &Polygon) -> Result<Polygon> {
    let (pa, pb) = (a.points(), b.points());
    let (n, m) = (pa.len(), pb.len());
    if n == 0 || m == 0 {
        return Err(Error::Degenerate("empty Minkowski operand"));
    }
    let (sa, sb) = (start_index(a), start_index(b));
    let vertex_a = |i: usize| &pa[(sa + i) % n];
    let vertex_b = |j: usize| &pb[(sb + j) % m];

    let mut points = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        points.push(vertex_a(i).checked_add(vertex_b(j))?);
        if i >= n {
            j += 1;
        } else if j >= m {
            i += 1;
        } else {
            let ea = vertex_a(i + 1).checked_sub(vertex_a(i))?;
            let eb = vertex_b(j + 1).checked_sub(vertex_b(j))?;
            let turn = ea.cross_z(&eb)?.signum().cmp(&0);
            if turn != Ordering::Less {
                i += 1;
            }
            if turn != Ordering::Greater {
                j += 1;
            }
        }
    }

    Polygon::new(points)?.cleaned()
}

/// A Minkowski sum with the holes it encloses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinkowskiRegion {
    /// Counter-clockwise.
    pub outline: Polygon,
    /// Clockwise, all inside `outline`.
    pub holes: Vec<Polygon>,
}

/// The Minkowski sum of two arbitrary simple, counter-clockwise loops.
///
/// Only the outline is returned. A sum of non-convex loops can enclose holes,
/// which this drops; [`general_minkowski_region`] keeps them.
pub fn general_minkowski(
    a: &Polygon,
    b: &Polygon,
    booleans: &impl BooleanOps,
    tolerances: &Tolerances,
) -> Result<Polygon> {
    let region = general_minkowski_region(a, b, booleans, tolerances)?;
    if !region.holes.is_empty() {
        log::debug!("dropping {} holes from a Minkowski sum", region.holes.len());
    }
    Ok(region.outline)
}

/// The Minkowski sum of two arbitrary simple, counter-clockwise loops, holes
/// included.
///
/// The sum is the union of the parallelograms `edge_a ⊕ edge_b` together with a
/// copy of each operand translated by a vertex of the other. Parallelograms
/// with negligible area are dropped. If the union falls apart into several
/// pieces, that's reported as an error rather than picking one of them.
pub fn general_minkowski_region(
    a: &Polygon,
    b: &Polygon,
    booleans: &impl BooleanOps,
    tolerances: &Tolerances,
) -> Result<MinkowskiRegion> {
    let (pa, pb) = (a.points(), b.points());
    let (n, m) = (pa.len(), pb.len());
    if n == 0 || m == 0 {
        return Err(Error::Degenerate("empty Minkowski operand"));
    }
    let grid = |i: usize, j: usize| pa[i % n].checked_add(&pb[j % m]);

    let mut pieces = Vec::with_capacity(n * m + 2);
    for i in 0..n {
        for j in 0..m {
            let quad = Polygon::new(vec![
                grid(i, j)?,
                grid(i + 1, j)?,
                grid(i + 1, j + 1)?,
                grid(i, j + 1)?,
            ])?;
            if tolerances.is_negligible_area(quad.area()) {
                log::trace!("dropping a flat quad at ({i}, {j})");
                continue;
            }
            pieces.push(quad.to_positive());
        }
    }
    for (poly, offset) in [(a, &pb[0]), (b, &pa[0])] {
        let moved = poly
            .points()
            .iter()
            .map(|p| p.checked_add(offset))
            .collect::<Result<Vec<_>>>()?;
        pieces.push(Polygon::new(moved)?);
    }
    log::debug!("Minkowski decomposition into {} pieces", pieces.len());

    let (mut positive, holes): (Vec<_>, Vec<_>) = booleans
        .union(&pieces)?
        .into_iter()
        .partition(Polygon::is_positive);
    match positive.len() {
        0 => Err(Error::Degenerate("Minkowski sum has no area")),
        1 => Ok(MinkowskiRegion {
            outline: positive.remove(0),
            holes,
        }),
        count => Err(Error::DisconnectedResult { pieces: count }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boolean::Resolved;
    use assert_matches::assert_matches;

    fn poly(points: &[(f64, f64)]) -> Polygon {
        Polygon::from_xy(points).unwrap()
    }

    fn unit_square() -> Polygon {
        poly(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])
    }

    fn ell() -> Polygon {
        poly(&[
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ])
    }

    #[test]
    fn two_unit_squares() {
        let sum = minkowski_sum(&unit_square(), &unit_square()).unwrap();
        insta::assert_snapshot!(
            format!("{sum:?}"),
            @"Polygon[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]"
        );
    }

    #[test]
    fn sweep_along_a_segment() {
        let seg = poly(&[(0.0, 0.0), (2.0, 0.0)]);
        let sum = minkowski_sum(&unit_square(), &seg).unwrap();
        assert_eq!(sum.area(), 3.0);
        assert_eq!(
            sum,
            poly(&[(0.0, 0.0), (3.0, 0.0), (3.0, 1.0), (0.0, 1.0)])
        );
    }

    #[test]
    fn triangle_and_square() {
        let tri = poly(&[(0.0, 0.0), (2.0, 0.0), (0.0, 2.0)]);
        let sum = minkowski_sum(&tri, &unit_square()).unwrap();
        assert_eq!(sum.area(), 2.0 + 1.0 + 2.0 + 2.0);
        assert_eq!(sum.len(), 5);
    }

    #[test]
    fn clockwise_operands() {
        let sum = minkowski_sum(&unit_square().reversed(), &unit_square()).unwrap();
        assert_eq!(sum.area(), 4.0);
    }

    #[test]
    fn difference_reflects() {
        let diff = minkowski_difference(&unit_square(), &unit_square()).unwrap();
        assert_eq!(
            diff,
            poly(&[(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)])
        );
    }

    #[test]
    fn general_agrees_with_convex() {
        let tri = poly(&[(0.0, 0.0), (3.0, 1.0), (1.0, 2.0)]);
        let hex = poly(&[
            (0.0, 0.0),
            (1.0, -1.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 2.0),
            (0.0, 1.0),
        ]);
        let overlay = Overlay::default();
        let tol = Tolerances::default();
        for (a, b) in [(&tri, &hex), (&hex, &unit_square()), (&unit_square(), &unit_square())] {
            let fast = convex_minkowski(a, b).unwrap();
            let slow = general_minkowski(a, b, &overlay, &tol).unwrap();
            approx::assert_relative_eq!(fast.area(), slow.area());
            assert_eq!(fast, slow);
        }
    }

    #[test]
    fn two_ells() {
        let sum = minkowski_sum(&ell(), &ell()).unwrap();
        assert_eq!(sum.area(), 13.0);
        assert!(sum.is_positive());
    }

    #[test]
    fn enclosed_holes() {
        // A square ring with a slot cut into its top, narrower than the square
        // it gets summed with.
        let ring = poly(&[
            (0.0, 0.0),
            (6.0, 0.0),
            (6.0, 6.0),
            (3.25, 6.0),
            (3.25, 4.0),
            (4.0, 4.0),
            (4.0, 2.0),
            (2.0, 2.0),
            (2.0, 4.0),
            (2.75, 4.0),
            (2.75, 6.0),
            (0.0, 6.0),
        ]);
        let (overlay, tol) = (Overlay::default(), Tolerances::default());
        let region = general_minkowski_region(&ring, &unit_square(), &overlay, &tol).unwrap();
        assert_eq!(region.outline.area(), 49.0);
        insta::assert_snapshot!(
            format!("{:?}", region.holes),
            @"[Polygon[(3.0, 3.0), (3.0, 4.0), (4.0, 4.0), (4.0, 3.0)]]"
        );

        let outline = general_minkowski(&ring, &unit_square(), &overlay, &tol).unwrap();
        assert_eq!(outline, region.outline);
    }

    #[test]
    fn mixed_convexity_is_unsupported() {
        assert_matches!(
            minkowski_sum(&ell(), &unit_square()),
            Err(Error::Unsupported(_))
        );
        assert_matches!(
            minkowski_difference(&unit_square(), &ell()),
            Err(Error::Unsupported(_))
        );
    }

    #[test]
    fn degenerate_operands() {
        let dot = poly(&[(0.0, 0.0)]);
        assert_matches!(
            minkowski_sum(&dot, &unit_square()),
            Err(Error::Degenerate(_))
        );
    }

    /// A Boolean service that doesn't merge anything.
    struct NoMerge;

    impl BooleanOps for NoMerge {
        fn union(&self, polygons: &[Polygon]) -> Result<Vec<Polygon>> {
            Ok(polygons.to_vec())
        }

        fn resolve_self_intersections(&self, polygon: &Polygon) -> Result<Resolved> {
            Ok(Resolved {
                positive: vec![polygon.clone()],
                negative: Vec::new(),
            })
        }
    }

    #[test]
    fn several_pieces_are_an_error() {
        let res = minkowski(
            &ell(),
            &ell(),
            MinkowskiOp::Sum,
            &NoMerge,
            &Tolerances::default(),
        );
        assert_matches!(res, Err(Error::DisconnectedResult { pieces }) if pieces > 1);
    }
}
