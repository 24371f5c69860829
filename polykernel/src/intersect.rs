//! Exact classification of how two edges meet.
//!
//! Every decision here comes from [`orient`] and exact coordinate
//! comparisons, so two points that are mathematically the same are never
//! treated as distinct.

use std::cmp::Ordering;

use crate::{
    error::Result,
    geom::{orient, ProjectivePoint},
    polygon::on_segment,
    topology::{EdgeIdx, Topology},
};

/// How two edges meet, when they meet at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Relation {
    /// A single point in the interior of both edges.
    Crossing,
    /// A single point that is an endpoint of at least one edge.
    Touching,
    /// The edges are collinear and share a piece of positive length. Such a
    /// pair produces one record for each end of the shared piece.
    Overlapping,
}

/// Where an intersection point lies along one edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum SegmentLocation {
    Start,
    Interior,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Collinearity {
    NotCollinear,
    /// Collinear, sharing at least one point.
    Overlapping,
    /// On the same line, but apart.
    Disjoint,
}

/// One point where two edges meet.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SegmentIntersection {
    pub edges: [EdgeIdx; 2],
    pub point: ProjectivePoint,
    pub relation: Relation,
    /// Where `point` is on `edges[0]` and `edges[1]` respectively.
    pub location: [SegmentLocation; 2],
    pub collinearity: Collinearity,
    /// Traversal marks for graph walks over the intersections, one per edge.
    /// Never read here.
    pub visited: [bool; 2],
}

struct Segment<'a> {
    idx: EdgeIdx,
    from: &'a ProjectivePoint,
    to: &'a ProjectivePoint,
}

impl<'a> Segment<'a> {
    fn new(topology: &'a Topology, idx: EdgeIdx) -> Self {
        let (from, to) = topology.endpoints(idx);
        Segment { idx, from, to }
    }

    fn is_degenerate(&self) -> bool {
        self.from == self.to
    }

    /// Where on this segment `p` is, given that it is on the segment.
    fn locate(&self, p: &ProjectivePoint) -> SegmentLocation {
        if p == self.from {
            SegmentLocation::Start
        } else if p == self.to {
            SegmentLocation::End
        } else {
            SegmentLocation::Interior
        }
    }

    /// Compares two points on this segment's line by their position along it.
    fn along(&self, p: &ProjectivePoint, q: &ProjectivePoint) -> Ordering {
        let dir = self.from.cmp_x(self.to);
        if dir != Ordering::Equal {
            if dir == Ordering::Less {
                p.cmp_x(q)
            } else {
                q.cmp_x(p)
            }
        } else if self.from.cmp_y(self.to) == Ordering::Less {
            p.cmp_y(q)
        } else {
            q.cmp_y(p)
        }
    }
}

fn record(
    a: &Segment,
    b: &Segment,
    point: ProjectivePoint,
    relation: Relation,
    collinearity: Collinearity,
) -> SegmentIntersection {
    SegmentIntersection {
        edges: [a.idx, b.idx],
        location: [a.locate(&point), b.locate(&point)],
        point,
        relation,
        collinearity,
        visited: [false, false],
    }
}

fn collinearity_of(a: &Segment, b: &Segment) -> Collinearity {
    if a.is_degenerate() || b.is_degenerate() {
        return Collinearity::NotCollinear;
    }
    if orient(a.from, a.to, b.from) != Ordering::Equal
        || orient(a.from, a.to, b.to) != Ordering::Equal
    {
        return Collinearity::NotCollinear;
    }
    let (lo, hi) = overlap(a, b);
    if a.along(lo, hi) == Ordering::Greater {
        Collinearity::Disjoint
    } else {
        Collinearity::Overlapping
    }
}

/// The ends of the overlap of two collinear segments, in `a`'s direction.
/// If they don't overlap, the first one comes after the second.
fn overlap<'s>(a: &Segment<'s>, b: &Segment<'s>) -> (&'s ProjectivePoint, &'s ProjectivePoint) {
    let (b_lo, b_hi) = if a.along(b.from, b.to) == Ordering::Greater {
        (b.to, b.from)
    } else {
        (b.from, b.to)
    };
    let lo = if a.along(a.from, b_lo) == Ordering::Less {
        b_lo
    } else {
        a.from
    };
    let hi = if a.along(a.to, b_hi) == Ordering::Greater {
        b_hi
    } else {
        a.to
    };
    (lo, hi)
}

/// Tells whether two edges lie on a common line, and whether they share points there.
pub fn collinearity(topology: &Topology, a: EdgeIdx, b: EdgeIdx) -> Collinearity {
    collinearity_of(&Segment::new(topology, a), &Segment::new(topology, b))
}

/// Finds every point where edges `a` and `b` meet.
///
/// Non-intersecting edges produce nothing, crossing or touching edges one
/// record, and overlapping edges a record for each end of the overlap.
pub fn classify(topology: &Topology, a: EdgeIdx, b: EdgeIdx) -> Result<Vec<SegmentIntersection>> {
    let sa = Segment::new(topology, a);
    let sb = Segment::new(topology, b);

    // A zero-length edge is just a point.
    if sa.is_degenerate() || sb.is_degenerate() {
        let (point_seg, other) = if sa.is_degenerate() { (&sa, &sb) } else { (&sb, &sa) };
        let p = *point_seg.from;
        let hit = if other.is_degenerate() {
            other.from == &p
        } else {
            on_segment(other.from, other.to, &p)
        };
        return Ok(if hit {
            vec![record(&sa, &sb, p, Relation::Touching, Collinearity::NotCollinear)]
        } else {
            Vec::new()
        });
    }

    match collinearity_of(&sa, &sb) {
        Collinearity::Disjoint => return Ok(Vec::new()),
        Collinearity::Overlapping => {
            let (lo, hi) = overlap(&sa, &sb);
            let c = Collinearity::Overlapping;
            return Ok(if lo == hi {
                vec![record(&sa, &sb, *lo, Relation::Touching, c)]
            } else {
                vec![
                    record(&sa, &sb, *lo, Relation::Overlapping, c),
                    record(&sa, &sb, *hi, Relation::Overlapping, c),
                ]
            });
        }
        Collinearity::NotCollinear => {}
    }

    let o1 = orient(sa.from, sa.to, sb.from);
    let o2 = orient(sa.from, sa.to, sb.to);
    let o3 = orient(sb.from, sb.to, sa.from);
    let o4 = orient(sb.from, sb.to, sa.to);
    if (o1 == o2 && o1 != Ordering::Equal) || (o3 == o4 && o3 != Ordering::Equal) {
        return Ok(Vec::new());
    }

    let point = if o1 == Ordering::Equal {
        *sb.from
    } else if o2 == Ordering::Equal {
        *sb.to
    } else if o3 == Ordering::Equal {
        *sa.from
    } else if o4 == Ordering::Equal {
        *sa.to
    } else {
        let la = sa.from.cross(sa.to)?;
        let lb = sb.from.cross(sb.to)?;
        la.cross(&lb)?.normalized()?
    };

    let mut rec = record(&sa, &sb, point, Relation::Touching, Collinearity::NotCollinear);
    if rec.location == [SegmentLocation::Interior; 2] {
        rec.relation = Relation::Crossing;
    }
    Ok(vec![rec])
}

/// Classifies every pair of the given edges.
///
/// Pairs whose bounding boxes are apart are rejected before anything exact is
/// computed. Consecutive edges of a loop are not special: they show up as
/// touching at their shared vertex.
pub fn find_intersections(
    topology: &Topology,
    edges: &[EdgeIdx],
) -> Result<Vec<SegmentIntersection>> {
    let mut ret = Vec::new();
    for (i, &a) in edges.iter().enumerate() {
        let a_box = topology.geometry(a)?.bbox;
        for &b in &edges[(i + 1)..] {
            if !a_box.intersects(&topology.geometry(b)?.bbox) {
                continue;
            }
            ret.extend(classify(topology, a, b)?);
        }
    }
    log::trace!("{} intersections among {} edges", ret.len(), edges.len());
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::WEIGHT;
    use assert_matches::assert_matches;

    fn p(x: f64, y: f64) -> ProjectivePoint {
        ProjectivePoint::from_f64(x, y).unwrap()
    }

    /// A topology with one two-point loop per segment; segment `i` is edge `2 * i`.
    fn segments(segs: &[((f64, f64), (f64, f64))]) -> Topology {
        let mut top = Topology::default();
        for &((x0, y0), (x1, y1)) in segs {
            top.add_loop([p(x0, y0), p(x1, y1)]);
        }
        top
    }

    fn classify_first_two(segs: &[((f64, f64), (f64, f64))]) -> Vec<SegmentIntersection> {
        let top = segments(segs);
        classify(&top, EdgeIdx(0), EdgeIdx(2)).unwrap()
    }

    #[test]
    fn proper_crossing() {
        let recs = classify_first_two(&[((0.0, 0.0), (2.0, 2.0)), ((0.0, 2.0), (2.0, 0.0))]);
        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert_eq!(rec.relation, Relation::Crossing);
        assert_eq!(rec.point, p(1.0, 1.0));
        assert_eq!(rec.location, [SegmentLocation::Interior; 2]);
        assert_eq!(rec.collinearity, Collinearity::NotCollinear);
        assert_eq!(rec.visited, [false, false]);
    }

    #[test]
    fn crossing_off_the_grid() {
        let recs = classify_first_two(&[((0.0, 0.0), (1.0, 0.0)), ((0.0, -1.0), (1.0, 2.0))]);
        assert_matches!(recs.as_slice(), [rec] if rec.relation == Relation::Crossing);
        // x = 1/3 isn't on the grid, but the point is still exact.
        assert_eq!(recs[0].point, ProjectivePoint::new(WEIGHT, 0, 3 * WEIGHT));
        assert!(!recs[0].point.is_base());
    }

    #[test]
    fn t_junction() {
        let recs = classify_first_two(&[((0.0, 0.0), (2.0, 0.0)), ((1.0, 0.0), (1.0, 1.0))]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].relation, Relation::Touching);
        assert_eq!(
            recs[0].location,
            [SegmentLocation::Interior, SegmentLocation::Start]
        );
    }

    #[test]
    fn shared_endpoint() {
        let recs = classify_first_two(&[((0.0, 0.0), (1.0, 0.0)), ((1.0, 0.0), (1.0, 1.0))]);
        assert_eq!(recs[0].relation, Relation::Touching);
        assert_eq!(recs[0].location, [SegmentLocation::End, SegmentLocation::Start]);
    }

    #[test]
    fn apart() {
        assert!(classify_first_two(&[((0.0, 0.0), (1.0, 0.0)), ((0.0, 1.0), (1.0, 2.0))]).is_empty());
        // Parallel.
        assert!(classify_first_two(&[((0.0, 0.0), (1.0, 0.0)), ((0.0, 1.0), (1.0, 1.0))]).is_empty());
    }

    #[test]
    fn collinear_overlap() {
        let segs = [((0.0, 0.0), (2.0, 0.0)), ((3.0, 0.0), (1.0, 0.0))];
        let recs = classify_first_two(&segs);
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| r.relation == Relation::Overlapping));
        assert!(recs.iter().all(|r| r.collinearity == Collinearity::Overlapping));
        assert_eq!(recs[0].point, p(1.0, 0.0));
        assert_eq!(
            recs[0].location,
            [SegmentLocation::Interior, SegmentLocation::End]
        );
        assert_eq!(recs[1].point, p(2.0, 0.0));
        assert_eq!(
            recs[1].location,
            [SegmentLocation::End, SegmentLocation::Interior]
        );
    }

    #[test]
    fn collinear_disjoint_and_touching() {
        let top = segments(&[((0.0, 0.0), (1.0, 1.0)), ((2.0, 2.0), (3.0, 3.0))]);
        assert!(classify(&top, EdgeIdx(0), EdgeIdx(2)).unwrap().is_empty());
        assert_eq!(collinearity(&top, EdgeIdx(0), EdgeIdx(2)), Collinearity::Disjoint);

        let recs = classify_first_two(&[((0.0, 5.0), (0.0, 1.0)), ((0.0, 1.0), (0.0, 0.0))]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].relation, Relation::Touching);
        assert_eq!(recs[0].collinearity, Collinearity::Overlapping);
    }

    #[test]
    fn all_pairs_of_a_square() {
        let mut top = Topology::default();
        let l = top.add_loop([p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]);
        let recs = find_intersections(&top, top.loop_edges(l)).unwrap();
        // Only consecutive edges meet, at the four corners.
        assert_eq!(recs.len(), 4);
        assert!(recs.iter().all(|r| r.relation == Relation::Touching));
    }
}
