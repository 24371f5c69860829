//! Boolean operations on sets of polygons.
//!
//! [`Overlay`] splits every input edge at every intersection, merges
//! coincident pieces, and then decides for each piece which of its two sides
//! is inside the result. The pieces with the result on exactly one side are
//! the output boundary, and they get walked into loops.
//!
//! Deciding a side means computing the winding number of a point just off the
//! middle of the piece. That point is infinitesimally close to the piece, so
//! the computation is symbolic: every predicate is a lexicographic sign of a
//! polynomial in the infinitesimal, evaluated exactly.
//!
//! Crossing points that aren't on the base grid get rounded onto it, which
//! moves the adjoining pieces very slightly. A moved piece can cross pieces it
//! didn't cross before, so splitting repeats until the pieces only meet at
//! their ends.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    config::Tolerances,
    error::{Error, Result},
    geom::{ProjectivePoint, WEIGHT},
    intersect::{find_intersections, SegmentLocation},
    polygon::Polygon,
    topology::{EdgeIdx, Topology},
};

/// The Boolean operations that the higher-level algorithms rely on.
pub trait BooleanOps {
    /// Merges a collection of polygons into the smallest set of loops covering
    /// the same region.
    ///
    /// A point is covered if its total winding number is positive, so
    /// clockwise loops subtract from the counter-clockwise ones around them.
    /// Holes in the result come out clockwise.
    fn union(&self, polygons: &[Polygon]) -> Result<Vec<Polygon>>;

    /// Splits a possibly self-intersecting loop into simple pieces.
    fn resolve_self_intersections(&self, polygon: &Polygon) -> Result<Resolved>;
}

/// The simple pieces of a self-intersecting loop.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolved {
    /// Boundaries of the region the loop winds around positively. Holes in
    /// that region come out clockwise.
    pub positive: Vec<Polygon>,
    /// Boundaries of the region the loop winds around negatively, clockwise.
    pub negative: Vec<Polygon>,
}

/// The default, exact, Boolean service.
#[derive(Clone, Copy, Debug, Default)]
pub struct Overlay {
    pub tolerances: Tolerances,
}

impl Overlay {
    pub fn new(tolerances: Tolerances) -> Self {
        Overlay { tolerances }
    }

    fn loops(&self, pieces: &[Piece]) -> Result<Vec<Polygon>> {
        let mut ret = Vec::new();
        for mut ring in trace(pieces)? {
            // Start at the lowest, then leftmost, vertex. It's never collinear, so
            // cleaning keeps it in front.
            if let Some(lowest) = (0..ring.len()).min_by_key(|&i| (ring[i].1, ring[i].0)) {
                ring.rotate_left(lowest);
            }
            let poly = Polygon::new(ring.into_iter().map(to_point).collect())?.cleaned()?;
            if poly.len() >= 3 && !self.tolerances.is_negligible_area(poly.area()) {
                ret.push(poly);
            }
        }
        Ok(ret)
    }
}

impl BooleanOps for Overlay {
    fn union(&self, polygons: &[Polygon]) -> Result<Vec<Polygon>> {
        let arr = Arrangement::new(polygons)?;
        let ret = self.loops(&arr.boundary(|w| w > 0, true))?;
        log::debug!(
            "union of {} polygons: {} pieces, {} loops",
            polygons.len(),
            arr.pieces.len(),
            ret.len()
        );
        Ok(ret)
    }

    fn resolve_self_intersections(&self, polygon: &Polygon) -> Result<Resolved> {
        let arr = Arrangement::new(std::slice::from_ref(polygon))?;
        let ret = Resolved {
            positive: self.loops(&arr.boundary(|w| w > 0, true))?,
            negative: self.loops(&arr.boundary(|w| w < 0, false))?,
        };
        log::trace!(
            "resolved a loop of {} vertices into {} positive and {} negative pieces",
            polygon.len(),
            ret.positive.len(),
            ret.negative.len()
        );
        Ok(ret)
    }
}

/// A point on the base grid, in grid units.
type GridPoint = (i128, i128);

fn to_grid(p: &ProjectivePoint) -> GridPoint {
    (p.x(), p.y())
}

fn to_point(p: GridPoint) -> ProjectivePoint {
    ProjectivePoint::new(p.0, p.1, WEIGHT)
}

fn cross(a: GridPoint, b: GridPoint) -> i128 {
    a.0 * b.1 - a.1 * b.0
}

fn dot(a: GridPoint, b: GridPoint) -> i128 {
    a.0 * b.0 + a.1 * b.1
}

fn diff(a: GridPoint, b: GridPoint) -> GridPoint {
    (a.0 - b.0, a.1 - b.1)
}

/// The sign of the first non-zero term.
fn lex_sign(terms: [i128; 3]) -> Ordering {
    terms
        .into_iter()
        .map(|t| t.cmp(&0))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// A piece of an input edge that no other edge crosses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Piece {
    from: GridPoint,
    to: GridPoint,
}

impl Piece {
    fn dir(&self) -> GridPoint {
        diff(self.to, self.from)
    }
}

struct Arrangement {
    /// All pieces, coincident ones included, in their input direction.
    pieces: Vec<Piece>,
    /// The distinct pieces, as `(smaller, larger)` endpoint pairs.
    segments: BTreeSet<(GridPoint, GridPoint)>,
}

/// How many rounds of splitting to allow before giving up.
const MAX_ROUNDS: usize = 32;

impl Arrangement {
    fn new(polygons: &[Polygon]) -> Result<Self> {
        let mut pieces: Vec<Piece> = polygons
            .iter()
            .flat_map(Polygon::edges)
            .map(|(a, b)| Piece {
                from: to_grid(a),
                to: to_grid(b),
            })
            .filter(|p| p.from != p.to)
            .collect();

        for round in 0..MAX_ROUNDS {
            let (split, changed) = split_pieces(&pieces)?;
            pieces = split;
            if !changed {
                let segments = pieces
                    .iter()
                    .map(|p| (p.from.min(p.to), p.from.max(p.to)))
                    .collect();
                return Ok(Arrangement { pieces, segments });
            }
            log::trace!("split round {round}: {} pieces", pieces.len());
        }
        Err(Error::Degenerate("edge crossings did not settle on the grid"))
    }

    /// The winding number of the point `m + εn + ε²(0, 1)`, for an
    /// infinitesimal `ε > 0`. `m` is in doubled grid coordinates.
    ///
    /// Doubled coordinates are at most 2^32, so nothing below exceeds 2^68.
    fn winding_near(&self, m: GridPoint, n: GridPoint) -> i32 {
        let below = |y: i128| lex_sign([y - m.1, -n.1, -1]).is_lt();
        let mut winding = 0;
        for piece in &self.pieces {
            let u = (2 * piece.from.0, 2 * piece.from.1);
            let v = (2 * piece.to.0, 2 * piece.to.1);
            let e = diff(v, u);
            let side = lex_sign([cross(e, diff(m, u)), cross(e, n), e.0]);
            if below(u.1) {
                if !below(v.1) && side.is_gt() {
                    winding += 1;
                }
            } else if below(v.1) && side.is_lt() {
                winding -= 1;
            }
        }
        winding
    }

    /// The pieces with `inside` true on one side only, directed so that the
    /// inside is on the left (or on the right, if `!interior_left`).
    fn boundary(&self, inside: impl Fn(i32) -> bool, interior_left: bool) -> Vec<Piece> {
        let mut ret = Vec::new();
        for &(a, b) in &self.segments {
            let d = diff(b, a);
            let m = (a.0 + b.0, a.1 + b.1);
            let left = inside(self.winding_near(m, (-d.1, d.0)));
            let right = inside(self.winding_near(m, (d.1, -d.0)));
            if left == right {
                continue;
            }
            ret.push(if left == interior_left {
                Piece { from: a, to: b }
            } else {
                Piece { from: b, to: a }
            });
        }
        ret
    }
}

/// Splits every piece wherever another piece meets its interior, rounding the
/// meeting points onto the grid. The flag says whether any piece was split.
fn split_pieces(pieces: &[Piece]) -> Result<(Vec<Piece>, bool)> {
    let mut topology = Topology::default();
    let mut edges = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let l = topology.add_loop([to_point(piece.from), to_point(piece.to)]);
        edges.extend(topology.loop_edges(l).first().copied());
    }

    let mut splits: BTreeMap<EdgeIdx, Vec<GridPoint>> = BTreeMap::new();
    for rec in find_intersections(&topology, &edges)? {
        for k in 0..2 {
            if rec.location[k] == SegmentLocation::Interior {
                splits
                    .entry(rec.edges[k])
                    .or_default()
                    .push(to_grid(&rec.point.snap_to_grid()?));
            }
        }
    }

    let mut ret = Vec::with_capacity(pieces.len());
    let mut changed = false;
    for (piece, e) in pieces.iter().zip(&edges) {
        let mut inner = splits.remove(e).unwrap_or_default();
        inner.retain(|&p| p != piece.from && p != piece.to);
        inner.sort_by_key(|&p| dot(diff(p, piece.from), piece.dir()));

        let mut points = vec![piece.from];
        points.extend(inner);
        points.push(piece.to);
        points.dedup();
        changed |= points.len() > 2;
        ret.extend(points.windows(2).map(|w| Piece {
            from: w[0],
            to: w[1],
        }));
    }
    Ok((ret, changed))
}

/// Which of the half-turns clockwise from `r` the direction `d` is in: the
/// first one (including the direction opposite `r`) or the second one.
fn half(r: GridPoint, d: GridPoint) -> u8 {
    let c = cross(r, d);
    if c < 0 || (c == 0 && dot(r, d) < 0) {
        0
    } else {
        1
    }
}

/// Compares directions by the clockwise angle they make with `r`.
fn cmp_clockwise(r: GridPoint, a: GridPoint, b: GridPoint) -> Ordering {
    half(r, a)
        .cmp(&half(r, b))
        .then_with(|| cross(a, b).cmp(&0))
}

/// Walks directed boundary pieces into closed loops.
///
/// At a vertex with several ways out, we take the one making the sharpest
/// clockwise turn from where we came from. That keeps the region on the left
/// of every loop in one piece, and splits loops that only touch at a vertex.
fn trace(pieces: &[Piece]) -> Result<Vec<Vec<GridPoint>>> {
    let mut outgoing: BTreeMap<GridPoint, Vec<usize>> = BTreeMap::new();
    for (i, piece) in pieces.iter().enumerate() {
        outgoing.entry(piece.from).or_default().push(i);
    }

    let mut used = vec![false; pieces.len()];
    let mut loops = Vec::new();
    for start in 0..pieces.len() {
        if used[start] {
            continue;
        }
        let mut ring = Vec::new();
        let mut cur = start;
        loop {
            used[cur] = true;
            ring.push(pieces[cur].from);
            let here = pieces[cur].to;
            let back = diff(pieces[cur].from, here);
            let next = outgoing
                .get(&here)
                .into_iter()
                .flatten()
                .copied()
                .filter(|&e| !used[e] || e == start)
                .min_by(|&x, &y| cmp_clockwise(back, pieces[x].dir(), pieces[y].dir()))
                .ok_or_else(|| {
                    Error::MalformedTopology(format!(
                        "boundary dead-ends at {:?}",
                        to_point(here)
                    ))
                })?;
            if next == start {
                break;
            }
            cur = next;
        }
        loops.push(ring);
    }
    Ok(loops)
}
