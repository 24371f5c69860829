//! Closed polygon loops on the base grid, and the exact queries on them.

use std::cmp::Ordering;

use crate::{
    error::{Error, Result},
    geom::{orient, BoundingBox, ProjectivePoint, MAX_GRID, WEIGHT},
    num::{add, det2, mul, sub, Rational},
};

/// A closed loop of points on the base grid.
///
/// Counter-clockwise loops have positive area and describe solids;
/// clockwise loops describe holes.
#[derive(Clone, PartialEq, Eq, serde::Serialize)]
pub struct Polygon {
    points: Vec<ProjectivePoint>,
    twice_area: i128,
    bbox: Option<BoundingBox>,
}

/// Where a point is, relative to a polygon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Location {
    Inside,
    Outside,
    Boundary,
}

/// Whether one loop lies inside another without crossing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Containment {
    Inside,
    Outside,
    /// The loops cross, or they coincide so closely that sampling can't tell.
    Unknown,
}

impl Polygon {
    /// Builds a polygon from a loop of points. Points off the base grid are
    /// rounded onto it.
    ///
    /// Fails with [`Error::OutOfRange`] if a rounded point is more than
    /// [`MAX_GRID`] grid units from the origin along either axis.
    pub fn new(points: Vec<ProjectivePoint>) -> Result<Self> {
        let points = points
            .into_iter()
            .map(|p| {
                let p = p.snap_to_grid()?;
                let limit = MAX_GRID.unsigned_abs();
                if p.x().unsigned_abs() > limit || p.y().unsigned_abs() > limit {
                    return Err(Error::OutOfRange {
                        value: format!("{p:?}"),
                    });
                }
                Ok(p)
            })
            .collect::<Result<Vec<_>>>()?;
        let bbox = BoundingBox::from_points(&points)?;
        let twice_area = twice_signed_area(&points)?;
        Ok(Polygon {
            points,
            twice_area,
            bbox,
        })
    }

    pub fn from_xy(points: &[(f64, f64)]) -> Result<Self> {
        Polygon::new(
            points
                .iter()
                .map(|&(x, y)| ProjectivePoint::from_f64(x, y))
                .collect::<Result<Vec<_>>>()?,
        )
    }

    pub fn points(&self) -> &[ProjectivePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn to_f64(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(ProjectivePoint::to_f64).collect()
    }

    /// Twice the signed area, in squared grid units. Exact.
    pub fn twice_signed_area(&self) -> i128 {
        self.twice_area
    }

    /// The signed area in input units.
    pub fn area(&self) -> f64 {
        self.twice_area as f64 / (2.0 * (WEIGHT * WEIGHT) as f64)
    }

    pub fn is_positive(&self) -> bool {
        self.twice_area > 0
    }

    pub fn reversed(&self) -> Polygon {
        let mut points = self.points.clone();
        points.reverse();
        Polygon {
            points,
            twice_area: -self.twice_area,
            bbox: self.bbox,
        }
    }

    /// The same loop, oriented counter-clockwise.
    pub fn to_positive(&self) -> Polygon {
        if self.twice_area < 0 {
            self.reversed()
        } else {
            self.clone()
        }
    }

    /// `None` for the empty polygon.
    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.bbox.as_ref()
    }

    /// Iterates over the edges as `(from, to)` pairs, closing the loop.
    pub fn edges(&self) -> impl Iterator<Item = (&ProjectivePoint, &ProjectivePoint)> {
        let n = self.points.len();
        (0..n).map(move |i| (&self.points[i], &self.points[(i + 1) % n]))
    }

    /// Is this loop convex?
    ///
    /// Collinear vertices are allowed. Loops with two vertices count as convex;
    /// fewer than two is not a loop at all.
    pub fn is_convex(&self) -> bool {
        let n = self.points.len();
        if n < 2 {
            return false;
        }
        if n == 2 {
            return self.points[0] != self.points[1];
        }

        let mut turn = Ordering::Equal;
        for i in 0..n {
            let (a, b, c) = (
                &self.points[i],
                &self.points[(i + 1) % n],
                &self.points[(i + 2) % n],
            );
            match orient(a, b, c) {
                // A spike doubles back on itself.
                Ordering::Equal if a != b && b != c && !between(a, c, b) => return false,
                Ordering::Equal => {}
                o if turn == Ordering::Equal => turn = o,
                o if o != turn => return false,
                _ => {}
            }
        }

        // Consistent turns aren't enough: a pentagram turns left everywhere.
        // A convex loop goes up once and down once.
        sign_changes(self.points.iter().map(|p| p.y())) <= 2
            && sign_changes(self.points.iter().map(|p| p.x())) <= 2
    }

    /// Locates a point exactly, using the winding number.
    pub fn locate(&self, p: &ProjectivePoint) -> Location {
        let mut winding = 0i32;
        for (a, b) in self.edges() {
            if on_segment(a, b, p) {
                return Location::Boundary;
            }
            if a.cmp_y(p).is_le() {
                if b.cmp_y(p).is_gt() && orient(a, b, p).is_gt() {
                    winding += 1;
                }
            } else if b.cmp_y(p).is_le() && orient(a, b, p).is_lt() {
                winding -= 1;
            }
        }
        if winding != 0 {
            Location::Inside
        } else {
            Location::Outside
        }
    }

    /// Does `other` lie inside this polygon without crossing its boundary?
    ///
    /// Touching the boundary at isolated points is allowed.
    pub fn contains_loop(&self, other: &Polygon) -> Result<Containment> {
        match (self.bounding_box(), other.bounding_box()) {
            (Some(ours), Some(theirs)) if ours.encompasses(theirs) => {}
            _ => return Ok(Containment::Outside),
        }

        let mut inside = false;
        let mut outside = false;
        for (a, b) in other.edges() {
            for q in [*a, a.midpoint(b)?] {
                match self.locate(&q) {
                    Location::Inside => inside = true,
                    Location::Outside => outside = true,
                    Location::Boundary => {}
                }
            }
        }

        Ok(match (inside, outside) {
            (true, true) | (false, false) => Containment::Unknown,
            (false, true) => Containment::Outside,
            (true, false) => {
                let crosses = other.edges().any(|(a, b)| {
                    self.edges()
                        .any(|(c, d)| crosses_properly(a, b, c, d))
                });
                if crosses {
                    Containment::Unknown
                } else {
                    Containment::Inside
                }
            }
        })
    }

    /// Drops repeated and collinear vertices, including spikes.
    pub fn cleaned(&self) -> Result<Polygon> {
        let mut points = self.points.clone();
        loop {
            let n = points.len();
            if n < 3 {
                break;
            }
            let redundant = (0..n).find(|&i| {
                let prev = &points[(i + n - 1) % n];
                let next = &points[(i + 1) % n];
                orient(prev, &points[i], next) == Ordering::Equal
            });
            match redundant {
                Some(i) => {
                    points.remove(i);
                }
                None => break,
            }
        }
        if points.len() == 2 && points[0] == points[1] {
            points.pop();
        }
        Polygon::new(points)
    }
}

impl std::fmt::Debug for Polygon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Polygon")?;
        f.debug_list().entries(self.points.iter()).finish()
    }
}

fn twice_signed_area(points: &[ProjectivePoint]) -> Result<i128> {
    const OP: &str = "polygon area";
    let n = points.len();
    (0..n).try_fold(0, |acc, i| {
        let (p, q) = (&points[i], &points[(i + 1) % n]);
        add(acc, det2(p.x(), q.y(), q.x(), p.y(), OP)?, OP)
    })
}

fn sign_changes(values: impl Iterator<Item = i128>) -> usize {
    let values: Vec<_> = values.collect();
    let n = values.len();
    let signs: Vec<_> = (0..n)
        .map(|i| (values[(i + 1) % n] - values[i]).signum())
        .filter(|&s| s != 0)
        .collect();
    let m = signs.len();
    (0..m).filter(|&i| signs[i] != signs[(i + 1) % m]).count()
}

/// Is `p` on the closed segment `a`-`b`?
pub(crate) fn on_segment(a: &ProjectivePoint, b: &ProjectivePoint, p: &ProjectivePoint) -> bool {
    orient(a, b, p) == Ordering::Equal && between(a, b, p)
}

/// Assuming `p` is on the line through `a` and `b`, is it between them?
pub(crate) fn between(a: &ProjectivePoint, b: &ProjectivePoint, p: &ProjectivePoint) -> bool {
    let in_range = |lo: Ordering, hi: Ordering| lo.is_le() && hi.is_ge() || lo.is_ge() && hi.is_le();
    in_range(a.cmp_x(p), b.cmp_x(p)) && in_range(a.cmp_y(p), b.cmp_y(p))
}

/// Do the open segments `a`-`b` and `c`-`d` cross at a single interior point?
pub(crate) fn crosses_properly(
    a: &ProjectivePoint,
    b: &ProjectivePoint,
    c: &ProjectivePoint,
    d: &ProjectivePoint,
) -> bool {
    let (o1, o2) = (orient(a, b, c), orient(a, b, d));
    let (o3, o4) = (orient(c, d, a), orient(c, d, b));
    o1 != Ordering::Equal && o2 == o1.reverse() && o3 != Ordering::Equal && o4 == o3.reverse()
}

/// The exact squared distance from `p` to the closed segment `a`-`b`, in
/// squared grid units. All three points must be on the base grid.
fn squared_distance_to_segment(
    p: &ProjectivePoint,
    a: &ProjectivePoint,
    b: &ProjectivePoint,
) -> Result<Rational> {
    const OP: &str = "squared distance";
    let (abx, aby) = (sub(b.x(), a.x(), OP)?, sub(b.y(), a.y(), OP)?);
    let (apx, apy) = (sub(p.x(), a.x(), OP)?, sub(p.y(), a.y(), OP)?);
    let (bpx, bpy) = (sub(p.x(), b.x(), OP)?, sub(p.y(), b.y(), OP)?);
    let dot = |x0, y0, x1, y1| add(mul(x0, x1, OP)?, mul(y0, y1, OP)?, OP);

    if dot(apx, apy, abx, aby)? <= 0 {
        return Ok(Rational::from_int(dot(apx, apy, apx, apy)?));
    }
    if dot(bpx, bpy, abx, aby)? >= 0 {
        return Ok(Rational::from_int(dot(bpx, bpy, bpx, bpy)?));
    }
    // Below 2^63 for grid points, so its square still fits.
    let cross = det2(abx, apy, aby, apx, OP)?;
    Rational::new(mul(cross, cross, OP)?, dot(abx, aby, abx, aby)?)
}

/// The Euclidean distance from `point` to the nearest edge of `polygon`.
///
/// The comparison between edges is exact; only the final answer is rounded.
/// Returns `None` for an empty polygon.
pub fn min_distance_to_polygon(point: &ProjectivePoint, polygon: &Polygon) -> Result<Option<f64>> {
    min_distance_to_polygons(point, std::slice::from_ref(polygon))
}

/// The Euclidean distance from `point` to the nearest edge of any of `polygons`.
pub fn min_distance_to_polygons(
    point: &ProjectivePoint,
    polygons: &[Polygon],
) -> Result<Option<f64>> {
    let point = point.snap_to_grid()?;
    let mut best: Option<Rational> = None;
    for poly in polygons {
        for (a, b) in poly.edges() {
            let d = squared_distance_to_segment(&point, a, b)?;
            if best.map_or(true, |best| d < best) {
                best = Some(d);
            }
        }
    }
    Ok(best.map(|d| d.to_f64().sqrt() / WEIGHT as f64))
}
