//! Homogeneous points with exact integer coordinates.
//!
//! Floating-point input is scaled by [`WEIGHT`] and rounded once, on the way
//! in. From then on, every predicate is evaluated on integers.
//!
//! # Range
//!
//! Input coordinates are limited to `|c| <= MAX_COORDINATE = 2^14`, so a base
//! point (one with `w == WEIGHT == 2^16`) has `|x|, |y| <= 2^30`. The highest
//! degree computations in the kernel stay inside `i128`:
//!
//! - differences of base points: `2^31`; 2D cross and dot products of those: `2^63`;
//! - the line through two base points (`p.cross(q)`): `|a|, |b| <= 2^47`, `|c| <= 2^61`;
//! - the intersection of two such lines (a cross of crosses): `|x|, |y| <= 2^109`,
//!   `|w| <= 2^95`;
//! - comparing such an intersection with a base point: `2^109 * 2^16` against
//!   `2^30 * 2^95`, so a difference below `2^126`.
//!
//! Polygons accept base points up to [`MAX_GRID`], twice the input range, so
//! that the Minkowski sum of two in-range polygons is still a polygon. At that
//! size the intersection of two lines grows to `|x|, |y| <= 2^112`, and
//! comparisons against it no longer fit; those fall back to arbitrary
//! precision.
//!
//! Arithmetic that goes past this fails with [`Error::Overflow`]; comparisons
//! fall back to arbitrary precision and never fail.

use std::cmp::Ordering;

use malachite::Integer;
use ordered_float::NotNan;

use crate::{
    error::{overflow, Error, Result},
    num::{add, cmp_products, det2, mul, sub, Rational},
};

/// The fixed weight `W₀` that floating coordinates are scaled by.
pub const WEIGHT: i128 = 1 << 16;

/// The largest supported absolute value of an input coordinate.
pub const MAX_COORDINATE: f64 = 16384.0;

/// The largest absolute grid coordinate of a polygon vertex.
pub const MAX_GRID: i128 = 1 << 31;

/// A point `(x / w, y / w)` in homogeneous coordinates.
///
/// Points produced by this crate always have `w > 0`. The result of
/// [`ProjectivePoint::cross`] is a line (or a point at infinity) and may have
/// any sign of `w`, including zero.
///
/// Points are sorted by `y` and then by `x`.
#[derive(Clone, Copy, serde::Serialize)]
pub struct ProjectivePoint {
    x: i128,
    y: i128,
    w: i128,
}

impl ProjectivePoint {
    pub fn new(x: i128, y: i128, w: i128) -> Self {
        ProjectivePoint { x, y, w }
    }

    /// A point on the base grid, in units of `1 / WEIGHT`.
    pub fn from_grid(x: i64, y: i64) -> Self {
        ProjectivePoint {
            x: x.into(),
            y: y.into(),
            w: WEIGHT,
        }
    }

    pub fn from_f64(x: f64, y: f64) -> Result<Self> {
        Ok(ProjectivePoint {
            x: scale(x)?,
            y: scale(y)?,
            w: WEIGHT,
        })
    }

    pub fn x(&self) -> i128 {
        self.x
    }

    pub fn y(&self) -> i128 {
        self.y
    }

    pub fn w(&self) -> i128 {
        self.w
    }

    /// Is this point on the base grid?
    pub fn is_base(&self) -> bool {
        self.w == WEIGHT
    }

    /// For output only.
    pub fn to_f64(&self) -> (f64, f64) {
        let w = self.w as f64;
        (self.x as f64 / w, self.y as f64 / w)
    }

    pub fn x_rational(&self) -> Result<Rational> {
        Rational::new(self.x, self.w)
    }

    pub fn y_rational(&self) -> Result<Rational> {
        Rational::new(self.y, self.w)
    }

    /// Flips the signs of all coordinates if needed, so that `w > 0`.
    pub fn normalized(self) -> Result<Self> {
        if self.w >= 0 {
            return Ok(self);
        }
        let neg = |c: i128| c.checked_neg().ok_or_else(|| overflow("normalize"));
        Ok(ProjectivePoint {
            x: neg(self.x)?,
            y: neg(self.y)?,
            w: neg(self.w)?,
        })
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        self.combine(other, add, "point addition")
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        self.combine(other, sub, "point subtraction")
    }

    fn combine(
        &self,
        other: &Self,
        f: fn(i128, i128, &'static str) -> Result<i128>,
        op: &'static str,
    ) -> Result<Self> {
        if self.w == other.w {
            return Ok(ProjectivePoint {
                x: f(self.x, other.x, op)?,
                y: f(self.y, other.y, op)?,
                w: self.w,
            });
        }
        Ok(ProjectivePoint {
            x: f(mul(self.x, other.w, op)?, mul(other.x, self.w, op)?, op)?,
            y: f(mul(self.y, other.w, op)?, mul(other.y, self.w, op)?, op)?,
            w: mul(self.w, other.w, op)?,
        })
    }

    pub fn checked_neg(&self) -> Result<Self> {
        let neg = |c: i128| c.checked_neg().ok_or_else(|| overflow("point negation"));
        Ok(ProjectivePoint {
            x: neg(self.x)?,
            y: neg(self.y)?,
            w: self.w,
        })
    }

    /// The homogeneous cross product.
    ///
    /// Of two points, this is the line through them; of two lines, their
    /// intersection point.
    pub fn cross(&self, other: &Self) -> Result<Self> {
        const OP: &str = "homogeneous cross";
        Ok(ProjectivePoint {
            x: det2(self.y, other.w, self.w, other.y, OP)?,
            y: det2(self.w, other.x, self.x, other.w, OP)?,
            w: det2(self.x, other.y, self.y, other.x, OP)?,
        })
    }

    /// The 2D cross product `x1 * y2 - y1 * x2`, treating both as vectors.
    pub fn cross_z(&self, other: &Self) -> Result<Rational> {
        const OP: &str = "2d cross";
        Rational::new(
            det2(self.x, other.y, self.y, other.x, OP)?,
            mul(self.w, other.w, OP)?,
        )
    }

    pub fn dot(&self, other: &Self) -> Result<Rational> {
        const OP: &str = "dot";
        Rational::new(
            add(mul(self.x, other.x, OP)?, mul(self.y, other.y, OP)?, OP)?,
            mul(self.w, other.w, OP)?,
        )
    }

    /// The midpoint, which stays exact by doubling the weight.
    pub fn midpoint(&self, other: &Self) -> Result<Self> {
        let sum = self.checked_add(other)?;
        Ok(ProjectivePoint {
            w: mul(sum.w, 2, "midpoint")?,
            ..sum
        })
    }

    /// Rounds to the nearest base-grid point.
    pub fn snap_to_grid(&self) -> Result<Self> {
        let p = self.normalized()?;
        if p.w == 0 {
            return Err(Error::Degenerate("point at infinity"));
        }
        if p.is_base() {
            return Ok(p);
        }
        // c * WEIGHT / w, rounded half up. The whole part is split off first,
        // so that only the remainder gets scaled.
        let round = |c: i128| -> Result<i128> {
            const OP: &str = "snap";
            let (whole, rem) = (c.div_euclid(p.w), c.rem_euclid(p.w));
            let frac = add(mul(mul(rem, WEIGHT, OP)?, 2, OP)?, p.w, OP)?
                .div_euclid(mul(p.w, 2, OP)?);
            add(mul(whole, WEIGHT, OP)?, frac, OP)
        };
        Ok(ProjectivePoint {
            x: round(p.x)?,
            y: round(p.y)?,
            w: WEIGHT,
        })
    }

    pub fn cmp_x(&self, other: &Self) -> Ordering {
        cmp_products(self.x, other.w, other.x, self.w)
    }

    pub fn cmp_y(&self, other: &Self) -> Ordering {
        cmp_products(self.y, other.w, other.y, self.w)
    }
}

fn scale(c: f64) -> Result<i128> {
    let c = NotNan::new(c).map_err(|_| Error::NonFinite)?;
    if c.is_infinite() {
        return Err(Error::NonFinite);
    }
    if c.abs() > MAX_COORDINATE {
        return Err(Error::OutOfRange {
            value: c.to_string(),
        });
    }
    // In range, so the product has at most 30 integer bits.
    Ok((c.into_inner() * WEIGHT as f64).round() as i128)
}

/// The orientation of the triangle `p, q, r`: `Greater` if it turns
/// counter-clockwise, `Less` if clockwise and `Equal` if the points are collinear.
///
/// Like the comparisons, this never fails: determinants that do not fit in
/// 128 bits are recomputed with arbitrary precision.
pub fn orient(p: &ProjectivePoint, q: &ProjectivePoint, r: &ProjectivePoint) -> Ordering {
    let det_sign = match orient_det(p, q, r) {
        Ok(det) => det.signum(),
        Err(_) => {
            let big = Integer::from;
            let minor_x = big(q.y) * big(r.w) - big(r.y) * big(q.w);
            let minor_y = big(q.x) * big(r.w) - big(r.x) * big(q.w);
            let minor_w = big(q.x) * big(r.y) - big(r.x) * big(q.y);
            let det = big(p.x) * minor_x - big(p.y) * minor_y + big(p.w) * minor_w;
            match det.cmp(&Integer::from(0)) {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            }
        }
    };
    (det_sign * p.w.signum() * q.w.signum() * r.w.signum()).cmp(&0)
}

fn orient_det(p: &ProjectivePoint, q: &ProjectivePoint, r: &ProjectivePoint) -> Result<i128> {
    const OP: &str = "orientation";
    if p.w == q.w && q.w == r.w {
        // This is the full determinant divided by w^2, with the sign of w restored.
        let det = det2(
            sub(q.x, p.x, OP)?,
            sub(r.y, p.y, OP)?,
            sub(q.y, p.y, OP)?,
            sub(r.x, p.x, OP)?,
            OP,
        )?;
        return mul(det, p.w.signum(), OP);
    }

    let minor_x = det2(q.y, r.w, r.y, q.w, OP)?;
    let minor_y = det2(q.x, r.w, r.x, q.w, OP)?;
    let minor_w = det2(q.x, r.y, r.x, q.y, OP)?;
    add(
        sub(mul(p.x, minor_x, OP)?, mul(p.y, minor_y, OP)?, OP)?,
        mul(p.w, minor_w, OP)?,
        OP,
    )
}

impl Ord for ProjectivePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_y(other).then_with(|| self.cmp_x(other))
    }
}

impl PartialOrd for ProjectivePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ProjectivePoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ProjectivePoint {}

impl std::fmt::Debug for ProjectivePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (x, y) = self.to_f64();
        write!(f, "({x:?}, {y:?})")
    }
}

/// An axis-aligned bounding box with exact extents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct BoundingBox {
    pub min_x: Rational,
    pub min_y: Rational,
    pub max_x: Rational,
    pub max_y: Rational,
}

impl BoundingBox {
    /// Returns `None` for an empty iterator.
    pub fn from_points<'a>(
        points: impl IntoIterator<Item = &'a ProjectivePoint>,
    ) -> Result<Option<Self>> {
        let mut ret: Option<BoundingBox> = None;
        for p in points {
            let (x, y) = (p.x_rational()?, p.y_rational()?);
            ret = Some(match ret {
                None => BoundingBox {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                Some(b) => BoundingBox {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            });
        }
        Ok(ret)
    }

    /// Does this box contain all of `other` (boundaries may touch)?
    pub fn encompasses(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}
