//! Exact rational numbers over 128-bit integers.
//!
//! Nothing here ever reduces a fraction: values are carried unreduced and
//! compared by cross-multiplication. Arithmetic that would leave the `i128`
//! domain returns [`Error::Overflow`]. Comparisons cannot fail: when a
//! cross-product does not fit in 128 bits they are redone with arbitrary
//! precision integers.

use std::cmp::Ordering;

use malachite::Integer;

use crate::error::{overflow, Error, Result};

/// Compares `a * b` with `c * d`, exactly.
pub(crate) fn cmp_products(a: i128, b: i128, c: i128, d: i128) -> Ordering {
    match (a.checked_mul(b), c.checked_mul(d)) {
        (Some(ab), Some(cd)) => ab.cmp(&cd),
        _ => (Integer::from(a) * Integer::from(b)).cmp(&(Integer::from(c) * Integer::from(d))),
    }
}

pub(crate) fn mul(a: i128, b: i128, op: &'static str) -> Result<i128> {
    a.checked_mul(b).ok_or_else(|| overflow(op))
}

pub(crate) fn add(a: i128, b: i128, op: &'static str) -> Result<i128> {
    a.checked_add(b).ok_or_else(|| overflow(op))
}

pub(crate) fn sub(a: i128, b: i128, op: &'static str) -> Result<i128> {
    a.checked_sub(b).ok_or_else(|| overflow(op))
}

/// `a * b - c * d`, failing instead of wrapping.
pub(crate) fn det2(a: i128, b: i128, c: i128, d: i128, op: &'static str) -> Result<i128> {
    sub(mul(a, b, op)?, mul(c, d, op)?, op)
}

/// A fraction `num / den` with `den > 0`.
#[derive(Clone, Copy, serde::Serialize)]
pub struct Rational {
    num: i128,
    den: i128,
}

impl Rational {
    /// Builds `num / den`, moving the sign into the numerator.
    pub fn new(num: i128, den: i128) -> Result<Self> {
        match den.cmp(&0) {
            Ordering::Equal => Err(Error::ZeroDenominator),
            Ordering::Greater => Ok(Rational { num, den }),
            Ordering::Less => Ok(Rational {
                num: num.checked_neg().ok_or_else(|| overflow("rational sign"))?,
                den: den.checked_neg().ok_or_else(|| overflow("rational sign"))?,
            }),
        }
    }

    pub fn from_int(n: i128) -> Self {
        Rational { num: n, den: 1 }
    }

    pub fn zero() -> Self {
        Rational::from_int(0)
    }

    pub fn one() -> Self {
        Rational::from_int(1)
    }

    pub fn numer(&self) -> i128 {
        self.num
    }

    pub fn denom(&self) -> i128 {
        self.den
    }

    pub fn signum(&self) -> i32 {
        self.num.signum() as i32
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn checked_neg(&self) -> Result<Self> {
        Ok(Rational {
            num: self.num.checked_neg().ok_or_else(|| overflow("rational negation"))?,
            den: self.den,
        })
    }

    pub fn abs(&self) -> Result<Self> {
        if self.num < 0 {
            self.checked_neg()
        } else {
            Ok(*self)
        }
    }

    pub fn checked_add(&self, other: &Rational) -> Result<Self> {
        const OP: &str = "rational addition";
        if self.den == other.den {
            return Ok(Rational {
                num: add(self.num, other.num, OP)?,
                den: self.den,
            });
        }
        Ok(Rational {
            num: add(
                mul(self.num, other.den, OP)?,
                mul(other.num, self.den, OP)?,
                OP,
            )?,
            den: mul(self.den, other.den, OP)?,
        })
    }

    pub fn checked_sub(&self, other: &Rational) -> Result<Self> {
        self.checked_add(&other.checked_neg()?)
    }

    pub fn checked_mul(&self, other: &Rational) -> Result<Self> {
        const OP: &str = "rational multiplication";
        Ok(Rational {
            num: mul(self.num, other.num, OP)?,
            den: mul(self.den, other.den, OP)?,
        })
    }

    pub fn checked_div(&self, other: &Rational) -> Result<Self> {
        const OP: &str = "rational division";
        if other.num == 0 {
            return Err(Error::ZeroDenominator);
        }
        if self.den == other.den {
            return Rational::new(self.num, other.num);
        }
        Rational::new(mul(self.num, other.den, OP)?, mul(self.den, other.num, OP)?)
    }

    /// For output only: every decision inside the kernel is made on the exact value.
    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// The same value as an arbitrary-precision rational.
    pub fn to_exact(&self) -> malachite::Rational {
        malachite::Rational::from_integers(Integer::from(self.num), Integer::from(self.den))
    }
}

impl From<i128> for Rational {
    fn from(n: i128) -> Self {
        Rational::from_int(n)
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.den == other.den {
            self.num.cmp(&other.num)
        } else {
            cmp_products(self.num, other.den, other.num, self.den)
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Rational {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rational {}

impl std::fmt::Debug for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    // Kind of like Arbitrary, but it only returns "reasonable" values: small enough
    // that a handful of operations stays inside 128 bits.
    pub trait Reasonable {
        type Strategy: Strategy<Value = Self>;
        fn reasonable() -> Self::Strategy;
    }

    impl Reasonable for Rational {
        type Strategy = BoxedStrategy<Rational>;

        fn reasonable() -> Self::Strategy {
            (-1_000_000i128..1_000_000, 1i128..1_000_000)
                .prop_map(|(n, d)| Rational::new(n, d).unwrap())
                .boxed()
        }
    }

    #[test]
    fn sign_moves_to_numerator() {
        let r = Rational::new(3, -4).unwrap();
        assert_eq!(r.numer(), -3);
        assert_eq!(r.denom(), 4);
        assert_eq!(r, Rational::new(-6, 8).unwrap());
    }

    #[test]
    fn zero_denominator() {
        assert_matches!(Rational::new(1, 0), Err(Error::ZeroDenominator));
        assert_matches!(
            Rational::one().checked_div(&Rational::zero()),
            Err(Error::ZeroDenominator)
        );
    }

    #[test]
    fn overflow_is_reported() {
        let big = Rational::from_int(i128::MAX);
        assert_matches!(big.checked_add(&Rational::one()), Err(Error::Overflow { .. }));
        assert_matches!(big.checked_mul(&big), Err(Error::Overflow { .. }));
        assert_matches!(
            Rational::from_int(i128::MIN).checked_neg(),
            Err(Error::Overflow { .. })
        );
    }

    #[test]
    fn comparison_beyond_128_bits() {
        // Cross-multiplying these needs about 250 bits.
        let a = Rational::new(i128::MAX - 1, i128::MAX / 3).unwrap();
        let b = Rational::new(i128::MAX - 2, i128::MAX / 3 - 1).unwrap();
        assert_eq!(a.cmp(&b), a.to_exact().cmp(&b.to_exact()));
        assert_ne!(a, b);
    }

    #[test]
    fn equal_denominator_fast_path() {
        let a = Rational::new(1, 7).unwrap();
        let b = Rational::new(3, 7).unwrap();
        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum.denom(), 7);
        assert_eq!(sum, Rational::new(4, 7).unwrap());
    }

    proptest! {
        #[test]
        fn addition_commutes(p in Rational::reasonable(), q in Rational::reasonable()) {
            prop_assert_eq!(p.checked_add(&q).unwrap(), q.checked_add(&p).unwrap());
        }

        #[test]
        fn addition_associates(
            p in Rational::reasonable(),
            q in Rational::reasonable(),
            r in Rational::reasonable(),
        ) {
            let left = p.checked_add(&q).unwrap().checked_add(&r).unwrap();
            let right = p.checked_add(&q.checked_add(&r).unwrap()).unwrap();
            prop_assert_eq!(left, right);
        }

        #[test]
        fn self_difference_is_zero(p in Rational::reasonable()) {
            prop_assert!(p.checked_sub(&p).unwrap().is_zero());
            prop_assert_eq!(p.checked_sub(&p).unwrap(), Rational::zero());
        }

        #[test]
        fn order_matches_difference(p in Rational::reasonable(), q in Rational::reasonable()) {
            let diff = p.checked_sub(&q).unwrap();
            prop_assert_eq!(p.cmp(&q), diff.signum().cmp(&0));
            prop_assert_eq!(p.cmp(&q), p.to_exact().cmp(&q.to_exact()));
        }

        #[test]
        fn division_inverts_multiplication(p in Rational::reasonable(), q in Rational::reasonable()) {
            prop_assume!(!q.is_zero());
            let back = p.checked_mul(&q).unwrap().checked_div(&q).unwrap();
            prop_assert_eq!(back, p);
        }
    }
}
