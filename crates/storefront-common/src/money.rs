//! Fixed-point money amounts
//!
//! Amounts are kept as integer cents so sums never drift. Rates (VAT) are
//! kept in basis points, and applying a rate rounds half away from zero to
//! the cent, the same way `ROUND(x, 2)` does on a SQL numeric.

use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StorefrontError;

/// Largest price accepted for a product or voucher: 9999.99
pub const MAX_PRICE: Money = Money(999_999);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Rounds a floating amount to the nearest cent.
    pub fn from_f64(value: f64) -> Self {
        Money((value * 100.0).round() as i64)
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn checked_mul(self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// `self * (1 + rate)`, rounded to the cent.
    pub fn with_rate(self, rate: Rate) -> Self {
        let scaled = self.0 as i128 * (10_000 + rate.basis_points() as i128);
        Money(div_round(scaled, 10_000) as i64)
    }
}

fn div_round(value: i128, divisor: i128) -> i128 {
    let half = divisor / 2;
    if value >= 0 {
        (value + half) / divisor
    } else {
        (value - half) / divisor
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StorefrontError::illegal(format!("'{}' is not a valid amount", s));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty()
            || whole.len() > 15
            || fraction.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
            || (digits.contains('.') && fraction.is_empty())
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let cents = whole * 100 + fraction;
        Ok(Money(if negative { -cents } else { cents }))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

// Products and sums saturate instead of wrapping, so an out-of-range
// total can never come out small.
impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, qty: i64) -> Money {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| Money(acc.0.saturating_add(m.0)))
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

// Amounts go over the wire as JSON numbers with two decimals.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Money::from_f64(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A percentage rate held in basis points (2000 = 20%).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate(u32);

impl Rate {
    pub const fn from_basis_points(bp: u32) -> Self {
        Rate(bp)
    }

    /// `0.2` becomes 2000 basis points. Negative input is clamped to zero.
    pub fn from_fraction(fraction: f64) -> Self {
        Rate((fraction.max(0.0) * 10_000.0).round() as u32)
    }

    pub const fn basis_points(self) -> u32 {
        self.0
    }

    pub fn as_fraction(self) -> f64 {
        self.0 as f64 / 10_000.0
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("12.34".parse::<Money>().unwrap(), Money::from_cents(1234));
        assert_eq!("12.3".parse::<Money>().unwrap(), Money::from_cents(1230));
        assert_eq!("12".parse::<Money>().unwrap(), Money::from_cents(1200));
        assert_eq!("-0.05".parse::<Money>().unwrap(), Money::from_cents(-5));
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-105).to_string(), "-1.05");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "abc", "1.234", "1.", ".5", "1,00", "--1", "1e3"] {
            assert!(bad.parse::<Money>().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_with_rate_rounds_half_away_from_zero() {
        let vat = Rate::from_fraction(0.2);
        assert_eq!(Money::from_cents(1299).with_rate(vat), Money::from_cents(1559));
        // 0.125 * 1.2 = 0.15 exactly
        assert_eq!(Money::from_cents(125).with_rate(vat), Money::from_cents(150));
        // 0.05 * 1.1 = 0.055 -> 0.06
        assert_eq!(
            Money::from_cents(5).with_rate(Rate::from_basis_points(1000)),
            Money::from_cents(6)
        );
        assert_eq!(
            Money::from_cents(-5).with_rate(Rate::from_basis_points(1000)),
            Money::from_cents(-6)
        );
    }

    #[test]
    fn test_serde_number_and_string() {
        let json = serde_json::to_string(&Money::from_cents(1999)).unwrap();
        assert_eq!(json, "19.99");

        let from_number: Money = serde_json::from_str("19.99").unwrap();
        let from_text: Money = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(from_number, Money::from_cents(1999));
        assert_eq!(from_text, Money::from_cents(1999));
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 5].iter().map(|c| Money::from_cents(*c)).sum();
        assert_eq!(total, Money::from_cents(355));
    }

    #[test]
    fn test_mul_and_sum_saturate() {
        let huge = MAX_PRICE * 10_000_000_000_000_000;
        assert_eq!(huge, Money::from_cents(i64::MAX));
        assert_eq!(MAX_PRICE.checked_mul(10_000_000_000_000_000), None);
        assert_eq!(MAX_PRICE.checked_mul(3), Some(Money::from_cents(2_999_997)));

        let total: Money = [huge, huge].into_iter().sum();
        assert_eq!(total, Money::from_cents(i64::MAX));
        assert_eq!(huge.checked_add(Money::from_cents(1)), None);
    }

    proptest! {
        #[test]
        fn prop_display_parse_roundtrip(cents in -10_000_000i64..10_000_000) {
            let money = Money::from_cents(cents);
            prop_assert_eq!(money.to_string().parse::<Money>().unwrap(), money);
        }

        #[test]
        fn prop_rate_never_decreases_positive_amounts(
            cents in 0i64..10_000_000,
            bp in 0u32..10_000
        ) {
            let money = Money::from_cents(cents);
            prop_assert!(money.with_rate(Rate::from_basis_points(bp)) >= money);
        }
    }
}
