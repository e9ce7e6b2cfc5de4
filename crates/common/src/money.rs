//! Money amounts and discount fractions.

use serde::{Deserialize, Serialize};

/// An amount in cents. Serializes as the bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    pub const fn cents(&self) -> i64 {
        self.cents
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Line total for `quantity` units, `None` on overflow.
    pub fn checked_multiply(&self, quantity: i32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }

    /// Adds up amounts, `None` as soon as the running total overflows.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Applies a discount, rounding half away from zero to the nearest cent.
    ///
    /// `Money::from_cents(2000).discounted(Discount::new(0.1)?)` is 1800 cents.
    pub fn discounted(&self, discount: Discount) -> Money {
        let cents = (self.cents as f64 * (1.0 - discount.fraction())).round();
        Money {
            cents: cents as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Error returned for a discount outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscountError(pub f64);

impl std::fmt::Display for DiscountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "discount {} is outside [0, 1]", self.0)
    }
}

impl std::error::Error for DiscountError {}

/// Fraction of the unit price taken off, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Discount(f64);

impl Discount {
    pub fn new(fraction: f64) -> Result<Self, DiscountError> {
        if (0.0..=1.0).contains(&fraction) {
            Ok(Self(fraction))
        } else {
            Err(DiscountError(fraction))
        }
    }

    pub const fn none() -> Self {
        Self(0.0)
    }

    pub const fn fraction(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Discount {
    type Error = DiscountError;

    fn try_from(fraction: f64) -> Result<Self, Self::Error> {
        Self::new(fraction)
    }
}

impl From<Discount> for f64 {
    fn from(discount: Discount) -> Self {
        discount.0
    }
}
