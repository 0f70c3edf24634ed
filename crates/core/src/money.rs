//! Monetary value objects: minor-unit amounts and percentage rates.

use core::fmt;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Signed monetary amount in minor currency units.
///
/// Intermediate settlement arithmetic runs in [`Decimal`]; `Money` is what
/// ends up on the ledger, so flooring to whole minor units is the posting
/// boundary and never happens earlier.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Widen to `i128` for overflow-safe summation.
    pub const fn widened(self) -> i128 {
        self.0 as i128
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Floor a decimal amount to whole minor units.
    ///
    /// The only place where un-floored settlement values become postable.
    pub fn floor_from_decimal(value: Decimal) -> DomainResult<Self> {
        let minor = value
            .floor()
            .to_i64()
            .ok_or_else(|| DomainError::validation(format!("amount out of range: {value}")))?;
        Ok(Self(minor))
    }

    /// Narrow an `i128` sum back to a postable amount.
    pub fn from_widened(value: i128) -> DomainResult<Self> {
        let minor = i64::try_from(value)
            .map_err(|_| DomainError::validation(format!("amount out of range: {value}")))?;
        Ok(Self(minor))
    }
}

impl ValueObject for Money {}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
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

/// Percentage rate (0–100) with decimal precision.
///
/// Broker fees, transaction taxes and flat cuts are all expressed as rates;
/// arithmetic stays in [`Decimal`] so fractional percents apply exactly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(Decimal);

impl Rate {
    pub fn from_percent(percent: Decimal) -> DomainResult<Self> {
        if percent < Decimal::ZERO || percent > Decimal::from(100) {
            return Err(DomainError::validation(format!(
                "rate must be between 0 and 100 percent, got {percent}"
            )));
        }
        Ok(Self(percent))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn as_percent(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// `amount * rate / 100`, exact.
    pub fn applied_to(self, amount: Decimal) -> Decimal {
        amount * self.0 / Decimal::from(100)
    }
}

impl ValueObject for Rate {}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
