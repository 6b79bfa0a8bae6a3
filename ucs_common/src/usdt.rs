use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const USDT_CURRENCY_CODE: &str = "USDT";
pub const RUB_CURRENCY_CODE: &str = "RUB";

/// Number of milli-units in one USDT. Prices carry 2 decimals, but top-up commissions are
/// disambiguated in steps of 0.001, so amounts are stored with 3 decimals of precision.
const MILLI_PER_USDT: i64 = 1000;

//--------------------------------------       Usdt        -----------------------------------------------------------
/// A fixed-point USDT amount, stored as a signed count of milli-USDT (0.001 USDT).
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Usdt(i64);

op!(binary Usdt, Add, add);
op!(binary Usdt, Sub, sub);
op!(inplace Usdt, SubAssign, sub_assign);
op!(unary Usdt, Neg, neg);

impl Mul<i64> for Usdt {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from_milli(self.value() * rhs)
    }
}

impl Sum for Usdt {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in milli-USDT: {0}")]
pub struct UsdtConversionError(String);

impl Usdt {
    pub fn from_milli(value: i64) -> Self {
        Self(value)
    }

    pub fn from_whole(value: i64) -> Self {
        Self(value * MILLI_PER_USDT)
    }

    /// The raw value in milli-USDT.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// The amount rounded (half away from zero) to whole cents, as used in user-facing summaries.
    pub fn to_cents(&self) -> i64 {
        let half = if self.0 >= 0 { 5 } else { -5 };
        (self.0 + half) / 10
    }
}

impl From<i64> for Usdt {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Usdt {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Usdt {}

impl TryFrom<u64> for Usdt {
    type Error = UsdtConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(UsdtConversionError(format!("Value {value} is too large to convert to Usdt")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

/// Displays the amount quantized to 2 decimal places, e.g. `5.00`.
impl Display for Usdt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cents = self.to_cents();
        let sign = if cents < 0 { "-" } else { "" };
        let cents = cents.abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl FromStr for Usdt {
    type Err = UsdtConversionError;

    /// Parses a decimal amount such as `12.345`, keeping at most 3 decimal places.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if frac.len() > 3 {
            return Err(UsdtConversionError(format!("Too many decimal places in '{s}'")));
        }
        let whole = if whole.is_empty() {
            0
        } else {
            whole.parse::<i64>().map_err(|e| UsdtConversionError(format!("'{s}': {e}")))?
        };
        let mut milli = 0i64;
        if !frac.is_empty() {
            milli = frac.parse::<i64>().map_err(|e| UsdtConversionError(format!("'{s}': {e}")))?;
            for _ in frac.len()..3 {
                milli *= 10;
            }
        }
        Ok(Self(sign * (whole * MILLI_PER_USDT + milli)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_is_quantized_to_cents() {
        assert_eq!(Usdt::from_whole(5).to_string(), "5.00");
        assert_eq!(Usdt::from_milli(5005).to_string(), "5.01");
        assert_eq!(Usdt::from_milli(5004).to_string(), "5.00");
        assert_eq!(Usdt::from_milli(-1250).to_string(), "-1.25");
        assert_eq!(Usdt::from_milli(1).to_string(), "0.00");
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("5".parse::<Usdt>().unwrap(), Usdt::from_whole(5));
        assert_eq!("5.00".parse::<Usdt>().unwrap(), Usdt::from_whole(5));
        assert_eq!("1.001".parse::<Usdt>().unwrap(), Usdt::from_milli(1001));
        assert_eq!("0.1".parse::<Usdt>().unwrap(), Usdt::from_milli(100));
        assert_eq!("-2.5".parse::<Usdt>().unwrap(), Usdt::from_milli(-2500));
        assert!("1.0001".parse::<Usdt>().is_err());
    }

    #[test]
    fn arithmetic() {
        let a = Usdt::from_whole(10);
        let b = Usdt::from_milli(2500);
        assert_eq!(a - b, Usdt::from_milli(7500));
        assert_eq!(b * 4, Usdt::from_whole(10));
        assert_eq!(-b, Usdt::from_milli(-2500));
        let total: Usdt = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Usdt::from_milli(15_000));
    }
}
