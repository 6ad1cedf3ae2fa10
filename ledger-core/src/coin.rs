//! Coin and rate arithmetic
//!
//! Coins are non-negative integers in the smallest denomination. Rates are
//! exact decimals in `[0, 1]`. Every multiplication is carried out in 128-bit
//! integer arithmetic and floored, so the same inputs produce the same coin on
//! every platform.
//!
//! # Rounding
//!
//! `coin × rate` is truncated toward zero. The truncated remainder is not
//! carried anywhere; callers that split a coin compute one side by
//! multiplication and the other side by subtraction, so the two sides always
//! add back up to the original coin.

use crate::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// Number of coin units in one token
pub const COIN_PER_TOKEN: u64 = 100_000;

/// Maximum number of fractional digits accepted in a token amount string
pub const TOKEN_DECIMALS: u32 = 5;

/// Maximum number of fractional digits a rate may carry
pub const MAX_RATE_SCALE: u32 = 18;

lazy_static! {
    static ref TOKEN_AMOUNT: Regex =
        Regex::new(r"^[0-9]+(\.[0-9]{1,5})?$").expect("token amount pattern");
    static ref RATE_LITERAL: Regex =
        Regex::new(r"^[0-9]+(\.[0-9]{1,18})?$").expect("rate pattern");
}

/// Token amount in the smallest denomination
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Coin(u64);

impl Coin {
    /// Zero coin
    pub const ZERO: Coin = Coin(0);

    /// Create from a raw coin amount
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// Create from a whole number of tokens
    ///
    /// # Panics
    ///
    /// Panics if the amount overflows the coin range.
    pub fn from_tokens(tokens: u64) -> Self {
        match tokens.checked_mul(COIN_PER_TOKEN) {
            Some(amount) => Self(amount),
            None => panic!("coin overflow: {} tokens", tokens),
        }
    }

    /// Parse a decimal token string such as `"100"` or `"0.00001"`
    ///
    /// Only plain digits with at most [`TOKEN_DECIMALS`] fractional digits
    /// are accepted. Signs, exponents, separators and a bare leading or
    /// trailing point are rejected, as are values outside the coin range.
    pub fn from_token_str(amount: &str) -> Result<Self> {
        if !TOKEN_AMOUNT.is_match(amount) {
            return Err(Error::InvalidAmount(format!(
                "{:?} is not a token amount with at most {} fractional digits",
                amount, TOKEN_DECIMALS
            )));
        }
        let tokens = Decimal::from_str_exact(amount)
            .map_err(|e| Error::InvalidAmount(format!("{:?}: {}", amount, e)))?;

        tokens
            .checked_mul(Decimal::from(COIN_PER_TOKEN))
            .and_then(|coins| coins.to_u64())
            .map(Self)
            .ok_or_else(|| Error::InvalidAmount(format!("{:?} is out of range", amount)))
    }

    /// Raw coin amount
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Amount expressed in tokens
    pub fn to_tokens(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), TOKEN_DECIMALS).normalize()
    }

    /// Check for zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtract, failing instead of going negative
    pub fn minus(self, other: Coin) -> Result<Coin> {
        self.0
            .checked_sub(other.0)
            .map(Coin)
            .ok_or(Error::NegativeCoin {
                minuend: self,
                subtrahend: other,
            })
    }

    /// Multiply by a rate, flooring the result
    pub fn mul_rate(self, rate: Rate) -> Coin {
        let (numerator, denominator) = rate.as_fraction();
        self.mul_div_floor(numerator, denominator)
    }

    /// Compute `floor(self × numerator / denominator)` exactly
    ///
    /// # Panics
    ///
    /// Panics on a zero denominator or when the result exceeds the coin range.
    /// Neither can happen for factors in `[0, 1]`.
    pub fn mul_div_floor(self, numerator: u64, denominator: u64) -> Coin {
        assert!(denominator != 0, "coin division by zero");
        // u64 × u64 always fits in u128
        let product = u128::from(self.0) * u128::from(numerator);
        match u64::try_from(product / u128::from(denominator)) {
            Ok(amount) => Coin(amount),
            Err(_) => panic!(
                "coin overflow: {} * {} / {}",
                self.0, numerator, denominator
            ),
        }
    }
}

impl Add for Coin {
    type Output = Coin;

    /// # Panics
    ///
    /// Panics on overflow. Amounts are bounded by total supply, so an overflow
    /// is a programming error.
    fn add(self, other: Coin) -> Coin {
        match self.0.checked_add(other.0) {
            Some(sum) => Coin(sum),
            None => panic!("coin overflow: {} + {}", self.0, other.0),
        }
    }
}

impl AddAssign for Coin {
    fn add_assign(&mut self, other: Coin) {
        *self = *self + other;
    }
}

impl std::iter::Sum for Coin {
    fn sum<I: Iterator<Item = Coin>>(iter: I) -> Coin {
        iter.fold(Coin::ZERO, Add::add)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Exact rate in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate(Decimal);

impl Rate {
    /// Zero rate
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// Unit rate
    pub const ONE: Rate = Rate(Decimal::ONE);

    /// 0.01
    pub const ONE_PERCENT: Rate = Rate(Decimal::from_parts(1, 0, 0, false, 2));

    /// Create a rate, checking range and precision
    pub fn new(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(Error::InvalidRate(format!("{} is negative", value)));
        }
        if value > Decimal::ONE {
            return Err(Error::InvalidRate(format!("{} is greater than one", value)));
        }

        let value = value.normalize();
        if value.scale() > MAX_RATE_SCALE {
            return Err(Error::InvalidRate(format!(
                "{} has more than {} fractional digits",
                value, MAX_RATE_SCALE
            )));
        }

        Ok(Self(value.abs()))
    }

    /// Create `numerator / 10^scale`, e.g. `Rate::from_parts(7, 1)` is 0.7
    pub fn from_parts(numerator: u64, scale: u32) -> Result<Self> {
        if scale > MAX_RATE_SCALE {
            return Err(Error::InvalidRate(format!(
                "scale {} exceeds {}",
                scale, MAX_RATE_SCALE
            )));
        }
        Self::new(Decimal::from_i128_with_scale(i128::from(numerator), scale))
    }

    /// `1 - self`
    pub fn complement(&self) -> Rate {
        Rate((Decimal::ONE - self.0).normalize())
    }

    /// Underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Check for zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `(numerator, denominator)` with denominator `10^scale`
    fn as_fraction(&self) -> (u64, u64) {
        // Range and scale are enforced on construction, so both fit in u64.
        let numerator = self.0.mantissa().unsigned_abs() as u64;
        let denominator = 10u64.pow(self.0.scale());
        (numerator, denominator)
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self> {
        Rate::new(value)
    }
}

impl From<Rate> for Decimal {
    fn from(rate: Rate) -> Decimal {
        rate.0
    }
}

impl FromStr for Rate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if !RATE_LITERAL.is_match(s) {
            return Err(Error::InvalidRate(format!(
                "{:?} is not a decimal with at most {} fractional digits",
                s, MAX_RATE_SCALE
            )));
        }
        let value = Decimal::from_str_exact(s)
            .map_err(|e| Error::InvalidRate(format!("{:?}: {}", s, e)))?;
        Rate::new(value)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
