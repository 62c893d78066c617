//! Fixed-point asset amounts.
//!
//! An [`Amount`] is an unsigned 256-bit integer value paired with a decimal
//! precision (digits after the point). The string form is a plain decimal
//! literal: `"12.30"` is value `1230` at precision `2`.
//!
//! Arithmetic is checked: overflow past `2^256 - 1` and underflow below zero
//! are reported as typed errors rather than an in-band sentinel. Operands of
//! different precisions are scaled to the larger precision first, so
//! `"12.3" + "1"` is `"13.3"`.

use num_bigint::BigUint;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Largest representable value, `2^256 - 1`.
static MAX_VALUE: LazyLock<BigUint> = LazyLock::new(|| (BigUint::from(1u8) << 256u32) - 1u8);

/// Errors from amount construction and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Result exceeds `2^256 - 1`.
    #[error("amount overflow")]
    Overflow,
    /// Result would be negative.
    #[error("amount underflow")]
    Underflow,
    /// The literal is not a decimal number.
    #[error("malformed amount literal `{0}`")]
    Malformed(String),
}

/// An unsigned fixed-point decimal with explicit precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    value: BigUint,
    precision: u8,
}

impl Amount {
    /// Construct from a raw integer value and precision.
    pub fn new(value: BigUint, precision: u8) -> Result<Self, AmountError> {
        if value > *MAX_VALUE {
            return Err(AmountError::Overflow);
        }
        Ok(Self { value, precision })
    }

    /// Zero at the given precision.
    pub fn zero(precision: u8) -> Self {
        Self {
            value: BigUint::ZERO,
            precision,
        }
    }

    /// The largest representable amount at the given precision.
    pub fn max_at(precision: u8) -> Self {
        Self {
            value: MAX_VALUE.clone(),
            precision,
        }
    }

    /// Raw integer value.
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// Digits after the decimal point.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn is_zero(&self) -> bool {
        self.value == BigUint::ZERO
    }

    /// Rescale to `precision`, multiplying the value by the matching power of
    /// ten. Only widening is supported; scaling may overflow.
    fn scaled(&self, precision: u8) -> Result<BigUint, AmountError> {
        debug_assert!(precision >= self.precision);
        let factor = BigUint::from(10u8).pow(u32::from(precision - self.precision));
        let value = &self.value * factor;
        if value > *MAX_VALUE {
            return Err(AmountError::Overflow);
        }
        Ok(value)
    }

    /// Checked addition. Operands are scaled to the larger precision.
    pub fn checked_add(&self, rhs: &Amount) -> Result<Amount, AmountError> {
        let precision = self.precision.max(rhs.precision);
        let value = self.scaled(precision)? + rhs.scaled(precision)?;
        if value > *MAX_VALUE {
            return Err(AmountError::Overflow);
        }
        Ok(Amount { value, precision })
    }

    /// Checked subtraction. Operands are scaled to the larger precision.
    pub fn checked_sub(&self, rhs: &Amount) -> Result<Amount, AmountError> {
        let precision = self.precision.max(rhs.precision);
        let lhs = self.scaled(precision)?;
        let rhs = rhs.scaled(precision)?;
        if rhs > lhs {
            return Err(AmountError::Underflow);
        }
        Ok(Amount {
            value: lhs - rhs,
            precision,
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.value.to_string();
        let precision = usize::from(self.precision);
        if precision == 0 {
            return f.write_str(&digits);
        }
        if digits.len() > precision {
            let (whole, frac) = digits.split_at(digits.len() - precision);
            write!(f, "{whole}.{frac}")
        } else {
            write!(f, "0.{}{}", "0".repeat(precision - digits.len()), digits)
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AmountError::Malformed(s.to_owned());
        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(malformed());
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(malformed());
        }
        let precision = u8::try_from(frac.len()).map_err(|_| malformed())?;
        let mut digits = String::with_capacity(whole.len() + frac.len());
        digits.push_str(whole);
        digits.push_str(frac);
        let value = if digits.is_empty() {
            BigUint::ZERO
        } else {
            digits.parse::<BigUint>().map_err(|_| malformed())?
        };
        Amount::new(value, precision)
    }
}
