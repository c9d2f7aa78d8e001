//! Decimal text rendering and validation for number attributes.
//!
//! The store keeps numbers as decimal strings with at most 38 significant
//! digits and a leading-digit exponent in `-130..=125`. Native values are
//! rendered without exponent notation and checked against those limits.

use std::cmp::Ordering;
use std::fmt::Display;

use crate::error::NumberError;
use crate::types::{MAX_NUMBER_EXPONENT, MAX_NUMBER_PRECISION, MIN_NUMBER_EXPONENT};

/// Render an f64 as decimal text.
///
/// Rust's float `Display` emits the shortest digits that round-trip and
/// never uses exponent notation, so parsing the text back yields the same
/// value. `-0.0` is normalized to `0`.
pub fn format_float(value: f64) -> Result<String, NumberError> {
    if value.is_nan() {
        return Err(NumberError::NaN);
    }
    if value.is_infinite() {
        return Err(NumberError::Infinite);
    }
    if value == 0.0 {
        return Ok("0".to_string());
    }
    let text = value.to_string();
    check_decimal(&text)?;
    Ok(text)
}

/// Render an f32 as decimal text; see [`format_float`].
pub fn format_float32(value: f32) -> Result<String, NumberError> {
    if value.is_nan() {
        return Err(NumberError::NaN);
    }
    if value.is_infinite() {
        return Err(NumberError::Infinite);
    }
    if value == 0.0 {
        return Ok("0".to_string());
    }
    let text = value.to_string();
    check_decimal(&text)?;
    Ok(text)
}

/// Render a wide integer, failing if it has more digits than the store keeps.
pub fn format_integer(value: impl Display) -> Result<String, NumberError> {
    let text = value.to_string();
    check_decimal(&text)?;
    Ok(text)
}

/// Validate plain decimal text (`-?digits[.digits]`) against the store's limits.
pub fn check_decimal(text: &str) -> Result<(), NumberError> {
    if text.contains(['e', 'E']) {
        return Err(NumberError::Malformed(text.to_string()));
    }
    let decimal = Decimal::parse(text)?;
    if decimal.is_zero() {
        return Ok(());
    }

    let digits = decimal.digits.len();
    if digits > MAX_NUMBER_PRECISION {
        return Err(NumberError::Precision {
            digits,
            max: MAX_NUMBER_PRECISION,
        });
    }
    if !(MIN_NUMBER_EXPONENT..=MAX_NUMBER_EXPONENT).contains(&decimal.exponent) {
        return Err(NumberError::Exponent {
            exponent: decimal.exponent,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Decimal
// ---------------------------------------------------------------------------

/// A number attribute in normalized form, compared exactly.
///
/// `digits` holds the significant ASCII digits with no leading or trailing
/// zeros (empty for zero) and `exponent` is the power of ten of the first
/// one, so `-120.5` is `{ negative, exponent: 2, digits: "1205" }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    negative: bool,
    exponent: i64,
    digits: Vec<u8>,
}

impl Decimal {
    /// Parse `-?digits[.digits][e[+-]digits]`. `-0` is zero.
    pub fn parse(text: &str) -> Result<Self, NumberError> {
        let malformed = || NumberError::Malformed(text.to_string());

        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (mantissa, shift) = match unsigned.split_once(['e', 'E']) {
            Some((m, e)) => (m, e.parse::<i64>().map_err(|_| malformed())?),
            None => (unsigned, 0),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

        let well_formed = !(int_part.is_empty() && frac_part.is_empty())
            && int_part.bytes().all(|b| b.is_ascii_digit())
            && frac_part.bytes().all(|b| b.is_ascii_digit());
        if !well_formed {
            return Err(malformed());
        }

        let int_trimmed = int_part.trim_start_matches('0');
        let (exponent, mut digits): (i64, Vec<u8>) = if int_trimmed.is_empty() {
            let significant = frac_part.trim_start_matches('0');
            let zeros = frac_part.len() - significant.len();
            (-(zeros as i64) - 1, significant.bytes().collect())
        } else {
            (
                int_trimmed.len() as i64 - 1,
                int_trimmed.bytes().chain(frac_part.bytes()).collect(),
            )
        };
        while digits.last() == Some(&b'0') {
            digits.pop();
        }

        if digits.is_empty() {
            return Ok(Self {
                negative: false,
                exponent: 0,
                digits,
            });
        }
        Ok(Self {
            negative,
            exponent: exponent.saturating_add(shift),
            digits,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Power of ten of the leading significant digit. Zero reports `0`.
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// Significant ASCII digits, without leading or trailing zeros.
    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        // Digits carry no trailing zeros, so a strict prefix is the smaller value.
        self.exponent
            .cmp(&other.exponent)
            .then_with(|| self.digits.cmp(&other.digits))
    }

    fn sign(&self) -> i8 {
        match (self.is_zero(), self.negative) {
            (true, _) => 0,
            (false, true) => -1,
            (false, false) => 1,
        }
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.sign().cmp(&other.sign()) {
            Ordering::Equal => match self.sign() {
                0 => Ordering::Equal,
                1 => self.cmp_magnitude(other),
                _ => other.cmp_magnitude(self),
            },
            unequal => unequal,
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
