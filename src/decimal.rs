//! Exact decimal numbers for `decimal` settings.
//!
//! A [`Decimal`] keeps the digits exactly as written, so `"10.00"` keeps its
//! two decimal places and `"0.1"` is not rounded through binary floating
//! point. The `max_digits` and `decimal_places` validators work on the
//! digit/exponent view returned by [`Decimal::digits`] and
//! [`Decimal::exponent`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Largest accepted exponent magnitude. Display pads with zeros, so the
/// exponent bounds the length of the printed form.
pub const MAX_EXPONENT: i32 = 4096;

#[derive(Debug, Clone)]
pub struct Decimal {
    negative: bool,
    /// Coefficient digits, no leading zeros, `"0"` for zero.
    digits: String,
    exponent: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDecimalError(String);

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal '{}'", self.0)
    }
}

impl std::error::Error for ParseDecimalError {}

impl Decimal {
    pub fn zero() -> Self {
        Self {
            negative: false,
            digits: "0".into(),
            exponent: 0,
        }
    }

    /// Coefficient digits, most significant first.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Power of ten applied to the coefficient; negative for fractional values.
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_negative(&self) -> bool {
        self.negative && !self.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.digits == "0"
    }

    /// Number of digits after the decimal point.
    pub fn decimal_places(&self) -> u32 {
        if self.exponent < 0 {
            self.exponent.unsigned_abs()
        } else {
            0
        }
    }

    /// Digits in total, counted the way Django's `DecimalValidator` does:
    /// trailing zeros of a positive exponent count, and so do the leading
    /// zeros after the point of a value below one.
    pub fn total_digits(&self) -> u64 {
        let len = self.digits.len() as u64;
        if self.exponent >= 0 {
            if self.is_zero() {
                len
            } else {
                len + u64::from(self.exponent.unsigned_abs())
            }
        } else {
            len.max(u64::from(self.exponent.unsigned_abs()))
        }
    }

    /// Integer part, truncated toward zero. `None` when it does not fit in `i64`.
    pub fn trunc_to_i64(&self) -> Option<i64> {
        if !self.is_zero() && self.adjusted() > 19 {
            return None;
        }
        let int_digits = if self.exponent >= 0 {
            let zeros = usize::try_from(self.exponent).ok()?;
            format!("{}{}", self.digits, "0".repeat(zeros))
        } else {
            let cut = self.exponent.unsigned_abs() as usize;
            if cut >= self.digits.len() {
                "0".to_string()
            } else {
                self.digits[..self.digits.len() - cut].to_string()
            }
        };
        let magnitude: i64 = int_digits.parse().ok()?;
        Some(if self.negative { -magnitude } else { magnitude })
    }

    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        value.to_string().parse().ok()
    }

    /// Position of the most significant digit relative to the decimal point.
    fn adjusted(&self) -> i64 {
        self.digits.len() as i64 + i64::from(self.exponent)
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        self.adjusted().cmp(&other.adjusted()).then_with(|| {
            let a = self.digits.trim_end_matches('0');
            let b = other.digits.trim_end_matches('0');
            a.cmp(b)
        })
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(s.to_string());
        let text = s.trim();

        let (negative, rest) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let (mantissa, exp) = match rest.find(['e', 'E']) {
            Some(idx) => {
                let exp: i32 = rest[idx + 1..].parse().map_err(|_| err())?;
                (&rest[..idx], exp)
            }
            None => (rest, 0),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let all_digits = format!("{int_part}{frac_part}");
        let trimmed = all_digits.trim_start_matches('0');
        let digits = if trimmed.is_empty() { "0" } else { trimmed };
        let frac_len = i32::try_from(frac_part.len()).map_err(|_| err())?;
        let exponent = exp.checked_sub(frac_len).ok_or_else(err)?;
        if exponent.unsigned_abs() > MAX_EXPONENT.unsigned_abs() {
            return Err(err());
        }

        Ok(Decimal {
            negative,
            digits: digits.to_string(),
            exponent,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-")?;
        }
        if self.exponent >= 0 {
            let zeros = if self.is_zero() { 0 } else { self.exponent as usize };
            return write!(f, "{}{}", self.digits, "0".repeat(zeros));
        }
        let places = self.exponent.unsigned_abs() as usize;
        if places >= self.digits.len() {
            let pad = "0".repeat(places - self.digits.len());
            write!(f, "0.{pad}{}", self.digits)
        } else {
            let (int, frac) = self.digits.split_at(self.digits.len() - places);
            write!(f, "{int}.{frac}")
        }
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal {
            negative: value < 0,
            digits: value.unsigned_abs().to_string(),
            exponent: 0,
        }
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DecimalVisitor;

        impl Visitor<'_> for DecimalVisitor {
            type Value = Decimal;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal number or numeric string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
                Ok(Decimal::from(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
                v.to_string().parse().map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
                Decimal::from_f64(v).ok_or_else(|| E::custom("non-finite decimal"))
            }
        }

        deserializer.deserialize_any(DecimalVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn digits_and_exponent_follow_written_form() {
        let v = d("12.725");
        assert_eq!(v.digits(), "12725");
        assert_eq!(v.exponent(), -3);

        let v = d("1200.50");
        assert_eq!(v.digits(), "120050");
        assert_eq!(v.exponent(), -2);

        let v = d("15");
        assert_eq!(v.digits(), "15");
        assert_eq!(v.exponent(), 0);
    }

    #[test]
    fn leading_zeros_are_not_digits() {
        let v = d("0.5");
        assert_eq!(v.digits(), "5");
        assert_eq!(v.decimal_places(), 1);
    }

    #[test]
    fn display_preserves_precision() {
        assert_eq!(d("10.00").to_string(), "10.00");
        assert_eq!(d("-0.05").to_string(), "-0.05");
        assert_eq!(d("8.5").to_string(), "8.5");
        assert_eq!(d("1e3").to_string(), "1000");
        assert_eq!(d("0").to_string(), "0");
    }

    #[test]
    fn equality_is_numeric() {
        assert_eq!(d("10.00"), d("10"));
        assert_eq!(d("-0"), d("0"));
        assert_ne!(d("10.01"), d("10"));
    }

    #[test]
    fn ordering() {
        assert!(d("0.5") < d("1"));
        assert!(d("12.5") > d("12"));
        assert!(d("-3") < d("-2.5"));
        assert!(d("-1") < d("0"));
        assert!(d("100") > d("99.999"));
    }

    #[test]
    fn rejects_garbage() {
        assert!("abc".parse::<Decimal>().is_err());
        assert!("".parse::<Decimal>().is_err());
        assert!(".".parse::<Decimal>().is_err());
        assert!("1.2.3".parse::<Decimal>().is_err());
    }

    #[test]
    fn truncates_to_integer() {
        assert_eq!(d("12.9").trunc_to_i64(), Some(12));
        assert_eq!(d("-12.9").trunc_to_i64(), Some(-12));
        assert_eq!(d("0.3").trunc_to_i64(), Some(0));
        assert_eq!(d("2e2").trunc_to_i64(), Some(200));
        assert_eq!(d("1e30").trunc_to_i64(), None);
    }

    #[test]
    fn huge_exponents_are_rejected() {
        assert!("1e999999999".parse::<Decimal>().is_err());
        assert!("1e-999999999".parse::<Decimal>().is_err());
        assert!(format!("1e{MAX_EXPONENT}").parse::<Decimal>().is_ok());
    }

    #[test]
    fn total_digits_counts_exponent_zeros() {
        assert_eq!(d("12.34").total_digits(), 4);
        assert_eq!(d("10000").total_digits(), 5);
        assert_eq!(d("1e4").total_digits(), 5);
        assert_eq!(d("0.05").total_digits(), 2);
        assert_eq!(d("0").total_digits(), 1);
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&d("5.33")).unwrap();
        assert_eq!(json, "\"5.33\"");
        let back: Decimal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d("5.33"));
    }
}
