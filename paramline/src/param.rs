//! The parameter trait contract.
//!
//! Every controllable quantity is a small `Copy` struct wrapping one `f32`
//! and implementing [`Parameter`]. The trait carries the kind's identity,
//! its default and its inclusive bounds; validation, parsing and
//! serialization are provided on top of those.
//!
//! Implementations are normally generated with `#[derive(Parameter)]`:
//!
//! ```
//! use paramline::{FanDutyCycle, Parameter};
//!
//! let duty = FanDutyCycle::parse("45").unwrap();
//! assert!(duty.validate());
//!
//! let mut buf = [0u8; 16];
//! let n = duty.serialize(&mut buf);
//! assert_eq!(&buf[..n], b"45.00");
//! ```
//!
//! # Allocation
//!
//! Nothing in this module touches the heap. Serialization writes into a
//! caller-provided byte slice, or into a [`ValueText`] stack buffer.

use std::fmt::{self, Write as _};

use thiserror::Error;

use crate::registry::ParamValue;

/// Capacity of a [`ValueText`] buffer in bytes.
pub const VALUE_TEXT_CAP: usize = 32;

/// Identity of a parameter kind.
///
/// The discriminant doubles as the kind's index into
/// [`REGISTRY`](crate::registry::REGISTRY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ParamId {
    TemperatureSetpoint = 0,
    HighTemperatureAlarm = 1,
    FanDutyCycle = 2,
}

impl ParamId {
    /// Number of declared parameter kinds.
    pub const COUNT: usize = 3;

    /// All kinds in ordinal order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::TemperatureSetpoint,
        Self::HighTemperatureAlarm,
        Self::FanDutyCycle,
    ];

    /// Dense index of this kind, in `0..COUNT`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl From<ParamId> for u16 {
    fn from(id: ParamId) -> Self {
        id as u16
    }
}

/// A raw identifier that names no declared parameter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown parameter id {0}")]
pub struct InvalidParamId(pub u16);

impl TryFrom<u16> for ParamId {
    type Error = InvalidParamId;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::TemperatureSetpoint),
            1 => Ok(Self::HighTemperatureAlarm),
            2 => Ok(Self::FanDutyCycle),
            other => Err(InvalidParamId(other)),
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure to turn text into a parameter value.
///
/// No value is produced in any of these cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input was empty or whitespace only.
    #[error("empty input")]
    Empty,
    /// Input is not a decimal number.
    #[error("not a number")]
    Malformed,
    /// Input parsed but lies outside the parameter's bounds.
    #[error("{name} value out of range")]
    OutOfRange {
        /// Name of the parameter that rejected the value.
        name: &'static str,
    },
}

/// Compile-time contract for a parameter kind.
///
/// Values carry no validity guarantee by construction; only
/// [`validate`](Self::validate) (directly, or through
/// [`parse`](Self::parse)) establishes that a value is in range.
pub trait Parameter: Copy + Into<ParamValue> + 'static {
    /// Identity of this kind.
    const ID: ParamId;
    /// Stable name used for lookup and diagnostics.
    const NAME: &'static str;
    /// Short label used when rendering a table.
    const LABEL: &'static str;
    /// Value installed before any command is processed.
    const DEFAULT: Self;
    /// Inclusive lower bound.
    const MIN: f32;
    /// Inclusive upper bound.
    const MAX: f32;

    /// Wraps a raw number without validating it.
    fn from_raw(raw: f32) -> Self;

    /// The wrapped number.
    fn raw(&self) -> f32;

    /// Extracts this kind from an erased value, if the variant matches.
    fn from_value(value: &ParamValue) -> Option<Self>;

    /// Returns `true` iff the value is finite and within `[MIN, MAX]`.
    #[inline]
    fn validate(&self) -> bool {
        in_range(self.raw(), Self::MIN, Self::MAX)
    }

    /// Parses decimal text and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the text is not a number or the number is
    /// out of bounds.
    fn parse(input: &str) -> Result<Self, ParseError> {
        let value = Self::from_raw(parse_float(input)?);
        if value.validate() {
            Ok(value)
        } else {
            Err(ParseError::OutOfRange { name: Self::NAME })
        }
    }

    /// Writes the value with two decimal places into `out`.
    ///
    /// Returns the number of bytes written, or 0 if `out` is too small to
    /// hold the whole rendering. Bytes of `out` past the returned length are
    /// unspecified.
    #[inline]
    fn serialize(&self, out: &mut [u8]) -> usize {
        write_fixed2(self.raw(), out)
    }

    /// Renders the value into a stack buffer, or `None` if it does not fit.
    #[inline]
    fn render(&self) -> Option<ValueText> {
        ValueText::fixed2(self.raw())
    }
}

/// Inclusive range check that rejects NaN and infinities outright.
#[inline]
#[must_use]
pub fn in_range(raw: f32, min: f32, max: f32) -> bool {
    raw.is_finite() && raw >= min && raw <= max
}

/// Parses a decimal number, ignoring surrounding ASCII whitespace.
///
/// # Errors
///
/// [`ParseError::Empty`] for blank input, [`ParseError::Malformed`] for
/// anything `f32::from_str` rejects (including trailing garbage).
pub fn parse_float(input: &str) -> Result<f32, ParseError> {
    let trimmed = input.trim_ascii();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    trimmed.parse::<f32>().map_err(|_| ParseError::Malformed)
}

/// Writes `raw` formatted as `{:.2}` into `out`.
///
/// Returns the byte count, or 0 on truncation.
pub fn write_fixed2(raw: f32, out: &mut [u8]) -> usize {
    let mut writer = SliceWriter { buf: out, len: 0 };
    match write!(writer, "{raw:.2}") {
        Ok(()) => writer.len,
        Err(fmt::Error) => 0,
    }
}

/// `fmt::Write` adapter over a fixed byte slice that fails instead of
/// truncating.
struct SliceWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len.checked_add(s.len()).ok_or(fmt::Error)?;
        let dst = self.buf.get_mut(self.len..end).ok_or(fmt::Error)?;
        dst.copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// A rendered value held in a fixed stack buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ValueText {
    buf: [u8; VALUE_TEXT_CAP],
    len: usize,
}

impl ValueText {
    /// Renders `raw` with two decimal places, or `None` if the text would
    /// exceed [`VALUE_TEXT_CAP`] bytes.
    #[must_use]
    pub fn fixed2(raw: f32) -> Option<Self> {
        let mut buf = [0u8; VALUE_TEXT_CAP];
        match write_fixed2(raw, &mut buf) {
            0 => None,
            len => Some(Self { buf, len }),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        // Only ever filled from `fmt` output, so always valid UTF-8.
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }
}

impl fmt::Display for ValueText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ValueText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl PartialEq<&str> for ValueText {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_id_round_trips_through_u16() {
        for id in ParamId::ALL {
            assert_eq!(ParamId::try_from(u16::from(id)), Ok(id));
        }
        assert_eq!(ParamId::try_from(3u16), Err(InvalidParamId(3)));
        assert_eq!(ParamId::try_from(u16::MAX), Err(InvalidParamId(u16::MAX)));
    }

    #[test]
    fn param_id_index_is_dense() {
        for (i, id) in ParamId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn in_range_is_inclusive() {
        assert!(in_range(0.0, 0.0, 100.0));
        assert!(in_range(100.0, 0.0, 100.0));
        assert!(!in_range(-0.01, 0.0, 100.0));
        assert!(!in_range(100.01, 0.0, 100.0));
    }

    #[test]
    fn in_range_rejects_non_finite() {
        assert!(!in_range(f32::NAN, f32::MIN, f32::MAX));
        assert!(!in_range(f32::INFINITY, f32::MIN, f32::MAX));
        assert!(!in_range(f32::NEG_INFINITY, f32::MIN, f32::MAX));
    }

    #[test]
    fn parse_float_accepts_surrounding_whitespace() {
        assert_eq!(parse_float(" 12.5\n"), Ok(12.5));
        assert_eq!(parse_float("-3"), Ok(-3.0));
        assert_eq!(parse_float("1e2"), Ok(100.0));
    }

    #[test]
    fn parse_float_rejects_blank_and_garbage() {
        assert_eq!(parse_float(""), Err(ParseError::Empty));
        assert_eq!(parse_float("   "), Err(ParseError::Empty));
        assert_eq!(parse_float("abc"), Err(ParseError::Malformed));
        assert_eq!(parse_float("12abc"), Err(ParseError::Malformed));
        assert_eq!(parse_float("1.2.3"), Err(ParseError::Malformed));
    }

    #[test]
    fn write_fixed2_renders_two_decimals() {
        let mut buf = [0u8; 16];
        let n = write_fixed2(37.5, &mut buf);
        assert_eq!(&buf[..n], b"37.50");

        let n = write_fixed2(0.0, &mut buf);
        assert_eq!(&buf[..n], b"0.00");

        let n = write_fixed2(149.999, &mut buf);
        assert_eq!(&buf[..n], b"150.00");
    }

    #[test]
    fn write_fixed2_signals_truncation_with_zero() {
        let mut exact = [0u8; 5];
        assert_eq!(write_fixed2(37.5, &mut exact), 5);

        let mut short = [0u8; 4];
        assert_eq!(write_fixed2(37.5, &mut short), 0);

        let mut empty = [0u8; 0];
        assert_eq!(write_fixed2(1.0, &mut empty), 0);
    }

    #[test]
    fn value_text_fits_typical_values() {
        let text = ValueText::fixed2(80.0).unwrap();
        assert_eq!(text, "80.00");
        assert_eq!(text.to_string(), "80.00");
    }

    #[test]
    fn value_text_refuses_oversized_rendering() {
        // f32::MAX has 39 integer digits.
        assert!(ValueText::fixed2(f32::MAX).is_none());
    }
}
