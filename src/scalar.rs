// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Scalar wrappers which absorb the API's inconsistent wire encoding.
//!
//! Each type decodes every spelling the server has been observed to send and encodes to the
//! spelling requests are expected to use. Decoding and encoding are deliberately asymmetric:
//! a boolean arrives as `"t"` and leaves as `"yes"`.

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use snafu::Snafu;
use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ScalarError {
    #[snafu(display(
        "allowed values for boolean are [t, f], [yes, no], [true, false], got {:?}",
        value
    ))]
    InvalidBoolean { value: String },
    #[snafu(display("failed to convert {:?} to an integer", value))]
    InvalidInteger { value: String },
    #[snafu(display("failed to convert {:?} to a dollar price", value))]
    InvalidPrice { value: String },
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"')
}

/// A boolean sent as `"yes"`/`"no"`.
///
/// Responses typically carry `"t"`/`"f"`, some endpoints answer with native JSON booleans, and
/// requests must use `"yes"`/`"no"`. All of these decode; encoding always produces the request
/// spelling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct YesNo(pub bool);

impl YesNo {
    pub const YES: YesNo = YesNo(true);
    pub const NO: YesNo = YesNo(false);

    pub fn is_yes(&self) -> bool {
        self.0
    }

    /// Omit-empty predicate for `skip_serializing_if`.
    pub fn is_no(&self) -> bool {
        !self.0
    }

    /// The character used for this flag in a ratings bitmask.
    pub fn mask_bit(self) -> char {
        if self.0 {
            '1'
        } else {
            '0'
        }
    }

    pub fn as_str(self) -> &'static str {
        if self.0 {
            "yes"
        } else {
            "no"
        }
    }
}

impl From<bool> for YesNo {
    fn from(b: bool) -> Self {
        Self(b)
    }
}

impl From<YesNo> for bool {
    fn from(b: YesNo) -> Self {
        b.0
    }
}

impl Display for YesNo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for YesNo {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "t" | "yes" | "true" => Ok(Self::YES),
            "f" | "no" | "false" => Ok(Self::NO),
            _ => InvalidBooleanSnafu { value: s }.fail(),
        }
    }
}

impl Serialize for YesNo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for YesNo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct YesNoVisitor;

        impl<'de> Visitor<'de> for YesNoVisitor {
            type Value = YesNo;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("a boolean or one of \"t\", \"f\", \"yes\", \"no\", \"true\", \"false\"")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<YesNo, E> {
                Ok(YesNo(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<YesNo, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(YesNoVisitor)
    }
}

/// An integer the server transmits as a quoted string.
///
/// Decoding tolerates native numbers, and treats `""` and `null` as zero since responses
/// sometimes leave the field blank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntString(pub i64);

impl IntString {
    pub fn get(self) -> i64 {
        self.0
    }

    /// Omit-empty predicate for `skip_serializing_if`.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Zero-based indices `0..self`, used to walk the pages of a results set.
    pub fn pages(self) -> impl Iterator<Item = IntString> {
        (0..self.0.max(0)).map(IntString)
    }
}

impl From<i64> for IntString {
    fn from(i: i64) -> Self {
        Self(i)
    }
}

impl From<IntString> for i64 {
    fn from(i: IntString) -> Self {
        i.0
    }
}

impl Display for IntString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IntString {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = unquote(s);
        if digits.is_empty() || digits == "null" {
            return Ok(Self(0));
        }
        digits
            .parse()
            .map(Self)
            .map_err(|_| ScalarError::InvalidInteger { value: s.into() })
    }
}

impl Serialize for IntString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for IntString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IntStringVisitor;

        impl<'de> Visitor<'de> for IntStringVisitor {
            type Value = IntString;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("an integer, a quoted integer, an empty string or null")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<IntString, E> {
                Ok(IntString(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<IntString, E> {
                i64::try_from(v)
                    .map(IntString)
                    .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<IntString, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_unit<E: de::Error>(self) -> Result<IntString, E> {
                Ok(IntString(0))
            }

            fn visit_none<E: de::Error>(self) -> Result<IntString, E> {
                Ok(IntString(0))
            }
        }

        deserializer.deserialize_any(IntStringVisitor)
    }
}

/// A US dollar amount transmitted as `"$12.34"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct PriceString(pub f64);

impl PriceString {
    pub fn dollars(self) -> f64 {
        self.0
    }
}

impl From<f64> for PriceString {
    fn from(f: f64) -> Self {
        Self(f)
    }
}

impl Display for PriceString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl FromStr for PriceString {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        unquote(s)
            .strip_prefix('$')
            .and_then(|amount| amount.trim().parse::<f64>().ok())
            // Amounts are never negative, and "$NaN" or "$inf" are not amounts.
            .filter(|amount| amount.is_finite() && *amount >= 0.0)
            .map(Self)
            .ok_or_else(|| ScalarError::InvalidPrice { value: s.into() })
    }
}

impl Serialize for PriceString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PriceString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PriceVisitor;

        impl<'de> Visitor<'de> for PriceVisitor {
            type Value = PriceString;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("a dollar amount such as \"$12.34\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<PriceString, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(PriceVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn yes_no(value: serde_json::Value) -> Result<YesNo, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn yes_no_accepts_every_historical_spelling() {
        for truthy in [json!("t"), json!("yes"), json!("true"), json!(true)] {
            assert_eq!(yes_no(truthy).unwrap(), YesNo::YES);
        }
        for falsy in [json!("f"), json!("no"), json!("false"), json!(false)] {
            assert_eq!(yes_no(falsy).unwrap(), YesNo::NO);
        }
    }

    #[test]
    fn yes_no_rejects_anything_else() {
        for bad in [json!("maybe"), json!("Y"), json!(""), json!(1), json!(null)] {
            assert!(yes_no(bad.clone()).is_err(), "{} should not decode", bad);
        }
        let err = "maybe".parse::<YesNo>().unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn yes_no_encodes_request_spelling() {
        assert_eq!(serde_json::to_string(&YesNo::YES).unwrap(), r#""yes""#);
        assert_eq!(serde_json::to_string(&YesNo::NO).unwrap(), r#""no""#);
        assert_eq!(YesNo::YES.to_string(), "yes");
        for b in [YesNo::YES, YesNo::NO] {
            let encoded = serde_json::to_string(&b).unwrap();
            assert_eq!(serde_json::from_str::<YesNo>(&encoded).unwrap(), b);
        }
    }

    #[test]
    fn int_string_decodes_quoted_and_native_numbers() {
        assert_eq!(
            serde_json::from_str::<IntString>(r#""1234""#).unwrap(),
            IntString(1234)
        );
        assert_eq!(
            serde_json::from_str::<IntString>("-7").unwrap(),
            IntString(-7)
        );
        assert_eq!(
            serde_json::from_str::<IntString>(r#""""#).unwrap(),
            IntString(0)
        );
        assert_eq!(
            serde_json::from_str::<IntString>("null").unwrap(),
            IntString(0)
        );
        assert!(serde_json::from_str::<IntString>(r#""12a""#).is_err());
        assert!(serde_json::from_str::<IntString>("1.5").is_err());
    }

    #[test]
    fn int_string_round_trips() {
        for i in [0, 1, -1, 42, i64::MAX, i64::MIN] {
            let encoded = serde_json::to_string(&IntString(i)).unwrap();
            assert_eq!(encoded, format!("\"{}\"", i));
            assert_eq!(serde_json::from_str::<IntString>(&encoded).unwrap(), IntString(i));
        }
    }

    #[test]
    fn int_string_pages_counts_from_zero() {
        let pages: Vec<_> = IntString(3).pages().map(IntString::get).collect();
        assert_eq!(pages, vec![0, 1, 2]);
        assert_eq!(IntString(-2).pages().count(), 0);
    }

    #[test]
    fn price_string_keeps_cents() {
        let price: PriceString = serde_json::from_str(r#""$12.34""#).unwrap();
        assert_eq!(price, PriceString(12.34));
        assert_eq!(serde_json::to_string(&price).unwrap(), r#""$12.34""#);
        assert_eq!(price.to_string(), "$12.34");
    }

    #[test]
    fn price_string_requires_dollar_prefix() {
        assert!(serde_json::from_str::<PriceString>(r#""12.34""#).is_err());
        assert!(serde_json::from_str::<PriceString>(r#""$""#).is_err());
        assert!(serde_json::from_str::<PriceString>("12.34").is_err());
        assert_eq!("\"$5\"".parse::<PriceString>().unwrap(), PriceString(5.0));
        for bad in ["$NaN", "$inf", "$-3", "$-0.01"] {
            assert!(bad.parse::<PriceString>().is_err(), "{}", bad);
        }
    }
}
