// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::scalar::YesNo;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Allowed content ratings of a session.
///
/// As a request body this flattens to one `tag[n]` pair per flag that is set, so a flag left as
/// `None` is not sent at all. Note that the server switches off every tag it is not sent when
/// ratings are changed, including "mild violence" which is on by default for new sessions.
///
/// On the wire of responses the same information travels as a bitmask string, see [mask].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Ratings {
    /// General: suitable for all ages.
    #[serde(rename = "tag[1]", skip_serializing_if = "Option::is_none")]
    pub general: Option<YesNo>,
    /// Nonsexual nudity exposing breasts or genitals.
    #[serde(rename = "tag[2]", skip_serializing_if = "Option::is_none")]
    pub nudity: Option<YesNo>,
    #[serde(rename = "tag[3]", skip_serializing_if = "Option::is_none")]
    pub mild_violence: Option<YesNo>,
    /// Erotic imagery, sexual activity or arousal.
    #[serde(rename = "tag[4]", skip_serializing_if = "Option::is_none")]
    pub sexual: Option<YesNo>,
    /// Strong violence, blood, serious injury or death.
    #[serde(rename = "tag[5]", skip_serializing_if = "Option::is_none")]
    pub strong_violence: Option<YesNo>,
}

impl Ratings {
    pub const GENERAL: u8 = 0x10;
    pub const NUDITY: u8 = 0x08;
    pub const MILD_VIOLENCE: u8 = 0x04;
    pub const SEXUAL: u8 = 0x02;
    pub const STRONG_VIOLENCE: u8 = 0x01;

    /// Build ratings from a bitmask, General in bit 4 down to StrongViolence in bit 0.
    ///
    /// Every flag is set explicitly, so the result flattens to all five `tag[n]` pairs.
    pub fn from_bits(bits: u8) -> Self {
        let flag = |bit: u8| Some(YesNo(bits & bit != 0));
        Self {
            general: flag(Self::GENERAL),
            nudity: flag(Self::NUDITY),
            mild_violence: flag(Self::MILD_VIOLENCE),
            sexual: flag(Self::SEXUAL),
            strong_violence: flag(Self::STRONG_VIOLENCE),
        }
    }

    /// Parse a left-significant bitmask string such as `"11010"`.
    ///
    /// Only the left-most significant bits are transmitted, so `"1101"` equals `"11010"` and
    /// missing trailing bits are false. Characters past the fifth are ignored.
    pub fn parse_mask(mask: &str) -> Self {
        let bits = mask
            .chars()
            .take(5)
            .enumerate()
            .filter(|(_, c)| *c == '1')
            .fold(0u8, |bits, (i, _)| bits | (1 << (4 - i)));
        Self::from_bits(bits)
    }

    pub fn bits(&self) -> u8 {
        self.flags()
            .iter()
            .zip([
                Self::GENERAL,
                Self::NUDITY,
                Self::MILD_VIOLENCE,
                Self::SEXUAL,
                Self::STRONG_VIOLENCE,
            ])
            .filter(|(flag, _)| flag.unwrap_or_default().is_yes())
            .fold(0, |bits, (_, bit)| bits | bit)
    }

    /// The bitmask string with trailing zeros trimmed; empty when nothing is allowed.
    pub fn mask(&self) -> String {
        let mask: String = self
            .flags()
            .iter()
            .map(|flag| flag.unwrap_or_default().mask_bit())
            .collect();
        mask.trim_end_matches('0').to_string()
    }

    fn flags(&self) -> [Option<YesNo>; 5] {
        [
            self.general,
            self.nudity,
            self.mild_violence,
            self.sexual,
            self.strong_violence,
        ]
    }
}

impl Display for Ratings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mask())
    }
}

/// Serde adapter for fields carrying ratings as a bitmask, e.g. `ratingsmask`.
///
/// Use with `#[serde(with = "ratings::mask", default)]`. A mask sent as a JSON number rather than
/// a string is only reliable when its first bit is set, since the number drops leading zeros.
pub mod mask {
    use super::Ratings;
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt::{self, Formatter};

    pub fn serialize<S: Serializer>(ratings: &Ratings, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(ratings)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Ratings, D::Error> {
        struct MaskVisitor;

        impl<'de> Visitor<'de> for MaskVisitor {
            type Value = Ratings;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("a ratings bitmask such as \"11010\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Ratings, E> {
                Ok(Ratings::parse_mask(v))
            }

            // Some responses send the mask unquoted, so 11010 arrives as a number. Leading zeros
            // are lost that way.
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Ratings, E> {
                Ok(Ratings::parse_mask(&v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Ratings, E> {
                Ok(Ratings::default())
            }
        }

        deserializer.deserialize_any(MaskVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::to_form_values;
    use serde::Deserialize;

    fn explicit(general: bool, nudity: bool, mild: bool, sexual: bool, strong: bool) -> Ratings {
        Ratings {
            general: Some(general.into()),
            nudity: Some(nudity.into()),
            mild_violence: Some(mild.into()),
            sexual: Some(sexual.into()),
            strong_violence: Some(strong.into()),
        }
    }

    #[test]
    fn parse_mask_fills_missing_bits_with_false() {
        assert_eq!(
            Ratings::parse_mask("1101"),
            explicit(true, true, false, true, false)
        );
        assert_eq!(Ratings::parse_mask("11010"), Ratings::parse_mask("1101"));
        assert_eq!(Ratings::parse_mask("1"), Ratings::parse_mask("10000"));
        assert_eq!(Ratings::parse_mask(""), Ratings::from_bits(0));
    }

    #[test]
    fn mask_trims_trailing_zeros() {
        assert_eq!(explicit(true, true, false, true, false).mask(), "1101");
        assert_eq!(explicit(true, false, true, false, false).to_string(), "101");
        assert_eq!(Ratings::from_bits(0).mask(), "");
        assert_eq!(Ratings::default().mask(), "");
    }

    #[test]
    fn bits_match_constants() {
        let ratings = Ratings::from_bits(Ratings::GENERAL | Ratings::NUDITY);
        assert_eq!(ratings, explicit(true, true, false, false, false));
        assert_eq!(ratings.bits(), 0b11000);
        assert_eq!(Ratings::parse_mask("11111").bits(), 0x1f);
    }

    #[test]
    fn flattens_only_present_tags() {
        let ratings = Ratings {
            general: Some(YesNo::YES),
            nudity: Some(YesNo::YES),
            sexual: Some(YesNo::YES),
            ..Ratings::default()
        };
        let values = to_form_values(&ratings).unwrap();
        assert_eq!(values.encode(), "tag%5B1%5D=yes&tag%5B2%5D=yes&tag%5B4%5D=yes");
    }

    #[test]
    fn explicit_false_flags_are_sent() {
        let values = to_form_values(&Ratings::parse_mask("101")).unwrap();
        assert_eq!(values.get("tag[2]"), Some("no"));
        assert_eq!(values.get("tag[3]"), Some("yes"));
        assert_eq!(values.len(), 5);
    }

    #[derive(Debug, Deserialize)]
    struct Session {
        sid: String,
        #[serde(rename = "ratingsmask", with = "mask", default)]
        ratings: Ratings,
    }

    #[test]
    fn decodes_mask_from_response() {
        let session: Session =
            serde_json::from_str(r#"{"sid":"abc","ratingsmask":"1101"}"#).unwrap();
        assert_eq!(session.sid, "abc");
        assert_eq!(session.ratings, explicit(true, true, false, true, false));

        let unquoted: Session = serde_json::from_str(r#"{"sid":"abc","ratingsmask":101}"#).unwrap();
        assert_eq!(unquoted.ratings.mask(), "101");

        // 00001 as a number is 1, which reads back as General only.
        let shifted: Session = serde_json::from_str(r#"{"sid":"abc","ratingsmask":1}"#).unwrap();
        assert_eq!(shifted.ratings, explicit(true, false, false, false, false));

        let missing: Session = serde_json::from_str(r#"{"sid":"abc"}"#).unwrap();
        assert_eq!(missing.ratings, Ratings::default());
    }
}
