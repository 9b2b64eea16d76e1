// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::scalar::{IntString, PriceString, YesNo};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// Output format of a response. Only JSON is decoded by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Json,
    Xml,
}

/// How several search words (or search fields) are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    And,
    Or,
    Exact,
}

/// Sort order of search results. The server default is [OrderBy::CreateDatetime].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    CreateDatetime,
    UnreadDatetime,
    Views,
    TotalPrintSales,
    TotalDigitalSales,
    TotalSales,
    Username,
    FavDatetime,
    FavStars,
    // Undocumented, but accepted.
    Favs,
    PoolOrder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesFilter {
    /// For sale by any method.
    #[serde(rename = "forsale")]
    ForSale,
    Digital,
    Prints,
}

/// Which galleries a search covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scraps {
    Both,
    No,
    Only,
}

/// Kind of a submission, sent as its numeric ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SubmissionType {
    Any = 0,
    PicturePinup = 1,
    Sketch = 2,
    PictureSeries = 3,
    Comic = 4,
    Portfolio = 5,
    FlashAnimation = 6,
    FlashInteractive = 7,
    VideoFeatureLength = 8,
    VideoAnimation = 9,
    MusicSingleTrack = 10,
    MusicAlbum = 11,
    WritingDocument = 12,
    CharacterSheet = 13,
    Photography = 14,
}

impl SubmissionType {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn is_any(&self) -> bool {
        *self == Self::Any
    }
}

impl Default for SubmissionType {
    fn default() -> Self {
        Self::Any
    }
}

impl TryFrom<i64> for SubmissionType {
    type Error = i64;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        use SubmissionType::*;
        Ok(match id {
            0 => Any,
            1 => PicturePinup,
            2 => Sketch,
            3 => PictureSeries,
            4 => Comic,
            5 => Portfolio,
            6 => FlashAnimation,
            7 => FlashInteractive,
            8 => VideoFeatureLength,
            9 => VideoAnimation,
            10 => MusicSingleTrack,
            11 => MusicAlbum,
            12 => WritingDocument,
            13 => CharacterSheet,
            14 => Photography,
            _ => return Err(id),
        })
    }
}

impl Display for SubmissionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl Serialize for SubmissionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.id())
    }
}

impl<'de> Deserialize<'de> for SubmissionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = IntString::deserialize(deserializer)?;
        SubmissionType::try_from(id.get()).map_err(|id| {
            de::Error::invalid_value(de::Unexpected::Signed(id), &"a submission type from 0 to 14")
        })
    }
}

/// A set of submission types, sent as a comma-separated list of IDs such as `"1,2,3"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SubmissionTypes(pub Vec<SubmissionType>);

impl SubmissionTypes {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<SubmissionType>> for SubmissionTypes {
    fn from(types: Vec<SubmissionType>) -> Self {
        Self(types)
    }
}

impl Display for SubmissionTypes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}

impl Serialize for SubmissionTypes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SubmissionTypes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TypesVisitor;

        impl<'de> Visitor<'de> for TypesVisitor {
            type Value = SubmissionTypes;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("a comma-separated list or an array of submission types")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SubmissionTypes, E> {
                v.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(|id| {
                        let id = id.parse::<i64>().map_err(E::custom)?;
                        SubmissionType::try_from(id).map_err(|id| {
                            E::invalid_value(
                                de::Unexpected::Signed(id),
                                &"a submission type from 0 to 14",
                            )
                        })
                    })
                    .collect::<Result<_, _>>()
                    .map(SubmissionTypes)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<SubmissionTypes, A::Error> {
                let mut types = Vec::new();
                while let Some(t) = seq.next_element()? {
                    types.push(t);
                }
                Ok(SubmissionTypes(types))
            }

            fn visit_unit<E: de::Error>(self) -> Result<SubmissionTypes, E> {
                Ok(SubmissionTypes::default())
            }
        }

        deserializer.deserialize_any(TypesVisitor)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameId {
    pub user_id: IntString,
    pub username: String,
}

/// A username suggested for partial input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Autocomplete {
    pub id: IntString,
    /// The user input with the partial username replaced by the suggestion.
    pub value: String,
    /// Relative path of the user icon, such as `"27/27014_fred.jpg"`.
    pub icon: String,
    pub info: String,
    #[serde(rename = "singleword")]
    pub single_word: String,
    #[serde(rename = "searchterm")]
    pub search_term: String,
}

/// A keyword suggested for partial input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordAutocomplete {
    pub id: IntString,
    pub value: String,
    #[serde(rename = "singleword")]
    pub keyword: String,
    #[serde(rename = "searchterm")]
    pub search_term: String,
    pub submissions_count: IntString,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub sid: String,
    pub logout: String,
}

/// URLs of the assets of the primary file of a submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileUrl {
    pub file_url_full: String,
    pub file_url_screen: String,
    pub file_url_preview: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatestFileUrl {
    pub latest_file_url_full: String,
    pub latest_file_url_screen: String,
    pub latest_file_url_preview: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thumbs {
    pub thumbnail_url_medium: String,
    pub thumbnail_url_large: String,
    pub thumbnail_url_huge: String,
    pub thumbnail_url_medium_noncustom: String,
    pub thumbnail_url_large_noncustom: String,
    pub thumbnail_url_huge_noncustom: String,
    pub thumb_medium_x: IntString,
    pub thumb_medium_y: IntString,
    pub thumb_large_x: IntString,
    pub thumb_large_y: IntString,
    pub thumb_huge_x: IntString,
    pub thumb_huge_y: IntString,
    pub thumb_medium_noncustom_x: IntString,
    pub thumb_medium_noncustom_y: IntString,
    pub thumb_large_noncustom_x: IntString,
    pub thumb_large_noncustom_y: IntString,
    pub thumb_huge_noncustom_x: IntString,
    pub thumb_huge_noncustom_y: IntString,
}

/// Thumbnails of the most recently added file of a submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatestThumbs {
    pub latest_thumbnail_url_medium: String,
    pub latest_thumbnail_url_large: String,
    pub latest_thumbnail_url_huge: String,
    pub latest_thumbnail_url_medium_noncustom: String,
    pub latest_thumbnail_url_large_noncustom: String,
    pub latest_thumbnail_url_huge_noncustom: String,
    pub latest_thumb_medium_x: IntString,
    pub latest_thumb_medium_y: IntString,
    pub latest_thumb_large_x: IntString,
    pub latest_thumb_large_y: IntString,
    pub latest_thumb_huge_x: IntString,
    pub latest_thumb_huge_y: IntString,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserIconUrls {
    #[serde(rename = "user_icon_url_large")]
    pub large: String,
    #[serde(rename = "user_icon_url_medium")]
    pub medium: String,
    #[serde(rename = "user_icon_url_small")]
    pub small: String,
}

/// Fields shared by search results and submission details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionBasic {
    pub submission_id: IntString,
    pub hidden: YesNo,
    pub username: String,
    pub user_id: IntString,
    #[serde(rename = "create_datetime")]
    pub create_date_system: String,
    #[serde(rename = "create_datetime_usertime")]
    pub create_date_user: String,
    #[serde(rename = "last_file_update_datetime")]
    pub update_date_system: String,
    #[serde(rename = "last_file_update_datetime_usertime")]
    pub update_date_user: String,
    pub file_name: String,
    pub latest_file_name: String,
    pub title: String,
    pub deleted: YesNo,
    pub public: YesNo,
    #[serde(rename = "mimetype")]
    pub mime_type: String,
    #[serde(rename = "latest_mimetype")]
    pub latest_mime_type: String,
    #[serde(rename = "pagecount")]
    pub page_count: IntString,
    pub rating_id: IntString,
    pub rating_name: String,
    #[serde(flatten)]
    pub file_url: FileUrl,
    #[serde(flatten)]
    pub thumbs: Thumbs,
    #[serde(flatten)]
    pub latest_thumbs: LatestThumbs,
    pub submission_type_id: IntString,
    pub type_name: String,
    #[serde(rename = "digitalsales")]
    pub digital_sales: YesNo,
    #[serde(rename = "printsales")]
    pub print_sales: YesNo,
    pub friends_only: YesNo,
    pub guest_block: YesNo,
    pub scraps: YesNo,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionDetails {
    #[serde(flatten)]
    pub basic: SubmissionBasic,
    pub keywords: Vec<Keyword>,
    pub favorite: YesNo,
    pub favorites_count: IntString,
    pub user_icon_file_name: String,
    #[serde(flatten)]
    pub user_icon_urls: UserIconUrls,
    #[serde(flatten)]
    pub latest_file_url: LatestFileUrl,
    pub files: Vec<File>,
    pub pools: Vec<Pool>,
    pub description: String,
    pub description_bbcode_parsed: String,
    pub writing: String,
    pub writing_bbcode_parsed: String,
    pub pools_count: IntString,
    pub ratings: Vec<SubmissionRating>,
    pub comments_count: IntString,
    pub views: IntString,
    pub sales_description: String,
    #[serde(rename = "forsale")]
    pub for_sale: YesNo,
    pub digital_price: String,
    pub prints: Vec<Print>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keyword {
    pub keyword_id: IntString,
    pub keyword_name: String,
    /// Suggested by another user rather than assigned by the owner.
    #[serde(rename = "contributed")]
    pub suggested: YesNo,
    #[serde(rename = "submissions_count")]
    pub count: IntString,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub file_id: IntString,
    pub file_name: String,
    #[serde(flatten)]
    pub thumbs: Thumbs,
    #[serde(flatten)]
    pub file_url: FileUrl,
    #[serde(rename = "mimetype")]
    pub mime_type: String,
    pub submission_id: IntString,
    pub user_id: IntString,
    /// Display position of this file, starting at 0.
    pub submission_file_order: IntString,
    pub full_size_x: IntString,
    pub full_size_y: IntString,
    pub screen_size_x: IntString,
    pub screen_size_y: IntString,
    pub preview_size_x: IntString,
    pub preview_size_y: IntString,
    pub initial_file_md5: String,
    pub full_file_md5: String,
    pub large_file_md5: String,
    pub small_file_md5: String,
    pub thumbnail_md5: String,
    pub deleted: YesNo,
    pub create_datetime: String,
    pub create_datetime_usertime: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pool {
    pub pool_id: IntString,
    pub name: String,
    pub description: String,
    pub count: IntString,
    #[serde(rename = "submission_left_submission_id")]
    pub left_submission_id: IntString,
    #[serde(rename = "submission_right_submission_id")]
    pub right_submission_id: IntString,
    #[serde(rename = "submission_left_file_name")]
    pub left_file_name: String,
    #[serde(rename = "submission_right_file_name")]
    pub right_file_name: String,
    #[serde(rename = "submission_left_thumbnail_url")]
    pub left_thumbnail_url: String,
    #[serde(rename = "submission_right_thumbnail_url")]
    pub right_thumbnail_url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Print {
    pub print_size_id: IntString,
    pub name: String,
    pub price: PriceString,
    #[serde(default)]
    pub price_owner_discount: Option<PriceString>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionRating {
    pub content_tag_id: IntString,
    pub name: String,
    pub description: String,
    pub rating_id: IntString,
}

macro_rules! display_as_json {
    ($($t:ty),* $(,)?) => {
        $(
            impl Display for $t {
                fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                    fmt_as_json(self, f)
                }
            }
        )*
    };
}

display_as_json!(
    UsernameId,
    Autocomplete,
    KeywordAutocomplete,
    LogoutResponse,
    SubmissionBasic,
    SubmissionDetails,
    File,
    Pool,
    Print,
);

static SHORT_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)([smhdwy])").expect("compile regex"));

/// Parse a results-set TTL such as `"15m"` or `"1h 30m"`.
///
/// Units are `s`, `m`, `h`, `d`, `w` and `y` (365 days). Anything else is ignored, so an
/// unrecognized string yields a zero duration.
pub fn ttl_to_duration(ttl: &str) -> Duration {
    let ttl = ttl.replace(' ', "");
    SHORT_DURATION
        .captures_iter(&ttl)
        .filter_map(|caps| {
            let n: u64 = caps[1].parse().ok()?;
            let unit = match &caps[2] {
                "s" => 1,
                "m" => 60,
                "h" => 60 * 60,
                "d" => 24 * 60 * 60,
                "w" => 7 * 24 * 60 * 60,
                _ => 365 * 24 * 60 * 60,
            };
            Some(Duration::from_secs(n.saturating_mul(unit)))
        })
        .fold(Duration::ZERO, Duration::saturating_add)
}

// Display implementation for types which serialize to JSON. Displays as a valid JSON object.
pub fn fmt_as_json<T: Serialize>(v: &T, f: &mut Formatter<'_>) -> fmt::Result {
    let string = serde_json::to_string(v).map_err(|_| fmt::Error)?;
    write!(f, "{}", string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::to_form_values;

    #[test]
    fn ttl_strings() {
        assert_eq!(ttl_to_duration("15m"), Duration::from_secs(15 * 60));
        assert_eq!(ttl_to_duration("1h 30m"), Duration::from_secs(90 * 60));
        assert_eq!(ttl_to_duration("2d"), Duration::from_secs(2 * 86400));
        assert_eq!(
            ttl_to_duration("1w 1y 5s"),
            Duration::from_secs(7 * 86400 + 365 * 86400 + 5)
        );
        assert_eq!(ttl_to_duration("soon"), Duration::ZERO);
        assert_eq!(ttl_to_duration(""), Duration::ZERO);
    }

    #[test]
    fn oversized_ttl_saturates() {
        assert_eq!(ttl_to_duration("18446744073709551615s 1s"), Duration::MAX);
        assert_eq!(
            ttl_to_duration("18446744073709551615y"),
            Duration::from_secs(u64::MAX)
        );
        assert_eq!(
            ttl_to_duration("9000000000000000000h 9000000000000000000h"),
            Duration::MAX
        );
    }

    #[test]
    fn enums_use_wire_names() {
        #[derive(Serialize)]
        struct Params {
            orderby: OrderBy,
            sales: SalesFilter,
            scraps: Scraps,
            field_join_type: JoinType,
            output_mode: OutputMode,
            #[serde(rename = "type")]
            types: SubmissionTypes,
        }

        let values = to_form_values(&Params {
            orderby: OrderBy::TotalPrintSales,
            sales: SalesFilter::ForSale,
            scraps: Scraps::Only,
            field_join_type: JoinType::Or,
            output_mode: OutputMode::Json,
            types: vec![SubmissionType::Sketch, SubmissionType::Comic].into(),
        })
        .unwrap();
        assert_eq!(
            values.encode(),
            "orderby=total_print_sales&sales=forsale&scraps=only&field_join_type=or\
             &output_mode=json&type=2%2C4"
        );
    }

    #[test]
    fn submission_types_decode_from_string_or_array() {
        let from_str: SubmissionTypes = serde_json::from_str(r#""1,14""#).unwrap();
        assert_eq!(
            from_str.0,
            vec![SubmissionType::PicturePinup, SubmissionType::Photography]
        );
        let from_array: SubmissionTypes = serde_json::from_str(r#"[3, "4"]"#).unwrap();
        assert_eq!(
            from_array.0,
            vec![SubmissionType::PictureSeries, SubmissionType::Comic]
        );
        assert!(serde_json::from_str::<SubmissionTypes>(r#""15""#).is_err());
        assert_eq!(serde_json::to_string(&from_str).unwrap(), r#""1,14""#);
    }

    #[test]
    fn submission_details_decode_with_embedded_groups() {
        let details: SubmissionDetails = serde_json::from_str(
            r#"{
                "submission_id": "14576",
                "username": "inkbunny",
                "public": "t",
                "thumbnail_url_huge": "https://example/thumb.jpg",
                "thumb_huge_x": "300",
                "file_url_full": "https://example/full.png",
                "latest_thumb_medium_x": "120",
                "user_icon_url_small": "https://example/icon.png",
                "keywords": [{"keyword_id": "1", "keyword_name": "dragon", "contributed": "f", "submissions_count": "12"}],
                "prints": [{"print_size_id": "3", "name": "A4", "price": "$20.00"}],
                "digital_price": "$5.50",
                "pools_count": 2
            }"#,
        )
        .unwrap();
        assert_eq!(details.basic.submission_id, IntString(14576));
        assert!(details.basic.public.is_yes());
        assert_eq!(details.basic.thumbs.thumb_huge_x.get(), 300);
        assert_eq!(details.basic.file_url.file_url_full, "https://example/full.png");
        assert_eq!(details.basic.latest_thumbs.latest_thumb_medium_x.get(), 120);
        assert_eq!(details.user_icon_urls.small, "https://example/icon.png");
        assert_eq!(details.keywords[0].keyword_name, "dragon");
        assert!(details.keywords[0].suggested.is_no());
        assert_eq!(details.prints[0].price, PriceString(20.0));
        assert_eq!(details.prints[0].price_owner_discount, None);
        assert_eq!(details.digital_price, "$5.50");
        assert_eq!(details.pools_count.get(), 2);
    }

    #[test]
    fn records_display_as_json() {
        let user = UsernameId {
            user_id: IntString(7),
            username: "fred".into(),
        };
        assert_eq!(user.to_string(), r#"{"user_id":"7","username":"fred"}"#);
    }
}
