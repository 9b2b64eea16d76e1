// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Submission search.
//!
//! A search either runs a query (Mode 1) or, when an RID is set, pages through the stored
//! results of an earlier query (Mode 2), in which case every query parameter is ignored. Results
//! sets expire after `rid_ttl` without access.

use crate::client::Client;
use crate::error::Error;
use crate::scalar::{IntString, YesNo};
use crate::types::{
    fmt_as_json, ttl_to_duration, JoinType, OrderBy, OutputMode, SalesFilter, Scraps,
    SubmissionBasic, SubmissionTypes,
};
use crate::submission::{SubmissionDetailsRequest, SubmissionDetailsResponse};
use crate::user::User;
use futures::future;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::time::{Duration, SystemTime};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SubmissionSearchRequest {
    pub sid: String,
    pub output_mode: Option<OutputMode>,
    /// Results ID of a stored results set to page through.
    pub rid: String,
    pub submission_ids_only: Option<YesNo>,
    #[serde(skip_serializing_if = "IntString::is_zero")]
    pub submissions_per_page: IntString,
    /// Results page to return, starting at 1.
    #[serde(skip_serializing_if = "IntString::is_zero")]
    pub page: IntString,
    /// Return the top 100 keywords of the submissions on this page.
    pub keywords_list: Option<YesNo>,
    pub no_submissions: Option<YesNo>,
    /// Store the results and return an RID for paging.
    pub get_rid: Option<YesNo>,
    pub field_join_type: Option<JoinType>,
    /// Full text searched for in the chosen fields.
    pub text: String,
    pub string_join_type: Option<JoinType>,
    /// Search keywords. On by default on the server.
    pub keywords: Option<YesNo>,
    pub title: Option<YesNo>,
    /// Search the description and story.
    pub description: Option<YesNo>,
    pub md5: Option<YesNo>,
    #[serde(skip_serializing_if = "IntString::is_zero")]
    pub keyword_id: IntString,
    pub username: String,
    #[serde(skip_serializing_if = "IntString::is_zero")]
    pub user_id: IntString,
    #[serde(skip_serializing_if = "IntString::is_zero")]
    pub favs_user_id: IntString,
    pub unread_submissions: Option<YesNo>,
    #[serde(rename = "type", skip_serializing_if = "SubmissionTypes::is_empty")]
    pub types: SubmissionTypes,
    pub sales: Option<SalesFilter>,
    #[serde(skip_serializing_if = "IntString::is_zero")]
    pub pool_id: IntString,
    #[serde(rename = "orderby")]
    pub order_by: Option<OrderBy>,
    #[serde(rename = "dayslimit", skip_serializing_if = "IntString::is_zero")]
    pub days_limit: IntString,
    /// Shuffle the results after every other filter and order has been applied.
    pub random: Option<YesNo>,
    pub scraps: Option<Scraps>,
    #[serde(skip_serializing_if = "IntString::is_zero")]
    pub count_limit: IntString,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionSearch {
    #[serde(flatten)]
    pub basic: SubmissionBasic,
    #[serde(rename = "unread_datetime_system")]
    pub unread_date_system: String,
    #[serde(rename = "unread_datetime")]
    pub unread_date_user: String,
    pub updated: YesNo,
    pub stars: IntString,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordList {
    pub keyword_id: IntString,
    pub keyword_name: String,
    pub submissions_count: IntString,
}

/// A parameter the server used to produce a results set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParam {
    #[serde(rename = "param_name")]
    pub name: String,
    #[serde(rename = "param_type")]
    pub kind: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionSearchResponse {
    pub sid: String,
    pub user_location: String,
    pub results_count_all: IntString,
    #[serde(rename = "results_count_thispage")]
    pub results_count_this_page: IntString,
    pub pages_count: IntString,
    pub page: IntString,
    pub rid: String,
    pub rid_ttl: String,
    /// `rid_ttl` parsed, zero when no results set was stored.
    #[serde(skip)]
    pub rid_ttl_duration: Duration,
    /// When the stored results set expires, counted from when this response was received.
    #[serde(skip)]
    pub rid_expiry: Option<SystemTime>,
    pub search_params: Vec<SearchParam>,
    pub keyword_list: Vec<KeywordList>,
    pub submissions: Vec<SubmissionSearch>,
}

impl SubmissionSearchResponse {
    /// IDs of the submissions on this page, in order.
    pub fn submission_ids(&self) -> Vec<IntString> {
        self.submissions
            .iter()
            .map(|s| s.basic.submission_id)
            .collect()
    }

    /// Whether the results set behind `rid` has expired. A response without one never expires.
    pub fn rid_expired(&self) -> bool {
        self.rid_expiry
            .map_or(false, |expiry| expiry <= SystemTime::now())
    }
}

impl Display for SubmissionSearchResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt_as_json(self, f)
    }
}

impl Client {
    pub async fn search_submissions(
        &self,
        request: &SubmissionSearchRequest,
    ) -> Result<SubmissionSearchResponse, Error> {
        let mut response: SubmissionSearchResponse = self.post_decode("search", request).await?;
        if !response.rid_ttl.is_empty() {
            response.rid_ttl_duration = ttl_to_duration(&response.rid_ttl);
            response.rid_expiry = SystemTime::now().checked_add(response.rid_ttl_duration);
        }
        Ok(response)
    }

    /// Fetch another page of the results set behind `results`.
    ///
    /// `results` must come from a search made with `get_rid`, otherwise the server runs a fresh
    /// search. Pages are numbered from 1.
    pub async fn search_page(
        &self,
        results: &SubmissionSearchResponse,
        page: IntString,
    ) -> Result<SubmissionSearchResponse, Error> {
        let request = SubmissionSearchRequest {
            sid: results.sid.clone(),
            rid: results.rid.clone(),
            page,
            ..SubmissionSearchRequest::default()
        };
        self.search_submissions(&request).await
    }

    /// Every page of the results set behind `first`, starting with `first` itself.
    ///
    /// Pages after the first are fetched one at a time as the stream is polled. `first` must come
    /// from a search made with `get_rid`, and the walk should finish before `rid_expiry`.
    pub fn all_pages(
        &self,
        first: SubmissionSearchResponse,
    ) -> impl Stream<Item = Result<SubmissionSearchResponse, Error>> + '_ {
        let template = SubmissionSearchRequest {
            sid: first.sid.clone(),
            rid: first.rid.clone(),
            ..SubmissionSearchRequest::default()
        };
        let rest = first.pages_count.pages().skip(1);
        stream::once(future::ready(Ok(first))).chain(stream::iter(rest).then(move |index| {
            let request = SubmissionSearchRequest {
                page: IntString(index.get() + 1),
                ..template.clone()
            };
            async move { self.search_submissions(&request).await }
        }))
    }

    /// The submissions of every page of the results set behind `first`, a page at a time.
    pub fn all_submissions(
        &self,
        first: SubmissionSearchResponse,
    ) -> impl Stream<Item = Result<Vec<SubmissionSearch>, Error>> + '_ {
        self.all_pages(first).map_ok(|page| page.submissions)
    }

    /// Full details of the submissions on one page of search results.
    pub async fn search_details(
        &self,
        results: &SubmissionSearchResponse,
    ) -> Result<SubmissionDetailsResponse, Error> {
        let request = SubmissionDetailsRequest {
            sid: results.sid.clone(),
            submission_id_list: results.submission_ids(),
            ..SubmissionDetailsRequest::default()
        };
        self.submission_details(request).await
    }
}

impl User {
    /// Search as this user. An empty `sid` on the request is filled in from the session.
    pub async fn search_submissions(
        &self,
        mut request: SubmissionSearchRequest,
    ) -> Result<SubmissionSearchResponse, Error> {
        if request.sid.is_empty() {
            request.sid = self.require_sid()?.to_string();
        }
        self.client().search_submissions(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::to_form_values;
    use crate::types::SubmissionType;

    #[test]
    fn empty_fields_are_not_sent() {
        let request = SubmissionSearchRequest {
            sid: "abc".into(),
            text: "red fox".into(),
            get_rid: Some(YesNo::YES),
            keywords: Some(YesNo::NO),
            title: Some(YesNo::YES),
            submissions_per_page: IntString(30),
            types: vec![SubmissionType::PicturePinup, SubmissionType::Sketch].into(),
            order_by: Some(OrderBy::Views),
            ..SubmissionSearchRequest::default()
        };
        assert_eq!(
            to_form_values(&request).unwrap().encode(),
            "sid=abc&submissions_per_page=30&get_rid=yes&text=red+fox&keywords=no&title=yes\
             &type=1%2C2&orderby=views"
        );
    }

    #[test]
    fn response_decodes_embedded_submission_fields() {
        let response: SubmissionSearchResponse = serde_json::from_str(
            r#"{
                "sid": "abc",
                "results_count_all": "2",
                "results_count_thispage": 2,
                "pages_count": "1",
                "page": "1",
                "rid": "f00",
                "rid_ttl": "15 minutes",
                "search_params": [{"param_name": "text", "param_type": "string"}],
                "submissions": [
                    {"submission_id": "10", "title": "one", "updated": "f", "stars": "3"},
                    {"submission_id": "11", "title": "two", "unread_datetime": "2024-01-01"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(response.results_count_this_page, IntString(2));
        assert_eq!(response.search_params[0].kind, "string");
        assert_eq!(response.submissions[1].basic.title, "two");
        assert_eq!(response.submissions[0].stars.get(), 3);
        assert_eq!(
            response.submission_ids(),
            vec![IntString(10), IntString(11)]
        );
        assert_eq!(response.results_count_all.get(), 2);
    }
}
