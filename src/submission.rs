// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Submission details, edits and deletion.

use crate::client::Client;
use crate::error::{
    EmptySubmissionIdSnafu, Error, FormSnafu, NotLoggedInSnafu, UnexpectedSubmissionIdSnafu,
};
use crate::form::{to_form_values, FormValues};
use crate::response::decode_response;
use crate::scalar::{IntString, YesNo};
use crate::types::{OutputMode, SubmissionDetails, SubmissionType, UsernameId};
use crate::user::User;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use snafu::{ensure, ResultExt};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionDetailsRequest {
    pub sid: String,
    /// Comma-separated submission IDs.
    pub submission_ids: String,
    /// IDs appended to `submission_ids` before sending.
    #[serde(skip)]
    pub submission_id_list: Vec<IntString>,
    pub output_mode: Option<OutputMode>,
    pub sort_keywords_by: Option<String>,
    pub show_description: Option<YesNo>,
    pub show_description_bbcode_parsed: Option<YesNo>,
    pub show_writing: Option<YesNo>,
    pub show_writing_bbcode_parsed: Option<YesNo>,
    pub show_pools: Option<YesNo>,
}

impl SubmissionDetailsRequest {
    /// Merge `submission_id_list` into `submission_ids`.
    fn join_ids(&mut self) {
        if self.submission_id_list.is_empty() {
            return;
        }
        let list = self.submission_id_list.drain(..).join(",");
        if self.submission_ids.is_empty() {
            self.submission_ids = list;
        } else {
            self.submission_ids = format!("{},{}", self.submission_ids, list);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SubmissionDetailsResponse {
    pub sid: String,
    pub results_count: IntString,
    pub user_location: String,
    pub submissions: Vec<SubmissionDetails>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubmissionFavoritesResponse {
    pub sid: String,
    #[serde(rename = "favingusers")]
    pub users: Vec<UsernameId>,
}

/// A partial update of a submission.
///
/// `None` leaves a field unchanged. `Some` replaces it, so `Some(String::new())` clears a text
/// field and `Some(vec![])` removes every keyword.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionEditRequest {
    pub sid: String,
    pub submission_id: IntString,
    pub title: Option<String>,
    #[serde(rename = "desc")]
    pub description: Option<String>,
    pub story: Option<String>,
    /// Convert HTML entities in the uploaded text back to plain characters.
    #[serde(skip_serializing_if = "YesNo::is_no")]
    pub convert_html_entities: YesNo,
    #[serde(skip_serializing_if = "SubmissionType::is_any")]
    pub submission_type: SubmissionType,
    pub scraps: Option<YesNo>,
    pub use_twitter: Option<YesNo>,
    /// 0 sends text only, 1 the thumbnail, 2 the full picture.
    pub twitter_image_pref: Option<u8>,
    #[serde(rename = "visibility")]
    pub public: Option<YesNo>,
    /// Whether watchers are notified the first time the submission goes public. Defaults to
    /// yes when `public` is set.
    #[serde(skip)]
    pub notify: Option<YesNo>,
    /// The complete keyword list, replacing the current one.
    pub keywords: Option<Vec<String>>,
    #[serde(rename = "tag[2]")]
    pub nudity: Option<YesNo>,
    #[serde(rename = "tag[3]")]
    pub mild_violence: Option<YesNo>,
    #[serde(rename = "tag[4]")]
    pub sexual: Option<YesNo>,
    #[serde(rename = "tag[5]")]
    pub strong_violence: Option<YesNo>,
    pub guest_block: Option<YesNo>,
    pub friends_only: Option<YesNo>,
}

impl SubmissionEditRequest {
    /// The form to send, with the visibility adjusted for `notify`.
    pub fn to_form_values(&self) -> Result<FormValues, Error> {
        let mut values = to_form_values(self).context(FormSnafu)?;
        if self.public == Some(YesNo::YES) && self.notify == Some(YesNo::NO) {
            values.set("visibility", "yes_nowatch");
        }
        Ok(values)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditSubmissionResponse {
    pub submission_id: IntString,
    #[serde(rename = "twitter_authentication_success")]
    pub twitter_auth_success: YesNo,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeleteFileResponse {
    pub submission_id: IntString,
    pub file_id: IntString,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReorderFileResponse {
    pub submission_id: IntString,
    pub file_id: IntString,
    pub new_position: IntString,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeleteSubmissionResponse {
    pub submission_id: IntString,
}

#[derive(Serialize)]
struct SubmissionRequest<'a> {
    sid: &'a str,
    submission_id: IntString,
}

#[derive(Serialize)]
struct FileRequest<'a> {
    sid: &'a str,
    file_id: IntString,
    #[serde(rename = "newpos")]
    new_position: Option<IntString>,
}

impl Client {
    pub async fn submission_details(
        &self,
        mut request: SubmissionDetailsRequest,
    ) -> Result<SubmissionDetailsResponse, Error> {
        ensure!(!request.sid.is_empty(), NotLoggedInSnafu);
        request.join_ids();
        self.post_decode("submissions", &request).await
    }

    /// Users who favorited a submission.
    pub async fn submission_favorites(
        &self,
        sid: &str,
        submission_id: IntString,
    ) -> Result<SubmissionFavoritesResponse, Error> {
        ensure!(!sid.is_empty(), NotLoggedInSnafu);
        self.post_decode(
            "submissionfavingusers",
            &SubmissionRequest { sid, submission_id },
        )
        .await
    }

    pub async fn edit_submission(
        &self,
        request: &SubmissionEditRequest,
    ) -> Result<EditSubmissionResponse, Error> {
        ensure!(!request.sid.is_empty(), NotLoggedInSnafu);
        ensure!(!request.submission_id.is_zero(), EmptySubmissionIdSnafu);
        let values = request.to_form_values()?;
        decode_response(&self.post_form("editsubmission", &values).await?)
    }

    pub async fn delete_file(&self, sid: &str, file_id: IntString) -> Result<DeleteFileResponse, Error> {
        ensure!(!sid.is_empty(), NotLoggedInSnafu);
        let request = FileRequest {
            sid,
            file_id,
            new_position: None,
        };
        self.post_decode("delfile", &request).await
    }

    /// Move a file of a submission to `new_position`, counting from 0.
    pub async fn reorder_file(
        &self,
        sid: &str,
        file_id: IntString,
        new_position: IntString,
    ) -> Result<ReorderFileResponse, Error> {
        ensure!(!sid.is_empty(), NotLoggedInSnafu);
        let request = FileRequest {
            sid,
            file_id,
            new_position: Some(new_position),
        };
        self.post_decode("reorderfile", &request).await
    }

    pub async fn delete_submission(
        &self,
        sid: &str,
        submission_id: IntString,
    ) -> Result<(), Error> {
        ensure!(!sid.is_empty(), NotLoggedInSnafu);
        ensure!(!submission_id.is_zero(), EmptySubmissionIdSnafu);
        let response: DeleteSubmissionResponse = self
            .post_decode("delsubmission", &SubmissionRequest { sid, submission_id })
            .await?;
        ensure!(
            response.submission_id == submission_id,
            UnexpectedSubmissionIdSnafu {
                submission_id: response.submission_id.to_string()
            }
        );
        Ok(())
    }
}

impl User {
    pub async fn submission_details(
        &self,
        mut request: SubmissionDetailsRequest,
    ) -> Result<SubmissionDetailsResponse, Error> {
        if request.sid.is_empty() {
            request.sid = self.require_sid()?.to_string();
        }
        self.client().submission_details(request).await
    }

    pub async fn submission_favorites(
        &self,
        submission_id: IntString,
    ) -> Result<SubmissionFavoritesResponse, Error> {
        let sid = self.require_sid()?;
        self.client().submission_favorites(sid, submission_id).await
    }

    pub async fn edit_submission(
        &self,
        mut request: SubmissionEditRequest,
    ) -> Result<EditSubmissionResponse, Error> {
        if request.sid.is_empty() {
            request.sid = self.require_sid()?.to_string();
        }
        self.client().edit_submission(&request).await
    }

    pub async fn delete_file(&self, file_id: IntString) -> Result<DeleteFileResponse, Error> {
        let sid = self.require_sid()?;
        self.client().delete_file(sid, file_id).await
    }

    pub async fn reorder_file(
        &self,
        file_id: IntString,
        new_position: IntString,
    ) -> Result<ReorderFileResponse, Error> {
        let sid = self.require_sid()?;
        self.client().reorder_file(sid, file_id, new_position).await
    }

    pub async fn delete_submission(&self, submission_id: IntString) -> Result<(), Error> {
        let sid = self.require_sid()?;
        self.client().delete_submission(sid, submission_id).await
    }
}
