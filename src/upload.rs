// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! File uploads.
//!
//! Plain files are sent together in one request. A zip archive, a thumbnail or a replacement
//! target each need a request per file; the submission created by the first request is reused by
//! the following ones.

use crate::client::Client;
use crate::error::{Error, FormSnafu, NoFilesSnafu, NoSubmissionIdSnafu, NotLoggedInSnafu, ReadSnafu};
use crate::multipart::MultipartForm;
use crate::response::decode_response;
use crate::scalar::{IntString, YesNo};
use crate::user::User;
use serde::{Deserialize, Serialize};
use snafu::{ensure, ResultExt};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{event, Level};

/// The name and content of one uploaded file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileContent {
    pub name: String,
    pub data: Vec<u8>,
}

impl FileContent {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, named after the last component of `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let data = fs::read(path).context(ReadSnafu)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, data })
    }

    pub fn from_reader(name: impl Into<String>, mut reader: impl Read) -> Result<Self, Error> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).context(ReadSnafu)?;
        Ok(Self::new(name, data))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileUpload {
    /// File ID of an existing file of the submission to replace.
    pub replace: Option<IntString>,
    pub main_file: FileContent,
    pub thumbnail: Option<FileContent>,
}

impl FileUpload {
    pub fn new(main_file: FileContent) -> Self {
        Self {
            main_file,
            ..Self::default()
        }
    }

    fn needs_own_request(&self) -> bool {
        self.replace.is_some() || self.thumbnail.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UploadRequest {
    pub sid: String,
    /// Add the files to this submission instead of creating a new one.
    #[serde(skip_serializing_if = "IntString::is_zero")]
    pub submission_id: IntString,
    #[serde(skip_serializing_if = "YesNo::is_no")]
    pub notify: YesNo,
    #[serde(skip)]
    pub files: Vec<FileUpload>,
    /// An archive of files, unpacked by the server.
    #[serde(skip)]
    pub zip_file: Option<FileContent>,
}

impl UploadRequest {
    fn one_request_per_file(&self) -> bool {
        self.zip_file.is_some() || self.files.iter().any(FileUpload::needs_own_request)
    }

    fn form(&self) -> Result<MultipartForm, Error> {
        MultipartForm::from_struct(self).context(FormSnafu)
    }

    /// Every file in one body, as `uploadedfile[i]`.
    fn all_files_form(&self) -> Result<MultipartForm, Error> {
        let mut form = self.form()?;
        for (i, file) in self.files.iter().enumerate() {
            form.file(
                &format!("uploadedfile[{}]", i),
                &file.main_file.name,
                file.main_file.data.as_slice(),
            )
            .context(ReadSnafu)?;
        }
        Ok(form)
    }

    fn zip_form(&self, zip: &FileContent) -> Result<MultipartForm, Error> {
        let mut form = self.form()?;
        form.file("zipfile", &zip.name, zip.data.as_slice())
            .context(ReadSnafu)?;
        Ok(form)
    }

    /// File `index` with its replacement target and thumbnail.
    fn single_file_form(&self, index: usize) -> Result<MultipartForm, Error> {
        let file = &self.files[index];
        let mut form = self.form()?;
        if let Some(replace) = file.replace {
            form.text("replace", &replace.to_string());
        }
        form.file(
            &format!("uploadedfile[{}]", index),
            &file.main_file.name,
            file.main_file.data.as_slice(),
        )
        .context(ReadSnafu)?;
        if let Some(thumbnail) = &file.thumbnail {
            form.file(
                &format!("uploadedthumbnail[{}]", index),
                &thumbnail.name,
                thumbnail.data.as_slice(),
            )
            .context(ReadSnafu)?;
        }
        Ok(form)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UploadResponse {
    pub sid: String,
    pub submission_id: IntString,
}

impl UploadResponse {
    /// Delete the submission this upload created or added to.
    pub async fn delete(&self, client: &Client) -> Result<(), Error> {
        client.delete_submission(&self.sid, self.submission_id).await
    }
}

impl Client {
    /// Upload files, returning the response to the last request sent.
    pub async fn upload(&self, mut request: UploadRequest) -> Result<UploadResponse, Error> {
        ensure!(!request.sid.is_empty(), NotLoggedInSnafu);
        ensure!(
            !request.files.is_empty() || request.zip_file.is_some(),
            NoFilesSnafu
        );

        if !request.one_request_per_file() {
            let form = request.all_files_form()?;
            return self.send_upload(form).await;
        }

        let mut last = None;
        if let Some(zip) = &request.zip_file {
            let response = self.send_upload(request.zip_form(zip)?).await?;
            request.submission_id = response.submission_id;
            last = Some(response);
        }
        for index in 0..request.files.len() {
            if let Some(previous) = &last {
                ensure!(
                    !previous.submission_id.is_zero(),
                    NoSubmissionIdSnafu { index }
                );
                request.submission_id = previous.submission_id;
            }
            event!(
                Level::DEBUG,
                "uploading file {} of {} to submission {}",
                index + 1,
                request.files.len(),
                request.submission_id
            );
            last = Some(self.send_upload(request.single_file_form(index)?).await?);
        }
        // At least one request was sent.
        Ok(last.unwrap_or_default())
    }

    async fn send_upload(&self, form: MultipartForm) -> Result<UploadResponse, Error> {
        let bytes = self.post_multipart("upload", form).await?;
        decode_response(&bytes)
    }
}

impl User {
    /// Upload as this user. An empty `sid` on the request is filled in from the session.
    pub async fn upload(&self, mut request: UploadRequest) -> Result<UploadResponse, Error> {
        if request.sid.is_empty() {
            request.sid = self.require_sid()?.to_string();
        }
        self.client().upload(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(form: MultipartForm) -> String {
        String::from_utf8(form.finish()).unwrap()
    }

    #[test]
    fn plain_files_share_one_request() {
        let request = UploadRequest {
            sid: "abc".into(),
            notify: YesNo::YES,
            files: vec![
                FileUpload::new(FileContent::new("a.png", "AAA")),
                FileUpload::new(FileContent::new("b.png", "BBB")),
            ],
            ..UploadRequest::default()
        };
        assert!(!request.one_request_per_file());

        let body = body(request.all_files_form().unwrap());
        assert!(body.contains("name=\"sid\"\r\n\r\nabc\r\n"));
        assert!(body.contains("name=\"notify\"\r\n\r\nyes\r\n"));
        assert!(!body.contains("submission_id"));
        let first = body.find("name=\"uploadedfile[0]\"; filename=\"a.png\"").unwrap();
        let second = body.find("name=\"uploadedfile[1]\"; filename=\"b.png\"").unwrap();
        assert!(first < second);
    }

    #[test]
    fn thumbnails_and_replacements_need_their_own_request() {
        let mut request = UploadRequest {
            sid: "abc".into(),
            submission_id: IntString(42),
            files: vec![
                FileUpload::new(FileContent::new("a.png", "AAA")),
                FileUpload {
                    replace: Some(IntString(7)),
                    main_file: FileContent::new("b.png", "BBB"),
                    thumbnail: Some(FileContent::new("b_thumb.png", "TTT")),
                },
            ],
            ..UploadRequest::default()
        };
        assert!(request.one_request_per_file());

        let body = body(request.single_file_form(1).unwrap());
        assert!(body.contains("name=\"submission_id\"\r\n\r\n42\r\n"));
        let replace = body.find("name=\"replace\"\r\n\r\n7\r\n").unwrap();
        let file = body.find("name=\"uploadedfile[1]\"; filename=\"b.png\"").unwrap();
        let thumb = body
            .find("name=\"uploadedthumbnail[1]\"; filename=\"b_thumb.png\"")
            .unwrap();
        assert!(replace < file && file < thumb);
        assert!(!body.contains("uploadedfile[0]"));

        request.files.truncate(1);
        request.zip_file = Some(FileContent::new("all.zip", "PK"));
        assert!(request.one_request_per_file());
        let zip = request.zip_file.clone().unwrap();
        assert!(body_contains_zip(request.zip_form(&zip).unwrap()));
    }

    fn body_contains_zip(form: MultipartForm) -> bool {
        body(form).contains("name=\"zipfile\"; filename=\"all.zip\"")
    }

    #[test]
    fn file_content_from_reader() {
        let file = FileContent::from_reader("c.txt", &b"story"[..]).unwrap();
        assert_eq!(file, FileContent::new("c.txt", "story"));
    }

    #[async_std::test]
    async fn upload_needs_a_session_and_files() {
        let client = Client::new().unwrap();
        let request = UploadRequest {
            files: vec![FileUpload::new(FileContent::new("a.png", "AAA"))],
            ..UploadRequest::default()
        };
        assert!(matches!(
            client.upload(request).await,
            Err(Error::NotLoggedIn)
        ));

        let request = UploadRequest {
            sid: "abc".into(),
            ..UploadRequest::default()
        };
        assert!(matches!(client.upload(request).await, Err(Error::NoFiles)));
    }
}
