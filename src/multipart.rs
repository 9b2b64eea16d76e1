// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! `multipart/form-data` bodies.
//!
//! Text parts come from the same flattening as URL-encoded bodies (see [crate::form]). Which
//! parts carry file content is decided by the caller: file fields are skipped on the request
//! struct and added with [MultipartForm::file].

use crate::form::{to_form_values, FormError, FormValues};
use serde::Serialize;
use std::io::{self, Read, Write};

/// A `multipart/form-data` body under construction.
#[derive(Clone, Debug)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// An empty form with a random boundary.
    pub fn new() -> Self {
        let nonce: [u8; 16] = rand::random();
        Self::with_boundary(hex::encode(nonce))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    /// A form with one text part for every field of `value`, in flattening order.
    pub fn from_struct<T: ?Sized + Serialize>(value: &T) -> Result<Self, FormError> {
        let mut form = Self::new();
        form.values(&to_form_values(value)?);
        Ok(form)
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.part_header(name, None);
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn values(&mut self, values: &FormValues) -> &mut Self {
        for (name, value) in values.iter() {
            self.text(name, value);
        }
        self
    }

    /// Append a file part, copying all of `content` into the body.
    pub fn file(
        &mut self,
        name: &str,
        filename: &str,
        mut content: impl Read,
    ) -> io::Result<&mut Self> {
        self.part_header(name, Some(filename));
        io::copy(&mut content, &mut self.body)?;
        self.body.extend_from_slice(b"\r\n");
        Ok(self)
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Close the body and return its bytes.
    pub fn finish(mut self) -> Vec<u8> {
        // Writing into a Vec cannot fail.
        let _ = write!(self.body, "--{}--\r\n", self.boundary);
        self.body
    }

    fn part_header(&mut self, name: &str, filename: Option<&str>) {
        let _ = write!(
            self.body,
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"",
            self.boundary,
            escape_quotes(name)
        );
        let _ = match filename {
            Some(filename) => write!(
                self.body,
                "; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                escape_quotes(filename)
            ),
            None => write!(self.body, "\r\n\r\n"),
        };
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::YesNo;

    #[derive(Serialize)]
    struct Upload {
        sid: &'static str,
        #[serde(skip_serializing_if = "str::is_empty")]
        submission_id: &'static str,
        #[serde(skip_serializing_if = "YesNo::is_no")]
        notify: YesNo,
    }

    #[test]
    fn writes_text_and_file_parts_in_order() {
        let mut form = MultipartForm::with_boundary("XyZ");
        form.values(
            &to_form_values(&Upload {
                sid: "abc",
                submission_id: "",
                notify: YesNo::YES,
            })
            .unwrap(),
        );
        form.file("uploadedfile[0]", "a \"b\".png", &b"PNG"[..])
            .unwrap();
        assert_eq!(form.content_type(), "multipart/form-data; boundary=XyZ");

        let body = String::from_utf8(form.finish()).unwrap();
        assert_eq!(
            body,
            "--XyZ\r\nContent-Disposition: form-data; name=\"sid\"\r\n\r\nabc\r\n\
             --XyZ\r\nContent-Disposition: form-data; name=\"notify\"\r\n\r\nyes\r\n\
             --XyZ\r\nContent-Disposition: form-data; name=\"uploadedfile[0]\"; \
             filename=\"a \\\"b\\\".png\"\r\nContent-Type: application/octet-stream\r\n\r\nPNG\r\n\
             --XyZ--\r\n"
        );
    }

    #[test]
    fn random_boundaries_differ() {
        let a = MultipartForm::new();
        let b = MultipartForm::new();
        assert_eq!(a.boundary().len(), 32);
        assert_ne!(a.boundary(), b.boundary());
    }

    #[test]
    fn from_struct_uses_flattening_rules() {
        let form = MultipartForm::from_struct(&Upload {
            sid: "abc",
            submission_id: "42",
            notify: YesNo::NO,
        })
        .unwrap();
        let boundary = form.boundary().to_string();
        let body = String::from_utf8(form.finish()).unwrap();
        assert!(body.contains("name=\"submission_id\"\r\n\r\n42\r\n"));
        assert!(!body.contains("notify"));
        assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
    }
}
