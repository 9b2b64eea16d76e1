// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::form::FormError;
use snafu::{IntoError, Snafu};
use surf::StatusCode;

/// Errors returned by the client and its endpoint wrappers.
///
/// Nothing in this crate retries a failed request; every error is returned to the caller of the
/// endpoint which produced it.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The request could not be sent, or the server answered with a non-success status.
    #[snafu(display("request failed ({}): {}", status, message))]
    Transport { status: StatusCode, message: String },

    /// The API answered with its error envelope (`error_code` and `error_message`).
    #[snafu(display("[{}]: {}", code, message))]
    Api { code: i64, message: String },

    /// `path` names the field which failed, such as `submissions[3].public`.
    #[snafu(display("failed to decode response at {}: {}", path, source))]
    Decode {
        path: String,
        source: serde_json::Error,
    },

    #[snafu(display("failed to encode request: {}", source))]
    Form { source: FormError },

    #[snafu(display("invalid client configuration: {}", message))]
    Config { message: String },

    #[snafu(display("username is empty"))]
    EmptyUsername,

    #[snafu(display("username is set but password is empty"))]
    EmptyPassword,

    #[snafu(display("not logged in: session ID is empty"))]
    NotLoggedIn,

    #[snafu(display("unexpected session ID from response"))]
    UnexpectedSid,

    #[snafu(display("submission ID is empty"))]
    EmptySubmissionId,

    #[snafu(display("unexpected submission ID from response: {}", submission_id))]
    UnexpectedSubmissionId { submission_id: String },

    #[snafu(display("logout failed, unexpected response: {}", response))]
    LogoutFailed { response: String },

    #[snafu(display("no files to upload"))]
    NoFiles,

    #[snafu(display("no submission ID after uploading file {}", index))]
    NoSubmissionId { index: usize },

    #[snafu(display("failed to read upload content: {}", source))]
    Read { source: std::io::Error },
}

impl Error {
    /// The HTTP status which best describes this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Api { .. } | Self::Decode { .. } => StatusCode::BadGateway,
            Self::UnexpectedSid | Self::UnexpectedSubmissionId { .. } => StatusCode::BadGateway,
            Self::LogoutFailed { .. } | Self::NoSubmissionId { .. } => StatusCode::BadGateway,
            Self::NotLoggedIn => StatusCode::Unauthorized,
            Self::Read { .. } | Self::Config { .. } => StatusCode::InternalServerError,
            _ => StatusCode::BadRequest,
        }
    }

    /// Convert from a generic transport error.
    ///
    /// If `source` carries an [Error] (as produced by the middleware in [crate::client]), it is
    /// simply downcast. Otherwise it becomes [Error::Transport], keeping its status and message.
    pub fn from_client_error(source: surf::Error) -> Self {
        match source.downcast::<Self>() {
            Ok(err) => err,
            Err(err) => Self::Transport {
                status: err.status(),
                message: err.to_string(),
            },
        }
    }
}

/// Context for embedding network client errors into [Error].
///
/// This type implements the [IntoError] trait from SNAFU, so it can be used with
/// [ResultExt::context](snafu::ResultExt::context) just like automatically generated SNAFU
/// contexts: `some_result.context(ClientError)` converts a [surf::Error] using
/// [Error::from_client_error].
pub struct ClientError;

impl IntoError<Error> for ClientError {
    type Source = surf::Error;

    fn into_error(self, source: Self::Source) -> Error {
        Error::from_client_error(source)
    }
}

/// Lift an [Error] into a [surf::Error], for errors raised inside client middleware.
///
/// This is the inverse of [ClientError].
pub fn client_error(error: impl Into<Error>) -> surf::Error {
    let error = error.into();
    surf::Error::new(error.status(), error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snafu::ResultExt;

    #[test]
    fn client_errors_round_trip_through_surf() {
        let lifted = client_error(Error::Api {
            code: 2,
            message: "Invalid Session ID".into(),
        });
        assert_eq!(lifted.status(), StatusCode::BadGateway);

        let res: Result<(), surf::Error> = Err(lifted);
        match res.context(ClientError) {
            Err(Error::Api { code, message }) => {
                assert_eq!(code, 2);
                assert_eq!(message, "Invalid Session ID");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn foreign_errors_become_transport_errors() {
        let foreign = surf::Error::from_str(StatusCode::NotFound, "no such endpoint");
        let err = Error::from_client_error(foreign);
        assert!(matches!(
            err,
            Error::Transport { status: StatusCode::NotFound, ref message } if message == "no such endpoint"
        ));
        assert_eq!(err.status(), StatusCode::NotFound);
    }
}
