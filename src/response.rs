// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::error::{DecodeSnafu, Error};
use crate::scalar::IntString;
use serde::{de::DeserializeOwned, Deserialize};
use snafu::{IntoError, ResultExt};
use tracing::{event, Level};

/// The body the API sends instead of the expected object when a call fails.
#[derive(Clone, Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error_code: Option<IntString>,
    #[serde(default)]
    error_message: String,
}

/// Decode a response body into `T`.
///
/// The API reports failures with status 200 and an `error_code`/`error_message` object, so the
/// body is first checked for that envelope, which becomes [Error::Api]. Any field that fails to
/// decode fails the whole response; the error names the offending field by its path, and
/// carries the line and column of the offending value.
pub fn decode_response<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    // Bodies which are not objects (or not JSON at all) are reported by the decode of `T` below.
    if let Ok(ErrorEnvelope {
        error_code: Some(code),
        error_message,
    }) = serde_json::from_slice::<ErrorEnvelope>(body)
    {
        event!(Level::WARN, "API error {}: {}", code, error_message);
        return Err(Error::Api {
            code: code.get(),
            message: error_message,
        });
    }
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    let value = serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        DecodeSnafu { path }.into_error(err.into_inner())
    })?;
    // Trailing data after the value.
    deserializer.end().context(DecodeSnafu { path: "." })?;
    Ok(value)
}
