// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # A client for the Inkbunny API.
//!
//! Every API endpoint takes a `POST` of form fields and answers with JSON. Requests are plain Rust
//! structs deriving `Serialize`; the [form] module flattens them into ordered key/value pairs,
//! honoring `rename`, `skip`, `skip_serializing_if` and `flatten`, and distinguishing a field
//! which is left out (`None`) from one which is sent empty to clear it (`Some("")`).
//!
//! The API encodes most scalars as strings: booleans as `"yes"`/`"no"` (or `"t"`/`"f"`),
//! integers as quoted decimals and prices as `"$12.34"`. The types in [scalar] accept all of these
//! when decoding and produce the string form when sent back in a request. Responses go through
//! [response::decode_response], which also recognizes the API's error envelope.
//!
//! The [client::Client] sends requests through `surf`, with middleware which logs every request
//! and turns non-success statuses into [Error::Transport]. Endpoints are methods on
//! [client::Client] and on the [user::User] session returned by login.

pub mod client;
pub mod error;
pub mod form;
pub mod multipart;
pub mod ratings;
pub mod response;
pub mod scalar;
pub mod search;
pub mod submission;
pub mod types;
pub mod upload;
pub mod user;

pub use client::{Client, Config};
pub use error::*;
pub use form::{to_form_values, FormError, FormValues};
pub use ratings::Ratings;
pub use response::decode_response;
pub use scalar::{IntString, PriceString, YesNo};
pub use types::*;
pub use user::User;
