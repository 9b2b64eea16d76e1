// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Sessions, ratings and member lookups.

use crate::client::Client;
use crate::error::{
    EmptyPasswordSnafu, EmptyUsernameSnafu, Error, LogoutFailedSnafu, NotLoggedInSnafu,
    UnexpectedSidSnafu,
};
use crate::ratings::{self, Ratings};
use crate::scalar::{IntString, YesNo};
use crate::types::{Autocomplete, KeywordAutocomplete, LogoutResponse, UsernameId};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use tracing::{event, Level};

pub const GUEST: &str = "guest";

/// A logged in session.
#[derive(Clone, Debug)]
pub struct User {
    pub sid: String,
    pub username: String,
    pub user_id: IntString,
    /// Ratings allowed for this session.
    pub ratings: Ratings,
    client: Client,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    // Always sent, even when empty, as guests log in with a blank password.
    password: Option<&'a str>,
}

/// The session part of a login or ratings response.
#[derive(Debug, Deserialize)]
struct Session {
    sid: String,
    #[serde(default)]
    user_id: IntString,
    #[serde(rename = "ratingsmask", with = "ratings::mask", default)]
    ratings: Ratings,
}

#[derive(Serialize)]
struct SessionOnly<'a> {
    sid: &'a str,
}

#[derive(Serialize)]
struct RatingsRequest<'a> {
    sid: &'a str,
    #[serde(flatten)]
    ratings: Ratings,
}

#[derive(Serialize)]
struct KeywordRequest<'a> {
    keyword: &'a str,
    #[serde(rename = "ratingsmask", with = "ratings::mask")]
    ratings: Ratings,
    #[serde(rename = "underscorespaces", skip_serializing_if = "YesNo::is_no")]
    underscore_spaces: YesNo,
}

#[derive(Deserialize)]
struct Results<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct Watches {
    #[serde(default)]
    watches: Vec<UsernameId>,
}

impl Client {
    /// Log in as `username`, or as a guest when `username` is `"guest"`.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, Error> {
        ensure!(!username.is_empty(), EmptyUsernameSnafu);
        ensure!(username == GUEST || !password.is_empty(), EmptyPasswordSnafu);

        let session: Session = self
            .post_decode(
                "login",
                &Credentials {
                    username,
                    password: Some(password),
                },
            )
            .await?;
        ensure!(!session.sid.is_empty(), UnexpectedSidSnafu);
        event!(Level::INFO, "logged in as {}", username);

        Ok(User {
            sid: session.sid,
            username: username.to_string(),
            user_id: session.user_id,
            ratings: session.ratings,
            client: self.clone(),
        })
    }

    pub async fn guest(&self) -> Result<User, Error> {
        self.login(GUEST, "").await
    }

    /// Members whose username starts with `username`.
    pub async fn search_members(&self, username: &str) -> Result<Vec<Autocomplete>, Error> {
        #[derive(Serialize)]
        struct Request<'a> {
            username: &'a str,
        }

        let response: Results<Autocomplete> = self
            .post_decode("username_autosuggest", &Request { username })
            .await?;
        Ok(response.results)
    }

    /// Keywords starting with the last word(s) of `keyword`.
    ///
    /// Suggestions are filtered by `ratings`; with no rating allowed the server falls back to
    /// General only. With `underscore_spaces`, words joined by underscores are treated as a
    /// single keyword.
    pub async fn keyword_suggestion(
        &self,
        keyword: &str,
        ratings: &Ratings,
        underscore_spaces: bool,
    ) -> Result<Vec<KeywordAutocomplete>, Error> {
        let request = KeywordRequest {
            keyword,
            ratings: *ratings,
            underscore_spaces: underscore_spaces.into(),
        };
        let response: Results<KeywordAutocomplete> =
            self.post_decode("search_autosuggest", &request).await?;
        Ok(response.results)
    }
}

impl User {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn is_guest(&self) -> bool {
        self.username == GUEST
    }

    pub(crate) fn require_sid(&self) -> Result<&str, Error> {
        ensure!(!self.sid.is_empty(), NotLoggedInSnafu);
        Ok(&self.sid)
    }

    pub async fn logout(&self) -> Result<(), Error> {
        let sid = self.require_sid()?;
        let response: LogoutResponse = self
            .client
            .post_decode("logout", &SessionOnly { sid })
            .await?;
        ensure!(
            response.logout == "success",
            LogoutFailedSnafu {
                response: response.logout
            }
        );
        event!(Level::INFO, "logged out {}", self.username);
        Ok(())
    }

    /// Change the ratings allowed for this session.
    ///
    /// For registered members this affects the current session only. Every tag left as `None`
    /// is switched off by the server, including "mild violence" which new sessions start with.
    pub async fn change_ratings(&mut self, ratings: Ratings) -> Result<(), Error> {
        let sid = self.require_sid()?;
        let session: Session = self
            .client
            .post_decode("userrating", &RatingsRequest { sid, ratings })
            .await?;
        ensure!(session.sid == self.sid, UnexpectedSidSnafu);
        self.ratings = ratings;
        Ok(())
    }

    /// Members this user watches.
    pub async fn watchlist(&self) -> Result<Vec<UsernameId>, Error> {
        let sid = self.require_sid()?;
        let response: Watches = self
            .client
            .post_decode("watchlist", &SessionOnly { sid })
            .await?;
        Ok(response.watches)
    }
}
