// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::error::{client_error, ClientError, ConfigSnafu, Error, FormSnafu};
use crate::form::{to_form_values, FormValues};
use crate::multipart::MultipartForm;
use crate::response::decode_response;
use futures::future::BoxFuture;
use futures::prelude::*;
use itertools::Itertools;
use serde::{de::DeserializeOwned, Serialize};
use snafu::ResultExt;
use std::convert::TryFrom;
use std::time::Duration;
use surf::http::{headers::CONTENT_TYPE, mime};
use surf::{middleware::Next, Body, HttpClient, Request, RequestBuilder, Response, StatusCode};
use tracing::{event, Level};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://inkbunny.net/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Connection settings for a [Client].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Root of the site; endpoints are resolved relative to it.
    pub base_url: String,
    /// Timeout for a whole request, including reading the response. `None` disables it.
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

/// An HTTP client for the API.
///
/// Every request is a `POST` whose body is built from a request struct by the generic encoder in
/// [crate::form]. Responses are decoded with [decode_response]. Cloning is cheap; clones share
/// the underlying connection pool.
#[derive(Clone, Debug)]
pub struct Client {
    inner: surf::Client,
    base_url: Url,
}

impl Client {
    /// A client for the public site with the default [Config].
    pub fn new() -> Result<Self, Error> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self, Error> {
        Self::build(surf::Config::new(), config)
    }

    /// A client which sends its requests through `http_client` instead of the network.
    pub fn with_http_client(http_client: impl HttpClient, config: Config) -> Result<Self, Error> {
        Self::build(surf::Config::new().set_http_client(http_client), config)
    }

    fn build(surf_config: surf::Config, config: Config) -> Result<Self, Error> {
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            ConfigSnafu {
                message: format!("invalid base URL {:?}: {}", config.base_url, err),
            }
            .build()
        })?;
        let inner = surf::Client::try_from(surf_config.set_timeout(config.timeout)).map_err(|err| {
            ConfigSnafu {
                message: err.to_string(),
            }
            .build()
        })?;
        Ok(Self {
            inner: inner.with(trace).with(parse_error_status),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The URL of an API endpoint: `login` is served at `api_login.php`.
    pub fn api_url(&self, endpoint: &str) -> Result<Url, Error> {
        self.base_url
            .join(&format!("api_{}.php", endpoint))
            .map_err(|err| {
                ConfigSnafu {
                    message: format!("invalid endpoint {:?}: {}", endpoint, err),
                }
                .build()
            })
    }

    /// Send `values` URL-encoded and return the raw response body.
    pub async fn post_form(&self, endpoint: &str, values: &FormValues) -> Result<Vec<u8>, Error> {
        event!(
            Level::DEBUG,
            "encoded request for {}: fields [{}]",
            endpoint,
            field_names(values)
        );
        let req = self
            .inner
            .post(self.api_url(endpoint)?)
            .body(Body::from_string(values.encode()))
            .content_type(mime::FORM);
        self.send(req).await
    }

    /// Send a `multipart/form-data` body and return the raw response body.
    pub async fn post_multipart(
        &self,
        endpoint: &str,
        form: MultipartForm,
    ) -> Result<Vec<u8>, Error> {
        let content_type = form.content_type();
        let body = form.finish();
        event!(
            Level::DEBUG,
            "encoded multipart request for {}: {} bytes",
            endpoint,
            body.len()
        );
        let req = self
            .inner
            .post(self.api_url(endpoint)?)
            .body(Body::from_bytes(body))
            .header(CONTENT_TYPE, content_type);
        self.send(req).await
    }

    /// Flatten `body`, send it to `endpoint` and decode the response as `T`.
    pub async fn post_decode<T, B>(&self, endpoint: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: ?Sized + Serialize,
    {
        let values = to_form_values(body).context(FormSnafu)?;
        let bytes = self.post_form(endpoint, &values).await?;
        decode_response(&bytes)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Vec<u8>, Error> {
        let mut res = req.await.context(ClientError)?;
        res.body_bytes().await.context(ClientError)
    }
}

// Only names are logged: values carry passwords and session IDs.
fn field_names(values: &FormValues) -> String {
    values.iter().map(|(name, _)| name).join(", ")
}

pub async fn response_to_result(mut res: Response) -> surf::Result<Response> {
    if res.status() == StatusCode::Ok {
        Ok(res)
    } else {
        let status = res.status();
        let body = res.body_string().await.unwrap_or_default();
        let message = if body.is_empty() {
            format!("unexpected status code {}", status)
        } else {
            format!("unexpected status code {}: {}", status, body)
        };
        Err(client_error(Error::Transport { status, message }))
    }
}

/// Client middleware which turns responses with non-success statuses into errors.
///
/// If the status code of the response is Ok (200), the response is passed through unchanged.
/// Otherwise the response becomes an [Error::Transport] lifted into a [surf::Error], which
/// [ClientError] recovers on the way out of [Client].
///
/// If the request fails without producing a response at all, the [surf::Error] from the failed
/// request is passed through.
pub fn parse_error_status(
    req: Request,
    client: surf::Client,
    next: Next<'_>,
) -> BoxFuture<surf::Result<Response>> {
    Box::pin(
        next.run(req, client)
            .and_then(|res| async { response_to_result(res).await }),
    )
}

/// Client middleware which logs every request and its outcome.
pub fn trace(
    req: Request,
    client: surf::Client,
    next: Next<'_>,
) -> BoxFuture<surf::Result<Response>> {
    let method = req.method();
    let url = req.url().clone();
    event!(
        Level::INFO,
        "--> sending request {{method: {}, url: {}, content-type: {:?}}}",
        method,
        url,
        req.content_type()
    );
    Box::pin(async move {
        let res = next.run(req, client).await;
        match &res {
            Ok(res) => event!(
                Level::INFO,
                "<-- received response {{url: {}, status: {}}}",
                url,
                res.status()
            ),
            Err(err) => event!(
                Level::WARN,
                "<-- request failed {{url: {}, error: {}}}",
                url,
                err
            ),
        }
        res
    })
}
