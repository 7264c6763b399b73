// sls-scan - CLI for the Studio Security Scanner API
// Copyright (C) 2024 The sls-scan authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::model::{AjaxResult, CODE_OK, Envelope};
use anyhow::{Context, Result};
use reqwest::blocking::multipart::Form;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue, SET_COOKIE};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{fs::File, path::Path};
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{method} {path} failed: {source}")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {path} response status: {status}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
    },
    /// `code` is 0 when the body is not an envelope at all.
    #[error("{msg}")]
    Application { code: i64, msg: String },
}

impl ApiError {
    pub fn application(code: i64, msg: &str) -> Self {
        let msg = if msg.trim().is_empty() {
            format!("request failed with code {code}")
        } else {
            msg.to_string()
        };
        ApiError::Application { code, msg }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseData {
    pub body: String,
}

impl ResponseData {
    /// Decodes the body as envelope `E`, rejecting any `code` other than 200.
    pub fn envelope<E>(&self) -> Result<E, ApiError>
    where
        E: Envelope + DeserializeOwned,
    {
        let decoded: E =
            serde_json::from_str(&self.body).map_err(|err| ApiError::Application {
                code: 0,
                msg: format!("decoding response body: {err}"),
            })?;
        if decoded.code() != CODE_OK {
            return Err(ApiError::application(decoded.code(), decoded.msg()));
        }
        Ok(decoded)
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
    cookie: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends in '/'.
        let with_slash = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let parsed = Url::parse(&with_slash).context("parsing base URL")?;
        let http = Client::builder()
            .user_agent(HeaderValue::from_static(USER_AGENT))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            base_url: parsed,
            http,
            cookie: None,
        })
    }

    pub fn set_cookie(&mut self, cookie: String) {
        self.cookie = Some(cookie);
    }

    /// Exchanges an API token for a session cookie.
    pub fn verify_token(&self, token: &str) -> Result<String> {
        let path = "apikey/verify";
        let response = self.send(Method::GET, path, |r| r.query(&[("apiKey", token)]))?;
        let cookie = session_cookie(response.headers());
        let data = read_body(response)?;
        data.envelope::<AjaxResult>()?;
        Ok(cookie)
    }

    pub fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ResponseData> {
        self.request(Method::GET, path, query, Option::<&Value>::None)
    }

    pub fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: Option<&T>,
    ) -> Result<ResponseData> {
        self.request(Method::POST, path, query, body)
    }

    pub fn put_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ResponseData> {
        self.request(Method::PUT, path, &[], Some(body))
    }

    pub fn delete(&self, path: &str) -> Result<ResponseData> {
        self.request(Method::DELETE, path, &[], Option::<&Value>::None)
    }

    /// Sends `file` as the multipart form field `field`.
    pub fn upload_file(
        &self,
        path: &str,
        field: &'static str,
        file: &Path,
    ) -> Result<ResponseData> {
        let form = Form::new()
            .file(field, file)
            .with_context(|| format!("reading {:?}", file))?;
        let response = self.send(Method::POST, path, |r| r.multipart(form))?;
        read_body(response)
    }

    /// Posts `body` and streams the response into `dest`, returning the
    /// number of bytes written.
    pub fn download<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        dest: &Path,
    ) -> Result<u64> {
        let mut response = self.send(Method::POST, path, |r| r.json(body))?;
        let mut file = File::create(dest).with_context(|| format!("creating {:?}", dest))?;
        let size = response
            .copy_to(&mut file)
            .with_context(|| format!("writing {:?}", dest))?;
        debug!(path, bytes = size, dest = %dest.display(), "download finished");
        Ok(size)
    }

    fn request<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&T>,
    ) -> Result<ResponseData> {
        let response = self.send(method, path, |mut request| {
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            request
        })?;
        read_body(response)
    }

    fn send<F>(&self, method: Method, path: &str, customize: F) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let normalized = path.trim_start_matches('/');
        let url = self
            .base_url
            .join(normalized)
            .with_context(|| format!("joining path `{}` to base URL", path))?;

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie.as_str());
        }

        let response = customize(request)
            .send()
            .map_err(|source| ApiError::Transport {
                method: method.clone(),
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        debug!(%method, %url, %status, "request");
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                method,
                path: path.to_string(),
                status,
            }
            .into());
        }
        Ok(response)
    }
}

fn read_body(response: Response) -> Result<ResponseData> {
    let body = response.text().context("reading response body")?;
    Ok(ResponseData { body })
}

/// Joins the `name=value` part of every `Set-Cookie` header.
fn session_cookie(headers: &HeaderMap) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}
