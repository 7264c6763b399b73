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

use crate::client::{ApiClient, ApiError};
use crate::config::{self, Scope};
use crate::output::OutputFormat;
use anyhow::Result;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

pub const MAX_TOKEN_ATTEMPTS: usize = 3;

const RUNTIME_EXCEPTION: &str = "An runtime exception has occurred";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("User token verification failed.")]
    VerificationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub cookie: String,
    pub token: String,
    /// The token differs from the stored one and should be persisted.
    pub changed: bool,
}

/// Where a verified token is written back to.
#[derive(Debug, Clone, Copy)]
pub struct TokenStore<'a> {
    pub cwd: &'a Path,
    pub scope: Scope,
    pub format: OutputFormat,
}

/// Verifies `initial`, falling back to `ask` for a new token, for at most
/// [`MAX_TOKEN_ATTEMPTS`] attempts.
///
/// Only rejections by the service count as attempts; transport failures and
/// server runtime exceptions abort immediately.
pub fn establish<F>(
    client: &ApiClient,
    initial: Option<String>,
    persist_initial: bool,
    mut ask: F,
    notice: &mut dyn Write,
) -> Result<Session>
where
    F: FnMut() -> Result<String>,
{
    let mut pending = initial.filter(|t| !t.trim().is_empty());
    let mut changed = persist_initial;

    for attempt in 1..=MAX_TOKEN_ATTEMPTS {
        let token = match pending.take() {
            Some(token) => token.trim().to_string(),
            None => {
                changed = true;
                ask()?
            }
        };

        match client.verify_token(&token) {
            Ok(cookie) => {
                return Ok(Session {
                    cookie,
                    token,
                    changed,
                });
            }
            Err(err) => {
                let rejected = match err.downcast_ref::<ApiError>() {
                    Some(ApiError::Application { msg, .. }) => !msg.contains(RUNTIME_EXCEPTION),
                    Some(ApiError::Status { .. }) => true,
                    _ => false,
                };
                if !rejected {
                    return Err(err);
                }
                warn!(attempt, "token rejected: {err}");
                if attempt < MAX_TOKEN_ATTEMPTS {
                    writeln!(notice, "The user token entered is incorrect.")?;
                }
            }
        }
    }

    Err(SessionError::VerificationFailed.into())
}

/// Establishes a session on `client` and keeps the token store in sync: a
/// newly entered token is saved, and exhausting the attempts clears it.
pub fn login<F>(
    client: &mut ApiClient,
    token: Option<String>,
    persist_initial: bool,
    store: TokenStore<'_>,
    ask: F,
    notice: &mut dyn Write,
) -> Result<Session>
where
    F: FnMut() -> Result<String>,
{
    match establish(client, token, persist_initial, ask, notice) {
        Ok(session) => {
            if session.changed {
                config::store_token(store.scope, store.cwd, Some(&session.token), store.format)?;
            }
            client.set_cookie(session.cookie.clone());
            Ok(session)
        }
        Err(err) => {
            if err.downcast_ref::<SessionError>().is_some() {
                config::store_token(store.scope, store.cwd, None, store.format)?;
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::env_lock;
    use crate::config::{CONFIG_DIR_ENV, load_scope};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::env;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn verify_mocks(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET)
                .path("/apikey/verify")
                .query_param("apiKey", "good");
            then.status(200)
                .header("Set-Cookie", "JSESSIONID=ok; Path=/")
                .json_body(json!({"code": 200, "msg": "success"}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/apikey/verify")
                .query_param("apiKey", "bad");
            then.status(200)
                .json_body(json!({"code": 500, "msg": "Invalid API key"}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/apikey/verify")
                .query_param("apiKey", "boom");
            then.status(200).json_body(
                json!({"code": 500, "msg": "An runtime exception has occurred, please retry"}),
            );
        });
    }

    fn answers(values: &[&str]) -> (impl FnMut() -> Result<String>, Rc<Cell<usize>>) {
        let asked = Rc::new(Cell::new(0));
        let counter = asked.clone();
        let mut queue: VecDeque<String> = values.iter().map(|v| v.to_string()).collect();
        let ask = move || -> Result<String> {
            counter.set(counter.get() + 1);
            Ok(queue.pop_front().unwrap_or_else(|| "bad".to_string()))
        };
        (ask, asked)
    }

    #[test]
    fn stored_token_is_used_without_prompting() {
        let server = MockServer::start();
        verify_mocks(&server);
        let client = ApiClient::new(&server.base_url()).unwrap();
        let (ask, asked) = answers(&[]);
        let mut notice = Vec::new();

        let session = establish(&client, Some("good".into()), false, ask, &mut notice).unwrap();

        assert_eq!(session.cookie, "JSESSIONID=ok");
        assert!(!session.changed);
        assert_eq!(asked.get(), 0);
        assert!(notice.is_empty());
    }

    #[test]
    fn rejected_token_falls_back_to_prompt() {
        let server = MockServer::start();
        verify_mocks(&server);
        let client = ApiClient::new(&server.base_url()).unwrap();
        let (ask, asked) = answers(&["good"]);
        let mut notice = Vec::new();

        let session = establish(&client, Some("bad".into()), false, ask, &mut notice).unwrap();

        assert_eq!(session.token, "good");
        assert!(session.changed);
        assert_eq!(asked.get(), 1);
        assert_eq!(
            String::from_utf8(notice).unwrap(),
            "The user token entered is incorrect.\n"
        );
    }

    #[test]
    fn gives_up_after_three_attempts() {
        let server = MockServer::start();
        verify_mocks(&server);
        let client = ApiClient::new(&server.base_url()).unwrap();
        let (ask, asked) = answers(&["bad", "bad", "bad"]);
        let mut notice = Vec::new();

        let err = establish(&client, None, false, ask, &mut notice).unwrap_err();

        assert_eq!(err.to_string(), "User token verification failed.");
        assert_eq!(asked.get(), MAX_TOKEN_ATTEMPTS);
    }

    #[test]
    fn stored_token_counts_as_first_attempt() {
        let server = MockServer::start();
        verify_mocks(&server);
        let client = ApiClient::new(&server.base_url()).unwrap();
        let (ask, asked) = answers(&["bad", "bad", "good"]);
        let mut notice = Vec::new();

        let err = establish(&client, Some("bad".into()), false, ask, &mut notice).unwrap_err();

        assert_eq!(err.to_string(), "User token verification failed.");
        assert_eq!(asked.get(), MAX_TOKEN_ATTEMPTS - 1);
        assert_eq!(
            String::from_utf8(notice).unwrap(),
            "The user token entered is incorrect.\n".repeat(2)
        );
    }

    #[test]
    fn runtime_exception_aborts_immediately() {
        let server = MockServer::start();
        verify_mocks(&server);
        let client = ApiClient::new(&server.base_url()).unwrap();
        let (ask, asked) = answers(&["good"]);
        let mut notice = Vec::new();

        let err = establish(&client, Some("boom".into()), false, ask, &mut notice).unwrap_err();

        assert!(err.to_string().contains(RUNTIME_EXCEPTION));
        assert_eq!(asked.get(), 0);
    }

    #[test]
    fn login_persists_new_token_and_clears_after_failure() {
        let _guard = env_lock();
        let dir = tempdir().unwrap();
        unsafe {
            env::set_var(CONFIG_DIR_ENV, dir.path().join("config"));
        }
        let server = MockServer::start();
        verify_mocks(&server);
        let store = TokenStore {
            cwd: dir.path(),
            scope: Scope::User,
            format: OutputFormat::All,
        };
        let mut notice = Vec::new();

        let mut client = ApiClient::new(&server.base_url()).unwrap();
        let (ask, _) = answers(&["good"]);
        login(&mut client, None, false, store, ask, &mut notice).unwrap();
        let stored = load_scope(Scope::User, dir.path()).unwrap();
        assert_eq!(stored.user.token.as_deref(), Some("good"));
        assert_eq!(stored.result.output.format.as_deref(), Some("ALL"));

        let mut client = ApiClient::new(&server.base_url()).unwrap();
        let (ask, _) = answers(&["bad", "bad"]);
        assert!(login(&mut client, Some("bad".into()), false, store, ask, &mut notice).is_err());
        let stored = load_scope(Scope::User, dir.path()).unwrap();
        assert_eq!(stored.user.token, None);
    }
}
