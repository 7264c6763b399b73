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

//! Subcommand handlers. Each one issues its requests through [`Ctx`] and
//! renders the decoded response.

pub mod cve;
pub mod group;
pub mod package;
pub mod project;
pub mod user;

use crate::client::{ApiClient, ApiError, ResponseData};
use crate::model::{AjaxResult, ApiResult, InfoProject};
use crate::output::OutputFormat;
use crate::scan::{self, PollOptions};
use anyhow::{Result, anyhow};
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub struct Ctx<'a> {
    pub client: &'a ApiClient,
    pub format: OutputFormat,
    pub poll: PollOptions,
    /// Command output.
    pub out: &'a mut dyn Write,
    /// Progress bars and retry notices.
    pub err: &'a mut dyn Write,
}

impl Ctx<'_> {
    pub fn tables(&self) -> bool {
        self.format.shows_table()
    }

    /// Writes the raw response body when JSON output is enabled.
    pub fn echo(&mut self, response: &ResponseData) -> Result<()> {
        if self.format.shows_json() {
            writeln!(self.out, "{}", response.body)?;
        }
        Ok(())
    }

    /// Progress chatter: printed next to tables, logged in pure JSON mode.
    pub fn notice(&mut self, message: impl Display) -> Result<()> {
        if self.tables() {
            writeln!(self.out, "{message}")?;
        } else {
            info!("{message}");
        }
        Ok(())
    }

    pub fn wait_for_scan(&mut self, project_id: u64) -> Result<()> {
        scan::wait_for_scan(self.client, project_id, self.poll, self.err)
    }

    pub fn fetch_project(&self, project_id: u64) -> Result<InfoProject> {
        let response = self
            .client
            .get(&format!("/project/project/{project_id}"), &[])?;
        Ok(response.envelope::<ApiResult<InfoProject>>()?.data)
    }

    /// Echoes a plain `{code, msg}` reply and prints its message. A failed
    /// reply becomes an error prefixed with `failure`.
    pub fn acknowledge(&mut self, response: &ResponseData, failure: &str) -> Result<()> {
        self.echo(response)?;
        match response.envelope::<AjaxResult>() {
            Ok(reply) => {
                if self.tables() {
                    writeln!(self.out, "{}", reply.msg)?;
                }
                Ok(())
            }
            Err(ApiError::Application { msg, .. }) => Err(anyhow!("{failure}{msg}")),
            Err(other) => Err(other.into()),
        }
    }

    /// Streams an export to `dest` and reports its size.
    pub fn export<T: Serialize + ?Sized>(
        &mut self,
        path: &str,
        body: &T,
        dest: &Path,
    ) -> Result<()> {
        let size = self.client.download(path, body, dest)?;
        self.notice(format_args!(
            "The out file is {}, file size is {} bytes.",
            dest.display(),
            size
        ))
    }
}

/// Splits a comma-separated list, dropping blanks.
pub fn split_names(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Captured stdout/stderr of a handler run.
    pub(crate) struct Captured {
        pub out: String,
        pub err: String,
    }

    pub(crate) fn run_with<F>(
        client: &ApiClient,
        format: OutputFormat,
        f: F,
    ) -> (Result<()>, Captured)
    where
        F: FnOnce(&mut Ctx<'_>) -> Result<()>,
    {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = {
            let mut ctx = Ctx {
                client,
                format,
                poll: PollOptions {
                    interval: Duration::ZERO,
                    timeout: None,
                },
                out: &mut out,
                err: &mut err,
            };
            f(&mut ctx)
        };
        let captured = Captured {
            out: String::from_utf8(out).unwrap(),
            err: String::from_utf8(err).unwrap(),
        };
        (result, captured)
    }

    /// Reports the scan of `project_id` as already finished.
    pub(crate) fn scan_settled(server: &MockServer, project_id: u64) {
        server.mock(|when, then| {
            when.method(GET)
                .path(format!("/knowledgebase/getScanRate/CVE/{project_id}"));
            then.status(200).json_body(json!({
                "code": 200,
                "msg": "ok",
                "data": {"cveScanStatus": "Resolved", "cveScanErrorCode": 0, "cveScanRate": 100}
            }));
        });
    }

    #[test]
    fn acknowledge_prefixes_failures() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/group/9");
            then.status(200)
                .json_body(json!({"code": 500, "msg": "group has projects"}));
        });
        let client = ApiClient::new(&server.base_url()).unwrap();

        let (result, captured) = run_with(&client, OutputFormat::All, |ctx| {
            let response = ctx.client.delete("/group/9")?;
            ctx.acknowledge(&response, "Delete group error:")
        });

        assert_eq!(
            result.unwrap_err().to_string(),
            "Delete group error:group has projects"
        );
        assert!(captured.out.contains("\"group has projects\""));
    }

    #[test]
    fn notices_are_silent_in_json_mode() {
        let server = MockServer::start();
        let client = ApiClient::new(&server.base_url()).unwrap();

        let (_, table) = run_with(&client, OutputFormat::OnlyTable, |ctx| ctx.notice("hello"));
        let (_, json) = run_with(&client, OutputFormat::OnlyJson, |ctx| ctx.notice("hello"));

        assert_eq!(table.out, "hello\n");
        assert_eq!(json.out, "");
    }

    #[test]
    fn export_reports_size_only_next_to_tables() {
        let dir = tempdir().unwrap();
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/cve/cve/export");
            then.status(200).body("xlsx!");
        });
        let client = ApiClient::new(&server.base_url()).unwrap();
        let dest = dir.path().join("x.xlsx");

        let (result, json) = run_with(&client, OutputFormat::OnlyJson, |ctx| {
            ctx.export("/cve/cve/export", &json!({"projectId": 3}), &dest)
        });
        result.unwrap();
        assert_eq!(json.out, "");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "xlsx!");

        let (result, table) = run_with(&client, OutputFormat::All, |ctx| {
            ctx.export("/cve/cve/export", &json!({"projectId": 3}), &dest)
        });
        result.unwrap();
        assert_eq!(
            table.out,
            format!("The out file is {}, file size is 5 bytes.\n", dest.display())
        );
    }

    #[test]
    fn split_names_drops_blanks() {
        assert_eq!(
            split_names(Some("openssl, zlib,,")),
            vec!["openssl".to_string(), "zlib".to_string()]
        );
        assert!(split_names(None).is_empty());
        assert!(split_names(Some("")).is_empty());
    }
}
