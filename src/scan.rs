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

//! Waiting for the remote CVE scan of a project to settle.

use crate::client::ApiClient;
use crate::model::{ApiResult, ProjectCveScanStatus};
use anyhow::Result;
use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const PROGRESS_GLYPH: char = '█';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Waiting,
    Running,
    Exception,
    /// Any other status reported by the service, e.g. `Resolved`.
    Settled(String),
}

impl ScanState {
    pub fn is_active(&self) -> bool {
        matches!(self, ScanState::Waiting | ScanState::Running)
    }
}

impl From<&str> for ScanState {
    fn from(value: &str) -> Self {
        match value {
            "Waiting" => ScanState::Waiting,
            "Running" => ScanState::Running,
            "Exception" => ScanState::Exception,
            other => ScanState::Settled(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("The first scan of this project is failed, please try to rescan it again.")]
    Failed,
    #[error("CVE scan of project {project_id} still running after {waited:?}")]
    TimedOut { project_id: u64, waited: Duration },
}

pub trait ScanStatusSource {
    fn scan_status(&self, project_id: u64) -> Result<ProjectCveScanStatus>;
}

impl ScanStatusSource for ApiClient {
    fn scan_status(&self, project_id: u64) -> Result<ProjectCveScanStatus> {
        let response = self.get(&format!("/knowledgebase/getScanRate/CVE/{project_id}"), &[])?;
        Ok(response
            .envelope::<ApiResult<ProjectCveScanStatus>>()?
            .data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// Block-character bar tracking the highest rate seen so far.
#[derive(Debug, Default)]
pub struct ProgressBar {
    drawn: u32,
}

impl ProgressBar {
    /// Draws glyphs up to `rate` percent; never shrinks and never exceeds 100.
    pub fn advance_to(&mut self, rate: i64, out: &mut dyn Write) -> io::Result<u32> {
        let target = rate.clamp(0, 100) as u32;
        if target <= self.drawn {
            return Ok(0);
        }
        let step = target - self.drawn;
        let glyphs: String = std::iter::repeat_n(PROGRESS_GLYPH, step as usize).collect();
        out.write_all(glyphs.as_bytes())?;
        out.flush()?;
        self.drawn = target;
        Ok(step)
    }
}

/// Polls the scan status of `project_id` until it leaves `Waiting`/`Running`.
///
/// Progress is drawn on `out` only while a scan is active; a project that is
/// already settled returns immediately without output. A scan ending in
/// `Exception` yields [`ScanError::Failed`].
pub fn wait_for_scan<S>(
    source: &S,
    project_id: u64,
    options: PollOptions,
    out: &mut dyn Write,
) -> Result<()>
where
    S: ScanStatusSource + ?Sized,
{
    let mut status = source.scan_status(project_id)?;
    let mut state = ScanState::from(status.cve_scan_status.as_str());
    debug!(project_id, ?state, rate = status.cve_scan_rate, "scan status");

    if !state.is_active() {
        return match state {
            ScanState::Exception => Err(ScanError::Failed.into()),
            _ => Ok(()),
        };
    }

    writeln!(out, "CVE scan in progress...")?;
    let started = Instant::now();
    let mut bar = ProgressBar::default();
    bar.advance_to(status.cve_scan_rate, out)?;

    while state.is_active() {
        if let Some(limit) = options.timeout
            && started.elapsed() >= limit
        {
            writeln!(out)?;
            return Err(ScanError::TimedOut {
                project_id,
                waited: started.elapsed(),
            }
            .into());
        }

        thread::sleep(options.interval);
        status = source.scan_status(project_id)?;
        state = ScanState::from(status.cve_scan_status.as_str());
        debug!(
            project_id,
            ?state,
            rate = status.cve_scan_rate,
            error_code = status.cve_scan_error_code,
            "scan status"
        );
        bar.advance_to(status.cve_scan_rate, out)?;
    }

    if state == ScanState::Exception {
        writeln!(out)?;
        return Err(ScanError::Failed.into());
    }

    bar.advance_to(100, out)?;
    writeln!(out)?;
    Ok(())
}
