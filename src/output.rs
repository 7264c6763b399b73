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

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Rendered tables and messages only
    #[default]
    #[value(name = "ONLYTABLE")]
    #[serde(rename = "ONLYTABLE")]
    OnlyTable,
    /// Raw JSON response bodies only
    #[value(name = "ONLYJSON")]
    #[serde(rename = "ONLYJSON")]
    OnlyJson,
    /// Raw JSON followed by rendered tables
    #[value(name = "ALL", alias = "ONLYALL")]
    #[serde(rename = "ALL")]
    All,
}

impl OutputFormat {
    pub fn shows_json(self) -> bool {
        matches!(self, OutputFormat::OnlyJson | OutputFormat::All)
    }

    pub fn shows_table(self) -> bool {
        self != OutputFormat::OnlyJson
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::OnlyTable => "ONLYTABLE",
            OutputFormat::OnlyJson => "ONLYJSON",
            OutputFormat::All => "ALL",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <OutputFormat as ValueEnum>::from_str(s.trim(), true).map_err(|_| {
            format!("unknown output format `{s}`, expected ONLYTABLE, ONLYJSON or ALL")
        })
    }
}
