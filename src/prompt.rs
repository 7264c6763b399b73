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

//! Interactive fallbacks for parameters missing from the command line.

use anyhow::{Context, Result};
use inquire::{Text, validator::Validation};
use std::path::{Path, PathBuf};

fn ask(message: &str) -> Result<String> {
    let answer = Text::new(message)
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Ok(Validation::Invalid("A value is required.".into()))
            } else {
                Ok(Validation::Valid)
            }
        })
        .prompt()
        .with_context(|| format!("reading answer to `{message}`"))?;
    Ok(answer.trim().to_string())
}

pub fn token() -> Result<String> {
    ask("Please enter your token:")
}

/// Returns the trimmed `value`, asking with `message` while it is empty.
pub fn text(value: Option<String>, message: &str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => ask(message),
    }
}

pub fn project_id(value: Option<u64>) -> Result<u64> {
    if let Some(id) = value.filter(|id| *id > 0) {
        return Ok(id);
    }
    let answer = Text::new("Please enter project ID:")
        .with_validator(|input: &str| match input.trim().parse::<u64>() {
            Ok(id) if id > 0 => Ok(Validation::Valid),
            _ => Ok(Validation::Invalid("Project ID must be a positive number.".into())),
        })
        .prompt()
        .context("reading project ID")?;
    answer.trim().parse().context("parsing project ID")
}

pub fn group_id(value: Option<i64>) -> Result<i64> {
    if let Some(id) = value.filter(|id| *id >= 0) {
        return Ok(id);
    }
    let answer = Text::new("Please enter group ID:")
        .with_validator(|input: &str| match input.trim().parse::<i64>() {
            Ok(id) if id >= 0 => Ok(Validation::Valid),
            _ => Ok(Validation::Invalid("Group ID must be zero or a positive number.".into())),
        })
        .prompt()
        .context("reading group ID")?;
    answer.trim().parse().context("parsing group ID")
}

/// Returns a path to an existing file, asking again while it does not exist.
pub fn existing_file(value: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = value.filter(|p| p.is_file()) {
        return Ok(path);
    }
    let answer = Text::new("Please enter SBOM file path:")
        .with_validator(|input: &str| {
            if Path::new(input.trim()).is_file() {
                Ok(Validation::Valid)
            } else {
                Ok(Validation::Invalid(
                    format!("{} is invalid file.", input.trim()).into(),
                ))
            }
        })
        .prompt()
        .context("reading SBOM file path")?;
    Ok(PathBuf::from(answer.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn provided_values_skip_the_prompt() {
        assert_eq!(text(Some("  demo ".into()), "name").unwrap(), "demo");
        assert_eq!(project_id(Some(12)).unwrap(), 12);
        assert_eq!(group_id(Some(0)).unwrap(), 0);

        let dir = tempdir().unwrap();
        let file = dir.path().join("sbom.json");
        std::fs::write(&file, "{}").unwrap();
        assert_eq!(existing_file(Some(file.clone())).unwrap(), file);
    }
}
