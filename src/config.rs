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

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_BASE_URL: &str = "https://studio.windriver.com/scan/api";
pub const LOCAL_CONFIG_FILE: &str = "sls-scan.yaml";
pub const CONFIG_DIR_ENV: &str = "SLS_SCAN_CONFIG_DIR";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "UserSection::is_empty")]
    pub user: UserSection,
    #[serde(skip_serializing_if = "ResultSection::is_empty")]
    pub result: ResultSection,
    #[serde(skip_serializing_if = "ServerSection::is_empty")]
    pub server: ServerSection,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UserSection {
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ResultSection {
    pub output: OutputSection,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct OutputSection {
    pub format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSection {
    pub url: Option<String>,
}

impl UserSection {
    fn is_empty(&self) -> bool {
        self.token.is_none()
    }
}

impl ResultSection {
    fn is_empty(&self) -> bool {
        self.output.format.is_none()
    }
}

impl ServerSection {
    fn is_empty(&self) -> bool {
        self.url.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a writable config directory for the current user")]
    MissingConfigDir,
    #[error(
        "Paramter outputFormat error, outputFormat value is OnlyTable, onlyJson or All (found `{0}`)."
    )]
    InvalidOutputFormat(String),
}

#[derive(Debug)]
pub struct EffectiveConfig {
    pub token: Option<String>,
    pub output_format: OutputFormat,
    pub base_url: String,
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(LOCAL_CONFIG_FILE)),
        Scope::User => {
            if let Ok(custom) = env::var(CONFIG_DIR_ENV) {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("sls-scan").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn load_scope(scope: Scope, cwd: &Path) -> Result<Config> {
    Ok(read_if_exists(&config_path(scope, cwd)?)?.unwrap_or_default())
}

pub fn save(scope: Scope, config: &Config, cwd: &Path) -> Result<PathBuf> {
    let path = config_path(scope, cwd)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
    info!(path = %path.display(), "saved configuration");
    Ok(path)
}

/// The scope writes go to when the user did not choose one: the local file
/// if it already exists, otherwise the user file.
pub fn preferred_scope(cwd: &Path) -> Result<Scope> {
    if config_path(Scope::Local, cwd)?.exists() {
        Ok(Scope::Local)
    } else {
        Ok(Scope::User)
    }
}

pub fn update<F>(scope: Scope, cwd: &Path, change: F) -> Result<PathBuf>
where
    F: FnOnce(&mut Config),
{
    let mut existing = load_scope(scope, cwd)?;
    change(&mut existing);
    save(scope, &existing, cwd)
}

/// Stores a verified token (or clears it with `None`) together with the
/// output format in effect.
pub fn store_token(
    scope: Scope,
    cwd: &Path,
    token: Option<&str>,
    format: OutputFormat,
) -> Result<PathBuf> {
    update(scope, cwd, |config| {
        config.user.token = token.map(str::to_string);
        config.result.output.format = Some(format.to_string());
    })
}

pub fn store_output_format(cwd: &Path, format: OutputFormat) -> Result<PathBuf> {
    let scope = preferred_scope(cwd)?;
    update(scope, cwd, |config| {
        config.result.output.format = Some(format.to_string());
    })
}

/// Merges both scopes with the command-line overrides. A stored output
/// format is only parsed when no override replaces it.
pub fn resolve(
    cwd: &Path,
    base_url_override: Option<String>,
    format_override: Option<OutputFormat>,
) -> Result<EffectiveConfig> {
    let mut merged = load(cwd)?;

    if let Some(url) = base_url_override {
        merged.server.url = Some(url);
    }

    let output_format = match (format_override, merged.result.output.format.as_deref()) {
        (Some(format), _) => format,
        (None, Some(raw)) if !raw.trim().is_empty() => raw
            .parse::<OutputFormat>()
            .map_err(|_| ConfigError::InvalidOutputFormat(raw.to_string()))?,
        _ => OutputFormat::default(),
    };

    let token = merged
        .user
        .token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let base_url = merged
        .server
        .url
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    Ok(EffectiveConfig {
        token,
        output_format,
        base_url,
    })
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    if contents.trim().is_empty() {
        return Ok(Some(Config::default()));
    }
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

fn merge(user: Config, local: Config) -> Config {
    Config {
        user: UserSection {
            token: local.user.token.or(user.user.token),
        },
        result: ResultSection {
            output: OutputSection {
                format: local.result.output.format.or(user.result.output.format),
            },
        },
        server: ServerSection {
            url: local.server.url.or(user.server.url),
        },
    }
}
