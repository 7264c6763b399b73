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

mod cli;
mod client;
mod commands;
mod config;
mod model;
mod output;
mod prompt;
mod scan;
mod session;
mod table;

use crate::cli::{
    Cli, Commands, CompletionShell, CveCommand, GroupCommand, PackageCommand, ProjectCommand,
    UserCommand,
};
use crate::client::ApiClient;
use crate::commands::Ctx;
use crate::scan::{POLL_INTERVAL, PollOptions};
use crate::session::TokenStore;
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::io;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
    let cwd = std::env::current_dir().context("reading current directory")?;

    match cli.command {
        Commands::Version => {
            println!("sls-scan {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::ConfigShow => {
            let mut masked = config::load(&cwd)?;
            if masked.user.token.is_some() {
                masked.user.token = Some("*****".into());
            }
            println!("{}", serde_json::to_string_pretty(&masked)?);
            return Ok(());
        }
        Commands::Completion { shell } => {
            use clap_complete::{generate, shells};
            let mut cmd = Cli::command();
            let bin = cmd.get_name().to_string();
            match shell {
                CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin, &mut io::stdout()),
                CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin, &mut io::stdout()),
                CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin, &mut io::stdout()),
                CompletionShell::PowerShell => {
                    generate(shells::PowerShell, &mut cmd, bin, &mut io::stdout())
                }
            }
            return Ok(());
        }
        _ => {}
    }

    let settings = config::resolve(&cwd, cli.base_url.clone(), cli.output_format)?;
    if let Some(format) = cli.output_format {
        config::store_output_format(&cwd, format)?;
    }
    debug!(base_url = %settings.base_url, format = %settings.output_format, "resolved settings");

    let mut client = ApiClient::new(&settings.base_url)?;

    // `user set` verifies the token it was given (or asks for one) and always
    // stores it; everything else starts from the configured token.
    let (token, persist, scope) = match &cli.command {
        Commands::User { action: None } => (None, true, config::preferred_scope(&cwd)?),
        Commands::User {
            action: Some(UserCommand::Set { user_token, scope }),
        } => (
            user_token.clone(),
            true,
            match scope {
                Some(scope) => (*scope).into(),
                None => config::preferred_scope(&cwd)?,
            },
        ),
        _ => (
            settings.token.clone(),
            false,
            config::preferred_scope(&cwd)?,
        ),
    };

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();

    session::login(
        &mut client,
        token,
        persist,
        TokenStore {
            cwd: &cwd,
            scope,
            format: settings.output_format,
        },
        prompt::token,
        &mut err,
    )?;

    let mut ctx = Ctx {
        client: &client,
        format: settings.output_format,
        poll: PollOptions {
            interval: POLL_INTERVAL,
            timeout: cli.wait_timeout.map(Duration::from_secs),
        },
        out: &mut out,
        err: &mut err,
    };

    let result = match cli.command {
        Commands::Project { action } => commands::project::run(
            action.unwrap_or(ProjectCommand::List(Default::default())),
            &mut ctx,
        ),
        Commands::Package { action } => commands::package::run(
            action.unwrap_or(PackageCommand::Query(Default::default())),
            &mut ctx,
        ),
        Commands::Cve { action } => commands::cve::run(
            action.unwrap_or(CveCommand::Query(Default::default())),
            &mut ctx,
        ),
        Commands::Group { action } => commands::group::run(
            action.unwrap_or(GroupCommand::List(Default::default())),
            &mut ctx,
        ),
        Commands::User { action } => commands::user::run(action, &mut ctx),
        Commands::Version | Commands::ConfigShow | Commands::Completion { .. } => Ok(()),
    };
    ctx.out.flush()?;
    result
}
