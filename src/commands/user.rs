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

use super::Ctx;
use crate::cli::UserCommand;
use crate::model::{ApiResult, InfoSysUser};
use crate::table::field;
use anyhow::Result;

/// Both actions end by showing the account; `set` has already verified and
/// stored its token by the time this runs.
pub fn run(command: Option<UserCommand>, ctx: &mut Ctx<'_>) -> Result<()> {
    match command {
        None | Some(UserCommand::Set { .. }) | Some(UserCommand::Get) => get(ctx),
    }
}

pub fn get(ctx: &mut Ctx<'_>) -> Result<()> {
    let response = ctx.client.get("/system/user/userInfo", &[])?;
    ctx.echo(&response)?;
    let user = response.envelope::<ApiResult<InfoSysUser>>()?.data;
    if !ctx.tables() {
        return Ok(());
    }

    if user == InfoSysUser::default() {
        writeln!(ctx.out, "Get user info is null.")?;
        return Ok(());
    }
    writeln!(ctx.out, "The login user information is as follows:")?;
    for (key, value) in [
        ("User Name", &user.user_name),
        ("Nick Name", &user.nick_name),
        ("EMail", &user.email),
    ] {
        writeln!(ctx.out, "{}", field(key, 10, value, 80).trim_end())?;
    }
    Ok(())
}
