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

use super::{Ctx, project};
use crate::cli::{GroupCommand, GroupCreateArgs, GroupListArgs, GroupUpdateArgs};
use crate::model::{
    ApiResult, GroupParam, GroupQuery, InfoGroup, InfoGroupUser, InfoProject, TableData,
};
use crate::prompt;
use crate::table::{Column, Table, col, field, format_date_time};
use anyhow::Result;
use std::io::{self, Write};

pub const GROUP_COLUMNS: [Column; 4] = [
    col("GROUP ID", 11),
    col("GROUP NAME", 47),
    col("ROLE", 17),
    col("TOTAL PROJECTS", 19),
];

pub const MEMBER_COLUMNS: [Column; 3] = [
    col("NICK NAME", 35),
    col("EMAIL", 47),
    col("MAX ROLE", 18),
];

pub fn run(command: GroupCommand, ctx: &mut Ctx<'_>) -> Result<()> {
    match command {
        GroupCommand::List(args) => list(ctx, args),
        GroupCommand::Detail(args) => detail(ctx, prompt::group_id(args.group_id)?),
        GroupCommand::Create(args) => create(ctx, args),
        GroupCommand::Update(args) => update(ctx, args),
        GroupCommand::Delete(args) => delete(ctx, prompt::group_id(args.group_id)?),
        GroupCommand::Members(args) => members(ctx, prompt::group_id(args.group_id)?),
        GroupCommand::Projects(args) => projects(ctx, prompt::group_id(args.group_id)?),
    }
}

pub fn list(ctx: &mut Ctx<'_>, args: GroupListArgs) -> Result<()> {
    let query = GroupQuery {
        group_id: args.group.group_id.filter(|id| *id >= 0).unwrap_or(-1),
        group_name: args.name.unwrap_or_default(),
    };
    let response = ctx.client.post_json("/group/list", &[], Some(&query))?;
    ctx.echo(&response)?;
    let page = response.envelope::<TableData<InfoGroup>>()?;

    if ctx.tables() {
        if page.total > 0 {
            writeln!(ctx.out, "Group List:")?;
            render_groups(&page.rows, ctx.out)?;
        } else {
            writeln!(ctx.out, "No groups.")?;
        }
    }
    Ok(())
}

fn detail(ctx: &mut Ctx<'_>, group_id: i64) -> Result<()> {
    let response = ctx.client.get(&format!("/group/list/{group_id}"), &[])?;
    ctx.echo(&response)?;
    let group = response.envelope::<ApiResult<InfoGroup>>()?.data;
    if ctx.tables() {
        render_group(&group, ctx.out)?;
    }
    Ok(())
}

fn create(ctx: &mut Ctx<'_>, args: GroupCreateArgs) -> Result<()> {
    let param = GroupParam {
        group_id: None,
        group_name: prompt::text(args.name, "Please enter group name:")?,
        description: args.description.unwrap_or_default(),
    };
    let response = ctx.client.post_json("/group", &[], Some(&param))?;
    ctx.echo(&response)?;
    let group = response.envelope::<ApiResult<InfoGroup>>()?.data;
    if ctx.tables() {
        render_group(&group, ctx.out)?;
    }
    Ok(())
}

fn update(ctx: &mut Ctx<'_>, args: GroupUpdateArgs) -> Result<()> {
    let group_id = prompt::group_id(args.group.group_id)?;
    let param = GroupParam {
        group_id: Some(group_id),
        group_name: prompt::text(args.name, "Please enter group name:")?,
        description: args.description.unwrap_or_default(),
    };
    let response = ctx.client.put_json("/group", &param)?;
    ctx.acknowledge(&response, "")
}

fn delete(ctx: &mut Ctx<'_>, group_id: i64) -> Result<()> {
    ctx.notice("Request to delete the group...")?;
    let response = ctx.client.delete(&format!("/group/{group_id}"))?;
    ctx.acknowledge(&response, "Delete group error:")
}

fn members(ctx: &mut Ctx<'_>, group_id: i64) -> Result<()> {
    let response = ctx
        .client
        .get("/group/groupUser/list", &[("groupId", group_id.to_string())])?;
    ctx.echo(&response)?;
    let page = response.envelope::<TableData<InfoGroupUser>>()?;

    if ctx.tables() {
        if page.total > 0 {
            writeln!(ctx.out, "Group Member List:")?;
            let rows: Vec<Vec<String>> = page
                .rows
                .iter()
                .map(|m| vec![m.nick_name.clone(), m.email.clone(), m.role_name.clone()])
                .collect();
            Table::new(&MEMBER_COLUMNS).render(&rows, ctx.out)?;
        } else {
            writeln!(ctx.out, "No group members.")?;
        }
    }
    Ok(())
}

fn projects(ctx: &mut Ctx<'_>, group_id: i64) -> Result<()> {
    let response = ctx
        .client
        .get("/project/project/statistic", &[("groupId", group_id.to_string())])?;
    ctx.echo(&response)?;
    let page = response.envelope::<TableData<InfoProject>>()?;

    if ctx.tables() {
        if page.total > 0 {
            writeln!(ctx.out, "Group Project List:")?;
            project::render_projects(&page.rows, ctx.out)?;
        } else {
            writeln!(ctx.out, "No group projects.")?;
        }
    }
    Ok(())
}

fn render_groups(groups: &[InfoGroup], out: &mut dyn Write) -> io::Result<()> {
    let rows: Vec<Vec<String>> = groups
        .iter()
        .map(|g| {
            vec![
                g.group_id.to_string(),
                g.group_name.clone(),
                g.info_group_user.role_name.clone(),
                g.project_list.len().to_string(),
            ]
        })
        .collect();
    Table::new(&GROUP_COLUMNS).render(&rows, out)
}

fn render_group(group: &InfoGroup, out: &mut dyn Write) -> io::Result<()> {
    if *group == InfoGroup::default() {
        return writeln!(out, "The specified group does not exist.");
    }
    writeln!(
        out,
        "{} {}",
        field("Group Name", 12, &group.group_name, 64),
        field("Group ID", 15, &group.group_id.to_string(), 36)
    )?;
    writeln!(out, "{}", field("Description", 12, &group.description, 142))?;
    writeln!(
        out,
        "{} {}",
        field("Created By", 12, &group.create_by, 64),
        field("Created Date", 15, &format_date_time(&group.create_time), 36)
    )
}
