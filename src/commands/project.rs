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
use crate::cli::{
    ProjectCommand, ProjectCreateArgs, ProjectExportArgs, ProjectListArgs, ProjectUpdateArgs,
};
use crate::model::{
    AjaxResult, ApiResult, CreateProjectParam, InfoManifestFile, InfoProject, ManifestSummary,
    PackageQuery, ProjectQuery, ScanRequest, TableData, UpdateProjectParam, UploadResult,
};
use crate::prompt;
use crate::table::{Column, DETAIL_WIDTH, Table, col, field, format_date_time, rule};
use anyhow::{Result, bail};
use std::io::{self, Write};
use std::path::PathBuf;

pub const PROJECT_COLUMNS: [Column; 5] = [
    col("PROJECT ID", 11),
    col("PROJECT NAME", 79),
    col("GROUP NAME", 15),
    col("LAST SCANNED", 20),
    col("LAST UPDATED", 20),
];

const SUMMARY_CELLS: [(&str, usize); 5] = [
    ("All Packages", 25),
    ("Allowlisted Packages", 29),
    ("All CVEs", 27),
    ("Vulnerable CVEs", 27),
    ("Allowlisted CVEs", 28),
];

pub fn run(command: ProjectCommand, ctx: &mut Ctx<'_>) -> Result<()> {
    match command {
        ProjectCommand::List(args) => list(ctx, args),
        ProjectCommand::Detail(args) => detail(ctx, prompt::project_id(args.project_id)?),
        ProjectCommand::Create(args) => create(ctx, args),
        ProjectCommand::Update(args) => update(ctx, args),
        ProjectCommand::Delete(args) => delete(ctx, prompt::project_id(args.project_id)?),
        ProjectCommand::Rescan(args) => rescan(ctx, prompt::project_id(args.project_id)?),
        ProjectCommand::Cancel(args) => cancel(ctx, prompt::project_id(args.project_id)?),
        ProjectCommand::Export(args) => export(ctx, args),
    }
}

pub fn list(ctx: &mut Ctx<'_>, args: ProjectListArgs) -> Result<()> {
    let query = ProjectQuery {
        project_id: args.project.project_id.filter(|id| *id != 0),
        project_name: args.name.unwrap_or_default(),
        group_id: args.group.group_id.filter(|id| *id >= 0).unwrap_or(-1),
    };
    let response = ctx.client.post_json("/project/list", &[], Some(&query))?;
    ctx.echo(&response)?;
    let page = response.envelope::<TableData<InfoProject>>()?;

    if ctx.tables() {
        if page.total > 0 {
            writeln!(ctx.out, "Project List:")?;
            render_projects(&page.rows, ctx.out)?;
        } else {
            writeln!(ctx.out, "No projects.")?;
        }
    }
    Ok(())
}

pub fn detail(ctx: &mut Ctx<'_>, project_id: u64) -> Result<()> {
    ctx.wait_for_scan(project_id)?;

    let response = ctx
        .client
        .get(&format!("/project/project/{project_id}"), &[])?;
    ctx.echo(&response)?;
    let project = response.envelope::<ApiResult<InfoProject>>()?.data;
    if project == InfoProject::default() {
        bail!("The project does not exist or has no permissions.");
    }
    if ctx.tables() {
        render_project(&project, ctx.out)?;
    }

    let response = ctx
        .client
        .get(&format!("/project/lastestfile/{project_id}"), &[])?;
    ctx.echo(&response)?;
    let file = response.envelope::<ApiResult<InfoManifestFile>>()?.data;
    if ctx.tables() && file != InfoManifestFile::default() {
        writeln!(
            ctx.out,
            "{}",
            pair("Distro Name", &file.distro_name, "Distro Version", &file.distro_version)
        )?;
    }

    let response = ctx
        .client
        .get(&format!("/dashboard/manifestSummary/{project_id}"), &[])?;
    ctx.echo(&response)?;
    let summary = response.envelope::<ApiResult<ManifestSummary>>()?.data;
    if ctx.tables() && summary != ManifestSummary::default() {
        render_summary(&summary, ctx.out)?;
    }
    Ok(())
}

fn create(ctx: &mut Ctx<'_>, args: ProjectCreateArgs) -> Result<()> {
    let name = prompt::text(args.name, "Please enter project name:")?;
    let sbom = prompt::existing_file(args.sbom_file)?;

    ctx.notice(format!("Request to upload {} ...", sbom.display()))?;
    let uploaded = ctx
        .client
        .upload_file("/project/upload/", "file", &sbom)?
        .envelope::<UploadResult>()?;

    let param = CreateProjectParam {
        project_name: name,
        manifest_file: uploaded.url,
        description: args.description.unwrap_or_default(),
        group_id: args.group.group_id.filter(|id| *id >= 0).unwrap_or(0),
    };
    ctx.notice("Request to create the project...")?;
    let response = ctx.client.post_json("/project/project/", &[], Some(&param))?;
    ctx.echo(&response)?;
    let created = response.envelope::<ApiResult<InfoProject>>()?.data;
    if ctx.tables() {
        writeln!(
            ctx.out,
            "Project '{}' is created successfully.",
            created.project_name
        )?;
    }

    rescan(ctx, created.project_id)
}

fn update(ctx: &mut Ctx<'_>, args: ProjectUpdateArgs) -> Result<()> {
    let project_id = prompt::project_id(args.project.project_id)?;
    let param = UpdateProjectParam {
        project_id,
        project_name: args.name.unwrap_or_default(),
        description: args.description.unwrap_or_default(),
        group_id: args.group.group_id.filter(|id| *id >= 0).unwrap_or(-1),
    };

    ctx.notice("Request to update the project...")?;
    let response = ctx.client.put_json("/project/project", &param)?;
    ctx.acknowledge(&response, "")
}

fn delete(ctx: &mut Ctx<'_>, project_id: u64) -> Result<()> {
    ctx.notice("Request to delete the project...")?;
    let response = ctx.client.delete(&format!("/project/project/{project_id}"))?;
    ctx.acknowledge(&response, "Delete project error:")
}

/// Triggers a full CVE scan and waits for it to settle.
pub fn rescan(ctx: &mut Ctx<'_>, project_id: u64) -> Result<()> {
    let request = ScanRequest {
        project_id,
        ..ScanRequest::default()
    };

    ctx.notice("Request to scan the project...")?;
    ctx.client
        .post_json("/knowledgebase/scanall/", &[], Some(&request))?
        .envelope::<AjaxResult>()?;

    ctx.wait_for_scan(project_id)?;
    ctx.notice("CVE Scan is completed.")
}

fn cancel(ctx: &mut Ctx<'_>, project_id: u64) -> Result<()> {
    ctx.notice("Request to cancel the project scanning...")?;
    let response = ctx.client.post_json(
        &format!("/knowledgebase/cancelscan/{project_id}"),
        &[],
        None::<&()>,
    )?;
    ctx.acknowledge(&response, "Cancel project scanning error:")
}

fn export(ctx: &mut Ctx<'_>, args: ProjectExportArgs) -> Result<()> {
    let project_id = prompt::project_id(args.project.project_id)?;
    ctx.wait_for_scan(project_id)?;

    ctx.notice("Request to export SBOM file ...")?;
    let project = ctx.fetch_project(project_id)?;
    let (suffix_type, file_suffix) = sbom_suffix(&args.sbom_format);
    let query = PackageQuery {
        project_id,
        suffix_type: Some(suffix_type.to_string()),
        ..PackageQuery::default()
    };
    let dest = args.out.out_file.unwrap_or_else(|| {
        PathBuf::from(format!("{}-Package-List{file_suffix}", project.project_name))
    });
    ctx.export("/project/package/export", &query, &dest)
}

/// Maps a user-supplied SBOM format to the server's suffix type and the
/// local file suffix. Anything mentioning SPDX wins; the rest is CycloneDX.
fn sbom_suffix(format: &str) -> (&'static str, &'static str) {
    if format.trim().to_uppercase().contains("SP") {
        (".SPDX.JSON", ".spdx.json")
    } else {
        (".JSON", "-CycloneDX.json")
    }
}

pub fn render_projects(projects: &[InfoProject], out: &mut dyn Write) -> io::Result<()> {
    let rows: Vec<Vec<String>> = projects
        .iter()
        .map(|p| {
            vec![
                p.project_id.to_string(),
                p.project_name.clone(),
                p.group_name.clone(),
                format_date_time(&p.last_scanned),
                format_date_time(&p.update_time),
            ]
        })
        .collect();
    Table::new(&PROJECT_COLUMNS).render(&rows, out)
}

fn render_project(project: &InfoProject, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}", rule(DETAIL_WIDTH))?;
    writeln!(
        out,
        "{}",
        pair("Project Name", &project.project_name, "Group Name", &project.group_name)
    )?;
    writeln!(
        out,
        "{}",
        pair(
            "Last Scanned",
            &format_date_time(&project.last_scanned),
            "Created By",
            &project.create_by
        )
    )?;
    writeln!(
        out,
        "{}",
        pair(
            "Last Updated",
            &format_date_time(&project.update_time),
            "Created Date",
            &format_date_time(&project.create_time)
        )
    )?;
    writeln!(out, "{}", field("Description", 12, &project.description, 142))
}

fn pair(left_key: &str, left: &str, right_key: &str, right: &str) -> String {
    format!(
        "{} {}",
        field(left_key, 12, left, 64),
        field(right_key, 15, right, 36)
    )
}

fn render_summary(summary: &ManifestSummary, out: &mut dyn Write) -> io::Result<()> {
    let counts = [
        summary.packages_num,
        summary.allowlisted_packages_num,
        summary.cves_num,
        summary.affected_cves_num,
        summary.allowlisted_cves_num,
    ];
    let frame = |left: char, middle: char, right: char| {
        let segments: Vec<String> = SUMMARY_CELLS.iter().map(|(_, w)| rule(*w)).collect();
        format!("{left}{}{right}", segments.join(&middle.to_string()))
    };

    let mut values = String::from("│");
    let mut labels = String::from("│");
    for ((label, width), count) in SUMMARY_CELLS.iter().zip(counts) {
        values.push_str(&format!("{:^width$}│", count, width = *width));
        labels.push_str(&format!("{:^width$}│", label, width = *width));
    }

    writeln!(out, "MANIFEST SUMMARY /")?;
    writeln!(out, "{}", frame('┌', '┬', '┐'))?;
    writeln!(out, "{values}")?;
    writeln!(out, "{labels}")?;
    writeln!(out, "{}", frame('└', '┴', '┘'))
}
