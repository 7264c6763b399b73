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

use super::{Ctx, cve, split_names};
use crate::cli::{PackageCommand, PackageDetailArgs, PackageExportArgs};
use crate::model::{ApiResult, CveQuery, InfoManifest, InfoPackage, PackageQuery, TableData};
use crate::prompt;
use crate::table::{Column, DETAIL_WIDTH, Table, col, field, rule};
use anyhow::Result;
use std::io::{self, Write};
use std::path::PathBuf;

pub const PACKAGE_COLUMNS: [Column; 9] = [
    col("PACKAGE ID", 11),
    col("PACKAGE", 25),
    col("PACKAGE VERSION", 15),
    col("PACKAGE GROUP", 13),
    col("LICENSEs", 15),
    col("VULNERABLE CVEs", 15),
    col("RESOLVED CVEs", 13),
    col("ALLOWLISTED CVEs", 16),
    col("PACKAGE STATUS", 14),
];

pub fn run(command: PackageCommand, ctx: &mut Ctx<'_>) -> Result<()> {
    match command {
        PackageCommand::Query(args) => {
            let project_id = prompt::project_id(args.project.project_id)?;
            query(ctx, project_id, args.name.as_deref())
        }
        PackageCommand::Detail(args) => detail(ctx, args),
        PackageCommand::Export(args) => export(ctx, args),
    }
}

fn query(ctx: &mut Ctx<'_>, project_id: u64, names: Option<&str>) -> Result<()> {
    ctx.wait_for_scan(project_id)?;

    let query = PackageQuery {
        project_id,
        packages: split_names(names),
        ..PackageQuery::default()
    };
    ctx.notice("Request to query package...")?;
    let response = ctx
        .client
        .post_json("/project/package/list", &[], Some(&query))?;
    ctx.echo(&response)?;
    let page = response.envelope::<TableData<InfoPackage>>()?;

    if ctx.tables() {
        if page.total > 0 {
            writeln!(ctx.out, "Package List:")?;
            render_packages(&page.rows, ctx.out)?;
        } else if query.packages.is_empty() {
            writeln!(ctx.out, "No packages under this project.")?;
        } else {
            writeln!(
                ctx.out,
                "No package {} under this project.",
                query.packages.join(",")
            )?;
        }
    }
    Ok(())
}

/// Package ID wins over a name; only the first of several names is shown.
fn detail(ctx: &mut Ctx<'_>, args: PackageDetailArgs) -> Result<()> {
    if let Some(package_id) = args.package_id.filter(|id| *id != 0) {
        return detail_by_id(ctx, package_id);
    }

    let project_id = prompt::project_id(args.project.project_id)?;
    let name = match split_names(args.name.as_deref()).into_iter().next() {
        Some(name) => name,
        None => prompt::text(None, "Please enter package name:")?,
    };
    detail_by_name(ctx, project_id, &name)
}

fn detail_by_id(ctx: &mut Ctx<'_>, package_id: u64) -> Result<()> {
    ctx.notice("Request the package details...")?;
    let response = ctx.client.get(&format!("/manifest/{package_id}"), &[])?;
    ctx.echo(&response)?;
    let manifest = response.envelope::<ApiResult<InfoManifest>>()?.data;

    ctx.wait_for_scan(manifest.project_id)?;
    if ctx.tables() {
        render_manifest(&manifest, ctx.out)?;
    }

    let query = CveQuery {
        project_id: manifest.project_id,
        manifest_id: Some(package_id),
        ..CveQuery::default()
    };
    package_cves(ctx, &query)
}

fn detail_by_name(ctx: &mut Ctx<'_>, project_id: u64, name: &str) -> Result<()> {
    ctx.wait_for_scan(project_id)?;

    ctx.notice(format!("Request the package '{name}' details..."))?;
    let query = PackageQuery {
        project_id,
        packages: vec![name.to_string()],
        ..PackageQuery::default()
    };
    let response = ctx
        .client
        .post_json("/project/package/list", &[], Some(&query))?;
    ctx.echo(&response)?;
    let page = response.envelope::<TableData<InfoPackage>>()?;
    if ctx.tables() {
        render_package_details(&page.rows, ctx.out)?;
    }

    let query = CveQuery {
        project_id,
        packages: vec![name.to_string()],
        ..CveQuery::default()
    };
    package_cves(ctx, &query)
}

fn package_cves(ctx: &mut Ctx<'_>, query: &CveQuery) -> Result<()> {
    let page = cve::list_cves(ctx, query)?;
    if ctx.tables() {
        if page.total > 0 {
            writeln!(ctx.out, "Package CVE List:")?;
            cve::render_cves(&page.rows, ctx.out)?;
        } else {
            writeln!(ctx.out, "No CVE under this package.")?;
        }
    }
    Ok(())
}

fn export(ctx: &mut Ctx<'_>, args: PackageExportArgs) -> Result<()> {
    let project_id = prompt::project_id(args.project.project_id)?;
    ctx.wait_for_scan(project_id)?;

    ctx.notice("Request to export package list...")?;
    let project = ctx.fetch_project(project_id)?;
    let query = PackageQuery {
        project_id,
        packages: split_names(args.name.as_deref()),
        suffix_type: Some(".XLSX".to_string()),
        strict: false,
    };
    let dest = args.out.out_file.unwrap_or_else(|| {
        PathBuf::from(format!("{}-Package-List.xlsx", project.project_name))
    });
    ctx.export("/project/package/export", &query, &dest)
}

fn render_packages(packages: &[InfoPackage], out: &mut dyn Write) -> io::Result<()> {
    let rows: Vec<Vec<String>> = packages
        .iter()
        .map(|p| {
            vec![
                p.manifest_id.to_string(),
                p.package_name.clone(),
                p.package_version.clone(),
                p.package_group.clone(),
                p.license_name.clone(),
                p.unresolved.to_string(),
                p.resolved.to_string(),
                p.allowlistcves.to_string(),
                p.package_status.clone(),
            ]
        })
        .collect();
    Table::new(&PACKAGE_COLUMNS).render(&rows, out)
}

fn pair(left_key: &str, left: &str, right_key: &str, right: &str) -> String {
    format!(
        "{} {}",
        field(left_key, 12, left, 48),
        field(right_key, 15, right, 64)
    )
}

fn render_manifest(manifest: &InfoManifest, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}", rule(DETAIL_WIDTH))?;
    writeln!(
        out,
        "{}",
        pair(
            "Package ID",
            &manifest.manifest_id.to_string(),
            "License",
            &manifest.license_name
        )
    )?;
    writeln!(
        out,
        "{}",
        pair(
            "Package Name",
            &manifest.package_name,
            "Package Version",
            &manifest.package_version
        )
    )?;
    writeln!(out, "{}", field("Url", 12, &manifest.homepage, 142))?;
    writeln!(out, "{}", field("Summary", 12, &manifest.summary, 142))?;
    writeln!(out, "{}", field("Description", 12, &manifest.descript, 142))?;
    writeln!(out, "{}", rule(DETAIL_WIDTH))?;
    writeln!(out, " ")
}

fn render_package_details(packages: &[InfoPackage], out: &mut dyn Write) -> io::Result<()> {
    if packages.is_empty() {
        return Ok(());
    }
    for package in packages {
        writeln!(out, "{}", rule(DETAIL_WIDTH))?;
        writeln!(
            out,
            "{}",
            pair(
                "Package Name",
                &package.package_name,
                "Package Version",
                &package.package_version
            )
        )?;
        writeln!(out, "{}", field("Description", 12, &package.descript, 142))?;
        writeln!(out, "{}", field("License", 12, &package.license_name, 142))?;
        writeln!(out, "{}", field("Summary", 12, &package.summary, 142))?;
        writeln!(out, "{}", field("Url", 12, &package.homepage, 142))?;
        writeln!(out, "{}", rule(DETAIL_WIDTH))?;
    }
    writeln!(out, " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{OutFileArg, PackageQueryArgs, ProjectIdArg};
    use crate::client::ApiClient;
    use crate::commands::tests::{run_with, scan_settled};
    use crate::output::OutputFormat;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn openssl() -> serde_json::Value {
        json!({
            "manifestId": 88,
            "packageName": "openssl",
            "packageVersion": "3.0.7",
            "packageGroup": "core",
            "packageStatus": "Active",
            "licenseName": "Apache-2.0",
            "homepage": "https://www.openssl.org",
            "summary": "TLS toolkit",
            "descript": "Secure Sockets Layer toolkit",
            "unresolved": 4,
            "resolved": 2,
            "allowlistcves": 1
        })
    }

    fn project(id: u64) -> ProjectIdArg {
        ProjectIdArg {
            project_id: Some(id),
        }
    }

    #[test]
    fn query_splits_names_and_renders_table() {
        let server = MockServer::start();
        scan_settled(&server, 12);
        let mock = server.mock(|when, then| {
            when.method(POST).path("/project/package/list").json_body(json!({
                "projectId": 12,
                "packages": ["openssl", "zlib"],
                "strict": false
            }));
            then.status(200).json_body(json!({
                "code": 200,
                "msg": "ok",
                "total": 1,
                "rows": [openssl()]
            }));
        });
        let client = ApiClient::new(&server.base_url()).unwrap();

        let (result, captured) = run_with(&client, OutputFormat::OnlyTable, |ctx| {
            run(
                PackageCommand::Query(PackageQueryArgs {
                    project: project(12),
                    name: Some("openssl, zlib".into()),
                }),
                ctx,
            )
        });

        result.unwrap();
        mock.assert();
        assert!(captured.out.contains("Package List:\n"));
        assert!(captured.out.contains("│ 88         │ openssl"));
        assert!(captured.out.contains("│ 4              │ 2            │ 1               │ Active"));
    }

    #[test]
    fn query_names_missing_package() {
        let server = MockServer::start();
        scan_settled(&server, 12);
        server.mock(|when, then| {
            when.method(POST).path("/project/package/list");
            then.status(200)
                .json_body(json!({"code": 200, "msg": "ok", "total": 0, "rows": []}));
        });
        let client = ApiClient::new(&server.base_url()).unwrap();

        let (result, captured) = run_with(&client, OutputFormat::OnlyTable, |ctx| {
            query(ctx, 12, Some("busybox"))
        });

        result.unwrap();
        assert!(captured.out.ends_with("No package busybox under this project.\n"));
    }

    #[test]
    fn detail_by_id_looks_up_project_then_cves() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/manifest/88");
            then.status(200).json_body(json!({
                "code": 200,
                "msg": "ok",
                "data": {
                    "manifestId": 88,
                    "projectId": 12,
                    "packageName": "openssl",
                    "packageVersion": "3.0.7",
                    "licenseName": "Apache-2.0"
                }
            }));
        });
        scan_settled(&server, 12);
        let cves = server.mock(|when, then| {
            when.method(POST)
                .path("/cve/cve/list")
                .json_body(json!({"projectId": 12, "manifestId": 88}));
            then.status(200)
                .json_body(json!({"code": 200, "msg": "ok", "total": 0, "rows": []}));
        });
        let client = ApiClient::new(&server.base_url()).unwrap();
        let args = PackageDetailArgs {
            package_id: Some(88),
            ..PackageDetailArgs::default()
        };

        let (result, captured) =
            run_with(&client, OutputFormat::OnlyTable, |ctx| detail(ctx, args));

        result.unwrap();
        cves.assert();
        assert!(captured.out.contains("  Package ID: 88"));
        assert!(captured.out.contains("License: Apache-2.0"));
        assert!(captured.out.ends_with("No CVE under this package.\n"));
    }

    #[test]
    fn detail_by_name_shows_package_and_cve_table() {
        let server = MockServer::start();
        scan_settled(&server, 12);
        server.mock(|when, then| {
            when.method(POST)
                .path("/project/package/list")
                .json_body_partial(r#"{"packages": ["openssl"]}"#);
            then.status(200).json_body(json!({
                "code": 200,
                "msg": "ok",
                "total": 1,
                "rows": [openssl()]
            }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/cve/cve/list")
                .json_body(json!({"projectId": 12, "packages": ["openssl"]}));
            then.status(200).json_body(json!({
                "code": 200,
                "msg": "ok",
                "total": 1,
                "rows": [{"id": 1, "cveId": "CVE-2023-0464", "severity": "High", "cvssScore": 7.5}]
            }));
        });
        let client = ApiClient::new(&server.base_url()).unwrap();
        let args = PackageDetailArgs {
            project: project(12),
            name: Some("openssl,zlib".into()),
            ..PackageDetailArgs::default()
        };

        let (result, captured) =
            run_with(&client, OutputFormat::OnlyTable, |ctx| detail(ctx, args));

        result.unwrap();
        let out = captured.out;
        assert!(out.contains("Request the package 'openssl' details..."));
        assert!(out.contains("Package Name: openssl"));
        assert!(out.contains("Package Version: 3.0.7"));
        assert!(out.contains("Package CVE List:\n"));
        assert!(out.contains("CVE-2023-0464"));
    }

    #[test]
    fn export_requests_xlsx() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("packages.xlsx");
        let server = MockServer::start();
        scan_settled(&server, 12);
        server.mock(|when, then| {
            when.method(GET).path("/project/project/12");
            then.status(200).json_body(json!({
                "code": 200,
                "msg": "ok",
                "data": {"projectId": 12, "projectName": "gateway"}
            }));
        });
        let mock = server.mock(|when, then| {
            when.method(POST).path("/project/package/export").json_body(json!({
                "projectId": 12,
                "packages": [],
                "suffixType": ".XLSX",
                "strict": false
            }));
            then.status(200).body("xlsx-bytes");
        });
        let client = ApiClient::new(&server.base_url()).unwrap();
        let args = PackageExportArgs {
            project: project(12),
            name: None,
            out: OutFileArg {
                out_file: Some(dest.clone()),
            },
        };

        let (result, _) = run_with(&client, OutputFormat::OnlyTable, |ctx| export(ctx, args));

        result.unwrap();
        mock.assert();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "xlsx-bytes");
    }
}
