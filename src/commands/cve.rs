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
use crate::cli::{CveCommand, CveExportArgs, CveFilterArgs, CveUpdateArgs, CyclonedxExportArgs};
use crate::model::{ApiResult, CveDetail, CveQuery, CveStatusUpdate, InfoCve, TableData};
use crate::prompt;
use crate::table::{
    Column, DETAIL_WIDTH, Table, col, field, format_date_time, rule, titled_rule,
};
use anyhow::{Result, bail};
use serde_json::json;
use std::io::{self, Write};
use std::path::PathBuf;

pub const CVE_COLUMNS: [Column; 8] = [
    col("SEVERITY", 11),
    col("CVE ID", 17),
    col("PACKAGE", 43),
    col("CVSS SCORE", 10),
    col("WR SOLUTION", 11),
    col("PUBLISHED", 19),
    col("MODIFIED", 19),
    col("STATUS", 11),
];

const SOLUTION_COLUMNS: [Column; 2] = [
    col("Operating System Distribution", 39),
    col("Fixed Projects", 26),
];

const REFERENCE_COLUMNS: [Column; 2] = [col("Hyperlink", 87), col("Resource", 64)];

const NVD_DETAIL_URL: &str = "https://nvd.nist.gov/vuln/detail/";

pub fn run(command: CveCommand, ctx: &mut Ctx<'_>) -> Result<()> {
    match command {
        CveCommand::Query(filter) => query(ctx, filter),
        CveCommand::Detail(args) => {
            let project_id = prompt::project_id(args.project.project_id)?;
            let cve_id = prompt::text(args.cve.cve_id, "Please enter CVE ID:")?;
            detail(ctx, project_id, &cve_id)
        }
        CveCommand::Export(args) => export(ctx, args),
        CveCommand::CyclonedxExport(args) => cyclonedx_export(ctx, args),
        CveCommand::Update(args) => update(ctx, args),
    }
}

/// Builds the list/export query from the command-line filters.
fn cve_query(project_id: u64, filter: CveFilterArgs) -> CveQuery {
    CveQuery {
        project_id,
        fuzzy_query: filter.fuzzy_query.unwrap_or_default(),
        severity: filter.severity,
        cvss_score: filter.score_comparator,
        status: filter.status,
        published_date_begin: filter.published_date_begin.unwrap_or_default(),
        published_date_end: filter.published_date_end.unwrap_or_default(),
        modified_date_begin: filter.modified_date_begin.unwrap_or_default(),
        modified_date_end: filter.modified_date_end.unwrap_or_default(),
        ..CveQuery::default()
    }
}

/// Posts `query` to the CVE list endpoint, echoing the raw page.
pub fn list_cves(ctx: &mut Ctx<'_>, query: &CveQuery) -> Result<TableData<InfoCve>> {
    let response = ctx.client.post_json("/cve/cve/list", &[], Some(query))?;
    ctx.echo(&response)?;
    Ok(response.envelope::<TableData<InfoCve>>()?)
}

fn query(ctx: &mut Ctx<'_>, filter: CveFilterArgs) -> Result<()> {
    let project_id = prompt::project_id(filter.project.project_id)?;
    ctx.wait_for_scan(project_id)?;

    ctx.notice("Request to query CVE...")?;
    let page = list_cves(ctx, &cve_query(project_id, filter))?;
    if ctx.tables() {
        if page.total > 0 {
            writeln!(ctx.out, "CVE List:")?;
            render_cves(&page.rows, ctx.out)?;
        } else {
            writeln!(ctx.out, "No CVEs under this project.")?;
        }
    }
    Ok(())
}

fn detail(ctx: &mut Ctx<'_>, project_id: u64, cve_id: &str) -> Result<()> {
    ctx.wait_for_scan(project_id)?;

    let lookup = CveQuery {
        project_id,
        fuzzy_query: cve_id.to_string(),
        ..CveQuery::default()
    };
    let page = ctx
        .client
        .post_json("/cve/cve/list", &[], Some(&lookup))?
        .envelope::<TableData<InfoCve>>()?;
    let Some(found) = page.rows.first() else {
        bail!("No {cve_id} under this project.");
    };

    let response = ctx.client.get(
        &format!("/cve/cve/{}", found.id),
        &[("projectId", project_id.to_string())],
    )?;
    ctx.echo(&response)?;
    let cve = response.envelope::<ApiResult<CveDetail>>()?.data;
    if ctx.tables() {
        render_detail(&cve, ctx.out)?;
    }
    Ok(())
}

fn export(ctx: &mut Ctx<'_>, args: CveExportArgs) -> Result<()> {
    let project_id = prompt::project_id(args.filter.project.project_id)?;
    ctx.wait_for_scan(project_id)?;

    let project = ctx.fetch_project(project_id)?;
    let query = cve_query(project_id, args.filter);
    ctx.notice("Request to export cve list...")?;
    let dest = args
        .out
        .out_file
        .unwrap_or_else(|| PathBuf::from(format!("{}-CVE-List.xlsx", project.project_name)));
    ctx.export("/cve/cve/export", &query, &dest)
}

fn cyclonedx_export(ctx: &mut Ctx<'_>, args: CyclonedxExportArgs) -> Result<()> {
    let project_id = prompt::project_id(args.project.project_id)?;
    ctx.wait_for_scan(project_id)?;

    let project = ctx.fetch_project(project_id)?;
    ctx.notice("Request to export CycloneDX SBOM and VEX Report...")?;
    let body = json!({"projectId": project_id, "suffixType": ".JSON"});
    let dest = args
        .out_file
        .unwrap_or_else(|| PathBuf::from(format!("{}-CycloneDX.json", project.project_name)));
    ctx.export("/project/package/export", &body, &dest)
}

fn update(ctx: &mut Ctx<'_>, args: CveUpdateArgs) -> Result<()> {
    let project_id = prompt::project_id(args.project.project_id)?;
    let cve_id = prompt::text(args.cve.cve_id, "Please enter CVE ID:")?;
    let new_status = prompt::text(args.new_status, "Please enter new CVE status:")?;
    ctx.wait_for_scan(project_id)?;

    let update = CveStatusUpdate {
        project_id,
        cve_id,
        package_name: args.package_name.unwrap_or_default(),
        new_status,
    };
    let response = ctx
        .client
        .post_json("/cve/process/updateCveStatus", &[], Some(&update))?;
    ctx.acknowledge(&response, "")
}

pub fn render_cves(cves: &[InfoCve], out: &mut dyn Write) -> io::Result<()> {
    let rows: Vec<Vec<String>> = cves
        .iter()
        .map(|cve| {
            vec![
                cve.severity.clone(),
                cve.cve_id.clone(),
                cve.package_str.clone(),
                format!("{:.1}", cve.cvss_score),
                cve.has_solution.clone(),
                format_date_time(&cve.nvd_published_date),
                format_date_time(&cve.nvd_modified_date),
                cve.cve_status.clone(),
            ]
        })
        .collect();
    Table::new(&CVE_COLUMNS).render(&rows, out)
}

/// One line of up to three CVSS metrics.
fn metrics(pairs: &[(&str, &str)]) -> String {
    const KEY_WIDTHS: [usize; 3] = [26, 28, 26];
    pairs
        .iter()
        .zip(KEY_WIDTHS)
        .map(|((key, value), width)| field(key, width, value, 22))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_detail(cve: &CveDetail, out: &mut dyn Write) -> io::Result<()> {
    if *cve == CveDetail::default() {
        return writeln!(out, "The specified CVE does not exist.");
    }

    let solution = if cve.has_solution.eq_ignore_ascii_case("yes") {
        "[√]"
    } else {
        "[×]"
    };
    writeln!(out, "Vulnerability Details:{}/", cve.cve_id)?;
    writeln!(out, "{}", rule(DETAIL_WIDTH))?;
    writeln!(
        out,
        "{} {:>28}",
        field("url", 26, &format!("{NVD_DETAIL_URL}{}", cve.cve_id), 56),
        format!("{solution}Solution ")
    )?;
    writeln!(
        out,
        "{} {}",
        field("Published", 26, &format_date_time(&cve.nvd_published_date), 22),
        field("Last Modified", 28, &format_date_time(&cve.nvd_modified_date), 24)
    )?;

    if cve.cvss_type == "CVSS 3" {
        writeln!(
            out,
            "{}",
            titled_rule("CVSS3.x Scores and Vulnerability Types", DETAIL_WIDTH)
        )?;
        writeln!(
            out,
            "{} {}",
            field("CVSS SCORE", 26, &format!("{:.1}", cve.cvss_score), 22),
            field("VECTOR", 28, &cve.vector_string.to_uppercase(), 48)
        )?;
        writeln!(
            out,
            "{}",
            titled_rule(
                &format!("EXPLOITABILITY {:>3}", cve.exploitability_score),
                DETAIL_WIDTH
            )
        )?;
        writeln!(
            out,
            "{}",
            metrics(&[
                ("ATTACK VECTOR (AV)", cve.attack_vector.as_str()),
                ("ATTACK COMPLEXITY (AC)", cve.attack_complexity.as_str()),
                ("PRIVILEGES REQUIRED (PR)", cve.privileges_required.as_str()),
            ])
        )?;
        writeln!(
            out,
            "{}",
            metrics(&[
                ("USER INTERACTION (UI)", cve.user_interaction.as_str()),
                ("SCOPE(S)", cve.scope.as_str()),
            ])
        )?;
        writeln!(
            out,
            "{}",
            titled_rule(&format!("IMPACT {:>3}", cve.impact_score), DETAIL_WIDTH)
        )?;
        writeln!(
            out,
            "{}",
            metrics(&[
                ("CONFIDENTIALITY IMPACT (C)", cve.confidentiality_impact.as_str()),
                ("INTEGRITY IMPACT (I)", cve.integrity_impact.as_str()),
                ("AVAILABILITY IMPACT (A)", cve.availability_impact.as_str()),
            ])
        )?;
    } else {
        writeln!(
            out,
            "{}",
            titled_rule("CVSS2.x Scores and Vulnerability Types", DETAIL_WIDTH)
        )?;
        writeln!(
            out,
            "{} {}",
            field("CVSS SCORE", 26, &format!("{:.1}", cve.cvss_v2), 22),
            field("VECTOR", 28, &cve.vector_string_v2, 48)
        )?;
        writeln!(
            out,
            "{}",
            titled_rule(
                &format!("EXPLOITABILITY {:>3}", cve.exploitabilitiy_score_v2),
                DETAIL_WIDTH
            )
        )?;
        writeln!(
            out,
            "{}",
            metrics(&[
                ("ACCESS VECTOR (AV)", cve.access_vector_v2.as_str()),
                ("ACCESS COMPLEXITY (AC)", cve.access_complexity_v2.as_str()),
                ("AUTHENTICATION (AU)", cve.authentication_v2.as_str()),
            ])
        )?;
        writeln!(
            out,
            "{}",
            titled_rule(&format!("IMPACT {:>3}", cve.impact_score_v2), DETAIL_WIDTH)
        )?;
        writeln!(
            out,
            "{}",
            metrics(&[
                ("CONFIDENTIALITY IMPACT (C)", cve.confidentiality_impact_v2.as_str()),
                ("INTEGRITY IMPACT (I)", cve.integrity_impact_v2.as_str()),
                ("AVAILABILITY IMPACT (A)", cve.availability_impact_v2.as_str()),
            ])
        )?;
    }

    writeln!(out, "{}", titled_rule("WEAKNESS ENUMERATION", DETAIL_WIDTH))?;
    writeln!(out, "{}", field("CWE ID", 26, &cve.cwe_id, 84))?;

    if !cve.jira_resolved_cve.is_empty() {
        writeln!(out, "Wind River Solutions:")?;
        let rows: Vec<Vec<String>> = cve
            .jira_resolved_cve
            .iter()
            .map(|s| vec![s.full_name.clone(), s.fix_projects.to_string()])
            .collect();
        Table::new(&SOLUTION_COLUMNS).render(&rows, out)?;
    }

    let links = cve.links();
    if !links.is_empty() {
        writeln!(out, "References to Advisories, Solutions and Tools:")?;
        let rows: Vec<Vec<String>> = links
            .iter()
            .map(|link| {
                let tags: String = link.tags.iter().map(|tag| format!("[{tag}] ")).collect();
                vec![link.url.clone(), tags]
            })
            .collect();
        Table::new(&REFERENCE_COLUMNS).render(&rows, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CveIdArg, OutFileArg, ProjectIdArg};
    use crate::client::ApiClient;
    use crate::commands::tests::{run_with, scan_settled};
    use crate::model::ScoreComparator;
    use crate::output::OutputFormat;
    use httpmock::prelude::*;
    use std::fs;
    use tempfile::tempdir;

    fn cve_row() -> serde_json::Value {
        json!({
            "id": 501,
            "cveId": "CVE-2023-0464",
            "packageStr": "openssl 3.0.7",
            "severity": "High",
            "cvssScore": 7.5,
            "hasSolution": "Yes",
            "nvdPublishedDate": "2023-03-22T17:15:00.000Z",
            "nvdModifiedDate": "2023-11-07T04:09:00.000Z",
            "cveStatus": "Unresolved"
        })
    }

    fn project(id: u64) -> ProjectIdArg {
        ProjectIdArg {
            project_id: Some(id),
        }
    }

    #[test]
    fn query_sends_filters_and_renders_table() {
        let server = MockServer::start();
        scan_settled(&server, 12);
        let mock = server.mock(|when, then| {
            when.method(POST).path("/cve/cve/list").json_body(json!({
                "projectId": 12,
                "severity": ["Critical", "High"],
                "cvssScore": [{"comparator": "NUMERIC_GREATER_THAN", "score": 7.0}]
            }));
            then.status(200).json_body(json!({
                "code": 200,
                "msg": "ok",
                "total": 1,
                "rows": [cve_row()]
            }));
        });
        let client = ApiClient::new(&server.base_url()).unwrap();
        let filter = CveFilterArgs {
            project: project(12),
            severity: vec!["Critical".into(), "High".into()],
            score_comparator: vec![ScoreComparator {
                comparator: "NUMERIC_GREATER_THAN".into(),
                score: 7.0,
            }],
            ..CveFilterArgs::default()
        };

        let (result, captured) =
            run_with(&client, OutputFormat::OnlyTable, |ctx| query(ctx, filter));

        result.unwrap();
        mock.assert();
        assert!(captured.out.contains("CVE List:\n"));
        assert!(captured.out.contains("│ High       │ CVE-2023-0464    │"));
        assert!(captured.out.contains("│ 7.5       │"));
        assert!(captured.out.contains("│ 2023-03-22 17:15:00│"));
    }

    #[test]
    fn query_without_matches_says_so() {
        let server = MockServer::start();
        scan_settled(&server, 12);
        server.mock(|when, then| {
            when.method(POST).path("/cve/cve/list");
            then.status(200)
                .json_body(json!({"code": 200, "msg": "ok", "total": 0, "rows": []}));
        });
        let client = ApiClient::new(&server.base_url()).unwrap();
        let filter = CveFilterArgs {
            project: project(12),
            ..CveFilterArgs::default()
        };

        let (result, captured) =
            run_with(&client, OutputFormat::OnlyTable, |ctx| query(ctx, filter));

        result.unwrap();
        assert!(captured.out.ends_with("No CVEs under this project.\n"));
    }

    #[test]
    fn detail_renders_cvss3_block_and_references() {
        let server = MockServer::start();
        scan_settled(&server, 12);
        server.mock(|when, then| {
            when.method(POST)
                .path("/cve/cve/list")
                .json_body(json!({"projectId": 12, "fuzzyQuery": "CVE-2023-0464"}));
            then.status(200).json_body(json!({
                "code": 200,
                "msg": "ok",
                "total": 1,
                "rows": [cve_row()]
            }));
        });
        let detail_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/cve/cve/501")
                .query_param("projectId", "12");
            then.status(200).json_body(json!({
                "code": 200,
                "msg": "ok",
                "data": {
                    "cveId": "CVE-2023-0464",
                    "cvssType": "CVSS 3",
                    "hasSolution": "yes",
                    "cvssScore": 7.5,
                    "vectorString": "cvss:3.1/av:n/ac:l/pr:n/ui:n/s:u/c:n/i:n/a:h",
                    "exploitabilityScore": 3.9,
                    "attackVector": "NETWORK",
                    "impactScore": 3.6,
                    "cweId": "CWE-295",
                    "link": "[{\"url\":\"https://www.openssl.org/news/secadv/20230322.txt\",\"tags\":[\"Vendor Advisory\"]}]",
                    "jiraResolvedCve": [{"fullName": "Wind River Linux LTS 22", "fixProjects": 3}]
                }
            }));
        });
        let client = ApiClient::new(&server.base_url()).unwrap();

        let (result, captured) = run_with(&client, OutputFormat::OnlyTable, |ctx| {
            detail(ctx, 12, "CVE-2023-0464")
        });

        result.unwrap();
        detail_mock.assert();
        let out = captured.out;
        assert!(out.starts_with("Vulnerability Details:CVE-2023-0464/\n"));
        assert!(out.contains("https://nvd.nist.gov/vuln/detail/CVE-2023-0464"));
        assert!(out.contains("[√]Solution"));
        assert!(out.contains("CVSS3.x Scores and Vulnerability Types─"));
        assert!(out.contains("CVSS:3.1/AV:N/AC:L"));
        assert!(out.contains("EXPLOITABILITY 3.9─"));
        assert!(out.contains("ATTACK VECTOR (AV): NETWORK"));
        assert!(out.contains("CWE ID: CWE-295"));
        assert!(out.contains("Wind River Linux LTS 22"));
        assert!(out.contains("[Vendor Advisory]"));
    }

    #[test]
    fn detail_of_unknown_cve_fails() {
        let server = MockServer::start();
        scan_settled(&server, 12);
        server.mock(|when, then| {
            when.method(POST).path("/cve/cve/list");
            then.status(200)
                .json_body(json!({"code": 200, "msg": "ok", "total": 0, "rows": []}));
        });
        let client = ApiClient::new(&server.base_url()).unwrap();

        let (result, _) = run_with(&client, OutputFormat::OnlyTable, |ctx| {
            detail(ctx, 12, "CVE-1999-0001")
        });

        assert_eq!(
            result.unwrap_err().to_string(),
            "No CVE-1999-0001 under this project."
        );
    }

    #[test]
    fn cvss2_block_is_used_for_older_scores() {
        let cve = CveDetail {
            cve_id: "CVE-2009-3555".into(),
            cvss_type: "CVSS 2".into(),
            cvss_v2: 5.8,
            access_vector_v2: "NETWORK".into(),
            ..CveDetail::default()
        };
        let mut out = Vec::new();

        render_detail(&cve, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("CVSS2.x Scores and Vulnerability Types"));
        assert!(text.contains("CVSS SCORE: 5.8"));
        assert!(text.contains("ACCESS VECTOR (AV): NETWORK"));
        assert!(text.contains("[×]Solution"));
        assert!(!text.contains("References to Advisories"));
    }

    #[test]
    fn export_writes_default_named_workbook_to_out_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("cves.xlsx");
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
            when.method(POST)
                .path("/cve/cve/export")
                .json_body(json!({"projectId": 12, "status": ["Unresolved"]}));
            then.status(200).body("PK-xlsx");
        });
        let client = ApiClient::new(&server.base_url()).unwrap();
        let args = CveExportArgs {
            filter: CveFilterArgs {
                project: project(12),
                status: vec!["Unresolved".into()],
                ..CveFilterArgs::default()
            },
            out: OutFileArg {
                out_file: Some(dest.clone()),
            },
        };

        let (result, captured) =
            run_with(&client, OutputFormat::OnlyTable, |ctx| export(ctx, args));

        result.unwrap();
        mock.assert();
        assert_eq!(fs::read(&dest).unwrap(), b"PK-xlsx");
        assert!(captured.out.contains("file size is 7 bytes."));
    }

    #[test]
    fn cyclonedx_export_requests_json_suffix() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("vex.json");
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
            when.method(POST)
                .path("/project/package/export")
                .json_body(json!({"projectId": 12, "suffixType": ".JSON"}));
            then.status(200).body("{}");
        });
        let client = ApiClient::new(&server.base_url()).unwrap();
        let args = CyclonedxExportArgs {
            project: project(12),
            out_file: Some(dest.clone()),
        };

        let (result, _) =
            run_with(&client, OutputFormat::OnlyJson, |ctx| cyclonedx_export(ctx, args));

        result.unwrap();
        mock.assert();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "{}");
    }

    #[test]
    fn update_sends_action_type() {
        let server = MockServer::start();
        scan_settled(&server, 12);
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/cve/process/updateCveStatus")
                .json_body(json!({
                    "projectId": 12,
                    "cveId": "CVE-2023-0464",
                    "packageName": "openssl",
                    "actionType": "Fixed"
                }));
            then.status(200)
                .json_body(json!({"code": 200, "msg": "Status updated"}));
        });
        let client = ApiClient::new(&server.base_url()).unwrap();
        let args = CveUpdateArgs {
            project: project(12),
            cve: CveIdArg {
                cve_id: Some("CVE-2023-0464".into()),
            },
            new_status: Some("Fixed".into()),
            package_name: Some("openssl".into()),
        };

        let (result, captured) =
            run_with(&client, OutputFormat::OnlyTable, |ctx| update(ctx, args));

        result.unwrap();
        mock.assert();
        assert_eq!(captured.out, "Status updated\n");
    }
}
