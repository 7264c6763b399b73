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

use crate::config::Scope;
use crate::model::ScoreComparator;
use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const AFTER_HELP: &str = "\
Examples:
  sls-scan user set --userToken <TOKEN>
  sls-scan project list
  sls-scan project create --name demo --SBOMFile ./sbom.spdx.json
  sls-scan package query --projectId 12 --name openssl,zlib
  sls-scan cve query --projectId 12 --severity Critical,High -s \"NUMERIC_GREATER_THAN 7.5\"
  sls-scan --outputFormat ONLYJSON cve detail --projectId 12 --cveId CVE-2023-0464";

#[derive(Parser)]
#[command(
    name = "sls-scan",
    version,
    about = "CLI for the Studio Security Scanner API",
    long_about = "Manage projects, packages, CVEs and groups of the Studio Security Scanner \
                  from the command line. Run `sls-scan user set` first to store an API token.",
    after_help = AFTER_HELP
)]
pub struct Cli {
    #[arg(
        long = "outputFormat",
        visible_alias = "output-format",
        value_enum,
        ignore_case = true,
        global = true,
        help = "Output format; the chosen value is remembered in the config file"
    )]
    pub output_format: Option<OutputFormat>,

    #[arg(
        long,
        global = true,
        env = "SLS_SCAN_BASE_URL",
        value_name = "URL",
        help = "Base URL of the scanner API (defaults to https://studio.windriver.com/scan/api)"
    )]
    pub base_url: Option<String>,

    #[arg(
        long,
        global = true,
        env = "SLS_SCAN_LOG",
        value_name = "FILTER",
        default_value = "warn",
        help = "Log filter for diagnostics on stderr (e.g. debug, sls_scan=trace)"
    )]
    pub log_level: String,

    #[arg(
        long,
        global = true,
        value_name = "SECONDS",
        help = "Give up waiting for a running CVE scan after SECONDS (waits indefinitely by default)"
    )]
    pub wait_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Operation commands related to the project (default: list)
    #[command(visible_aliases = ["p", "proj"])]
    Project {
        #[command(subcommand)]
        action: Option<ProjectCommand>,
    },
    /// Operation commands related to the project's packages (default: query)
    #[command(visible_aliases = ["k", "pkg"])]
    Package {
        #[command(subcommand)]
        action: Option<PackageCommand>,
    },
    /// Operation commands related to the project's CVEs (default: query)
    #[command(visible_alias = "c")]
    Cve {
        #[command(subcommand)]
        action: Option<CveCommand>,
    },
    /// Operation commands related to groups (default: list)
    #[command(visible_aliases = ["g", "gr"])]
    Group {
        #[command(subcommand)]
        action: Option<GroupCommand>,
    },
    /// Set the user token or show the logged-in user (default: set)
    #[command(visible_alias = "u")]
    User {
        #[command(subcommand)]
        action: Option<UserCommand>,
    },
    /// Print the client version
    #[command(visible_aliases = ["v", "ver"])]
    Version,
    /// Show current configuration (token masked)
    ConfigShow,
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Args, Clone, Debug, Default)]
pub struct ProjectIdArg {
    #[arg(short = 'p', long = "projectId", visible_alias = "project-id", help = "Project ID")]
    pub project_id: Option<u64>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct GroupIdArg {
    #[arg(
        short = 'g',
        long = "groupId",
        visible_alias = "group-id",
        allow_negative_numbers = true,
        help = "Group ID"
    )]
    pub group_id: Option<i64>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct OutFileArg {
    #[arg(
        short = 'o',
        long = "outFile",
        visible_alias = "out-file",
        value_name = "PATH",
        help = "Destination file (defaults to a name derived from the project)"
    )]
    pub out_file: Option<PathBuf>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ProjectCommand {
    /// List projects, optionally filtered by ID, name or group
    #[command(visible_aliases = ["l", "ls", "query", "qry"])]
    List(ProjectListArgs),
    /// Show a project with its distro and manifest summary
    #[command(visible_aliases = ["d", "dtl", "view"])]
    Detail(ProjectIdArg),
    /// Upload an SBOM, create a project from it and scan it
    #[command(visible_aliases = ["c", "creat", "new", "add"])]
    Create(ProjectCreateArgs),
    /// Update a project's name, description or group
    #[command(visible_aliases = ["u", "upd", "edit"])]
    Update(ProjectUpdateArgs),
    /// Delete a project
    #[command(visible_aliases = ["del", "remove", "rm"])]
    Delete(ProjectIdArg),
    /// Rescan a project for CVEs and wait for the scan to finish
    #[command(visible_alias = "scan")]
    Rescan(ProjectIdArg),
    /// Cancel a running scan
    Cancel(ProjectIdArg),
    /// Export the project's SBOM as SPDX or CycloneDX JSON
    #[command(visible_aliases = ["e", "exp", "out"])]
    Export(ProjectExportArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct ProjectListArgs {
    #[command(flatten)]
    pub project: ProjectIdArg,
    #[arg(short = 'n', long = "name", help = "Project name filter")]
    pub name: Option<String>,
    #[command(flatten)]
    pub group: GroupIdArg,
}

#[derive(Args, Clone, Debug, Default)]
pub struct ProjectCreateArgs {
    #[arg(short = 'n', long = "name", help = "Project name")]
    pub name: Option<String>,
    #[arg(
        short = 'f',
        long = "SBOMFile",
        visible_alias = "sbom-file",
        value_name = "PATH",
        help = "SBOM file to upload"
    )]
    pub sbom_file: Option<PathBuf>,
    #[arg(short = 'd', long = "description", help = "Project description")]
    pub description: Option<String>,
    #[command(flatten)]
    pub group: GroupIdArg,
}

#[derive(Args, Clone, Debug, Default)]
pub struct ProjectUpdateArgs {
    #[command(flatten)]
    pub project: ProjectIdArg,
    #[arg(short = 'n', long = "name", help = "New project name")]
    pub name: Option<String>,
    #[arg(short = 'd', long = "description", help = "New description")]
    pub description: Option<String>,
    #[command(flatten)]
    pub group: GroupIdArg,
}

#[derive(Args, Clone, Debug, Default)]
pub struct ProjectExportArgs {
    #[command(flatten)]
    pub project: ProjectIdArg,
    #[command(flatten)]
    pub out: OutFileArg,
    #[arg(
        short = 'b',
        long = "sbomFormat",
        visible_alias = "sbom-format",
        default_value = "SPDX",
        help = "SBOM format: SPDX or CycloneDX"
    )]
    pub sbom_format: String,
}

#[derive(Subcommand, Clone, Debug)]
pub enum PackageCommand {
    /// List the packages of a project
    #[command(visible_aliases = ["q", "qry", "list", "ls", "l"])]
    Query(PackageQueryArgs),
    /// Show a package and its CVEs, by package ID or by name
    #[command(visible_aliases = ["d", "dtl", "view"])]
    Detail(PackageDetailArgs),
    /// Export the package list as an Excel workbook
    #[command(visible_aliases = ["e", "exp", "out"])]
    Export(PackageExportArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct PackageQueryArgs {
    #[command(flatten)]
    pub project: ProjectIdArg,
    #[arg(short = 'n', long = "name", help = "Package names, comma-separated")]
    pub name: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct PackageDetailArgs {
    #[command(flatten)]
    pub project: ProjectIdArg,
    #[arg(short = 'm', long = "packageId", visible_alias = "package-id", help = "Package ID")]
    pub package_id: Option<u64>,
    #[arg(short = 'n', long = "name", help = "Package name")]
    pub name: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct PackageExportArgs {
    #[command(flatten)]
    pub project: ProjectIdArg,
    #[arg(short = 'n', long = "name", help = "Package names, comma-separated")]
    pub name: Option<String>,
    #[command(flatten)]
    pub out: OutFileArg,
}

#[derive(Subcommand, Clone, Debug)]
pub enum CveCommand {
    /// List the CVEs of a project
    #[command(visible_aliases = ["q", "qry", "list", "ls", "l"])]
    Query(CveFilterArgs),
    /// Show the vulnerability details of one CVE
    #[command(visible_aliases = ["d", "dtl", "view"])]
    Detail(CveDetailArgs),
    /// Export the CVE list as an Excel workbook
    #[command(visible_aliases = ["e", "exp", "out"])]
    Export(CveExportArgs),
    /// Export the CycloneDX SBOM and VEX report
    #[command(name = "cyclonedxExport", visible_alias = "cyclonedx-export")]
    CyclonedxExport(CyclonedxExportArgs),
    /// Change the status of a CVE for one package
    #[command(visible_aliases = ["u", "upd", "edit"])]
    Update(CveUpdateArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct CveFilterArgs {
    #[command(flatten)]
    pub project: ProjectIdArg,
    #[arg(
        short = 'z',
        long = "fuzzyQuery",
        visible_alias = "fuzzy-query",
        help = "Free-text filter"
    )]
    pub fuzzy_query: Option<String>,
    #[arg(
        short = 'v',
        long = "severity",
        value_delimiter = ',',
        help = "Severities: Critical, High, Medium, Low, None"
    )]
    pub severity: Vec<String>,
    #[arg(
        short = 'u',
        long = "status",
        value_delimiter = ',',
        help = "CVE statuses, e.g. Unresolved, Resolved, Allowlisted"
    )]
    pub status: Vec<String>,
    #[arg(
        short = 's',
        long = "scoreComparator",
        visible_alias = "score-comparator",
        value_name = "COMPARATOR SCORE",
        help = "CVSS filter, repeatable, e.g. \"NUMERIC_LESS_THAN 8.0\""
    )]
    pub score_comparator: Vec<ScoreComparator>,
    #[arg(short = 'B', long = "publishedDateBegin", visible_alias = "published-date-begin")]
    pub published_date_begin: Option<String>,
    #[arg(short = 'E', long = "publishedDateEnd", visible_alias = "published-date-end")]
    pub published_date_end: Option<String>,
    #[arg(short = 'M', long = "modifiedDateBegin", visible_alias = "modified-date-begin")]
    pub modified_date_begin: Option<String>,
    #[arg(short = 'D', long = "modifiedDateEnd", visible_alias = "modified-date-end")]
    pub modified_date_end: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct CveIdArg {
    #[arg(
        short = 'c',
        long = "cveId",
        visible_alias = "cve-id",
        help = "CVE ID, e.g. CVE-2023-0464"
    )]
    pub cve_id: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct CveDetailArgs {
    #[command(flatten)]
    pub project: ProjectIdArg,
    #[command(flatten)]
    pub cve: CveIdArg,
}

#[derive(Args, Clone, Debug, Default)]
pub struct CveExportArgs {
    #[command(flatten)]
    pub filter: CveFilterArgs,
    #[command(flatten)]
    pub out: OutFileArg,
}

#[derive(Args, Clone, Debug, Default)]
pub struct CyclonedxExportArgs {
    #[command(flatten)]
    pub project: ProjectIdArg,
    #[arg(
        short = 'o',
        long = "outFile",
        visible_alias = "out-file",
        value_name = "PATH",
        value_parser = json_file,
        help = "Destination file, must end with .json"
    )]
    pub out_file: Option<PathBuf>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct CveUpdateArgs {
    #[command(flatten)]
    pub project: ProjectIdArg,
    #[command(flatten)]
    pub cve: CveIdArg,
    #[arg(
        short = 'a',
        long = "newStatus",
        visible_alias = "new-status",
        help = "New status, e.g. Fixed, Ignored, Allowlisted, Unresolved"
    )]
    pub new_status: Option<String>,
    #[arg(
        short = 'N',
        long = "packageName",
        visible_alias = "package-name",
        help = "Affected package"
    )]
    pub package_name: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum GroupCommand {
    /// List groups
    #[command(visible_aliases = ["l", "ls", "query", "qry"])]
    List(GroupListArgs),
    /// Show a group
    #[command(visible_aliases = ["d", "dtl", "view"])]
    Detail(GroupIdArg),
    /// Create a group
    #[command(visible_aliases = ["c", "creat", "new", "add"])]
    Create(GroupCreateArgs),
    /// Rename a group or change its description
    #[command(visible_aliases = ["u", "upd", "edit"])]
    Update(GroupUpdateArgs),
    /// Delete a group
    #[command(visible_aliases = ["del", "remove", "rm"])]
    Delete(GroupIdArg),
    /// List the members of a group
    #[command(visible_alias = "member")]
    Members(GroupIdArg),
    /// List the projects shared in a group
    #[command(visible_alias = "project")]
    Projects(GroupIdArg),
}

#[derive(Args, Clone, Debug, Default)]
pub struct GroupListArgs {
    #[command(flatten)]
    pub group: GroupIdArg,
    #[arg(short = 'n', long = "name", help = "Group name filter")]
    pub name: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct GroupCreateArgs {
    #[arg(short = 'n', long = "name", help = "Group name")]
    pub name: Option<String>,
    #[arg(short = 'd', long = "description", help = "Group description")]
    pub description: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct GroupUpdateArgs {
    #[command(flatten)]
    pub group: GroupIdArg,
    #[arg(short = 'n', long = "name", help = "New group name")]
    pub name: Option<String>,
    #[arg(short = 'd', long = "description", help = "New description")]
    pub description: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum UserCommand {
    /// Verify a user token and store it
    Set {
        #[arg(short = 't', long = "userToken", visible_alias = "user-token", help = "API token")]
        user_token: Option<String>,
        #[arg(
            long,
            value_enum,
            help = "Where to store the token (defaults to ./sls-scan.yaml if present, else the user config)"
        )]
        scope: Option<ScopeArg>,
    },
    /// Show the logged-in user
    Get,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ScopeArg {
    Local,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Local => Scope::Local,
            ScopeArg::User => Scope::User,
        }
    }
}

fn json_file(value: &str) -> Result<PathBuf, String> {
    if value.ends_with(".json") || value.ends_with(".JSON") {
        Ok(PathBuf::from(value))
    } else {
        Err("invalid file, must end with .json or .JSON".to_string())
    }
}
