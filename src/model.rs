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

//! Request and response bodies of the scanner API.
//!
//! Response types only carry the fields the client renders; everything else
//! in a payload is ignored. A JSON `null` decodes to the field's default.

use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};
use std::str::FromStr;

/// Success value of the `code` field in every envelope.
pub const CODE_OK: i64 = 200;

/// Common accessors of the `{code, msg, ...}` envelopes.
pub trait Envelope {
    fn code(&self) -> i64;
    fn msg(&self) -> &str;
}

macro_rules! impl_envelope {
    ($($ty:ty),* $(,)?) => {
        $(impl<T> Envelope for $ty {
            fn code(&self) -> i64 {
                self.code
            }

            fn msg(&self) -> &str {
                &self.msg
            }
        })*
    };
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AjaxResult {
    #[serde_as(as = "DefaultOnNull")]
    pub code: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub msg: String,
}

impl Envelope for AjaxResult {
    fn code(&self) -> i64 {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct ApiResult<T> {
    #[serde_as(as = "DefaultOnNull")]
    pub code: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub msg: String,
    #[serde_as(as = "DefaultOnNull")]
    pub data: T,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct TableData<T> {
    #[serde_as(as = "DefaultOnNull")]
    pub code: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub msg: String,
    #[serde_as(as = "DefaultOnNull")]
    pub total: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub rows: Vec<T>,
}

impl_envelope!(ApiResult<T>, TableData<T>);

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadResult {
    #[serde_as(as = "DefaultOnNull")]
    pub code: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub msg: String,
    #[serde_as(as = "DefaultOnNull")]
    pub file_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub url: String,
}

impl Envelope for UploadResult {
    fn code(&self) -> i64 {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

// ---------------------------------------------------------------- projects

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoProject {
    #[serde_as(as = "DefaultOnNull")]
    pub project_id: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub project_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub group_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub description: String,
    #[serde_as(as = "DefaultOnNull")]
    pub last_scanned: String,
    #[serde_as(as = "DefaultOnNull")]
    pub create_by: String,
    #[serde_as(as = "DefaultOnNull")]
    pub create_time: String,
    #[serde_as(as = "DefaultOnNull")]
    pub update_time: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectCveScanStatus {
    #[serde_as(as = "DefaultOnNull")]
    pub cve_scan_status: String,
    #[serde_as(as = "DefaultOnNull")]
    pub cve_scan_error_code: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub cve_scan_rate: i64,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoManifestFile {
    #[serde_as(as = "DefaultOnNull")]
    pub distro_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub distro_version: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManifestSummary {
    #[serde_as(as = "DefaultOnNull")]
    pub packages_num: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub allowlisted_packages_num: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub cves_num: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub affected_cves_num: i64,
    #[serde(rename = "allowlistedCVEsNum")]
    #[serde_as(as = "DefaultOnNull")]
    pub allowlisted_cves_num: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
    pub project_name: String,
    pub group_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectParam {
    pub project_name: String,
    pub manifest_file: String,
    pub description: String,
    pub group_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectParam {
    pub project_id: u64,
    pub project_name: String,
    pub description: String,
    pub group_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub project_id: u64,
    pub project_name: String,
    pub scan_file_ids: Option<Vec<u64>>,
}

// ---------------------------------------------------------------- packages

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoManifest {
    #[serde_as(as = "DefaultOnNull")]
    pub manifest_id: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub project_id: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub package_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub package_version: String,
    #[serde_as(as = "DefaultOnNull")]
    pub license_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub homepage: String,
    #[serde_as(as = "DefaultOnNull")]
    pub summary: String,
    #[serde_as(as = "DefaultOnNull")]
    pub descript: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoPackage {
    #[serde_as(as = "DefaultOnNull")]
    pub manifest_id: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub package_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub package_version: String,
    #[serde_as(as = "DefaultOnNull")]
    pub package_group: String,
    #[serde_as(as = "DefaultOnNull")]
    pub package_status: String,
    #[serde_as(as = "DefaultOnNull")]
    pub license_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub homepage: String,
    #[serde_as(as = "DefaultOnNull")]
    pub summary: String,
    #[serde_as(as = "DefaultOnNull")]
    pub descript: String,
    #[serde_as(as = "DefaultOnNull")]
    pub unresolved: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub resolved: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub allowlistcves: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageQuery {
    pub project_id: u64,
    pub packages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix_type: Option<String>,
    pub strict: bool,
}

// -------------------------------------------------------------------- CVEs

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoCve {
    #[serde_as(as = "DefaultOnNull")]
    pub id: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub cve_id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub package_str: String,
    #[serde_as(as = "DefaultOnNull")]
    pub severity: String,
    #[serde_as(as = "DefaultOnNull")]
    pub cvss_score: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub has_solution: String,
    #[serde_as(as = "DefaultOnNull")]
    pub nvd_published_date: String,
    #[serde_as(as = "DefaultOnNull")]
    pub nvd_modified_date: String,
    #[serde_as(as = "DefaultOnNull")]
    pub cve_status: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CveDetail {
    #[serde_as(as = "DefaultOnNull")]
    pub cve_id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub cvss_type: String,
    #[serde_as(as = "DefaultOnNull")]
    pub has_solution: String,
    #[serde_as(as = "DefaultOnNull")]
    pub nvd_published_date: String,
    #[serde_as(as = "DefaultOnNull")]
    pub nvd_modified_date: String,
    #[serde_as(as = "DefaultOnNull")]
    pub cvss_score: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub vector_string: String,
    #[serde_as(as = "DefaultOnNull")]
    pub exploitability_score: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub attack_vector: String,
    #[serde_as(as = "DefaultOnNull")]
    pub attack_complexity: String,
    #[serde_as(as = "DefaultOnNull")]
    pub privileges_required: String,
    #[serde_as(as = "DefaultOnNull")]
    pub user_interaction: String,
    #[serde_as(as = "DefaultOnNull")]
    pub scope: String,
    #[serde_as(as = "DefaultOnNull")]
    pub impact_score: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub confidentiality_impact: String,
    #[serde_as(as = "DefaultOnNull")]
    pub integrity_impact: String,
    #[serde_as(as = "DefaultOnNull")]
    pub availability_impact: String,
    #[serde_as(as = "DefaultOnNull")]
    pub cvss_v2: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub vector_string_v2: String,
    #[serde_as(as = "DefaultOnNull")]
    pub exploitabilitiy_score_v2: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub access_vector_v2: String,
    #[serde_as(as = "DefaultOnNull")]
    pub access_complexity_v2: String,
    #[serde_as(as = "DefaultOnNull")]
    pub authentication_v2: String,
    #[serde_as(as = "DefaultOnNull")]
    pub impact_score_v2: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub confidentiality_impact_v2: String,
    #[serde_as(as = "DefaultOnNull")]
    pub integrity_impact_v2: String,
    #[serde_as(as = "DefaultOnNull")]
    pub availability_impact_v2: String,
    #[serde_as(as = "DefaultOnNull")]
    pub cwe_id: String,
    /// JSON-encoded array of [`Link`].
    #[serde_as(as = "DefaultOnNull")]
    pub link: String,
    #[serde_as(as = "DefaultOnNull")]
    pub jira_resolved_cve: Vec<JiraSolution>,
}

impl CveDetail {
    /// Decodes [`CveDetail::link`]; malformed or empty payloads yield no links.
    pub fn links(&self) -> Vec<Link> {
        serde_json::from_str(&self.link).unwrap_or_default()
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JiraSolution {
    #[serde_as(as = "DefaultOnNull")]
    pub full_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub fix_projects: i64,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Link {
    #[serde_as(as = "DefaultOnNull")]
    pub url: String,
    #[serde_as(as = "DefaultOnNull")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComparator {
    pub comparator: String,
    pub score: f64,
}

impl FromStr for ScoreComparator {
    type Err = String;

    /// Parses `"NUMERIC_LESS_THAN 8.0"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(comparator), Some(score), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!(
                "expected `COMPARATOR SCORE`, e.g. `NUMERIC_LESS_THAN 8.0`, got `{s}`"
            ));
        };
        let score = score
            .parse::<f64>()
            .map_err(|e| format!("invalid score `{score}`: {e}"))?;
        Ok(Self {
            comparator: comparator.to_string(),
            score,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CveQuery {
    pub project_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_id: Option<u64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fuzzy_query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub severity: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cvss_score: Vec<ScoreComparator>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub published_date_begin: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub published_date_end: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub modified_date_begin: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub modified_date_end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CveStatusUpdate {
    pub project_id: u64,
    pub cve_id: String,
    pub package_name: String,
    #[serde(rename = "actionType")]
    pub new_status: String,
}

// ------------------------------------------------------------------ groups

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoGroup {
    #[serde_as(as = "DefaultOnNull")]
    pub group_id: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub group_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub description: String,
    #[serde_as(as = "DefaultOnNull")]
    pub create_by: String,
    #[serde_as(as = "DefaultOnNull")]
    pub create_time: String,
    #[serde_as(as = "DefaultOnNull")]
    pub info_group_user: InfoGroupUser,
    #[serde_as(as = "DefaultOnNull")]
    pub project_list: Vec<InfoProject>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoGroupUser {
    #[serde_as(as = "DefaultOnNull")]
    pub nick_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub email: String,
    #[serde_as(as = "DefaultOnNull")]
    pub role_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupQuery {
    pub group_id: i64,
    pub group_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupParam {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    pub group_name: String,
    pub description: String,
}

// ------------------------------------------------------------------- users

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoSysUser {
    #[serde_as(as = "DefaultOnNull")]
    pub user_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub nick_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub email: String,
}
