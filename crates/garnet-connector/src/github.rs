//! In-memory GitHub connector.
//!
//! Serves three resources (issues, pulls, repositories) from fixed
//! datasets, standing in for the REST API during development and tests.

use std::collections::BTreeMap;

use garnet_types::Row;
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    Connector,
    capabilities::{Capabilities, ConnectRequest, ConnectResult, RowPage, ScanRequest},
    error::{ConnectorError, Result},
    fixtures::timestamp,
    scan::scan_rows,
};

const CONNECTOR_ID: &str = "github";

pub struct GitHubMockConnector {
    datasets: BTreeMap<&'static str, Vec<Row>>,
    connected: bool,
}

impl GitHubMockConnector {
    pub fn new() -> Self {
        Self {
            datasets: build_datasets(),
            connected: false,
        }
    }

    fn capabilities() -> Capabilities {
        let mut capabilities = Capabilities::default();
        for (resource, columns, pushdown) in [
            (
                "issues",
                vec![
                    "id", "number", "title", "state", "labels", "assignee", "created_at",
                    "updated_at", "closed_at", "body", "repository", "author",
                ],
                vec!["state", "repository", "assignee", "labels"],
            ),
            (
                "pulls",
                vec![
                    "id", "number", "title", "state", "created_at", "updated_at", "merged_at",
                    "head_ref", "base_ref", "repository", "author", "draft",
                ],
                vec!["state", "repository", "draft"],
            ),
            (
                "repositories",
                vec![
                    "id", "name", "full_name", "description", "private", "language",
                    "stargazers_count", "forks_count", "created_at", "updated_at",
                ],
                vec!["language", "private"],
            ),
        ] {
            capabilities.resources.insert(resource.to_string());
            capabilities.columns.insert(
                resource.to_string(),
                columns.into_iter().map(str::to_string).collect(),
            );
            capabilities.pushdown_fields.insert(
                resource.to_string(),
                pushdown.into_iter().map(str::to_string).collect(),
            );
        }
        capabilities
    }
}

impl Default for GitHubMockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for GitHubMockConnector {
    fn id(&self) -> &'static str {
        CONNECTOR_ID
    }

    fn display_name(&self) -> &'static str {
        "GitHub"
    }

    fn connect(&mut self, request: &ConnectRequest) -> Result<ConnectResult> {
        debug!(tenant_id = %request.tenant_id, connector = CONNECTOR_ID, "connecting");
        self.connected = true;

        // A real implementation would validate the OAuth token here and
        // list the repositories the principal can reach.
        let session = BTreeMap::from([
            ("connected_at".to_string(), timestamp(0)),
            ("user".to_string(), json!("mock-user")),
            ("scopes".to_string(), json!(["repo", "read:org", "read:user"])),
        ]);

        Ok(ConnectResult {
            capabilities: Self::capabilities(),
            allowed_resources: vec![
                "org/repo1".to_string(),
                "org/repo2".to_string(),
                "user/personal-project".to_string(),
            ],
            session,
        })
    }

    fn scan(&self, request: &ScanRequest) -> Result<RowPage> {
        if !self.connected {
            return Err(ConnectorError::config(
                CONNECTOR_ID,
                "Connector not connected. Call connect() first.",
            ));
        }
        let rows = self
            .datasets
            .get(request.resource.as_str())
            .cloned()
            .ok_or_else(|| {
                ConnectorError::not_found(
                    CONNECTOR_ID,
                    format!("Unknown resource: {}", request.resource),
                )
            })?;
        Ok(scan_rows(rows, request))
    }

    fn close(&mut self) {
        self.connected = false;
    }
}

// ============================================================================
// Fixture data
// ============================================================================

fn build_datasets() -> BTreeMap<&'static str, Vec<Row>> {
    let issues = vec![
        issue(1, "org/repo1", "Bug in login page", "open", "bug", Some("john_doe")),
        issue(2, "org/repo1", "Add dark mode", "open", "enhancement", Some("jane_smith")),
        issue(3, "org/repo2", "Update documentation", "closed", "documentation", Some("bob_jones")),
        issue(4, "org/repo1", "Performance issue", "open", "bug", Some("john_doe")),
        issue(5, "user/personal-project", "Refactor codebase", "open", "refactoring", Some("john_doe")),
        issue(6, "org/repo2", "Security vulnerability", "closed", "security", Some("jane_smith")),
        issue(7, "org/repo1", "Feature request: API v2", "open", "enhancement", None),
        issue(8, "org/repo2", "CI/CD pipeline failing", "open", "ci", Some("bob_jones")),
    ];

    let pulls = vec![
        pull(101, "org/repo1", "Fix login bug", "open", "fix/login-bug", "main", false, "john_doe"),
        pull(102, "org/repo1", "Add dark mode UI", "open", "feature/dark-mode", "main", false, "jane_smith"),
        pull(103, "org/repo2", "Update README", "merged", "docs/update-readme", "main", false, "bob_jones"),
        pull(104, "org/repo1", "WIP: Refactoring", "open", "refactor/cleanup", "main", true, "john_doe"),
        pull(105, "org/repo2", "Security patch", "merged", "security/patch-cve", "main", false, "jane_smith"),
        pull(106, "user/personal-project", "Improve performance", "open", "perf/optimization", "develop", false, "john_doe"),
    ];

    let repositories = vec![
        repository(1001, "repo1", "org/repo1", "Main application repository", false, "Java", 145, 23),
        repository(1002, "repo2", "org/repo2", "Documentation site", false, "Python", 89, 12),
        repository(1003, "personal-project", "user/personal-project", "Personal experiments", true, "JavaScript", 5, 0),
    ];

    BTreeMap::from([
        ("issues", issues),
        ("pulls", pulls),
        ("repositories", repositories),
    ])
}

fn issue(
    number: u32,
    repository: &str,
    title: &str,
    state: &str,
    label: &str,
    assignee: Option<&str>,
) -> Row {
    Row::from([
        ("id".to_string(), json!(format!("issue_{number}"))),
        ("number".to_string(), json!(number)),
        ("repository".to_string(), json!(repository)),
        ("title".to_string(), json!(title)),
        ("state".to_string(), json!(state)),
        ("labels".to_string(), json!([label])),
        ("assignee".to_string(), assignee.map_or(Value::Null, |name| json!(name))),
        ("author".to_string(), json!(assignee.unwrap_or("unknown_user"))),
        ("body".to_string(), json!(format!("This is the body of issue #{number}"))),
        ("created_at".to_string(), timestamp(-30)),
        ("updated_at".to_string(), timestamp(-5)),
        (
            "closed_at".to_string(),
            if state == "closed" { timestamp(-1) } else { Value::Null },
        ),
    ])
}

#[allow(clippy::fn_params_excessive_bools)]
fn pull(
    number: u32,
    repository: &str,
    title: &str,
    state: &str,
    head_ref: &str,
    base_ref: &str,
    draft: bool,
    author: &str,
) -> Row {
    Row::from([
        ("id".to_string(), json!(format!("pr_{number}"))),
        ("number".to_string(), json!(number)),
        ("repository".to_string(), json!(repository)),
        ("title".to_string(), json!(title)),
        ("state".to_string(), json!(state)),
        ("head_ref".to_string(), json!(head_ref)),
        ("base_ref".to_string(), json!(base_ref)),
        ("draft".to_string(), json!(draft)),
        ("author".to_string(), json!(author)),
        ("created_at".to_string(), timestamp(-20)),
        ("updated_at".to_string(), timestamp(-3)),
        (
            "merged_at".to_string(),
            if state == "merged" { timestamp(-1) } else { Value::Null },
        ),
    ])
}

fn repository(
    id: u32,
    name: &str,
    full_name: &str,
    description: &str,
    private: bool,
    language: &str,
    stars: u32,
    forks: u32,
) -> Row {
    Row::from([
        ("id".to_string(), json!(format!("repo_{id}"))),
        ("name".to_string(), json!(name)),
        ("full_name".to_string(), json!(full_name)),
        ("description".to_string(), json!(description)),
        ("private".to_string(), json!(private)),
        ("language".to_string(), json!(language)),
        ("stargazers_count".to_string(), json!(stars)),
        ("forks_count".to_string(), json!(forks)),
        ("created_at".to_string(), timestamp(-365)),
        ("updated_at".to_string(), timestamp(-2)),
    ])
}

// ============================================================================
// Tests
// ============================================================================
