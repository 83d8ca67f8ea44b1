//! In-memory Jira connector.
//!
//! Serves issues, projects, and users from fixed datasets. Issue keys
//! follow the `PROJ-123` convention and ids replace the dash with an
//! underscore, matching how the real API shapes them.

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

const CONNECTOR_ID: &str = "jira";

pub struct JiraMockConnector {
    datasets: BTreeMap<&'static str, Vec<Row>>,
    connected: bool,
}

impl JiraMockConnector {
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
                    "id", "key", "summary", "description", "status", "priority", "issue_type",
                    "project", "assignee", "reporter", "created_at", "updated_at", "resolved_at",
                    "labels", "story_points", "sprint",
                ],
                vec!["status", "project", "assignee", "priority", "issue_type"],
            ),
            (
                "projects",
                vec![
                    "id", "key", "name", "description", "lead", "category", "created_at",
                    "updated_at",
                ],
                vec!["category", "lead"],
            ),
            (
                "users",
                vec!["id", "email", "display_name", "account_type", "active"],
                vec!["active", "account_type"],
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

impl Default for JiraMockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for JiraMockConnector {
    fn id(&self) -> &'static str {
        CONNECTOR_ID
    }

    fn display_name(&self) -> &'static str {
        "Jira"
    }

    fn connect(&mut self, request: &ConnectRequest) -> Result<ConnectResult> {
        debug!(tenant_id = %request.tenant_id, connector = CONNECTOR_ID, "connecting");
        self.connected = true;

        let session = BTreeMap::from([
            ("connected_at".to_string(), timestamp(0)),
            ("instance_url".to_string(), json!("https://mock-company.atlassian.net")),
            ("user".to_string(), json!("mock-jira-user")),
            (
                "permissions".to_string(),
                json!(["BROWSE_PROJECTS", "CREATE_ISSUES", "EDIT_ISSUES"]),
            ),
        ]);

        Ok(ConnectResult {
            capabilities: Self::capabilities(),
            allowed_resources: vec!["PROJ1".to_string(), "PROJ2".to_string(), "PROJ3".to_string()],
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
        issue("PROJ1-101", "PROJ1", "Bug", "Login page not responsive", "In Progress", "High", Some("john_doe"), "jane_smith", 5, "Sprint 23"),
        issue("PROJ1-102", "PROJ1", "Story", "Implement dark mode", "To Do", "Medium", Some("jane_smith"), "jane_smith", 8, "Sprint 24"),
        issue("PROJ1-103", "PROJ1", "Task", "Update API documentation", "Done", "Low", Some("bob_jones"), "john_doe", 3, "Sprint 22"),
        issue("PROJ2-201", "PROJ2", "Bug", "Database connection timeout", "In Progress", "Critical", Some("john_doe"), "alice_admin", 8, "Sprint 23"),
        issue("PROJ2-202", "PROJ2", "Epic", "Microservices migration", "To Do", "High", None, "alice_admin", 21, "Sprint 25"),
        issue("PROJ2-203", "PROJ2", "Story", "User profile redesign", "In Progress", "Medium", Some("jane_smith"), "bob_jones", 13, "Sprint 23"),
        issue("PROJ3-301", "PROJ3", "Bug", "Payment gateway integration failing", "Done", "Critical", Some("bob_jones"), "john_doe", 5, "Sprint 22"),
        issue("PROJ3-302", "PROJ3", "Task", "Add unit tests for payment module", "In Progress", "Medium", Some("john_doe"), "bob_jones", 5, "Sprint 23"),
        issue("PROJ1-104", "PROJ1", "Story", "Implement 2FA authentication", "To Do", "High", Some("jane_smith"), "alice_admin", 13, "Sprint 24"),
        issue("PROJ2-204", "PROJ2", "Bug", "Memory leak in background jobs", "In Progress", "High", Some("john_doe"), "alice_admin", 8, "Sprint 23"),
    ];

    let projects = vec![
        project("PROJ1", "Project Alpha", "Main product development", "alice_admin", "Software"),
        project("PROJ2", "Project Beta", "Infrastructure and DevOps", "john_doe", "IT"),
        project("PROJ3", "Project Gamma", "Payment processing system", "bob_jones", "Business"),
    ];

    let users = vec![
        user("john_doe", "john.doe@company.com", "John Doe", "atlassian", true),
        user("jane_smith", "jane.smith@company.com", "Jane Smith", "atlassian", true),
        user("bob_jones", "bob.jones@company.com", "Bob Jones", "atlassian", true),
        user("alice_admin", "alice.admin@company.com", "Alice Admin", "atlassian", true),
        user("old_user", "old.user@company.com", "Old User", "atlassian", false),
    ];

    BTreeMap::from([("issues", issues), ("projects", projects), ("users", users)])
}

#[allow(clippy::too_many_arguments)]
fn issue(
    key: &str,
    project: &str,
    issue_type: &str,
    summary: &str,
    status: &str,
    priority: &str,
    assignee: Option<&str>,
    reporter: &str,
    story_points: u32,
    sprint: &str,
) -> Row {
    let mut labels = vec![issue_type.to_lowercase()];
    if priority == "Critical" || priority == "High" {
        labels.push("urgent".to_string());
    }

    Row::from([
        ("id".to_string(), json!(key.replace('-', "_"))),
        ("key".to_string(), json!(key)),
        ("project".to_string(), json!(project)),
        ("issue_type".to_string(), json!(issue_type)),
        ("summary".to_string(), json!(summary)),
        (
            "description".to_string(),
            json!(format!("Detailed description for {summary}")),
        ),
        ("status".to_string(), json!(status)),
        ("priority".to_string(), json!(priority)),
        ("assignee".to_string(), assignee.map_or(Value::Null, |name| json!(name))),
        ("reporter".to_string(), json!(reporter)),
        ("story_points".to_string(), json!(story_points)),
        ("sprint".to_string(), json!(sprint)),
        ("labels".to_string(), json!(labels)),
        ("created_at".to_string(), timestamp(-30)),
        ("updated_at".to_string(), timestamp(-2)),
        (
            "resolved_at".to_string(),
            if status == "Done" { timestamp(-1) } else { Value::Null },
        ),
    ])
}

fn project(key: &str, name: &str, description: &str, lead: &str, category: &str) -> Row {
    Row::from([
        ("id".to_string(), json!(format!("project_{}", key.to_lowercase()))),
        ("key".to_string(), json!(key)),
        ("name".to_string(), json!(name)),
        ("description".to_string(), json!(description)),
        ("lead".to_string(), json!(lead)),
        ("category".to_string(), json!(category)),
        ("created_at".to_string(), timestamp(-180)),
        ("updated_at".to_string(), timestamp(-1)),
    ])
}

fn user(id: &str, email: &str, display_name: &str, account_type: &str, active: bool) -> Row {
    Row::from([
        ("id".to_string(), json!(id)),
        ("email".to_string(), json!(email)),
        ("display_name".to_string(), json!(display_name)),
        ("account_type".to_string(), json!(account_type)),
        ("active".to_string(), json!(active)),
    ])
}

// ============================================================================
// Tests
// ============================================================================
