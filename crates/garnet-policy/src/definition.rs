//! Stored policy definitions.
//!
//! [`PolicyDefinition`] is the serialization shape policies live in at
//! rest: strings for type and action, a free-form JSON config for the
//! per-type payload. [`PolicyDefinition::to_policy`] converts one into the
//! strongly-typed [`Policy`], validating as it goes. Conversion is where
//! condition text gets parsed, so a stored policy is parsed exactly once
//! per load, not once per request.

use garnet_types::{FilterOperator, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    condition::Condition,
    mask::MaskKind,
    policy::{AccessAction, Policy, PolicyRule, RowFilter},
};

// ============================================================================
// Errors
// ============================================================================

/// Errors converting a stored definition into a [`Policy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("policy for tenant {tenant_id}: policy_id must not be empty")]
    EmptyPolicyId { tenant_id: TenantId },

    #[error("policy {policy_id}: unknown policy type '{policy_type}'")]
    UnknownType {
        policy_id: String,
        policy_type: String,
    },

    #[error("policy {policy_id}: action '{action}' is not valid for {policy_type} policies")]
    InvalidAction {
        policy_id: String,
        policy_type: String,
        action: String,
    },

    #[error("policy {policy_id}: config is missing required field '{field}'")]
    MissingField { policy_id: String, field: String },
}

// ============================================================================
// PolicyDefinition
// ============================================================================

/// The at-rest shape of one policy.
///
/// `config` carries the per-type payload:
/// - `RLS`: `{"column": ..., "operator": ..., "value": ...}` (operator
///   defaults to `=` when absent or unrecognized)
/// - `CLS`: `{"denied_columns": [...]}` or `{"allowed_columns": [...]}`
///   depending on the action
/// - `MASK`: `{"column": ..., "mask_type": ...}` (mask type defaults to
///   `FULL` when unrecognized)
/// - `TABLE_ACCESS`: no config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    pub tenant_id: TenantId,
    pub policy_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub policy_type: String,
    #[serde(default)]
    pub source_pattern: Option<String>,
    #[serde(default)]
    pub table_pattern: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    pub action: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl PolicyDefinition {
    /// Converts this definition into a validated [`Policy`].
    pub fn to_policy(&self) -> Result<Policy, DefinitionError> {
        // `Policy::new` asserts on an empty id; external input must reach
        // it only after validation so one bad row cannot abort a batch.
        if self.policy_id.is_empty() {
            return Err(DefinitionError::EmptyPolicyId {
                tenant_id: self.tenant_id.clone(),
            });
        }

        let rule = self.parse_rule()?;

        let mut policy = Policy::new(self.policy_id.clone(), rule).with_priority(self.priority);
        if let Some(pattern) = &self.source_pattern {
            policy = policy.with_source_pattern(pattern.clone());
        }
        if let Some(pattern) = &self.table_pattern {
            policy = policy.with_table_pattern(pattern.clone());
        }
        if let Some(condition) = &self.condition {
            policy = policy.with_condition(Condition::parse(condition));
        }
        Ok(policy)
    }

    fn parse_rule(&self) -> Result<PolicyRule, DefinitionError> {
        match self.policy_type.trim().to_uppercase().as_str() {
            "TABLE_ACCESS" => Ok(PolicyRule::TableAccess {
                action: self.parse_access_action()?,
            }),
            "RLS" => {
                let column = self.required_string("column")?;
                let operator = self
                    .config_str("operator")
                    .and_then(|symbol| symbol.parse().ok())
                    .unwrap_or(FilterOperator::Equals);
                let value = self.required_string("value")?;
                Ok(PolicyRule::RowFilter(
                    RowFilter::new(column, operator, value).from_policy(self.policy_id.clone()),
                ))
            }
            "CLS" => {
                let action = self.parse_access_action()?;
                let field = match action {
                    AccessAction::Deny => "denied_columns",
                    AccessAction::Allow => "allowed_columns",
                };
                let columns = self
                    .config
                    .get(field)
                    .and_then(Value::as_array)
                    .map(|columns| {
                        columns
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(PolicyRule::Columns { action, columns })
            }
            "MASK" => {
                let column = self.required_string("column")?;
                let mask = self
                    .config_str("mask_type")
                    .map_or(MaskKind::Full, MaskKind::parse_or_full);
                Ok(PolicyRule::MaskColumn { column, mask })
            }
            other => Err(DefinitionError::UnknownType {
                policy_id: self.policy_id.clone(),
                policy_type: other.to_string(),
            }),
        }
    }

    fn parse_access_action(&self) -> Result<AccessAction, DefinitionError> {
        match self.action.trim().to_uppercase().as_str() {
            "ALLOW" => Ok(AccessAction::Allow),
            "DENY" => Ok(AccessAction::Deny),
            other => Err(DefinitionError::InvalidAction {
                policy_id: self.policy_id.clone(),
                policy_type: self.policy_type.clone(),
                action: other.to_string(),
            }),
        }
    }

    fn config_str(&self, field: &str) -> Option<&str> {
        self.config.get(field).and_then(Value::as_str)
    }

    fn required_string(&self, field: &str) -> Result<String, DefinitionError> {
        self.config_str(field)
            .map(str::to_string)
            .ok_or_else(|| DefinitionError::MissingField {
                policy_id: self.policy_id.clone(),
                field: field.to_string(),
            })
    }
}

// ============================================================================
// Tests
// ============================================================================
