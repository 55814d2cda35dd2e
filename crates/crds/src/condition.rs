//! Status conditions
//!
//! Kubernetes-style conditions shared by every install request kind. A
//! condition list holds at most one entry per condition type.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state condition status, serialized as "True", "False" or "Unknown".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum ConditionStatus {
    /// The condition holds
    True,

    /// The condition does not hold
    False,

    /// Not yet determined
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("True"),
            Self::False => f.write_str("False"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

/// A single observed aspect of an install request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type (e.g. "InstallSucceeded")
    #[serde(rename = "type")]
    pub type_: String,

    /// Current status of the condition
    pub status: ConditionStatus,

    /// Machine-readable reason for the last transition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable detail
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Last time the status changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    /// Creates a condition stamped with the current time.
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Some(Utc::now()),
        }
    }

    /// Returns true when the status is `True`.
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    /// Returns true when the status is `False`.
    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }
}

/// Finds a condition by type.
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Update or add a condition to the conditions list.
///
/// The transition time only moves when the status actually changes, so
/// re-asserting the same state leaves the list byte-for-byte identical.
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    type_: &str,
    status: ConditionStatus,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.type_ == type_) {
        if existing.status != status {
            existing.last_transition_time = Some(Utc::now());
        }
        existing.status = status;
        existing.reason = reason.to_string();
        existing.message = message.to_string();
    } else {
        conditions.push(Condition::new(type_, status, reason, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_condition_adds_new() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, "Ready", ConditionStatus::True, "AllGood", "");

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].type_, "Ready");
        assert!(conditions[0].is_true());
    }

    #[test]
    fn test_set_condition_keeps_one_entry_per_type() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, "Ready", ConditionStatus::Unknown, "", "");
        set_condition(&mut conditions, "Ready", ConditionStatus::False, "Broken", "boom");

        assert_eq!(conditions.len(), 1);
        assert!(conditions[0].is_false());
        assert_eq!(conditions[0].reason, "Broken");
        assert_eq!(conditions[0].message, "boom");
    }

    #[test]
    fn test_set_condition_same_status_keeps_transition_time() {
        let stamp = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut conditions = vec![Condition {
            type_: "Ready".to_string(),
            status: ConditionStatus::True,
            reason: String::new(),
            message: String::new(),
            last_transition_time: Some(stamp),
        }];

        set_condition(&mut conditions, "Ready", ConditionStatus::True, "", "");
        assert_eq!(conditions[0].last_transition_time, Some(stamp));

        set_condition(&mut conditions, "Ready", ConditionStatus::False, "Down", "");
        assert_ne!(conditions[0].last_transition_time, Some(stamp));
    }

    #[test]
    fn test_condition_status_serializes_as_pascal_case() {
        let condition = Condition::new("Ready", ConditionStatus::Unknown, "", "");
        let json = serde_json::to_value(&condition).unwrap();

        assert_eq!(json["type"], "Ready");
        assert_eq!(json["status"], "Unknown");
        assert!(json.get("reason").is_none());
    }
}
