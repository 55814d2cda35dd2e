//! Install status and its condition state machine.
//!
//! Installation progress is tracked by two component conditions:
//! - `InstallSucceeded`: `Uninitialized -> Installing -> {InstallFailed | Installed}`
//! - `DeploymentsAvailable`: `Unknown -> {NotReady | Available}`
//!
//! The `Ready` condition is never set directly. It is recomputed after every
//! transition from the component conditions: all True gives True, the first
//! False component gives False with its reason and message, anything else
//! gives Unknown.

use crate::condition::{find_condition, set_condition, Condition, ConditionStatus};
use crate::references::ResourceReference;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Bundle applied without error
pub const CONDITION_INSTALL_SUCCEEDED: &str = "InstallSucceeded";
/// Every bundle Deployment reports Available=True
pub const CONDITION_DEPLOYMENTS_AVAILABLE: &str = "DeploymentsAvailable";
/// Aggregate of the component conditions
pub const CONDITION_READY: &str = "Ready";

/// Component conditions in precedence order
pub const COMPONENT_CONDITIONS: [&str; 2] = [CONDITION_INSTALL_SUCCEEDED, CONDITION_DEPLOYMENTS_AVAILABLE];

/// Reason recorded when the bundle could not be transformed or applied
pub const REASON_INSTALL_FAILED: &str = "InstallFailed";
/// Reason recorded while a bundle Deployment is missing or unavailable
pub const REASON_DEPLOYMENTS_NOT_READY: &str = "DeploymentsNotReady";

/// Observed state shared by every install request kind
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallStatus {
    /// Operator version that last applied the bundle successfully
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Resources applied by the last successful install, in bundle order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceReference>,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Progress of the install stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    /// No conditions recorded yet
    Uninitialized,
    /// Conditions initialized, bundle not yet applied
    Installing,
    /// Last apply attempt failed
    InstallFailed,
    /// Bundle applied
    Installed,
}

/// Progress of the deployment check stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentPhase {
    /// Not yet checked
    Unknown,
    /// At least one Deployment is missing or unavailable
    NotReady,
    /// All Deployments are available
    Available,
}

impl InstallStatus {
    /// Resets every condition to Unknown.
    pub fn initialize_conditions(&mut self) {
        self.conditions.clear();
        for type_ in COMPONENT_CONDITIONS {
            set_condition(&mut self.conditions, type_, ConditionStatus::Unknown, "", "");
        }
        self.recompute_ready();
    }

    /// Returns the condition of the given type, if recorded.
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        find_condition(&self.conditions, type_)
    }

    /// Records a failed transform or apply.
    pub fn mark_install_failed(&mut self, message: &str) {
        set_condition(
            &mut self.conditions,
            CONDITION_INSTALL_SUCCEEDED,
            ConditionStatus::False,
            REASON_INSTALL_FAILED,
            message,
        );
        self.recompute_ready();
    }

    /// Records a successful apply.
    pub fn mark_install_succeeded(&mut self) {
        set_condition(&mut self.conditions, CONDITION_INSTALL_SUCCEEDED, ConditionStatus::True, "", "");
        self.recompute_ready();
    }

    /// Records that a bundle Deployment is missing or unavailable.
    pub fn mark_deployments_not_ready(&mut self, message: &str) {
        set_condition(
            &mut self.conditions,
            CONDITION_DEPLOYMENTS_AVAILABLE,
            ConditionStatus::False,
            REASON_DEPLOYMENTS_NOT_READY,
            message,
        );
        self.recompute_ready();
    }

    /// Records that every bundle Deployment is available.
    pub fn mark_deployments_available(&mut self) {
        set_condition(&mut self.conditions, CONDITION_DEPLOYMENTS_AVAILABLE, ConditionStatus::True, "", "");
        self.recompute_ready();
    }

    /// Current install phase.
    pub fn install_phase(&self) -> InstallPhase {
        match self.condition(CONDITION_INSTALL_SUCCEEDED).map(|c| c.status) {
            None => InstallPhase::Uninitialized,
            Some(ConditionStatus::Unknown) => InstallPhase::Installing,
            Some(ConditionStatus::False) => InstallPhase::InstallFailed,
            Some(ConditionStatus::True) => InstallPhase::Installed,
        }
    }

    /// Current deployment phase.
    pub fn deployment_phase(&self) -> DeploymentPhase {
        match self.condition(CONDITION_DEPLOYMENTS_AVAILABLE).map(|c| c.status) {
            None | Some(ConditionStatus::Unknown) => DeploymentPhase::Unknown,
            Some(ConditionStatus::False) => DeploymentPhase::NotReady,
            Some(ConditionStatus::True) => DeploymentPhase::Available,
        }
    }

    /// Returns true once the bundle is installed and all Deployments are available.
    pub fn is_ready(&self) -> bool {
        self.condition(CONDITION_READY).is_some_and(Condition::is_true)
    }

    fn recompute_ready(&mut self) {
        let (status, reason, message) = aggregate(&self.conditions);
        set_condition(&mut self.conditions, CONDITION_READY, status, &reason, &message);
    }
}

/// Reduces the component conditions to the `Ready` status, reason and message.
pub fn aggregate(conditions: &[Condition]) -> (ConditionStatus, String, String) {
    let components: Vec<Option<&Condition>> = COMPONENT_CONDITIONS
        .iter()
        .map(|type_| find_condition(conditions, type_))
        .collect();

    if let Some(failed) = components.iter().flatten().find(|c| c.is_false()) {
        return (ConditionStatus::False, failed.reason.clone(), failed.message.clone());
    }
    if components.iter().all(|c| c.is_some_and(Condition::is_true)) {
        return (ConditionStatus::True, String::new(), String::new());
    }
    (ConditionStatus::Unknown, String::new(), String::new())
}
