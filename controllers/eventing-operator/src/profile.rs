//! Controller profiles.
//!
//! A profile turns the generic convergence engine into one concrete
//! controller: which stages run, which cluster roles get the platform policy
//! rule, and which request document the bootstrap task creates.

use crate::error::ControllerError;
use std::fmt;
use std::str::FromStr;

/// One step of a reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Initialize status conditions on first observation
    InitStatus,
    /// Transform and apply the bundle
    Install,
    /// Aggregate the readiness of the bundle's Deployments
    CheckDeployments,
}

/// Request kinds the operator can reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// `KnativeEventing` requests
    KnativeEventing,
    /// `Install` requests
    Install,
}

impl RequestKind {
    /// Profile driving this kind's controller.
    pub fn profile(self) -> &'static Profile {
        match self {
            Self::KnativeEventing => &KNATIVE_EVENTING,
            Self::Install => &INSTALL,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().kind)
    }
}

impl FromStr for RequestKind {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "knativeeventing" => Ok(Self::KnativeEventing),
            "install" => Ok(Self::Install),
            other => Err(ControllerError::InvalidConfig(format!(
                "unknown controller '{other}', expected 'knativeeventing' or 'install'"
            ))),
        }
    }
}

/// Static configuration of one controller instance
#[derive(Debug)]
pub struct Profile {
    /// Kind of the reconciled request, for logging
    pub kind: &'static str,
    /// Stages run by every reconcile, in order
    pub stages: &'static [Stage],
    /// Cluster roles that receive the security context constraints rule
    pub scc_cluster_roles: &'static [&'static str],
    /// Request document created by the bootstrap task, if any
    pub default_request_path: Option<&'static str>,
}

/// Profile of the `KnativeEventing` controller
pub static KNATIVE_EVENTING: Profile = Profile {
    kind: "KnativeEventing",
    stages: &[Stage::InitStatus, Stage::Install, Stage::CheckDeployments],
    scc_cluster_roles: &[
        "addressable-resolver",
        "broker-addressable-resolver",
        "channel-addressable-resolver",
        "eventing-broker-filter",
        "in-memory-channel-controller",
        "in-memory-channel-dispatcher",
        "knative-eventing-controller",
        "knative-eventing-webhook",
        "serving-addressable-resolver",
    ],
    default_request_path: None,
};

/// Profile of the `Install` controller
pub static INSTALL: Profile = Profile {
    kind: "Install",
    stages: &[Stage::Install],
    scc_cluster_roles: &[
        "eventing-broker-filter",
        "knative-eventing-controller",
        "in-memory-channel-controller",
        "in-memory-channel-dispatcher",
        "eventing-sources-controller",
    ],
    default_request_path: Some("deploy/crds/eventing_v1alpha1_install_cr.yaml"),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_kind() {
        assert_eq!("KnativeEventing".parse::<RequestKind>().unwrap(), RequestKind::KnativeEventing);
        assert_eq!(" install ".parse::<RequestKind>().unwrap(), RequestKind::Install);
        assert!(matches!(
            "serving".parse::<RequestKind>(),
            Err(ControllerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_profiles() {
        let ke = RequestKind::KnativeEventing.profile();
        assert_eq!(ke.stages, &[Stage::InitStatus, Stage::Install, Stage::CheckDeployments]);
        assert!(ke.default_request_path.is_none());

        let install = RequestKind::Install.profile();
        assert_eq!(install.stages, &[Stage::Install]);
        assert!(install.scc_cluster_roles.contains(&"eventing-sources-controller"));
        assert_eq!(RequestKind::Install.to_string(), "Install");
    }
}
