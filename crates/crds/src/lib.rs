//! Eventing Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the eventing install controllers,
//! plus the status condition state machine they share.

pub mod condition;
pub mod install;
pub mod knative_eventing;
pub mod references;
pub mod request;
pub mod status;

pub use condition::*;
pub use install::*;
pub use knative_eventing::*;
pub use references::*;
pub use request::*;
pub use status::*;
