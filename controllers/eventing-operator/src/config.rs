//! Operator configuration.
//!
//! Resolved once at startup from environment variables and passed down
//! explicitly; nothing reads the environment after `main`.

use crate::error::ControllerError;
use crate::profile::RequestKind;
use std::env;
use std::path::PathBuf;

const DEFAULT_MANIFEST_PATH: &str = "deploy/resources";
const DEFAULT_CONTROLLERS: &str = "knativeeventing,install";
const DEFAULT_RECONCILE_CONCURRENCY: u16 = 3;

/// Operator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// File or directory holding the resource bundle (`MANIFEST_PATH`)
    pub manifest_path: PathBuf,
    /// Descend into sub-directories of `manifest_path` (`MANIFEST_RECURSIVE`)
    pub manifest_recursive: bool,
    /// Namespace in which to create a request if none exists (`INSTALL_NAMESPACE`)
    pub install_namespace: Option<String>,
    /// Namespace to watch for requests, all namespaces when unset (`WATCH_NAMESPACE`)
    pub watch_namespace: Option<String>,
    /// Controllers to run (`CONTROLLERS`)
    pub controllers: Vec<RequestKind>,
    /// Requests reconciled in parallel per controller (`RECONCILE_CONCURRENCY`)
    pub reconcile_concurrency: u16,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let manifest_recursive = match var("MANIFEST_RECURSIVE") {
            None => false,
            Some(v) => parse_bool("MANIFEST_RECURSIVE", &v)?,
        };

        let controllers = var("CONTROLLERS")
            .unwrap_or_else(|| DEFAULT_CONTROLLERS.to_string())
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<RequestKind>, _>>()?;
        if controllers.is_empty() {
            return Err(ControllerError::InvalidConfig("CONTROLLERS names no controller".to_string()));
        }

        let reconcile_concurrency = match var("RECONCILE_CONCURRENCY") {
            None => DEFAULT_RECONCILE_CONCURRENCY,
            Some(v) => v
                .parse::<u16>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ControllerError::InvalidConfig(format!(
                        "RECONCILE_CONCURRENCY must be a positive integer, got '{v}'"
                    ))
                })?,
        };

        Ok(Self {
            manifest_path: PathBuf::from(var("MANIFEST_PATH").unwrap_or_else(|| DEFAULT_MANIFEST_PATH.to_string())),
            manifest_recursive,
            install_namespace: var("INSTALL_NAMESPACE"),
            watch_namespace: var("WATCH_NAMESPACE"),
            controllers,
            reconcile_concurrency,
        })
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ControllerError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ControllerError::InvalidConfig(format!(
            "{name} must be a boolean, got '{value}'"
        ))),
    }
}
