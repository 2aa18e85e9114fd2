//! Configuration management for svcctl.
//!
//! A manifest lists the services to install and, optionally, the timing
//! settings the facade uses. Environment variables referenced as `${VAR}` or
//! `$VAR` are expanded before the YAML is parsed.
use regex::Regex;
use serde::Deserialize;
use std::{collections::HashMap, env, fs, path::Path, str::FromStr, time::Duration};
use tracing::warn;

use crate::constants::{
    DEFAULT_RESTART_TIMEOUT, DEFAULT_START_STOP_TIMEOUT, STATUS_POLL_INTERVAL,
    UNINSTALL_STOP_TIMEOUT,
};
use crate::error::ServiceManagerError;
use crate::service::{ServiceSpec, ServiceStartMode};

/// Default manifest file name.
pub const DEFAULT_MANIFEST: &str = "services.yaml";

/// Timing knobs of [`crate::manager::ServiceManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerSettings {
    /// Delay between status refreshes while waiting for a transition.
    pub poll_interval: Duration,
    /// Budget of `start`/`stop` when no timeout is passed.
    pub default_timeout: Duration,
    /// Budget of each half of `restart` when no timeout is passed.
    pub restart_timeout: Duration,
    /// Budget of the best-effort stop that precedes an uninstall.
    pub uninstall_stop_timeout: Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            poll_interval: STATUS_POLL_INTERVAL,
            default_timeout: DEFAULT_START_STOP_TIMEOUT,
            restart_timeout: DEFAULT_RESTART_TIMEOUT,
            uninstall_stop_timeout: UNINSTALL_STOP_TIMEOUT,
        }
    }
}

/// `settings:` block as written in the manifest.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct SettingsConfig {
    pub poll_interval: Option<String>,
    pub default_timeout: Option<String>,
    pub restart_timeout: Option<String>,
    pub uninstall_stop_timeout: Option<String>,
}

impl SettingsConfig {
    /// Resolves the written durations over the defaults.
    pub fn resolve(&self) -> Result<ManagerSettings, ServiceManagerError> {
        let defaults = ManagerSettings::default();
        let pick = |raw: &Option<String>, fallback: Duration| {
            raw.as_deref().map(parse_duration).unwrap_or(Ok(fallback))
        };

        Ok(ManagerSettings {
            poll_interval: pick(&self.poll_interval, defaults.poll_interval)?,
            default_timeout: pick(&self.default_timeout, defaults.default_timeout)?,
            restart_timeout: pick(&self.restart_timeout, defaults.restart_timeout)?,
            uninstall_stop_timeout: pick(
                &self.uninstall_stop_timeout,
                defaults.uninstall_stop_timeout,
            )?,
        })
    }
}

/// Configuration for an individual service.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceEntry {
    /// Executable the service launches.
    pub exe_path: String,
    /// Arguments appended verbatim to the executable.
    pub arguments: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// `automatic`, `manual` or `disabled`.
    pub start_mode: Option<String>,
    #[serde(default)]
    pub delayed_auto_start: bool,
}

impl ServiceEntry {
    /// Builds the spec for the service registered as `name`.
    pub fn to_spec(&self, name: &str) -> ServiceSpec {
        ServiceSpec {
            name: name.to_string(),
            exe_path: self.exe_path.clone(),
            arguments: self.arguments.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            start_mode: self.start_mode(name),
            delayed_auto_start: self.delayed_auto_start,
        }
    }

    /// Unrecognized start modes fall back to demand start.
    fn start_mode(&self, name: &str) -> ServiceStartMode {
        match self.start_mode.as_deref() {
            None => ServiceStartMode::default(),
            Some(raw) => ServiceStartMode::from_str(raw.trim()).unwrap_or_else(|_| {
                warn!("Unknown start mode '{raw}' for '{name}'; using manual");
                ServiceStartMode::Manual
            }),
        }
    }
}

/// Represents the structure of the manifest file.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    /// Manifest version.
    pub version: String,
    /// Optional timing settings.
    #[serde(default)]
    pub settings: SettingsConfig,
    /// Map of service names to their respective configurations.
    #[serde(default)]
    pub services: HashMap<String, ServiceEntry>,
}

impl Manifest {
    /// Specs of every declared service, sorted by name.
    pub fn specs(&self) -> Vec<ServiceSpec> {
        let mut names: Vec<&String> = self.services.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| self.services[name].to_spec(name))
            .collect()
    }

    /// Spec of a single declared service.
    pub fn spec(&self, name: &str) -> Option<ServiceSpec> {
        self.services.get(name).map(|entry| entry.to_spec(name))
    }

    pub fn manager_settings(&self) -> Result<ManagerSettings, ServiceManagerError> {
        self.settings.resolve()
    }
}

/// Expands environment variables within a string.
fn expand_env_vars(input: &str) -> Result<String, ServiceManagerError> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .map_err(|err| ServiceManagerError::InvalidConfig(err.to_string()))?;

    let mut missing = Vec::new();
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var_name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        env::var(var_name).unwrap_or_else(|_| {
            missing.push(var_name.to_string());
            String::new()
        })
    });

    if !missing.is_empty() {
        return Err(ServiceManagerError::InvalidConfig(format!(
            "Missing environment variable(s): {}",
            missing.join(", ")
        )));
    }

    Ok(expanded.into_owned())
}

/// Parses the manifest text, expanding environment variables first.
pub fn parse_manifest(content: &str) -> Result<Manifest, ServiceManagerError> {
    let expanded = expand_env_vars(content)?;
    let manifest: Manifest =
        serde_yaml::from_str(&expanded).map_err(ServiceManagerError::ConfigParseError)?;
    manifest.manager_settings()?;
    Ok(manifest)
}

/// Loads and parses a manifest file. Defaults to [`DEFAULT_MANIFEST`].
pub fn load_manifest(path: Option<&str>) -> Result<Manifest, ServiceManagerError> {
    let path = Path::new(path.unwrap_or(DEFAULT_MANIFEST));
    let content = fs::read_to_string(path).map_err(|e| {
        ServiceManagerError::ConfigReadError(std::io::Error::new(
            e.kind(),
            format!("{} ({})", e, path.display()),
        ))
    })?;
    parse_manifest(&content)
}

/// Parses a user-facing duration string in the format `<number>[ms|s|m|h]`.
pub fn parse_duration(raw: &str) -> Result<Duration, ServiceManagerError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ServiceManagerError::InvalidConfig(
            "Duration value cannot be empty".into(),
        ));
    }

    let (amount_str, unit_millis) = if let Some(stripped) = value.strip_suffix("ms") {
        (stripped.trim(), 1)
    } else if let Some(stripped) = value.strip_suffix('s') {
        (stripped.trim(), 1_000)
    } else if let Some(stripped) = value.strip_suffix('m') {
        (stripped.trim(), 60_000)
    } else if let Some(stripped) = value.strip_suffix('h') {
        (stripped.trim(), 3_600_000)
    } else {
        (value, 1_000)
    };

    let amount: u64 = amount_str.parse().map_err(|_| {
        ServiceManagerError::InvalidConfig(format!("Invalid duration value: '{raw}'"))
    })?;

    Ok(Duration::from_millis(amount.saturating_mul(unit_millis)))
}
