//! Value types describing a service: what to install and what was observed.
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Startup behaviour of a service.
///
/// The discriminants equal the native start-type codes and are handed to the
/// SCM unchanged.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[repr(u32)]
pub enum ServiceStartMode {
    /// Started by the SCM at boot.
    #[default]
    Automatic = 2,
    /// Started on demand.
    Manual = 3,
    /// Cannot be started.
    Disabled = 4,
}

impl ServiceStartMode {
    /// Native start-type code passed to create/change config calls.
    pub const fn native_start_type(self) -> u32 {
        self as u32
    }
}

/// Operational state of a service.
///
/// The numeric values are part of the public contract and must stay stable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[repr(u8)]
pub enum ServiceStatus {
    Unknown = 0,
    /// Synthetic: the service could not be resolved.
    NotInstalled = 1,
    Stopped = 2,
    StartPending = 3,
    StopPending = 4,
    Running = 5,
    PausePending = 6,
    Paused = 7,
    ContinuePending = 8,
}

impl ServiceStatus {
    /// Maps a native `dwCurrentState` value. Anything unrecognized is `Unknown`.
    pub const fn from_native(state: u32) -> Self {
        match state {
            1 => Self::Stopped,
            2 => Self::StartPending,
            3 => Self::StopPending,
            4 => Self::Running,
            5 => Self::ContinuePending,
            6 => Self::PausePending,
            7 => Self::Paused,
            _ => Self::Unknown,
        }
    }

    /// Native `dwCurrentState` value, if the status has one.
    pub const fn to_native(self) -> Option<u32> {
        match self {
            Self::Stopped => Some(1),
            Self::StartPending => Some(2),
            Self::StopPending => Some(3),
            Self::Running => Some(4),
            Self::ContinuePending => Some(5),
            Self::PausePending => Some(6),
            Self::Paused => Some(7),
            Self::Unknown | Self::NotInstalled => None,
        }
    }
}

/// Declarative description of a service to install or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Unique name registered with the SCM.
    pub name: String,
    /// Path of the executable the service launches.
    pub exe_path: String,
    /// Arguments appended verbatim to the image path.
    #[serde(default)]
    pub arguments: Option<String>,
    /// Friendly name. Falls back to `name` when absent or blank.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Description. `None` clears any existing description.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_mode: ServiceStartMode,
    /// Only meaningful with [`ServiceStartMode::Automatic`].
    #[serde(default)]
    pub delayed_auto_start: bool,
}

impl ServiceSpec {
    /// Creates a spec with the default start mode and no optional fields.
    pub fn new(name: impl Into<String>, exe_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exe_path: exe_path.into(),
            arguments: None,
            display_name: None,
            description: None,
            start_mode: ServiceStartMode::default(),
            delayed_auto_start: false,
        }
    }

    pub fn with_arguments(self, arguments: impl Into<String>) -> Self {
        Self {
            arguments: Some(arguments.into()),
            ..self
        }
    }

    pub fn with_display_name(self, display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            ..self
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..self
        }
    }

    pub fn with_start_mode(self, start_mode: ServiceStartMode) -> Self {
        Self { start_mode, ..self }
    }

    pub fn with_delayed_auto_start(self, delayed_auto_start: bool) -> Self {
        Self {
            delayed_auto_start,
            ..self
        }
    }

    /// Display name handed to the SCM.
    pub fn effective_display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(display) if !display.trim().is_empty() => display,
            _ => &self.name,
        }
    }
}

/// Snapshot of an installed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub display_name: String,
    /// Not every query path can provide the description.
    pub description: Option<String>,
    pub status: ServiceStatus,
}
