//! Constants shared by the facade and the native backends.
//!
//! Access masks and codes mirror the values documented for the Win32 service
//! API so they can be passed straight through to the native calls.

use std::time::Duration;

// ============================================================================
// Timing
// ============================================================================

/// Interval between status refreshes while waiting for a state transition.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Budget for `start`/`stop` when the caller does not pass one.
pub const DEFAULT_START_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Budget for each half of `restart` when the caller does not pass one.
pub const DEFAULT_RESTART_TIMEOUT: Duration = Duration::from_secs(60);

/// Budget for the best-effort stop issued before an uninstall.
pub const UNINSTALL_STOP_TIMEOUT: Duration = Duration::from_secs(20);

// ============================================================================
// Manager access rights
// ============================================================================

pub const SC_MANAGER_CONNECT: u32 = 0x0001;
pub const SC_MANAGER_CREATE_SERVICE: u32 = 0x0002;

// ============================================================================
// Service access rights
// ============================================================================

pub const SERVICE_QUERY_CONFIG: u32 = 0x0001;
pub const SERVICE_QUERY_STATUS: u32 = 0x0004;
pub const SERVICE_START: u32 = 0x0010;
pub const SERVICE_STOP: u32 = 0x0020;
pub const DELETE: u32 = 0x0001_0000;
pub const SERVICE_ALL_ACCESS: u32 = 0x000F_01FF;

// ============================================================================
// Service configuration values
// ============================================================================

/// The service runs in its own process.
pub const SERVICE_WIN32_OWN_PROCESS: u32 = 0x0000_0010;

/// The startup program logs the error and continues booting.
pub const SERVICE_ERROR_NORMAL: u32 = 0x0000_0001;

/// Info level for `ChangeServiceConfig2W`/`QueryServiceConfig2W` descriptions.
pub const SERVICE_CONFIG_DESCRIPTION: u32 = 1;

/// Info level for the delayed auto-start flag.
pub const SERVICE_CONFIG_DELAYED_AUTO_START_INFO: u32 = 3;

/// Control code asking a service to stop.
pub const SERVICE_CONTROL_STOP: u32 = 0x0000_0001;

// ============================================================================
// Native error codes handled specially
// ============================================================================

pub const ERROR_INVALID_HANDLE: u32 = 6;
pub const ERROR_SERVICE_DOES_NOT_EXIST: u32 = 1060;
pub const ERROR_SERVICE_MARKED_FOR_DELETE: u32 = 1072;
