//! svcctl installs, updates, removes, starts, stops and queries services
//! registered with the Windows Service Control Manager. It wraps the native
//! API in owned handles, reports operation outcomes as typed results instead
//! of raw error codes, and waits for state transitions with a cancellable
//! status poll. On other platforms every operation fails up front with a
//! platform error.

/// Optional service configuration (description, delayed auto-start).
pub mod apply;

/// Cooperative cancellation for long-running operations.
pub mod cancel;

/// CLI interface.
pub mod cli;

/// Configuration management.
pub mod config;

/// Native constants and default timings.
pub mod constants;

/// Error handling.
pub mod error;

/// Precondition checks shared by every operation.
pub mod guard;

/// Owned native handles.
pub mod handle;

/// Service image path construction.
pub mod image_path;

/// Service control facade.
pub mod manager;

/// Native Service Control Manager bindings.
pub mod native;

/// Operation outcomes.
pub mod result;

/// Service descriptions and states.
pub mod service;

#[doc(hidden)]
pub mod test_utils;

pub use cancel::CancellationToken;
pub use config::ManagerSettings;
pub use error::ServiceManagerError;
pub use manager::ServiceManager;
pub use result::{OpResult, ResultCode};
pub use service::{ServiceInfo, ServiceSpec, ServiceStartMode, ServiceStatus};
