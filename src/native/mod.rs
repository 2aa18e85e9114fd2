//! Narrow interface to the operating system's Service Control Manager.
//!
//! The facade only ever talks to an [`ScmApi`]. The real backend is selected
//! per target and exported as [`SystemScm`]; tests substitute an in-memory
//! double.
use std::fmt;

use thiserror::Error;

use crate::constants::{
    ERROR_INVALID_HANDLE, ERROR_SERVICE_DOES_NOT_EXIST, ERROR_SERVICE_MARKED_FOR_DELETE,
};

#[cfg(windows)]
pub mod win32;

#[cfg(not(windows))]
pub mod unsupported;

#[cfg(windows)]
pub use self::win32::WindowsScm as SystemScm;

#[cfg(not(windows))]
pub use self::unsupported::UnsupportedScm as SystemScm;

/// Opaque native handle to the manager connection or to an open service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(pub usize);

impl RawHandle {
    /// Null handle returned by a failed acquisition.
    pub const NULL: RawHandle = RawHandle(0);

    /// `INVALID_HANDLE_VALUE` (-1).
    pub const INVALID: RawHandle = RawHandle(usize::MAX);

    /// Both zero and minus one denote a handle that was never acquired.
    pub fn is_sentinel(self) -> bool {
        self == Self::NULL || self == Self::INVALID
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Failure reported by a native call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct NativeError {
    operation: &'static str,
    code: Option<u32>,
    message: String,
}

impl NativeError {
    /// A failure carrying an OS error code.
    pub fn os(operation: &'static str, code: u32, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: Some(code),
            message: message.into(),
        }
    }

    /// A failure that did not come with an OS error code.
    pub fn other(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: None,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_handle(operation: &'static str) -> Self {
        Self::os(operation, ERROR_INVALID_HANDLE, "The handle is invalid.")
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn code(&self) -> Option<u32> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `ERROR_SERVICE_DOES_NOT_EXIST`.
    pub fn is_service_missing(&self) -> bool {
        self.code == Some(ERROR_SERVICE_DOES_NOT_EXIST)
    }

    /// `ERROR_SERVICE_MARKED_FOR_DELETE`.
    pub fn is_marked_for_delete(&self) -> bool {
        self.code == Some(ERROR_SERVICE_MARKED_FOR_DELETE)
    }
}

pub type NativeResult<T> = Result<T, NativeError>;

/// Parameters shared by the create and change-config calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeServiceConfig<'a> {
    pub name: &'a str,
    pub display_name: &'a str,
    pub service_type: u32,
    pub start_type: u32,
    pub error_control: u32,
    pub binary_path: &'a str,
}

/// Payload of an extended ("config 2") change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigInfo<'a> {
    /// `None` clears the description.
    Description(Option<&'a str>),
    DelayedAutoStart(bool),
}

impl ConfigInfo<'_> {
    /// Name used in logs and errors.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Description(_) => "ChangeServiceConfig2(DESCRIPTION)",
            Self::DelayedAutoStart(_) => "ChangeServiceConfig2(DELAYED_AUTO_START)",
        }
    }
}

/// The native SCM capability.
///
/// Every acquisition returns an owned [`RawHandle`] that must be handed back
/// through [`ScmApi::close_handle`] exactly once; callers go through
/// [`crate::handle::ScHandle`] to guarantee that.
pub trait ScmApi {
    /// Whether this backend can reach a Service Control Manager at all.
    fn is_supported(&self) -> bool;

    /// Whether the current process runs with administrative rights.
    fn is_elevated(&self) -> bool;

    fn open_manager(&self, access: u32) -> NativeResult<RawHandle>;

    fn open_service(
        &self,
        manager: RawHandle,
        name: &str,
        access: u32,
    ) -> NativeResult<RawHandle>;

    fn create_service(
        &self,
        manager: RawHandle,
        config: &NativeServiceConfig<'_>,
        access: u32,
    ) -> NativeResult<RawHandle>;

    /// Updates type, start type, error control, binary path and display name in one call.
    fn change_config(
        &self,
        service: RawHandle,
        config: &NativeServiceConfig<'_>,
    ) -> NativeResult<()>;

    fn change_config2(&self, service: RawHandle, info: ConfigInfo<'_>) -> NativeResult<()>;

    fn delete_service(&self, service: RawHandle) -> NativeResult<()>;

    /// Raw `dwCurrentState` of the service.
    fn query_status(&self, service: RawHandle) -> NativeResult<u32>;

    fn query_description(&self, service: RawHandle) -> NativeResult<Option<String>>;

    fn display_name(&self, manager: RawHandle, name: &str) -> NativeResult<String>;

    fn start_service(&self, service: RawHandle) -> NativeResult<()>;

    fn stop_service(&self, service: RawHandle) -> NativeResult<()>;

    /// Best effort; failures are not reported.
    fn close_handle(&self, handle: RawHandle);
}

impl<A: ScmApi + ?Sized> ScmApi for &A {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn is_elevated(&self) -> bool {
        (**self).is_elevated()
    }

    fn open_manager(&self, access: u32) -> NativeResult<RawHandle> {
        (**self).open_manager(access)
    }

    fn open_service(
        &self,
        manager: RawHandle,
        name: &str,
        access: u32,
    ) -> NativeResult<RawHandle> {
        (**self).open_service(manager, name, access)
    }

    fn create_service(
        &self,
        manager: RawHandle,
        config: &NativeServiceConfig<'_>,
        access: u32,
    ) -> NativeResult<RawHandle> {
        (**self).create_service(manager, config, access)
    }

    fn change_config(
        &self,
        service: RawHandle,
        config: &NativeServiceConfig<'_>,
    ) -> NativeResult<()> {
        (**self).change_config(service, config)
    }

    fn change_config2(&self, service: RawHandle, info: ConfigInfo<'_>) -> NativeResult<()> {
        (**self).change_config2(service, info)
    }

    fn delete_service(&self, service: RawHandle) -> NativeResult<()> {
        (**self).delete_service(service)
    }

    fn query_status(&self, service: RawHandle) -> NativeResult<u32> {
        (**self).query_status(service)
    }

    fn query_description(&self, service: RawHandle) -> NativeResult<Option<String>> {
        (**self).query_description(service)
    }

    fn display_name(&self, manager: RawHandle, name: &str) -> NativeResult<String> {
        (**self).display_name(manager, name)
    }

    fn start_service(&self, service: RawHandle) -> NativeResult<()> {
        (**self).start_service(service)
    }

    fn stop_service(&self, service: RawHandle) -> NativeResult<()> {
        (**self).stop_service(service)
    }

    fn close_handle(&self, handle: RawHandle) {
        (**self).close_handle(handle)
    }
}
