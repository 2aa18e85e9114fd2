//! Backend for hosts without a Service Control Manager.
//!
//! The facade's platform guard rejects every operation before any of these
//! methods run; they still answer with an error rather than panicking.
use super::{ConfigInfo, NativeError, NativeResult, NativeServiceConfig, RawHandle, ScmApi};

const UNSUPPORTED: &str = "the Service Control Manager is only available on Windows";

/// Stand-in used as [`super::SystemScm`] off Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedScm;

impl UnsupportedScm {
    pub fn new() -> Self {
        Self
    }
}

impl ScmApi for UnsupportedScm {
    fn is_supported(&self) -> bool {
        false
    }

    fn is_elevated(&self) -> bool {
        false
    }

    fn open_manager(&self, _access: u32) -> NativeResult<RawHandle> {
        Err(NativeError::other("OpenSCManager", UNSUPPORTED))
    }

    fn open_service(
        &self,
        _manager: RawHandle,
        _name: &str,
        _access: u32,
    ) -> NativeResult<RawHandle> {
        Err(NativeError::other("OpenService", UNSUPPORTED))
    }

    fn create_service(
        &self,
        _manager: RawHandle,
        _config: &NativeServiceConfig<'_>,
        _access: u32,
    ) -> NativeResult<RawHandle> {
        Err(NativeError::other("CreateService", UNSUPPORTED))
    }

    fn change_config(
        &self,
        _service: RawHandle,
        _config: &NativeServiceConfig<'_>,
    ) -> NativeResult<()> {
        Err(NativeError::other("ChangeServiceConfig", UNSUPPORTED))
    }

    fn change_config2(&self, _service: RawHandle, info: ConfigInfo<'_>) -> NativeResult<()> {
        Err(NativeError::other(info.operation(), UNSUPPORTED))
    }

    fn delete_service(&self, _service: RawHandle) -> NativeResult<()> {
        Err(NativeError::other("DeleteService", UNSUPPORTED))
    }

    fn query_status(&self, _service: RawHandle) -> NativeResult<u32> {
        Err(NativeError::other("QueryServiceStatus", UNSUPPORTED))
    }

    fn query_description(&self, _service: RawHandle) -> NativeResult<Option<String>> {
        Err(NativeError::other("QueryServiceConfig2", UNSUPPORTED))
    }

    fn display_name(&self, _manager: RawHandle, _name: &str) -> NativeResult<String> {
        Err(NativeError::other("GetServiceDisplayName", UNSUPPORTED))
    }

    fn start_service(&self, _service: RawHandle) -> NativeResult<()> {
        Err(NativeError::other("StartService", UNSUPPORTED))
    }

    fn stop_service(&self, _service: RawHandle) -> NativeResult<()> {
        Err(NativeError::other("ControlService(STOP)", UNSUPPORTED))
    }

    fn close_handle(&self, _handle: RawHandle) {}
}
