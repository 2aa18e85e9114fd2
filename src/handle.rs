//! Scoped ownership of native SCM handles.
use tracing::trace;

use crate::native::{
    ConfigInfo, NativeError, NativeResult, NativeServiceConfig, RawHandle, ScmApi,
};

/// Sole owner of one native handle.
///
/// The handle is released through [`ScmApi::close_handle`] exactly once: on
/// [`ScHandle::close`] or when the wrapper is dropped, whichever comes first.
/// An invalid wrapper (sentinel value or already closed) never reaches the
/// native close.
pub struct ScHandle<'a, A: ScmApi + ?Sized> {
    api: &'a A,
    raw: Option<RawHandle>,
}

impl<'a, A: ScmApi + ?Sized> ScHandle<'a, A> {
    /// Takes ownership of a handle returned by the native layer.
    pub fn from_raw(api: &'a A, raw: RawHandle) -> Self {
        Self {
            api,
            raw: (!raw.is_sentinel()).then_some(raw),
        }
    }

    /// A wrapper that owns nothing.
    pub fn invalid(api: &'a A) -> Self {
        Self { api, raw: None }
    }

    /// Connects to the manager with the given access rights.
    pub fn open_manager(api: &'a A, access: u32) -> NativeResult<Self> {
        let raw = api.open_manager(access)?;
        Ok(Self::acquired(api, raw, "OpenSCManager"))
    }

    /// Opens `name` through this manager handle.
    pub fn open_service(&self, name: &str, access: u32) -> NativeResult<Self> {
        let manager = self.get("OpenService")?;
        let raw = self.api.open_service(manager, name, access)?;
        Ok(Self::acquired(self.api, raw, "OpenService"))
    }

    /// Registers a new service through this manager handle.
    pub fn create_service(
        &self,
        config: &NativeServiceConfig<'_>,
        access: u32,
    ) -> NativeResult<Self> {
        let manager = self.get("CreateService")?;
        let raw = self.api.create_service(manager, config, access)?;
        Ok(Self::acquired(self.api, raw, "CreateService"))
    }

    pub fn is_invalid(&self) -> bool {
        self.raw.is_none()
    }

    pub fn raw(&self) -> Option<RawHandle> {
        self.raw
    }

    pub fn change_config(&self, config: &NativeServiceConfig<'_>) -> NativeResult<()> {
        let service = self.get("ChangeServiceConfig")?;
        self.api.change_config(service, config)
    }

    pub fn change_config2(&self, info: ConfigInfo<'_>) -> NativeResult<()> {
        let service = self.get(info.operation())?;
        self.api.change_config2(service, info)
    }

    pub fn delete(&self) -> NativeResult<()> {
        let service = self.get("DeleteService")?;
        self.api.delete_service(service)
    }

    pub fn query_status(&self) -> NativeResult<u32> {
        let service = self.get("QueryServiceStatus")?;
        self.api.query_status(service)
    }

    pub fn query_description(&self) -> NativeResult<Option<String>> {
        let service = self.get("QueryServiceConfig2(DESCRIPTION)")?;
        self.api.query_description(service)
    }

    /// Display name of `name`, looked up through this manager handle.
    pub fn display_name(&self, name: &str) -> NativeResult<String> {
        let manager = self.get("GetServiceDisplayName")?;
        self.api.display_name(manager, name)
    }

    pub fn start(&self) -> NativeResult<()> {
        let service = self.get("StartService")?;
        self.api.start_service(service)
    }

    pub fn stop(&self) -> NativeResult<()> {
        let service = self.get("ControlService(STOP)")?;
        self.api.stop_service(service)
    }

    /// Releases the handle. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(raw) = self.raw.take() {
            trace!("closing SCM handle {raw}");
            self.api.close_handle(raw);
        }
    }

    fn acquired(api: &'a A, raw: RawHandle, operation: &'static str) -> Self {
        let handle = Self::from_raw(api, raw);
        if handle.is_invalid() {
            trace!("{operation} returned a sentinel handle");
        }
        handle
    }

    fn get(&self, operation: &'static str) -> NativeResult<RawHandle> {
        self.raw.ok_or_else(|| NativeError::invalid_handle(operation))
    }
}

impl<A: ScmApi + ?Sized> Drop for ScHandle<'_, A> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<A: ScmApi + ?Sized> std::fmt::Debug for ScHandle<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScHandle").field("raw", &self.raw).finish()
    }
}
