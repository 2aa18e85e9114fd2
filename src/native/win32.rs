//! Win32 backend built on `advapi32` service functions.
use std::ffi::c_void;

use windows::Win32::Foundation::BOOL;
use windows::Win32::System::Services::{
    ChangeServiceConfig2W, ChangeServiceConfigW, CloseServiceHandle, ControlService,
    CreateServiceW, DeleteService, ENUM_SERVICE_TYPE, GetServiceDisplayNameW, OpenSCManagerW,
    OpenServiceW, QueryServiceConfig2W, QueryServiceStatus, SC_HANDLE, SERVICE_CONFIG,
    SERVICE_DELAYED_AUTO_START_INFO, SERVICE_DESCRIPTIONW, SERVICE_ERROR, SERVICE_START_TYPE,
    SERVICE_STATUS, StartServiceW,
};
use windows::Win32::UI::Shell::IsUserAnAdmin;
use windows::core::{HSTRING, PCWSTR, PWSTR};

use super::{ConfigInfo, NativeError, NativeResult, NativeServiceConfig, RawHandle, ScmApi};
use crate::constants::{
    SERVICE_CONFIG_DELAYED_AUTO_START_INFO, SERVICE_CONFIG_DESCRIPTION, SERVICE_CONTROL_STOP,
};

const ERROR_INSUFFICIENT_BUFFER: u32 = 122;

/// Stateless binding to the local Service Control Manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsScm;

impl WindowsScm {
    pub fn new() -> Self {
        Self
    }
}

fn sc(handle: RawHandle) -> SC_HANDLE {
    SC_HANDLE(handle.0 as *mut c_void)
}

fn raw(handle: SC_HANDLE) -> RawHandle {
    RawHandle(handle.0 as usize)
}

/// Splits the HRESULT produced by the bindings back into a Win32 error code.
fn native_error(operation: &'static str, err: windows::core::Error) -> NativeError {
    let hresult = err.code().0 as u32;
    let message = err.message().to_string();
    if hresult & 0xFFFF_0000 == 0x8007_0000 {
        NativeError::os(operation, hresult & 0xFFFF, message)
    } else {
        NativeError::other(operation, message)
    }
}

/// Wide string for a caller-supplied value. Interior NULs would silently
/// truncate the value on the native side.
fn wide(operation: &'static str, value: &str) -> NativeResult<HSTRING> {
    if value.contains('\0') {
        return Err(NativeError::other(
            operation,
            format!("argument contains a NUL character: {value:?}"),
        ));
    }
    Ok(HSTRING::from(value))
}

fn nul_terminated(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}

impl ScmApi for WindowsScm {
    fn is_supported(&self) -> bool {
        true
    }

    fn is_elevated(&self) -> bool {
        unsafe { IsUserAnAdmin() }.as_bool()
    }

    fn open_manager(&self, access: u32) -> NativeResult<RawHandle> {
        unsafe { OpenSCManagerW(PCWSTR::null(), PCWSTR::null(), access) }
            .map(raw)
            .map_err(|err| native_error("OpenSCManager", err))
    }

    fn open_service(
        &self,
        manager: RawHandle,
        name: &str,
        access: u32,
    ) -> NativeResult<RawHandle> {
        let name = wide("OpenService", name)?;
        unsafe { OpenServiceW(sc(manager), &name, access) }
            .map(raw)
            .map_err(|err| native_error("OpenService", err))
    }

    fn create_service(
        &self,
        manager: RawHandle,
        config: &NativeServiceConfig<'_>,
        access: u32,
    ) -> NativeResult<RawHandle> {
        let name = wide("CreateService", config.name)?;
        let display_name = wide("CreateService", config.display_name)?;
        let binary_path = wide("CreateService", config.binary_path)?;

        unsafe {
            CreateServiceW(
                sc(manager),
                &name,
                &display_name,
                access,
                ENUM_SERVICE_TYPE(config.service_type),
                SERVICE_START_TYPE(config.start_type),
                SERVICE_ERROR(config.error_control),
                &binary_path,
                PCWSTR::null(),
                None,
                PCWSTR::null(),
                PCWSTR::null(),
                PCWSTR::null(),
            )
        }
        .map(raw)
        .map_err(|err| native_error("CreateService", err))
    }

    fn change_config(
        &self,
        service: RawHandle,
        config: &NativeServiceConfig<'_>,
    ) -> NativeResult<()> {
        let display_name = wide("ChangeServiceConfig", config.display_name)?;
        let binary_path = wide("ChangeServiceConfig", config.binary_path)?;

        unsafe {
            ChangeServiceConfigW(
                sc(service),
                ENUM_SERVICE_TYPE(config.service_type),
                SERVICE_START_TYPE(config.start_type),
                SERVICE_ERROR(config.error_control),
                &binary_path,
                PCWSTR::null(),
                None,
                PCWSTR::null(),
                PCWSTR::null(),
                PCWSTR::null(),
                &display_name,
            )
        }
        .map_err(|err| native_error("ChangeServiceConfig", err))
    }

    fn change_config2(&self, service: RawHandle, info: ConfigInfo<'_>) -> NativeResult<()> {
        let operation = info.operation();
        match info {
            ConfigInfo::Description(description) => {
                // A null pointer leaves the description untouched; an empty
                // string deletes it.
                let text = description.unwrap_or_default();
                if text.contains('\0') {
                    return Err(NativeError::other(
                        operation,
                        "description contains a NUL character",
                    ));
                }
                let mut buffer = nul_terminated(text);
                let payload = SERVICE_DESCRIPTIONW {
                    lpDescription: PWSTR(buffer.as_mut_ptr()),
                };

                unsafe {
                    ChangeServiceConfig2W(
                        sc(service),
                        SERVICE_CONFIG(SERVICE_CONFIG_DESCRIPTION),
                        Some(&payload as *const SERVICE_DESCRIPTIONW as *const c_void),
                    )
                }
                .map_err(|err| native_error(operation, err))
            }
            ConfigInfo::DelayedAutoStart(enabled) => {
                let payload = SERVICE_DELAYED_AUTO_START_INFO {
                    fDelayedAutostart: BOOL::from(enabled),
                };

                unsafe {
                    ChangeServiceConfig2W(
                        sc(service),
                        SERVICE_CONFIG(SERVICE_CONFIG_DELAYED_AUTO_START_INFO),
                        Some(
                            &payload as *const SERVICE_DELAYED_AUTO_START_INFO
                                as *const c_void,
                        ),
                    )
                }
                .map_err(|err| native_error(operation, err))
            }
        }
    }

    fn delete_service(&self, service: RawHandle) -> NativeResult<()> {
        unsafe { DeleteService(sc(service)) }.map_err(|err| native_error("DeleteService", err))
    }

    fn query_status(&self, service: RawHandle) -> NativeResult<u32> {
        let mut status = SERVICE_STATUS::default();
        unsafe { QueryServiceStatus(sc(service), &mut status) }
            .map_err(|err| native_error("QueryServiceStatus", err))?;
        Ok(status.dwCurrentState.0)
    }

    fn query_description(&self, service: RawHandle) -> NativeResult<Option<String>> {
        const OPERATION: &str = "QueryServiceConfig2(DESCRIPTION)";
        let level = SERVICE_CONFIG(SERVICE_CONFIG_DESCRIPTION);

        let mut needed = 0u32;
        match unsafe { QueryServiceConfig2W(sc(service), level, None, &mut needed) } {
            Ok(()) => return Ok(None),
            Err(err) => {
                let err = native_error(OPERATION, err);
                if err.code() != Some(ERROR_INSUFFICIENT_BUFFER) {
                    return Err(err);
                }
            }
        }

        // u64 storage keeps the struct and the wide string behind it aligned.
        let len = (needed as usize).max(size_of::<SERVICE_DESCRIPTIONW>());
        let mut buffer = vec![0u64; len.div_ceil(size_of::<u64>())];
        let bytes = unsafe { std::slice::from_raw_parts_mut(buffer.as_mut_ptr().cast::<u8>(), len) };
        unsafe { QueryServiceConfig2W(sc(service), level, Some(bytes), &mut needed) }
            .map_err(|err| native_error(OPERATION, err))?;

        // The buffer starts with the struct; its pointer targets the tail of the buffer.
        let payload: SERVICE_DESCRIPTIONW = unsafe { std::ptr::read(buffer.as_ptr().cast()) };
        if payload.lpDescription.is_null() {
            return Ok(None);
        }

        let text = unsafe { payload.lpDescription.to_string() }
            .map_err(|err| NativeError::other(OPERATION, err.to_string()))?;
        Ok(Some(text).filter(|text| !text.is_empty()))
    }

    fn display_name(&self, manager: RawHandle, name: &str) -> NativeResult<String> {
        const OPERATION: &str = "GetServiceDisplayName";
        let name = wide(OPERATION, name)?;

        // First call only reports the required length (without the terminator).
        let mut length = 0u32;
        let _ = unsafe { GetServiceDisplayNameW(sc(manager), &name, PWSTR::null(), &mut length) };

        let mut buffer = vec![0u16; length as usize + 1];
        let mut length = buffer.len() as u32;
        unsafe {
            GetServiceDisplayNameW(
                sc(manager),
                &name,
                PWSTR(buffer.as_mut_ptr()),
                &mut length,
            )
        }
        .map_err(|err| native_error(OPERATION, err))?;

        let end = (length as usize).min(buffer.len());
        Ok(String::from_utf16_lossy(&buffer[..end]))
    }

    fn start_service(&self, service: RawHandle) -> NativeResult<()> {
        unsafe { StartServiceW(sc(service), None) }
            .map_err(|err| native_error("StartService", err))
    }

    fn stop_service(&self, service: RawHandle) -> NativeResult<()> {
        let mut status = SERVICE_STATUS::default();
        unsafe { ControlService(sc(service), SERVICE_CONTROL_STOP, &mut status) }
            .map_err(|err| native_error("ControlService(STOP)", err))
    }

    fn close_handle(&self, handle: RawHandle) {
        let _ = unsafe { CloseServiceHandle(sc(handle)) };
    }
}
