//! Test doubles shared by unit and integration tests.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, OnceLock},
};

use crate::cancel::CancellationToken;
use crate::constants::{
    ERROR_INVALID_HANDLE, ERROR_SERVICE_DOES_NOT_EXIST, ERROR_SERVICE_MARKED_FOR_DELETE,
    SERVICE_ERROR_NORMAL, SERVICE_WIN32_OWN_PROCESS,
};
use crate::native::{
    ConfigInfo, NativeError, NativeResult, NativeServiceConfig, RawHandle, ScmApi,
};
use crate::service::ServiceStatus;

/// Global lock for environment variable modifications in tests.
/// All tests that modify environment variables should acquire this lock
/// to prevent race conditions between parallel test executions.
pub static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One call observed by [`FakeScm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    OpenManager { access: u32 },
    OpenService { name: String, access: u32 },
    CreateService { name: String },
    ChangeConfig { name: String },
    ChangeConfig2 { name: String, operation: &'static str },
    DeleteService { name: String },
    QueryStatus { name: String },
    QueryDescription { name: String },
    DisplayName { name: String },
    StartService { name: String },
    StopService { name: String },
    CloseHandle,
}

impl NativeCall {
    /// Whether the call changes registry state or service state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::CreateService { .. }
                | Self::ChangeConfig { .. }
                | Self::ChangeConfig2 { .. }
                | Self::DeleteService { .. }
                | Self::StartService { .. }
                | Self::StopService { .. }
        )
    }
}

/// Native operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    OpenManager,
    OpenService,
    CreateService,
    ChangeConfig,
    ChangeConfig2,
    DeleteService,
    QueryStatus,
    QueryDescription,
    DisplayName,
    StartService,
    StopService,
}

/// A service registered with [`FakeScm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeService {
    pub display_name: String,
    pub binary_path: String,
    pub service_type: u32,
    pub start_type: u32,
    pub error_control: u32,
    pub description: Option<String>,
    pub delayed_auto_start: bool,
    pub status: ServiceStatus,
    /// Status the service settles in after a start command.
    pub on_start: ServiceStatus,
    /// Status the service settles in after a stop command.
    pub on_stop: ServiceStatus,
    /// Number of status reads that still report the pending state after a command.
    pub transition_polls: usize,
    pub marked_for_delete: bool,
    pending: VecDeque<ServiceStatus>,
}

impl FakeService {
    fn named(name: &str) -> Self {
        Self {
            display_name: name.to_string(),
            binary_path: format!("{name}.exe"),
            service_type: SERVICE_WIN32_OWN_PROCESS,
            start_type: 3,
            error_control: SERVICE_ERROR_NORMAL,
            description: None,
            delayed_auto_start: false,
            status: ServiceStatus::Stopped,
            on_start: ServiceStatus::Running,
            on_stop: ServiceStatus::Stopped,
            transition_polls: 0,
            marked_for_delete: false,
            pending: VecDeque::new(),
        }
    }

    fn transition(&mut self, pending: ServiceStatus, target: ServiceStatus) {
        self.pending = std::iter::repeat_n(pending, self.transition_polls).collect();
        self.status = target;
    }
}

#[derive(Debug, Clone)]
enum Target {
    Manager,
    Service(String),
}

#[derive(Debug, Default)]
struct FakeState {
    next_handle: usize,
    services: HashMap<String, FakeService>,
    handles: HashMap<RawHandle, Target>,
    calls: Vec<NativeCall>,
    failures: HashMap<FakeOp, NativeError>,
    cancel_on: Option<(FakeOp, CancellationToken)>,
}

/// In-memory Service Control Manager that records every call it receives.
#[derive(Debug)]
pub struct FakeScm {
    supported: bool,
    elevated: bool,
    state: Mutex<FakeState>,
}

impl Default for FakeScm {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeScm {
    pub fn new() -> Self {
        Self {
            supported: true,
            elevated: true,
            state: Mutex::new(FakeState {
                next_handle: 0x100,
                ..FakeState::default()
            }),
        }
    }

    /// A backend that reports the platform as unsupported.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn not_elevated(self) -> Self {
        Self {
            elevated: false,
            ..self
        }
    }

    /// Registers a stopped service and lets the caller adjust it.
    pub fn with_service(self, name: &str, configure: impl FnOnce(&mut FakeService)) -> Self {
        let mut service = FakeService::named(name);
        configure(&mut service);
        self.lock().services.insert(name.to_string(), service);
        self
    }

    /// Makes every later call of `op` fail with the OS error `code`.
    pub fn fail(&self, op: FakeOp, code: u32) {
        self.fail_with(
            op,
            NativeError::os(op_name(op), code, format!("injected error {code}")),
        );
    }

    pub fn fail_with(&self, op: FakeOp, error: NativeError) {
        self.lock().failures.insert(op, error);
    }

    /// Cancels `token` when `op` is next called; that call still completes.
    pub fn cancel_after(&self, op: FakeOp, token: &CancellationToken) {
        self.lock().cancel_on = Some((op, token.clone()));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn service(&self, name: &str) -> Option<FakeService> {
        self.lock().services.get(name).cloned()
    }

    pub fn set_status(&self, name: &str, status: ServiceStatus) {
        if let Some(service) = self.lock().services.get_mut(name) {
            service.status = status;
            service.pending.clear();
        }
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&NativeCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Handles acquired and not yet closed.
    pub fn open_handle_count(&self) -> usize {
        self.lock().handles.len()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn op_name(op: FakeOp) -> &'static str {
    match op {
        FakeOp::OpenManager => "OpenSCManager",
        FakeOp::OpenService => "OpenService",
        FakeOp::CreateService => "CreateService",
        FakeOp::ChangeConfig => "ChangeServiceConfig",
        FakeOp::ChangeConfig2 => "ChangeServiceConfig2",
        FakeOp::DeleteService => "DeleteService",
        FakeOp::QueryStatus => "QueryServiceStatus",
        FakeOp::QueryDescription => "QueryServiceConfig2(DESCRIPTION)",
        FakeOp::DisplayName => "GetServiceDisplayName",
        FakeOp::StartService => "StartService",
        FakeOp::StopService => "ControlService(STOP)",
    }
}

fn missing(operation: &'static str) -> NativeError {
    NativeError::os(
        operation,
        ERROR_SERVICE_DOES_NOT_EXIST,
        "The specified service does not exist as an installed service.",
    )
}

impl FakeState {
    fn record(&mut self, call: NativeCall, op: FakeOp) -> NativeResult<()> {
        self.calls.push(call);
        if let Some(error) = self.failures.get(&op) {
            return Err(error.clone());
        }
        if self.cancel_on.as_ref().is_some_and(|(target, _)| *target == op)
            && let Some((_, token)) = self.cancel_on.take()
        {
            token.cancel();
        }
        Ok(())
    }

    fn issue(&mut self, target: Target) -> RawHandle {
        let handle = RawHandle(self.next_handle);
        self.next_handle += 1;
        self.handles.insert(handle, target);
        handle
    }

    fn manager(&self, handle: RawHandle, operation: &'static str) -> NativeResult<()> {
        match self.handles.get(&handle) {
            Some(Target::Manager) => Ok(()),
            _ => Err(NativeError::os(
                operation,
                ERROR_INVALID_HANDLE,
                "The handle is invalid.",
            )),
        }
    }

    fn service_name(&self, handle: RawHandle, operation: &'static str) -> NativeResult<String> {
        match self.handles.get(&handle) {
            Some(Target::Service(name)) => Ok(name.clone()),
            _ => Err(NativeError::os(
                operation,
                ERROR_INVALID_HANDLE,
                "The handle is invalid.",
            )),
        }
    }

    fn service_mut(
        &mut self,
        handle: RawHandle,
        operation: &'static str,
    ) -> NativeResult<&mut FakeService> {
        let name = self.service_name(handle, operation)?;
        self.services
            .get_mut(&name)
            .ok_or_else(|| missing(operation))
    }
}

impl ScmApi for FakeScm {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn is_elevated(&self) -> bool {
        self.elevated
    }

    fn open_manager(&self, access: u32) -> NativeResult<RawHandle> {
        let mut state = self.lock();
        state.record(NativeCall::OpenManager { access }, FakeOp::OpenManager)?;
        Ok(state.issue(Target::Manager))
    }

    fn open_service(
        &self,
        manager: RawHandle,
        name: &str,
        access: u32,
    ) -> NativeResult<RawHandle> {
        let mut state = self.lock();
        state.record(
            NativeCall::OpenService {
                name: name.to_string(),
                access,
            },
            FakeOp::OpenService,
        )?;
        state.manager(manager, "OpenService")?;
        if !state.services.contains_key(name) {
            return Err(missing("OpenService"));
        }
        Ok(state.issue(Target::Service(name.to_string())))
    }

    fn create_service(
        &self,
        manager: RawHandle,
        config: &NativeServiceConfig<'_>,
        _access: u32,
    ) -> NativeResult<RawHandle> {
        let mut state = self.lock();
        state.record(
            NativeCall::CreateService {
                name: config.name.to_string(),
            },
            FakeOp::CreateService,
        )?;
        state.manager(manager, "CreateService")?;

        let mut service = FakeService::named(config.name);
        service.display_name = config.display_name.to_string();
        service.binary_path = config.binary_path.to_string();
        service.service_type = config.service_type;
        service.start_type = config.start_type;
        service.error_control = config.error_control;
        state.services.insert(config.name.to_string(), service);

        Ok(state.issue(Target::Service(config.name.to_string())))
    }

    fn change_config(
        &self,
        service: RawHandle,
        config: &NativeServiceConfig<'_>,
    ) -> NativeResult<()> {
        let mut state = self.lock();
        let name = state.service_name(service, "ChangeServiceConfig")?;
        state.record(NativeCall::ChangeConfig { name }, FakeOp::ChangeConfig)?;

        let entry = state.service_mut(service, "ChangeServiceConfig")?;
        entry.display_name = config.display_name.to_string();
        entry.binary_path = config.binary_path.to_string();
        entry.service_type = config.service_type;
        entry.start_type = config.start_type;
        entry.error_control = config.error_control;
        Ok(())
    }

    fn change_config2(&self, service: RawHandle, info: ConfigInfo<'_>) -> NativeResult<()> {
        let mut state = self.lock();
        let name = state.service_name(service, info.operation())?;
        state.record(
            NativeCall::ChangeConfig2 {
                name,
                operation: info.operation(),
            },
            FakeOp::ChangeConfig2,
        )?;

        let entry = state.service_mut(service, info.operation())?;
        match info {
            ConfigInfo::Description(description) => {
                entry.description = description
                    .filter(|text| !text.is_empty())
                    .map(str::to_string);
            }
            ConfigInfo::DelayedAutoStart(enabled) => entry.delayed_auto_start = enabled,
        }
        Ok(())
    }

    fn delete_service(&self, service: RawHandle) -> NativeResult<()> {
        let mut state = self.lock();
        let name = state.service_name(service, "DeleteService")?;
        state.record(
            NativeCall::DeleteService { name: name.clone() },
            FakeOp::DeleteService,
        )?;

        let entry = state.service_mut(service, "DeleteService")?;
        if entry.marked_for_delete {
            return Err(NativeError::os(
                "DeleteService",
                ERROR_SERVICE_MARKED_FOR_DELETE,
                "The specified service has been marked for deletion.",
            ));
        }
        state.services.remove(&name);
        Ok(())
    }

    fn query_status(&self, service: RawHandle) -> NativeResult<u32> {
        let mut state = self.lock();
        let name = state.service_name(service, "QueryServiceStatus")?;
        state.record(NativeCall::QueryStatus { name }, FakeOp::QueryStatus)?;

        let entry = state.service_mut(service, "QueryServiceStatus")?;
        let status = entry.pending.pop_front().unwrap_or(entry.status);
        // Statuses without a native value surface as an out-of-range state.
        Ok(status.to_native().unwrap_or(0))
    }

    fn query_description(&self, service: RawHandle) -> NativeResult<Option<String>> {
        let mut state = self.lock();
        let name = state.service_name(service, "QueryServiceConfig2(DESCRIPTION)")?;
        state.record(NativeCall::QueryDescription { name }, FakeOp::QueryDescription)?;

        let entry = state.service_mut(service, "QueryServiceConfig2(DESCRIPTION)")?;
        Ok(entry.description.clone())
    }

    fn display_name(&self, manager: RawHandle, name: &str) -> NativeResult<String> {
        let mut state = self.lock();
        state.record(
            NativeCall::DisplayName {
                name: name.to_string(),
            },
            FakeOp::DisplayName,
        )?;
        state.manager(manager, "GetServiceDisplayName")?;
        state
            .services
            .get(name)
            .map(|service| service.display_name.clone())
            .ok_or_else(|| missing("GetServiceDisplayName"))
    }

    fn start_service(&self, service: RawHandle) -> NativeResult<()> {
        let mut state = self.lock();
        let name = state.service_name(service, "StartService")?;
        state.record(NativeCall::StartService { name }, FakeOp::StartService)?;

        let entry = state.service_mut(service, "StartService")?;
        let target = entry.on_start;
        entry.transition(ServiceStatus::StartPending, target);
        Ok(())
    }

    fn stop_service(&self, service: RawHandle) -> NativeResult<()> {
        let mut state = self.lock();
        let name = state.service_name(service, "ControlService(STOP)")?;
        state.record(NativeCall::StopService { name }, FakeOp::StopService)?;

        let entry = state.service_mut(service, "ControlService(STOP)")?;
        let target = entry.on_stop;
        entry.transition(ServiceStatus::StopPending, target);
        Ok(())
    }

    fn close_handle(&self, handle: RawHandle) {
        let mut state = self.lock();
        state.calls.push(NativeCall::CloseHandle);
        state.handles.remove(&handle);
    }
}
