//! Service control facade.
//!
//! [`ServiceManager`] turns a [`ServiceSpec`] into native configuration calls,
//! drives start/stop transitions with a cancellable status poll, and folds
//! every native, timeout and cancellation failure into an [`OpResult`].
//! Only precondition violations (blank identifiers, unsupported platform)
//! are returned as `Err`.
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::apply::{apply_delayed_auto_start, apply_description};
use crate::cancel::CancellationToken;
use crate::config::ManagerSettings;
use crate::constants::{
    DELETE, SC_MANAGER_CONNECT, SC_MANAGER_CREATE_SERVICE, SERVICE_ALL_ACCESS,
    SERVICE_ERROR_NORMAL, SERVICE_QUERY_CONFIG, SERVICE_QUERY_STATUS, SERVICE_START,
    SERVICE_STOP, SERVICE_WIN32_OWN_PROCESS,
};
use crate::error::ServiceManagerError;
use crate::guard::{ensure_platform_supported, require_non_blank};
use crate::handle::ScHandle;
use crate::image_path;
use crate::native::{NativeError, NativeResult, NativeServiceConfig, ScmApi, SystemScm};
use crate::result::{OpResult, ResultCode};
use crate::service::{ServiceInfo, ServiceSpec, ServiceStatus};

/// Start or stop, with the status each one waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlAction {
    Start,
    Stop,
}

impl ControlAction {
    fn desired(self) -> ServiceStatus {
        match self {
            Self::Start => ServiceStatus::Running,
            Self::Stop => ServiceStatus::Stopped,
        }
    }

    fn already_marker(self) -> &'static str {
        match self {
            Self::Start => "ALREADY_RUNNING",
            Self::Stop => "ALREADY_STOPPED",
        }
    }

    fn access(self) -> u32 {
        match self {
            Self::Start => SERVICE_START,
            Self::Stop => SERVICE_STOP,
        }
    }
}

/// Why a status wait ended without reaching the desired status.
#[derive(Debug)]
enum WaitFailure {
    Canceled,
    TimedOut,
    Native(NativeError),
}

/// A service resolved by name: a manager connection plus a query handle.
struct Controller<'a, A: ScmApi> {
    name: String,
    display_name: String,
    manager: ScHandle<'a, A>,
    query: ScHandle<'a, A>,
}

impl<'a, A: ScmApi> Controller<'a, A> {
    fn resolve(api: &'a A, name: &str) -> NativeResult<Self> {
        let manager = ScHandle::open_manager(api, SC_MANAGER_CONNECT)?;
        let query = manager.open_service(name, SERVICE_QUERY_STATUS | SERVICE_QUERY_CONFIG)?;
        let display_name = manager.display_name(name).unwrap_or_else(|err| {
            debug!("display name of '{name}' unavailable: {err}");
            name.to_string()
        });

        Ok(Self {
            name: name.to_string(),
            display_name,
            manager,
            query,
        })
    }

    fn status(&self) -> NativeResult<ServiceStatus> {
        self.query.query_status().map(ServiceStatus::from_native)
    }

    fn description(&self) -> Option<String> {
        self.query.query_description().unwrap_or_else(|err| {
            debug!("description of '{}' unavailable: {err}", self.name);
            None
        })
    }

    /// Issues the command through a handle opened with just the rights it needs.
    fn issue(&self, action: ControlAction) -> NativeResult<()> {
        let service = self.manager.open_service(&self.name, action.access())?;
        match action {
            ControlAction::Start => service.start(),
            ControlAction::Stop => service.stop(),
        }
    }
}

/// Manages services registered with a Service Control Manager.
///
/// Every operation opens and releases its own native handles; nothing is
/// cached between calls, so one manager can be shared across threads when
/// the backend allows it.
#[derive(Debug, Clone, Default)]
pub struct ServiceManager<A: ScmApi = SystemScm> {
    api: A,
    settings: ManagerSettings,
}

impl ServiceManager<SystemScm> {
    /// A manager bound to the local machine's SCM.
    pub fn system() -> Self {
        Self::new(SystemScm::default())
    }
}

impl<A: ScmApi> ServiceManager<A> {
    pub fn new(api: A) -> Self {
        Self::with_settings(api, ManagerSettings::default())
    }

    pub fn with_settings(api: A, settings: ManagerSettings) -> Self {
        Self { api, settings }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// Looks up a service. Missing and inaccessible services both yield `None`.
    pub fn try_get(&self, name: &str) -> Result<Option<ServiceInfo>, ServiceManagerError> {
        ensure_platform_supported(&self.api)?;
        require_non_blank(name, "name")?;

        let controller = match Controller::resolve(&self.api, name) {
            Ok(controller) => controller,
            Err(err) => {
                debug!("service '{name}' not resolved: {err}");
                return Ok(None);
            }
        };

        let status = match controller.status() {
            Ok(status) => status,
            Err(err) => {
                debug!("status of '{name}' unavailable: {err}");
                return Ok(None);
            }
        };

        Ok(Some(ServiceInfo {
            description: controller.description(),
            name: controller.name,
            display_name: controller.display_name,
            status,
        }))
    }

    /// Current status, or [`ServiceStatus::NotInstalled`] when the service cannot be resolved.
    pub fn get_status(&self, name: &str) -> Result<ServiceStatus, ServiceManagerError> {
        Ok(self
            .try_get(name)?
            .map(|info| info.status)
            .unwrap_or(ServiceStatus::NotInstalled))
    }

    /// Creates the service described by `spec`, or rewrites the configuration
    /// of an existing one.
    ///
    /// Description and delayed auto-start are applied after the main
    /// configuration; their failures are logged and do not fail the result.
    pub fn install_or_update(
        &self,
        spec: &ServiceSpec,
        ct: &CancellationToken,
    ) -> Result<OpResult, ServiceManagerError> {
        ensure_platform_supported(&self.api)?;
        require_non_blank(&spec.name, "name")?;
        require_non_blank(&spec.exe_path, "exe_path")?;

        let name = spec.name.as_str();
        if ct.is_canceled() {
            return Ok(canceled(format!("Install/update of '{name}' was canceled.")));
        }

        let image_path = image_path::build(&spec.exe_path, spec.arguments.as_deref())?;
        let config = NativeServiceConfig {
            name,
            display_name: spec.effective_display_name(),
            service_type: SERVICE_WIN32_OWN_PROCESS,
            start_type: spec.start_mode.native_start_type(),
            error_control: SERVICE_ERROR_NORMAL,
            binary_path: &image_path,
        };
        debug!("install/update '{name}' with image path {image_path}");

        let manager = match ScHandle::open_manager(
            &self.api,
            SC_MANAGER_CONNECT | SC_MANAGER_CREATE_SERVICE,
        ) {
            Ok(manager) => manager,
            Err(err) => return Ok(native_failure(err)),
        };

        let existing = match manager.open_service(name, SERVICE_ALL_ACCESS) {
            Ok(service) => Some(service),
            Err(err) if err.is_service_missing() => None,
            Err(err) => return Ok(native_failure(err)),
        };

        if ct.is_canceled() {
            return Ok(canceled(format!("Install/update of '{name}' was canceled.")));
        }

        let (service, verb) = match existing {
            Some(service) => {
                if let Err(err) = service.change_config(&config) {
                    return Ok(native_failure(err));
                }
                (service, "Updated")
            }
            None => match manager.create_service(&config, SERVICE_ALL_ACCESS) {
                Ok(service) => (service, "Installed"),
                Err(err) => return Ok(native_failure(err)),
            },
        };

        self.apply_optional_config(&service, spec);

        info!("{verb} service '{name}'");
        Ok(OpResult::ok(format!("{verb} service '{name}'")))
    }

    /// Installs or updates each spec in order, one result per spec.
    ///
    /// Once the token is cancelled every remaining spec reports `CANCELED`
    /// without touching the native surface.
    pub fn install_all(
        &self,
        specs: &[ServiceSpec],
        ct: &CancellationToken,
    ) -> Result<Vec<OpResult>, ServiceManagerError> {
        specs
            .iter()
            .map(|spec| self.install_or_update(spec, ct))
            .collect()
    }

    /// Removes the service. A service that is already gone is a success.
    ///
    /// A running service is stopped first on a best-effort basis; a failed
    /// stop is logged and the delete is attempted anyway.
    pub fn uninstall_if_exists(
        &self,
        name: &str,
        ct: &CancellationToken,
    ) -> Result<OpResult, ServiceManagerError> {
        ensure_platform_supported(&self.api)?;
        require_non_blank(name, "name")?;

        if ct.is_canceled() {
            return Ok(canceled(format!("Uninstall of '{name}' was canceled.")));
        }

        let status = self.get_status(name)?;
        if !matches!(status, ServiceStatus::Stopped | ServiceStatus::NotInstalled) {
            let stop = self.stop(name, Some(self.settings.uninstall_stop_timeout), ct)?;
            if !stop.is_success() {
                warn!("Best-effort stop of '{name}' before uninstall failed: {stop}");
            }
        }

        let manager = match ScHandle::open_manager(&self.api, SC_MANAGER_CONNECT) {
            Ok(manager) => manager,
            Err(err) => return Ok(native_failure(err)),
        };

        let service = match manager.open_service(name, DELETE) {
            Ok(service) => service,
            Err(err) if err.is_service_missing() => {
                debug!("'{name}' is not installed; nothing to uninstall");
                return Ok(OpResult::ok(format!(
                    "Service '{name}' not installed (no-op)."
                )));
            }
            Err(err) => return Ok(native_failure(err)),
        };

        match service.delete() {
            Ok(()) => {
                info!("Uninstalled service '{name}'");
                Ok(OpResult::ok(format!("Uninstalled service '{name}'")))
            }
            Err(err) if err.is_marked_for_delete() => Ok(OpResult::ok(format!(
                "Service '{name}' already marked for delete."
            ))),
            Err(err) => Ok(native_failure(err)),
        }
    }

    /// Starts the service and waits until it reports `Running`.
    pub fn start(
        &self,
        name: &str,
        timeout: Option<Duration>,
        ct: &CancellationToken,
    ) -> Result<OpResult, ServiceManagerError> {
        self.control(
            name,
            timeout.unwrap_or(self.settings.default_timeout),
            ControlAction::Start,
            ct,
        )
    }

    /// Stops the service and waits until it reports `Stopped`.
    pub fn stop(
        &self,
        name: &str,
        timeout: Option<Duration>,
        ct: &CancellationToken,
    ) -> Result<OpResult, ServiceManagerError> {
        self.control(
            name,
            timeout.unwrap_or(self.settings.default_timeout),
            ControlAction::Stop,
            ct,
        )
    }

    /// Stops then starts the service, giving each half the full timeout.
    pub fn restart(
        &self,
        name: &str,
        timeout: Option<Duration>,
        ct: &CancellationToken,
    ) -> Result<OpResult, ServiceManagerError> {
        let timeout = timeout.unwrap_or(self.settings.restart_timeout);

        let stop = self.stop(name, Some(timeout), ct)?;
        if !stop.is_success() {
            return Ok(stop);
        }

        self.start(name, Some(timeout), ct)
    }

    fn control(
        &self,
        name: &str,
        timeout: Duration,
        action: ControlAction,
        ct: &CancellationToken,
    ) -> Result<OpResult, ServiceManagerError> {
        ensure_platform_supported(&self.api)?;
        require_non_blank(name, "name")?;

        let controller = match Controller::resolve(&self.api, name) {
            Ok(controller) => controller,
            Err(err) => {
                return Ok(OpResult::fail_with(
                    ResultCode::NotInstalled,
                    format!("Service '{name}' is not installed."),
                    err,
                ));
            }
        };

        let desired = action.desired();
        let current = match controller.status() {
            Ok(status) => status,
            Err(err) => return Ok(native_failure(err)),
        };

        if current == desired {
            return Ok(OpResult::ok(format!("{name}: {}", action.already_marker())));
        }

        debug!("issuing {action:?} to '{name}' (currently {current})");
        if let Err(err) = controller.issue(action) {
            return Ok(native_failure(err));
        }

        match self.wait_for_status(&controller, desired, timeout, ct) {
            Ok(()) => Ok(OpResult::ok(format!("{name}: {desired}"))),
            Err(WaitFailure::Canceled) => Ok(canceled(format!(
                "Waiting for '{name}' to reach '{desired}' was canceled."
            ))),
            Err(WaitFailure::TimedOut) => Ok(OpResult::fail(
                ResultCode::Timeout,
                format!("Timed out waiting for '{name}' to reach '{desired}'."),
            )),
            Err(WaitFailure::Native(err)) => Ok(native_failure(err)),
        }
    }

    fn wait_for_status(
        &self,
        controller: &Controller<'_, A>,
        desired: ServiceStatus,
        timeout: Duration,
        ct: &CancellationToken,
    ) -> Result<(), WaitFailure> {
        let started = Instant::now();

        loop {
            if ct.is_canceled() {
                return Err(WaitFailure::Canceled);
            }

            let status = controller.status().map_err(WaitFailure::Native)?;
            if status == desired {
                return Ok(());
            }

            if started.elapsed() >= timeout {
                return Err(WaitFailure::TimedOut);
            }

            ct.sleep(self.settings.poll_interval);
        }
    }

    fn apply_optional_config(&self, service: &ScHandle<'_, A>, spec: &ServiceSpec) {
        let name = spec.name.as_str();
        if let Err(err) = apply_description(service, spec.description.as_deref()) {
            warn!("Service '{name}' configured without its description: {err}");
        }
        if let Err(err) = apply_delayed_auto_start(service, spec.delayed_auto_start) {
            warn!("Service '{name}' configured without its delayed auto-start flag: {err}");
        }
    }
}

fn canceled(message: String) -> OpResult {
    OpResult::fail(ResultCode::Canceled, message)
}

/// Native failures with an OS code are `WIN32_ERROR`; the rest are `ERROR`.
fn native_failure(err: NativeError) -> OpResult {
    let code = if err.code().is_some() {
        ResultCode::Win32Error
    } else {
        ResultCode::Error
    };
    OpResult::fail_with(code, err.message().to_string(), err)
}
