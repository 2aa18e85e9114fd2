#[path = "common/mod.rs"]
mod common;

use std::{
    thread,
    time::{Duration, Instant},
};

use common::{assert_handles_released, manager, mutating_calls, start_calls, stop_calls};
use svcctl::{
    CancellationToken, ResultCode, ServiceManagerError, ServiceSpec, ServiceStatus,
    test_utils::{FakeOp, FakeScm},
};

#[test]
fn start_waits_until_running() {
    let fake = FakeScm::new().with_service("svc", |svc| svc.transition_polls = 3);
    let result = manager(&fake)
        .start("svc", None, &CancellationToken::new())
        .unwrap();

    assert!(result.is_success(), "{result}");
    assert_eq!(result.message(), "svc: Running");
    assert_eq!(start_calls(&fake), 1);
    assert_eq!(fake.service("svc").unwrap().status, ServiceStatus::Running);
    assert_handles_released(&fake);
}

#[test]
fn stop_waits_until_stopped() {
    let fake = FakeScm::new().with_service("svc", |svc| {
        svc.status = ServiceStatus::Running;
        svc.transition_polls = 2;
    });
    let result = manager(&fake)
        .stop("svc", None, &CancellationToken::new())
        .unwrap();

    assert!(result.is_success(), "{result}");
    assert_eq!(result.message(), "svc: Stopped");
    assert_eq!(stop_calls(&fake), 1);
}

#[test]
fn start_of_running_service_short_circuits() {
    let fake = FakeScm::new().with_service("svc", |svc| svc.status = ServiceStatus::Running);
    let result = manager(&fake)
        .start("svc", None, &CancellationToken::new())
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.message(), "svc: ALREADY_RUNNING");
    assert_eq!(start_calls(&fake), 0);
}

#[test]
fn stop_of_stopped_service_short_circuits() {
    let fake = FakeScm::new().with_service("svc", |_| {});
    let result = manager(&fake)
        .stop("svc", None, &CancellationToken::new())
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.message(), "svc: ALREADY_STOPPED");
    assert_eq!(stop_calls(&fake), 0);
}

#[test]
fn missing_service_is_not_installed() {
    let fake = FakeScm::new();
    let ct = CancellationToken::new();
    let manager = manager(&fake);

    for result in [
        manager.start("ghost", None, &ct).unwrap(),
        manager.stop("ghost", None, &ct).unwrap(),
    ] {
        assert_eq!(result.code(), ResultCode::NotInstalled);
        assert_eq!(result.message(), "Service 'ghost' is not installed.");
        assert!(result.failure_cause().is_some());
    }
    assert_eq!(mutating_calls(&fake), 0);
    assert_handles_released(&fake);
}

#[test]
fn constant_pending_status_times_out() {
    let fake = FakeScm::new().with_service("svc", |svc| {
        svc.on_start = ServiceStatus::StartPending;
    });
    let started = Instant::now();
    let result = manager(&fake)
        .start("svc", Some(Duration::from_millis(50)), &CancellationToken::new())
        .unwrap();

    assert_eq!(result.code(), ResultCode::Timeout);
    assert_eq!(
        result.message(),
        "Timed out waiting for 'svc' to reach 'Running'."
    );
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_handles_released(&fake);
}

#[test]
fn cancellation_is_observed_by_the_wait_and_not_rolled_back() {
    let fake = FakeScm::new().with_service("svc", |svc| svc.transition_polls = 5);
    let result = manager(&fake)
        .start("svc", None, &CancellationToken::canceled())
        .unwrap();

    assert_eq!(result.code(), ResultCode::Canceled);
    assert_eq!(
        result.message(),
        "Waiting for 'svc' to reach 'Running' was canceled."
    );
    assert_eq!(start_calls(&fake), 1);
    assert_eq!(stop_calls(&fake), 0);
}

#[test]
fn canceled_start_of_running_service_still_short_circuits() {
    let fake = FakeScm::new().with_service("svc", |svc| svc.status = ServiceStatus::Running);
    let result = manager(&fake)
        .start("svc", None, &CancellationToken::canceled())
        .unwrap();

    assert!(result.is_success());
    assert_eq!(mutating_calls(&fake), 0);
}

#[test]
fn cancel_during_wait_ends_the_wait() {
    let fake = FakeScm::new().with_service("svc", |svc| {
        svc.on_start = ServiceStatus::StartPending;
    });
    let ct = CancellationToken::new();
    let canceler = ct.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        canceler.cancel();
    });

    let started = Instant::now();
    let result = manager(&fake)
        .start("svc", Some(Duration::from_secs(30)), &ct)
        .unwrap();
    handle.join().unwrap();

    assert_eq!(result.code(), ResultCode::Canceled);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_handles_released(&fake);
}

#[test]
fn start_command_failure_is_a_win32_error() {
    let fake = FakeScm::new().with_service("svc", |_| {});
    fake.fail(FakeOp::StartService, 1053);

    let result = manager(&fake)
        .start("svc", None, &CancellationToken::new())
        .unwrap();

    assert_eq!(result.code(), ResultCode::Win32Error);
    assert!(result.failure_cause().is_some());
    assert_handles_released(&fake);
}

#[test]
fn restart_stops_then_starts() {
    let fake = FakeScm::new().with_service("svc", |svc| {
        svc.status = ServiceStatus::Running;
        svc.transition_polls = 1;
    });
    let result = manager(&fake)
        .restart("svc", None, &CancellationToken::new())
        .unwrap();

    assert!(result.is_success(), "{result}");
    assert_eq!(result.message(), "svc: Running");
    assert_eq!(stop_calls(&fake), 1);
    assert_eq!(start_calls(&fake), 1);
}

#[test]
fn restart_of_stopped_service_just_starts() {
    let fake = FakeScm::new().with_service("svc", |_| {});
    let result = manager(&fake)
        .restart("svc", None, &CancellationToken::new())
        .unwrap();

    assert!(result.is_success(), "{result}");
    assert_eq!(stop_calls(&fake), 0);
    assert_eq!(start_calls(&fake), 1);
}

#[test]
fn restart_of_missing_service_returns_the_stop_result() {
    let fake = FakeScm::new();
    let ct = CancellationToken::new();
    let manager = manager(&fake);

    let restart = manager.restart("ghost", None, &ct).unwrap();
    let stop = manager.stop("ghost", None, &ct).unwrap();

    assert_eq!(restart.code(), ResultCode::NotInstalled);
    assert_eq!(restart.message(), stop.message());
    assert_eq!(start_calls(&fake), 0);
}

#[test]
fn restart_with_failed_stop_never_starts() {
    let fake = FakeScm::new().with_service("svc", |svc| svc.status = ServiceStatus::Running);
    fake.fail(FakeOp::StopService, 1061);

    let result = manager(&fake)
        .restart("svc", None, &CancellationToken::new())
        .unwrap();

    assert_eq!(result.code(), ResultCode::Win32Error);
    assert_eq!(start_calls(&fake), 0);
}

#[test]
fn blank_name_and_unsupported_platform_are_errors() {
    let fake = FakeScm::new();
    let ct = CancellationToken::new();
    assert!(matches!(
        manager(&fake).start(" ", None, &ct),
        Err(ServiceManagerError::InvalidArgument { .. })
    ));
    assert!(fake.calls().is_empty());

    let unsupported = FakeScm::unsupported();
    assert!(matches!(
        manager(&unsupported).restart("svc", None, &ct),
        Err(ServiceManagerError::PlatformUnsupported)
    ));
    assert!(unsupported.calls().is_empty());
}

#[test]
fn blank_name_is_rejected_by_every_operation_without_native_calls() {
    let fake = FakeScm::new().with_service("svc", |_| {});
    let manager = manager(&fake);
    let ct = CancellationToken::new();

    for name in ["", "   ", "\t\n"] {
        let outcomes = [
            manager.try_get(name).map(|_| ()),
            manager.get_status(name).map(|_| ()),
            manager
                .install_or_update(&ServiceSpec::new(name, "svc.exe"), &ct)
                .map(|_| ()),
            manager.uninstall_if_exists(name, &ct).map(|_| ()),
            manager.start(name, None, &ct).map(|_| ()),
            manager.stop(name, None, &ct).map(|_| ()),
            manager.restart(name, None, &ct).map(|_| ()),
        ];

        for (index, outcome) in outcomes.into_iter().enumerate() {
            assert!(
                matches!(
                    &outcome,
                    Err(ServiceManagerError::InvalidArgument { field }) if field == "name"
                ),
                "operation #{index} with {name:?}: {outcome:?}"
            );
        }
    }

    assert!(fake.calls().is_empty(), "{:?}", fake.calls());
}
