#[path = "common/mod.rs"]
mod common;

use common::{assert_handles_released, manager, mutating_calls};
use svcctl::{
    CancellationToken, ResultCode, ServiceManagerError, ServiceSpec, ServiceStartMode,
    constants::SERVICE_WIN32_OWN_PROCESS,
    native::NativeError,
    test_utils::{FakeOp, FakeScm, NativeCall},
};

#[test]
fn install_creates_a_missing_service() {
    let fake = FakeScm::new();
    let spec = ServiceSpec::new("agent", r"C:\Program Files\Agent\agent.exe")
        .with_arguments("--port 5000")
        .with_display_name("Agent")
        .with_description("Collects things")
        .with_start_mode(ServiceStartMode::Manual)
        .with_delayed_auto_start(true);

    let result = manager(&fake)
        .install_or_update(&spec, &CancellationToken::new())
        .unwrap();

    assert!(result.is_success(), "{result}");
    assert_eq!(result.message(), "Installed service 'agent'");

    let service = fake.service("agent").expect("service created");
    assert_eq!(
        service.binary_path,
        r#""C:\Program Files\Agent\agent.exe" --port 5000"#
    );
    assert_eq!(service.display_name, "Agent");
    assert_eq!(service.start_type, 3);
    assert_eq!(service.service_type, SERVICE_WIN32_OWN_PROCESS);
    assert_eq!(service.description.as_deref(), Some("Collects things"));
    assert!(service.delayed_auto_start);
    assert_handles_released(&fake);
}

#[test]
fn install_updates_an_existing_service_in_place() {
    let fake = FakeScm::new().with_service("agent", |svc| {
        svc.description = Some("old".into());
        svc.delayed_auto_start = true;
    });
    let spec = ServiceSpec::new("agent", r"C:\agent.exe")
        .with_start_mode(ServiceStartMode::Disabled);

    let result = manager(&fake)
        .install_or_update(&spec, &CancellationToken::new())
        .unwrap();

    assert!(result.is_success(), "{result}");
    assert_eq!(result.message(), "Updated service 'agent'");
    assert_eq!(
        fake.count(|call| matches!(call, NativeCall::CreateService { .. })),
        0
    );
    assert_eq!(
        fake.count(|call| matches!(call, NativeCall::ChangeConfig { .. })),
        1
    );

    let service = fake.service("agent").unwrap();
    assert_eq!(service.binary_path, r"C:\agent.exe");
    // Display name falls back to the service name.
    assert_eq!(service.display_name, "agent");
    assert_eq!(service.start_type, 4);
    assert_eq!(service.description, None);
    assert!(!service.delayed_auto_start);
    assert_handles_released(&fake);
}

#[test]
fn install_applies_description_then_delayed_start() {
    let fake = FakeScm::new();
    let spec = ServiceSpec::new("agent", "agent.exe").with_description("d");

    manager(&fake)
        .install_or_update(&spec, &CancellationToken::new())
        .unwrap();

    let operations: Vec<_> = fake
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            NativeCall::ChangeConfig2 { operation, .. } => Some(operation),
            _ => None,
        })
        .collect();
    assert_eq!(
        operations,
        vec![
            "ChangeServiceConfig2(DESCRIPTION)",
            "ChangeServiceConfig2(DELAYED_AUTO_START)"
        ]
    );
}

#[test]
fn optional_config_failures_do_not_fail_the_install() {
    let fake = FakeScm::new();
    fake.fail(FakeOp::ChangeConfig2, 5);
    let spec = ServiceSpec::new("agent", "agent.exe").with_description("d");

    let result = manager(&fake)
        .install_or_update(&spec, &CancellationToken::new())
        .unwrap();

    assert!(result.is_success(), "{result}");
    assert!(fake.service("agent").is_some());
    assert_handles_released(&fake);
}

#[test]
fn blank_identifiers_are_rejected_before_any_native_call() {
    let fake = FakeScm::new();
    let ct = CancellationToken::new();

    for (name, exe, field) in [("  ", "a.exe", "name"), ("svc", "", "exe_path")] {
        let err = manager(&fake)
            .install_or_update(&ServiceSpec::new(name, exe), &ct)
            .unwrap_err();
        assert!(
            matches!(&err, ServiceManagerError::InvalidArgument { field: f } if f == field),
            "{err:?}"
        );
    }
    assert!(fake.calls().is_empty());
}

#[test]
fn unsupported_platform_fails_before_any_native_call() {
    let fake = FakeScm::unsupported();
    let err = manager(&fake)
        .install_or_update(&ServiceSpec::new("svc", "a.exe"), &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(err, ServiceManagerError::PlatformUnsupported));
    assert!(fake.calls().is_empty());
}

#[test]
fn canceled_install_makes_no_changes() {
    let fake = FakeScm::new();
    let result = manager(&fake)
        .install_or_update(&ServiceSpec::new("svc", "a.exe"), &CancellationToken::canceled())
        .unwrap();

    assert_eq!(result.code(), ResultCode::Canceled);
    assert_eq!(mutating_calls(&fake), 0);
    assert!(fake.service("svc").is_none());
}

#[test]
fn open_manager_failure_is_a_win32_error() {
    let fake = FakeScm::new();
    fake.fail(FakeOp::OpenManager, 5);

    let result = manager(&fake)
        .install_or_update(&ServiceSpec::new("svc", "a.exe"), &CancellationToken::new())
        .unwrap();

    assert_eq!(result.code(), ResultCode::Win32Error);
    assert!(result.failure_cause().is_some());
    assert_eq!(mutating_calls(&fake), 0);
}

#[test]
fn open_failure_other_than_missing_does_not_create() {
    let fake = FakeScm::new();
    fake.fail(FakeOp::OpenService, 5);

    let result = manager(&fake)
        .install_or_update(&ServiceSpec::new("svc", "a.exe"), &CancellationToken::new())
        .unwrap();

    assert_eq!(result.code(), ResultCode::Win32Error);
    assert_eq!(mutating_calls(&fake), 0);
    assert_handles_released(&fake);
}

#[test]
fn create_failure_is_reported_with_its_cause() {
    let fake = FakeScm::new();
    fake.fail_with(
        FakeOp::CreateService,
        NativeError::os("CreateService", 1073, "The specified service already exists."),
    );

    let result = manager(&fake)
        .install_or_update(&ServiceSpec::new("svc", "a.exe"), &CancellationToken::new())
        .unwrap();

    assert!(!result.is_success());
    assert_eq!(result.code(), ResultCode::Win32Error);
    assert_eq!(result.message(), "The specified service already exists.");
    assert_handles_released(&fake);
}

#[test]
fn cancel_midway_reports_every_remaining_spec_as_canceled() {
    let fake = FakeScm::new();
    let ct = CancellationToken::new();
    fake.cancel_after(FakeOp::CreateService, &ct);
    let specs = [
        ServiceSpec::new("alpha", "alpha.exe"),
        ServiceSpec::new("beta", "beta.exe"),
        ServiceSpec::new("gamma", "gamma.exe"),
    ];

    let results = manager(&fake).install_all(&specs, &ct).unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_success(), "{}", results[0]);
    for result in &results[1..] {
        assert_eq!(result.code(), ResultCode::Canceled);
    }
    assert!(fake.service("alpha").is_some());
    assert!(fake.service("beta").is_none());
    assert!(fake.service("gamma").is_none());
    assert_eq!(
        fake.count(|call| matches!(call, NativeCall::CreateService { .. })),
        1
    );
    assert_handles_released(&fake);
}

#[test]
fn install_all_without_cancellation_installs_in_order() {
    let fake = FakeScm::new().with_service("beta", |_| {});
    let specs = [
        ServiceSpec::new("alpha", "alpha.exe"),
        ServiceSpec::new("beta", "beta.exe"),
    ];

    let results = manager(&fake)
        .install_all(&specs, &CancellationToken::new())
        .unwrap();

    let messages: Vec<_> = results.iter().map(|result| result.message()).collect();
    assert_eq!(
        messages,
        vec!["Installed service 'alpha'", "Updated service 'beta'"]
    );
}
