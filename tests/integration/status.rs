#[path = "common/mod.rs"]
mod common;

use common::{assert_handles_released, manager, mutating_calls};
use svcctl::{
    ServiceManagerError, ServiceStatus,
    test_utils::{FakeOp, FakeScm},
};

#[test]
fn try_get_reports_installed_service() {
    let fake = FakeScm::new().with_service("svc", |svc| {
        svc.display_name = "Friendly".into();
        svc.description = Some("Does work".into());
        svc.status = ServiceStatus::Running;
    });

    let info = manager(&fake).try_get("svc").unwrap().expect("service found");
    assert_eq!(info.name, "svc");
    assert_eq!(info.display_name, "Friendly");
    assert_eq!(info.description.as_deref(), Some("Does work"));
    assert_eq!(info.status, ServiceStatus::Running);
    assert_eq!(mutating_calls(&fake), 0);
    assert_handles_released(&fake);
}

#[test]
fn try_get_of_missing_service_is_none() {
    let fake = FakeScm::new();
    assert!(manager(&fake).try_get("ghost").unwrap().is_none());
    assert_eq!(
        manager(&fake).get_status("ghost").unwrap(),
        ServiceStatus::NotInstalled
    );
    assert_handles_released(&fake);
}

#[test]
fn inaccessible_service_is_folded_into_not_found() {
    let fake = FakeScm::new().with_service("svc", |_| {});
    fake.fail(FakeOp::OpenService, 5);

    assert!(manager(&fake).try_get("svc").unwrap().is_none());
    assert_eq!(
        manager(&fake).get_status("svc").unwrap(),
        ServiceStatus::NotInstalled
    );
}

#[test]
fn missing_display_name_and_description_degrade_gracefully() {
    let fake = FakeScm::new().with_service("svc", |svc| svc.description = Some("d".into()));
    fake.fail(FakeOp::DisplayName, 122);
    fake.fail(FakeOp::QueryDescription, 5);

    let info = manager(&fake).try_get("svc").unwrap().unwrap();
    assert_eq!(info.display_name, "svc");
    assert_eq!(info.description, None);
    assert_eq!(info.status, ServiceStatus::Stopped);
}

#[test]
fn every_native_state_maps_to_a_status() {
    let fake = FakeScm::new().with_service("svc", |_| {});
    let manager = manager(&fake);

    for status in [
        ServiceStatus::Stopped,
        ServiceStatus::StartPending,
        ServiceStatus::StopPending,
        ServiceStatus::Running,
        ServiceStatus::ContinuePending,
        ServiceStatus::PausePending,
        ServiceStatus::Paused,
    ] {
        fake.set_status("svc", status);
        assert_eq!(manager.get_status("svc").unwrap(), status);
    }
}

#[test]
fn query_requires_a_name_and_a_supported_platform() {
    let fake = FakeScm::new();
    assert!(matches!(
        manager(&fake).get_status("\t"),
        Err(ServiceManagerError::InvalidArgument { .. })
    ));
    assert!(fake.calls().is_empty());

    let unsupported = FakeScm::unsupported();
    assert!(matches!(
        manager(&unsupported).try_get("svc"),
        Err(ServiceManagerError::PlatformUnsupported)
    ));
}
