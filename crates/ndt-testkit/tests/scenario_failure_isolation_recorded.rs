//! Scenario: the DVS rejects one rename. Everything else still converges,
//! and the next invocation picks the failed port up again.

use ndt_reconcile::{
    align, check, collect, AlignAuthorization, AlignOptions, OperationFailure, PortHandle,
};
use ndt_testkit::{NeutronFixture, RecordedOp, RecordingDvs, SwitchFixture};

const SWITCH: &str = "AB CD-EF-12-34";

#[test]
fn scenario_rejected_rename_is_reported_and_retried_next_run() {
    let dvs = SwitchFixture::new(SWITCH)
        .portgroup("pg-a", "net-a", &[])
        .portgroup("pg-b", "net-b", &[])
        .vm("vm-1", "d1")
        .vm("vm-2", "d2")
        .vm("vm-3", "d3")
        .vm_port("10", "old-1", "pg-a", "vm-1")
        .vm_port("20", "old-2", "pg-a", "vm-2")
        .vm_port("30", "p3", "pg-a", "vm-3")
        .build()
        .unwrap();
    let neutron = NeutronFixture::new()
        .port("p1", "d1", "net-a", &[])
        .port("p2", "d2", "net-a", &[])
        .port("p3", "d3", "net-b", &[])
        .build()
        .unwrap();

    let mut dvs = RecordingDvs::new(dvs);
    dvs.fail_on("10", "Cannot complete operation due to concurrent modification");

    let inv = collect(&dvs, &neutron, SWITCH, None).unwrap();
    let report = align(
        &mut dvs,
        &AlignAuthorization::from_confirmation(true).unwrap(),
        &inv,
        &AlignOptions::default(),
    );

    // every eligible port was attempted; nothing was disconnected
    assert_eq!(dvs.operations().len(), 3);
    assert!(!dvs
        .operations()
        .iter()
        .any(|op| matches!(op, RecordedOp::Disconnect { .. })));

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        &failures[0].result,
        Err(OperationFailure::Platform(e)) if e.message.contains("concurrent modification")
    ));
    assert_eq!(report.unmatched_neutron.len(), 1);
    assert_eq!(
        dvs.inventory()
            .port(&PortHandle::new("10"))
            .unwrap()
            .name
            .as_deref(),
        Some("old-1")
    );

    // next invocation, platform healthy again
    dvs.clear_failures();
    dvs.take_operations();
    let inv = collect(&dvs, &neutron, SWITCH, None).unwrap();
    let retry = align(
        &mut dvs,
        &AlignAuthorization::from_confirmation(true).unwrap(),
        &inv,
        &AlignOptions::default(),
    );
    assert_eq!(
        dvs.operations(),
        &[RecordedOp::Rename {
            port: "10".to_string(),
            name: "p1".to_string()
        }]
    );
    assert!(retry.is_clean());

    let converged = collect(&dvs, &neutron, SWITCH, None).unwrap();
    assert!(check(&converged).is_clean());
}
