use ndt_reconcile::report::Reporter;
use ndt_reconcile::*;

fn port(key: &str, name: &str, connected: bool) -> RawDvsPort {
    RawDvsPort {
        key: PortHandle::new(key),
        name: Some(name.to_string()),
        portgroup_key: SegmentKey::new("pg-a"),
        connectee: connected.then(|| Connectee {
            kind: ConnecteeKind::VmVnic,
            entity: DeviceRef::new("vm-1"),
            nic_key: None,
        }),
    }
}

#[test]
fn scenario_two_ports_named_shared_give_one_finding() {
    let ports = vec![
        port("10", "shared", true),
        port("11", "shared", false),
        port("12", "unique", true),
    ];

    let findings = check_duplicate_names(&ports);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].name, "shared");
    assert_eq!(findings[0].members.len(), 2);

    let connected: Vec<bool> = findings[0].members.iter().map(|m| m.connected).collect();
    assert_eq!(connected, vec![true, false]);

    let mut r = Reporter::with_clock(Vec::new(), || "Mon Jan  1 00:00:00 2024".to_string());
    r.duplicates(&findings).unwrap();
    let out = String::from_utf8(r.into_inner()).unwrap();
    assert!(out.contains("Multiple ports named shared:"));
    assert!(out.contains("Result: FAIL (1 duplicated name(s))"));
}

#[test]
fn scenario_no_duplicates_is_reported_as_pass() {
    let findings = check_duplicate_names(&[port("10", "a", true), port("11", "b", true)]);
    assert!(findings.is_empty());

    let mut r = Reporter::with_clock(Vec::new(), || "Mon Jan  1 00:00:00 2024".to_string());
    r.duplicates(&findings).unwrap();
    let out = String::from_utf8(r.into_inner()).unwrap();
    assert!(out.contains("No vSphere ports with duplicate names."));
    assert!(out.contains("Result: PASS"));
}
