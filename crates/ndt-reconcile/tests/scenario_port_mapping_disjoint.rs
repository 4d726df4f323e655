use std::collections::BTreeSet;

use ndt_reconcile::*;

fn dvs(ids: &[&str]) -> Vec<PortRecord> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| PortRecord::new(*id, "seg-A", None, i.to_string()))
        .collect()
}

fn neutron(ids: &[&str]) -> Vec<PortRecord> {
    ids.iter()
        .map(|id| PortRecord::new(*id, "seg-A", None, *id))
        .collect()
}

#[test]
fn scenario_mapping_is_symmetric_difference() {
    let cases: [(&[&str], &[&str]); 4] = [
        (&["a", "b", "c"], &["b", "c", "d"]),
        (&["a"], &[]),
        (&[], &["z"]),
        (&["x", "y"], &["x", "y"]),
    ];

    for (left, right) in cases {
        let diff = check_port_mapping(&dvs(left), &neutron(right));

        let l: BTreeSet<String> = left.iter().map(|s| s.to_string()).collect();
        let r: BTreeSet<String> = right.iter().map(|s| s.to_string()).collect();
        let both: BTreeSet<String> = l.intersection(&r).cloned().collect();

        assert!(diff.authoritative_only.is_disjoint(&diff.reference_only));
        assert!(diff.authoritative_only.is_disjoint(&both));
        assert!(diff.reference_only.is_disjoint(&both));
        assert_eq!(diff.authoritative_only, &l - &r);
        assert_eq!(diff.reference_only, &r - &l);
    }
}

#[test]
fn scenario_unnamed_dvs_ports_are_counted_not_listed() {
    let diff = check_port_mapping(&dvs(&["", "a"]), &neutron(&["a"]));
    assert!(diff.is_clean());
    assert_eq!(diff.unnamed_authoritative, 1);
}
