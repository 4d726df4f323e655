use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

const DVS: &str = r#"{
  "uuid": "AB CD-EF-12-34",
  "portgroups": [
    { "key": "pg-a", "name": "net-a-ABCDEF12" },
    { "key": "pg-b", "name": "net-b-ABCDEF12" }
  ],
  "vms": [ { "vm_ref": "vm-1", "instance_uuid": "d1", "networks": ["pg-a"] } ],
  "ports": [
    { "key": "10", "name": "p1", "portgroup_key": "pg-a",
      "connectee": { "kind": "vm_vnic", "entity": "vm-1" } },
    { "key": "11", "name": "shared", "portgroup_key": "pg-a" },
    { "key": "12", "name": "shared", "portgroup_key": "pg-b" }
  ]
}"#;

const NEUTRON: &str = r#"{
  "ports": [
    { "id": "p1", "device_id": "d1", "network_id": "net-b", "binding_host_id": "esx-01" },
    { "id": "p2", "device_id": "d2", "network_id": "net-a", "binding_host_id": "esx-02" }
  ]
}"#;

fn write_inputs(dir: &std::path::Path) -> anyhow::Result<(std::path::PathBuf, std::path::PathBuf)> {
    let dvs = dir.join("dvs.json");
    let neutron = dir.join("neutron.json");
    fs::write(&dvs, DVS)?;
    fs::write(&neutron, NEUTRON)?;
    Ok((dvs, neutron))
}

#[test]
fn report_prints_every_stage_with_verdicts() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (dvs, neutron) = write_inputs(dir.path())?;

    Command::cargo_bin("ndt")?
        .args(["report", "--dvs"])
        .arg(&dvs)
        .arg("--neutron")
        .arg(&neutron)
        .assert()
        .success()
        .stdout(predicate::str::contains("dvs_uuid=AB CD-EF-12-34"))
        .stdout(predicate::str::contains("config_hash=NONE"))
        .stdout(predicate::str::contains("DVS port name duplications (started at"))
        .stdout(predicate::str::contains("Multiple ports named shared:"))
        .stdout(predicate::str::contains("Connectee (device ID) consistency"))
        .stdout(predicate::str::contains(
            "VM portgroup consistency with OS port security group",
        ))
        .stdout(predicate::str::contains("Port mapping"))
        .stdout(predicate::str::contains("Unresolved references"))
        .stdout(predicate::str::contains("Result: FAIL"));
    Ok(())
}

#[test]
fn align_prints_findings_before_corrective_stages() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (dvs, neutron) = write_inputs(dir.path())?;

    let output = Command::cargo_bin("ndt")?
        .args(["align", "--yes", "--dvs"])
        .arg(&dvs)
        .arg("--neutron")
        .arg(&neutron)
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let exact = stdout.find("Exact matches (started at").expect("exact stage");
    for stage in [
        "DVS port name duplications (started at",
        "Connectee (device ID) consistency (started at",
        "Port mapping (started at",
        "Unresolved references (started at",
    ] {
        let at = stdout.find(stage).expect(stage);
        assert!(at < exact, "{stage} printed after the corrective stages");
    }
    assert!(stdout.contains("Moved DVS port p1 from portgroup net-a-ABCDEF12 to net-b-ABCDEF12."));
    Ok(())
}

#[test]
fn host_filter_narrows_neutron_side() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (dvs, neutron) = write_inputs(dir.path())?;

    Command::cargo_bin("ndt")?
        .args(["report", "--host", "esx-01", "--dvs"])
        .arg(&dvs)
        .arg("--neutron")
        .arg(&neutron)
        .assert()
        .success()
        .stdout(predicate::str::contains("neutron_host=esx-01"))
        .stdout(predicate::str::contains("p2").not());
    Ok(())
}

#[test]
fn report_never_touches_the_snapshot() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (dvs, neutron) = write_inputs(dir.path())?;

    Command::cargo_bin("ndt")?
        .args(["report", "--dvs"])
        .arg(&dvs)
        .arg("--neutron")
        .arg(&neutron)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&dvs)?, DVS);
    Ok(())
}

#[test]
fn dupes_reports_only_the_duplicate_stage() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (dvs, _) = write_inputs(dir.path())?;

    Command::cargo_bin("ndt")?
        .args(["dupes", "--dvs"])
        .arg(&dvs)
        .assert()
        .success()
        .stdout(predicate::str::contains("Port key: 11, PG key: pg-a, Connected: false"))
        .stdout(predicate::str::contains("Result: FAIL (1 duplicated name(s))"))
        .stdout(predicate::str::contains("Port mapping").not());
    Ok(())
}

#[test]
fn config_hash_prints_hash_and_canonical_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = dir.path().join("base.yaml");
    fs::write(&cfg, "neutron:\n  host: esx-01\ndvs:\n  uuid: \"AB CD\"\n")?;

    Command::cargo_bin("ndt")?
        .arg("config-hash")
        .arg(&cfg)
        .assert()
        .success()
        .stdout(predicate::str::contains("config_hash="))
        .stdout(predicate::str::contains(
            r#"{"dvs":{"uuid":"AB CD"},"neutron":{"host":"esx-01"}}"#,
        ));
    Ok(())
}
