//! Config hash is a function of content, not of key order or call count.

use ndt_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
dvs:
  uuid: "50 2a 4f 1c-9b 33 7e 10"
  name: "dvs-compute-01"
neutron:
  host: "esx-compute-01"
align:
  disconnect_policy: "disconnect"
  clear_orphan_names: false
"#;

const BASE_YAML_REORDERED: &str = r#"
align:
  clear_orphan_names: false
  disconnect_policy: "disconnect"
neutron:
  host: "esx-compute-01"
dvs:
  name: "dvs-compute-01"
  uuid: "50 2a 4f 1c-9b 33 7e 10"
"#;

const OVERLAY_YAML: &str = r#"
align:
  disconnect_policy: "report_only"
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(original.config_hash, reordered.config_hash);
    assert_eq!(original.canonical_json, reordered.canonical_json);
}

#[test]
fn overlay_changes_hash_and_value() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_ne!(base.config_hash, merged.config_hash);
    assert_eq!(
        merged.config_json.pointer("/align/disconnect_policy"),
        Some(&serde_json::json!("report_only"))
    );
    // untouched siblings survive the merge
    assert_eq!(
        merged.config_json.pointer("/dvs/name"),
        Some(&serde_json::json!("dvs-compute-01"))
    );
}

#[test]
fn hash_is_lowercase_sha256_hex() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded
        .config_hash
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
}
