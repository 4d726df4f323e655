//! Portgroup name derivation.
//!
//! Neutron ports do not carry a portgroup name; the name a port is expected
//! to live in is derived from its network id and security groups, suffixed
//! with a short form of the switch identity. The DVS side names its
//! portgroups with the same function, so the output must stay bit-identical.

use sha2::{Digest, Sha224};

/// Longest portgroup name, in bytes, used verbatim; longer names fall back to a digest.
pub const MAX_SEGMENT_NAME_LEN: usize = 80;

/// Bytes of the switch identity kept in the suffix.
pub const SWITCH_SUFFIX_LEN: usize = 8;

/// Derive the portgroup name for `segment_key_parts` on `switch_identity`.
///
/// `parts` are joined with `:`; the suffix is the switch identity without
/// spaces and hyphens, cut to [`SWITCH_SUFFIX_LEN`] bytes. When the literal
/// name would exceed [`MAX_SEGMENT_NAME_LEN`] bytes the composite key is
/// replaced by its SHA-224 hex digest. Lengths are UTF-8 byte counts.
pub fn derive<S: AsRef<str>>(switch_identity: &str, segment_key_parts: &[S]) -> String {
    let composite = segment_key_parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(":");
    let suffix = switch_suffix(switch_identity);

    let name = format!("{composite}-{suffix}");
    if name.len() <= MAX_SEGMENT_NAME_LEN {
        return name;
    }

    let mut hasher = Sha224::new();
    hasher.update(composite.as_bytes());
    format!("{}-{suffix}", hex::encode(hasher.finalize()))
}

/// Portgroup name a Neutron port on `network_id` with `security_groups` belongs in.
///
/// Security groups are joined with `,` in the order given; a port without
/// security groups contributes only its network id.
pub fn portgroup_name<S: AsRef<str>>(
    switch_identity: &str,
    network_id: &str,
    security_groups: &[S],
) -> String {
    let mut parts = vec![network_id.to_string()];
    if !security_groups.is_empty() {
        parts.push(
            security_groups
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    derive(switch_identity, &parts)
}

/// A multi-byte character that would straddle the cut is dropped whole.
fn switch_suffix(switch_identity: &str) -> String {
    let mut suffix = String::with_capacity(SWITCH_SUFFIX_LEN);
    for c in switch_identity.chars().filter(|c| *c != ' ' && *c != '-') {
        if suffix.len() + c.len_utf8() > SWITCH_SUFFIX_LEN {
            break;
        }
        suffix.push(c);
    }
    suffix
}
