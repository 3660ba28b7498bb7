use crate::reservation::ParseError;
use crate::reservation::declaration::{ReservationDeclaration, ReservedResource};
use crate::spec::pod_helpers::parse_quantity;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

pub const LEGACY_PREFIX: &str = "reserve.";

// reserve.<resource-type>/<owner-uid>
static RE_LEGACY_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^reserve\.(cpu|memory|ephemeral-storage)/([^/]+)$").unwrap());

/// Splits a legacy key into (resource type, owner uid). Keys of any other shape
/// give None.
pub fn parse_legacy_key(key: &str) -> Option<(&str, &str)> {
    let captures = RE_LEGACY_KEY.captures(key)?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

/// Keys that may carry a legacy reservation, including malformed ones. Used to
/// notice when they change.
pub fn is_legacy_candidate(key: &str) -> bool {
    key.starts_with(LEGACY_PREFIX)
}

/// Decodes the per-entry annotations, one declaration per owner. An empty
/// value counts as zero. Keys that start with the prefix but do not match the
/// pattern are skipped.
pub fn parse_legacy_annotations(
    annotations: &BTreeMap<String, String>,
    skip_key: &str,
) -> Result<Vec<ReservationDeclaration>, ParseError> {
    let mut by_owner: BTreeMap<&str, Vec<ReservedResource>> = BTreeMap::new();

    for (key, value) in annotations.range(LEGACY_PREFIX.to_string()..) {
        if !is_legacy_candidate(key) {
            break;
        }
        if key == skip_key {
            continue;
        }
        let Some((resource_type, owner_uid)) = parse_legacy_key(key) else {
            debug!("ignoring malformed reservation annotation {}", key);
            continue;
        };

        let quantity = if value.trim().is_empty() {
            0
        } else {
            parse_quantity(resource_type, &Quantity(value.clone()))?
        };

        by_owner.entry(owner_uid).or_default().push(ReservedResource {
            resource_type: resource_type.to_string(),
            quantity,
        });
    }

    Ok(by_owner
        .into_iter()
        .map(|(owner_uid, reserved_resources)| ReservationDeclaration {
            owner_type: String::new(),
            owner_uid: owner_uid.to_string(),
            pod_name: String::new(),
            reserved_resources,
        })
        .collect())
}
