//! Standard labels attached to every provisioned resource

use crate::model::{CloudResourceKind, CloudResourceMetadata};
use std::collections::BTreeMap;

pub const RESOURCE: &str = "resource";
pub const RESOURCE_NAME: &str = "resource_name";
pub const RESOURCE_KIND: &str = "resource_kind";
pub const RESOURCE_ID: &str = "resource_id";
pub const ORGANIZATION: &str = "organization";
pub const ENVIRONMENT: &str = "environment";

/// Labels derived from resource metadata
///
/// `resource_id`, `organization` and `environment` are only present when the
/// corresponding metadata field is non-empty.
pub fn standard_labels(
    metadata: &CloudResourceMetadata,
    kind: CloudResourceKind,
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(RESOURCE.to_string(), "true".to_string());
    labels.insert(RESOURCE_NAME.to_string(), metadata.name.clone());
    labels.insert(RESOURCE_KIND.to_string(), kind.to_string());

    let optional = [
        (RESOURCE_ID, &metadata.id),
        (ORGANIZATION, &metadata.org),
        (ENVIRONMENT, &metadata.env),
    ];
    for (key, value) in optional {
        if !value.is_empty() {
            labels.insert(key.to_string(), value.clone());
        }
    }

    labels
}

/// `base` overlaid with `extra`; keys in `extra` win
pub fn merge_labels(
    base: &BTreeMap<String, String>,
    extra: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
