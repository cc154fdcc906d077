//! Custom-format reconciliation.
//!
//! Canonical formats are matched to server formats by `name`: the stable trash id is not
//! stored on the server. A format without a server counterpart is created; otherwise the
//! request shapes of both sides are compared with [`structural_diff::compare`] and the
//! format is updated only when they differ.

use crate::diff::DiffResult;
use crate::structural_diff;
use arr_client::{CustomFormatPayload, SpecificationField, SpecificationPayload};
use arr_config::{CanonicalCustomFormat, DeleteUnmanagedPolicy};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

#[cfg(test)]
#[path = "custom_formats_tests.rs"]
mod tests;

/// The request payload for a canonical format, without a server id.
pub fn to_payload(format: &CanonicalCustomFormat) -> CustomFormatPayload {
    CustomFormatPayload {
        id: None,
        name: format.name.clone(),
        include_custom_format_when_renaming: format.include_custom_format_when_renaming,
        specifications: format
            .specifications
            .iter()
            .map(|spec| SpecificationPayload {
                name: spec.name.clone(),
                implementation: spec.implementation().to_string(),
                negate: spec.negate,
                required: spec.required,
                fields: spec
                    .fields
                    .to_fields()
                    .into_iter()
                    .map(|(name, value)| SpecificationField::new(name, value))
                    .collect(),
            })
            .collect(),
    }
}

/// The comparable request shape of a payload: its JSON form without the server id.
fn request_shape(payload: &CustomFormatPayload) -> Value {
    let mut value = serde_json::to_value(payload).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.remove("id");
    }
    value
}

/// Decides create, update or no-op for every canonical format.
///
/// When two canonical formats share a name the later one wins, so each name is created or
/// updated at most once.
pub fn reconcile(
    canonical: &[CanonicalCustomFormat],
    server: &[CustomFormatPayload],
) -> DiffResult<CustomFormatPayload> {
    let mut desired: Vec<CustomFormatPayload> = Vec::with_capacity(canonical.len());
    for format in canonical {
        let payload = to_payload(format);
        match desired.iter_mut().find(|existing| existing.name == payload.name) {
            Some(existing) => {
                warn!(
                    name = %payload.name,
                    trash_id = %format.trash_id,
                    "Several custom formats share a name, the last one wins"
                );
                *existing = payload;
            }
            None => desired.push(payload),
        }
    }

    let server_by_name: HashMap<&str, &CustomFormatPayload> =
        server.iter().map(|cf| (cf.name.as_str(), cf)).collect();

    let mut result = DiffResult::default();
    for mut payload in desired {
        match server_by_name.get(payload.name.as_str()) {
            None => {
                debug!(name = %payload.name, "Custom format missing on server");
                result
                    .change_log
                    .insert(payload.name.clone(), vec!["create".to_string()]);
                result.to_create.push(payload);
            }
            Some(existing) => {
                let diff = structural_diff::compare(&request_shape(existing), &request_shape(&payload));
                if diff.equal {
                    result.unchanged.push(payload.name);
                } else {
                    debug!(name = %payload.name, changes = diff.changes.len(), "Custom format differs");
                    payload.id = existing.id;
                    result.change_log.insert(payload.name.clone(), diff.changes);
                    result.to_update.push(payload);
                }
            }
        }
    }
    result
}

/// Server formats that are neither managed nor protected by the ignore list.
pub fn find_unmanaged<'a>(
    server: &'a [CustomFormatPayload],
    managed_names: &[String],
    policy: &DeleteUnmanagedPolicy,
) -> Vec<&'a CustomFormatPayload> {
    if !policy.enabled {
        return Vec::new();
    }
    server
        .iter()
        .filter(|cf| !managed_names.contains(&cf.name) && !policy.ignore.contains(&cf.name))
        .collect()
}

/// Maps format names to server ids.
pub fn id_map(server: &[CustomFormatPayload]) -> BTreeMap<String, i64> {
    server
        .iter()
        .filter_map(|cf| cf.id.map(|id| (cf.name.clone(), id)))
        .collect()
}
