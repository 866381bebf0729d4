//! Field and allowed-value resolution.
//!
//! Agents address fields by display name ("Story Points", "priority") and
//! option values by approximate label ("hi" for "High"). The pure functions
//! here turn those into field ids and concrete allowed values; the client
//! supplies the catalog and edit metadata.

use tracklens_core::matching::{best_match, compact, match_within, MatchThreshold};
use tracklens_core::{AllowedValue, Error, FieldDescriptor, FieldKind, FieldSchema, Result};

use crate::types::{JiraEditMeta, JiraEditMetaField, JiraField};

/// Compact name the story points field must have.
const STORY_POINTS: &str = "storypoints";

/// Map a GET /field entry to a catalog descriptor.
pub fn map_field(field: JiraField) -> FieldDescriptor {
    let (schema_type, custom) = match &field.schema {
        Some(schema) => (schema.schema_type.as_deref(), schema.custom.clone()),
        None => (None, None),
    };
    FieldDescriptor {
        schema: FieldSchema {
            kind: FieldKind::from_schema(schema_type, custom.as_deref()),
            custom,
        },
        id: field.id,
        name: field.name,
        custom: field.custom,
    }
}

/// Resolve a display name (or id) to the closest catalog entry.
///
/// No threshold is applied: any non-empty catalog yields a field.
pub fn resolve_field<'a>(
    input: &str,
    catalog: &'a [FieldDescriptor],
) -> Result<&'a FieldDescriptor> {
    let trimmed = input.trim();
    if let Some(by_id) = catalog.iter().find(|f| f.id.eq_ignore_ascii_case(trimmed)) {
        return Ok(by_id);
    }

    best_match(trimmed, catalog.iter().map(|f| (f.name.as_str(), f)))
        .map(|m| m.payload)
        .ok_or_else(|| Error::FieldNotFound(input.to_string()))
}

/// Resolve a display name (or id) to a field id.
pub fn resolve_field_id(input: &str, catalog: &[FieldDescriptor]) -> Result<String> {
    resolve_field(input, catalog).map(|f| f.id.clone())
}

/// Find the story points field by exact compacted name.
pub fn find_story_points_field(catalog: &[FieldDescriptor]) -> Result<&FieldDescriptor> {
    catalog
        .iter()
        .find(|f| compact(&f.name) == STORY_POINTS)
        .ok_or_else(|| Error::FieldNotFound("Story Points".to_string()))
}

/// Look up a field in an issue's edit metadata.
pub fn editable_field<'a>(
    meta: &'a JiraEditMeta,
    issue: &str,
    field_id: &str,
) -> Result<&'a JiraEditMetaField> {
    meta.fields
        .get(field_id)
        .ok_or_else(|| Error::FieldNotEditable {
            issue: issue.to_string(),
            field: field_id.to_string(),
        })
}

/// Allowed values of an editable field, in catalog order.
///
/// Labels come from `value`, falling back to `name`; entries with neither
/// are skipped.
pub fn allowed_values(field: &JiraEditMetaField) -> Vec<AllowedValue> {
    field
        .allowed_values
        .iter()
        .flatten()
        .filter_map(|raw| {
            let label = raw
                .get("value")
                .and_then(|v| v.as_str())
                .or_else(|| raw.get("name").and_then(|v| v.as_str()))?;
            let id = match raw.get("id") {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            Some(AllowedValue {
                id,
                value: label.to_string(),
            })
        })
        .collect()
}

/// Pick the allowed value closest to `input` under the strict option threshold.
pub fn select_allowed_value(
    field_id: &str,
    input: &str,
    values: &[AllowedValue],
) -> Result<AllowedValue> {
    if values.is_empty() {
        return Err(Error::NotAnOptionField(field_id.to_string()));
    }

    match_within(
        input,
        values.iter().map(|v| (v.value.as_str(), v)),
        MatchThreshold::StrictOption,
    )
    .map(|m| m.payload.clone())
    .ok_or_else(|| Error::NoCloseMatch {
        input: input.to_string(),
        candidates: values.iter().map(|v| v.value.clone()).collect(),
        omitted: 0,
    })
}
