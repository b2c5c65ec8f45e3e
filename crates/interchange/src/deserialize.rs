//! Deserialization from API response envelopes into flat resource lists.
//!
//! The main entry point is [`from_response`], which takes a
//! `&serde_json::Value` envelope (`data`, `included`, `meta`) and produces
//! a [`ParsedResponse`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::types::*;

/// Envelope-level errors. Problems inside a single resource are recorded
/// as [`ParseWarning`]s instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterchangeError {
    /// The envelope is missing a required top-level field.
    MissingField { field: String },
    /// The envelope structure is invalid.
    InvalidEnvelope(String),
}

impl fmt::Display for InterchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterchangeError::MissingField { field } => {
                write!(f, "response missing required field: '{}'", field)
            }
            InterchangeError::InvalidEnvelope(msg) => {
                write!(f, "invalid response envelope: {}", msg)
            }
        }
    }
}

impl std::error::Error for InterchangeError {}

/// Flatten a response envelope into raw resources.
///
/// Primary resources come first, then `included`. Resources without an
/// `id` or `type` are dropped with a warning; they cannot be addressed
/// later, so merging them would be meaningless.
pub fn from_response(envelope: &Value) -> Result<ParsedResponse, InterchangeError> {
    let obj = envelope
        .as_object()
        .ok_or_else(|| InterchangeError::InvalidEnvelope("expected a JSON object".to_string()))?;

    let data = obj.get("data").ok_or_else(|| InterchangeError::MissingField {
        field: "data".to_string(),
    })?;

    let mut warnings = Vec::new();
    let mut resources = Vec::new();
    let mut data_refs = Vec::new();

    let data_is_list = match data {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                if let Some(resource) = parse_resource(item, "data", index, &mut warnings) {
                    data_refs.push(resource.reference.clone());
                    resources.push(resource);
                }
            }
            true
        }
        Value::Object(_) => {
            if let Some(resource) = parse_resource(data, "data", 0, &mut warnings) {
                data_refs.push(resource.reference.clone());
                resources.push(resource);
            }
            false
        }
        Value::Null => false,
        _ => {
            return Err(InterchangeError::InvalidEnvelope(
                "'data' must be an object, an array or null".to_string(),
            ))
        }
    };

    match obj.get("included") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                if let Some(resource) = parse_resource(item, "included", index, &mut warnings) {
                    resources.push(resource);
                }
            }
        }
        Some(_) => {
            return Err(InterchangeError::InvalidEnvelope(
                "'included' must be an array".to_string(),
            ))
        }
    }

    let meta = obj.get("meta").and_then(parse_pagination);

    for warning in &warnings {
        tracing::warn!(%warning, "dropped malformed response content");
    }

    Ok(ParsedResponse {
        data: data_refs,
        data_is_list,
        resources,
        meta,
        warnings,
    })
}

// ── Parsing helpers ─────────────────────────────────────────────────

/// Read an identity value: `{"uuid": "..."}` or a bare string.
pub fn parse_id(value: &Value) -> Option<ResourceId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(ResourceId(s.clone())),
        Value::Object(map) => match map.get("uuid") {
            Some(Value::String(s)) if !s.is_empty() => Some(ResourceId(s.clone())),
            _ => None,
        },
        _ => None,
    }
}

/// Read a `{id, type}` reference object.
pub fn parse_ref(value: &Value) -> Option<ResourceRef> {
    let id = parse_id(value.get("id")?)?;
    let kind = value.get("type")?.as_str()?;
    if kind.is_empty() {
        return None;
    }
    Some(ResourceRef {
        kind: kind.to_string(),
        id,
    })
}

fn parse_resource(
    value: &Value,
    section: &str,
    index: usize,
    warnings: &mut Vec<ParseWarning>,
) -> Option<RawResource> {
    let malformed = |message: &str| ParseWarning::MalformedResource {
        section: section.to_string(),
        index,
        message: message.to_string(),
    };

    if !value.is_object() {
        warnings.push(malformed("resource is not an object"));
        return None;
    }
    let id = match value.get("id").and_then(parse_id) {
        Some(id) => id,
        None => {
            warnings.push(malformed("missing or invalid 'id'"));
            return None;
        }
    };
    let kind = match value.get("type").and_then(|t| t.as_str()) {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => {
            warnings.push(malformed("missing or invalid 'type'"));
            return None;
        }
    };
    let reference = ResourceRef { kind, id };

    let mut attributes = Attributes::new();
    if let Some(Value::Object(attrs)) = value.get("attributes") {
        for (key, raw) in attrs {
            let mut bad_tags = Vec::new();
            attributes.insert(key.clone(), parse_attr(raw, &mut bad_tags));
            for tag in bad_tags {
                warnings.push(ParseWarning::MalformedTaggedValue {
                    resource: reference.clone(),
                    key: key.clone(),
                    tag,
                });
            }
        }
    }

    let mut relationships = BTreeMap::new();
    if let Some(Value::Object(rels)) = value.get("relationships") {
        for (name, rel) in rels {
            // Links-only relationships carry no `data` and say nothing about
            // the related resource.
            let Some(data) = rel.get("data") else {
                if !rel.is_object() {
                    warnings.push(ParseWarning::MalformedRelationship {
                        resource: reference.clone(),
                        name: name.clone(),
                    });
                }
                continue;
            };
            match parse_relationship(data) {
                Some((parsed, complete)) => {
                    if !complete {
                        warnings.push(ParseWarning::MalformedRelationship {
                            resource: reference.clone(),
                            name: name.clone(),
                        });
                    }
                    relationships.insert(name.clone(), parsed);
                }
                None => warnings.push(ParseWarning::MalformedRelationship {
                    resource: reference.clone(),
                    name: name.clone(),
                }),
            }
        }
    }

    Some(RawResource {
        reference,
        attributes,
        relationships,
    })
}

/// Returns the relationship and whether every element parsed cleanly.
/// Bad elements of a to-many relationship are skipped.
fn parse_relationship(data: &Value) -> Option<(Relationship, bool)> {
    match data {
        Value::Null => Some((Relationship::Empty, true)),
        Value::Array(items) => {
            let refs: Vec<ResourceRef> = items.iter().filter_map(parse_ref).collect();
            let complete = refs.len() == items.len();
            Some((Relationship::Many(refs), complete))
        }
        Value::Object(_) => parse_ref(data).map(|r| (Relationship::One(r), true)),
        _ => None,
    }
}

/// Convert a JSON attribute value, recognizing `_sdkType`-tagged primitives.
/// Tags whose payload is malformed are reported through `bad_tags`.
pub fn parse_attr(value: &Value, bad_tags: &mut Vec<String>) -> AttrValue {
    match value {
        Value::Null => AttrValue::Null,
        Value::Bool(b) => AttrValue::Bool(*b),
        Value::Number(n) => parse_number(n),
        Value::String(s) => AttrValue::Text(s.clone()),
        Value::Array(items) => {
            AttrValue::List(items.iter().map(|v| parse_attr(v, bad_tags)).collect())
        }
        Value::Object(map) => {
            if let Some(tag) = map.get("_sdkType").and_then(|t| t.as_str()) {
                match parse_tagged(tag, value) {
                    Some(tagged) => return tagged,
                    None => bad_tags.push(tag.to_string()),
                }
            }
            AttrValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), parse_attr(v, bad_tags)))
                    .collect(),
            )
        }
    }
}

fn parse_tagged(tag: &str, value: &Value) -> Option<AttrValue> {
    match tag {
        "Money" => {
            let amount_minor = value.get("amount")?.as_i64()?;
            let currency = value.get("currency")?.as_str()?;
            Some(AttrValue::Money(Money::new(amount_minor, currency)))
        }
        "LatLng" => {
            let lat = json_decimal(value.get("lat")?)?;
            let lng = json_decimal(value.get("lng")?)?;
            Some(AttrValue::GeoPoint(GeoPoint { lat, lng }))
        }
        "UUID" => parse_id(value).map(AttrValue::Id),
        _ => None,
    }
}

fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => number_to_decimal(n),
        Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

fn number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn parse_number(n: &serde_json::Number) -> AttrValue {
    match number_to_decimal(n) {
        Some(d) => AttrValue::Number(d),
        // Out of Decimal range; keep the literal rather than lose it.
        None => AttrValue::Text(n.to_string()),
    }
}

fn parse_pagination(meta: &Value) -> Option<Pagination> {
    Some(Pagination {
        page: meta.get("page")?.as_u64()?,
        per_page: meta.get("perPage").and_then(|v| v.as_u64()),
        total_pages: meta.get("totalPages")?.as_u64()?,
        total_items: meta.get("totalItems")?.as_u64()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(id: &str) -> Value {
        json!({
            "id": { "uuid": id },
            "type": "listing",
            "attributes": { "title": "Sauna" },
            "relationships": {
                "author": { "data": { "id": { "uuid": "u1" }, "type": "user" } }
            }
        })
    }

    #[test]
    fn test_single_resource_show() {
        let parsed = from_response(&json!({ "data": listing("l1") })).unwrap();
        assert!(!parsed.data_is_list);
        assert_eq!(parsed.data, vec![ResourceRef::new("listing", "l1")]);
        assert_eq!(parsed.resources.len(), 1);
        let res = &parsed.resources[0];
        assert_eq!(
            res.attributes.get("title"),
            Some(&AttrValue::Text("Sauna".to_string()))
        );
        assert_eq!(
            res.relationships.get("author"),
            Some(&Relationship::One(ResourceRef::new("user", "u1")))
        );
    }

    #[test]
    fn test_list_with_included_preserves_order() {
        let parsed = from_response(&json!({
            "data": [listing("l2"), listing("l1")],
            "included": [
                { "id": { "uuid": "u1" }, "type": "user", "attributes": {} }
            ],
            "meta": { "page": 1, "perPage": 2, "totalPages": 3, "totalItems": 6 }
        }))
        .unwrap();
        assert!(parsed.data_is_list);
        assert_eq!(
            parsed.data,
            vec![
                ResourceRef::new("listing", "l2"),
                ResourceRef::new("listing", "l1")
            ]
        );
        assert_eq!(parsed.resources.len(), 3);
        assert_eq!(parsed.resources[2].reference, ResourceRef::new("user", "u1"));
        assert_eq!(
            parsed.meta,
            Some(Pagination {
                page: 1,
                per_page: Some(2),
                total_pages: 3,
                total_items: 6
            })
        );
    }

    #[test]
    fn test_missing_data_is_error() {
        let err = from_response(&json!({ "included": [] })).unwrap_err();
        assert_eq!(
            err,
            InterchangeError::MissingField {
                field: "data".to_string()
            }
        );
    }

    #[test]
    fn test_non_object_envelope_is_error() {
        assert!(matches!(
            from_response(&json!([1, 2])),
            Err(InterchangeError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_included_must_be_array() {
        assert!(matches!(
            from_response(&json!({ "data": null, "included": {} })),
            Err(InterchangeError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_null_data_yields_no_refs() {
        let parsed = from_response(&json!({ "data": null })).unwrap();
        assert!(parsed.data.is_empty());
        assert!(parsed.resources.is_empty());
    }

    #[test]
    fn test_malformed_resources_dropped_with_warning() {
        let parsed = from_response(&json!({
            "data": [
                { "type": "listing", "attributes": {} },
                { "id": { "uuid": "l1" }, "attributes": {} },
                listing("l2")
            ]
        }))
        .unwrap();
        assert_eq!(parsed.data, vec![ResourceRef::new("listing", "l2")]);
        assert_eq!(parsed.warnings.len(), 2);
        assert!(parsed
            .warnings
            .iter()
            .all(|w| matches!(w, ParseWarning::MalformedResource { .. })));
    }

    #[test]
    fn test_relationship_shapes() {
        let parsed = from_response(&json!({
            "data": {
                "id": "l1",
                "type": "listing",
                "relationships": {
                    "images": { "data": [
                        { "id": { "uuid": "i1" }, "type": "image" },
                        { "id": { "uuid": "i2" }, "type": "image" }
                    ] },
                    "currentStock": { "data": null },
                    "author": { "links": { "self": "/users/u1" } }
                }
            }
        }))
        .unwrap();
        let rels = &parsed.resources[0].relationships;
        assert_eq!(
            rels.get("images"),
            Some(&Relationship::Many(vec![
                ResourceRef::new("image", "i1"),
                ResourceRef::new("image", "i2")
            ]))
        );
        assert_eq!(rels.get("currentStock"), Some(&Relationship::Empty));
        // Links-only relationship is absent, not empty.
        assert!(!rels.contains_key("author"));
    }

    #[test]
    fn test_bad_to_many_element_is_skipped() {
        let parsed = from_response(&json!({
            "data": {
                "id": "l1",
                "type": "listing",
                "relationships": {
                    "images": { "data": [
                        { "id": { "uuid": "i1" }, "type": "image" },
                        { "type": "image" }
                    ] }
                }
            }
        }))
        .unwrap();
        assert_eq!(
            parsed.resources[0].relationships.get("images"),
            Some(&Relationship::Many(vec![ResourceRef::new("image", "i1")]))
        );
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_tagged_primitives() {
        let parsed = from_response(&json!({
            "data": {
                "id": "l1",
                "type": "listing",
                "attributes": {
                    "price": { "_sdkType": "Money", "amount": 5500, "currency": "EUR" },
                    "geolocation": { "_sdkType": "LatLng", "lat": 60.17, "lng": 24.94 },
                    "owner": { "_sdkType": "UUID", "uuid": "u9" },
                    "broken": { "_sdkType": "Money", "amount": "lots" },
                    "rating": 4.5
                }
            }
        }))
        .unwrap();
        let attrs = &parsed.resources[0].attributes;
        assert_eq!(
            attrs.get("price"),
            Some(&AttrValue::Money(Money::new(5500, "EUR")))
        );
        assert_eq!(
            attrs.get("geolocation"),
            Some(&AttrValue::GeoPoint(GeoPoint {
                lat: Decimal::from_str("60.17").unwrap(),
                lng: Decimal::from_str("24.94").unwrap(),
            }))
        );
        assert_eq!(attrs.get("owner"), Some(&AttrValue::Id(ResourceId::from("u9"))));
        assert!(matches!(attrs.get("broken"), Some(AttrValue::Object(_))));
        assert_eq!(
            attrs.get("rating"),
            Some(&AttrValue::Number(Decimal::from_str("4.5").unwrap()))
        );
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_ids_compare_by_value_across_parses() {
        let a = from_response(&json!({ "data": listing("same") })).unwrap();
        let b = from_response(&json!({ "data": listing("same") })).unwrap();
        assert_eq!(a.data[0], b.data[0]);
        assert_eq!(a.resources, b.resources);
    }
}
