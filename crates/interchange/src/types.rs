//! Typed structs representing the marketplace API wire envelope.
//!
//! Tagged primitives (identity, money, geo-points) are explicit value types
//! with value equality, so the same logical id or amount arriving through
//! two independent parses compares equal.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ── Identity ────────────────────────────────────────────────────────

/// Opaque resource identity. Equality is on the underlying value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(value: impl Into<String>) -> Self {
        ResourceId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        ResourceId(s.to_string())
    }
}

/// A (type, id) pair addressing a resource without carrying its data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// The wire `type` field (e.g. "listing", "user", "transaction").
    pub kind: String,
    pub id: ResourceId,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        ResourceRef {
            kind: kind.into(),
            id: ResourceId(id.into()),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

// ── Tagged primitives ───────────────────────────────────────────────

/// A monetary amount in minor units (cents) of a currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: i64,
    pub currency: String,
}

/// Errors from money arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    CurrencyMismatch { left: String, right: String },
    Overflow,
}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyError::CurrencyMismatch { left, right } => {
                write!(f, "currency mismatch: {} vs {}", left, right)
            }
            MoneyError::Overflow => write!(f, "money amount overflow"),
        }
    }
}

impl std::error::Error for MoneyError {}

impl Money {
    pub fn new(amount_minor: i64, currency: impl Into<String>) -> Self {
        Money {
            amount_minor,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Money::new(0, currency)
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.same_currency(other)?;
        let amount_minor = self
            .amount_minor
            .checked_add(other.amount_minor)
            .ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount_minor, self.currency.clone()))
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.same_currency(other)?;
        let amount_minor = self
            .amount_minor
            .checked_sub(other.amount_minor)
            .ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount_minor, self.currency.clone()))
    }

    fn same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = Decimal::new(self.amount_minor, 2);
        write!(f, "{} {}", major, self.currency)
    }
}

/// A geographic point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: Decimal,
    pub lng: Decimal,
}

// ── Attribute values ────────────────────────────────────────────────

/// An attribute value from the wire.
///
/// All numeric values use `rust_decimal::Decimal`, never `f64`, so that
/// attribute maps have value equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(Decimal),
    Text(String),
    Id(ResourceId),
    Money(Money),
    GeoPoint(GeoPoint),
    List(Vec<AttrValue>),
    Object(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_money(&self) -> Option<&Money> {
        match self {
            AttrValue::Money(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            AttrValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Render back to JSON. Tagged primitives keep their `_sdkType` tag.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Value};
        match self {
            AttrValue::Null => Value::Null,
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Number(n) => decimal_to_json(*n),
            AttrValue::Text(s) => Value::String(s.clone()),
            AttrValue::Id(id) => json!({ "_sdkType": "UUID", "uuid": id.as_str() }),
            AttrValue::Money(m) => json!({
                "_sdkType": "Money",
                "amount": m.amount_minor,
                "currency": m.currency,
            }),
            AttrValue::GeoPoint(p) => json!({
                "_sdkType": "LatLng",
                "lat": decimal_to_json(p.lat),
                "lng": decimal_to_json(p.lng),
            }),
            AttrValue::List(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            AttrValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn decimal_to_json(n: Decimal) -> serde_json::Value {
    // Integral values render as JSON integers when they fit.
    if n.fract().is_zero() {
        if let Some(i) = n.to_i64() {
            return serde_json::Value::from(i);
        }
    }
    n.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(n.to_string()))
}

/// Attribute map of a resource.
pub type Attributes = BTreeMap<String, AttrValue>;

// ── Resources ───────────────────────────────────────────────────────

/// A relationship value as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relationship {
    One(ResourceRef),
    Many(Vec<ResourceRef>),
    /// Explicit `null`: the resource has no related resource.
    Empty,
}

/// A single resource as served by the API, with relationships still
/// expressed as references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResource {
    pub reference: ResourceRef,
    pub attributes: Attributes,
    pub relationships: BTreeMap<String, Relationship>,
}

impl RawResource {
    pub fn new(reference: ResourceRef) -> Self {
        RawResource {
            reference,
            attributes: Attributes::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_relationship(mut self, name: impl Into<String>, rel: Relationship) -> Self {
        self.relationships.insert(name.into(), rel);
        self
    }
}

// ── Envelope ────────────────────────────────────────────────────────

/// Paging metadata from the envelope `meta` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub per_page: Option<u64>,
    pub total_pages: u64,
    pub total_items: u64,
}

/// Non-fatal problems recorded while flattening a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// A resource without a usable `id` or `type`; never merged.
    MalformedResource { section: String, index: usize, message: String },
    /// A relationship whose `data` could not be read; omitted from the resource.
    MalformedRelationship { resource: ResourceRef, name: String },
    /// A tagged primitive with a bad payload; kept as a plain object.
    MalformedTaggedValue { resource: ResourceRef, key: String, tag: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::MalformedResource {
                section,
                index,
                message,
            } => write!(f, "{}[{}]: {}", section, index, message),
            ParseWarning::MalformedRelationship { resource, name } => {
                write!(f, "{}: malformed relationship '{}'", resource, name)
            }
            ParseWarning::MalformedTaggedValue { resource, key, tag } => {
                write!(f, "{}: attribute '{}' has malformed {} value", resource, key, tag)
            }
        }
    }
}

/// A flattened API response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    /// References to the primary resources, in `data` order.
    pub data: Vec<ResourceRef>,
    /// Whether `data` was an array on the wire (a "query") or a single resource (a "show").
    pub data_is_list: bool,
    /// Primary resources first, then `included`, in wire order.
    pub resources: Vec<RawResource>,
    pub meta: Option<Pagination>,
    pub warnings: Vec<ParseWarning>,
}
