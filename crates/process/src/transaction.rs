//! Typed view over a resolved `transaction` entity.

use bazaar_interchange::{AttrValue, Attributes, Money, ResourceRef};
use bazaar_store::Entity;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::definition::Actor;
use crate::error::TransactionError;
use crate::line_items::LineItem;

pub const TRANSACTION_KIND: &str = "transaction";

/// One entry of the transaction's transition history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    pub transition: String,
    pub created_at: OffsetDateTime,
    pub by: Actor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub reference: ResourceRef,
    pub process_name: String,
    pub last_transition: Option<String>,
    pub last_transitioned_at: Option<OffsetDateTime>,
    pub transitions: Vec<TransitionRecord>,
    pub line_items: Vec<LineItem>,
    pub payin_total: Option<Money>,
    pub payout_total: Option<Money>,
    pub listing: Option<ResourceRef>,
    pub customer: Option<ResourceRef>,
    pub provider: Option<ResourceRef>,
}

impl Transaction {
    /// A transaction that has not transitioned yet.
    pub fn new(id: &str, process_name: &str) -> Self {
        Transaction {
            reference: ResourceRef::new(TRANSACTION_KIND, id),
            process_name: process_name.to_string(),
            last_transition: None,
            last_transitioned_at: None,
            transitions: Vec::new(),
            line_items: Vec::new(),
            payin_total: None,
            payout_total: None,
            listing: None,
            customer: None,
            provider: None,
        }
    }

    pub fn with_last_transition(mut self, transition: &str) -> Self {
        self.last_transition = Some(transition.to_string());
        self
    }

    /// Read a denormalized transaction, including its listing and parties.
    pub fn from_entity(entity: &Entity<'_>) -> Result<Transaction, TransactionError> {
        let mut tx = Transaction::from_attributes(entity.reference(), entity.attributes())?;
        let related = |name: &str| entity.related(name).map(|e| e.reference().clone());
        tx.listing = related("listing");
        tx.customer = related("customer");
        tx.provider = related("provider");
        Ok(tx)
    }

    /// Only `processName` and `lastTransition` must be well-formed. History
    /// entries, line items and totals that fail to parse are skipped with a
    /// warning so a transaction can still be described.
    pub fn from_attributes(
        reference: &ResourceRef,
        attributes: &Attributes,
    ) -> Result<Transaction, TransactionError> {
        if reference.kind != TRANSACTION_KIND {
            return Err(TransactionError::WrongKind {
                kind: reference.kind.clone(),
            });
        }

        let process_name = text(attributes, "processName")?
            .ok_or_else(|| missing("processName"))?
            .to_string();
        let last_transition = text(attributes, "lastTransition")?.map(str::to_string);

        let last_transitioned_at = lenient(
            reference,
            text(attributes, "lastTransitionedAt")
                .and_then(|s| s.map(|s| timestamp("lastTransitionedAt", s)).transpose()),
        )
        .flatten();
        let transitions = entries(reference, attributes, "transitions", transition_record);
        let line_items = entries(reference, attributes, "lineItems", LineItem::from_attr);

        Ok(Transaction {
            reference: reference.clone(),
            process_name,
            last_transition,
            last_transitioned_at,
            transitions,
            line_items,
            payin_total: lenient(reference, money(attributes, "payinTotal")).flatten(),
            payout_total: lenient(reference, money(attributes, "payoutTotal")).flatten(),
            listing: None,
            customer: None,
            provider: None,
        })
    }
}

fn lenient<T>(reference: &ResourceRef, result: Result<T, TransactionError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(transaction = %reference, error = %err, "ignoring malformed attribute");
            None
        }
    }
}

fn entries<T>(
    reference: &ResourceRef,
    attributes: &Attributes,
    name: &str,
    parse: impl Fn(&AttrValue) -> Result<T, TransactionError>,
) -> Vec<T> {
    let Some(items) = lenient(reference, list(attributes, name)).flatten() else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match parse(item) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!(
                    transaction = %reference,
                    attribute = name,
                    index,
                    error = %err,
                    "skipping malformed entry"
                );
                None
            }
        })
        .collect()
}

fn transition_record(value: &AttrValue) -> Result<TransitionRecord, TransactionError> {
    let obj = value.as_object().ok_or_else(|| invalid("transitions", "entry is not an object"))?;
    let transition = text(obj, "transition")?
        .ok_or_else(|| missing("transitions.transition"))?
        .to_string();
    let created_at = text(obj, "createdAt")?.ok_or_else(|| missing("transitions.createdAt"))?;
    let by = text(obj, "by")?.ok_or_else(|| missing("transitions.by"))?;
    Ok(TransitionRecord {
        transition,
        created_at: timestamp("transitions.createdAt", created_at)?,
        by: Actor::parse(by).ok_or_else(|| invalid("transitions.by", &format!("unknown actor '{by}'")))?,
    })
}

fn timestamp(name: &str, value: &str) -> Result<OffsetDateTime, TransactionError> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|e| invalid(name, &e.to_string()))
}

pub(crate) fn text<'a>(
    attributes: &'a Attributes,
    name: &str,
) -> Result<Option<&'a str>, TransactionError> {
    match attributes.get(name) {
        None | Some(AttrValue::Null) => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| invalid(name, "expected a string")),
    }
}

pub(crate) fn money(attributes: &Attributes, name: &str) -> Result<Option<Money>, TransactionError> {
    match attributes.get(name) {
        None | Some(AttrValue::Null) => Ok(None),
        Some(value) => value
            .as_money()
            .cloned()
            .map(Some)
            .ok_or_else(|| invalid(name, "expected a Money value")),
    }
}

fn list<'a>(
    attributes: &'a Attributes,
    name: &str,
) -> Result<Option<&'a [AttrValue]>, TransactionError> {
    match attributes.get(name) {
        None | Some(AttrValue::Null) => Ok(None),
        Some(value) => value
            .as_list()
            .map(Some)
            .ok_or_else(|| invalid(name, "expected a list")),
    }
}

pub(crate) fn missing(name: &str) -> TransactionError {
    TransactionError::MissingAttribute {
        name: name.to_string(),
    }
}

pub(crate) fn invalid(name: &str, message: &str) -> TransactionError {
    TransactionError::InvalidAttribute {
        name: name.to_string(),
        message: message.to_string(),
    }
}
