//! Line items and payin/payout totals.
//!
//! Each line item declares which parties it is included for. The customer's
//! included items sum to the payin total, the provider's to the payout total.
//! Commission items are typically included for one party only, with a
//! negative total on the provider side.

use bazaar_interchange::{AttrValue, Money, MoneyError};
use rust_decimal::Decimal;

use crate::definition::Role;
use crate::error::TransactionError;
use crate::transaction::{invalid, missing, money, text, Transaction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub code: String,
    pub unit_price: Money,
    pub quantity: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub line_total: Money,
    pub include_for: Vec<Role>,
    pub reversal: bool,
}

impl LineItem {
    pub fn is_included_for(&self, role: Role) -> bool {
        self.include_for.contains(&role)
    }

    /// Parse one entry of a `lineItems` attribute.
    pub fn from_attr(value: &AttrValue) -> Result<LineItem, TransactionError> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("lineItems", "entry is not an object"))?;
        let code = text(obj, "code")?
            .ok_or_else(|| missing("lineItems.code"))?
            .to_string();
        let unit_price = money(obj, "unitPrice")?.ok_or_else(|| missing("lineItems.unitPrice"))?;
        let line_total = money(obj, "lineTotal")?.ok_or_else(|| missing("lineItems.lineTotal"))?;

        let include_for = match obj.get("includeFor").and_then(AttrValue::as_list) {
            Some(roles) => roles
                .iter()
                .map(|r| {
                    r.as_str().and_then(Role::parse).ok_or_else(|| {
                        invalid("lineItems.includeFor", "expected 'customer' or 'provider'")
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => return Err(missing("lineItems.includeFor")),
        };

        Ok(LineItem {
            code,
            unit_price,
            quantity: obj.get("quantity").and_then(AttrValue::as_decimal),
            percentage: obj.get("percentage").and_then(AttrValue::as_decimal),
            line_total,
            include_for,
            reversal: obj
                .get("reversal")
                .and_then(AttrValue::as_bool)
                .unwrap_or(false),
        })
    }
}

/// Sum of line totals included for `role`; `None` when no item is.
pub fn total_for(items: &[LineItem], role: Role) -> Result<Option<Money>, MoneyError> {
    let mut total: Option<Money> = None;
    for item in items.iter().filter(|i| i.is_included_for(role)) {
        total = Some(match total {
            Some(sum) => sum.checked_add(&item.line_total)?,
            None => item.line_total.clone(),
        });
    }
    Ok(total)
}

/// Line-item sums compared with the totals the backend reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsCheck {
    pub payin_expected: Option<Money>,
    pub payin_reported: Option<Money>,
    pub payout_expected: Option<Money>,
    pub payout_reported: Option<Money>,
}

impl TotalsCheck {
    pub fn payin_matches(&self) -> bool {
        self.payin_expected == self.payin_reported
    }

    pub fn payout_matches(&self) -> bool {
        self.payout_expected == self.payout_reported
    }

    pub fn is_consistent(&self) -> bool {
        self.payin_matches() && self.payout_matches()
    }
}

pub fn check_totals(tx: &Transaction) -> Result<TotalsCheck, MoneyError> {
    let check = TotalsCheck {
        payin_expected: total_for(&tx.line_items, Role::Customer)?,
        payin_reported: tx.payin_total.clone(),
        payout_expected: total_for(&tx.line_items, Role::Provider)?,
        payout_reported: tx.payout_total.clone(),
    };
    if !check.is_consistent() {
        tracing::warn!(transaction = %tx.reference, "line items do not add up to reported totals");
    }
    Ok(check)
}
