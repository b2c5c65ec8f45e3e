//! Built-in process definitions.
//!
//! Each module exports its process name, the transition name constants the
//! client issues, and a `definition()` constructor. Definitions are
//! validated when the registry is built.

pub mod booking;
pub mod inquiry;
pub mod purchase;

use std::collections::{BTreeMap, BTreeSet};

use crate::definition::{Actor, Role, State, TransitionDef};

pub const REVIEW_1_BY_CUSTOMER: &str = "transition/review-1-by-customer";
pub const REVIEW_1_BY_PROVIDER: &str = "transition/review-1-by-provider";
pub const REVIEW_2_BY_CUSTOMER: &str = "transition/review-2-by-customer";
pub const REVIEW_2_BY_PROVIDER: &str = "transition/review-2-by-provider";
pub const EXPIRE_REVIEW_PERIOD: &str = "transition/expire-review-period";
pub const EXPIRE_CUSTOMER_REVIEW_PERIOD: &str = "transition/expire-customer-review-period";
pub const EXPIRE_PROVIDER_REVIEW_PERIOD: &str = "transition/expire-provider-review-period";

/// The review sub-process shared by the payment processes, starting from
/// `COMPLETED`.
pub(crate) fn review_transitions() -> Vec<TransitionDef> {
    use State::*;
    vec![
        TransitionDef::new(
            REVIEW_1_BY_CUSTOMER,
            &[Completed],
            ReviewedByCustomer,
            Actor::Customer,
        ),
        TransitionDef::new(
            REVIEW_1_BY_PROVIDER,
            &[Completed],
            ReviewedByProvider,
            Actor::Provider,
        ),
        TransitionDef::new(
            REVIEW_2_BY_CUSTOMER,
            &[ReviewedByProvider],
            Reviewed,
            Actor::Customer,
        ),
        TransitionDef::new(
            REVIEW_2_BY_PROVIDER,
            &[ReviewedByCustomer],
            Reviewed,
            Actor::Provider,
        ),
        TransitionDef::new(EXPIRE_REVIEW_PERIOD, &[Completed], Reviewed, Actor::System),
        TransitionDef::new(
            EXPIRE_CUSTOMER_REVIEW_PERIOD,
            &[ReviewedByProvider],
            Reviewed,
            Actor::System,
        ),
        TransitionDef::new(
            EXPIRE_PROVIDER_REVIEW_PERIOD,
            &[ReviewedByCustomer],
            Reviewed,
            Actor::System,
        ),
    ]
}

pub(crate) fn states(states: &[State]) -> BTreeSet<State> {
    states.iter().copied().collect()
}

pub(crate) fn action_table(
    customer: &[State],
    provider: &[State],
) -> BTreeMap<Role, BTreeSet<State>> {
    let mut table = BTreeMap::new();
    table.insert(Role::Customer, states(customer));
    table.insert(Role::Provider, states(provider));
    table
}
