//! `default-purchase`: stock-decrementing sale with payment.
//!
//! Same payment spine as booking without the time dimension: there is no
//! provider acceptance step, paying is the purchase.
//!
//! ```text
//! INITIAL --request-payment--> PENDING_PAYMENT --confirm-payment--> PURCHASED
//! PURCHASED --mark-delivered--> DELIVERED --mark-received--> COMPLETED -> reviews
//! ```

use crate::definition::{
    transition_table, Actor, ProcessDefinition, ProcessKind, State, TransitionDef,
};
use crate::error::DefinitionError;
use crate::processes::{action_table, review_transitions, states};

pub const NAME: &str = "default-purchase";

pub const INQUIRE: &str = "transition/inquire";
pub const REQUEST_PAYMENT: &str = "transition/request-payment";
pub const REQUEST_PAYMENT_AFTER_INQUIRY: &str = "transition/request-payment-after-inquiry";
pub const CONFIRM_PAYMENT: &str = "transition/confirm-payment";
pub const EXPIRE_PAYMENT: &str = "transition/expire-payment";
pub const MARK_DELIVERED: &str = "transition/mark-delivered";
pub const CANCEL: &str = "transition/cancel";
pub const AUTO_CANCEL: &str = "transition/auto-cancel";
pub const MARK_RECEIVED: &str = "transition/mark-received";
pub const AUTO_MARK_RECEIVED: &str = "transition/auto-mark-received";
pub const DISPUTE: &str = "transition/dispute";
pub const MARK_RECEIVED_FROM_DISPUTED: &str = "transition/mark-received-from-disputed";
pub const CANCEL_FROM_DISPUTED: &str = "transition/cancel-from-disputed";

pub fn definition() -> Result<ProcessDefinition, DefinitionError> {
    use State::*;
    let mut transitions = vec![
        TransitionDef::new(INQUIRE, &[Initial], Inquiry, Actor::Customer),
        TransitionDef::new(REQUEST_PAYMENT, &[Initial], PendingPayment, Actor::Customer)
            .privileged(),
        TransitionDef::new(
            REQUEST_PAYMENT_AFTER_INQUIRY,
            &[Inquiry],
            PendingPayment,
            Actor::Customer,
        )
        .privileged(),
        TransitionDef::new(CONFIRM_PAYMENT, &[PendingPayment], Purchased, Actor::Customer),
        TransitionDef::new(EXPIRE_PAYMENT, &[PendingPayment], PaymentExpired, Actor::System),
        TransitionDef::new(MARK_DELIVERED, &[Purchased], Delivered, Actor::Provider),
        TransitionDef::new(CANCEL, &[Purchased], Canceled, Actor::Operator).privileged(),
        TransitionDef::new(AUTO_CANCEL, &[Purchased], Canceled, Actor::System).privileged(),
        TransitionDef::new(MARK_RECEIVED, &[Delivered], Completed, Actor::Customer),
        TransitionDef::new(AUTO_MARK_RECEIVED, &[Delivered], Completed, Actor::System),
        TransitionDef::new(DISPUTE, &[Delivered], Disputed, Actor::Customer),
        TransitionDef::new(
            MARK_RECEIVED_FROM_DISPUTED,
            &[Disputed],
            Completed,
            Actor::Operator,
        ),
        TransitionDef::new(CANCEL_FROM_DISPUTED, &[Disputed], Canceled, Actor::Operator)
            .privileged(),
    ];
    transitions.extend(review_transitions());

    Ok(ProcessDefinition {
        name: NAME.to_string(),
        kind: ProcessKind::Purchase,
        states: states(&[
            Initial,
            Inquiry,
            PendingPayment,
            PaymentExpired,
            Purchased,
            Canceled,
            Delivered,
            Disputed,
            Completed,
            ReviewedByCustomer,
            ReviewedByProvider,
            Reviewed,
        ]),
        transitions: transition_table(NAME, transitions)?,
        initial_state: Initial,
        terminal_states: states(&[PaymentExpired, Canceled, Reviewed]),
        path: vec![
            vec![Initial],
            vec![Inquiry],
            vec![PendingPayment],
            vec![Purchased],
            vec![Delivered],
            vec![Completed],
            vec![ReviewedByCustomer, ReviewedByProvider],
            vec![Reviewed],
        ],
        completed_state: Some(Completed),
        refunded_states: states(&[Canceled]),
        action_needed: action_table(
            &[PendingPayment, Delivered, Completed, ReviewedByProvider],
            &[Purchased, Completed, ReviewedByCustomer],
        ),
    })
}
