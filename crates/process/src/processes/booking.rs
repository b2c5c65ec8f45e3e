//! `default-booking`: time-slot reservation with payment.
//!
//! ```text
//! INITIAL --inquire--> INQUIRY --request-after-inquiry--+
//!    |                                                  v
//!    +-------------------request-----------------> PENDING_PAYMENT --accept--> ACCEPTED
//!                              decline / expire-request |                         |
//!                              DECLINED / EXPIRED  <----+   expire-payment -> PAYMENT_EXPIRED
//!                                                                                 |
//! CONFIRMED <------------------------confirm-payment------------------------------+
//!    |--cancel--> CANCELED
//!    +--mark-delivered--> DELIVERED --mark-received / auto-complete--> COMPLETED
//!                             +--dispute--> DISPUTED --mark-received-from-disputed--> COMPLETED
//!                                                    +--cancel-from-disputed--> CANCELED
//! COMPLETED -> review sub-states -> REVIEWED
//! ```
//!
//! A requested booking is `PENDING_PAYMENT` until the provider accepts it;
//! the customer then confirms the payment of an `ACCEPTED` booking.

use crate::definition::{
    transition_table, Actor, ProcessDefinition, ProcessKind, State, TransitionDef,
};
use crate::error::DefinitionError;
use crate::processes::{action_table, review_transitions, states};

pub const NAME: &str = "default-booking";

pub const INQUIRE: &str = "transition/inquire";
pub const REQUEST: &str = "transition/request";
pub const REQUEST_AFTER_INQUIRY: &str = "transition/request-after-inquiry";
pub const ACCEPT: &str = "transition/accept";
pub const DECLINE: &str = "transition/decline";
pub const EXPIRE_REQUEST: &str = "transition/expire-request";
pub const CONFIRM_PAYMENT: &str = "transition/confirm-payment";
pub const EXPIRE_PAYMENT: &str = "transition/expire-payment";
pub const CANCEL: &str = "transition/cancel";
pub const MARK_DELIVERED: &str = "transition/mark-delivered";
pub const MARK_RECEIVED: &str = "transition/mark-received";
pub const AUTO_COMPLETE: &str = "transition/auto-complete";
pub const DISPUTE: &str = "transition/dispute";
pub const MARK_RECEIVED_FROM_DISPUTED: &str = "transition/mark-received-from-disputed";
pub const CANCEL_FROM_DISPUTED: &str = "transition/cancel-from-disputed";

pub fn definition() -> Result<ProcessDefinition, DefinitionError> {
    use State::*;
    let mut transitions = vec![
        TransitionDef::new(INQUIRE, &[Initial], Inquiry, Actor::Customer),
        TransitionDef::new(REQUEST, &[Initial], PendingPayment, Actor::Customer).privileged(),
        TransitionDef::new(REQUEST_AFTER_INQUIRY, &[Inquiry], PendingPayment, Actor::Customer)
            .privileged(),
        TransitionDef::new(ACCEPT, &[PendingPayment], Accepted, Actor::Provider),
        TransitionDef::new(DECLINE, &[PendingPayment], Declined, Actor::Provider),
        TransitionDef::new(EXPIRE_REQUEST, &[PendingPayment], Expired, Actor::System),
        TransitionDef::new(CONFIRM_PAYMENT, &[Accepted], Confirmed, Actor::Customer),
        TransitionDef::new(EXPIRE_PAYMENT, &[Accepted], PaymentExpired, Actor::System),
        TransitionDef::new(CANCEL, &[Confirmed], Canceled, Actor::Operator).privileged(),
        TransitionDef::new(MARK_DELIVERED, &[Confirmed], Delivered, Actor::Provider),
        TransitionDef::new(MARK_RECEIVED, &[Delivered], Completed, Actor::Customer),
        TransitionDef::new(AUTO_COMPLETE, &[Delivered], Completed, Actor::System),
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
        kind: ProcessKind::Booking,
        states: states(&[
            Initial,
            Inquiry,
            PendingPayment,
            Accepted,
            PaymentExpired,
            Declined,
            Expired,
            Confirmed,
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
        terminal_states: states(&[PaymentExpired, Declined, Expired, Canceled, Reviewed]),
        path: vec![
            vec![Initial],
            vec![Inquiry],
            vec![PendingPayment],
            vec![Accepted],
            vec![Confirmed],
            vec![Delivered],
            vec![Completed],
            vec![ReviewedByCustomer, ReviewedByProvider],
            vec![Reviewed],
        ],
        completed_state: Some(Completed),
        refunded_states: states(&[Canceled]),
        action_needed: action_table(
            &[Accepted, Delivered, Completed, ReviewedByProvider],
            &[PendingPayment, Confirmed, Completed, ReviewedByCustomer],
        ),
    })
}
