//! `default-inquiry`: messaging only, no payment.
//!
//! ```text
//! INITIAL --inquire--> INQUIRY --mark-converted--> CONVERTED
//! ```

use crate::definition::{
    transition_table, Actor, ProcessDefinition, ProcessKind, State, TransitionDef,
};
use crate::error::DefinitionError;
use crate::processes::{action_table, states};

pub const NAME: &str = "default-inquiry";

pub const INQUIRE: &str = "transition/inquire";
pub const MARK_CONVERTED: &str = "transition/mark-converted";

pub fn definition() -> Result<ProcessDefinition, DefinitionError> {
    use State::*;
    let transitions = vec![
        TransitionDef::new(INQUIRE, &[Initial], Inquiry, Actor::Customer),
        TransitionDef::new(MARK_CONVERTED, &[Inquiry], Converted, Actor::Provider),
    ];
    Ok(ProcessDefinition {
        name: NAME.to_string(),
        kind: ProcessKind::Inquiry,
        states: states(&[Initial, Inquiry, Converted]),
        transitions: transition_table(NAME, transitions)?,
        initial_state: Initial,
        terminal_states: states(&[Converted]),
        path: vec![vec![Initial], vec![Inquiry], vec![Converted]],
        completed_state: Some(Converted),
        refunded_states: states(&[]),
        action_needed: action_table(&[], &[Inquiry]),
    })
}
