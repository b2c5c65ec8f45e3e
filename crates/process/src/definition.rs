//! Declarative transaction process definitions.
//!
//! A process is a closed set of states and named transitions between them.
//! Transition names are a byte-for-byte contract with the remote workflow
//! engine; the definition's transition table is the single place the client
//! interprets them. The current state of a transaction is derived purely
//! from its `lastTransition` by table lookup.
//!
//! Processes are linear along a canonical main path. Each rank of the path
//! is a set of states that are equally far along (e.g. the two "reviewed by
//! one party" states). States off the path (cancelled, disputed, expired)
//! are side paths: once a transaction is on one, it has not passed any
//! main-path state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::{DefinitionError, UnknownTransitionError};
use crate::transaction::Transaction;

/// Every state used by a built-in process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Initial,
    Inquiry,
    Converted,
    PendingPayment,
    Accepted,
    PaymentExpired,
    Declined,
    Expired,
    Confirmed,
    Purchased,
    Canceled,
    Delivered,
    Disputed,
    Completed,
    ReviewedByCustomer,
    ReviewedByProvider,
    Reviewed,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Initial => "INITIAL",
            State::Inquiry => "INQUIRY",
            State::Converted => "CONVERTED",
            State::PendingPayment => "PENDING_PAYMENT",
            State::Accepted => "ACCEPTED",
            State::PaymentExpired => "PAYMENT_EXPIRED",
            State::Declined => "DECLINED",
            State::Expired => "EXPIRED",
            State::Confirmed => "CONFIRMED",
            State::Purchased => "PURCHASED",
            State::Canceled => "CANCELED",
            State::Delivered => "DELIVERED",
            State::Disputed => "DISPUTED",
            State::Completed => "COMPLETED",
            State::ReviewedByCustomer => "REVIEWED_BY_CUSTOMER",
            State::ReviewedByProvider => "REVIEWED_BY_PROVIDER",
            State::Reviewed => "REVIEWED",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performs a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Customer,
    Provider,
    Operator,
    System,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Customer => "customer",
            Actor::Provider => "provider",
            Actor::Operator => "operator",
            Actor::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Actor> {
        match s {
            "customer" => Some(Actor::Customer),
            "provider" => Some(Actor::Provider),
            "operator" => Some(Actor::Operator),
            "system" => Some(Actor::System),
            _ => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The party viewing a transaction in the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Provider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Provider => "provider",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "customer" => Some(Role::Customer),
            "provider" => Some(Role::Provider),
            _ => None,
        }
    }

    pub fn actor(&self) -> Actor {
        match self {
            Role::Customer => Actor::Customer,
            Role::Provider => Actor::Provider,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which family of process a definition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    /// Messaging only, no payment.
    Inquiry,
    /// Time-slot reservation with payment.
    Booking,
    /// Stock-decrementing sale with payment.
    Purchase,
}

/// A named transition edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionDef {
    pub name: String,
    pub from: Vec<State>,
    pub to: State,
    pub actor: Actor,
    /// Must be executed through the trusted intermediary, never directly
    /// against the public API (affects payment or pricing).
    pub privileged: bool,
}

impl TransitionDef {
    pub fn new(name: &str, from: &[State], to: State, actor: Actor) -> Self {
        TransitionDef {
            name: name.to_string(),
            from: from.to_vec(),
            to,
            actor,
            privileged: false,
        }
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    pub fn starts_from(&self, state: State) -> bool {
        self.from.contains(&state)
    }
}

/// A complete process definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDefinition {
    pub name: String,
    pub kind: ProcessKind,
    pub states: BTreeSet<State>,
    pub transitions: BTreeMap<String, TransitionDef>,
    pub initial_state: State,
    pub terminal_states: BTreeSet<State>,
    /// Ranked canonical main path.
    pub path: Vec<Vec<State>>,
    /// Reaching (or passing) this state means the transaction is completed.
    pub completed_state: Option<State>,
    pub refunded_states: BTreeSet<State>,
    /// States in which each role is expected to act.
    pub action_needed: BTreeMap<Role, BTreeSet<State>>,
}

impl ProcessDefinition {
    /// Look up a transition, failing on names the table does not know.
    pub fn transition(&self, name: &str) -> Result<&TransitionDef, UnknownTransitionError> {
        self.transitions
            .get(name)
            .ok_or_else(|| UnknownTransitionError {
                process: self.name.clone(),
                transition: name.to_string(),
            })
    }

    /// Whether a transition is privileged. Unknown names are not.
    pub fn is_privileged(&self, name: &str) -> bool {
        self.transitions.get(name).is_some_and(|t| t.privileged)
    }

    /// State a transaction is in after `last_transition`; the initial state
    /// if it has never transitioned.
    pub fn state_after(&self, last_transition: Option<&str>) -> Result<State, UnknownTransitionError> {
        match last_transition {
            None => Ok(self.initial_state),
            Some(name) => self.transition(name).map(|t| t.to),
        }
    }

    /// Current state of a transaction, from its `lastTransition`.
    pub fn get_state(&self, tx: &Transaction) -> Result<State, UnknownTransitionError> {
        self.state_after(tx.last_transition.as_deref())
    }

    /// Rank of a state on the main path, `None` for side-path states.
    pub fn rank(&self, state: State) -> Option<usize> {
        self.path.iter().position(|rank| rank.contains(&state))
    }

    /// Whether `current` is at or after `target` along the main path.
    ///
    /// A side-path state only "passes" itself.
    pub fn state_has_passed(&self, current: State, target: State) -> bool {
        if current == target {
            return true;
        }
        match (self.rank(current), self.rank(target)) {
            (Some(current_rank), Some(target_rank)) => current_rank >= target_rank,
            _ => false,
        }
    }

    pub fn has_passed_state(
        &self,
        target: State,
        tx: &Transaction,
    ) -> Result<bool, UnknownTransitionError> {
        Ok(self.state_has_passed(self.get_state(tx)?, target))
    }

    pub fn is_completed(&self, tx: &Transaction) -> Result<bool, UnknownTransitionError> {
        match self.completed_state {
            Some(completed) => self.has_passed_state(completed, tx),
            None => Ok(false),
        }
    }

    pub fn is_refunded(&self, tx: &Transaction) -> Result<bool, UnknownTransitionError> {
        Ok(self.refunded_states.contains(&self.get_state(tx)?))
    }

    pub fn is_terminal(&self, state: State) -> bool {
        self.terminal_states.contains(&state)
    }

    /// Transitions that may be taken from `state`, sorted by name.
    pub fn transitions_from(&self, state: State) -> impl Iterator<Item = &TransitionDef> {
        self.transitions
            .values()
            .filter(move |t| t.starts_from(state))
    }

    pub fn needs_action(&self, role: Role, state: State) -> bool {
        self.action_needed
            .get(&role)
            .is_some_and(|states| states.contains(&state))
    }

    /// Check internal consistency. Built-in definitions are validated when
    /// the registry is built, so a bad table fails at startup.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let undeclared = |state: State| DefinitionError::UndeclaredState {
            process: self.name.clone(),
            state,
        };

        if !self.states.contains(&self.initial_state) {
            return Err(undeclared(self.initial_state));
        }
        for state in self
            .terminal_states
            .iter()
            .chain(self.refunded_states.iter())
            .chain(self.completed_state.iter())
            .chain(self.path.iter().flatten())
        {
            if !self.states.contains(state) {
                return Err(undeclared(*state));
            }
        }

        for (key, transition) in &self.transitions {
            if key != &transition.name || !transition.name.starts_with("transition/") {
                return Err(DefinitionError::InvalidTransitionName {
                    process: self.name.clone(),
                    transition: transition.name.clone(),
                });
            }
            for state in transition.from.iter().chain(std::iter::once(&transition.to)) {
                if !self.states.contains(state) {
                    return Err(undeclared(*state));
                }
            }
            if let Some(state) = transition.from.iter().find(|s| self.is_terminal(**s)) {
                return Err(DefinitionError::TerminalHasOutgoing {
                    process: self.name.clone(),
                    state: *state,
                    transition: transition.name.clone(),
                });
            }
        }

        for (role, states) in &self.action_needed {
            for state in states {
                let actionable = self
                    .transitions_from(*state)
                    .any(|t| t.actor == role.actor());
                if !actionable {
                    return Err(DefinitionError::ActionWithoutTransition {
                        process: self.name.clone(),
                        role: *role,
                        state: *state,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Collect transitions into a name-keyed table, rejecting duplicates.
pub fn transition_table(
    process: &str,
    transitions: Vec<TransitionDef>,
) -> Result<BTreeMap<String, TransitionDef>, DefinitionError> {
    let mut table = BTreeMap::new();
    for transition in transitions {
        if table.contains_key(&transition.name) {
            return Err(DefinitionError::DuplicateTransition {
                process: process.to_string(),
                transition: transition.name,
            });
        }
        table.insert(transition.name.clone(), transition);
    }
    Ok(table)
}
