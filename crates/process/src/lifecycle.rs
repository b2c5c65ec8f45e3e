//! The lifecycle façade: what state a transaction is in, whether the viewer
//! must act, and the policy guard in front of every transition call.
//!
//! `describe` never fails. A transaction whose process this client does not
//! know is described as unsupported. A known process whose last transition
//! is missing from the table is described as out of date, so list views can
//! still render a generic row and tell the two apart.

use bazaar_interchange::{from_response, ResourceRef};
use bazaar_store::{EntityStore, FieldAllowList, MergeReport};
use serde::Serialize;

use crate::definition::{ProcessDefinition, Role, State};
use crate::error::{ExecutorError, TransitionError, UnknownTransitionError};
use crate::registry::ProcessRegistry;
use crate::transaction::{Transaction, TRANSACTION_KIND};

/// Route a transition call takes to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// The public marketplace API, callable with the user's own token.
    Direct,
    /// The trusted intermediary that may execute privileged transitions.
    Trusted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "support", rename_all = "snake_case")]
pub enum Description {
    #[serde(rename_all = "camelCase")]
    Supported {
        process_name: String,
        state: State,
        action_needed: bool,
        is_final: bool,
    },
    /// The process is not one this client knows.
    #[serde(rename_all = "camelCase")]
    Unsupported { process_name: String },
    /// The process is known but its last transition is not in the table,
    /// typically a newer backend process version.
    #[serde(rename_all = "camelCase")]
    OutOfDate {
        process_name: String,
        transition: String,
    },
}

impl Description {
    pub fn process_name(&self) -> &str {
        match self {
            Description::Supported { process_name, .. }
            | Description::Unsupported { process_name }
            | Description::OutOfDate { process_name, .. } => process_name,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Description::Supported { .. })
    }
}

/// A transition that passed every policy check and may be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPlan {
    /// Canonical process name, aliases resolved.
    pub process_name: String,
    /// `None` for the first transition of a new transaction.
    pub transaction: Option<ResourceRef>,
    pub transition: String,
    pub route: Channel,
    /// Compute pricing only; the backend does not persist anything.
    pub speculative: bool,
}

/// The opaque remote call that executes a planned transition and returns
/// the raw response envelope.
pub trait TransitionExecutor {
    fn execute(&mut self, plan: &TransitionPlan) -> Result<serde_json::Value, ExecutorError>;
}

#[derive(Debug)]
pub enum TransitionOutcome {
    /// The response was merged into the shared store.
    Committed {
        transaction: ResourceRef,
        report: MergeReport,
    },
    /// The response lives only in a scratch store.
    Speculated {
        transaction: ResourceRef,
        scratch: EntityStore,
    },
}

impl TransitionOutcome {
    pub fn transaction(&self) -> &ResourceRef {
        match self {
            TransitionOutcome::Committed { transaction, .. }
            | TransitionOutcome::Speculated { transaction, .. } => transaction,
        }
    }
}

pub struct Lifecycle<'r> {
    registry: &'r ProcessRegistry,
}

impl<'r> Lifecycle<'r> {
    pub fn new(registry: &'r ProcessRegistry) -> Self {
        Lifecycle { registry }
    }

    pub fn registry(&self) -> &'r ProcessRegistry {
        self.registry
    }

    /// Describe `tx` as seen by `role`. An unknown process yields
    /// [`Description::Unsupported`], an unknown transition inside a known
    /// process [`Description::OutOfDate`].
    pub fn describe(&self, tx: &Transaction, role: Role) -> Description {
        match self.describe_checked(tx, role) {
            Ok(description) => description,
            Err(err) => {
                tracing::warn!(transaction = %tx.reference, error = %err, "transition table out of date");
                Description::OutOfDate {
                    process_name: err.process,
                    transition: err.transition,
                }
            }
        }
    }

    /// Like [`describe`](Self::describe), but surfaces an unknown transition
    /// inside a known process as an error.
    pub fn describe_checked(
        &self,
        tx: &Transaction,
        role: Role,
    ) -> Result<Description, UnknownTransitionError> {
        let Some(definition) = self.registry.get(&tx.process_name) else {
            tracing::debug!(process = %tx.process_name, "unsupported process");
            return Ok(Description::Unsupported {
                process_name: tx.process_name.clone(),
            });
        };
        let state = definition.get_state(tx)?;
        Ok(Description::Supported {
            process_name: definition.name.clone(),
            state,
            action_needed: definition.needs_action(role, state),
            is_final: definition.is_terminal(state),
        })
    }

    /// Check a transition on an existing transaction before any remote call.
    pub fn plan_transition(
        &self,
        tx: &Transaction,
        transition: &str,
        role: Role,
        channel: Channel,
        speculative: bool,
    ) -> Result<TransitionPlan, TransitionError> {
        let definition = self.definition(&tx.process_name)?;
        let state = definition.get_state(tx)?;
        let mut plan = check(definition, state, transition, role, channel, speculative)?;
        plan.transaction = Some(tx.reference.clone());
        Ok(plan)
    }

    /// Check the first transition of a transaction that does not exist yet.
    pub fn plan_initial(
        &self,
        process_name: &str,
        transition: &str,
        role: Role,
        channel: Channel,
        speculative: bool,
    ) -> Result<TransitionPlan, TransitionError> {
        let definition = self.definition(process_name)?;
        check(
            definition,
            definition.initial_state,
            transition,
            role,
            channel,
            speculative,
        )
    }

    fn definition(&self, process_name: &str) -> Result<&'r ProcessDefinition, TransitionError> {
        self.registry
            .get(process_name)
            .ok_or_else(|| TransitionError::UnsupportedProcess {
                name: process_name.to_string(),
            })
    }
}

fn check(
    definition: &ProcessDefinition,
    state: State,
    transition: &str,
    role: Role,
    channel: Channel,
    speculative: bool,
) -> Result<TransitionPlan, TransitionError> {
    let def = definition.transition(transition)?;
    if !def.starts_from(state) {
        return Err(TransitionError::InvalidSourceState {
            transition: def.name.clone(),
            state,
        });
    }
    if def.actor != role.actor() {
        return Err(TransitionError::ActorMismatch {
            transition: def.name.clone(),
            actor: def.actor,
            role,
        });
    }
    if def.privileged && channel == Channel::Direct {
        return Err(TransitionError::PrivilegedViaDirect {
            transition: def.name.clone(),
        });
    }
    Ok(TransitionPlan {
        process_name: definition.name.clone(),
        transaction: None,
        transition: def.name.clone(),
        route: channel,
        speculative,
    })
}

/// Execute a planned transition and merge its response, sanitized by
/// `allow` when given.
///
/// A speculative plan never touches `store`; its response is merged into a
/// fresh scratch store returned in the outcome.
pub fn apply_transition(
    store: &mut EntityStore,
    executor: &mut dyn TransitionExecutor,
    plan: &TransitionPlan,
    allow: Option<&FieldAllowList>,
) -> Result<TransitionOutcome, TransitionError> {
    let body = executor.execute(plan)?;
    let response = from_response(&body)?;
    let transaction = response
        .data
        .iter()
        .find(|r| r.kind == TRANSACTION_KIND)
        .cloned()
        .ok_or(TransitionError::MissingTransaction)?;

    if plan.speculative {
        let mut scratch = EntityStore::new();
        scratch.merge_response(&response, allow);
        tracing::debug!(transaction = %transaction, transition = %plan.transition, "speculated transition");
        return Ok(TransitionOutcome::Speculated {
            transaction,
            scratch,
        });
    }

    let report = store.merge_response(&response, allow);
    tracing::debug!(transaction = %transaction, transition = %plan.transition, "committed transition");
    Ok(TransitionOutcome::Committed {
        transaction,
        report,
    })
}
