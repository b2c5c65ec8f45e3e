use bazaar_interchange::InterchangeError;

use crate::definition::{Actor, Role, State};

/// A transition name the process table does not know.
///
/// Distinct from an unknown *process*: this means the client's table is out
/// of date relative to the backend and is worth surfacing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transition '{transition}' in process '{process}'")]
pub struct UnknownTransitionError {
    pub process: String,
    pub transition: String,
}

/// A process definition or registry that fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("process '{process}' references undeclared state {state}")]
    UndeclaredState { process: String, state: State },

    #[error("process '{process}' declares transition '{transition}' twice")]
    DuplicateTransition { process: String, transition: String },

    #[error("process '{process}': transition name '{transition}' must start with 'transition/'")]
    InvalidTransitionName { process: String, transition: String },

    #[error("process '{process}': terminal state {state} has outgoing transition '{transition}'")]
    TerminalHasOutgoing {
        process: String,
        state: State,
        transition: String,
    },

    #[error("process '{process}': {role} has action needed in {state} but no transition to perform")]
    ActionWithoutTransition {
        process: String,
        role: Role,
        state: State,
    },

    #[error("process '{name}' is already registered")]
    DuplicateProcess { name: String },

    #[error("alias '{alias}' points to unregistered process '{target}'")]
    UnknownAliasTarget { alias: String, target: String },

    #[error("alias '{alias}' would shadow a registered process")]
    AliasShadowsProcess { alias: String },

    #[error("issued transition targets unknown process '{process}'")]
    UnknownIssuedProcess { process: String },

    #[error(transparent)]
    UnknownIssuedTransition(#[from] UnknownTransitionError),
}

/// A transaction entity whose attributes cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("expected a transaction resource, got '{kind}'")]
    WrongKind { kind: String },

    #[error("transaction attribute '{name}' is missing")]
    MissingAttribute { name: String },

    #[error("transaction attribute '{name}' is invalid: {message}")]
    InvalidAttribute { name: String, message: String },
}

/// The opaque remote call that executes a transition failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    #[error("remote transition call failed: {0}")]
    Remote(String),
}

/// Reasons a transition is refused or fails.
///
/// Everything up to `PrivilegedViaDirect` is a policy check made before any
/// network call.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("process '{name}' is not supported by this client")]
    UnsupportedProcess { name: String },

    #[error(transparent)]
    UnknownTransition(#[from] UnknownTransitionError),

    #[error("transition '{transition}' is not allowed from state {state}")]
    InvalidSourceState { transition: String, state: State },

    #[error("transition '{transition}' is performed by {actor}, not {role}")]
    ActorMismatch {
        transition: String,
        actor: Actor,
        role: Role,
    },

    #[error("privileged transition '{transition}' must go through the trusted intermediary")]
    PrivilegedViaDirect { transition: String },

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("transition response is invalid: {0}")]
    Response(#[from] InterchangeError),

    #[error("transition response carries no transaction")]
    MissingTransaction,
}
