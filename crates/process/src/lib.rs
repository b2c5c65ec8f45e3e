//! Transaction process state machines.
//!
//! [`definition`] holds the declarative process model, [`processes`] the
//! three built-in processes, [`registry`] name and alias resolution, and
//! [`lifecycle`] the façade UI code calls: `describe` and the transition
//! guard.

pub mod definition;
mod error;
pub mod lifecycle;
pub mod line_items;
pub mod processes;
pub mod registry;
pub mod transaction;

pub use definition::{Actor, ProcessDefinition, ProcessKind, Role, State, TransitionDef};
pub use error::{
    DefinitionError, ExecutorError, TransactionError, TransitionError, UnknownTransitionError,
};
pub use lifecycle::{
    apply_transition, Channel, Description, Lifecycle, TransitionExecutor, TransitionOutcome,
    TransitionPlan,
};
pub use line_items::{check_totals, total_for, LineItem, TotalsCheck};
pub use registry::ProcessRegistry;
pub use transaction::{Transaction, TransitionRecord};
