//! Consumer state: operation tables, applied roles, alias maps
//!
//! A consumer is a type or a single instance that roles are composed into.
//! Its state is plain data: an insertion-ordered operation table whose
//! bindings are tagged with their origin, the ordered list of applied
//! roles (the capability edges), and the alias map recorded for each
//! application.
//!
//! Method lookup never reaches into role tables: everything a consumer
//! can do is either in its own table or reachable through the parent
//! chain (instance → type, subtype → supertype). The origin tag recorded
//! at install time is the single source of truth for "who owns this
//! name", so conflict detection and origin reporting cannot disagree.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::compose::CompositionContext;
use crate::error::Result;
use crate::foundation::{ConsumerId, RoleId, Value};

/// Callable implementation of one operation.
///
/// Operations receive the composition context and the original receiver
/// so they can re-invoke sibling operations (late-bound dispatch: a role's
/// operation calling `get_id` runs the receiver's `get_id`, wherever it
/// came from).
pub type OpFn =
    Arc<dyn Fn(&CompositionContext, &ConsumerId, &[Value]) -> Result<Value> + Send + Sync>;

/// Authoritative source of an operation binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Installed by composing the named role
    Role(RoleId),
    /// Defined directly on the named consumer (never role-sourced)
    Local(ConsumerId),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Role(role) => write!(f, "role '{role}'"),
            Origin::Local(consumer) => write!(f, "'{consumer}' (local)"),
        }
    }
}

/// Shape of a consumer: a type in a hierarchy, or a single instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumerKind {
    /// A type, optionally extending a parent type
    Type {
        /// Parent type for resolution fallback, if any
        parent: Option<ConsumerId>,
    },
    /// A single runtime instance of a type
    Instance {
        /// The instance's type
        of: ConsumerId,
    },
}

/// One entry in a consumer's operation table.
#[derive(Clone)]
pub struct OpBinding {
    /// Who owns this name
    pub origin: Origin,
    /// The installed implementation
    pub func: OpFn,
}

impl fmt::Debug for OpBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpBinding")
            .field("origin", &self.origin)
            .field("func", &"<fn>")
            .finish()
    }
}

/// Per-consumer composition state.
#[derive(Debug, Clone)]
pub struct ConsumerState {
    /// Consumer identity
    pub id: ConsumerId,
    /// Type or instance, with its hierarchy edge
    pub kind: ConsumerKind,
    /// Operation table: installed name → origin-tagged implementation
    pub table: IndexMap<String, OpBinding>,
    /// Applied roles in application order (conflict precedence order)
    pub applied: Vec<RoleId>,
    /// Alias map recorded for each applied role
    pub aliases: IndexMap<RoleId, IndexMap<String, String>>,
}

impl ConsumerState {
    /// Create state for a type-shaped consumer.
    pub fn new_type(id: ConsumerId, parent: Option<ConsumerId>) -> Self {
        Self {
            id,
            kind: ConsumerKind::Type { parent },
            table: IndexMap::new(),
            applied: Vec::new(),
            aliases: IndexMap::new(),
        }
    }

    /// Create state for an instance-shaped consumer.
    pub fn new_instance(id: ConsumerId, of: ConsumerId) -> Self {
        Self {
            id,
            kind: ConsumerKind::Instance { of },
            table: IndexMap::new(),
            applied: Vec::new(),
            aliases: IndexMap::new(),
        }
    }

    /// The next consumer in the resolution chain, if any.
    pub fn parent(&self) -> Option<&ConsumerId> {
        match &self.kind {
            ConsumerKind::Type { parent } => parent.as_ref(),
            ConsumerKind::Instance { of } => Some(of),
        }
    }

    /// Check whether a role was applied directly to this consumer.
    pub fn has_applied(&self, role: &RoleId) -> bool {
        self.applied.contains(role)
    }

    /// Bind an operation defined by the consumer itself.
    ///
    /// Consumer-own definitions are authoritative: this overwrites any
    /// role-sourced binding under the same name, regardless of which was
    /// installed first.
    pub fn define_local(&mut self, name: impl Into<String>, func: OpFn) {
        let id = self.id.clone();
        self.table.insert(
            name.into(),
            OpBinding {
                origin: Origin::Local(id),
                func,
            },
        );
    }

    /// Install a role-provided operation under `name`.
    pub fn install(&mut self, name: impl Into<String>, role: RoleId, func: OpFn) {
        self.table.insert(
            name.into(),
            OpBinding {
                origin: Origin::Role(role),
                func,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Value;

    fn noop() -> OpFn {
        Arc::new(|_, _, _| Ok(Value::Unit))
    }

    #[test]
    fn test_local_definition_overwrites_role_binding() {
        let mut state = ConsumerState::new_type(ConsumerId::from("Entity"), None);
        state.install("m", RoleId::from("R1"), noop());
        assert_eq!(
            state.table["m"].origin,
            Origin::Role(RoleId::from("R1"))
        );

        state.define_local("m", noop());
        assert_eq!(
            state.table["m"].origin,
            Origin::Local(ConsumerId::from("Entity"))
        );
    }

    #[test]
    fn test_parent_chain() {
        let ty = ConsumerState::new_type(ConsumerId::from("Entity"), None);
        assert_eq!(ty.parent(), None);

        let sub = ConsumerState::new_type(
            ConsumerId::from("Robot"),
            Some(ConsumerId::from("Entity")),
        );
        assert_eq!(sub.parent(), Some(&ConsumerId::from("Entity")));

        let inst = ConsumerState::new_instance(
            ConsumerId::from("robot-1"),
            ConsumerId::from("Robot"),
        );
        assert_eq!(inst.parent(), Some(&ConsumerId::from("Robot")));
    }
}
