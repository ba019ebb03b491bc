//! Composition errors
//!
//! Every fatal composition failure is a variant of [`Error`]. Gates that
//! can fail on more than one item (exclusions, requirements, alias
//! conflicts) report the complete violation set, not just the first hit.
//!
//! Duplicate role application is deliberately not an error: it is logged
//! at warn level and surfaced as `ApplyOutcome::AlreadyApplied`.

use std::fmt;

use thiserror::Error;

use crate::consumer::Origin;
use crate::foundation::{ConsumerId, RoleId};

/// Composition result type
pub type Result<T> = std::result::Result<T, Error>;

/// Composition errors
#[derive(Debug, Error)]
pub enum Error {
    /// Application target was never declared a role and could not be loaded.
    #[error("'{0}' is not a declared role (missing declaration or failed load)")]
    NotARole(RoleId),

    /// The role excludes identities the consumer already includes.
    #[error("cannot apply role '{role}' to '{consumer}': excludes {}", join_roles(.violations))]
    ExclusionViolation {
        /// Role being applied
        role: RoleId,
        /// Consumer being composed into
        consumer: ConsumerId,
        /// Every excluded role the consumer already includes
        violations: Vec<RoleId>,
    },

    /// The consumer cannot resolve operations the role requires.
    #[error("role '{role}' requires operations missing from '{consumer}': {}", .missing.join(", "))]
    MissingRequirement {
        /// Role being applied
        role: RoleId,
        /// Consumer being composed into
        consumer: ConsumerId,
        /// Every required operation the consumer cannot resolve
        missing: Vec<String>,
    },

    /// An explicit alias target collides with an existing operation.
    #[error("alias conflicts applying role '{role}' to '{consumer}': {}", join_conflicts(.conflicts))]
    AliasConflict {
        /// Role being applied
        role: RoleId,
        /// Consumer being composed into
        consumer: ConsumerId,
        /// Every alias-target collision found in one pass over the role
        conflicts: Vec<AliasConflict>,
    },

    /// Consumer identity is not present in the ledger.
    #[error("unknown consumer '{0}'")]
    UnknownConsumer(ConsumerId),

    /// Operation name does not resolve on the consumer or its ancestors.
    #[error("'{consumer}' cannot resolve operation '{operation}'")]
    UnknownOperation {
        /// Dispatch target
        consumer: ConsumerId,
        /// Unresolvable operation name
        operation: String,
    },
}

/// One alias-target collision found during the conflict scan.
///
/// Transient: exists only inside [`Error::AliasConflict`] to name the
/// source operation, the requested alias target, who currently owns the
/// target, and the role that asked for the alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasConflict {
    /// Operation name as the role provides it
    pub source: String,
    /// Requested install name
    pub target: String,
    /// Who currently owns the target name
    pub existing_origin: Origin,
    /// Role whose alias request collided
    pub incoming_role: RoleId,
}

impl fmt::Display for AliasConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot alias '{}' to '{}' for role '{}': '{}' already resolves to {}",
            self.source, self.target, self.incoming_role, self.target, self.existing_origin
        )
    }
}

fn join_roles(roles: &[RoleId]) -> String {
    roles
        .iter()
        .map(|r| format!("'{r}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_conflicts(conflicts: &[AliasConflict]) -> String {
    conflicts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
