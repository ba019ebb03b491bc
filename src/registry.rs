//! Role registry
//!
//! Process-wide (per [`CompositionContext`](crate::compose::CompositionContext))
//! mapping of role identity to its declared contract: required operations,
//! excluded role identities, and provided operations. Pure data; the
//! application algorithm lives in [`compose`](crate::compose).
//!
//! A role is created by [`RoleRegistry::declare_role`] and accumulates
//! `requires`/`excludes`/`provides` declarations additively; it is never
//! removed within the registry's lifetime.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::consumer::OpFn;
use crate::error::{Error, Result};
use crate::foundation::{is_reserved, RoleId};

/// Declared contract of one role.
#[derive(Default)]
pub struct RoleDef {
    required: IndexSet<String>,
    excluded: IndexSet<RoleId>,
    provided: IndexMap<String, OpFn>,
}

impl RoleDef {
    /// Operation names this role demands from any consumer, in declaration order.
    pub fn required(&self) -> &IndexSet<String> {
        &self.required
    }

    /// Role identities incompatible with this role.
    pub fn excluded(&self) -> &IndexSet<RoleId> {
        &self.excluded
    }

    /// Operations this role provides, in declaration order.
    pub fn provided(&self) -> &IndexMap<String, OpFn> {
        &self.provided
    }
}

impl fmt::Debug for RoleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleDef")
            .field("required", &self.required)
            .field("excluded", &self.excluded)
            .field("provided", &self.provided.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Registry of declared roles.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    roles: IndexMap<RoleId, RoleDef>,
}

impl RoleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an identity as a role. Idempotent: re-declaring keeps the
    /// existing contract untouched.
    pub fn declare_role(&mut self, role: impl Into<RoleId>) {
        let role = role.into();
        if self.roles.contains_key(&role) {
            return;
        }
        debug!(%role, "declaring role");
        self.roles.insert(role, RoleDef::default());
    }

    /// Append required operation names to a role's contract.
    ///
    /// Fails with [`Error::NotARole`] if the identity was never declared.
    /// In practice this call originates from within a role's own
    /// definition context, so the failure indicates a declaration bug,
    /// not user input.
    pub fn add_requirement(
        &mut self,
        role: impl Into<RoleId>,
        operations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<()> {
        let role = role.into();
        let def = self
            .roles
            .get_mut(&role)
            .ok_or_else(|| Error::NotARole(role.clone()))?;
        def.required.extend(operations.into_iter().map(Into::into));
        Ok(())
    }

    /// Append excluded role identities to a role's contract.
    pub fn add_exclusion(
        &mut self,
        role: impl Into<RoleId>,
        excluded: impl IntoIterator<Item = impl Into<RoleId>>,
    ) -> Result<()> {
        let role = role.into();
        let def = self
            .roles
            .get_mut(&role)
            .ok_or_else(|| Error::NotARole(role.clone()))?;
        def.excluded.extend(excluded.into_iter().map(Into::into));
        Ok(())
    }

    /// Record an operation this role provides.
    ///
    /// Reserved names (`does`, `new`, lifecycle hooks) are skipped with a
    /// debug trace: a role's provided set never contains them.
    pub fn provide_operation(
        &mut self,
        role: impl Into<RoleId>,
        name: impl Into<String>,
        func: OpFn,
    ) -> Result<()> {
        let role = role.into();
        let name = name.into();
        let def = self
            .roles
            .get_mut(&role)
            .ok_or_else(|| Error::NotARole(role.clone()))?;
        if is_reserved(&name) {
            debug!(%role, operation = %name, "ignoring reserved operation name");
            return Ok(());
        }
        def.provided.insert(name, func);
        Ok(())
    }

    /// True only if `declare_role` was previously called for this identity.
    pub fn is_role(&self, role: &RoleId) -> bool {
        self.roles.contains_key(role)
    }

    /// Look up a role's declared contract.
    pub fn get(&self, role: &RoleId) -> Option<&RoleDef> {
        self.roles.get(role)
    }
}

/// Seam for bringing role definitions into the registry on demand.
///
/// The composition engine treats the loader as an external collaborator:
/// when a role identity is not yet registered, the loader gets one chance
/// to register it before the application fails with [`Error::NotARole`].
pub trait RoleLoader: Send + Sync {
    /// Attempt to register `role`. Returns `true` if the loader
    /// recognized the identity and registered it.
    fn load(&self, registry: &mut RoleRegistry, role: &RoleId) -> bool;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::foundation::Value;

    fn noop() -> OpFn {
        Arc::new(|_, _, _| Ok(Value::Unit))
    }

    #[test]
    fn test_declare_is_idempotent() {
        let mut registry = RoleRegistry::new();
        registry.declare_role("Logger");
        registry
            .add_requirement("Logger", ["get_id"])
            .unwrap();

        // Re-declaring keeps the existing contract
        registry.declare_role("Logger");
        let def = registry.get(&RoleId::from("Logger")).unwrap();
        assert!(def.required().contains("get_id"));
    }

    #[test]
    fn test_requirement_on_undeclared_role_fails() {
        let mut registry = RoleRegistry::new();
        let err = registry
            .add_requirement("Ghost", ["anything"])
            .unwrap_err();
        assert!(matches!(err, Error::NotARole(_)));
    }

    #[test]
    fn test_is_role_only_after_declaration() {
        let mut registry = RoleRegistry::new();
        assert!(!registry.is_role(&RoleId::from("Logger")));
        registry.declare_role("Logger");
        assert!(registry.is_role(&RoleId::from("Logger")));
    }

    #[test]
    fn test_reserved_provides_are_skipped() {
        let mut registry = RoleRegistry::new();
        registry.declare_role("Sneaky");
        registry.provide_operation("Sneaky", "does", noop()).unwrap();
        registry.provide_operation("Sneaky", "new", noop()).unwrap();
        registry.provide_operation("Sneaky", "log", noop()).unwrap();

        let def = registry.get(&RoleId::from("Sneaky")).unwrap();
        assert_eq!(def.provided().len(), 1);
        assert!(def.provided().contains_key("log"));
    }
}
