//! Introspection API
//!
//! Read-only queries over the registry and the ledger: capability checks
//! (`does`), the ordered applied-role list, recorded alias maps, and role
//! identity checks. None of these mutate state.

use indexmap::IndexMap;

use crate::compose::CompositionContext;
use crate::foundation::{ConsumerId, RoleId};

impl CompositionContext {
    /// Check whether `target` includes `role`.
    ///
    /// Transitive through the hierarchy: an instance sees roles applied to
    /// its type and the type's ancestors, while a type never sees roles
    /// applied to one of its instances. Unknown targets include nothing.
    pub fn does(&self, target: &ConsumerId, role: &RoleId) -> bool {
        let mut current = target;
        while let Some(state) = self.ledger.get(current) {
            if state.has_applied(role) {
                return true;
            }
            match state.parent() {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Roles applied directly to `target`, in application order.
    ///
    /// Empty for unknown targets and for consumers with no roles; roles
    /// applied to ancestors are not included (use [`Self::does`] for the
    /// transitive check).
    pub fn applied_roles(&self, target: &ConsumerId) -> &[RoleId] {
        self.ledger
            .get(target)
            .map(|state| state.applied.as_slice())
            .unwrap_or(&[])
    }

    /// The alias map recorded when `role` was applied to `consumer`.
    pub fn alias_map(
        &self,
        consumer: &ConsumerId,
        role: &RoleId,
    ) -> Option<&IndexMap<String, String>> {
        self.ledger.get(consumer)?.aliases.get(role)
    }

    /// True only if the identity was ever declared a role.
    pub fn is_role(&self, role: &RoleId) -> bool {
        self.registry.is_role(role)
    }
}

#[cfg(test)]
mod tests {
    use crate::compose::CompositionContext;
    use crate::foundation::{ConsumerId, RoleId, Value};

    #[test]
    fn test_does_sees_ancestor_roles() {
        let mut ctx = CompositionContext::new();
        ctx.declare_role("Greeter");
        ctx.provide_operation("Greeter", "greet", |_, _, _| Ok(Value::from("hi")))
            .unwrap();
        let entity = ctx.define_type("Entity");
        ctx.apply_role(&entity, "Greeter").unwrap();
        let instance = ctx.define_instance("e1", &entity).unwrap();

        let greeter = RoleId::from("Greeter");
        assert!(ctx.does(&entity, &greeter));
        assert!(ctx.does(&instance, &greeter));
        // Direct list stays per-identity
        assert_eq!(ctx.applied_roles(&entity), &[greeter.clone()]);
        assert!(ctx.applied_roles(&instance).is_empty());
    }

    #[test]
    fn test_unknown_target_has_nothing() {
        let ctx = CompositionContext::new();
        let ghost = ConsumerId::from("Ghost");
        assert!(!ctx.does(&ghost, &RoleId::from("Greeter")));
        assert!(ctx.applied_roles(&ghost).is_empty());
    }

    #[test]
    fn test_is_role_regardless_of_application() {
        let mut ctx = CompositionContext::new();
        ctx.declare_role("NeverApplied");
        assert!(ctx.is_role(&RoleId::from("NeverApplied")));
        assert!(!ctx.is_role(&RoleId::from("NeverDeclared")));
    }
}
