//! Origin resolution
//!
//! Answers "who owns this operation name on this consumer": the role that
//! installed it, or the consumer (or ancestor) that defined it locally.
//! Used by diagnostics and by the alias-target conflict scan.
//!
//! Origins are read from the tags recorded on each binding at install
//! time, so this resolver and the conflict scan can never disagree about
//! ownership. Lookup order is the consumer's own table first, then the
//! parent chain (instance to type, subtype to supertype); role tables are
//! never consulted directly, which means an operation applied under an
//! alias is reachable only under its alias target.

use crate::compose::CompositionContext;
use crate::consumer::Origin;
use crate::foundation::ConsumerId;

impl CompositionContext {
    /// Determine the authoritative source of `operation` on `consumer`.
    ///
    /// Returns `Origin::Role` for role-installed bindings, `Origin::Local`
    /// for bindings the consumer (or an ancestor) defined itself, and
    /// `None` if the name does not resolve at all.
    pub fn resolve_origin(&self, consumer: &ConsumerId, operation: &str) -> Option<Origin> {
        let mut current = consumer;
        loop {
            let state = self.ledger.get(current)?;
            if let Some(binding) = state.table.get(operation) {
                return Some(binding.origin.clone());
            }
            match state.parent() {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Check whether `consumer` can currently resolve `operation` through
    /// its own table or its ancestors.
    pub fn can_resolve(&self, consumer: &ConsumerId, operation: &str) -> bool {
        self.resolve_origin(consumer, operation).is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::compose::CompositionContext;
    use crate::consumer::Origin;
    use crate::foundation::{ConsumerId, RoleId, Value};

    #[test]
    fn test_local_origin() {
        let mut ctx = CompositionContext::new();
        let entity = ctx.define_type("Entity");
        ctx.define_operation(&entity, "get_id", |_, _, _| Ok(Value::Int(1)))
            .unwrap();

        assert_eq!(
            ctx.resolve_origin(&entity, "get_id"),
            Some(Origin::Local(entity.clone()))
        );
        assert!(ctx.can_resolve(&entity, "get_id"));
        assert_eq!(ctx.resolve_origin(&entity, "missing"), None);
    }

    #[test]
    fn test_role_origin() {
        let mut ctx = CompositionContext::new();
        ctx.declare_role("Greeter");
        ctx.provide_operation("Greeter", "greet", |_, _, _| Ok(Value::from("hi")))
            .unwrap();
        let entity = ctx.define_type("Entity");
        ctx.apply_role(&entity, "Greeter").unwrap();

        assert_eq!(
            ctx.resolve_origin(&entity, "greet"),
            Some(Origin::Role(RoleId::from("Greeter")))
        );
    }

    #[test]
    fn test_inherited_origin_names_the_ancestor() {
        let mut ctx = CompositionContext::new();
        let entity = ctx.define_type("Entity");
        ctx.define_operation(&entity, "get_id", |_, _, _| Ok(Value::Int(1)))
            .unwrap();
        let robot = ctx.define_subtype("Robot", &entity).unwrap();
        let instance = ctx.define_instance("robot-1", &robot).unwrap();

        // Resolution climbs instance -> Robot -> Entity
        assert_eq!(
            ctx.resolve_origin(&instance, "get_id"),
            Some(Origin::Local(ConsumerId::from("Entity")))
        );
    }

    #[test]
    fn test_unknown_consumer_resolves_nothing() {
        let ctx = CompositionContext::new();
        assert_eq!(
            ctx.resolve_origin(&ConsumerId::from("Ghost"), "anything"),
            None
        );
    }
}
