//! Composition engine
//!
//! [`CompositionContext`] owns the role registry and the application
//! ledger and implements the single-role application algorithm:
//!
//! ```text
//! load/identity check -> duplicate check -> exclusion gate
//!     -> requirement gate -> conflict scan -> install -> link & record
//! ```
//!
//! Each gate fails fast for the current role; a batch applies roles
//! strictly left to right and does not roll back roles already applied
//! when a later entry fails.
//!
//! # Precedence
//!
//! Conflict resolution is deterministic first-writer-wins: for an
//! unaliased name the existing binding always survives, whether it came
//! from the consumer's own definition, an ancestor, or an earlier-applied
//! role. A consumer's own definition is authoritative even when it is
//! installed after the role's (see [`CompositionContext::define_operation`]).
//! Explicit aliasing is the escape hatch, and an alias target colliding
//! with a differently sourced operation is unconditionally fatal.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::consumer::{ConsumerState, OpFn, Origin};
use crate::error::{AliasConflict, Error, Result};
use crate::foundation::{is_reserved, ConsumerId, RoleId, Value, DOES};
use crate::registry::{RoleLoader, RoleRegistry};


/// Whether a role application composed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The role was composed into the consumer
    Applied,
    /// The role was already present; the application was a no-op
    AlreadyApplied,
}

/// Normalized specification of one role application.
///
/// The single normalization routine shared by the definition-time and
/// runtime application paths: a bare identity converts via `From`, an
/// aliased application is built with [`RoleApplication::aliased`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleApplication {
    /// Role to apply
    pub role: RoleId,
    /// Per-application rename map: provided name -> installed name
    pub aliases: IndexMap<String, String>,
}

impl RoleApplication {
    /// Apply a role with no aliases.
    pub fn new(role: impl Into<RoleId>) -> Self {
        Self {
            role: role.into(),
            aliases: IndexMap::new(),
        }
    }

    /// Apply a role, renaming some of its operations on install.
    pub fn aliased<K, V>(
        role: impl Into<RoleId>,
        aliases: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            role: role.into(),
            aliases: aliases
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<&str> for RoleApplication {
    fn from(role: &str) -> Self {
        Self::new(role)
    }
}

impl From<String> for RoleApplication {
    fn from(role: String) -> Self {
        Self::new(role)
    }
}

impl From<RoleId> for RoleApplication {
    fn from(role: RoleId) -> Self {
        Self::new(role)
    }
}

/// Owner of the role registry and the application ledger.
///
/// All composition state lives here; constructing a fresh context gives a
/// fully isolated fixture with no process-wide state to reset.
#[derive(Default)]
pub struct CompositionContext {
    pub(crate) registry: RoleRegistry,
    pub(crate) ledger: IndexMap<ConsumerId, ConsumerState>,
    loader: Option<Box<dyn RoleLoader>>,
}

impl fmt::Debug for CompositionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionContext")
            .field("registry", &self.registry)
            .field("ledger", &self.ledger)
            .field("loader", &self.loader.as_ref().map(|_| "<loader>"))
            .finish()
    }
}

impl CompositionContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context that consults `loader` for unknown roles.
    pub fn with_loader(loader: Box<dyn RoleLoader>) -> Self {
        Self {
            loader: Some(loader),
            ..Self::default()
        }
    }

    /// Direct access to the role registry.
    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    // === Role definition surface ===

    /// Mark an identity as a role. Idempotent.
    pub fn declare_role(&mut self, role: impl Into<RoleId>) {
        self.registry.declare_role(role);
    }

    /// Declare operations a role requires from its consumers.
    pub fn add_requirement(
        &mut self,
        role: impl Into<RoleId>,
        operations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<()> {
        self.registry.add_requirement(role, operations)
    }

    /// Declare roles incompatible with a role.
    pub fn add_exclusion(
        &mut self,
        role: impl Into<RoleId>,
        excluded: impl IntoIterator<Item = impl Into<RoleId>>,
    ) -> Result<()> {
        self.registry.add_exclusion(role, excluded)
    }

    /// Record an operation a role provides.
    pub fn provide_operation(
        &mut self,
        role: impl Into<RoleId>,
        name: impl Into<String>,
        func: impl Fn(&CompositionContext, &ConsumerId, &[Value]) -> Result<Value>
            + Send
            + Sync
            + 'static,
    ) -> Result<()> {
        self.registry.provide_operation(role, name, Arc::new(func))
    }

    // === Consumer definition surface ===

    /// Define a type-shaped consumer. Idempotent: redefining returns the
    /// existing identity untouched.
    pub fn define_type(&mut self, name: impl Into<ConsumerId>) -> ConsumerId {
        let id = name.into();
        self.ledger
            .entry(id.clone())
            .or_insert_with(|| ConsumerState::new_type(id.clone(), None));
        id
    }

    /// Define a type extending a parent type.
    pub fn define_subtype(
        &mut self,
        name: impl Into<ConsumerId>,
        parent: &ConsumerId,
    ) -> Result<ConsumerId> {
        if !self.ledger.contains_key(parent) {
            return Err(Error::UnknownConsumer(parent.clone()));
        }
        let id = name.into();
        self.ledger
            .entry(id.clone())
            .or_insert_with(|| ConsumerState::new_type(id.clone(), Some(parent.clone())));
        Ok(id)
    }

    /// Define an instance-shaped consumer of an existing type.
    ///
    /// Roles applied to the instance are scoped to it alone; the instance
    /// still sees everything applied to its type.
    pub fn define_instance(
        &mut self,
        name: impl Into<ConsumerId>,
        of: &ConsumerId,
    ) -> Result<ConsumerId> {
        if !self.ledger.contains_key(of) {
            return Err(Error::UnknownConsumer(of.clone()));
        }
        let id = name.into();
        self.ledger
            .entry(id.clone())
            .or_insert_with(|| ConsumerState::new_instance(id.clone(), of.clone()));
        Ok(id)
    }

    /// Define a type and immediately compose a list of roles into it,
    /// the definition-time declarative path.
    ///
    /// On failure the type stays in the ledger with the roles applied
    /// before the failing entry (no rollback).
    pub fn define_type_with_roles(
        &mut self,
        name: impl Into<ConsumerId>,
        specs: impl IntoIterator<Item = impl Into<RoleApplication>>,
    ) -> Result<ConsumerId> {
        let id = self.define_type(name);
        self.apply_roles(&id, specs)?;
        Ok(id)
    }

    /// Bind an operation defined by the consumer itself.
    ///
    /// Consumer-own definitions always win: this overwrites a role-sourced
    /// binding under the same name even when the role was applied first.
    pub fn define_operation(
        &mut self,
        consumer: &ConsumerId,
        name: impl Into<String>,
        func: impl Fn(&CompositionContext, &ConsumerId, &[Value]) -> Result<Value>
            + Send
            + Sync
            + 'static,
    ) -> Result<()> {
        let state = self
            .ledger
            .get_mut(consumer)
            .ok_or_else(|| Error::UnknownConsumer(consumer.clone()))?;
        state.define_local(name, Arc::new(func));
        Ok(())
    }

    // === Application surface ===

    /// Apply one role to a consumer at runtime.
    ///
    /// Accepts anything normalizable to a [`RoleApplication`]: a bare
    /// identity or an identity plus alias map. Ensures the consumer
    /// exposes the `does` introspection operation afterwards.
    pub fn apply_role(
        &mut self,
        target: &ConsumerId,
        spec: impl Into<RoleApplication>,
    ) -> Result<ApplyOutcome> {
        let outcome = self.apply_one(target, spec.into())?;
        self.ensure_does(target)?;
        Ok(outcome)
    }

    /// Apply an ordered list of roles to a consumer.
    ///
    /// Entries compose strictly left to right; the first fatal error stops
    /// the batch and propagates unchanged, keeping every role successfully
    /// applied before it.
    pub fn apply_roles(
        &mut self,
        target: &ConsumerId,
        specs: impl IntoIterator<Item = impl Into<RoleApplication>>,
    ) -> Result<()> {
        for spec in specs {
            self.apply_one(target, spec.into())?;
        }
        self.ensure_does(target)
    }

    /// Single-role application: the central algorithm.
    #[instrument(skip(self), level = "debug")]
    fn apply_one(&mut self, target: &ConsumerId, spec: RoleApplication) -> Result<ApplyOutcome> {
        let RoleApplication { role, aliases } = spec;

        // Load/identity check. Unknown roles get one loader attempt.
        if !self.registry.is_role(&role) {
            if let Some(loader) = &self.loader {
                loader.load(&mut self.registry, &role);
            }
            if !self.registry.is_role(&role) {
                return Err(Error::NotARole(role));
            }
        }

        let Some(state) = self.ledger.get(target) else {
            return Err(Error::UnknownConsumer(target.clone()));
        };

        // Duplicate check: non-fatal no-op, the recorded alias map wins.
        if state.has_applied(&role) {
            warn!(consumer = %target, %role, "role already applied; skipping re-application");
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let Some(def) = self.registry.get(&role) else {
            return Err(Error::NotARole(role));
        };

        // Exclusion gate: earliest gate, all violations collected.
        let violations: Vec<RoleId> = def
            .excluded()
            .iter()
            .filter(|excluded| self.does(target, excluded))
            .cloned()
            .collect();
        if !violations.is_empty() {
            return Err(Error::ExclusionViolation {
                role,
                consumer: target.clone(),
                violations,
            });
        }

        // Requirement gate: the complete missing set, not just the first.
        // Checked before install, so a role cannot satisfy its own
        // requirements.
        let missing: Vec<String> = def
            .required()
            .iter()
            .filter(|name| !self.can_resolve(target, name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingRequirement {
                role,
                consumer: target.clone(),
                missing,
            });
        }

        // Conflict scan over the whole role before touching the table.
        // `planned` tracks names this application has already claimed, so
        // two aliases mapping different sources to one target collide
        // instead of silently overwriting each other.
        let mut conflicts: Vec<AliasConflict> = Vec::new();
        let mut installs: Vec<(String, OpFn)> = Vec::new();
        let mut planned: IndexSet<String> = IndexSet::new();
        for (name, func) in def.provided() {
            let install_name = aliases.get(name).cloned().unwrap_or_else(|| name.clone());
            if is_reserved(&install_name) {
                // Covers both a reserved provided name and an alias
                // targeting one; reserved names stay out of the table.
                debug!(
                    consumer = %target,
                    %role,
                    operation = %name,
                    install = %install_name,
                    "ignoring reserved install name"
                );
                continue;
            }
            let existing = self.resolve_origin(target, &install_name);
            if install_name != *name {
                // Explicit alias: clobbering a differently sourced
                // operation is unconditionally fatal, and so is a second
                // alias claiming a name this application already plans
                // to install.
                if planned.contains(&install_name) {
                    conflicts.push(AliasConflict {
                        source: name.clone(),
                        target: install_name,
                        existing_origin: Origin::Role(role.clone()),
                        incoming_role: role.clone(),
                    });
                    continue;
                }
                match existing {
                    Some(origin) if origin != Origin::Role(role.clone()) => {
                        conflicts.push(AliasConflict {
                            source: name.clone(),
                            target: install_name,
                            existing_origin: origin,
                            incoming_role: role.clone(),
                        });
                    }
                    _ => {
                        planned.insert(install_name.clone());
                        installs.push((install_name, func.clone()));
                    }
                }
            } else if existing.is_some() || planned.contains(&install_name) {
                // Unaliased name conflict: first writer wins, silently.
                debug!(
                    consumer = %target,
                    %role,
                    operation = %name,
                    "existing binding wins; discarding role implementation"
                );
            } else {
                planned.insert(install_name.clone());
                installs.push((install_name, func.clone()));
            }
        }
        if !conflicts.is_empty() {
            return Err(Error::AliasConflict {
                role,
                consumer: target.clone(),
                conflicts,
            });
        }

        // Install, then link & record.
        let Some(state) = self.ledger.get_mut(target) else {
            return Err(Error::UnknownConsumer(target.clone()));
        };
        for (name, func) in installs {
            state.install(name, role.clone(), func);
        }
        state.applied.push(role.clone());
        state.aliases.insert(role, aliases);
        Ok(ApplyOutcome::Applied)
    }

    /// Install the reserved `does` operation on a consumer if it does not
    /// already resolve one.
    ///
    /// `invoke(target, "does", [Str(role)])` then answers the capability
    /// check through the ledger, the same query as [`Self::does`].
    fn ensure_does(&mut self, target: &ConsumerId) -> Result<()> {
        if self.resolve_origin(target, DOES).is_some() {
            return Ok(());
        }
        let state = self
            .ledger
            .get_mut(target)
            .ok_or_else(|| Error::UnknownConsumer(target.clone()))?;
        let func: OpFn = Arc::new(|ctx, receiver, args| {
            let answer = args
                .first()
                .and_then(Value::as_str)
                .map(|name| ctx.does(receiver, &RoleId::from(name)))
                .unwrap_or(false);
            Ok(Value::Bool(answer))
        });
        state.define_local(DOES, func);
        Ok(())
    }

    // === Dispatch ===

    /// Invoke an operation on a consumer.
    ///
    /// Resolution walks the consumer's own table then the parent chain;
    /// the callable runs with the original receiver, so operations it
    /// re-invokes dispatch through the receiver again.
    pub fn invoke(&self, target: &ConsumerId, operation: &str, args: &[Value]) -> Result<Value> {
        let func = self.lookup(target, operation)?;
        func(self, target, args)
    }

    fn lookup(&self, target: &ConsumerId, operation: &str) -> Result<OpFn> {
        if !self.ledger.contains_key(target) {
            return Err(Error::UnknownConsumer(target.clone()));
        }
        let mut current = target;
        while let Some(state) = self.ledger.get(current) {
            if let Some(binding) = state.table.get(operation) {
                return Ok(binding.func.clone());
            }
            match state.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Err(Error::UnknownOperation {
            consumer: target.clone(),
            operation: operation.to_string(),
        })
    }
}
