//! # Composure
//!
//! A role (trait/mixin) composition engine: named behavior units declare
//! the operations they provide, the operations they require, and the
//! roles they exclude; a [`CompositionContext`] composes them into
//! consumers (types or single instances), merging operation tables with
//! deterministic conflict resolution and origin tracing.
//!
//! ## Architecture
//!
//! ```text
//! registry   - role identity -> declared contract (requires/excludes/provides)
//! consumer   - per-consumer operation table, applied roles, alias maps
//! compose    - CompositionContext: the 7-step application algorithm
//! origin     - who owns an operation name (role, local, inherited)
//! introspect - does / applied_roles / alias_map / is_role queries
//! ```
//!
//! ## Composition rules
//!
//! - Roles apply in declaration order; for an unaliased name the first
//!   writer wins and later role implementations are silently discarded.
//! - A consumer's own operation definitions outrank any role, regardless
//!   of definition order.
//! - Aliasing (`m -> m2`) is the explicit escape hatch; an alias target
//!   colliding with a differently sourced operation is fatal.
//! - Exclusions gate before requirements, requirements before conflicts,
//!   and every gate reports its complete violation set.
//!
//! ## Usage
//!
//! ```
//! use composure::{CompositionContext, Value};
//!
//! let mut ctx = CompositionContext::new();
//! ctx.declare_role("Logger");
//! ctx.add_requirement("Logger", ["get_id"]).unwrap();
//! ctx.provide_operation("Logger", "log", |ctx, receiver, args| {
//!     let id = ctx.invoke(receiver, "get_id", &[])?;
//!     let msg = args.first().cloned().unwrap_or(Value::Unit);
//!     Ok(Value::Str(format!("LOG[{id}]: {msg}")))
//! })
//! .unwrap();
//!
//! let entity = ctx.define_type("Entity");
//! ctx.define_operation(&entity, "get_id", |_, _, _| Ok(Value::Int(123)))
//!     .unwrap();
//! ctx.apply_role(&entity, "Logger").unwrap();
//!
//! let out = ctx.invoke(&entity, "log", &[Value::from("hi")]).unwrap();
//! assert_eq!(out, Value::from("LOG[123]: hi"));
//! ```

pub mod compose;
pub mod consumer;
pub mod error;
pub mod foundation;
pub mod introspect;
pub mod origin;
pub mod registry;

pub use compose::{ApplyOutcome, CompositionContext, RoleApplication};
pub use consumer::{ConsumerKind, ConsumerState, OpBinding, OpFn, Origin};
pub use error::{AliasConflict, Error, Result};
pub use foundation::{ConsumerId, RoleId, Value, DOES, RESERVED_OPERATIONS};
pub use registry::{RoleDef, RoleLoader, RoleRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
