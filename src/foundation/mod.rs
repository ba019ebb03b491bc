//! Foundation types shared across the engine
//!
//! Identity newtypes for roles and consumers, the reserved operation
//! names, and the dynamic [`Value`] type operations exchange at runtime.

pub mod ident;
pub mod value;

pub use ident::{is_reserved, ConsumerId, RoleId, DOES, RESERVED_OPERATIONS};
pub use value::Value;
