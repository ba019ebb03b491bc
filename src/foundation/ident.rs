//! Identity newtypes for roles and consumers
//!
//! Roles and consumers are identified by opaque string names. The engine
//! never interprets the name beyond equality and ordering; the newtypes
//! exist so a role identity can never be passed where a consumer identity
//! is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a role
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(String);

impl RoleId {
    /// Create a role identity from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unique identifier for a consumer (a type or a single instance)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsumerId(String);

impl ConsumerId {
    /// Create a consumer identity from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConsumerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConsumerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Name of the universal capability-check operation installed on consumers.
pub const DOES: &str = "does";

/// Operation names a role may never provide.
///
/// `does` is the engine's own introspection entry point; `new` and the
/// `init`/`drop` lifecycle hooks belong to the consumer's object model.
pub const RESERVED_OPERATIONS: &[&str] = &["new", "does", "init", "drop"];

/// Check whether an operation name is reserved.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_OPERATIONS.contains(&name)
}
