//! Per-action authorization.

use cage_core::{Flag, UserId};
use tracing::{debug, warn};

use crate::actor::Actor;
use crate::error::{PermsError, Result};

/// Checks an actor against the flag an action requires.
///
/// With permission control disabled every check passes, including the
/// ownership checks. Test deployments run that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationGuard {
    enabled: bool,
}

impl AuthorizationGuard {
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// A guard that enforces every check.
    pub const fn enforcing() -> Self {
        Self::new(true)
    }

    /// A guard that allows everything.
    pub const fn disabled() -> Self {
        Self::new(false)
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `actor` passes the check for `flag`.
    pub fn allows(&self, actor: &Actor, flag: Flag) -> bool {
        !self.enabled || actor.can(flag)
    }

    /// Require `flag`.
    pub fn require(&self, actor: &Actor, flag: Flag) -> Result<()> {
        if self.allows(actor, flag) {
            return Ok(());
        }

        warn!(actor = ?actor.id, required = flag.name(), "permission denied");
        Err(PermsError::PermissionDenied {
            required: flag.name(),
        })
    }

    /// Require that `actor` owns the resource, or else holds `elevated`.
    ///
    /// A resource whose owner is gone can only be touched with `elevated`.
    pub fn require_owner_or(
        &self,
        actor: &Actor,
        owner: Option<&UserId>,
        elevated: Flag,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if actor.owns(owner) {
            debug!(actor = ?actor.id, "owner access");
            return Ok(());
        }

        self.require(actor, elevated)
    }
}

impl Default for AuthorizationGuard {
    fn default() -> Self {
        Self::enforcing()
    }
}
