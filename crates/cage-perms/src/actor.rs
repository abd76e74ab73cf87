//! The caller of an action.

use cage_core::{Flag, PermissionValue, User, UserId};

/// Identity and permissions of whoever invoked an action.
///
/// Anonymous callers have no id and an empty permission value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Option<UserId>,
    pub name: String,
    pub permission: PermissionValue,
}

impl Actor {
    /// A caller without a session.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            name: String::new(),
            permission: PermissionValue::EMPTY,
        }
    }

    /// A signed-in caller.
    pub fn user(id: UserId, name: impl Into<String>, permission: PermissionValue) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            permission,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    /// Whether this actor is the user `id`. Anonymous actors are nobody.
    pub fn is(&self, id: &UserId) -> bool {
        self.id.as_ref() == Some(id)
    }

    /// Whether this actor owns a resource. A missing owner is owned by nobody.
    pub fn owns(&self, owner: Option<&UserId>) -> bool {
        owner.is_some_and(|owner| self.is(owner))
    }

    /// Raw flag test, ignoring the global permission switch.
    pub fn can(&self, flag: Flag) -> bool {
        self.permission.contains(flag)
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::user(user.id.clone(), user.name.clone(), user.permission)
    }
}
