//! User accounts.

use serde::Deserialize;
use tracing::info;

use cage_core::{flags, PermissionGroup, User, UserId};
use cage_events::EventKind;
use cage_perms::Actor;
use cage_store::{InsertResult, UpdateResult};

use crate::api::window_from_one;
use crate::cms::Cms;
use crate::error::{ActionError, ActionResult};
use crate::view::UserView;

/// Fields for a new account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub id: String,
    pub name: String,
    /// Plain password.
    pub password: String,
    /// Flag names. Unknown names are ignored.
    pub permission: Vec<String>,
    pub expired: bool,
}

/// Changes to an existing account. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModifyUser {
    pub name: Option<String>,
    pub password: Option<String>,
    /// Only `Some(true)` has an effect: an account cannot be revived here.
    pub expired: Option<bool>,
}

fn missing_user(id: &UserId) -> ActionError {
    ActionError::not_found("id", format!("user {id} does not exist"))
}

impl Cms {
    /// Users in creation order. Pages start at 1.
    pub async fn list_users(&self, actor: &Actor, page: i64, limit: i64) -> ActionResult<Vec<UserView>> {
        self.guard.require(actor, flags::READ_USER)?;

        let (offset, limit) = window_from_one(page, limit, self.config.user_list_limit);
        let users = self.store.list_users(offset, limit).await?;
        Ok(users.iter().map(UserView::new).collect())
    }

    pub async fn get_user(&self, actor: &Actor, id: &UserId) -> ActionResult<UserView> {
        self.guard.require(actor, flags::READ_USER)?;

        let user = self.store.get_user(id).await?.ok_or_else(|| missing_user(id))?;
        Ok(UserView::with_permission(&user, &self.permissions))
    }

    pub async fn add_user(&self, actor: &Actor, input: NewUser) -> ActionResult<UserView> {
        self.guard.require(actor, flags::CREATE_USER)?;

        let id = input.id.trim();
        self.rules.user_id.check("id", id)?;
        let name = input.name.trim();
        self.rules.user_name.check("name", name)?;
        let permission = self.permissions.parse(&input.permission);
        self.rules.user_password.check("password", &input.password)?;

        let mut user = User::new(
            UserId::new(id),
            name,
            self.verifier.hasher().hash_password(&input.password),
            permission,
            self.now(),
        );
        user.expired = input.expired;

        match self.store.insert_user(&user).await? {
            InsertResult::Inserted => {}
            InsertResult::Duplicate { field: "id" } => {
                return Err(ActionError::duplicate("id", format!("user id {id} already exists")));
            }
            InsertResult::Duplicate { field } => {
                return Err(ActionError::duplicate(field, format!("name {name} is already taken")));
            }
        }

        info!(user = %user.id, "user created");
        self.notify(EventKind::UserCreate, &format!("create user({}).", user.id), actor)
            .await;
        Ok(UserView::with_permission(&user, &self.permissions))
    }

    /// Modify an account; `id` defaults to the caller.
    ///
    /// Changing someone else also needs `MODIFY_OTHER_USER`. Nothing is
    /// written or audited when no field actually changes.
    pub async fn modify_user(
        &self,
        actor: &Actor,
        id: Option<&UserId>,
        input: ModifyUser,
    ) -> ActionResult<UserView> {
        self.guard.require(actor, flags::MODIFY_USER)?;

        let target = match id.or(actor.id.as_ref()) {
            Some(target) => target.clone(),
            None => return Err(ActionError::not_found("id", "no user given")),
        };
        if !actor.is(&target) {
            self.guard.require(actor, flags::MODIFY_OTHER_USER)?;
        }

        let name = input.name.filter(|n| !n.is_empty());
        if let Some(name) = &name {
            self.rules.user_name.check("name", name)?;
        }
        let password = input.password.filter(|p| !p.is_empty());
        if let Some(password) = &password {
            self.rules.user_password.check("password", password)?;
        }

        let mut user = self
            .store
            .get_user(&target)
            .await?
            .ok_or_else(|| missing_user(&target))?;

        if let Some(name) = &name {
            if let Some(holder) = self.store.find_user_by_name(name).await? {
                if holder.id != target {
                    return Err(ActionError::duplicate("name", format!("name {name} is already taken")));
                }
            }
        }

        let mut changed = Vec::new();
        if let Some(name) = name {
            if name != user.name {
                user.name = name;
                changed.push("name");
            }
        }
        if let Some(password) = password {
            let digest = self.verifier.hasher().hash_password(&password);
            if digest != user.password {
                user.password = digest;
                changed.push("password");
            }
        }
        if input.expired == Some(true) && !user.expired {
            user.expired = true;
            changed.push("expired");
        }

        if changed.is_empty() {
            return Ok(UserView::new(&user));
        }

        match self.store.update_user(&user).await? {
            UpdateResult::Updated => {}
            UpdateResult::Duplicate { field } => {
                return Err(ActionError::duplicate(field, format!("name {} is already taken", user.name)));
            }
            UpdateResult::NotFound => return Err(missing_user(&target)),
        }
        if user.expired {
            self.end_sessions(&target);
        }

        info!(user = %target, fields = ?changed, "user modified");
        self.notify(
            EventKind::UserModify,
            &format!("modify properties {} of user({}).", changed.join(","), target),
            actor,
        )
        .await;
        Ok(UserView::new(&user))
    }

    /// Replace a user's permission with the named flags.
    pub async fn set_user_permission(
        &self,
        actor: &Actor,
        id: &UserId,
        names: &[String],
    ) -> ActionResult<UserView> {
        self.guard.require(actor, flags::MODIFY_OTHER_USER)?;

        let mut user = self.store.get_user(id).await?.ok_or_else(|| missing_user(id))?;
        user.permission = self.permissions.parse(names);

        if self.store.update_user(&user).await? == UpdateResult::NotFound {
            return Err(missing_user(id));
        }

        let granted = self.permissions.names(user.permission).join(",");
        info!(user = %id, permission = %granted, "permission changed");
        self.notify(
            EventKind::UserModify,
            &format!("set permission of user({id}) to [{granted}]."),
            actor,
        )
        .await;
        Ok(UserView::with_permission(&user, &self.permissions))
    }

    pub async fn delete_user(&self, actor: &Actor, id: &UserId) -> ActionResult<()> {
        self.guard.require(actor, flags::DELETE_USER)?;

        if !self.store.delete_user(id).await? {
            return Err(missing_user(id));
        }
        self.end_sessions(id);

        info!(user = %id, "user deleted");
        self.notify(EventKind::UserDelete, &format!("delete user({id})."), actor)
            .await;
        Ok(())
    }

    /// Flag groups with their flag names and descriptions.
    pub fn permission_groups(&self) -> &[PermissionGroup] {
        self.permissions.groups()
    }
}
