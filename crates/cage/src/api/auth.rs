//! Login and logout.

use tracing::info;

use cage_core::PermissionValue;
use cage_events::EventKind;
use cage_perms::{Actor, LoginChallenge, PermsError};
use cage_store::UpdateResult;

use crate::cms::Cms;
use crate::error::{ActionError, ActionResult};
use crate::view::{LoginOutcome, UserView};

impl Cms {
    /// Verify a login challenge and start a session.
    ///
    /// The cipher is checked before the timestamp, so an attacker without
    /// the password learns nothing about the replay window. Failed attempts against
    /// an existing account are audited.
    pub async fn login(&self, challenge: &LoginChallenge, remember: bool) -> ActionResult<LoginOutcome> {
        let Some(mut user) = self.store.get_user(&challenge.id).await? else {
            return Err(ActionError::not_found("id", "user id does not exist"));
        };
        let actor = Actor::from(&user);
        let now = self.now();

        if let Err(err) = self.verifier.verify(&user.password, challenge, now) {
            let reason = match err {
                PermsError::ChallengeExpired { .. } => "an expired timestamp",
                _ => "a wrong password",
            };
            self.notify(
                EventKind::Login,
                &format!("user({}) attempts to log in using {}.", user.id, reason),
                &actor,
            )
            .await;
            return Err(err.into());
        }

        if user.expired {
            return Err(ActionError::invalid("id", "this account has expired"));
        }

        user.last_login = now;
        if self.store.update_user(&user).await? == UpdateResult::NotFound {
            return Err(ActionError::not_found("id", "user id does not exist"));
        }

        let token = self.sessions.create(user.id.clone(), remember, now);
        info!(user = %user.id, remember, "login");
        self.notify(EventKind::Login, &format!("user({}) login.", user.id), &actor)
            .await;

        Ok(LoginOutcome {
            token,
            user: UserView::new(&user),
        })
    }

    /// End a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> ActionResult<()> {
        if let Some(session) = self.sessions.remove(token) {
            info!(user = %session.user, "logout");
            let actor = Actor::user(session.user.clone(), "", PermissionValue::EMPTY);
            self.notify(
                EventKind::Logout,
                &format!("user({}) logout.", session.user),
                &actor,
            )
            .await;
        }
        Ok(())
    }
}
