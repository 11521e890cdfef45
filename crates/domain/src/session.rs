use chrono::Utc;
use rand::{distributions::Uniform, Rng};

use crate::models::ActorId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    pub id: String,
    pub name: String,
}

/// Who is acting, passed explicitly to every controller.
///
/// The anonymous session id is durable for the lifetime of the client and
/// survives sign-in and sign-out; a signed-in user acts under their own id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    session_id: ActorId,
    user: Option<SignedInUser>,
    token: Option<String>,
}

impl Session {
    /// A fresh anonymous session with a `<millis>-<base36>` id.
    pub fn anonymous() -> Self {
        const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let suffix: String = rand::thread_rng()
            .sample_iter(Uniform::from(0..BASE36.len()))
            .take(10)
            .map(|i| BASE36[i] as char)
            .collect();
        Self::resume(ActorId::new_unchecked(format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            suffix
        )))
    }

    /// Picks up a previously issued session id.
    pub fn resume(session_id: ActorId) -> Self {
        Self {
            session_id,
            user: None,
            token: None,
        }
    }

    pub fn sign_in(self, user: SignedInUser, token: impl Into<String>) -> Self {
        Self {
            session_id: self.session_id,
            user: Some(user),
            token: Some(token.into()),
        }
    }

    pub fn sign_out(self) -> Self {
        Self::resume(self.session_id)
    }

    pub fn session_id(&self) -> &ActorId {
        &self.session_id
    }

    pub fn actor_id(&self) -> ActorId {
        match &self.user {
            Some(u) => ActorId::new_unchecked(u.id.clone()),
            None => self.session_id.clone(),
        }
    }

    pub fn user(&self) -> Option<&SignedInUser> {
        self.user.as_ref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.name.as_str())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
