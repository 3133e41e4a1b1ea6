//! Bundled static-token authenticator.
//!
//! Resolves bearer credentials against a configured table, the way the
//! emulator path of the original deployment resolved a fixed identity.
//! Production deployments swap in a real identity provider behind the
//! same trait.

use async_trait::async_trait;
use common::config::{AuthConfig, StaticUser};
use common::{Authenticator, Error, Result, UserIdentity};
use tracing::debug;

pub struct StaticAuthenticator {
    users: Vec<StaticUser>,
}

impl StaticAuthenticator {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            users: cfg.users.clone(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, credential: &str) -> Result<UserIdentity> {
        let token = credential
            .strip_prefix("Bearer ")
            .unwrap_or(credential)
            .trim();
        if token.is_empty() {
            return Err(Error::Unauthorized("empty credential".into()));
        }

        match self.users.iter().find(|u| u.token == token) {
            Some(user) => {
                debug!("authenticated {} ({:?})", user.uid, user.role);
                Ok(UserIdentity {
                    uid: user.uid.clone(),
                    email: user.email.clone(),
                    role: user.role,
                })
            }
            None => Err(Error::Unauthorized("invalid credential".into())),
        }
    }
}
