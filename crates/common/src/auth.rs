//! Identity collaborator seam and role gating.

use crate::{Error, Result, Role, UserIdentity};
use async_trait::async_trait;

/// Maps a bearer credential to a caller identity plus a role.
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn authenticate(&self, credential: &str) -> Result<UserIdentity>;
}

/// Gate for destructive operations. The core only consumes the role flag;
/// callers resolve it once per request via an [`Authenticator`].
pub fn ensure_admin(user: &UserIdentity) -> Result<()> {
    match user.role {
        Role::Admin => Ok(()),
        Role::Guest => Err(Error::Forbidden(format!(
            "user {} is not an admin",
            user.uid
        ))),
    }
}
