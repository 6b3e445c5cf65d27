use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::domain::identity::{IdentityProvider, User};

use super::kv::SqliteKeyValue;

const USER_KEY: &str = "taskmaster_user";

/// Remembers the signed-in user locally. No credentials are checked; whoever
/// signs in is trusted, as with the mocked sign-in of the web client.
#[derive(Clone)]
pub struct LocalIdentityProvider {
    kv: SqliteKeyValue,
}

impl LocalIdentityProvider {
    pub fn new(kv: SqliteKeyValue) -> Self { Self { kv } }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn current_user(&self) -> Result<Option<User>> {
        let Some(raw) = self.kv.get(USER_KEY).await? else { return Ok(None) };
        let user = serde_json::from_str(&raw).context("corrupt stored user")?;
        Ok(Some(user))
    }

    async fn sign_in(&self, user: User) -> Result<User> {
        let uid = user.uid.trim();
        if uid.is_empty() { bail!("user id must not be empty"); }
        let user = User { uid: uid.to_string(), ..user };
        self.kv.set(USER_KEY, &serde_json::to_string(&user)?).await?;
        tracing::info!(uid = %user.uid, "signed in");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        if self.kv.remove(USER_KEY).await? {
            tracing::info!("signed out");
        }
        Ok(())
    }
}
