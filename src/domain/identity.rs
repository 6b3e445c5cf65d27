use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::task::OwnerId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl User {
    pub fn owner_id(&self) -> OwnerId { OwnerId(self.uid.clone()) }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    async fn current_user(&self) -> anyhow::Result<Option<User>>;
    async fn sign_in(&self, user: User) -> anyhow::Result<User>;
    async fn sign_out(&self) -> anyhow::Result<()>;
}
