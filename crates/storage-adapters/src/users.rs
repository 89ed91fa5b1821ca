use async_trait::async_trait;
use dashmap::DashMap;
use domains::{Hashpass, RegisteredUser, UserDirectory};

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<Hashpass, RegisteredUser>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the registration for the user's hashpass.
    pub fn register(&self, user: RegisteredUser) {
        tracing::info!(level = user.level.0, boards = ?user.boards, "user registered");
        self.users.insert(user.hashpass, user);
    }

    pub fn unregister(&self, hashpass: &Hashpass) -> Option<RegisteredUser> {
        self.users.remove(hashpass).map(|(_, user)| user)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn registered_user(&self, hashpass: &Hashpass) -> anyhow::Result<Option<RegisteredUser>> {
        Ok(self.users.get(hashpass).map(|u| u.clone()))
    }
}
