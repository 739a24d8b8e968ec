use shared::domain::UserId;

pub trait SessionProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

pub struct StaticSession {
    user_id: Option<UserId>,
}

impl StaticSession {
    pub fn signed_in(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }
}

impl SessionProvider for StaticSession {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id.clone()
    }
}
