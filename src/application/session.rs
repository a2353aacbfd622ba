use crate::application::NowProvider;
use crate::domain::models::{SessionToken, ThemeMode};
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::CoreError;
use chrono::Utc;
use std::sync::Arc;

const TOKEN_LEEWAY_SECONDS: i64 = 60;

/// Explicitly constructed session object handed to whatever needs the current
/// user or theme. Created at sign-in, torn down at sign-out; there is no
/// ambient global state behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub theme: ThemeMode,
    pub token: SessionToken,
}

impl Session {
    pub fn with_theme(mut self, theme: ThemeMode) -> Self {
        self.theme = theme;
        self
    }
}

/// Session lifecycle over a credential store.
pub struct SessionManager<S>
where
    S: CredentialStore,
{
    credential_store: Arc<S>,
    now_provider: NowProvider,
}

impl<S> SessionManager<S>
where
    S: CredentialStore,
{
    pub fn new(credential_store: Arc<S>) -> Self {
        Self {
            credential_store,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn sign_in(&self, token: SessionToken) -> Result<Session, CoreError> {
        if !token.is_valid_at((self.now_provider)(), 0) {
            return Err(CoreError::Validation(
                "session token is empty or already expired".to_string(),
            ));
        }

        self.credential_store.save_token(&token)?;
        log::debug!("session opened for user {}", token.user_id);
        Ok(Session {
            user_id: token.user_id.clone(),
            theme: ThemeMode::default(),
            token,
        })
    }

    /// Restores the persisted session, or `None` when there is none or the
    /// stored token has expired past the leeway.
    pub fn restore(&self) -> Result<Option<Session>, CoreError> {
        let Some(token) = self.credential_store.load_token()? else {
            return Ok(None);
        };
        if !token.is_valid_at((self.now_provider)(), TOKEN_LEEWAY_SECONDS) {
            return Ok(None);
        }
        Ok(Some(Session {
            user_id: token.user_id.clone(),
            theme: ThemeMode::default(),
            token,
        }))
    }

    pub fn sign_out(&self) -> Result<(), CoreError> {
        self.credential_store.delete_token()
    }
}
