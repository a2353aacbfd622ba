use crate::domain::models::SessionToken;
use crate::infrastructure::error::CoreError;
use std::sync::Mutex;

/// Local persistence for the signed-in session token. The record store never
/// sees credentials.
pub trait CredentialStore: Send + Sync {
    fn save_token(&self, token: &SessionToken) -> Result<(), CoreError>;
    fn load_token(&self) -> Result<Option<SessionToken>, CoreError>;
    fn delete_token(&self) -> Result<(), CoreError>;
}

/// OS keychain implementation.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service_name: String,
    account_name: String,
}

impl KeyringCredentialStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, CoreError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| CoreError::Credential(error.to_string()))
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new("lifeos.session", "default")
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn save_token(&self, token: &SessionToken) -> Result<(), CoreError> {
        let payload = serde_json::to_string(token)
            .map_err(|error| CoreError::Credential(error.to_string()))?;
        self.entry()?
            .set_password(&payload)
            .map_err(|error| CoreError::Credential(error.to_string()))
    }

    fn load_token(&self) -> Result<Option<SessionToken>, CoreError> {
        let payload = match self.entry()?.get_password() {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(error) => return Err(CoreError::Credential(error.to_string())),
        };

        let token = serde_json::from_str::<SessionToken>(&payload)
            .map_err(|error| CoreError::Credential(error.to_string()))?;
        Ok(Some(token))
    }

    fn delete_token(&self) -> Result<(), CoreError> {
        match self.entry()?.delete_credential() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(CoreError::Credential(error.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    token: Mutex<Option<SessionToken>>,
}

impl CredentialStore for InMemoryCredentialStore {
    fn save_token(&self, token: &SessionToken) -> Result<(), CoreError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|error| CoreError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = Some(token.clone());
        Ok(())
    }

    fn load_token(&self) -> Result<Option<SessionToken>, CoreError> {
        let guard = self
            .token
            .lock()
            .map_err(|error| CoreError::Credential(format!("in-memory lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn delete_token(&self) -> Result<(), CoreError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|error| CoreError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}
