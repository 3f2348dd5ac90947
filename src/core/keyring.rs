use keyring::Entry;

use crate::core::error::MatrixError;

const KEYRING_SERVICE: &str = "matrix";

/// Secret-per-alias storage backed by the OS credential store.
///
/// Tokens never touch the plaintext config files; they live in the
/// platform keyring under a fixed service name, keyed by provider alias.
/// The keyring can be disabled for tests, in which case stores are
/// dropped and lookups report no token.
pub struct TokenStore {
    use_keyring: bool,
}

impl TokenStore {
    pub fn new() -> Self {
        Self { use_keyring: true }
    }

    /// A store that never touches the platform keyring (tests).
    pub fn disabled() -> Self {
        Self { use_keyring: false }
    }

    pub fn store(&self, alias: &str, token: &str) -> Result<(), MatrixError> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, alias)?;
        entry.set_password(token)?;
        tracing::debug!(alias, "stored provider token");
        Ok(())
    }

    pub fn get(&self, alias: &str) -> Result<Option<String>, MatrixError> {
        if !self.use_keyring {
            return Ok(None);
        }
        let entry = Entry::new(KEYRING_SERVICE, alias)?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn remove(&self, alias: &str) -> Result<(), MatrixError> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, alias)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_store_reports_no_token() {
        let tokens = TokenStore::disabled();
        tokens.store("openai", "sk-test").unwrap();
        assert_eq!(tokens.get("openai").unwrap(), None);
        tokens.remove("openai").unwrap();
    }
}
