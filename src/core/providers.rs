use crate::api::client::ChatClient;
use crate::core::config::{ConfigStore, Provider};
use crate::core::error::MatrixError;
use crate::core::keyring::TokenStore;

/// API key sent to endpoints that do not require authentication. The
/// header is always present; unauthenticated servers ignore it.
const PLACEHOLDER_API_KEY: &str = "dummy";

/// Registers (or replaces) a provider. A supplied token is stored in the
/// credential store under the alias and marks the provider as requiring
/// auth; the token itself never reaches the config file.
pub fn register(
    store: &mut ConfigStore,
    tokens: &TokenStore,
    alias: &str,
    url: &str,
    token: Option<&str>,
    name: Option<&str>,
) -> Result<Provider, MatrixError> {
    let name = name.filter(|n| !n.is_empty()).unwrap_or(alias);
    let token = token.filter(|t| !t.is_empty());
    let provider = Provider::new(alias, name, url, token.is_some())?;

    store.checkout(|cfg| {
        cfg.set_provider(provider.clone());
        Ok(())
    })?;

    if let Some(token) = token {
        tokens.store(alias, token)?;
    }
    Ok(provider)
}

/// All known providers in insertion order.
pub fn find_all(store: &mut ConfigStore) -> Result<Vec<Provider>, MatrixError> {
    store.checkout(|cfg| Ok(cfg.providers().to_vec()))
}

/// Removes a provider and its stored token, if any.
pub fn remove(store: &mut ConfigStore, tokens: &TokenStore, alias: &str) -> Result<(), MatrixError> {
    let removed = store.checkout(|cfg| cfg.remove_provider(alias))?;
    if removed.auth_required {
        tokens.remove(alias)?;
    }
    Ok(())
}

/// Resolves a provider to a client bound to its base URL and API key.
/// Fails with NotFound before any network call when the provider is
/// unknown or its token is missing from the credential store.
pub fn client_for(
    store: &mut ConfigStore,
    tokens: &TokenStore,
    provider_id: &str,
) -> Result<ChatClient, MatrixError> {
    let provider = store.checkout(|cfg| cfg.get_provider(provider_id))?;
    let api_key = if provider.auth_required {
        tokens
            .get(&provider.alias)?
            .ok_or_else(|| MatrixError::not_found("token for provider", &provider.alias))?
    } else {
        PLACEHOLDER_API_KEY.to_string()
    };
    Ok(ChatClient::new(&provider.url, api_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ConfigPaths;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, ConfigStore) {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = ConfigStore::load(ConfigPaths::from_dir(temp_dir.path())).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn register_then_list_round_trips_all_fields() {
        let (_tmp, mut store) = temp_store();
        let tokens = TokenStore::disabled();

        let registered = register(
            &mut store,
            &tokens,
            "local",
            "http://localhost:11434/v1",
            None,
            Some("Local Llama"),
        )
        .unwrap();

        let listed = find_all(&mut store).unwrap();
        assert_eq!(listed, vec![registered.clone()]);
        assert_eq!(registered.name, "Local Llama");
        assert_eq!(registered.url, "http://localhost:11434/v1");
        assert!(!registered.auth_required);
    }

    #[test]
    fn register_defaults_name_to_alias() {
        let (_tmp, mut store) = temp_store();
        let tokens = TokenStore::disabled();

        let provider = register(
            &mut store,
            &tokens,
            "openai",
            "https://api.openai.com/v1",
            None,
            None,
        )
        .unwrap();
        assert_eq!(provider.name, "openai");

        // An empty interactive answer also falls back to the alias.
        let provider = register(
            &mut store,
            &tokens,
            "openai",
            "https://api.openai.com/v1",
            None,
            Some(""),
        )
        .unwrap();
        assert_eq!(provider.name, "openai");
    }

    #[test]
    fn token_presence_drives_auth_required() {
        let (_tmp, mut store) = temp_store();
        let tokens = TokenStore::disabled();

        let with_token = register(
            &mut store,
            &tokens,
            "paid",
            "https://api.example.com/v1",
            Some("sk-test"),
            None,
        )
        .unwrap();
        assert!(with_token.auth_required);

        let empty_token = register(
            &mut store,
            &tokens,
            "free",
            "https://api.example.com/v1",
            Some(""),
            None,
        )
        .unwrap();
        assert!(!empty_token.auth_required);
    }

    #[test]
    fn register_rejects_bad_alias_and_url() {
        let (_tmp, mut store) = temp_store();
        let tokens = TokenStore::disabled();

        let err = register(
            &mut store,
            &tokens,
            "Bad Alias",
            "https://api.example.com/v1",
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, MatrixError::Validation(_)));

        let err = register(&mut store, &tokens, "ok", "not a url", None, None).unwrap_err();
        assert!(matches!(err, MatrixError::Validation(_)));
    }

    #[test]
    fn remove_unknown_provider_is_not_found() {
        let (_tmp, mut store) = temp_store();
        let tokens = TokenStore::disabled();
        let err = remove(&mut store, &tokens, "ghost").unwrap_err();
        assert!(matches!(err, MatrixError::NotFound { .. }));
    }

    #[test]
    fn client_for_unauthenticated_provider_uses_placeholder_key() {
        let (_tmp, mut store) = temp_store();
        let tokens = TokenStore::disabled();
        register(
            &mut store,
            &tokens,
            "local",
            "http://localhost:11434/v1",
            None,
            None,
        )
        .unwrap();

        let client = client_for(&mut store, &tokens, "local").unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn client_for_missing_token_is_not_found() {
        let (_tmp, mut store) = temp_store();
        let tokens = TokenStore::disabled();
        // auth_required but the disabled token store holds nothing
        store
            .checkout(|cfg| {
                cfg.set_provider(
                    crate::core::config::Provider::new(
                        "paid",
                        "Paid",
                        "https://api.example.com/v1",
                        true,
                    )
                    .unwrap(),
                );
                Ok(())
            })
            .unwrap();

        let err = client_for(&mut store, &tokens, "paid").unwrap_err();
        assert!(matches!(err, MatrixError::NotFound { .. }));
    }

    #[test]
    fn client_for_unknown_provider_is_not_found() {
        let (_tmp, mut store) = temp_store();
        let tokens = TokenStore::disabled();
        let err = client_for(&mut store, &tokens, "ghost").unwrap_err();
        assert!(matches!(
            err,
            MatrixError::NotFound {
                kind: "provider",
                ..
            }
        ));
    }
}
