use crate::core::config::{Assistant, ConfigStore};
use crate::core::error::MatrixError;
use crate::core::keyring::TokenStore;
use crate::core::session::{self, SessionOptions};

/// Saves an assistant binding. Referenced provider and prompt ids are not
/// checked here; a dangling reference fails lazily when the assistant is
/// run.
pub fn add(
    store: &mut ConfigStore,
    assistant_id: &str,
    provider_id: &str,
    model_id: &str,
    prompt_id: &str,
) -> Result<Assistant, MatrixError> {
    let assistant = Assistant::new(assistant_id, provider_id, model_id, prompt_id)?;
    store.checkout(|cfg| {
        cfg.add_assistant(assistant.clone());
        Ok(())
    })?;
    Ok(assistant)
}

/// All saved assistants in insertion order.
pub fn list(store: &mut ConfigStore) -> Result<Vec<Assistant>, MatrixError> {
    store.checkout(|cfg| Ok(cfg.assistants().to_vec()))
}

/// Resolves the assistant and hands its binding to the session engine.
pub async fn run(
    store: &mut ConfigStore,
    tokens: &TokenStore,
    assistant_id: &str,
    options: SessionOptions,
) -> Result<(), MatrixError> {
    let assistant = store.checkout(|cfg| cfg.get_assistant(assistant_id))?;
    session::run_prompt(
        store,
        tokens,
        &assistant.prompt_id,
        &assistant.provider_id,
        &assistant.model_id,
        options,
    )
    .await
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
    fn add_then_list_round_trips() {
        let (_tmp, mut store) = temp_store();
        let added = add(&mut store, "helper", "openai", "gpt-4o", "greet").unwrap();
        assert_eq!(list(&mut store).unwrap(), vec![added]);
    }

    #[test]
    fn add_accepts_dangling_references() {
        let (_tmp, mut store) = temp_store();
        // No provider or prompt registered yet; the binding still saves.
        assert!(add(&mut store, "helper", "ghost", "gpt-4o", "missing").is_ok());
    }

    #[tokio::test]
    async fn run_unknown_assistant_is_not_found() {
        let (_tmp, mut store) = temp_store();
        let tokens = TokenStore::disabled();
        let err = run(&mut store, &tokens, "ghost", SessionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MatrixError::NotFound {
                kind: "assistant",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn run_with_dangling_provider_fails_before_network() {
        let (_tmp, mut store) = temp_store();
        let tokens = TokenStore::disabled();
        add(&mut store, "helper", "ghost", "gpt-4o", "missing").unwrap();

        let err = run(&mut store, &tokens, "helper", SessionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MatrixError::NotFound {
                kind: "provider",
                ..
            }
        ));
    }
}
