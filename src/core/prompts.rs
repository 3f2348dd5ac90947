use crate::core::config::{ConfigStore, Prompt};
use crate::core::error::MatrixError;

/// Adds a prompt, replacing any existing text under the same id.
pub fn add(store: &mut ConfigStore, prompt_id: &str, text: &str) -> Result<(), MatrixError> {
    let prompt = Prompt::new(prompt_id, text)?;
    store.checkout(|cfg| {
        cfg.add_prompt(prompt);
        Ok(())
    })
}

pub fn get(store: &mut ConfigStore, prompt_id: &str) -> Result<String, MatrixError> {
    store.checkout(|cfg| cfg.get_prompt(prompt_id))
}

/// All prompt ids in insertion order.
pub fn list(store: &mut ConfigStore) -> Result<Vec<String>, MatrixError> {
    store.checkout(|cfg| Ok(cfg.prompts().iter().map(|p| p.id.clone()).collect()))
}
