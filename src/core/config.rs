use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use url::Url;

use crate::core::error::MatrixError;

/// A registered remote chat endpoint plus name and auth metadata.
///
/// Records are immutable once constructed; re-registering an alias
/// replaces the whole record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Provider {
    pub alias: String,
    pub name: String,
    pub url: String,
    pub auth_required: bool,
}

impl Provider {
    pub fn new(
        alias: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        auth_required: bool,
    ) -> Result<Self, MatrixError> {
        let alias = alias.into();
        let url = url.into();
        validate_identifier("alias", &alias)?;
        validate_absolute_url(&url)?;
        Ok(Self {
            alias,
            name: name.into(),
            url,
            auth_required,
        })
    }
}

/// Reusable system-message text, addressed by id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub id: String,
    pub text: String,
}

impl Prompt {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Result<Self, MatrixError> {
        let id = id.into();
        validate_identifier("prompt id", &id)?;
        Ok(Self {
            id,
            text: text.into(),
        })
    }
}

/// A named binding of provider + model + prompt.
///
/// References are not resolved at write time; a dangling provider or
/// prompt id surfaces as NotFound when the assistant is run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Assistant {
    pub id: String,
    pub provider_id: String,
    pub model_id: String,
    pub prompt_id: String,
}

impl Assistant {
    pub fn new(
        id: impl Into<String>,
        provider_id: impl Into<String>,
        model_id: impl Into<String>,
        prompt_id: impl Into<String>,
    ) -> Result<Self, MatrixError> {
        let id = id.into();
        let provider_id = provider_id.into();
        let model_id = model_id.into();
        let prompt_id = prompt_id.into();
        validate_identifier("assistant id", &id)?;
        validate_identifier("provider id", &provider_id)?;
        validate_identifier("model id", &model_id)?;
        validate_identifier("prompt id", &prompt_id)?;
        Ok(Self {
            id,
            provider_id,
            model_id,
            prompt_id,
        })
    }
}

/// Checks the `^[a-z0-9-]+$` identifier pattern shared by every record key.
pub fn validate_identifier(field: &str, value: &str) -> Result<(), MatrixError> {
    let valid = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(MatrixError::Validation(format!(
            "{field} must only contain lowercase letters, numbers, and hyphens"
        )))
    }
}

fn validate_absolute_url(value: &str) -> Result<(), MatrixError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|_| MatrixError::Validation("url must be an absolute URL".to_string()))
}

/// Locations of the persisted config files and the input-history directory.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    config_dir: PathBuf,
}

impl ConfigPaths {
    /// Resolves the platform config directory for the application.
    pub fn discover() -> Result<Self, MatrixError> {
        let proj_dirs = ProjectDirs::from("", "", "matrix").ok_or_else(|| {
            MatrixError::Config("could not determine a config directory".to_string())
        })?;
        Ok(Self {
            config_dir: proj_dirs.config_dir().to_path_buf(),
        })
    }

    /// Uses an explicit directory instead of the platform default.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: dir.into(),
        }
    }

    pub fn providers_file(&self) -> PathBuf {
        self.config_dir.join("providers.toml")
    }

    pub fn prompts_file(&self) -> PathBuf {
        self.config_dir.join("prompts.toml")
    }

    pub fn assistants_file(&self) -> PathBuf {
        self.config_dir.join("assistants.toml")
    }

    pub fn history_dir(&self) -> PathBuf {
        self.config_dir.join("history")
    }

    pub fn history_file(&self, prompt_id: &str) -> PathBuf {
        self.history_dir().join(format!("{prompt_id}.txt"))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProvidersFile {
    #[serde(default, rename = "provider")]
    providers: Vec<Provider>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PromptsFile {
    #[serde(default, rename = "prompt")]
    prompts: Vec<Prompt>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AssistantsFile {
    #[serde(default, rename = "assistant")]
    assistants: Vec<Assistant>,
}

/// In-memory view of the persisted provider, prompt, and assistant records.
///
/// The store is constructed once per process and passed by reference into
/// the registries and the session engine. Mutating operations set a dirty
/// flag; [`ConfigStore::checkout`] is the only place that turns the flag
/// into a save.
#[derive(Debug)]
pub struct ConfigStore {
    paths: ConfigPaths,
    providers: Vec<Provider>,
    prompts: Vec<Prompt>,
    assistants: Vec<Assistant>,
    dirty: bool,
}

impl ConfigStore {
    /// Reads the three config files, tolerating missing files as empty.
    pub fn load(paths: ConfigPaths) -> Result<Self, MatrixError> {
        let providers: ProvidersFile = read_records(&paths.providers_file())?;
        let prompts: PromptsFile = read_records(&paths.prompts_file())?;
        let assistants: AssistantsFile = read_records(&paths.assistants_file())?;
        tracing::debug!(
            providers = providers.providers.len(),
            prompts = prompts.prompts.len(),
            assistants = assistants.assistants.len(),
            "loaded config"
        );
        Ok(Self {
            paths,
            providers: providers.providers,
            prompts: prompts.prompts,
            assistants: assistants.assistants,
            dirty: false,
        })
    }

    /// Writes all records back to disk and clears the dirty flag.
    pub fn save(&mut self) -> Result<(), MatrixError> {
        fs::create_dir_all(&self.paths.config_dir)?;
        write_records(
            &self.paths.providers_file(),
            &ProvidersFile {
                providers: self.providers.clone(),
            },
        )?;
        write_records(
            &self.paths.prompts_file(),
            &PromptsFile {
                prompts: self.prompts.clone(),
            },
        )?;
        write_records(
            &self.paths.assistants_file(),
            &AssistantsFile {
                assistants: self.assistants.clone(),
            },
        )?;
        self.dirty = false;
        tracing::debug!("saved config");
        Ok(())
    }

    /// Scoped checkout: runs `f` against the store and persists afterwards
    /// if and only if a mutation marked the store dirty. The save happens
    /// on every exit path, including `Err` returns from `f`.
    pub fn checkout<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, MatrixError>,
    ) -> Result<T, MatrixError> {
        let result = f(self);
        if self.dirty {
            if let Err(save_err) = self.save() {
                return result.and(Err(save_err));
            }
        }
        result
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Inserts or replaces a provider record, keeping insertion order for
    /// existing aliases.
    pub fn set_provider(&mut self, provider: Provider) {
        match self.providers.iter_mut().find(|p| p.alias == provider.alias) {
            Some(existing) => *existing = provider,
            None => self.providers.push(provider),
        }
        self.dirty = true;
    }

    pub fn get_provider(&self, alias: &str) -> Result<Provider, MatrixError> {
        self.providers
            .iter()
            .find(|p| p.alias == alias)
            .cloned()
            .ok_or_else(|| MatrixError::not_found("provider", alias))
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn remove_provider(&mut self, alias: &str) -> Result<Provider, MatrixError> {
        let index = self
            .providers
            .iter()
            .position(|p| p.alias == alias)
            .ok_or_else(|| MatrixError::not_found("provider", alias))?;
        self.dirty = true;
        Ok(self.providers.remove(index))
    }

    /// Inserts or replaces a prompt; re-adding an id replaces its text.
    pub fn add_prompt(&mut self, prompt: Prompt) {
        match self.prompts.iter_mut().find(|p| p.id == prompt.id) {
            Some(existing) => *existing = prompt,
            None => self.prompts.push(prompt),
        }
        self.dirty = true;
    }

    pub fn get_prompt(&self, prompt_id: &str) -> Result<String, MatrixError> {
        self.prompts
            .iter()
            .find(|p| p.id == prompt_id)
            .map(|p| p.text.clone())
            .ok_or_else(|| MatrixError::not_found("prompt", prompt_id))
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn add_assistant(&mut self, assistant: Assistant) {
        match self.assistants.iter_mut().find(|a| a.id == assistant.id) {
            Some(existing) => *existing = assistant,
            None => self.assistants.push(assistant),
        }
        self.dirty = true;
    }

    pub fn get_assistant(&self, assistant_id: &str) -> Result<Assistant, MatrixError> {
        self.assistants
            .iter()
            .find(|a| a.id == assistant_id)
            .cloned()
            .ok_or_else(|| MatrixError::not_found("assistant", assistant_id))
    }

    pub fn assistants(&self) -> &[Assistant] {
        &self.assistants
    }
}

fn read_records<T: Default + serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, MatrixError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        Ok(T::default())
    }
}

fn write_records<T: Serialize>(path: &PathBuf, records: &T) -> Result<(), MatrixError> {
    let contents = toml::to_string_pretty(records)?;
    fs::write(path, contents)?;
    Ok(())
}
