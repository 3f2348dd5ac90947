//! Command-line parsing and dispatch.
//!
//! Subcommands translate directly into registry and session-engine calls;
//! no business logic lives here beyond interactive prompting for options
//! omitted from `providers register`.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::config::ConfigStore;
use crate::core::error::MatrixError;
use crate::core::keyring::TokenStore;
use crate::core::session::{self, SessionOptions};
use crate::core::{assistants, prompts, providers};

#[derive(Parser)]
#[command(name = "matrix")]
#[command(about = "A prompt management tool")]
#[command(
    long_about = "Matrix manages chat providers, reusable prompts, and assistants, \
and runs an interactive chat session against any registered provider using a \
stored prompt as the system message.\n\n\
Provider API tokens are kept in the OS credential store, never in config files."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provider management
    #[command(subcommand)]
    Providers(ProviderCommand),
    /// Prompt management
    #[command(subcommand)]
    Prompts(PromptCommand),
    /// Assistant management
    #[command(subcommand)]
    Assistants(AssistantCommand),
}

#[derive(Subcommand)]
pub enum ProviderCommand {
    /// Register a new provider
    Register {
        alias: String,
        /// Name of the provider
        #[arg(long)]
        name: Option<String>,
        /// URL of the provider
        #[arg(long)]
        url: Option<String>,
        /// Auth token for the provider
        #[arg(long)]
        token: Option<String>,
    },
    /// List all registered providers
    List,
    /// Remove a registered provider and its stored token
    Remove { alias: String },
}

#[derive(Subcommand)]
pub enum PromptCommand {
    /// Add a new prompt from a file, or stdin when no file is given
    Add {
        prompt_id: String,
        file: Option<PathBuf>,
    },
    /// List all prompts
    List,
    /// Run a prompt interactively
    Run {
        prompt_id: String,
        /// Provider to use
        #[arg(long)]
        provider: String,
        /// Model to use
        #[arg(long)]
        model: String,
        /// Stream the output. Forces raw, incremental rendering
        #[arg(long)]
        stream: bool,
        /// Show raw, unformatted output
        #[arg(long)]
        raw: bool,
    },
}

#[derive(Subcommand)]
pub enum AssistantCommand {
    /// Save a provider + model + prompt binding
    Add {
        assistant_id: String,
        provider_id: String,
        model_id: String,
        prompt_id: String,
    },
    /// List all assistants
    List,
    /// Run a saved assistant interactively
    Run { assistant_id: String },
}

/// Reads one interactive answer from stdin; an empty answer maps to None.
fn prompt_line(label: &str) -> Result<Option<String>, MatrixError> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let line = line.trim();
    Ok(if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    })
}

pub async fn run(
    args: Args,
    store: &mut ConfigStore,
    tokens: &TokenStore,
) -> Result<(), MatrixError> {
    match args.command {
        Commands::Providers(cmd) => run_providers(cmd, store, tokens).await,
        Commands::Prompts(cmd) => run_prompts(cmd, store, tokens).await,
        Commands::Assistants(cmd) => run_assistants(cmd, store, tokens).await,
    }
}

async fn run_providers(
    cmd: ProviderCommand,
    store: &mut ConfigStore,
    tokens: &TokenStore,
) -> Result<(), MatrixError> {
    match cmd {
        ProviderCommand::Register {
            alias,
            name,
            url,
            token,
        } => {
            let name = match name {
                Some(name) => Some(name),
                None => prompt_line("Name (leave empty to use alias)")?,
            };
            let url = match url {
                Some(url) => url,
                None => prompt_line("URL")?
                    .ok_or_else(|| MatrixError::Validation("url is required".to_string()))?,
            };
            let token = match token {
                Some(token) => Some(token),
                None => prompt_line("Token (leave empty if not required)")?,
            };

            let provider = providers::register(
                store,
                tokens,
                &alias,
                &url,
                token.as_deref(),
                name.as_deref(),
            )?;
            println!(
                "Registered provider {} with alias {}",
                provider.name, provider.alias
            );
            Ok(())
        }
        ProviderCommand::List => {
            for provider in providers::find_all(store)? {
                println!("Provider: {}", provider.alias);
                println!("\tName: {}", provider.name);
                println!("\tURL: {}", provider.url);
                println!("\tAuth Required: {}", provider.auth_required);
            }
            Ok(())
        }
        ProviderCommand::Remove { alias } => {
            providers::remove(store, tokens, &alias)?;
            println!("Removed provider {alias}");
            Ok(())
        }
    }
}

async fn run_prompts(
    cmd: PromptCommand,
    store: &mut ConfigStore,
    tokens: &TokenStore,
) -> Result<(), MatrixError> {
    match cmd {
        PromptCommand::Add { prompt_id, file } => {
            let text = match file {
                Some(path) => fs::read_to_string(path)?,
                None => io::read_to_string(io::stdin())?,
            };
            prompts::add(store, &prompt_id, &text)?;
            println!("Added prompt {prompt_id}");
            Ok(())
        }
        PromptCommand::List => {
            for prompt_id in prompts::list(store)? {
                println!("{prompt_id}");
            }
            Ok(())
        }
        PromptCommand::Run {
            prompt_id,
            provider,
            model,
            stream,
            raw,
        } => {
            session::run_prompt(
                store,
                tokens,
                &prompt_id,
                &provider,
                &model,
                SessionOptions { stream, raw },
            )
            .await
        }
    }
}

async fn run_assistants(
    cmd: AssistantCommand,
    store: &mut ConfigStore,
    tokens: &TokenStore,
) -> Result<(), MatrixError> {
    match cmd {
        AssistantCommand::Add {
            assistant_id,
            provider_id,
            model_id,
            prompt_id,
        } => {
            let assistant = assistants::add(store, &assistant_id, &provider_id, &model_id, &prompt_id)?;
            println!("Added assistant {}", assistant.id);
            Ok(())
        }
        AssistantCommand::List => {
            for assistant in assistants::list(store)? {
                println!("Assistant: {}", assistant.id);
                println!("\tProvider: {}", assistant.provider_id);
                println!("\tModel: {}", assistant.model_id);
                println!("\tPrompt: {}", assistant.prompt_id);
            }
            Ok(())
        }
        AssistantCommand::Run { assistant_id } => {
            assistants::run(store, tokens, &assistant_id, SessionOptions::default()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn prompts_run_parses_flags() {
        let args = Args::try_parse_from([
            "matrix", "prompts", "run", "greet", "--provider", "openai", "--model", "gpt-4o",
            "--stream",
        ])
        .unwrap();
        match args.command {
            Commands::Prompts(PromptCommand::Run {
                prompt_id,
                provider,
                model,
                stream,
                raw,
            }) => {
                assert_eq!(prompt_id, "greet");
                assert_eq!(provider, "openai");
                assert_eq!(model, "gpt-4o");
                assert!(stream);
                assert!(!raw);
            }
            _ => panic!("expected prompts run"),
        }
    }

    #[test]
    fn providers_register_accepts_optional_flags() {
        let args = Args::try_parse_from([
            "matrix", "providers", "register", "openai", "--url", "https://api.openai.com/v1",
        ])
        .unwrap();
        match args.command {
            Commands::Providers(ProviderCommand::Register {
                alias, name, url, ..
            }) => {
                assert_eq!(alias, "openai");
                assert_eq!(name, None);
                assert_eq!(url.as_deref(), Some("https://api.openai.com/v1"));
            }
            _ => panic!("expected providers register"),
        }
    }

    #[test]
    fn assistants_add_takes_four_ids() {
        let args = Args::try_parse_from([
            "matrix", "assistants", "add", "helper", "openai", "gpt-4o", "greet",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Commands::Assistants(AssistantCommand::Add { .. })
        ));
    }
}
