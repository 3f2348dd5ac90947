//! Matrix is a prompt management tool: it keeps named chat providers,
//! reusable prompts, and assistant bindings in local config files, and
//! runs interactive chat sessions against any registered provider.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the config store, the provider/prompt/assistant
//!   registries, the credential store wrapper, and the chat session
//!   engine with its streaming plumbing.
//! - [`api`] defines the chat-completion wire payloads and the HTTP
//!   client bound to one provider.
//! - [`cli`] parses the command surface and dispatches into the
//!   registries and the session engine.
//! - [`ui`] renders assistant markdown for the terminal.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`).

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
