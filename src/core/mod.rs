pub mod assistants;
pub mod chat_stream;
pub mod config;
pub mod error;
pub mod keyring;
pub mod prompts;
pub mod providers;
pub mod session;
