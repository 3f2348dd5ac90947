use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::api::client::ChatClient;
use crate::api::ChatMessage;
use crate::core::config::ConfigStore;
use crate::core::error::MatrixError;
use crate::core::keyring::TokenStore;
use crate::core::{prompts, providers};
use crate::ui::markdown::render_markdown;

/// Fixed sampling temperature for every completion request.
const TEMPERATURE: f32 = 0.1;

/// Maximum input-history lines retained per prompt.
pub const HISTORY_MAX_LINES: usize = 1000;

const USER_LABEL: &str = "You: ";
const ASSISTANT_LABEL: &str = "Assistant: ";

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Stream the reply as it arrives. Forces raw incremental rendering.
    pub stream: bool,
    /// Print the reply as plain text instead of rendered markdown.
    pub raw: bool,
}

/// The ordered message list driving one chat session.
///
/// Seeded with exactly one system message; grows by one user entry per
/// submitted line and one assistant entry per completed reply. Never
/// persisted.
#[derive(Debug)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn push_user(&mut self, content: &str) {
        self.messages.push(ChatMessage::user(content.trim()));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.messages.push(ChatMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

/// Source of user input lines for one session, with per-prompt history.
///
/// The production implementation is a rustyline editor persisting to the
/// prompt's history file; tests script the session through this seam.
trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadlineError>;
    /// Records a submitted line in the input history.
    fn remember(&mut self, line: &str);
    /// Persists recorded history. Invoked exactly once when the session
    /// ends, on every exit path; failures are logged, not fatal.
    fn flush(&mut self);
}

struct EditorInput {
    editor: DefaultEditor,
    history_file: PathBuf,
}

impl LineSource for EditorInput {
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadlineError> {
        self.editor.readline(prompt)
    }

    fn remember(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }

    fn flush(&mut self) {
        if let Err(err) = self.editor.save_history(&self.history_file) {
            tracing::warn!("failed to save input history: {err}");
        }
    }
}

/// Outcome of one read from the line editor.
enum Turn {
    Line(String),
    End,
}

/// Maps a readline result onto the session state machine: an interrupt
/// or end-of-input ends the session cleanly, everything else is fatal.
fn classify_readline(result: Result<String, ReadlineError>) -> Result<Turn, MatrixError> {
    match result {
        Ok(line) => Ok(Turn::Line(line)),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(Turn::End),
        Err(err) => Err(err.into()),
    }
}

fn history_editor(history_file: &Path) -> Result<DefaultEditor, MatrixError> {
    let config = rustyline::Config::builder()
        .max_history_size(HISTORY_MAX_LINES)?
        .build();
    let mut editor = DefaultEditor::with_config(config)?;
    if history_file.exists() {
        editor.load_history(history_file)?;
    }
    Ok(editor)
}

/// Runs one interactive chat session against a resolved provider+model,
/// seeded with the stored prompt as the system message.
///
/// Provider, token, and prompt lookups happen before any network call.
/// Input history is flushed back to its per-prompt file on every exit
/// path of the loop, including transport failures; user cancellation is
/// normal termination, not an error.
pub async fn run_prompt(
    store: &mut ConfigStore,
    tokens: &TokenStore,
    prompt_id: &str,
    provider_id: &str,
    model_id: &str,
    options: SessionOptions,
) -> Result<(), MatrixError> {
    let client = providers::client_for(store, tokens, provider_id)?;
    let prompt = prompts::get(store, prompt_id)?;

    let history_file = store.paths().history_file(prompt_id);
    fs::create_dir_all(store.paths().history_dir())?;
    let mut input = EditorInput {
        editor: history_editor(&history_file)?,
        history_file,
    };

    let mut transcript = Transcript::new(&prompt);
    tracing::debug!(prompt_id, provider_id, model_id, "starting chat session");
    run_session(&mut input, &client, model_id, &mut transcript, options).await
}

/// Drives the conversation loop and flushes input history exactly once,
/// no matter how the loop ended.
async fn run_session(
    input: &mut impl LineSource,
    client: &ChatClient,
    model_id: &str,
    transcript: &mut Transcript,
    options: SessionOptions,
) -> Result<(), MatrixError> {
    let result = chat_loop(input, client, model_id, transcript, options).await;
    input.flush();
    result
}

async fn chat_loop(
    input: &mut impl LineSource,
    client: &ChatClient,
    model_id: &str,
    transcript: &mut Transcript,
    options: SessionOptions,
) -> Result<(), MatrixError> {
    loop {
        let line = match classify_readline(input.read_line(USER_LABEL))? {
            Turn::Line(line) => line,
            Turn::End => return Ok(()),
        };
        let line = line.trim();
        input.remember(line);
        transcript.push_user(line);

        let reply = if options.stream {
            let mut stream = client
                .complete_streaming(model_id, transcript.messages(), TEMPERATURE)
                .await?;
            // Streaming always renders incrementally as plain text.
            print!("{ASSISTANT_LABEL}");
            io::stdout().flush()?;
            let reply = stream
                .collect_with(|chunk| {
                    print!("{chunk}");
                    io::stdout().flush()?;
                    Ok(())
                })
                .await?;
            println!();
            reply
        } else {
            let reply = client
                .complete(model_id, transcript.messages(), TEMPERATURE)
                .await?;
            if options.raw {
                println!("{ASSISTANT_LABEL}{reply}");
            } else {
                println!("{ASSISTANT_LABEL}");
                println!("{}", render_markdown(&reply));
            }
            reply
        };

        transcript.push_assistant(&reply);
    }
}
