use std::error::Error;
use std::fmt;
use std::io;

/// Crate-wide error taxonomy.
///
/// `Validation` and `NotFound` are raised by the config layer before any
/// network traffic happens; `Transport` covers everything the remote
/// completion endpoint can do wrong and ends the running session. The
/// remaining variants wrap ambient failures from the filesystem, the
/// config file codec, and the platform credential store.
#[derive(Debug)]
pub enum MatrixError {
    Validation(String),
    NotFound { kind: &'static str, id: String },
    Transport(String),
    Config(String),
    Io(io::Error),
    Keyring(keyring::Error),
}

impl MatrixError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        MatrixError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Process exit code reported at the CLI boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            MatrixError::NotFound { .. } => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixError::Validation(msg) => write!(f, "{msg}"),
            MatrixError::NotFound { kind, id } => write!(f, "{kind} '{id}' not found"),
            MatrixError::Transport(msg) => write!(f, "{msg}"),
            MatrixError::Config(msg) => write!(f, "{msg}"),
            MatrixError::Io(err) => write!(f, "{err}"),
            MatrixError::Keyring(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MatrixError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MatrixError::Io(err) => Some(err),
            MatrixError::Keyring(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MatrixError {
    fn from(err: io::Error) -> Self {
        MatrixError::Io(err)
    }
}

impl From<keyring::Error> for MatrixError {
    fn from(err: keyring::Error) -> Self {
        MatrixError::Keyring(err)
    }
}

impl From<reqwest::Error> for MatrixError {
    fn from(err: reqwest::Error) -> Self {
        MatrixError::Transport(err.to_string())
    }
}

impl From<toml::de::Error> for MatrixError {
    fn from(err: toml::de::Error) -> Self {
        MatrixError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MatrixError {
    fn from(err: toml::ser::Error) -> Self {
        MatrixError::Config(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for MatrixError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        match err {
            rustyline::error::ReadlineError::Io(err) => MatrixError::Io(err),
            other => MatrixError::Io(io::Error::other(other.to_string())),
        }
    }
}
