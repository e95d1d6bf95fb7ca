//! Error types for command resolution, flag parsing, and dispatch.
//!
//! Provides a unified error type covering all failure modes an invocation
//! can surface: malformed flags, unknown or ambiguous commands, a missing
//! command where one is required, curated aborts from actions, cooperative
//! interruption, and arbitrary errors bubbling out of command bodies.

use thiserror::Error;

/// Errors surfaced while resolving commands and parsing flags.
#[derive(Debug, Error)]
pub enum Error {
    /// A flag token was malformed, unknown, or carried an invalid value.
    ///
    /// The message is human-readable and already names the offending flag.
    #[error("{0}")]
    Flag(String),

    /// A positional token failed to resolve to a command.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// A command was required but the argument list was exhausted.
    ///
    /// Distinguished sentinel: the default error handler shows usage for
    /// this condition without the usual `<program>: <error>` line.
    #[error("command required")]
    CommandRequired,

    /// An action chose to terminate with a curated message.
    ///
    /// Bypasses usage display; the optional hint is printed on its own line.
    #[error("{message}")]
    Abort {
        /// Human-readable reason for the abort.
        message: String,
        /// Optional one-line hint printed after the message.
        hint: Option<String>,
    },

    /// Cooperative cancellation was observed at a checkpoint.
    #[error("interrupted")]
    Interrupted,

    /// A domain-specific failure from a command body.
    #[error(transparent)]
    Action(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps an arbitrary error from a command body.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdtree_core::Error;
    ///
    /// let err = Error::action("invalid arguments");
    /// assert_eq!(err.to_string(), "invalid arguments");
    /// ```
    pub fn action<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Action(err.into())
    }

    /// Creates an abort with a curated message and no hint.
    pub fn abort(message: impl Into<String>) -> Self {
        Self::Abort {
            message: message.into(),
            hint: None,
        }
    }

    /// Creates an abort with a curated message and a hint line.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdtree_core::Error;
    ///
    /// let err = Error::abort_with_hint("no repository found", "run 'tool init' first");
    /// assert_eq!(err.to_string(), "no repository found");
    /// ```
    pub fn abort_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Abort {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }
}

/// A positional token failed to resolve against a sibling command set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The token matched no sibling alias, exactly or by prefix.
    #[error("unknown command '{name}'")]
    Unknown {
        /// The token that failed to resolve.
        name: String,
    },

    /// The token was a prefix of two or more sibling aliases and an exact
    /// alias of none.
    #[error("command '{name}' is ambiguous ({})", .candidates.join(", "))]
    Ambiguous {
        /// The token that failed to resolve.
        name: String,
        /// Every alias the token prefixes, sorted.
        candidates: Vec<String>,
    },
}

impl CommandError {
    /// The token that failed to resolve.
    pub fn name(&self) -> &str {
        match self {
            Self::Unknown { name } | Self::Ambiguous { name, .. } => name,
        }
    }
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
