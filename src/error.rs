//! Error types produced while building and running command lines.
//!
//! Two families matter to callers. [`ConfigurationError`] means a command
//! definition is broken and startup should abort. [`InterpretError`] means a
//! single input line could not be bound to a command; report it and move on.

use thiserror::Error;

/// Construction-time failures: a programming mistake in the command definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The keyword is already registered in this command line.
    #[error("keyword '{keyword}' is already in use")]
    DuplicateKeyword { keyword: String },

    /// Two option keys of one command collide.
    #[error("option alias '{alias}' of command '{command}' is already in use")]
    AliasCollision { command: String, alias: String },

    /// Two parameters of one command claim the same position.
    #[error("arity ({arity}) of command '{command}' is claimed by both '{first}' and '{second}'")]
    ArityCollision {
        command: String,
        arity: u32,
        first: String,
        second: String,
    },

    /// A bound slot has a value type with no registered converter.
    #[error("no converter registered for type {type_name} (slot '{slot}' of command '{command}')")]
    MissingConverter {
        command: String,
        slot: String,
        type_name: &'static str,
    },

    /// A direct conversion was requested for a type nobody registered.
    #[error("no converter registered for type {type_name}")]
    UnregisteredType { type_name: &'static str },
}

/// Failures raised by an [`ArgumentConverter`](crate::ArgumentConverter).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The converter needed another token but the stream was exhausted.
    #[error("expected another token")]
    OutOfTokens,

    /// The token could not be turned into the requested type.
    #[error("'{token}' is not a valid {expected}: {reason}")]
    Invalid {
        token: String,
        expected: &'static str,
        reason: String,
    },
}

impl ConversionError {
    /// Shorthand for [`ConversionError::Invalid`].
    pub fn invalid(
        token: impl Into<String>,
        expected: &'static str,
        reason: impl ToString,
    ) -> Self {
        Self::Invalid {
            token: token.into(),
            expected,
            reason: reason.to_string(),
        }
    }
}

/// Per-invocation failures. These never indicate a broken definition, except
/// for [`InterpretError::Binding`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    /// Nothing to execute.
    #[error("out of tokens")]
    OutOfTokens,

    /// The first token names no registered command.
    #[error("command keyword '{keyword}' not found")]
    UnknownKeyword { keyword: String },

    /// A dashed token matches no option key of the command.
    #[error("unknown option '{alias}' for command '{command}'")]
    UnknownOption { command: String, alias: String },

    /// An option without defaults was never supplied.
    #[error("missing required option '{option}' for command '{command}'")]
    MissingOption { command: String, option: String },

    /// The tokens ran out before every parameter was bound.
    #[error("incomplete parameter list for command '{command}': missing '{parameter}'")]
    IncompleteParameters { command: String, parameter: String },

    /// A converter rejected the tokens given for a slot.
    #[error("invalid value for '{slot}' of command '{command}': {source}")]
    InvalidValue {
        command: String,
        slot: String,
        #[source]
        source: ConversionError,
    },

    /// A slot refused the converted value. Only an inconsistent node can cause this.
    #[error("slot '{slot}' of command '{command}' rejected a value of the wrong type")]
    Binding { command: String, slot: String },
}

/// Lexical errors from [`split_into_tokens`](crate::split_into_tokens).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A double quote was opened and never closed.
    #[error("unterminated quote starting at column {column}")]
    UnterminatedQuote { column: usize },
}

/// Everything that can go wrong when a line is turned into a running command.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Interpret(#[from] InterpretError),

    #[error(transparent)]
    Lexing(#[from] LexingError),

    /// The command itself failed while executing.
    #[error("command failed: {0:#}")]
    Execution(anyhow::Error),
}

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = InterpretError::UnknownOption {
            command: "unknown-cmd".into(),
            alias: "z".into(),
        };
        assert_eq!(err.to_string(), "unknown option 'z' for command 'unknown-cmd'");

        let err = ConfigurationError::ArityCollision {
            command: "copy".into(),
            arity: 0,
            first: "from".into(),
            second: "to".into(),
        };
        assert!(err.to_string().contains("'from' and 'to'"));
    }

    #[test]
    fn test_umbrella_error_is_transparent() {
        let err: Error = InterpretError::OutOfTokens.into();
        assert_eq!(err.to_string(), "out of tokens");
        assert!(matches!(err, Error::Interpret(InterpretError::OutOfTokens)));
    }
}
