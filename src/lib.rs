//! A declarative command-line grammar engine.
//!
//! Commands describe their options, positional parameters and subcommands
//! through a [`Definition`]. A [`CommandLine`] turns each definition into an
//! interpreter once, at registration time, and afterwards resolves token
//! sequences into populated command values and runs them:
//!
//! 1. the first token selects a command by keyword;
//! 2. a following token naming a subcommand hands the rest of the line over to it;
//! 3. dashed tokens are options (`-alias`, or `--name` for named options);
//! 4. the remaining tokens fill parameters in ascending arity order;
//! 5. options that were not given fall back to their default tokens.
//!
//! Token-to-value conversion is pluggable through [`ArgumentConverter`].
//! [`console`] provides an interactive loop on top of the engine, and
//! [`builtin`] a couple of ready-made commands.

pub mod builtin;
mod command;
mod command_line;
pub mod console;
mod converter;
mod definition;
mod error;
mod help;
mod interpreter;
mod lexer;

pub use command::{Command, ExecutableCommand};
pub use command_line::CommandLine;
pub use console::{Console, ConsoleConfig, LineSource};
pub use converter::{
    ArgumentConverter, BoolConverter, ConverterRegistry, IntegerConverter, StringConverter,
    TokenStream, Words, WordsConverter,
};
pub use definition::{Definition, OptionSpec, ParameterSpec};
pub use error::{ConfigurationError, ConversionError, Error, InterpretError, LexingError, Result};
pub use interpreter::{Interpreter, InterpreterNode};
pub use lexer::split_into_tokens;
