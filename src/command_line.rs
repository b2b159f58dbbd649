use crate::command::{Command, ExecutableCommand};
use crate::converter::{ArgumentConverter, ConverterRegistry, TokenStream};
use crate::definition::Definition;
use crate::error::{ConfigurationError, Error, InterpretError};
use crate::interpreter::{Interpreter, InterpreterNode};
use crate::lexer;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use tracing::debug;

/// A set of keyword-selected commands plus the converters their slots use.
///
/// Build one at startup, register every command, then share it (it is
/// `Send + Sync`) with whatever feeds it input.
///
/// Example
/// ```
/// use command_grammar::{Command, CommandLine, Definition, ParameterSpec};
/// use std::io::Write;
///
/// #[derive(Default)]
/// struct Square {
///     n: i32,
/// }
///
/// impl Command for Square {
///     fn describe() -> Definition<Self> {
///         Definition::new().parameter(ParameterSpec::new("n", 0), |s: &mut Square, n: i32| s.n = n)
///     }
///
///     fn execute(self, out: &mut dyn Write, _: &CommandLine) -> anyhow::Result<()> {
///         writeln!(out, "{}", self.n * self.n)?;
///         Ok(())
///     }
/// }
///
/// let mut cli = CommandLine::new();
/// cli.add_command::<Square>("square").unwrap();
///
/// let mut out = Vec::new();
/// cli.execute_to(["square", "7"], &mut out).unwrap();
/// assert_eq!(out, b"49\n");
/// ```
pub struct CommandLine {
    commands: HashMap<String, Box<dyn Interpreter>>,
    converters: ConverterRegistry,
}

impl CommandLine {
    /// An empty command line with the built-in converters.
    pub fn new() -> Self {
        Self::with_converters(ConverterRegistry::new())
    }

    /// An empty command line resolving values through `converters`.
    pub fn with_converters(converters: ConverterRegistry) -> Self {
        Self {
            commands: HashMap::new(),
            converters,
        }
    }

    /// Register `C` under `keyword`, using [`Command::describe`].
    pub fn add_command<C: Command>(
        &mut self,
        keyword: impl Into<String>,
    ) -> Result<&mut Self, ConfigurationError> {
        self.add_definition(keyword, C::describe())
    }

    /// Register `C` under `keyword` with an explicit definition.
    ///
    /// Fails on a duplicate keyword, or when the definition itself is
    /// inconsistent. Nothing is registered on failure.
    pub fn add_definition<C: Command>(
        &mut self,
        keyword: impl Into<String>,
        definition: Definition<C>,
    ) -> Result<&mut Self, ConfigurationError> {
        let keyword = keyword.into();
        if self.commands.contains_key(&keyword) {
            return Err(ConfigurationError::DuplicateKeyword { keyword });
        }
        let node = InterpreterNode::new(keyword.clone(), definition, &self.converters)?;
        self.insert_interpreter(keyword, Box::new(node))?;
        Ok(self)
    }

    pub(crate) fn insert_interpreter(
        &mut self,
        keyword: String,
        interpreter: Box<dyn Interpreter>,
    ) -> Result<(), ConfigurationError> {
        if self.commands.contains_key(&keyword) {
            return Err(ConfigurationError::DuplicateKeyword { keyword });
        }
        self.commands.insert(keyword, interpreter);
        Ok(())
    }

    /// Register the converter for `T`. Only commands added afterwards see it.
    pub fn add_converter<T, A>(&mut self, converter: A) -> &mut Self
    where
        T: Any + Send,
        A: ArgumentConverter<T> + 'static,
    {
        self.converters.register::<T, A>(converter);
        self
    }

    /// The converters new commands are resolved against.
    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    /// Whether a top-level command is registered under `keyword`.
    pub fn has_command(&self, keyword: &str) -> bool {
        self.commands.contains_key(keyword)
    }

    /// The interpreter registered under `keyword`.
    pub fn interpreter(&self, keyword: &str) -> Option<&dyn Interpreter> {
        self.commands.get(keyword).map(|node| node.as_ref())
    }

    /// Registered keywords, sorted.
    pub fn keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        keywords.sort_unstable();
        keywords
    }

    /// Number of top-level commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Interpret `tokens` without executing the result.
    pub fn resolve<I, S>(&self, tokens: I) -> Result<Box<dyn ExecutableCommand>, InterpretError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens = TokenStream::new(tokens);
        let keyword = tokens.next().ok_or(InterpretError::OutOfTokens)?;
        let node = self
            .interpreter(&keyword)
            .ok_or(InterpretError::UnknownKeyword { keyword })?;
        node.interpret(&mut tokens)
    }

    /// Interpret `tokens` and execute the command, writing to stdout.
    pub fn execute<I, S>(&self, tokens: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execute_to(tokens, &mut std::io::stdout())
    }

    /// Interpret `tokens` and execute the command, writing to `out`.
    pub fn execute_to<I, S>(&self, tokens: I, out: &mut dyn Write) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = self.resolve(tokens)?;
        command.execute(out, self).map_err(Error::Execution)
    }

    /// Tokenize a raw line and execute it. Blank lines do nothing.
    pub fn execute_line(&self, line: &str, out: &mut dyn Write) -> Result<(), Error> {
        let tokens = lexer::split_into_tokens(line)?;
        if tokens.is_empty() {
            return Ok(());
        }
        debug!(?tokens, "executing line");
        self.execute_to(tokens, out)
    }

    /// Usage text of the command registered under `keyword`.
    pub fn render_help(&self, keyword: &str) -> Result<&str, InterpretError> {
        self.render_help_path(&[keyword])
    }

    /// Usage text of a nested command, e.g. `["db", "migrate"]`.
    pub fn render_help_path<S: AsRef<str>>(&self, path: &[S]) -> Result<&str, InterpretError> {
        let (first, rest) = path.split_first().ok_or(InterpretError::OutOfTokens)?;
        let mut node = self.lookup(first.as_ref())?;
        for keyword in rest {
            let keyword = keyword.as_ref();
            node = node
                .subcommands()
                .ok_or_else(|| InterpretError::UnknownKeyword {
                    keyword: keyword.to_string(),
                })?
                .lookup(keyword)?;
        }
        Ok(node.help())
    }

    fn lookup(&self, keyword: &str) -> Result<&dyn Interpreter, InterpretError> {
        self.interpreter(keyword)
            .ok_or_else(|| InterpretError::UnknownKeyword {
                keyword: keyword.to_string(),
            })
    }
}

impl Default for CommandLine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLine")
            .field("keywords", &self.keywords())
            .field("converters", &self.converters)
            .finish()
    }
}
