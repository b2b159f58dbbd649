use crate::command_line::CommandLine;
use crate::definition::Definition;
use anyhow::Result;
use std::any::Any;
use std::io::Write;

/// A command type the engine can bind tokens into.
///
/// Each invocation starts from `Self::default()` and is filled in through the
/// setters declared by [`Command::describe`]. The interpreter for a type is
/// built once, so `describe` runs once per keyword, not once per line.
pub trait Command: Default + Send + 'static {
    /// The options, parameters and subcommands of this command.
    fn describe() -> Definition<Self>;

    /// Runs the bound command.
    ///
    /// `command_line` is the line that resolved the invocation, e.g. for
    /// rendering help. Output goes to `out`.
    fn execute(self, out: &mut dyn Write, command_line: &CommandLine) -> Result<()>;
}

/// Object-safe view of a bound command, as returned by
/// [`CommandLine::resolve`].
///
/// Every [`Command`] implements it via a blanket impl.
pub trait ExecutableCommand: Send {
    fn execute(self: Box<Self>, out: &mut dyn Write, command_line: &CommandLine) -> Result<()>;

    /// The concrete command, for inspecting what was bound.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Command> ExecutableCommand for T {
    fn execute(self: Box<Self>, out: &mut dyn Write, command_line: &CommandLine) -> Result<()> {
        Command::execute(*self, out, command_line)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
