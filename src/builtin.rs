//! Commands most consoles want: `help` (also `?`) and `echo`.

use crate::command::Command;
use crate::command_line::CommandLine;
use crate::converter::{Words, WordsConverter};
use crate::definition::{Definition, OptionSpec, ParameterSpec};
use crate::error::ConfigurationError;
use anyhow::Result;
use std::io::Write;

/// Register [`Words`] and the built-in commands under `help`, `?` and `echo`.
pub fn install(command_line: &mut CommandLine) -> Result<(), ConfigurationError> {
    command_line.add_converter::<Words, _>(WordsConverter);
    command_line
        .add_command::<Help>("help")?
        .add_command::<Help>("?")?
        .add_command::<Echo>("echo")?;
    Ok(())
}

/// Print every command's signature, or the full usage of one command.
#[derive(Debug, Default)]
pub struct Help {
    /// Space-separated keyword path, e.g. `db migrate`. Empty lists everything.
    pub topic: String,
}

impl Command for Help {
    fn describe() -> Definition<Self> {
        Definition::new()
            .description("Show usage for a command, or list every command.")
            .option(
                OptionSpec::new("command", "c")
                    .default([""])
                    .named()
                    .description("command to describe; quote a path such as \"db migrate\""),
                |help: &mut Help, topic: String| help.topic = topic,
            )
    }

    fn execute(self, out: &mut dyn Write, command_line: &CommandLine) -> Result<()> {
        let path: Vec<&str> = self.topic.split_whitespace().collect();
        if path.is_empty() {
            writeln!(out, "Commands and usage:")?;
            for keyword in command_line.keywords() {
                let help = command_line.render_help(keyword)?;
                let signature = help.lines().next().unwrap_or(keyword);
                writeln!(out, "  {signature}")?;
            }
            return Ok(());
        }
        write!(out, "{}", command_line.render_help_path(&path)?)?;
        Ok(())
    }
}

/// Write the arguments separated by spaces.
#[derive(Debug, Default)]
pub struct Echo {
    pub no_newline: bool,
    pub words: Words,
}

impl Command for Echo {
    fn describe() -> Definition<Self> {
        Definition::new()
            .description("Write the arguments to the output, separated by spaces.")
            .option(
                OptionSpec::flag("no-newline", "n").description("do not output the trailing newline"),
                |echo: &mut Echo, flag: bool| echo.no_newline = flag,
            )
            .parameter(
                ParameterSpec::new("words", 0).description("values to print as-is"),
                |echo: &mut Echo, words: Words| echo.words = words,
            )
    }

    fn execute(self, out: &mut dyn Write, _command_line: &CommandLine) -> Result<()> {
        write!(out, "{}", self.words.join(" "))?;
        if !self.no_newline {
            writeln!(out)?;
        }
        Ok(())
    }
}
