use anyhow::{Context, Result};
use argh::FromArgs;
use command_grammar::{
    Command, CommandLine, Console, ConsoleConfig, Definition, OptionSpec, ParameterSpec, builtin,
};
use std::io::Write;
use std::process::ExitCode;
use signal_hook::consts::SIGTERM;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How often the main thread checks whether the console should exit.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

#[derive(FromArgs)]
/// Interactive demo console for the command grammar engine.
struct Args {
    /// log filter used when RUST_LOG is unset (default: warn).
    #[argh(option, default = "String::from(\"warn\")")]
    log_level: String,

    /// prompt shown before each line.
    #[argh(option, default = "String::from(\"> \")")]
    prompt: String,

    /// do not echo each issued line.
    #[argh(switch)]
    no_echo: bool,

    /// run a single line and exit instead of starting the console.
    #[argh(option)]
    exec: Option<String>,
}

#[derive(Default)]
/// Greet someone a number of times.
struct Greet {
    name: String,
    times: i32,
}

impl Command for Greet {
    fn describe() -> Definition<Self> {
        Definition::new()
            .description("Greet someone a number of times.")
            .option(
                OptionSpec::new("name", "n")
                    .default(["world"])
                    .named()
                    .description("who to greet"),
                |greet: &mut Greet, name: String| greet.name = name,
            )
            .parameter(
                ParameterSpec::new("times", 0).description("how many greetings to print"),
                |greet: &mut Greet, times: i32| greet.times = times,
            )
    }

    fn execute(self, out: &mut dyn Write, _: &CommandLine) -> Result<()> {
        for _ in 0..self.times {
            writeln!(out, "Hello, {}!", self.name)?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Db;

impl Command for Db {
    fn describe() -> Definition<Self> {
        Definition::new()
            .description("Database maintenance. Run a subcommand.")
            .subcommand::<Migrate>("migrate")
            .subcommand::<Rollback>("rollback")
    }

    fn execute(self, out: &mut dyn Write, command_line: &CommandLine) -> Result<()> {
        write!(out, "{}", command_line.render_help("db")?)?;
        Ok(())
    }
}

#[derive(Default)]
struct Migrate {
    dry_run: bool,
    target: String,
}

impl Command for Migrate {
    fn describe() -> Definition<Self> {
        Definition::new()
            .description("Migrate the schema to a target version.")
            .option(
                OptionSpec::flag("dry-run", "d").description("only print the plan"),
                |migrate: &mut Migrate, dry_run: bool| migrate.dry_run = dry_run,
            )
            .parameter(
                ParameterSpec::new("target", 0).description("version to migrate to"),
                |migrate: &mut Migrate, target: String| migrate.target = target,
            )
    }

    fn execute(self, out: &mut dyn Write, _: &CommandLine) -> Result<()> {
        let verb = if self.dry_run { "would migrate" } else { "migrating" };
        writeln!(out, "{verb} to {}", self.target)?;
        Ok(())
    }
}

#[derive(Default)]
struct Rollback {
    steps: i32,
}

impl Command for Rollback {
    fn describe() -> Definition<Self> {
        Definition::new()
            .description("Undo the most recent migrations.")
            .option(
                OptionSpec::new("steps", "s")
                    .default(["1"])
                    .description("how many migrations to undo"),
                |rollback: &mut Rollback, steps: i32| rollback.steps = steps,
            )
    }

    fn execute(self, out: &mut dyn Write, _: &CommandLine) -> Result<()> {
        writeln!(out, "rolling back {} migration(s)", self.steps)?;
        Ok(())
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn build_command_line() -> Result<CommandLine> {
    let mut command_line = CommandLine::new();
    builtin::install(&mut command_line)?;
    command_line
        .add_command::<Greet>("greet")?
        .add_command::<Db>("db")?;
    Ok(command_line)
}

fn main() -> Result<ExitCode> {
    let args: Args = argh::from_env();
    init_tracing(&args.log_level);

    let command_line = build_command_line().context("invalid command definitions")?;

    if let Some(line) = args.exec {
        let mut stdout = std::io::stdout();
        return Ok(match command_line.execute_line(&line, &mut stdout) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        });
    }

    let config = ConsoleConfig::default()
        .prompt(args.prompt)
        .echo(!args.no_echo);
    let console = Console::new(Arc::new(command_line), config);
    let shutdown = console.shutdown_flag();
    // A second SIGTERM exits immediately.
    signal_hook::flag::register_conditional_shutdown(SIGTERM, 1, Arc::clone(&shutdown))
        .context("failed to register SIGTERM handler")?;
    signal_hook::flag::register(SIGTERM, shutdown)
        .context("failed to register SIGTERM handler")?;

    console.start().context("failed to start console")?;
    if console.wait(SHUTDOWN_POLL) {
        info!("terminated, leaving the console");
    }
    Ok(ExitCode::SUCCESS)
}
