//! The interactive loop: read a line, run it, repeat.
//!
//! [`run_loop`] is the loop itself and works with any [`LineSource`] and
//! writer. [`Console`] runs that loop on a dedicated worker thread reading
//! from the process's standard input.

use crate::command_line::CommandLine;
use parking_lot::Mutex;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Somewhere lines come from.
pub trait LineSource {
    /// The next line without its terminator, or `None` at end of stream.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Lines from any buffered reader, e.g. piped stdin. The prompt is not shown.
///
/// Bytes that are not valid UTF-8 become U+FFFD, so a garbled line still
/// reaches the command line instead of ending the input.
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    /// Read lines from `reader`.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        let mut bytes = Vec::new();
        if self.reader.read_until(b'\n', &mut bytes)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&bytes);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Lines typed at a terminal, with line editing and optional history.
pub struct EditorSource {
    editor: DefaultEditor,
    history: bool,
}

impl EditorSource {
    /// A fresh editor, recording entered lines when `history` is set.
    pub fn new(history: bool) -> io::Result<Self> {
        let editor = DefaultEditor::new().map_err(readline_to_io)?;
        Ok(Self { editor, history })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if self.history && !line.trim().is_empty() {
                    self.editor
                        .add_history_entry(line.as_str())
                        .map_err(readline_to_io)?;
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => Ok(None),
            Err(err) => Err(readline_to_io(err)),
        }
    }
}

fn readline_to_io(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(err) => err,
        other => io::Error::other(other),
    }
}

/// Pick a line editor when stdin is a terminal, plain buffered reads otherwise.
pub fn detect(config: &ConsoleConfig) -> io::Result<Box<dyn LineSource>> {
    if io::stdin().is_terminal() {
        Ok(Box::new(EditorSource::new(config.history)?))
    } else {
        Ok(Box::new(ReaderSource::new(io::stdin().lock())))
    }
}

/// Settings for the interactive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub prompt: String,
    /// Print `Issued command: <line>` before running each line.
    pub echo: bool,
    /// Keep a line-editor history.
    pub history: bool,
    pub thread_name: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            echo: true,
            history: true,
            thread_name: "console".to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Text shown before each line read from a terminal.
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Whether to print `Issued command: <line>` before running it.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Whether the line editor keeps history.
    pub fn history(mut self, history: bool) -> Self {
        self.history = history;
        self
    }

    /// Name of the worker thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// Feed lines from `source` to `command_line` until the stream ends or
/// `shutdown` is set.
///
/// A failing line is reported to `out` and the loop moves on to the next one.
/// Only I/O errors on `source` or `out` end the loop early.
pub fn run_loop(
    command_line: &CommandLine,
    source: &mut dyn LineSource,
    out: &mut dyn Write,
    config: &ConsoleConfig,
    shutdown: &AtomicBool,
) -> io::Result<()> {
    while !shutdown.load(Ordering::Acquire) {
        let Some(line) = source.read_line(&config.prompt)? else {
            debug!("end of input");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        if config.echo {
            writeln!(out, "Issued command: {line}")?;
        }
        if let Err(err) = command_line.execute_line(&line, out) {
            warn!(%line, error = %err, "command failed");
            writeln!(out, "error: {err}")?;
        }
        out.flush()?;
    }
    Ok(())
}

type SourceFactory = Arc<dyn Fn(&ConsoleConfig) -> io::Result<Box<dyn LineSource>> + Send + Sync>;

/// Runs [`run_loop`] on a worker thread, writing to stdout.
///
/// The worker checks the shutdown flag between lines. A read that is already
/// blocked is not interrupted; it ends with the input or the process.
pub struct Console {
    command_line: Arc<CommandLine>,
    config: ConsoleConfig,
    source: SourceFactory,
    shutdown: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Console {
    /// A console reading from stdin, see [`detect`].
    pub fn new(command_line: Arc<CommandLine>, config: ConsoleConfig) -> Self {
        Self::with_source(command_line, config, detect)
    }

    /// A console whose worker opens its input with `source`. The factory
    /// runs on the worker thread, once per [`Console::start`].
    pub fn with_source<F>(command_line: Arc<CommandLine>, config: ConsoleConfig, source: F) -> Self
    where
        F: Fn(&ConsoleConfig) -> io::Result<Box<dyn LineSource>> + Send + Sync + 'static,
    {
        Self {
            command_line,
            config,
            source: Arc::new(source),
            shutdown: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Start the worker, or restart it if the previous one has finished.
    /// Does nothing while a worker is alive.
    pub fn start(&self) -> io::Result<()> {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }
        if let Some(finished) = worker.take() {
            let _ = finished.join();
        }

        self.shutdown.store(false, Ordering::Release);
        let command_line = Arc::clone(&self.command_line);
        let config = self.config.clone();
        let source = Arc::clone(&self.source);
        let shutdown = Arc::clone(&self.shutdown);

        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || {
                info!("console started");
                let result = source(&config).and_then(|mut source| {
                    run_loop(
                        &command_line,
                        source.as_mut(),
                        &mut io::stdout(),
                        &config,
                        &shutdown,
                    )
                });
                match result {
                    Ok(()) => info!("console stopped"),
                    Err(err) => error!(error = %err, "console input failed"),
                }
            })?;
        *worker = Some(handle);
        Ok(())
    }

    /// Ask the worker to exit before it reads the next line.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Whether the worker is alive and has not been asked to stop.
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
            && self
                .worker
                .lock()
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the worker to finish.
    pub fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("console thread panicked");
            }
        }
    }

    /// Block until the worker finishes or [`Console::stop`] is called,
    /// checking every `poll`. Returns `true` if it was stopped.
    ///
    /// A stopped worker that is still blocked in a read is left behind and
    /// ends with the process.
    pub fn wait(&self, poll: Duration) -> bool {
        while self.is_running() {
            thread::sleep(poll);
        }
        if self.shutdown.load(Ordering::Acquire) {
            debug!("console stopped while waiting");
            return true;
        }
        self.join();
        false
    }

    /// The flag [`Console::stop`] sets. Hand it to a signal handler to stop on
    /// SIGTERM or similar.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// The commands this console runs.
    pub fn command_line(&self) -> &CommandLine {
        &self.command_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::definition::{Definition, ParameterSpec};
    use std::io::Cursor;
    use std::time::Instant;

    #[derive(Default)]
    struct Add {
        a: i32,
        b: i32,
    }

    impl Command for Add {
        fn describe() -> Definition<Self> {
            Definition::new()
                .parameter(ParameterSpec::new("a", 0), |add: &mut Add, a: i32| add.a = a)
                .parameter(ParameterSpec::new("b", 1), |add: &mut Add, b: i32| add.b = b)
        }

        fn execute(self, out: &mut dyn Write, _: &CommandLine) -> anyhow::Result<()> {
            writeln!(out, "{}", self.a + self.b)?;
            Ok(())
        }
    }

    fn command_line() -> CommandLine {
        let mut cli = CommandLine::new();
        cli.add_command::<Add>("add").unwrap();
        cli
    }

    fn run(input: &str, config: &ConsoleConfig) -> String {
        let cli = command_line();
        let mut source = ReaderSource::new(Cursor::new(input.to_string()));
        let mut out = Vec::new();
        run_loop(&cli, &mut source, &mut out, config, &AtomicBool::new(false)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_failures_do_not_stop_the_loop() {
        let config = ConsoleConfig::default().echo(false);
        let out = run("add 1 2\nnope\nadd 1\n\n   \nadd 20 22\n", &config);
        assert_eq!(
            out,
            "3\n\
             error: command keyword 'nope' not found\n\
             error: incomplete parameter list for command 'add': missing 'b'\n\
             42\n"
        );
    }

    #[test]
    fn test_echo_and_missing_final_newline() {
        let out = run("add 2 2\r\nadd 3 3", &ConsoleConfig::default());
        assert_eq!(
            out,
            "Issued command: add 2 2\n4\nIssued command: add 3 3\n6\n"
        );
    }

    #[test]
    fn test_invalid_utf8_line_does_not_end_the_loop() {
        let cli = command_line();
        let mut source = ReaderSource::new(Cursor::new(b"add 1 2\nadd \xff 1\nadd 3 4\n".to_vec()));
        let mut out = Vec::new();
        let config = ConsoleConfig::default().echo(false);
        run_loop(&cli, &mut source, &mut out, &config, &AtomicBool::new(false)).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("3\nerror: invalid value for 'a' of command 'add'"));
        assert!(out.ends_with("\n7\n"));
    }

    #[test]
    fn test_reader_source_replaces_invalid_bytes() {
        let mut source = ReaderSource::new(Cursor::new(b"caf\xe9\r\n".to_vec()));
        assert_eq!(source.read_line("").unwrap().as_deref(), Some("caf\u{fffd}"));
        assert_eq!(source.read_line("").unwrap(), None);
    }

    #[test]
    fn test_shutdown_flag_stops_before_reading() {
        let cli = command_line();
        let mut source = ReaderSource::new(Cursor::new("add 1 1\n".to_string()));
        let mut out = Vec::new();
        let shutdown = AtomicBool::new(true);
        run_loop(&cli, &mut source, &mut out, &ConsoleConfig::default(), &shutdown).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_console_worker_exits_at_end_of_input() {
        let console = Console::with_source(
            Arc::new(command_line()),
            ConsoleConfig::default().echo(false).thread_name("console-test"),
            |_: &ConsoleConfig| -> io::Result<Box<dyn LineSource>> {
                Ok(Box::new(ReaderSource::new(Cursor::new(b"add 1 2\n".to_vec()))))
            },
        );
        assert!(!console.is_running());
        console.start().unwrap();
        console.join();
        assert!(!console.is_running());

        // a finished worker can be started again
        console.start().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while console.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!console.is_running());
        console.join();
    }

    /// Never returns a line, like a terminal nobody types into.
    struct Stalled;

    impl LineSource for Stalled {
        fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
            loop {
                thread::park();
            }
        }
    }

    #[test]
    fn test_wait_returns_on_stop_while_read_is_blocked() {
        let console = Console::with_source(
            Arc::new(command_line()),
            ConsoleConfig::default().thread_name("console-stalled"),
            |_: &ConsoleConfig| -> io::Result<Box<dyn LineSource>> { Ok(Box::new(Stalled)) },
        );
        console.start().unwrap();

        let flag = console.shutdown_flag();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            flag.store(true, Ordering::Release);
        });

        let started = Instant::now();
        assert!(console.wait(Duration::from_millis(5)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!console.is_running());
        stopper.join().unwrap();
    }

    #[test]
    fn test_wait_joins_a_finished_worker() {
        let console = Console::with_source(
            Arc::new(command_line()),
            ConsoleConfig::default().echo(false),
            |_: &ConsoleConfig| -> io::Result<Box<dyn LineSource>> {
                Ok(Box::new(ReaderSource::new(Cursor::new(b"add 1 1\n".to_vec()))))
            },
        );
        console.start().unwrap();
        assert!(!console.wait(Duration::from_millis(5)));
        assert!(!console.is_running());
    }

    #[test]
    fn test_stop_sets_the_shared_flag() {
        let console = Console::with_source(
            Arc::new(command_line()),
            ConsoleConfig::default(),
            |_: &ConsoleConfig| -> io::Result<Box<dyn LineSource>> {
                Ok(Box::new(ReaderSource::new(Cursor::new(Vec::new()))))
            },
        );
        let flag = console.shutdown_flag();
        console.stop();
        assert!(flag.load(Ordering::Acquire));
        assert!(console.command_line().has_command("add"));
    }
}
