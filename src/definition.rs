//! Declarative command schemas.
//!
//! A [`Definition`] lists a command's options, positional parameters and
//! subcommands. Every option or parameter is paired with a setter that stores
//! the converted value into the command struct, so no reflection is needed:
//!
//! ```
//! use command_grammar::{Definition, OptionSpec, ParameterSpec};
//!
//! #[derive(Default)]
//! struct Greet {
//!     name: String,
//!     times: i32,
//! }
//!
//! let definition = Definition::<Greet>::new()
//!     .description("Say hello")
//!     .option(
//!         OptionSpec::new("name", "n").default(["world"]),
//!         |greet: &mut Greet, name: String| greet.name = name,
//!     )
//!     .parameter(ParameterSpec::new("times", 0), |greet: &mut Greet, times: i32| {
//!         greet.times = times
//!     });
//! assert_eq!(definition.options().count(), 1);
//! ```

use crate::command::Command;
use crate::converter::{Converted, ConverterRegistry};
use crate::error::ConfigurationError;
use crate::interpreter::{Interpreter, InterpreterNode};
use std::any::{Any, TypeId, type_name};
use std::fmt;

/// An option, written `-alias value` (or `--name value` when named).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    /// Long name, shown in errors and accepted as `--name` when named.
    pub name: String,
    /// Short form, written after a single dash.
    pub alias: String,
    /// Tokens converted when the option is absent. Empty means the option is required.
    pub defaults: Vec<String>,
    /// Help text.
    pub description: String,
    /// Also accept `--name`.
    pub named: bool,
}

impl OptionSpec {
    /// A required option with no description.
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            defaults: Vec::new(),
            description: String::new(),
            named: false,
        }
    }

    /// A boolean switch that is `false` unless given.
    pub fn flag(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(name, alias).default(["false"])
    }

    /// Tokens to convert when the option is not given.
    pub fn default<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Help text for this option.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Also accept the option as `--name`.
    pub fn named(mut self) -> Self {
        self.named = true;
        self
    }

    /// An option without defaults must be given.
    pub fn is_required(&self) -> bool {
        self.defaults.is_empty()
    }

    /// Key under which `--name` is looked up once the leading dash is stripped.
    pub(crate) fn named_key(&self) -> String {
        format!("-{}", self.name)
    }
}

/// A positional parameter. `arity` is its position, not a token count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub arity: u32,
    pub description: String,
}

impl ParameterSpec {
    /// The parameter at position `arity`, counting from 0.
    pub fn new(name: impl Into<String>, arity: u32) -> Self {
        Self {
            name: name.into(),
            arity,
            description: String::new(),
        }
    }

    /// Help text for this parameter.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

type Assign<C> = Box<dyn Fn(&mut C, Converted) -> Result<(), Converted> + Send + Sync>;

/// A typed slot in `C`, erased so options of different types share one table.
pub(crate) struct Binding<C> {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    assign: Assign<C>,
}

impl<C> Binding<C> {
    fn new<T, F>(setter: F) -> Self
    where
        C: 'static,
        T: Any + Send,
        F: Fn(&mut C, T) + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            assign: Box::new(move |command: &mut C, value: Converted| {
                let value = value.downcast::<T>()?;
                setter(command, *value);
                Ok(())
            }),
        }
    }

    pub(crate) fn is_flag(&self) -> bool {
        self.type_id == TypeId::of::<bool>()
    }

    /// Store `value`, handing it back if it is not a `T`.
    pub(crate) fn assign(&self, command: &mut C, value: Converted) -> Result<(), Converted> {
        (self.assign)(command, value)
    }
}

pub(crate) type BuildInterpreter =
    fn(String, &ConverterRegistry) -> Result<Box<dyn Interpreter>, ConfigurationError>;

/// A child keyword and how to build its interpreter.
pub(crate) struct SubcommandSpec {
    pub(crate) keyword: String,
    pub(crate) build: BuildInterpreter,
}

/// The full schema of a command type `C`.
pub struct Definition<C> {
    pub(crate) description: Option<String>,
    pub(crate) options: Vec<(OptionSpec, Binding<C>)>,
    pub(crate) parameters: Vec<(ParameterSpec, Binding<C>)>,
    pub(crate) subcommands: Vec<SubcommandSpec>,
}

impl<C: 'static> Definition<C> {
    /// An empty definition with nothing declared.
    pub fn new() -> Self {
        Self {
            description: None,
            options: Vec::new(),
            parameters: Vec::new(),
            subcommands: Vec::new(),
        }
    }

    /// One-line summary shown under the signature in help.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Bind an option to a slot of type `T`. `bool` slots are flags.
    pub fn option<T, F>(mut self, spec: OptionSpec, setter: F) -> Self
    where
        T: Any + Send,
        F: Fn(&mut C, T) + Send + Sync + 'static,
    {
        self.options.push((spec, Binding::new(setter)));
        self
    }

    /// Bind a positional parameter to a slot of type `T`.
    pub fn parameter<T, F>(mut self, spec: ParameterSpec, setter: F) -> Self
    where
        T: Any + Send,
        F: Fn(&mut C, T) + Send + Sync + 'static,
    {
        self.parameters.push((spec, Binding::new(setter)));
        self
    }

    /// Route `keyword` to the command `S`, described by [`Command::describe`].
    pub fn subcommand<S: Command>(mut self, keyword: impl Into<String>) -> Self {
        self.subcommands.push(SubcommandSpec {
            keyword: keyword.into(),
            build: build_interpreter::<S>,
        });
        self
    }

    /// Declared options, in declaration order.
    pub fn options(&self) -> impl Iterator<Item = &OptionSpec> {
        self.options.iter().map(|(spec, _)| spec)
    }

    /// Declared parameters, in declaration order.
    pub fn parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().map(|(spec, _)| spec)
    }

    /// Keywords of the declared subcommands.
    pub fn subcommand_keywords(&self) -> impl Iterator<Item = &str> {
        self.subcommands.iter().map(|sub| sub.keyword.as_str())
    }
}

impl<C: 'static> Default for Definition<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Definition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("description", &self.description)
            .field(
                "options",
                &self.options.iter().map(|(spec, _)| spec).collect::<Vec<_>>(),
            )
            .field(
                "parameters",
                &self.parameters.iter().map(|(spec, _)| spec).collect::<Vec<_>>(),
            )
            .field(
                "subcommands",
                &self
                    .subcommands
                    .iter()
                    .map(|sub| sub.keyword.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn build_interpreter<S: Command>(
    keyword: String,
    converters: &ConverterRegistry,
) -> Result<Box<dyn Interpreter>, ConfigurationError> {
    let node = InterpreterNode::<S>::new(keyword, S::describe(), converters)?;
    Ok(Box::new(node))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sample {
        label: String,
        verbose: bool,
    }

    #[test]
    fn test_option_builder() {
        let spec = OptionSpec::new("label", "l")
            .default(["none"])
            .description("a label")
            .named();
        assert_eq!(spec.defaults, vec!["none".to_string()]);
        assert!(spec.named);
        assert!(!spec.is_required());
        assert_eq!(spec.named_key(), "-label");
        assert!(OptionSpec::new("x", "x").is_required());
        assert_eq!(OptionSpec::flag("v", "v").defaults, vec!["false".to_string()]);
    }

    #[test]
    fn test_binding_assigns_through_setter() {
        let binding = Binding::new(|sample: &mut Sample, label: String| sample.label = label);
        let mut sample = Sample::default();
        assert!(!binding.is_flag());
        assert!(binding.assign(&mut sample, Box::new("tag".to_string())).is_ok());
        assert_eq!(sample.label, "tag");
    }

    #[test]
    fn test_binding_rejects_wrong_type() {
        let binding = Binding::new(|sample: &mut Sample, verbose: bool| sample.verbose = verbose);
        let mut sample = Sample::default();
        assert!(binding.is_flag());
        assert!(binding.assign(&mut sample, Box::new(7_i32)).is_err());
        assert!(!sample.verbose);
    }
}
