//! Interpreter nodes: the built, reusable form of a [`Definition`].

use crate::command::{Command, ExecutableCommand};
use crate::command_line::CommandLine;
use crate::converter::{Converted, ConverterRegistry, ErasedConverter, TokenStream};
use crate::definition::{Binding, Definition, OptionSpec, ParameterSpec};
use crate::error::{ConfigurationError, InterpretError};
use crate::help;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use tracing::{debug, error};

/// Resolves the tokens that follow one keyword.
///
/// Nodes are immutable once built and may be shared between threads.
pub trait Interpreter: Send + Sync {
    fn keyword(&self) -> &str;

    fn description(&self) -> Option<&str>;

    /// Bind `tokens` into a fresh command, or hand them to a matching subcommand.
    fn interpret(&self, tokens: &mut TokenStream)
    -> Result<Box<dyn ExecutableCommand>, InterpretError>;

    /// Usage text, rendered on first request and cached afterwards.
    fn help(&self) -> &str;

    /// The command line holding this node's subcommands, if it has any.
    fn subcommands(&self) -> Option<&CommandLine>;
}

struct BoundOption<C> {
    spec: OptionSpec,
    binding: Binding<C>,
    converter: ErasedConverter,
}

struct BoundParameter<C> {
    spec: ParameterSpec,
    binding: Binding<C>,
    converter: ErasedConverter,
}

/// The interpreter for command type `C`.
pub struct InterpreterNode<C> {
    keyword: String,
    description: Option<String>,
    options: Vec<BoundOption<C>>,
    /// Option key (alias, or `-name`) to index in `options`.
    aliases: HashMap<String, usize>,
    parameters: BTreeMap<u32, BoundParameter<C>>,
    subcommands: Option<CommandLine>,
    help: OnceLock<String>,
}

impl<C: Command> InterpreterNode<C> {
    /// Validate `definition` against `converters` and build the node.
    pub fn new(
        keyword: impl Into<String>,
        definition: Definition<C>,
        converters: &ConverterRegistry,
    ) -> Result<Self, ConfigurationError> {
        let keyword = keyword.into();
        let Definition {
            description,
            options: option_specs,
            parameters: parameter_specs,
            subcommands: subcommand_specs,
        } = definition;

        let mut parameters: BTreeMap<u32, BoundParameter<C>> = BTreeMap::new();
        for (spec, binding) in parameter_specs {
            if let Some(other) = parameters.get(&spec.arity) {
                return Err(ConfigurationError::ArityCollision {
                    command: keyword,
                    arity: spec.arity,
                    first: other.spec.name.clone(),
                    second: spec.name,
                });
            }
            let converter = resolve_converter(&keyword, &spec.name, &binding, converters)?;
            parameters.insert(
                spec.arity,
                BoundParameter {
                    spec,
                    binding,
                    converter,
                },
            );
        }

        let mut options = Vec::with_capacity(option_specs.len());
        let mut aliases = HashMap::new();
        for (spec, binding) in option_specs {
            let index = options.len();
            if spec.named {
                insert_alias(&mut aliases, &keyword, spec.named_key(), index)?;
            }
            insert_alias(&mut aliases, &keyword, spec.alias.clone(), index)?;
            let converter = resolve_converter(&keyword, &spec.name, &binding, converters)?;
            options.push(BoundOption {
                spec,
                binding,
                converter,
            });
        }

        let mut subcommands: Option<CommandLine> = None;
        for sub in subcommand_specs {
            let line = subcommands
                .get_or_insert_with(|| CommandLine::with_converters(converters.clone()));
            let node = (sub.build)(sub.keyword.clone(), converters)?;
            line.insert_interpreter(sub.keyword, node)?;
        }

        debug!(
            command = %keyword,
            options = options.len(),
            parameters = parameters.len(),
            subcommands = subcommands.as_ref().map_or(0, |line| line.len()),
            "built interpreter"
        );

        Ok(Self {
            keyword,
            description,
            options,
            aliases,
            parameters,
            subcommands,
            help: OnceLock::new(),
        })
    }

    /// Store a converted value, or report the slot that refused it.
    fn assign(
        &self,
        command: &mut C,
        binding: &Binding<C>,
        slot: &str,
        value: Converted,
    ) -> Result<(), InterpretError> {
        binding.assign(command, value).map_err(|_| {
            error!(
                command = %self.keyword,
                slot,
                expected = binding.type_name,
                "slot rejected converted value"
            );
            InterpretError::Binding {
                command: self.keyword.clone(),
                slot: slot.to_string(),
            }
        })
    }

    fn convert(
        &self,
        converter: &ErasedConverter,
        slot: &str,
        tokens: &mut TokenStream,
    ) -> Result<Converted, InterpretError> {
        converter(tokens).map_err(|source| InterpretError::InvalidValue {
            command: self.keyword.clone(),
            slot: slot.to_string(),
            source,
        })
    }

    fn bind(&self, tokens: &mut TokenStream) -> Result<C, InterpretError> {
        let mut command = C::default();
        let mut assigned = vec![false; self.options.len()];

        // A repeated option simply overwrites the earlier value.
        while let Some(alias) = tokens.next_dashed() {
            let Some(&index) = self.aliases.get(&alias) else {
                return Err(InterpretError::UnknownOption {
                    command: self.keyword.clone(),
                    alias,
                });
            };
            let option = &self.options[index];
            let value: Converted = if option.binding.is_flag() {
                Box::new(true)
            } else {
                self.convert(&option.converter, &option.spec.name, tokens)?
            };
            self.assign(&mut command, &option.binding, &option.spec.name, value)?;
            assigned[index] = true;
        }

        for parameter in self.parameters.values() {
            if tokens.is_empty() {
                return Err(InterpretError::IncompleteParameters {
                    command: self.keyword.clone(),
                    parameter: parameter.spec.name.clone(),
                });
            }
            let value = self.convert(&parameter.converter, &parameter.spec.name, tokens)?;
            self.assign(&mut command, &parameter.binding, &parameter.spec.name, value)?;
        }

        if !tokens.is_empty() {
            debug!(
                command = %self.keyword,
                ignored = ?tokens.clone().take_rest(),
                "ignoring trailing tokens"
            );
        }

        for (option, _) in self
            .options
            .iter()
            .zip(&assigned)
            .filter(|(_, assigned)| !**assigned)
        {
            if option.spec.is_required() {
                return Err(InterpretError::MissingOption {
                    command: self.keyword.clone(),
                    option: option.spec.name.clone(),
                });
            }
            let mut defaults = TokenStream::new(option.spec.defaults.iter().cloned());
            let value = self.convert(&option.converter, &option.spec.name, &mut defaults)?;
            self.assign(&mut command, &option.binding, &option.spec.name, value)?;
        }

        Ok(command)
    }

    fn render_help(&self) -> String {
        let mut options: Vec<&OptionSpec> = self.options.iter().map(|o| &o.spec).collect();
        options.sort_by(|a, b| a.alias.cmp(&b.alias));
        let parameters: Vec<&ParameterSpec> = self.parameters.values().map(|p| &p.spec).collect();
        let subcommands: Vec<(&str, Option<&str>)> = self
            .subcommands
            .as_ref()
            .map(|line| {
                line.keywords()
                    .into_iter()
                    .filter_map(|keyword| line.interpreter(keyword))
                    .map(|node| (node.keyword(), node.description()))
                    .collect()
            })
            .unwrap_or_default();

        help::render(help::HelpInput {
            keyword: &self.keyword,
            description: self.description.as_deref(),
            options: &options,
            parameters: &parameters,
            subcommands: &subcommands,
        })
    }
}

impl<C: Command> Interpreter for InterpreterNode<C> {
    fn keyword(&self) -> &str {
        &self.keyword
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn interpret(
        &self,
        tokens: &mut TokenStream,
    ) -> Result<Box<dyn ExecutableCommand>, InterpretError> {
        if let Some(line) = &self.subcommands {
            if let Some(child) = tokens.peek().and_then(|token| line.interpreter(token)) {
                debug!(command = %self.keyword, subcommand = %child.keyword(), "delegating");
                tokens.next();
                return child.interpret(tokens);
            }
        }
        Ok(Box::new(self.bind(tokens)?))
    }

    fn help(&self) -> &str {
        self.help.get_or_init(|| self.render_help())
    }

    fn subcommands(&self) -> Option<&CommandLine> {
        self.subcommands.as_ref()
    }
}

fn insert_alias(
    aliases: &mut HashMap<String, usize>,
    command: &str,
    alias: String,
    index: usize,
) -> Result<(), ConfigurationError> {
    if aliases.contains_key(&alias) {
        return Err(ConfigurationError::AliasCollision {
            command: command.to_string(),
            alias,
        });
    }
    aliases.insert(alias, index);
    Ok(())
}

fn resolve_converter<C>(
    command: &str,
    slot: &str,
    binding: &Binding<C>,
    converters: &ConverterRegistry,
) -> Result<ErasedConverter, ConfigurationError> {
    converters
        .lookup(binding.type_id)
        .ok_or_else(|| ConfigurationError::MissingConverter {
            command: command.to_string(),
            slot: slot.to_string(),
            type_name: binding.type_name,
        })
}
