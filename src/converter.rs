//! Converters turn one or more tokens into a typed value.
//!
//! A [`ConverterRegistry`] maps a value type to the converter responsible for
//! it. Interpreter nodes look their converters up once, when they are built, so
//! a typo in a command definition surfaces at startup instead of on first use.

use crate::error::{ConfigurationError, ConversionError};
use std::any::{Any, TypeId, type_name};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// The tokens left to interpret, front first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    tokens: VecDeque<String>,
}

impl TokenStream {
    /// A stream over `tokens`, in order.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek(&self) -> Option<&str> {
        self.tokens.front().map(String::as_str)
    }

    /// Consume the next token, failing when there is none.
    pub fn next_token(&mut self) -> Result<String, ConversionError> {
        self.tokens.pop_front().ok_or(ConversionError::OutOfTokens)
    }

    /// Consume the next token only if it starts with a dash, returning it
    /// without that first dash.
    pub fn next_dashed(&mut self) -> Option<String> {
        if !self.peek()?.starts_with('-') {
            return None;
        }
        self.tokens.pop_front().map(|token| token[1..].to_string())
    }

    /// Number of tokens not yet consumed.
    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }

    /// Whether every token has been consumed.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Drain everything that is left.
    pub fn take_rest(&mut self) -> Vec<String> {
        self.tokens.drain(..).collect()
    }
}

impl Iterator for TokenStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.tokens.pop_front()
    }
}

/// Converts token(s) from a [`TokenStream`] into a `T`.
///
/// A converter advances the stream by exactly the number of tokens it uses.
/// Any `Fn(&mut TokenStream) -> Result<T, ConversionError>` closure is a converter.
pub trait ArgumentConverter<T>: Send + Sync {
    fn convert(&self, tokens: &mut TokenStream) -> Result<T, ConversionError>;
}

impl<T, F> ArgumentConverter<T> for F
where
    F: Fn(&mut TokenStream) -> Result<T, ConversionError> + Send + Sync,
{
    fn convert(&self, tokens: &mut TokenStream) -> Result<T, ConversionError> {
        self(tokens)
    }
}

/// Passes a single token through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl ArgumentConverter<String> for StringConverter {
    fn convert(&self, tokens: &mut TokenStream) -> Result<String, ConversionError> {
        tokens.next_token()
    }
}

/// Parses a single token as a signed 32-bit integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

impl ArgumentConverter<i32> for IntegerConverter {
    fn convert(&self, tokens: &mut TokenStream) -> Result<i32, ConversionError> {
        let token = tokens.next_token()?;
        token
            .parse()
            .map_err(|err| ConversionError::invalid(token, "integer", err))
    }
}

/// Parses `true` or `false`. Flag options use it for their defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConverter;

impl ArgumentConverter<bool> for BoolConverter {
    fn convert(&self, tokens: &mut TokenStream) -> Result<bool, ConversionError> {
        let token = tokens.next_token()?;
        token
            .parse()
            .map_err(|err| ConversionError::invalid(token, "boolean", err))
    }
}

/// Every token left on the line. Bind it to the last parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Words(pub Vec<String>);

impl Words {
    /// Join the words with `separator`.
    pub fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }
}

/// Consumes the rest of the stream. Needs at least one token.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordsConverter;

impl ArgumentConverter<Words> for WordsConverter {
    fn convert(&self, tokens: &mut TokenStream) -> Result<Words, ConversionError> {
        if tokens.is_empty() {
            return Err(ConversionError::OutOfTokens);
        }
        Ok(Words(tokens.take_rest()))
    }
}

pub(crate) type Converted = Box<dyn Any + Send>;

/// A converter with its output type erased, shared by every node that needs it.
pub(crate) type ErasedConverter =
    Arc<dyn Fn(&mut TokenStream) -> Result<Converted, ConversionError> + Send + Sync>;

/// Maps value types to their converters.
///
/// [`ConverterRegistry::new`] pre-registers `String`, `i32` and `bool`.
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, ErasedConverter>,
}

impl ConverterRegistry {
    /// A registry holding the built-in converters.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register::<String, _>(StringConverter);
        registry.register::<i32, _>(IntegerConverter);
        registry.register::<bool, _>(BoolConverter);
        registry
    }

    /// A registry with no converters at all.
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Associate `T` with `converter`, replacing any previous converter for `T`.
    pub fn register<T, C>(&mut self, converter: C)
    where
        T: Any + Send,
        C: ArgumentConverter<T> + 'static,
    {
        let erased: ErasedConverter = Arc::new(move |tokens: &mut TokenStream| {
            converter
                .convert(tokens)
                .map(|value| Box::new(value) as Converted)
        });
        self.converters.insert(TypeId::of::<T>(), erased);
    }

    /// Whether a converter for `T` is registered.
    pub fn contains<T: Any>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    /// Run the converter registered for `T` over `tokens`.
    ///
    /// Asking for an unregistered type is a configuration mistake, reported as
    /// [`ConfigurationError::UnregisteredType`] inside the outer `Err`.
    pub fn convert<T: Any>(
        &self,
        tokens: &mut TokenStream,
    ) -> Result<Result<T, ConversionError>, ConfigurationError> {
        let converter = self.converters.get(&TypeId::of::<T>()).ok_or(
            ConfigurationError::UnregisteredType {
                type_name: type_name::<T>(),
            },
        )?;
        Ok(converter(tokens).map(|value| match value.downcast::<T>() {
            Ok(value) => *value,
            Err(_) => unreachable!("converters are keyed by their output type"),
        }))
    }

    pub(crate) fn lookup(&self, type_id: TypeId) -> Option<ErasedConverter> {
        self.converters.get(&type_id).cloned()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("types", &self.converters.len())
            .finish()
    }
}
