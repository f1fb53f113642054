mod number;
mod string;

use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use crate::{
    tokenizer::SpecNode,
    CompletionCandidate,
    CompletionGroup,
    ParseError,
    ParsedLine,
    TreeError,
};

pub use number::{Number, NumberParser, RANGE_SUGGESTION_LIMIT};
pub use string::StringParser;

/// A value bound by a parser.
#[derive(Clone)]
pub enum Value {
    /// Text from literal and string arguments.
    String(String),
    /// `int`, `integer` and `long` arguments.
    Int(i64),
    /// `float` arguments.
    Float(f32),
    /// `double` arguments.
    Double(f64),
    /// Values produced by registered parser kinds.
    Other(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// The text, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// The integer, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(value) => Some(value),
            _ => None,
        }
    }

    /// The number widened to `f64`, for any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(value) => Some(value as f64),
            Value::Float(value) => Some(value as f64),
            Value::Double(value) => Some(value),
            _ => None,
        }
    }

    /// Downcasts a value produced by a registered parser kind.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Other(value) => value.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(value) => f.debug_tuple("String").field(value).finish(),
            Value::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Value::Float(value) => f.debug_tuple("Float").field(value).finish(),
            Value::Double(value) => f.debug_tuple("Double").field(value).finish(),
            Value::Other(_) => f.write_str("Other(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Other(a), Value::Other(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

/// One bound value produced by a successful chain parse. A missing optional argument without a
/// default binds `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultValue {
    /// The parsed value.
    pub value: Option<Value>,
    /// Suppressed values were validated but are not handed to execute handlers.
    pub suppressed: bool,
}

/// The non-suppressed values handed to an execute handler, in argument order.
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments {
    values: Vec<Option<Value>>,
}

impl Arguments {
    pub(crate) fn new(results: &[ResultValue]) -> Self {
        Arguments {
            values: results
                .iter()
                .filter(|result| !result.suppressed)
                .map(|result| result.value.clone())
                .collect(),
        }
    }

    /// The number of bound arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value at `index`, or `None` if out of range or unset.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// The string at `index`.
    pub fn string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(Value::as_str)
    }

    /// The integer at `index`.
    pub fn int(&self, index: usize) -> Option<i64> {
        self.get(index).and_then(Value::as_int)
    }

    /// The float at `index`.
    pub fn float(&self, index: usize) -> Option<f32> {
        match self.get(index) {
            Some(&Value::Float(value)) => Some(value),
            _ => None,
        }
    }

    /// The double at `index`.
    pub fn double(&self, index: usize) -> Option<f64> {
        match self.get(index) {
            Some(&Value::Double(value)) => Some(value),
            _ => None,
        }
    }

    /// Every bound slot, including unset optional ones.
    pub fn iter(&self) -> impl Iterator<Item = Option<&Value>> {
        self.values.iter().map(Option::as_ref)
    }
}

/// Converts the words of a command line into a typed [`Value`]. Any type which implements this
/// trait can be registered as a parser kind in a [`ParserRegistry`].
///
/// Parsers are built once per argument and shared by every traversal, so they must not keep
/// state between calls.
pub trait ValueParser: fmt::Debug + Send + Sync {
    /// Converts a single word. This should only fail if it is impossible to construct a valid
    /// value from the given word.
    fn from_arg(&self, arg: &str) -> Result<Value, ParseError>;

    /// Consumes the words this parser needs from `line`. On failure `line` must be left where it
    /// was. The default takes exactly one word and hands it to
    /// [`from_arg`](ValueParser::from_arg).
    fn parse(&self, line: &mut ParsedLine) -> Result<Value, ParseError> {
        let mut attempt = line.clone();
        let value = self.from_arg(attempt.next()?)?;
        *line = attempt;
        Ok(value)
    }

    /// Suggestions for the current word of `line`. This must not fail: completion is offered even
    /// when earlier words were wrong.
    fn complete(&self, line: &ParsedLine) -> Vec<CompletionGroup>;
}

/// The completion metadata every built-in parser reads from its node.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentInfo {
    /// Identifies the argument in completion candidates: the switch name if any, else the node
    /// name.
    pub key: String,
    /// The `description` parameter.
    pub description: Option<String>,
    /// The `placeholder` parameter.
    pub placeholder: Option<String>,
}

impl ArgumentInfo {
    /// Reads the metadata parameters of `node`.
    pub fn from_node(node: &SpecNode) -> Self {
        let params = &node.parameters;
        ArgumentInfo {
            key: params.get("switch").unwrap_or(&node.name).to_owned(),
            description: params.get("description").map(str::to_owned),
            placeholder: params.get("placeholder").map(str::to_owned),
        }
    }

    /// A hint for free-form arguments. The current word is kept as the value; the title is the
    /// placeholder, `<kind>` if none was given.
    pub fn placeholder_candidate(&self, partial: &str) -> CompletionCandidate {
        let title = self
            .placeholder
            .clone()
            .unwrap_or_else(|| format!("<{}>", self.key.trim_start_matches('@')));
        CompletionCandidate::new(partial, self.key.as_str())
            .with_title(title)
            .with_description(self.description.as_deref())
    }
}

/// Builds a parser for one node.
pub type ParserFactory =
    Arc<dyn Fn(&SpecNode) -> Result<Box<dyn ValueParser>, TreeError> + Send + Sync>;

/// Maps parser kind names to factories. A node named `@kind` is built by the factory registered
/// for `kind`; any other node is a literal.
///
/// Each tree is built against an explicit registry, so independent trees can use different kinds.
#[derive(Clone)]
pub struct ParserRegistry {
    kinds: HashMap<String, ParserFactory>,
}

impl ParserRegistry {
    /// A registry without any kinds, not even literals.
    pub fn empty() -> Self {
        ParserRegistry {
            kinds: HashMap::new(),
        }
    }

    /// Registers `factory` under `kind`, replacing an earlier registration.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&SpecNode) -> Result<Box<dyn ValueParser>, TreeError> + Send + Sync + 'static,
    {
        self.kinds.insert(kind.into(), Arc::new(factory));
        self
    }

    /// Whether `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Builds the parser for `node`.
    pub fn create(&self, node: &SpecNode) -> Result<Box<dyn ValueParser>, TreeError> {
        let kind = node.name.strip_prefix('@').unwrap_or("literal");
        let factory = self
            .kinds
            .get(kind)
            .ok_or_else(|| TreeError::UnknownKind(kind.to_owned()))?;
        factory(node)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        let mut registry = ParserRegistry::empty();
        registry
            .register("literal", |node| Ok(Box::new(StringParser::literal(node))))
            .register("string", |node| Ok(Box::new(StringParser::string(node))))
            .register("int", |node| Ok(Box::new(NumberParser::<i64>::new(node)?)))
            .register("integer", |node| Ok(Box::new(NumberParser::<i64>::new(node)?)))
            .register("long", |node| Ok(Box::new(NumberParser::<i64>::new(node)?)))
            .register("float", |node| Ok(Box::new(NumberParser::<f32>::new(node)?)))
            .register("double", |node| Ok(Box::new(NumberParser::<f64>::new(node)?)));
        registry
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds = self.kinds.keys().collect::<Vec<_>>();
        kinds.sort();
        f.debug_struct("ParserRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn first_node(spec: &str) -> SpecNode {
        tokenize(spec).remove(0)
    }

    #[derive(Debug)]
    struct Upper;

    impl ValueParser for Upper {
        fn from_arg(&self, arg: &str) -> Result<Value, ParseError> {
            Ok(Value::String(arg.to_uppercase()))
        }

        fn complete(&self, _line: &ParsedLine) -> Vec<CompletionGroup> {
            Vec::new()
        }
    }

    #[test]
    fn default_registry_resolves_builtin_kinds() {
        let registry = ParserRegistry::default();
        for kind in ["literal", "string", "int", "integer", "long", "float", "double"] {
            assert!(registry.contains(kind), "missing {kind}");
        }
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let registry = ParserRegistry::default();
        let error = registry.create(&first_node("@player")).unwrap_err();
        assert_eq!(error, TreeError::UnknownKind("player".into()));
    }

    #[test]
    fn registered_kind_is_used() {
        let mut registry = ParserRegistry::default();
        registry.register("upper", |_node| Ok(Box::new(Upper)));
        let parser = registry.create(&first_node("@upper")).unwrap();

        let mut line = ParsedLine::new("abc def");
        assert_eq!(parser.parse(&mut line), Ok(Value::from("ABC")));
        assert_eq!(line.current_word(), "def");
    }

    #[test]
    fn registries_are_independent() {
        let mut first = ParserRegistry::default();
        first.register("upper", |_node| Ok(Box::new(Upper)));
        let second = ParserRegistry::default();
        assert!(first.contains("upper"));
        assert!(!second.contains("upper"));
    }

    #[test]
    fn default_parse_leaves_line_on_failure() {
        let parser = ParserRegistry::default()
            .create(&first_node("@int"))
            .unwrap();
        let mut line = ParsedLine::new("abc");
        assert!(parser.parse(&mut line).is_err());
        assert_eq!(line.word_index(), 0);
    }

    #[test]
    fn arguments_skip_suppressed_values() {
        let results = vec![
            ResultValue {
                value: Some(Value::from("list")),
                suppressed: true,
            },
            ResultValue {
                value: Some(Value::Int(3)),
                suppressed: false,
            },
            ResultValue {
                value: None,
                suppressed: false,
            },
        ];
        let args = Arguments::new(&results);
        assert_eq!(args.len(), 2);
        assert_eq!(args.int(0), Some(3));
        assert_eq!(args.get(1), None);
        assert_eq!(args.string(0), None);
    }

    #[test]
    fn other_values_downcast() {
        let value = Value::Other(Arc::new((1u8, 2u8)));
        assert_eq!(value.downcast_ref::<(u8, u8)>(), Some(&(1, 2)));
        assert_eq!(value.as_str(), None);
    }
}
