/// Why a value parser, chain or tree walk rejected the input.
///
/// These are data: the traversal collects them with a weight and never lets them unwind past the
/// node that produced them.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("expected additional input")]
    EndOfInput,
    #[error("invalid format, expected {expected}")]
    InvalidFormat { expected: String },
    #[error("invalid option \"{input}\", expected one of: {}", .options.join(", "))]
    InvalidOption { input: String, options: Vec<String> },
    #[error("number too big, maximum is {max}")]
    NumberTooBig { max: String },
    #[error("number too small, minimum is {min}")]
    NumberTooSmall { min: String },
    #[error("input expected")]
    InputExpected,
    #[error("unexpected input \"{input}\"")]
    UnexpectedInput { input: String },
    #[error("unknown command \"{name}\"")]
    UnknownCommand { name: String },
    #[error("{0}")]
    Custom(String),
}

/// Failures while building parsers, chains and trees.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("unknown parser kind \"{0}\"")]
    UnknownKind(String),
    #[error("invalid value \"{value}\" for parameter \"{key}\" of \"{node}\"")]
    InvalidParameter {
        node: String,
        key: String,
        value: String,
    },
    #[error("empty parser spec")]
    EmptySpec,
}

/// Returned by [`ParserTreeResult::execute`](crate::ParserTreeResult::execute).
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
    #[error("{0}")]
    Parse(ParseError),
    #[error("no handler accepted the input")]
    NotExecutable,
}
