use lazy_static::lazy_static;
use regex::Regex;
use std::{fmt, num::IntErrorKind};

use crate::{tokenizer::SpecNode, CompletionGroup, ParseError, ParsedLine, TreeError};

use super::{ArgumentInfo, Value, ValueParser};

/// The most suggestions a bounded numeric argument enumerates.
pub const RANGE_SUGGESTION_LIMIT: usize = 20;

// The most values a stepping range scan examines.
const RANGE_SCAN_LIMIT: usize = 1000;

/// A numeric type usable with [`NumberParser`].
pub trait Number: Copy + PartialOrd + fmt::Display + fmt::Debug + Send + Sync + 'static {
    /// The name used in format errors.
    const KIND: &'static str;

    /// Parses a full word, reporting overflow as a range error.
    fn parse_number(arg: &str) -> Result<Self, ParseError>;

    /// Whether `partial_arg` could be the beginning of a number. This should return true for
    /// every truncation of every input [`parse_number`](Number::parse_number) accepts.
    fn partial_matches(partial_arg: &str) -> bool;

    /// Wraps the number in a [`Value`].
    fn into_value(self) -> Value;

    /// The next whole step, used to enumerate bounded ranges.
    fn step(self) -> Option<Self>;

    /// Up to `limit` values of `[min, max]` whose text starts with `partial`, in ascending
    /// order. The default steps up from `min` and gives up after a bounded number of values.
    fn range_matches(min: Self, max: Self, partial: &str, limit: usize) -> Vec<Self> {
        std::iter::successors(Some(min), |n| n.step())
            .take_while(|n| *n <= max)
            .take(RANGE_SCAN_LIMIT)
            .filter(|n| n.to_string().starts_with(partial))
            .take(limit)
            .collect()
    }
}

impl Number for i64 {
    const KIND: &'static str = "integer";

    fn parse_number(arg: &str) -> Result<Self, ParseError> {
        arg.parse::<i64>().map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow => ParseError::NumberTooBig {
                max: i64::MAX.to_string(),
            },
            IntErrorKind::NegOverflow => ParseError::NumberTooSmall {
                min: i64::MIN.to_string(),
            },
            _ => ParseError::InvalidFormat {
                expected: Self::KIND.to_owned(),
            },
        })
    }

    fn partial_matches(partial_arg: &str) -> bool {
        let digits = partial_arg.strip_prefix('-').unwrap_or(partial_arg);
        digits.chars().all(|ch| ch.is_ascii_digit())
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn step(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn range_matches(min: Self, max: Self, partial: &str, limit: usize) -> Vec<Self> {
        let (negative, digits) = match partial.strip_prefix('-') {
            Some(digits) => (true, digits),
            None => (false, partial),
        };
        let (min, max) = (i128::from(min), i128::from(max));

        // Spans of matching values, in ascending order
        let mut spans = Vec::new();
        if digits.is_empty() {
            spans.push(if negative { (min, max.min(-1)) } else { (min, max) });
        } else if digits.starts_with('0') {
            if digits == "0" && !negative {
                spans.push((0, 0));
            }
        } else {
            let prefix = match digits.parse::<i128>() {
                Ok(prefix) => prefix,
                Err(_) => return Vec::new(),
            };

            // Magnitudes [prefix * 10^k, (prefix + 1) * 10^k - 1] for each extra digit count k
            let mut scale: i128 = 1;
            while prefix * scale <= i128::from(i64::MAX) + 1 {
                let (low, high) = (prefix * scale, (prefix + 1) * scale - 1);
                spans.push(if negative { (-high, -low) } else { (low, high) });
                scale *= 10;
            }
            if negative {
                spans.reverse();
            }
        }

        spans
            .into_iter()
            .flat_map(|(low, high)| low.max(min) ..= high.min(max))
            .take(limit)
            .filter_map(|n| i64::try_from(n).ok())
            .collect()
    }
}

macro_rules! impl_number_for_float {
    ($float:ty, $kind:literal, $variant:ident, $suffix:expr, $full_regex:literal, $partial_regex:literal) => {
        impl Number for $float {
            const KIND: &'static str = $kind;

            fn parse_number(arg: &str) -> Result<Self, ParseError> {
                lazy_static! {
                    static ref FULL: Regex = Regex::new($full_regex).unwrap();
                }

                let invalid = || ParseError::InvalidFormat {
                    expected: Self::KIND.to_owned(),
                };
                if !FULL.is_match(arg) {
                    return Err(invalid());
                }

                let trimmed = arg.trim_end_matches(&$suffix[..]);
                let (sign, digits) = match trimmed.strip_prefix('-') {
                    Some(digits) => ("-", digits),
                    None => ("", trimmed),
                };

                // Hanging points are completed so "5." and ".5" read as "5.0" and "0.5"
                let mut normalized = String::from(sign);
                if digits.starts_with('.') {
                    normalized.push('0');
                }
                normalized.push_str(digits);
                if digits.ends_with('.') {
                    normalized.push('0');
                }

                let value = normalized.parse::<$float>().map_err(|_| invalid())?;
                if value.is_infinite() {
                    return Err(if value > 0.0 {
                        ParseError::NumberTooBig {
                            max: <$float>::MAX.to_string(),
                        }
                    } else {
                        ParseError::NumberTooSmall {
                            min: <$float>::MIN.to_string(),
                        }
                    });
                }
                Ok(value)
            }

            fn partial_matches(partial_arg: &str) -> bool {
                lazy_static! {
                    static ref PARTIAL: Regex = Regex::new($partial_regex).unwrap();
                }

                PARTIAL.is_match(partial_arg)
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn step(self) -> Option<Self> {
                let next = self + 1.0;
                if next > self {
                    Some(next)
                } else {
                    None
                }
            }
        }
    };
}

impl_number_for_float!(
    f32,
    "float",
    Float,
    ['f', 'F'],
    r"^-?(\d+\.\d+|\d+\.|\.\d+|\d+)[fF]?$",
    r"^-?(\d+\.?\d*|\.\d*)?[fF]?$"
);
impl_number_for_float!(
    f64,
    "double",
    Double,
    ['d', 'D'],
    r"^-?(\d+\.\d+|\d+\.|\.\d+|\d+)[dD]?$",
    r"^-?(\d+\.?\d*|\.\d*)?[dD]?$"
);

/// Parses integer, float and double arguments, optionally bounded by the `min` and `max`
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberParser<N> {
    min: Option<N>,
    max: Option<N>,
    info: ArgumentInfo,
}

impl<N: Number> NumberParser<N> {
    /// Reads `min` and `max` from `node`.
    pub fn new(node: &SpecNode) -> Result<Self, TreeError> {
        Ok(NumberParser {
            min: bound(node, "min")?,
            max: bound(node, "max")?,
            info: ArgumentInfo::from_node(node),
        })
    }
}

fn bound<N: Number>(node: &SpecNode, key: &str) -> Result<Option<N>, TreeError> {
    match node.parameters.get(key) {
        Some(value) => N::parse_number(value)
            .map(Some)
            .map_err(|_| TreeError::InvalidParameter {
                node: node.name.clone(),
                key: key.to_owned(),
                value: value.to_owned(),
            }),
        None => Ok(None),
    }
}

impl<N: Number> ValueParser for NumberParser<N> {
    fn from_arg(&self, arg: &str) -> Result<Value, ParseError> {
        let value = N::parse_number(arg)?;
        if let Some(min) = self.min {
            if value < min {
                return Err(ParseError::NumberTooSmall {
                    min: min.to_string(),
                });
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(ParseError::NumberTooBig {
                    max: max.to_string(),
                });
            }
        }
        Ok(value.into_value())
    }

    fn complete(&self, line: &ParsedLine) -> Vec<CompletionGroup> {
        let partial = line.current_word();
        if !N::partial_matches(partial) {
            return Vec::new();
        }

        let group: CompletionGroup = match (self.min, self.max) {
            (Some(min), Some(max)) => N::range_matches(min, max, partial, RANGE_SUGGESTION_LIMIT)
                .into_iter()
                .map(|n| {
                    crate::CompletionCandidate::new(n.to_string(), self.info.key.as_str())
                        .with_description(self.info.description.as_deref())
                })
                .collect(),
            _ => std::iter::once(self.info.placeholder_candidate(partial)).collect(),
        };

        if group.is_empty() {
            Vec::new()
        } else {
            vec![group]
        }
    }
}
