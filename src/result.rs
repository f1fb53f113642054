use std::fmt;

use tracing::debug;

use crate::{
    tree::{CompleteHandler, ErrorHandler, ExecuteHandler},
    Arguments,
    CommandError,
    CompletionGroup,
    ParseError,
    ParsedLine,
    ResultValue,
};

/// An error collected during a traversal, with the number of words consumed when it occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedError {
    /// What went wrong.
    pub error: ParseError,
    /// Words consumed along the path that produced the error.
    pub weight: usize,
}

/// What an error handler receives.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    /// The highest-weight error that reached a handler.
    pub error: ParseError,
    /// Words consumed before the error.
    pub weight: usize,
    /// The full input line, for display.
    pub input: String,
}

/// What a fallback handler receives: the state reached at the node declaring it.
#[derive(Debug, Clone)]
pub struct FallbackContext {
    /// The line, positioned on the first word no child accepted.
    pub line: ParsedLine,
    /// The values bound on the way to the node.
    pub results: Vec<ResultValue>,
    /// Words consumed on the way to the node.
    pub weight: usize,
}

struct ExecuteCandidate<C> {
    handler: ExecuteHandler<C>,
    arguments: Arguments,
    weight: usize,
}

struct ErrorCandidate<C> {
    handler: ErrorHandler<C>,
    report: ErrorReport,
}

struct CompleteCandidate<C> {
    handler: Option<CompleteHandler<C>>,
    weight: usize,
}

/// The outcome of matching one line against a tree: the best execute, error and complete
/// candidates, every error seen and every completion group offered along any explored path.
///
/// Candidates are only replaced by strictly heavier ones, so among equal weights the first one
/// recorded, which is the first declared, wins.
pub struct ParserTreeResult<C> {
    execute: Option<ExecuteCandidate<C>>,
    error: Option<ErrorCandidate<C>>,
    complete: Option<CompleteCandidate<C>>,
    errors: Vec<WeightedError>,
    completions: Vec<CompletionGroup>,
}

impl<C> ParserTreeResult<C> {
    /// A result without candidates.
    pub fn new() -> Self {
        ParserTreeResult {
            execute: None,
            error: None,
            complete: None,
            errors: Vec::new(),
            completions: Vec::new(),
        }
    }

    /// A result holding one error and no handler, as returned when a command cannot be found.
    pub fn from_error(error: ParseError) -> Self {
        let mut result = Self::new();
        result.errors.push(WeightedError { error, weight: 0 });
        result
    }

    /// Whether [`execute`](ParserTreeResult::execute) has a handler to call.
    pub fn can_execute(&self) -> bool {
        self.execute.is_some() || self.error.is_some()
    }

    /// Calls the execute handler with its bound arguments. Without one, calls the error handler
    /// with the best error. Without either, returns the best error.
    pub fn execute(&self, context: &mut C) -> Result<(), CommandError> {
        if let Some(candidate) = &self.execute {
            debug!(weight = candidate.weight, "executing");
            return (candidate.handler)(context, &candidate.arguments).map_err(CommandError::from);
        }

        if let Some(candidate) = &self.error {
            debug!(weight = candidate.report.weight, error = %candidate.report.error, "reporting error");
            return (candidate.handler)(context, &candidate.report).map_err(CommandError::from);
        }

        match self.best_error() {
            Some(best) => Err(CommandError::Parse(best.error.clone())),
            None => Err(CommandError::NotExecutable),
        }
    }

    /// Passes every collected completion group through the complete handler, if a complete
    /// candidate was recorded.
    pub fn complete(&self, context: &C) -> Vec<CompletionGroup> {
        match &self.complete {
            Some(CompleteCandidate {
                handler: Some(handler),
                ..
            }) => handler(context, self.completions.clone()),
            Some(_) => self.completions.clone(),
            None => Vec::new(),
        }
    }

    /// Every completion group offered along any explored path.
    pub fn completions(&self) -> &[CompletionGroup] {
        &self.completions
    }

    /// Every error seen, in the order it was found.
    pub fn errors(&self) -> &[WeightedError] {
        &self.errors
    }

    /// The heaviest error, the first one on ties.
    pub fn best_error(&self) -> Option<&WeightedError> {
        self.errors.iter().fold(None, |best: Option<&WeightedError>, error| match best {
            Some(best) if best.weight >= error.weight => Some(best),
            _ => Some(error),
        })
    }

    /// The arguments the execute handler would receive.
    pub fn arguments(&self) -> Option<&Arguments> {
        self.execute.as_ref().map(|candidate| &candidate.arguments)
    }

    /// The weight of the execute candidate.
    pub fn execute_weight(&self) -> Option<usize> {
        self.execute.as_ref().map(|candidate| candidate.weight)
    }

    /// The report the error handler would receive.
    pub fn error_report(&self) -> Option<&ErrorReport> {
        self.error.as_ref().map(|candidate| &candidate.report)
    }

    /// The weight of the complete candidate.
    pub fn complete_weight(&self) -> Option<usize> {
        self.complete.as_ref().map(|candidate| candidate.weight)
    }

    pub(crate) fn record_execute(
        &mut self,
        handler: &ExecuteHandler<C>,
        results: &[ResultValue],
        weight: usize,
    )
    {
        if self.execute.as_ref().map_or(true, |best| weight > best.weight) {
            debug!(weight, "execute candidate");
            self.execute = Some(ExecuteCandidate {
                handler: handler.clone(),
                arguments: Arguments::new(results),
                weight,
            });
        }
    }

    pub(crate) fn record_error(
        &mut self,
        error: ParseError,
        weight: usize,
        handler: Option<&ErrorHandler<C>>,
        line: &ParsedLine,
    )
    {
        if let Some(handler) = handler {
            if self.error.as_ref().map_or(true, |best| weight > best.report.weight) {
                debug!(weight, %error, "error candidate");
                self.error = Some(ErrorCandidate {
                    handler: handler.clone(),
                    report: ErrorReport {
                        error: error.clone(),
                        weight,
                        input: line.full_line(),
                    },
                });
            }
        }
        self.errors.push(WeightedError { error, weight });
    }

    pub(crate) fn record_complete(&mut self, handler: Option<&CompleteHandler<C>>, weight: usize) {
        if self.complete.as_ref().map_or(true, |best| weight > best.weight) {
            self.complete = Some(CompleteCandidate {
                handler: handler.cloned(),
                weight,
            });
        }
    }

    pub(crate) fn add_completions(&mut self, groups: Vec<CompletionGroup>) {
        self.completions.extend(groups);
    }

    /// Folds `other` into this result. Candidates are replaced only by strictly heavier ones;
    /// errors and completion groups are appended.
    pub fn merge(&mut self, other: ParserTreeResult<C>) {
        if let Some(candidate) = other.execute {
            if self.execute.as_ref().map_or(true, |best| candidate.weight > best.weight) {
                self.execute = Some(candidate);
            }
        }
        if let Some(candidate) = other.error {
            if self
                .error
                .as_ref()
                .map_or(true, |best| candidate.report.weight > best.report.weight)
            {
                self.error = Some(candidate);
            }
        }
        if let Some(candidate) = other.complete {
            if self.complete.as_ref().map_or(true, |best| candidate.weight > best.weight) {
                self.complete = Some(candidate);
            }
        }
        self.errors.extend(other.errors);
        self.completions.extend(other.completions);
    }

    /// Adds `weight` to every candidate and error, for results computed from a later position in
    /// the line.
    pub fn offset(mut self, weight: usize) -> Self {
        if let Some(candidate) = self.execute.as_mut() {
            candidate.weight += weight;
        }
        if let Some(candidate) = self.error.as_mut() {
            candidate.report.weight += weight;
        }
        if let Some(candidate) = self.complete.as_mut() {
            candidate.weight += weight;
        }
        for error in &mut self.errors {
            error.weight += weight;
        }
        self
    }
}

impl<C> Default for ParserTreeResult<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for ParserTreeResult<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserTreeResult")
            .field("execute_weight", &self.execute_weight())
            .field("arguments", &self.arguments())
            .field("error", &self.error_report())
            .field("complete_weight", &self.complete_weight())
            .field("errors", &self.errors)
            .field("completions", &self.completions)
            .finish()
    }
}
