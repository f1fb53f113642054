use std::{fmt, sync::Arc};

use tracing::{debug, trace};

use crate::{
    result::FallbackContext,
    tokenizer::tokenize,
    Arguments,
    CompletionGroup,
    ErrorReport,
    ParseError,
    ParsedLine,
    ParserChain,
    ParserRegistry,
    ParserTreeResult,
    ResultValue,
    TreeError,
};

/// Called with the bound arguments when a line fully matches a node.
pub type ExecuteHandler<C> = Arc<dyn Fn(&mut C, &Arguments) -> anyhow::Result<()> + Send + Sync>;

/// Called with the best error when no execute handler matched. Applies to the declaring node and
/// its descendants.
pub type ErrorHandler<C> = Arc<dyn Fn(&mut C, &ErrorReport) -> anyhow::Result<()> + Send + Sync>;

/// Post-processes the completion groups of a traversal. Applies to the declaring node and its
/// descendants.
pub type CompleteHandler<C> =
    Arc<dyn Fn(&C, Vec<CompletionGroup>) -> Vec<CompletionGroup> + Send + Sync>;

/// Takes over when no child of the declaring node accepts the next word.
pub type FallbackHandler<C> =
    Arc<dyn Fn(&C, &FallbackContext) -> ParserTreeResult<C> + Send + Sync>;

/// Decides, on every traversal, whether a node may be entered.
pub type Guard<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// A point in a command tree: an optional chain, the handlers attached to it and its children.
///
/// A node without a chain only groups its children. Trees are built once and then only read, so
/// any number of traversals can share one.
pub struct TreeNode<C> {
    chain: Option<ParserChain>,
    expand: Option<String>,
    children: Vec<TreeNode<C>>,
    on_execute: Option<ExecuteHandler<C>>,
    on_error: Option<ErrorHandler<C>>,
    on_complete: Option<CompleteHandler<C>>,
    on_fallback: Option<FallbackHandler<C>>,
    guard: Option<Guard<C>>,
}

// What a node hands down to its children.
struct WalkState<'a, C> {
    results: &'a [ResultValue],
    weight: usize,
    on_error: Option<&'a ErrorHandler<C>>,
    on_complete: Option<&'a CompleteHandler<C>>,
}

impl<C> TreeNode<C> {
    /// A node without a chain.
    pub fn root() -> Self {
        Self::with_chain(None)
    }

    /// A node matching `spec`.
    pub fn new(spec: &str, registry: &ParserRegistry) -> Result<Self, TreeError> {
        Ok(Self::with_chain(Some(ParserChain::new(spec, registry)?)))
    }

    /// A node around an already built chain.
    pub fn with_chain(chain: Option<ParserChain>) -> Self {
        TreeNode {
            chain,
            expand: None,
            children: Vec::new(),
            on_execute: None,
            on_error: None,
            on_complete: None,
            on_fallback: None,
            guard: None,
        }
    }

    /// The node's chain, if any.
    pub fn chain(&self) -> Option<&ParserChain> {
        self.chain.as_ref()
    }

    /// The children, in declaration order.
    pub fn children(&self) -> &[TreeNode<C>] {
        &self.children
    }

    /// Whether the node has an execute handler.
    pub fn is_executable(&self) -> bool {
        self.on_execute.is_some()
    }

    /// Appends `child` and returns it for further configuration.
    pub fn add_child(&mut self, child: TreeNode<C>) -> &mut TreeNode<C> {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Extends the tree with one single-argument node per node of `path`, reusing existing
    /// children built from an equal node, and returns the last one.
    pub fn create(
        &mut self,
        path: &str,
        registry: &ParserRegistry,
    ) -> Result<&mut TreeNode<C>, TreeError>
    {
        let nodes = tokenize(path);
        if nodes.is_empty() {
            return Err(TreeError::EmptySpec);
        }

        let mut current = self;
        for node in nodes {
            let single = std::slice::from_ref(&node);
            let existing = current.children.iter().position(|child| {
                child.expand.is_none()
                    && child.chain.as_ref().map_or(false, |chain| chain.matches_nodes(single))
            });

            let index = match existing {
                Some(index) => {
                    trace!(node = %node, "reusing node");
                    index
                }
                None => {
                    trace!(node = %node, "creating node");
                    let chain = ParserChain::from_nodes([node], registry)?;
                    current.children.push(TreeNode::with_chain(Some(chain)));
                    current.children.len() - 1
                }
            };
            current = &mut current.children[index];
        }

        Ok(current)
    }

    /// Adds one child matching the whole of `spec`, reusing an existing child built from the
    /// same spec, and returns it.
    pub fn create_chain(
        &mut self,
        spec: &str,
        registry: &ParserRegistry,
    ) -> Result<&mut TreeNode<C>, TreeError>
    {
        let nodes = tokenize(spec);
        let existing = self.children.iter().position(|child| {
            child.expand.is_none()
                && child.chain.as_ref().map_or(false, |chain| chain.matches_nodes(&nodes))
        });

        let index = match existing {
            Some(index) => {
                trace!(spec, "reusing chain");
                index
            }
            None => {
                trace!(spec, "creating chain");
                let chain = ParserChain::from_nodes(nodes, registry)?;
                self.children.push(TreeNode::with_chain(Some(chain)));
                self.children.len() - 1
            }
        };

        Ok(&mut self.children[index])
    }

    /// Inserts `text` into the line once this node's chain matched, so children see it ahead of
    /// the remaining input.
    pub fn expand(&mut self, text: impl Into<String>) -> &mut Self {
        self.expand = Some(text.into());
        self
    }

    /// Sets the execute handler.
    pub fn on_execute<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut C, &Arguments) -> anyhow::Result<()> + Send + Sync + 'static {
        self.on_execute = Some(Arc::new(handler));
        self
    }

    /// Sets the error handler for this node and its descendants.
    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut C, &ErrorReport) -> anyhow::Result<()> + Send + Sync + 'static {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Sets the complete handler for this node and its descendants.
    pub fn on_complete<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&C, Vec<CompletionGroup>) -> Vec<CompletionGroup> + Send + Sync + 'static {
        self.on_complete = Some(Arc::new(handler));
        self
    }

    /// Sets the fallback handler.
    pub fn on_fallback<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&C, &FallbackContext) -> ParserTreeResult<C> + Send + Sync + 'static {
        self.on_fallback = Some(Arc::new(handler));
        self
    }

    /// Sets the guard. A node whose guard returns false is skipped, with its whole subtree.
    pub fn guard<F>(&mut self, guard: F) -> &mut Self
    where F: Fn(&C) -> bool + Send + Sync + 'static {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Matches `line` against this node and everything below it.
    pub fn parse(&self, line: &ParsedLine, context: &C) -> ParserTreeResult<C> {
        let state = WalkState {
            results: &[],
            weight: 0,
            on_error: None,
            on_complete: None,
        };
        let (result, _) = self.walk(line, &state, context);
        debug!(
            line = %line,
            execute = ?result.execute_weight(),
            errors = result.errors().len(),
            completions = result.completions().len(),
            "parsed line"
        );
        result
    }

    // Returns the result of this subtree and whether it consumed any word.
    fn walk(
        &self,
        line: &ParsedLine,
        state: &WalkState<'_, C>,
        context: &C,
    ) -> (ParserTreeResult<C>, bool)
    {
        let mut result = ParserTreeResult::new();
        if let Some(guard) = &self.guard {
            if !guard(context) {
                trace!("guarded out");
                return (result, false);
            }
        }

        let on_error = self.on_error.as_ref().or(state.on_error);
        let on_complete = self.on_complete.as_ref().or(state.on_complete);
        let mut line = line.clone();
        let mut results = state.results.to_vec();
        let mut weight = state.weight;

        if let Some(chain) = &self.chain {
            trace!(chain = %chain, weight, "trying chain");
            let groups = chain.complete(&line);
            if !groups.is_empty() {
                result.add_completions(groups);
                result.record_complete(on_complete, weight);
            }

            match chain.parse(&mut line) {
                Ok(matched) => {
                    weight += matched.consumed;
                    results.extend(matched.results);
                }
                Err(failure) => {
                    result.record_error(
                        failure.error,
                        weight + failure.consumed,
                        on_error,
                        &line,
                    );
                    return (result, failure.consumed > 0);
                }
            }
        }

        let mut accepted = weight > state.weight;
        if let Some(expand) = &self.expand {
            line.insert(expand);
        }

        if line.is_eol() {
            match &self.on_execute {
                Some(handler) => result.record_execute(handler, &results, weight),
                None => result.record_error(ParseError::InputExpected, weight, on_error, &line),
            }
            if self.on_complete.is_some() || self.children.is_empty() {
                result.record_complete(on_complete, weight);
            }
        }

        let child_state = WalkState {
            results: &results,
            weight,
            on_error,
            on_complete,
        };
        let mut child_accepted = false;
        for child in &self.children {
            let (child_result, consumed) = child.walk(&line, &child_state, context);
            result.merge(child_result);
            child_accepted |= consumed;
        }
        accepted |= child_accepted;

        let pending = !line.is_eol() || line.at_completion_point();
        if !child_accepted && pending {
            if let Some(fallback) = &self.on_fallback {
                trace!(weight, "falling back");
                let fallback_context = FallbackContext {
                    line: line.clone(),
                    results,
                    weight,
                };
                let fallback_result = fallback(context, &fallback_context).offset(weight);
                accepted |= fallback_result.execute_weight().map_or(false, |w| w > weight)
                    || fallback_result.errors().iter().any(|error| error.weight > weight);
                result.merge(fallback_result);
                return (result, accepted);
            }
        }

        if !line.is_eol() && !child_accepted {
            let input = line.current_word().to_owned();
            result.record_error(ParseError::UnexpectedInput { input }, weight, on_error, &line);
        }

        (result, accepted)
    }

    /// Iterates depth first over this node and its descendants, yielding each with its depth.
    pub fn iter(&self) -> Iter<'_, C> {
        Iter {
            stack: vec![(0, self)],
        }
    }

    /// The spec text of every path ending in an executable node.
    pub fn usage(&self) -> Vec<String> {
        let mut path: Vec<String> = Vec::new();
        let mut usage = Vec::new();
        for (depth, node) in self.iter() {
            path.truncate(depth);
            path.push(node.chain.as_ref().map(ToString::to_string).unwrap_or_default());
            if node.is_executable() {
                let parts = path.iter().filter(|part| !part.is_empty()).cloned().collect::<Vec<_>>();
                usage.push(parts.join(" "));
            }
        }
        usage
    }
}

impl<C> fmt::Debug for TreeNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("chain", &self.chain.as_ref().map(ToString::to_string))
            .field("expand", &self.expand)
            .field("executable", &self.on_execute.is_some())
            .field("children", &self.children)
            .finish()
    }
}

/// Depth-first iterator over a tree, created by [`TreeNode::iter`].
pub struct Iter<'a, C> {
    stack: Vec<(usize, &'a TreeNode<C>)>,
}

impl<'a, C> Iterator for Iter<'a, C> {
    type Item = (usize, &'a TreeNode<C>);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}

impl<'a, C> IntoIterator for &'a TreeNode<C> {
    type Item = (usize, &'a TreeNode<C>);
    type IntoIter = Iter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
