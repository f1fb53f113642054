use std::fmt;

use crate::{
    tokenizer::{tokenize, SpecNode},
    CompletionCandidate,
    CompletionGroup,
    ParseError,
    ParsedLine,
    ParserRegistry,
    ResultValue,
    TreeError,
    Value,
    ValueParser,
};

/// One argument of a [`ParserChain`]: the parser built for a node plus the shared parameters
/// every argument understands.
#[derive(Debug)]
pub struct ChainLink {
    node: SpecNode,
    parser: Box<dyn ValueParser>,
    required: bool,
    default: Option<String>,
    suppress: bool,
    switch: Option<String>,
}

impl ChainLink {
    fn new(node: SpecNode, registry: &ParserRegistry) -> Result<Self, TreeError> {
        let parser = registry.create(&node)?;
        let params = &node.parameters;
        let default = params.get("default").map(str::to_owned);
        let link = ChainLink {
            required: params.flag("required", true),
            suppress: params.flag("suppress", false),
            switch: params.get("switch").map(str::to_owned),
            default,
            parser,
            node,
        };

        if let Some(default) = &link.default {
            if link.parser.parse(&mut ParsedLine::new(default)).is_err() {
                return Err(TreeError::InvalidParameter {
                    node: link.node.name.clone(),
                    key: "default".to_owned(),
                    value: default.clone(),
                });
            }
        }

        Ok(link)
    }

    /// The node this argument was built from.
    pub fn node(&self) -> &SpecNode {
        &self.node
    }

    /// The argument's parser.
    pub fn parser(&self) -> &dyn ValueParser {
        &*self.parser
    }

    /// Whether running out of input is an error for this argument.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The switch name, if the argument can be given out of position.
    pub fn switch(&self) -> Option<&str> {
        self.switch.as_deref()
    }

    // The value bound when the input holds nothing for this argument.
    fn missing(&self) -> Result<Option<Value>, ParseError> {
        if self.required {
            return Err(ParseError::EndOfInput);
        }

        match &self.default {
            Some(default) => self.parser.parse(&mut ParsedLine::new(default)).map(Some),
            None => Ok(None),
        }
    }
}

/// The values bound by a successful [`ParserChain::parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChainMatch {
    /// One entry per argument, in declared order.
    pub results: Vec<ResultValue>,
    /// The number of words consumed, switch flags included.
    pub consumed: usize,
}

/// Why a [`ParserChain::parse`] failed and how far it got.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainFailure {
    /// The error of the first argument that could not be bound.
    pub error: ParseError,
    /// The number of words consumed before the failure.
    pub consumed: usize,
}

// A `-name` flag found ahead of the cursor.
#[derive(Debug, Clone, Copy)]
struct SwitchMatch {
    link: usize,
    flag: usize,
    value: Option<usize>,
}

/// An ordered sequence of value parsers built from one spec string.
///
/// Arguments carrying a `switch` parameter are bound from `-name value` pairs found anywhere in
/// the remaining input. Every other argument is bound from the remaining words in declared
/// order. Results always come out in declared order.
#[derive(Debug)]
pub struct ParserChain {
    links: Vec<ChainLink>,
}

impl ParserChain {
    /// Tokenizes `spec` and builds one parser per node.
    pub fn new(spec: &str, registry: &ParserRegistry) -> Result<Self, TreeError> {
        Self::from_nodes(tokenize(spec), registry)
    }

    /// Builds one parser per node.
    pub fn from_nodes<I>(nodes: I, registry: &ParserRegistry) -> Result<Self, TreeError>
    where I: IntoIterator<Item = SpecNode> {
        let links = nodes
            .into_iter()
            .map(|node| ChainLink::new(node, registry))
            .collect::<Result<Vec<_>, _>>()?;

        if links.is_empty() {
            return Err(TreeError::EmptySpec);
        }

        Ok(ParserChain { links })
    }

    /// The arguments in declared order.
    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    /// The nodes the chain was built from.
    pub fn nodes(&self) -> impl Iterator<Item = &SpecNode> {
        self.links.iter().map(|link| &link.node)
    }

    /// Whether the chain was built from exactly these nodes.
    pub fn matches_nodes(&self, nodes: &[SpecNode]) -> bool {
        self.links.len() == nodes.len() && self.nodes().zip(nodes).all(|(a, b)| a == b)
    }

    /// Binds every argument. On success `line` is advanced past the consumed words and any
    /// switch pairs are removed from it; on failure `line` is untouched.
    pub fn parse(&self, line: &mut ParsedLine) -> Result<ChainMatch, ChainFailure> {
        let mut attempt = line.clone();
        let switches = self.scan_switches(&attempt, false);
        let mut consumed = 0;
        let mut results = Vec::with_capacity(self.links.len());

        // Switch values are converted first but bound in declared order below
        let mut switch_values = Vec::with_capacity(switches.len());
        for found in &switches {
            let link = &self.links[found.link];
            consumed += 1;
            let value = match found.value.and_then(|pos| attempt.word_at(pos)) {
                Some(word) => match link.parser.from_arg(word) {
                    Ok(value) => {
                        consumed += 1;
                        Some(value)
                    }
                    Err(error) => return Err(ChainFailure { error, consumed }),
                },
                None => link
                    .missing()
                    .map_err(|error| ChainFailure { error, consumed })?,
            };
            switch_values.push((found.link, value));
        }

        let positions = switches
            .iter()
            .flat_map(|found| std::iter::once(found.flag).chain(found.value))
            .collect::<Vec<_>>();
        attempt.remove_words(&positions);

        for (i, link) in self.links.iter().enumerate() {
            let value = if link.switch.is_some() {
                match switch_values.iter().position(|&(index, _)| index == i) {
                    Some(pos) => switch_values.swap_remove(pos).1,
                    None => link
                        .missing()
                        .map_err(|error| ChainFailure { error, consumed })?,
                }
            } else if attempt.is_eol() {
                link.missing()
                    .map_err(|error| ChainFailure { error, consumed })?
            } else {
                let start = attempt.word_index();
                let value = link
                    .parser
                    .parse(&mut attempt)
                    .map_err(|error| ChainFailure { error, consumed })?;
                consumed += attempt.word_index() - start;
                Some(value)
            };

            results.push(ResultValue {
                value,
                suppressed: link.suppress,
            });
        }

        *line = attempt;
        Ok(ChainMatch { results, consumed })
    }

    /// Suggestions for the word being completed, if it falls within this chain. Only the
    /// argument positioned on that word is asked; if an earlier argument fails, nothing is
    /// offered.
    pub fn complete(&self, line: &ParsedLine) -> Vec<CompletionGroup> {
        let completion = match line.completion_index() {
            Some(completion) if completion >= line.word_index() => completion,
            _ => return Vec::new(),
        };

        // A flag being typed stays in the line so its name can be completed
        let switches = self.scan_switches(line, true);
        for found in &switches {
            let value_pos = found.value.unwrap_or(found.flag + 1);
            if value_pos == completion {
                let mut at_value = line.clone();
                at_value.set_word_index(value_pos);
                return self.links[found.link].parser.complete(&at_value);
            }
        }

        let mut attempt = line.clone();
        let positions = switches
            .iter()
            .flat_map(|found| std::iter::once(found.flag).chain(found.value))
            .collect::<Vec<_>>();
        attempt.remove_words(&positions);

        for link in self.links.iter().filter(|link| link.switch.is_none()) {
            if attempt.at_completion_point() {
                let mut groups = link.parser.complete(&attempt);
                groups.extend(self.complete_switch_names(&attempt, &switches));
                return groups;
            }
            if attempt.is_eol() || link.parser.parse(&mut attempt).is_err() {
                return Vec::new();
            }
        }

        if attempt.at_completion_point() {
            return self.complete_switch_names(&attempt, &switches).into_iter().collect();
        }
        Vec::new()
    }

    // Offers the `-name` flags not given yet when the current word could be one.
    fn complete_switch_names(
        &self,
        line: &ParsedLine,
        found: &[SwitchMatch],
    ) -> Option<CompletionGroup>
    {
        let partial = line.current_word();
        if !partial.is_empty() && !partial.starts_with('-') {
            return None;
        }

        let group: CompletionGroup = self
            .links
            .iter()
            .enumerate()
            .filter(|(i, _)| !found.iter().any(|found| found.link == *i))
            .filter_map(|(_, link)| {
                let name = link.switch.as_deref()?;
                let flag = format!("-{}", name);
                flag.starts_with(partial).then(|| {
                    CompletionCandidate::new(flag, name)
                        .with_description(link.node.parameters.get("description"))
                })
            })
            .collect();

        (!group.is_empty()).then_some(group)
    }

    // Finds the first `-name value` pair for each switch in the words ahead of the cursor. The
    // word being completed is skipped when `completing` is set.
    fn scan_switches(&self, line: &ParsedLine, completing: bool) -> Vec<SwitchMatch> {
        let mut found: Vec<SwitchMatch> = Vec::new();
        let start = line.word_index();
        let end = start + line.size();
        let mut pos = start;

        while pos < end {
            let word = line.word_at(pos).unwrap_or("");
            let link = word.strip_prefix('-').and_then(|name| {
                self.links.iter().position(|link| link.switch.as_deref() == Some(name))
            });

            match link {
                Some(link)
                    if !found.iter().any(|found| found.link == link)
                        && !(completing && line.completion_index() == Some(pos)) =>
                {
                    let value = (pos + 1 < end).then_some(pos + 1);
                    found.push(SwitchMatch {
                        link,
                        flag: pos,
                        value,
                    });
                    pos += 2;
                }
                _ => pos += 1,
            }
        }

        found
    }
}

impl fmt::Display for ParserChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}
