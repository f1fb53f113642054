//! The spec mini-language: `mike|milly(switch=m_sw1,default=marta) art`.
//!
//! A spec string is a space separated sequence of nodes. Each node is a name optionally followed
//! by a parenthesized `key=value` list. Values may be bare or quoted with `'` or `"`, in which case
//! `\` escapes the following character. The tokenizer is lenient: malformed input degrades into
//! whatever nodes could be recovered and never fails.

use std::{collections::BTreeMap, fmt};

/// The `key=value` parameters attached to a [`SpecNode`]. Keys are case-sensitive and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Interprets the value for `key` as a boolean, falling back to `default` when the key is
    /// absent. Only `true` (case-insensitive) counts as true.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => value.eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    /// Sets `key` to `value`, replacing any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Parameters(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One grammar element parsed from a spec string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecNode {
    /// The node name, e.g. `mike|milly` or `@int`.
    pub name: String,
    /// The parenthesized parameters, if any.
    pub parameters: Parameters,
}

impl SpecNode {
    /// Creates a node without parameters.
    pub fn new(name: impl Into<String>) -> Self {
        SpecNode {
            name: name.into(),
            parameters: Parameters::new(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key, value);
        self
    }
}

impl fmt::Display for SpecNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.parameters.is_empty() {
            return Ok(());
        }

        f.write_str("(")?;
        for (i, (key, value)) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}=", key)?;
            write_value(f, value)?;
        }
        f.write_str(")")
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    let needs_quotes = value.is_empty()
        || value.trim() != value
        || value.contains(|ch| matches!(ch, ',' | '(' | ')' | ' ' | '\t' | '\'' | '"' | '\\'));
    if !needs_quotes {
        return f.write_str(value);
    }

    f.write_str("'")?;
    for ch in value.chars() {
        if ch == '\'' || ch == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", ch)?;
    }
    f.write_str("'")
}

/// Splits a spec string into its nodes.
pub fn tokenize(spec: &str) -> Vec<SpecNode> {
    let mut tokenizer = Tokenizer::new(State::Name);
    for ch in spec.chars() {
        tokenizer.feed(ch);
    }
    tokenizer.finish();
    tokenizer.nodes
}

/// Parses a bare parameter list such as `x=1,label='a b'`, sharing the automaton used by
/// [`tokenize`]. Anything after a closing `)` is ignored.
pub fn parse_parameters(text: &str) -> Parameters {
    let mut tokenizer = Tokenizer::new(State::ParamKey);
    for ch in text.chars() {
        tokenizer.feed(ch);
        if tokenizer.state == State::ParamEnd {
            break;
        }
    }
    tokenizer.finish();
    tokenizer
        .nodes
        .into_iter()
        .next()
        .map(|node| node.parameters)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Name,
    ParamKey,
    ParamValue,
    ParamValueQuote,
    ParamValueQuoteEnd,
    ParamEnd,
}

struct Tokenizer {
    state: State,
    name: String,
    key: String,
    value: String,
    quote: char,
    escaped: bool,
    parameters: Parameters,
    nodes: Vec<SpecNode>,
}

impl Tokenizer {
    fn new(state: State) -> Self {
        Tokenizer {
            state,
            name: String::new(),
            key: String::new(),
            value: String::new(),
            quote: '\0',
            escaped: false,
            parameters: Parameters::new(),
            nodes: Vec::new(),
        }
    }

    fn feed(&mut self, ch: char) {
        match self.state {
            State::Name => match ch {
                ' ' | '\t' => self.emit(),
                '(' => self.state = State::ParamKey,
                _ => self.name.push(ch),
            },
            State::ParamKey => match ch {
                '=' => self.state = State::ParamValue,
                ',' => self.push_parameter(false),
                ')' => {
                    self.push_parameter(false);
                    self.close();
                }
                _ => self.key.push(ch),
            },
            State::ParamValue => match ch {
                '\'' | '"' if self.value.trim().is_empty() => {
                    self.value.clear();
                    self.quote = ch;
                    self.state = State::ParamValueQuote;
                }
                ',' => {
                    self.push_parameter(false);
                    self.state = State::ParamKey;
                }
                ')' => {
                    self.push_parameter(false);
                    self.close();
                }
                _ => self.value.push(ch),
            },
            State::ParamValueQuote => {
                if self.escaped {
                    self.value.push(ch);
                    self.escaped = false;
                } else if ch == '\\' {
                    self.escaped = true;
                } else if ch == self.quote {
                    self.state = State::ParamValueQuoteEnd;
                } else {
                    self.value.push(ch);
                }
            }
            // Anything between the closing quote and the next separator is dropped
            State::ParamValueQuoteEnd => match ch {
                ',' => {
                    self.push_parameter(true);
                    self.state = State::ParamKey;
                }
                ')' => {
                    self.push_parameter(true);
                    self.close();
                }
                _ => {}
            },
            State::ParamEnd => {
                self.state = State::Name;
                if !matches!(ch, ' ' | '\t') {
                    self.feed(ch);
                }
            }
        }
    }

    fn finish(&mut self) {
        match self.state {
            State::Name | State::ParamEnd => self.emit(),
            State::ParamKey | State::ParamValue => {
                self.push_parameter(false);
                self.close();
            }
            State::ParamValueQuote | State::ParamValueQuoteEnd => {
                self.push_parameter(true);
                self.close();
            }
        }
    }

    fn push_parameter(&mut self, quoted: bool) {
        let key = self.key.trim();
        if !key.is_empty() {
            let value = if quoted {
                self.value.as_str()
            } else {
                self.value.trim()
            };
            self.parameters.insert(key, value);
        }
        self.key.clear();
        self.value.clear();
        self.escaped = false;
    }

    fn close(&mut self) {
        self.emit();
        self.state = State::ParamEnd;
    }

    fn emit(&mut self) {
        let name = self.name.trim();
        let parameters = std::mem::take(&mut self.parameters);
        // Names are empty only for bare parameter lists
        if !name.is_empty() || !parameters.is_empty() {
            self.nodes.push(SpecNode {
                name: name.to_owned(),
                parameters,
            });
        }
        self.name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn node(name: &str, params: &[(&str, &str)]) -> SpecNode {
        SpecNode {
            name: name.into(),
            parameters: params.iter().copied().collect(),
        }
    }

    // === Names ===

    #[rstest]
    #[case::single("art", vec![node("art", &[])])]
    #[case::sequence("list all", vec![node("list", &[]), node("all", &[])])]
    #[case::alternation("mike|milly art", vec![node("mike|milly", &[]), node("art", &[])])]
    #[case::extra_spaces("  list   all ", vec![node("list", &[]), node("all", &[])])]
    #[case::kind("@int @string", vec![node("@int", &[]), node("@string", &[])])]
    #[case::empty("", vec![])]
    fn tokenize_names(#[case] spec: &str, #[case] expected: Vec<SpecNode>) {
        assert_eq!(tokenize(spec), expected);
    }

    // === Parameters ===

    #[test]
    fn tokenize_quoted_parameters() {
        assert_eq!(
            tokenize("literal(p1=one,p2='two',p3='one two')"),
            vec![node(
                "literal",
                &[("p1", "one"), ("p2", "two"), ("p3", "one two")]
            )]
        );
    }

    #[test]
    fn tokenize_parameters_then_next_node() {
        assert_eq!(
            tokenize("mike|milly(switch=m_sw1,default=marta) art"),
            vec![
                node("mike|milly", &[("switch", "m_sw1"), ("default", "marta")]),
                node("art", &[]),
            ]
        );
    }

    #[rstest]
    #[case::bare_trimmed("a( k = v )", "v")]
    #[case::quoted_keeps_spaces("a(k=' v ')", " v ")]
    #[case::double_quotes(r#"a(k="x,y")"#, "x,y")]
    #[case::escaped_quote(r"a(k='it\'s')", "it's")]
    #[case::escaped_backslash(r"a(k='c:\\dir')", r"c:\dir")]
    #[case::paren_in_quotes("a(k='(x)')", "(x)")]
    #[case::no_value("a(k)", "")]
    fn tokenize_parameter_values(#[case] spec: &str, #[case] expected: &str) {
        let nodes = tokenize(spec);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].parameters.get("k"), Some(expected));
    }

    #[rstest]
    #[case::tabs("give\t@string\t@int")]
    #[case::mixed("give \t @string\t @int")]
    #[case::tab_after_parameters("give(suppress=true)\t@string @int")]
    fn tabs_separate_nodes(#[case] spec: &str) {
        let names = tokenize(spec).into_iter().map(|node| node.name).collect::<Vec<_>>();
        assert_eq!(names, vec!["give", "@string", "@int"]);
    }

    #[test]
    fn tokenize_node_directly_after_parameters() {
        assert_eq!(
            tokenize("a(x=1)b"),
            vec![node("a", &[("x", "1")]), node("b", &[])]
        );
    }

    #[test]
    fn keys_are_case_sensitive() {
        let nodes = tokenize("a(Key=1,key=2)");
        assert_eq!(nodes[0].parameters.get("Key"), Some("1"));
        assert_eq!(nodes[0].parameters.get("key"), Some("2"));
    }

    // === Leniency ===

    #[rstest]
    #[case::unclosed_parameters("a(x=1", vec![node("a", &[("x", "1")])])]
    #[case::unterminated_quote("a(x='1 2", vec![node("a", &[("x", "1 2")])])]
    #[case::garbage_after_quote("a(x='1'zz,y=2)", vec![node("a", &[("x", "1"), ("y", "2")])])]
    #[case::dangling_key("a(x", vec![node("a", &[("x", "")])])]
    fn tokenize_malformed_input(#[case] spec: &str, #[case] expected: Vec<SpecNode>) {
        assert_eq!(tokenize(spec), expected);
    }

    // === Bare parameter lists ===

    #[test]
    fn parse_parameters_shares_the_automaton() {
        let params = parse_parameters("x=1, label='a b',flag");
        assert_eq!(params.get("x"), Some("1"));
        assert_eq!(params.get("label"), Some("a b"));
        assert_eq!(params.get("flag"), Some(""));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn parse_parameters_stops_at_closing_paren() {
        let params = parse_parameters("x=1) y=2");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("x"), Some("1"));
    }

    // === Display ===

    #[rstest]
    #[case::plain("art")]
    #[case::simple_params("mike|milly(default=marta,switch=m_sw1)")]
    #[case::quoted("literal(p1=one,p3='one two')")]
    #[case::escapes(r"a(k='it\'s')")]
    fn display_round_trips(#[case] spec: &str) {
        let nodes = tokenize(spec);
        let shown = nodes[0].to_string();
        assert_eq!(shown, spec);
        assert_eq!(tokenize(&shown), nodes);
    }

    #[test]
    fn flag_reads_booleans() {
        let params = parse_parameters("required=false,suppress=TRUE");
        assert!(!params.flag("required", true));
        assert!(params.flag("suppress", false));
        assert!(params.flag("missing", true));
    }
}
