use crate::{
    tokenizer::SpecNode,
    CompletionCandidate,
    CompletionGroup,
    ParseError,
    ParsedLine,
};

use super::{ArgumentInfo, Value, ValueParser};

/// Parses literal and string arguments.
///
/// With options, a word is only accepted if it equals one of them and completion proposes the
/// options starting with the current word. Without options, any word is accepted and completion
/// proposes the placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct StringParser {
    options: Option<Vec<String>>,
    info: ArgumentInfo,
}

impl StringParser {
    /// A literal: the node name lists the accepted words, e.g. `mike|milly`.
    pub fn literal(node: &SpecNode) -> Self {
        StringParser {
            options: Some(split_options(&node.name)),
            info: ArgumentInfo::from_node(node),
        }
    }

    /// A string argument, restricted by the `options` parameter if present.
    pub fn string(node: &SpecNode) -> Self {
        StringParser {
            options: node.parameters.get("options").map(split_options),
            info: ArgumentInfo::from_node(node),
        }
    }

    /// The accepted words, if restricted.
    pub fn options(&self) -> Option<&[String]> {
        self.options.as_deref()
    }
}

fn split_options(options: &str) -> Vec<String> {
    options
        .split('|')
        .filter(|option| !option.is_empty())
        .map(str::to_owned)
        .collect()
}

impl ValueParser for StringParser {
    fn from_arg(&self, arg: &str) -> Result<Value, ParseError> {
        match &self.options {
            Some(options) if !options.iter().any(|option| option == arg) =>
                Err(ParseError::InvalidOption {
                    input: arg.to_owned(),
                    options: options.clone(),
                }),
            _ => Ok(Value::String(arg.to_owned())),
        }
    }

    fn complete(&self, line: &ParsedLine) -> Vec<CompletionGroup> {
        let partial = line.current_word();
        let description = self.info.description.as_deref();

        let group: CompletionGroup = match &self.options {
            Some(options) => options
                .iter()
                .filter(|option| option.starts_with(partial))
                .map(|option| {
                    CompletionCandidate::new(option.as_str(), self.info.key.as_str())
                        .with_description(description)
                })
                .collect(),
            None => std::iter::once(self.info.placeholder_candidate(partial)).collect(),
        };

        if group.is_empty() {
            Vec::new()
        } else {
            vec![group]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use rstest::rstest;

    fn literal(spec: &str) -> StringParser {
        StringParser::literal(&tokenize(spec).remove(0))
    }

    fn string(spec: &str) -> StringParser {
        StringParser::string(&tokenize(spec).remove(0))
    }

    // === Parsing ===

    #[rstest]
    #[case::first("mike|milly", "mike")]
    #[case::second("mike|milly", "milly")]
    #[case::single("list", "list")]
    fn literal_accepts_options(#[case] spec: &str, #[case] arg: &str) {
        assert_eq!(literal(spec).from_arg(arg), Ok(Value::from(arg)));
    }

    #[rstest]
    #[case::other_word("mike|milly", "bob")]
    #[case::prefix_only("mike|milly", "mi")]
    #[case::case_sensitive("list", "LIST")]
    fn literal_rejects_other_words(#[case] spec: &str, #[case] arg: &str) {
        assert!(matches!(
            literal(spec).from_arg(arg),
            Err(ParseError::InvalidOption { .. })
        ));
    }

    #[test]
    fn string_without_options_accepts_anything() {
        assert_eq!(string("@string").from_arg("x y"), Ok(Value::from("x y")));
    }

    #[test]
    fn string_with_options_is_restricted() {
        let parser = string("@string(options=red|green)");
        assert_eq!(parser.from_arg("green"), Ok(Value::from("green")));
        assert_eq!(
            parser.from_arg("blue"),
            Err(ParseError::InvalidOption {
                input: "blue".into(),
                options: vec!["red".into(), "green".into()],
            })
        );
    }

    // === Completion ===

    #[rstest]
    #[case::prefix("m", &["mike", "milly"])]
    #[case::narrower("mil", &["milly"])]
    #[case::empty("", &["mike", "milly", "art"])]
    fn literal_completes_matching_options(#[case] partial: &str, #[case] expected: &[&str]) {
        let groups = literal("mike|milly|art").complete(&ParsedLine::from_words([partial]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].values(), expected);
    }

    #[test]
    fn literal_without_match_offers_no_group() {
        let groups = literal("mike|milly").complete(&ParsedLine::from_words(["x"]));
        assert!(groups.is_empty());
    }

    #[test]
    fn string_completes_placeholder() {
        let parser = string("@string(placeholder=<name>,description='who to greet')");
        let groups = parser.complete(&ParsedLine::from_words(["bo"]));
        let candidate = &groups[0].candidates[0];
        assert_eq!(candidate.title, "<name>");
        assert_eq!(candidate.value, "bo");
        assert_eq!(candidate.description.as_deref(), Some("who to greet"));
    }

    #[test]
    fn string_default_placeholder_uses_kind() {
        let groups = string("@string").complete(&ParsedLine::from_words([""]));
        assert_eq!(groups[0].candidates[0].title, "<string>");
    }

    #[test]
    fn switch_name_is_the_candidate_key() {
        let groups = literal("on|off(switch=mode)").complete(&ParsedLine::from_words(["o"]));
        assert!(groups[0].candidates.iter().all(|c| c.key == "mode"));
    }
}
