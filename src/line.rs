use std::{fmt, sync::Arc};

use crate::ParseError;

/// A cursor over the words of a command line.
///
/// The words are shared and never mutated in place, so cloning a line is cheap and yields an
/// independent cursor: every attempt that may fail works on a clone and is only written back to
/// the original once it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    words: Arc<[String]>,
    index: usize,
    prefix: Arc<str>,
    trailing_space: bool,
    completion: Option<usize>,
}

impl ParsedLine {
    /// Splits `input` into words. Spaces separate words except inside single or double quotes,
    /// and `\` escapes the following character. Surrounding quotes are stripped.
    pub fn new(input: &str) -> Self {
        let (words, trailing_space) = split_words(input);
        ParsedLine::from_words(words).with_trailing_space(trailing_space)
    }

    /// Creates a line over words which were already split by the caller.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Arc<[String]> = words.into_iter().map(Into::into).collect();
        let completion = Some(words.len().saturating_sub(1));
        ParsedLine {
            words,
            index: 0,
            prefix: Arc::from(""),
            trailing_space: false,
            completion,
        }
    }

    /// Attaches a display prefix, e.g. the command name a tree was looked up by. The prefix is
    /// never matched against.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Arc::from(prefix.into());
        self
    }

    /// Marks whether the raw input ended with whitespace, which moves the completion point past
    /// the last word.
    pub fn with_trailing_space(mut self, trailing_space: bool) -> Self {
        self.trailing_space = trailing_space;
        self.completion = Some(if trailing_space || self.words.is_empty() {
            self.words.len()
        } else {
            self.words.len() - 1
        });
        self
    }

    /// Returns the current word and advances past it.
    pub fn next(&mut self) -> Result<&str, ParseError> {
        let word = self.words.get(self.index).ok_or(ParseError::EndOfInput)?;
        self.index += 1;
        Ok(word)
    }

    /// Returns the current word without advancing, or an empty string at the end of the line.
    pub fn current_word(&self) -> &str {
        self.words
            .get(self.index)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Whether every word has been consumed.
    pub fn is_eol(&self) -> bool {
        self.index >= self.words.len()
    }

    /// The number of words not yet consumed.
    pub fn size(&self) -> usize {
        self.words.len().saturating_sub(self.index)
    }

    /// The words not yet consumed.
    pub fn remaining(&self) -> &[String] {
        &self.words[self.index.min(self.words.len()) ..]
    }

    /// The index of the current word.
    pub fn word_index(&self) -> usize {
        self.index
    }

    /// Moves the cursor, typically to commit the progress of a sub-parse made on a clone.
    pub fn set_word_index(&mut self, index: usize) {
        self.index = index.min(self.words.len());
    }

    /// The display prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether the raw input ended with whitespace.
    pub fn has_trailing_space(&self) -> bool {
        self.trailing_space
    }

    /// Splits `text` into words and places them at the cursor, ahead of the remaining input.
    pub fn insert(&mut self, text: &str) {
        let (inserted, _) = split_words(text);
        if inserted.is_empty() {
            return;
        }

        let mut words = Vec::with_capacity(self.words.len() + inserted.len());
        words.extend_from_slice(&self.words[.. self.index]);
        words.extend(inserted);
        words.extend_from_slice(&self.words[self.index ..]);
        if let Some(completion) = self.completion.as_mut() {
            if self.index <= *completion {
                *completion += words.len() - self.words.len();
            }
        }
        self.words = words.into();
    }

    /// Drops the words at the given absolute positions. Positions before the cursor are ignored.
    /// Removing the word being completed means nothing further is completed on this line.
    pub(crate) fn remove_words(&mut self, positions: &[usize]) {
        let positions = positions
            .iter()
            .copied()
            .filter(|&pos| pos >= self.index && pos < self.words.len())
            .collect::<Vec<_>>();
        self.completion = self.completion.and_then(|completion| {
            if positions.contains(&completion) {
                None
            } else {
                Some(completion - positions.iter().filter(|&&pos| pos < completion).count())
            }
        });

        let words = self
            .words
            .iter()
            .enumerate()
            .filter(|(i, _)| !positions.contains(i))
            .map(|(_, word)| word.clone())
            .collect::<Vec<_>>();
        self.words = words.into();
    }

    /// The word at an absolute position, consumed or not.
    pub(crate) fn word_at(&self, position: usize) -> Option<&str> {
        self.words.get(position).map(String::as_str)
    }

    /// The index of the word being completed: the last word, or one past it if the input ended
    /// with whitespace. `None` once that word was taken out of the line by a switch.
    pub fn completion_index(&self) -> Option<usize> {
        self.completion
    }

    /// Whether the cursor sits on the word being completed.
    pub fn at_completion_point(&self) -> bool {
        self.completion == Some(self.index)
    }

    /// The prefix followed by every word, consumed or not.
    pub fn full_line(&self) -> String {
        let mut line = String::from(&*self.prefix);
        for word in self.words.iter() {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        line
    }
}

impl fmt::Display for ParsedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_line())
    }
}

// Returns the words and whether the input ended with unquoted whitespace.
fn split_words(input: &str) -> (Vec<String>, bool) {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut has_word = false;
    // Single or double quotes
    let mut quote_type = '\0';
    // Whether we're in quotes and should ignore spaces
    let mut in_quotes = false;
    // Set after a '\' so the next character is taken verbatim
    let mut escaped = false;
    let mut trailing_space = false;

    for ch in input.chars() {
        trailing_space = false;

        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }

        match ch {
            '\\' => {
                escaped = true;
                has_word = true;
            }
            ' ' | '\t' if !in_quotes => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
                trailing_space = true;
            }
            '\'' | '"' if !in_quotes => {
                quote_type = ch;
                in_quotes = true;
                has_word = true;
            }
            _ if in_quotes && ch == quote_type => in_quotes = false,
            _ => {
                current.push(ch);
                has_word = true;
            }
        }
    }

    if escaped {
        current.push('\\');
    }
    if has_word {
        words.push(current);
    }

    (words, trailing_space)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // === Splitting ===

    #[rstest]
    #[case::plain("tp 1 2 3", &["tp", "1", "2", "3"])]
    #[case::extra_spaces("  tp   1 ", &["tp", "1"])]
    #[case::single_quotes("say 'hello world'", &["say", "hello world"])]
    #[case::double_quotes(r#"say "a 'b' c""#, &["say", "a 'b' c"])]
    #[case::escaped_space(r"say a\ b", &["say", "a b"])]
    #[case::escaped_quote(r#"say "a \" b""#, &["say", "a \" b"])]
    #[case::empty_quotes("say ''", &["say", ""])]
    #[case::empty("", &[])]
    fn splits_words(#[case] input: &str, #[case] expected: &[&str]) {
        let line = ParsedLine::new(input);
        assert_eq!(line.remaining(), expected);
    }

    #[rstest]
    #[case("list", false)]
    #[case("list ", true)]
    #[case("say 'a ", false)]
    #[case("", false)]
    fn detects_trailing_space(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(ParsedLine::new(input).has_trailing_space(), expected);
    }

    // === Cursor ===

    #[test]
    fn next_advances_until_end_of_input() {
        let mut line = ParsedLine::new("a b");
        assert_eq!(line.next(), Ok("a"));
        assert_eq!(line.current_word(), "b");
        assert_eq!(line.size(), 1);
        assert_eq!(line.next(), Ok("b"));
        assert!(line.is_eol());
        assert_eq!(line.current_word(), "");
        assert_eq!(line.next(), Err(ParseError::EndOfInput));
    }

    #[test]
    fn clones_are_independent() {
        let mut line = ParsedLine::new("a b c");
        let mut copy = line.clone();
        copy.next().unwrap();
        copy.next().unwrap();
        assert_eq!(line.word_index(), 0);

        line.set_word_index(copy.word_index());
        assert_eq!(line.current_word(), "c");
    }

    #[test]
    fn insert_places_words_at_the_cursor() {
        let mut line = ParsedLine::new("tp home");
        line.next().unwrap();
        let before = line.clone();
        line.insert("teleport to");
        assert_eq!(line.remaining(), &["teleport", "to", "home"]);
        assert_eq!(before.remaining(), &["home"]);
    }

    #[test]
    fn remove_words_keeps_consumed_words() {
        let mut line = ParsedLine::new("a b -x 1 c");
        line.next().unwrap();
        line.remove_words(&[0, 2, 3]);
        assert_eq!(line.remaining(), &["b", "c"]);
        assert_eq!(line.full_line(), "a b c");
    }

    // === Completion point ===

    #[rstest]
    #[case::last_word("first m", 1)]
    #[case::after_space("first ", 1)]
    #[case::single_word("first", 0)]
    #[case::empty("", 0)]
    fn completion_index(#[case] input: &str, #[case] expected: usize) {
        assert_eq!(ParsedLine::new(input).completion_index(), Some(expected));
    }

    #[test]
    fn insert_shifts_pending_completion_point() {
        let mut line = ParsedLine::new("tp ");
        line.next().unwrap();
        line.insert("teleport");
        assert_eq!(line.completion_index(), Some(2));
        assert!(!line.at_completion_point());
    }

    #[test]
    fn insert_after_completion_point_keeps_it() {
        let mut line = ParsedLine::new("tp");
        line.next().unwrap();
        line.insert("teleport");
        assert_eq!(line.completion_index(), Some(0));
    }

    #[test]
    fn removing_the_completed_word_clears_completion() {
        let mut line = ParsedLine::new("a -x 1 b");
        line.remove_words(&[1, 2]);
        assert_eq!(line.completion_index(), Some(1));

        let mut line = ParsedLine::new("a -x 1");
        line.remove_words(&[1, 2]);
        assert_eq!(line.completion_index(), None);
    }

    #[test]
    fn full_line_includes_prefix() {
        let line = ParsedLine::new("1 2").with_prefix("/tp");
        assert_eq!(line.to_string(), "/tp 1 2");
    }
}
