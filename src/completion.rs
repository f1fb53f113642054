/// A single suggestion for the word being completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    /// The text that replaces the word being completed.
    pub value: String,
    /// What to display, usually the value itself or a placeholder such as `<amount>`.
    pub title: String,
    /// Optional help text taken from the argument's `description` parameter.
    pub description: Option<String>,
    /// Identifies the argument which offered this candidate.
    pub key: String,
}

impl CompletionCandidate {
    /// Creates a candidate whose title is its value.
    pub fn new(value: impl Into<String>, key: impl Into<String>) -> Self {
        let value = value.into();
        CompletionCandidate {
            title: value.clone(),
            value,
            description: None,
            key: key.into(),
        }
    }

    /// Sets the displayed title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(str::to_owned);
        self
    }
}

/// The suggestions one argument offers at one cursor position. Groups from different tree paths
/// are kept apart so callers can present them separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionGroup {
    /// The suggestions, in the order the argument produced them.
    pub candidates: Vec<CompletionCandidate>,
}

impl CompletionGroup {
    /// Wraps a list of candidates.
    pub fn new(candidates: Vec<CompletionCandidate>) -> Self {
        CompletionGroup { candidates }
    }

    /// Whether the group has no suggestions.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The candidate values, in order.
    pub fn values(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.value.as_str()).collect()
    }
}

impl FromIterator<CompletionCandidate> for CompletionGroup {
    fn from_iter<I: IntoIterator<Item = CompletionCandidate>>(iter: I) -> Self {
        CompletionGroup::new(iter.into_iter().collect())
    }
}
