use tracing::debug;

use crate::{CommandError, ParseError, ParsedLine, ParserTreeResult, TreeNode};

/// Defines a command module, or a set of command definitions with an associated parser and
/// suggestion generator.
pub trait CommandModule<C> {
    /// Dispatches the given command for execution.
    fn dispatch(&self, command: &str, context: &mut C) -> Result<(), CommandError>;

    /// Generates a list of suggestions to complete the final argument in the given command.
    fn get_suggestions(&self, command: &str, context: &C) -> Vec<String>;
}

struct Command<C> {
    names: Vec<String>,
    tree: TreeNode<C>,
}

/// Command trees looked up by the first word of a line.
pub struct CommandSet<C> {
    commands: Vec<Command<C>>,
}

impl<C> CommandSet<C> {
    /// An empty set.
    pub fn new() -> Self {
        CommandSet {
            commands: Vec::new(),
        }
    }

    /// Registers a command under `names`, a `|` separated list whose first entry is the primary
    /// name and the rest aliases, and returns its tree. Registering a known name again returns
    /// the existing tree.
    pub fn register(&mut self, names: &str) -> &mut TreeNode<C> {
        let names = names
            .split('|')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect::<Vec<_>>();

        let existing = self
            .commands
            .iter()
            .position(|command| command.names.iter().any(|name| names.contains(name)));
        let index = match existing {
            Some(index) => index,
            None => {
                self.commands.push(Command {
                    names,
                    tree: TreeNode::root(),
                });
                self.commands.len() - 1
            }
        };

        &mut self.commands[index].tree
    }

    /// The tree registered under `name` or one of its aliases.
    pub fn get(&self, name: &str) -> Option<&TreeNode<C>> {
        self.commands
            .iter()
            .find(|command| command.names.iter().any(|known| known == name))
            .map(|command| &command.tree)
    }

    /// The primary names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands
            .iter()
            .filter_map(|command| command.names.first())
            .map(String::as_str)
    }

    /// Looks up the command named by the first word of `command` and matches the rest of the line
    /// against its tree.
    pub fn parse(&self, command: &str, context: &C) -> ParserTreeResult<C> {
        let line = ParsedLine::new(command);
        let (name, args) = match line.remaining().split_first() {
            Some((name, args)) => (name.as_str(), args),
            None => ("", &[][..]),
        };

        match self.get(name) {
            Some(tree) => {
                let args = ParsedLine::from_words(args.iter().cloned())
                    .with_prefix(name)
                    .with_trailing_space(line.has_trailing_space());
                tree.parse(&args, context)
            }
            None => {
                debug!(name, "unknown command");
                ParserTreeResult::from_error(ParseError::UnknownCommand {
                    name: name.to_owned(),
                })
            }
        }
    }

    /// One line per executable path of every command, starting with the command name.
    pub fn usage(&self) -> Vec<String> {
        self.commands
            .iter()
            .flat_map(|command| {
                let name = command.names.first().map(String::as_str).unwrap_or("");
                command.tree.usage().into_iter().map(move |path| {
                    if path.is_empty() {
                        name.to_owned()
                    } else {
                        format!("{} {}", name, path)
                    }
                })
            })
            .collect()
    }
}

impl<C> Default for CommandSet<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CommandModule<C> for CommandSet<C> {
    fn dispatch(&self, command: &str, context: &mut C) -> Result<(), CommandError> {
        self.parse(command, context).execute(context)
    }

    fn get_suggestions(&self, command: &str, context: &C) -> Vec<String> {
        let line = ParsedLine::new(command);
        let words = line.remaining();

        if words.len() <= 1 && !line.has_trailing_space() {
            let partial = words.first().map(String::as_str).unwrap_or("");
            return self
                .commands
                .iter()
                .flat_map(|command| command.names.iter())
                .filter(|name| name.starts_with(partial))
                .cloned()
                .collect();
        }

        let mut suggestions: Vec<String> = Vec::new();
        for group in self.parse(command, context).complete(context) {
            for candidate in group.candidates {
                // Placeholders for an empty word carry no text to insert
                if !candidate.value.is_empty() && !suggestions.contains(&candidate.value) {
                    suggestions.push(candidate.value);
                }
            }
        }
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arguments, ParserRegistry};
    use rstest::rstest;

    fn commands() -> CommandSet<Vec<String>> {
        let registry = ParserRegistry::default();
        let mut commands = CommandSet::new();

        let tp = commands.register("teleport|tp");
        tp.create_chain("@int @int", &registry)
            .unwrap()
            .on_execute(|log: &mut Vec<String>, args: &Arguments| {
                log.push(format!("tp {} {}", args.int(0).unwrap_or(0), args.int(1).unwrap_or(0)));
                Ok(())
            });

        let list = commands.register("list");
        list.on_execute(|log: &mut Vec<String>, _args: &Arguments| {
            log.push("list".to_owned());
            Ok(())
        });
        list.create("mike|milly", &registry).unwrap();
        list.create("art", &registry).unwrap();

        commands
    }

    #[rstest]
    #[case::name("teleport 1 2", "tp 1 2")]
    #[case::alias("tp 3 4", "tp 3 4")]
    #[case::no_args("list", "list")]
    fn dispatches_by_name(#[case] command: &str, #[case] expected: &str) {
        let mut log = Vec::new();
        commands().dispatch(command, &mut log).unwrap();
        assert_eq!(log, vec![expected]);
    }

    #[test]
    fn unknown_command() {
        let error = commands().dispatch("warp 1 2", &mut Vec::new()).unwrap_err();
        assert!(matches!(
            error,
            CommandError::Parse(ParseError::UnknownCommand { ref name }) if name == "warp"
        ));
    }

    #[test]
    fn register_returns_existing_tree() {
        let mut commands = commands();
        commands.register("tp").create("home", &ParserRegistry::default()).unwrap();
        assert_eq!(commands.names().collect::<Vec<_>>(), vec!["teleport", "list"]);
        assert_eq!(commands.get("teleport").map(|tree| tree.children().len()), Some(2));
    }

    #[rstest]
    #[case::command_names("t", &["teleport", "tp"])]
    #[case::all_names("", &["teleport", "tp", "list"])]
    #[case::arguments("list m", &["mike", "milly"])]
    #[case::after_space("list ", &["mike", "milly", "art"])]
    fn suggests(#[case] command: &str, #[case] expected: &[&str]) {
        assert_eq!(commands().get_suggestions(command, &Vec::new()), expected);
    }

    #[test]
    fn usage_prefixes_command_names() {
        assert_eq!(commands().usage(), vec!["teleport @int @int", "list"]);
    }
}
