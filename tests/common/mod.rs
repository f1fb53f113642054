#![allow(dead_code)]

use chain_commands::{Arguments, ParsedLine, ParserTreeResult, TreeNode, Value};

/// Every handler call made during a test, in order.
#[derive(Debug, Default)]
pub struct Calls {
    pub calls: Vec<(String, Vec<Option<Value>>)>,
}

impl Calls {
    pub fn tags(&self) -> Vec<&str> {
        self.calls.iter().map(|(tag, _)| tag.as_str()).collect()
    }

    pub fn last_args(&self) -> Vec<Option<Value>> {
        self.calls
            .last()
            .map(|(_, args)| args.clone())
            .unwrap_or_default()
    }
}

/// An execute handler recording `tag` and the arguments it received.
pub fn record(tag: &'static str) -> impl Fn(&mut Calls, &Arguments) -> anyhow::Result<()> {
    move |calls: &mut Calls, args: &Arguments| {
        let values = args.iter().map(|value| value.cloned()).collect();
        calls.calls.push((tag.to_owned(), values));
        Ok(())
    }
}

pub fn parse(tree: &TreeNode<Calls>, input: &str) -> ParserTreeResult<Calls> {
    tree.parse(&ParsedLine::new(input), &Calls::default())
}

/// Parses and executes `input`, returning the calls made.
pub fn run(tree: &TreeNode<Calls>, input: &str) -> Calls {
    let mut calls = Calls::default();
    parse(tree, input)
        .execute(&mut calls)
        .unwrap_or_else(|e| panic!("{:?} failed: {}", input, e));
    calls
}

pub fn strings(values: &[&str]) -> Vec<Option<Value>> {
    values.iter().map(|value| Some(Value::from(*value))).collect()
}
