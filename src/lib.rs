#![warn(missing_docs)]

//! Matches command lines against trees of argument chains.
//!
//! A chain is declared in a small spec language, e.g. `give @string @int(min=1,max=64)`, where
//! each space separated node is either a literal such as `give` or `mike|milly`, or a typed
//! argument selected with `@kind`. Parenthesized parameters configure the argument:
//! `required`, `default`, `suppress`, `switch`, `description`, `placeholder`, plus `options`
//! for strings and `min`/`max` for numbers.
//!
//! Chains hang off [`TreeNode`]s together with execute, error, complete and fallback handlers.
//! Parsing a line walks the whole tree once and yields a [`ParserTreeResult`] holding the best
//! execution, the best error and every completion group found on the way. When several paths
//! match, the one which consumed the most words wins, and on ties the first declared.
//!
//! ```
//! use chain_commands::{Arguments, ParsedLine, ParserRegistry, TreeNode};
//!
//! let registry = ParserRegistry::default();
//! let mut root = TreeNode::<Vec<i64>>::root();
//! root.create_chain("add @int @int", &registry)
//!     .unwrap()
//!     .on_execute(|sums: &mut Vec<i64>, args: &Arguments| {
//!         sums.push(args.int(1).unwrap_or(0) + args.int(2).unwrap_or(0));
//!         Ok(())
//!     });
//!
//! let mut sums = Vec::new();
//! root.parse(&ParsedLine::new("add 2 3"), &sums)
//!     .execute(&mut sums)
//!     .unwrap();
//! assert_eq!(sums, vec![5]);
//! ```

mod arg;
mod chain;
mod completion;
mod error;
mod line;
mod module;
mod result;
pub mod tokenizer;
mod tree;

pub use arg::*;
pub use chain::*;
pub use completion::*;
pub use error::*;
pub use line::*;
pub use module::*;
pub use result::*;
pub use tree::{
    CompleteHandler,
    ErrorHandler,
    ExecuteHandler,
    FallbackHandler,
    Guard,
    Iter as TreeIter,
    TreeNode,
};
