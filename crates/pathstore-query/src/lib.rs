//! Store path query language.
//!
//! This crate provides parsing and evaluation of compact path
//! expressions for selecting, renaming, and filtering values out of a
//! nested data tree:
//!
//! ```text
//! Expression   := Segment ('|' Segment)*
//! Segment      := FilteredPath ('--' Alias)?
//! FilteredPath := Path (':just(' List ')' | ':not(' List ')')?
//! Path         := StoreName ('.' PathElement)*
//! PathElement  := Identifier | '[' Key ':' Value ']'
//! List         := Item (',' Item)*
//! ```
//!
//! Both halves are pure: the parser turns text into [`Query`]
//! descriptors with no side effects, and [`PathEval`] resolves a
//! descriptor against a snapshot without mutating or retaining it.
//!
//! # Example
//!
//! ```
//! use pathstore_query::{parse, PathEval};
//! use serde_json::json;
//!
//! let parsed = parse("User.contacts.[id:2]:just(name)").unwrap();
//! let query = &parsed.queries()[0];
//!
//! let data = json!({"contacts": [
//!     {"id": "1", "name": "Jesse"},
//!     {"id": "2", "name": "Sam"}
//! ]});
//!
//! assert_eq!(PathEval::resolve(query, &data), Some(json!("Sam")));
//! ```

mod types;
pub use types::*;

mod parser;
pub use parser::{parse, ParseError};

mod eval;
pub use eval::PathEval;

mod util;
pub use util::{accessed_stores, query_to_string};
