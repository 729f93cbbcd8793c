//! Label templates for carto.
//!
//! Templates turn a resolved chain of administrative records into a display label. The
//! language is a small Handlebars-like subset:
//!
//! - **Literals**: `, ` - copied verbatim
//! - **Fields**: `{{address.name}}` - a value from a named level, `{{name}}` from the anchor
//! - **Helpers**: `{{toUpper address.name}}` - a registered string transform
//! - **Equality**: `{{#eq address.number "3000"}}...{{else}}...{{/eq}}`
//! - **Truthiness**: `{{#if postcode.name}}...{{/if}}`
//! - **Comments**: `{{!-- ignored --}}` or `{{! ignored }}`
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use carto_template::{HelperRegistry, Path, Template};
//!
//! let template = Template::compile("{{toUpper address.name}}, {{place.name}}").unwrap();
//!
//! let mut values = HashMap::new();
//! values.insert("address.name".to_string(), "Quincy Lane".to_string());
//! let scope = |path: &Path| values.get(&path.to_string()).cloned();
//!
//! let helpers = HelperRegistry::with_builtins();
//! assert_eq!(template.render(&scope, &helpers), "QUINCY LANE, ");
//! ```

#![warn(missing_docs)]

mod ast;
mod error;
mod lexer;
mod parser;
mod render;

pub use ast::{Expr, Node, Path};
pub use error::{
    LexError, LexErrorKind, ParseError, ParseErrorKind, TemplateError, TemplateErrorKind,
};
pub use lexer::{Arg, Token, tokenize};
pub use parser::{Template, parse};
pub use render::{HelperFn, HelperRegistry, Scope, tidy_label};
