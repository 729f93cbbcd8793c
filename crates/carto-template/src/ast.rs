//! Template abstract syntax tree.

use std::{collections::BTreeSet, fmt};

/// A dotted path such as `address.number` or `poi.properties.address`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path(Vec<String>);

impl Path {
    /// Splits a dotted string into a path. Empty segments are dropped.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split('.')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns the first segment, if any.
    pub fn head(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Returns every segment after the first.
    pub fn tail(&self) -> &[String] {
        self.0.get(1..).unwrap_or(&[])
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// An evaluable expression: a path lookup or a string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Value looked up from the render scope.
    Path(Path),
    /// A quoted literal.
    Literal(String),
}

/// A node in a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text, emitted verbatim.
    Text(String),

    /// A comment, never emitted.
    Comment(String),

    /// A field substitution such as `{{place.name}}`.
    Field(Path),

    /// A helper call such as `{{toUpper address.name}}`.
    Helper {
        /// Registered helper name.
        name: String,
        /// The single argument passed to the helper.
        arg: Expr,
    },

    /// `{{#eq left right}}then{{else}}otherwise{{/eq}}`.
    Eq {
        /// Left operand.
        left: Expr,
        /// Right operand.
        right: Expr,
        /// Rendered when the operands are equal.
        then: Vec<Self>,
        /// Rendered otherwise.
        otherwise: Vec<Self>,
    },

    /// `{{#if cond}}then{{else}}otherwise{{/if}}`; a value is truthy when non-empty.
    If {
        /// Condition operand.
        cond: Expr,
        /// Rendered when the condition is truthy.
        then: Vec<Self>,
        /// Rendered otherwise.
        otherwise: Vec<Self>,
    },
}

impl Node {
    /// Collects the head segment of every path referenced by this node and its children.
    pub(crate) fn collect_heads(&self, out: &mut BTreeSet<String>) {
        fn expr_head(expr: &Expr, out: &mut BTreeSet<String>) {
            if let Expr::Path(path) = expr
                && let Some(head) = path.head()
            {
                out.insert(head.to_string());
            }
        }

        match self {
            Self::Text(_) | Self::Comment(_) => {}
            Self::Field(path) => {
                if let Some(head) = path.head() {
                    out.insert(head.to_string());
                }
            }
            Self::Helper { arg, .. } => expr_head(arg, out),
            Self::Eq {
                left,
                right,
                then,
                otherwise,
            } => {
                expr_head(left, out);
                expr_head(right, out);
                for node in then.iter().chain(otherwise) {
                    node.collect_heads(out);
                }
            }
            Self::If {
                cond,
                then,
                otherwise,
            } => {
                expr_head(cond, out);
                for node in then.iter().chain(otherwise) {
                    node.collect_heads(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_parse_splits_on_dots() {
        let path = Path::parse("poi.properties.address");
        assert_eq!(path.segments(), ["poi", "properties", "address"]);
        assert_eq!(path.head(), Some("poi"));
        assert_eq!(path.tail(), ["properties", "address"]);
    }

    #[test]
    fn path_parse_drops_empty_segments() {
        assert_eq!(Path::parse("a..b.").segments(), ["a", "b"]);
        assert!(Path::parse("").head().is_none());
        assert!(Path::parse("").tail().is_empty());
    }

    #[test]
    fn path_display_round_trips() {
        assert_eq!(Path::parse("address.number").to_string(), "address.number");
    }

    #[test]
    fn collect_heads_walks_blocks() {
        let node = Node::Eq {
            left: Expr::Path(Path::parse("address.number")),
            right: Expr::Literal("3000".into()),
            then: vec![Node::Field(Path::parse("place.name"))],
            otherwise: vec![Node::Helper {
                name: "toUpper".into(),
                arg: Expr::Path(Path::parse("region.name")),
            }],
        };
        let mut heads = BTreeSet::new();
        node.collect_heads(&mut heads);
        assert_eq!(
            heads.into_iter().collect::<Vec<_>>(),
            vec!["address", "place", "region"]
        );
    }
}
