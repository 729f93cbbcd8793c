//! Template parser.
//!
//! Builds a node tree from the lexer's token stream using recursive descent.
//!
//! # Grammar
//!
//! ```text
//! template → node*
//! node     → TEXT | COMMENT | TAG | block
//! block    → BLOCK_OPEN node* (ELSE node*)? BLOCK_CLOSE
//! TAG      → path                 (field reference)
//!          | name arg             (helper call)
//! ```

use std::collections::BTreeSet;

use crate::{
    ast::{Expr, Node, Path},
    error::{ParseError, ParseErrorKind, TemplateError},
    lexer::{Arg, Token, tokenize},
    render::{HelperRegistry, Scope, render_nodes},
};

/// What ended a run of nodes inside a block.
enum Terminator {
    /// `{{else}}` was consumed.
    Else,
    /// `{{/name}}` was consumed.
    Close(String),
    /// The token stream ran out.
    End,
}

/// Recursive descent parser for templates.
struct Parser {
    /// Token stream with byte offsets.
    tokens: Vec<(usize, Token)>,
    /// Current position in token stream.
    position: usize,
}

impl Parser {
    /// Creates a new parser from a token stream.
    fn new(tokens: Vec<(usize, Token)>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses the whole token stream.
    fn parse(mut self) -> Result<Vec<Node>, ParseError> {
        let (nodes, terminator) = self.parse_nodes()?;
        match terminator {
            Terminator::End => Ok(nodes),
            Terminator::Else => Err(ParseError::new(
                ParseErrorKind::StrayElse,
                self.last_offset(),
            )),
            Terminator::Close(name) => Err(ParseError::new(
                ParseErrorKind::StrayClose(name),
                self.last_offset(),
            )),
        }
    }

    /// Parses nodes until `{{else}}`, a block close, or the end of input.
    fn parse_nodes(&mut self) -> Result<(Vec<Node>, Terminator), ParseError> {
        let mut nodes = Vec::new();

        while let Some((offset, token)) = self.next() {
            match token {
                Token::Text(text) => nodes.push(Node::Text(text)),
                Token::Comment(text) => nodes.push(Node::Comment(text)),
                Token::Tag(args) => nodes.push(parse_tag(args, offset)?),
                Token::BlockOpen { name, args } => {
                    nodes.push(self.parse_block(&name, args, offset)?);
                }
                Token::Else => return Ok((nodes, Terminator::Else)),
                Token::BlockClose(name) => return Ok((nodes, Terminator::Close(name))),
            }
        }

        Ok((nodes, Terminator::End))
    }

    /// Parses the body of a block whose opener has already been consumed.
    fn parse_block(
        &mut self,
        name: &str,
        args: Vec<Arg>,
        offset: usize,
    ) -> Result<Node, ParseError> {
        let (then, terminator) = self.parse_nodes()?;
        let otherwise = match terminator {
            Terminator::Else => {
                let (otherwise, terminator) = self.parse_nodes()?;
                match terminator {
                    Terminator::Close(closed) => {
                        check_close(name, &closed, self.last_offset())?;
                        otherwise
                    }
                    Terminator::Else => {
                        return Err(ParseError::new(
                            ParseErrorKind::DuplicateElse(name.to_string()),
                            self.last_offset(),
                        ));
                    }
                    Terminator::End => {
                        return Err(ParseError::new(
                            ParseErrorKind::UnclosedBlock(name.to_string()),
                            Some(offset),
                        ));
                    }
                }
            }
            Terminator::Close(closed) => {
                check_close(name, &closed, self.last_offset())?;
                Vec::new()
            }
            Terminator::End => {
                return Err(ParseError::new(
                    ParseErrorKind::UnclosedBlock(name.to_string()),
                    Some(offset),
                ));
            }
        };

        let mut operands = args.into_iter().map(expr_from_arg);
        match name {
            "eq" => {
                let (Some(left), Some(right), None) =
                    (operands.next(), operands.next(), operands.next())
                else {
                    return Err(ParseError::new(
                        ParseErrorKind::BlockArity {
                            block: "eq",
                            expected: 2,
                        },
                        Some(offset),
                    ));
                };
                Ok(Node::Eq {
                    left,
                    right,
                    then,
                    otherwise,
                })
            }
            "if" => {
                let (Some(cond), None) = (operands.next(), operands.next()) else {
                    return Err(ParseError::new(
                        ParseErrorKind::BlockArity {
                            block: "if",
                            expected: 1,
                        },
                        Some(offset),
                    ));
                };
                Ok(Node::If {
                    cond,
                    then,
                    otherwise,
                })
            }
            other => Err(ParseError::new(
                ParseErrorKind::UnknownBlock(other.to_string()),
                Some(offset),
            )),
        }
    }

    /// Consumes and returns the next token.
    fn next(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Returns the offset of the most recently consumed token.
    fn last_offset(&self) -> Option<usize> {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(offset, _)| *offset)
    }
}

/// Checks that a block close matches its opener.
fn check_close(open: &str, close: &str, offset: Option<usize>) -> Result<(), ParseError> {
    if open == close {
        Ok(())
    } else {
        Err(ParseError::new(
            ParseErrorKind::MismatchedClose {
                open: open.to_string(),
                close: close.to_string(),
            },
            offset,
        ))
    }
}

/// Converts a lexer argument into an expression.
fn expr_from_arg(arg: Arg) -> Expr {
    match arg {
        Arg::Path(raw) => Expr::Path(Path::parse(&raw)),
        Arg::Literal(text) => Expr::Literal(text),
    }
}

/// Parses a plain tag into a field reference, literal, or helper call.
fn parse_tag(args: Vec<Arg>, offset: usize) -> Result<Node, ParseError> {
    let mut args = args.into_iter();
    match (args.next(), args.next(), args.next()) {
        (Some(Arg::Path(raw)), None, None) => Ok(Node::Field(Path::parse(&raw))),
        (Some(Arg::Literal(text)), None, None) => Ok(Node::Text(text)),
        (Some(Arg::Path(name)), Some(arg), None) => Ok(Node::Helper {
            name,
            arg: expr_from_arg(arg),
        }),
        (Some(Arg::Literal(_)), Some(_), _) => {
            Err(ParseError::new(ParseErrorKind::QuotedHelper, Some(offset)))
        }
        (Some(_), _, Some(_)) => Err(ParseError::new(ParseErrorKind::HelperArity, Some(offset))),
        (None, _, _) => Err(ParseError::new(ParseErrorKind::EmptyTag, Some(offset))),
    }
}

/// A compiled label template.
///
/// Compile once, render many times: the node tree is immutable and can be shared across
/// threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// The template source.
    source: String,
    /// The parsed node tree.
    nodes: Vec<Node>,
}

impl Template {
    /// Compiles a template string.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let nodes = parse(source)?;
        Ok(Self {
            source: source.to_string(),
            nodes,
        })
    }

    /// Returns the template source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the first segment of every path the template references.
    ///
    /// For label templates this is the set of administrative levels the label needs,
    /// e.g. `{"address", "place"}` for `{{address.name}}, {{place.name}}`.
    pub fn levels(&self) -> BTreeSet<String> {
        let mut heads = BTreeSet::new();
        for node in &self.nodes {
            node.collect_heads(&mut heads);
        }
        heads
    }

    /// Renders the template against a scope.
    ///
    /// Rendering never fails: unresolved paths and unknown helpers produce empty strings.
    pub fn render<S: Scope + ?Sized>(&self, scope: &S, helpers: &HelperRegistry) -> String {
        let mut out = String::with_capacity(self.source.len());
        render_nodes(&self.nodes, scope, helpers, &mut out);
        out
    }
}

/// Parses a template string into nodes.
pub fn parse(input: &str) -> Result<Vec<Node>, TemplateError> {
    let tokens = tokenize(input).map_err(|e| TemplateError::from_lex(e, input))?;
    Parser::new(tokens)
        .parse()
        .map_err(|e| TemplateError::from_parse(e, input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LexErrorKind, TemplateErrorKind};

    fn field(raw: &str) -> Node {
        Node::Field(Path::parse(raw))
    }

    fn path(raw: &str) -> Expr {
        Expr::Path(Path::parse(raw))
    }

    fn text(s: &str) -> Node {
        Node::Text(s.into())
    }

    #[test]
    fn empty_template() {
        assert_eq!(parse("").unwrap(), vec![]);
    }

    #[test]
    fn literal_only() {
        assert_eq!(parse("Somewhere").unwrap(), vec![text("Somewhere")]);
    }

    #[test]
    fn fields_and_text() {
        assert_eq!(
            parse("{{address.number}} {{address.name}}").unwrap(),
            vec![field("address.number"), text(" "), field("address.name")]
        );
    }

    #[test]
    fn quoted_tag_is_text() {
        assert_eq!(parse("{{\"x\"}}").unwrap(), vec![text("x")]);
    }

    #[test]
    fn helper_call() {
        assert_eq!(
            parse("{{toUpper address.name}}").unwrap(),
            vec![Node::Helper {
                name: "toUpper".into(),
                arg: path("address.name"),
            }]
        );
    }

    #[test]
    fn helper_with_literal_argument() {
        assert_eq!(
            parse("{{toUpper \"abc\"}}").unwrap(),
            vec![Node::Helper {
                name: "toUpper".into(),
                arg: Expr::Literal("abc".into()),
            }]
        );
    }

    #[test]
    fn eq_with_else() {
        let source =
            "{{#eq address.number \"3000\"}}3000!{{else}}{{hyphenated address.number}}{{/eq}}";
        let nodes = parse(source).unwrap();
        assert_eq!(
            nodes,
            vec![Node::Eq {
                left: path("address.number"),
                right: Expr::Literal("3000".into()),
                then: vec![text("3000!")],
                otherwise: vec![Node::Helper {
                    name: "hyphenated".into(),
                    arg: path("address.number"),
                }],
            }]
        );
    }

    #[test]
    fn eq_without_else() {
        assert_eq!(
            parse("{{#eq a b}}same{{/eq}}").unwrap(),
            vec![Node::Eq {
                left: path("a"),
                right: path("b"),
                then: vec![text("same")],
                otherwise: vec![],
            }]
        );
    }

    #[test]
    fn nested_blocks() {
        let nodes = parse("{{#if a}}{{#eq a \"x\"}}X{{/eq}}{{else}}none{{/if}}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::If {
                cond: path("a"),
                then: vec![Node::Eq {
                    left: path("a"),
                    right: Expr::Literal("x".into()),
                    then: vec![text("X")],
                    otherwise: vec![],
                }],
                otherwise: vec![text("none")],
            }]
        );
    }

    #[test]
    fn comment_node_is_kept() {
        assert_eq!(
            parse("{{!-- comment --}} {{region.name}}").unwrap(),
            vec![Node::Comment("comment".into()), text(" "), field("region.name")]
        );
    }

    #[test]
    fn unclosed_block_error() {
        let err = parse("x {{#eq a b}}yes").unwrap_err();
        assert_eq!(
            err.kind,
            TemplateErrorKind::Parse(ParseErrorKind::UnclosedBlock("eq".into()))
        );
        assert_eq!(err.position, Some(2));
    }

    #[test]
    fn mismatched_close_error() {
        let err = parse("{{#eq a b}}yes{{/if}}").unwrap_err();
        assert_eq!(
            err.kind,
            TemplateErrorKind::Parse(ParseErrorKind::MismatchedClose {
                open: "eq".into(),
                close: "if".into(),
            })
        );
        assert_eq!(err.position, Some(14));
    }

    #[test]
    fn stray_else_error() {
        let err = parse("a{{else}}b").unwrap_err();
        assert_eq!(err.kind, TemplateErrorKind::Parse(ParseErrorKind::StrayElse));
    }

    #[test]
    fn stray_close_error() {
        let err = parse("a{{/eq}}").unwrap_err();
        assert_eq!(
            err.kind,
            TemplateErrorKind::Parse(ParseErrorKind::StrayClose("eq".into()))
        );
    }

    #[test]
    fn duplicate_else_error() {
        let err = parse("{{#if a}}1{{else}}2{{else}}3{{/if}}").unwrap_err();
        assert_eq!(
            err.kind,
            TemplateErrorKind::Parse(ParseErrorKind::DuplicateElse("if".into()))
        );
    }

    #[test]
    fn eq_arity_error() {
        let err = parse("{{#eq a}}x{{/eq}}").unwrap_err();
        assert!(err.to_string().contains("#eq takes exactly 2 arguments"));
    }

    #[test]
    fn unknown_block_error() {
        let err = parse("{{#each a}}x{{/each}}").unwrap_err();
        assert_eq!(
            err.kind,
            TemplateErrorKind::Parse(ParseErrorKind::UnknownBlock("each".into()))
        );
        assert!(err.hint().is_some());
    }

    #[test]
    fn helper_arity_error() {
        let err = parse("{{toUpper a b}}").unwrap_err();
        assert_eq!(err.kind, TemplateErrorKind::Parse(ParseErrorKind::HelperArity));
    }

    #[test]
    fn parse_error_carries_template() {
        let err = parse("{{#if a}}").unwrap_err();
        assert_eq!(err.template, "{{#if a}}");
    }

    #[test]
    fn lex_error_propagates() {
        let err = parse("{{place.name").unwrap_err();
        assert_eq!(err.kind, TemplateErrorKind::Lex(LexErrorKind::UnclosedTag));
        assert_eq!(err.template, "{{place.name");
    }

    #[test]
    fn template_levels() {
        let template = Template::compile(
            "{{!-- x --}}{{address.number}} {{toUpper address.name}}, {{place.name}} {{#if postcode.name}}{{postcode.name}}{{/if}}",
        )
        .unwrap();
        assert_eq!(
            template.levels().into_iter().collect::<Vec<_>>(),
            vec!["address", "place", "postcode"]
        );
    }

    #[test]
    fn template_keeps_source() {
        let template = Template::compile("{{place.name}}").unwrap();
        assert_eq!(template.source(), "{{place.name}}");
    }
}
