//! Template compilation errors.
//!
//! The lexer fails on broken tag structure ([`LexErrorKind`]), the parser on broken block
//! nesting and argument counts ([`ParseErrorKind`]). Both are lifted into a
//! [`TemplateError`] that carries the template source and renders a caret under the
//! offending byte.

use std::{error::Error, fmt};

/// Ways a template can fail to tokenize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// `{{` with no matching `}}`.
    UnclosedTag,
    /// `{{!` or `{{!--` with no terminator.
    UnclosedComment,
    /// A quoted literal that never ends.
    UnclosedQuote,
    /// `{{ }}`.
    EmptyTag,
    /// `{{#}}` or `{{/}}`.
    MissingBlockName,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnclosedTag => "unclosed tag",
            Self::UnclosedComment => "unclosed comment",
            Self::UnclosedQuote => "unclosed quote",
            Self::EmptyTag => "empty tag",
            Self::MissingBlockName => "missing block name",
        })
    }
}

/// Lexer error at a byte position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// What went wrong.
    pub kind: LexErrorKind,
    /// Byte offset of the tag or literal that failed.
    pub position: usize,
}

impl LexError {
    /// Creates a lexer error.
    pub fn new(kind: LexErrorKind, position: usize) -> Self {
        Self { kind, position }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.kind, self.position)
    }
}

impl Error for LexError {}

/// Ways a token stream can fail to form a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A block opener with no closer before the end of input.
    UnclosedBlock(String),
    /// `{{#open}}...{{/close}}` with different names.
    MismatchedClose {
        /// Name of the open block.
        open: String,
        /// Name in the closer.
        close: String,
    },
    /// A closer with no open block.
    StrayClose(String),
    /// `{{else}}` outside any block.
    StrayElse,
    /// A second `{{else}}` in one block.
    DuplicateElse(String),
    /// A block name other than `eq` and `if`.
    UnknownBlock(String),
    /// A block with the wrong number of operands.
    BlockArity {
        /// Block name.
        block: &'static str,
        /// Operands the block takes.
        expected: usize,
    },
    /// `{{"name" arg}}`.
    QuotedHelper,
    /// A helper call with more than one argument.
    HelperArity,
    /// A tag with no arguments.
    EmptyTag,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnclosedBlock(name) => write!(f, "unclosed block '{name}'"),
            Self::MismatchedClose { open, close } => {
                write!(f, "block '{open}' closed by '{close}'")
            }
            Self::StrayClose(name) => {
                write!(f, "unexpected {{{{/{name}}}}} without an opening block")
            }
            Self::StrayElse => f.write_str("unexpected {{else}} outside a block"),
            Self::DuplicateElse(name) => write!(f, "duplicate {{{{else}}}} in block '{name}'"),
            Self::UnknownBlock(name) => write!(f, "unknown block '{name}'"),
            Self::BlockArity { block, expected: 1 } => {
                write!(f, "#{block} takes exactly one argument")
            }
            Self::BlockArity { block, expected } => {
                write!(f, "#{block} takes exactly {expected} arguments")
            }
            Self::QuotedHelper => f.write_str("helper name must not be quoted"),
            Self::HelperArity => f.write_str("helper takes exactly one argument"),
            Self::EmptyTag => f.write_str("empty tag"),
        }
    }
}

/// Parser error, positioned at the tag that failed when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// Byte offset of the offending tag.
    pub position: Option<usize>,
}

impl ParseError {
    /// Creates a parse error.
    pub fn new(kind: ParseErrorKind, position: Option<usize>) -> Self {
        Self { kind, position }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "at byte {pos}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl Error for ParseError {}

/// The stage a template failed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateErrorKind {
    /// Tokenizing failed.
    Lex(LexErrorKind),
    /// Tokens did not form a valid template.
    Parse(ParseErrorKind),
}

impl fmt::Display for TemplateErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(kind) => kind.fmt(f),
            Self::Parse(kind) => kind.fmt(f),
        }
    }
}

/// A template that failed to compile, with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    /// What went wrong.
    pub kind: TemplateErrorKind,
    /// Byte offset of the failure, if known.
    pub position: Option<usize>,
    /// The template source.
    pub template: String,
}

impl TemplateError {
    /// Lifts a lexer error for `template`.
    pub fn from_lex(err: LexError, template: &str) -> Self {
        Self {
            kind: TemplateErrorKind::Lex(err.kind),
            position: Some(err.position),
            template: template.to_string(),
        }
    }

    /// Lifts a parser error for `template`.
    pub fn from_parse(err: ParseError, template: &str) -> Self {
        Self {
            kind: TemplateErrorKind::Parse(err.kind),
            position: err.position,
            template: template.to_string(),
        }
    }

    /// Returns a fix for the failure, where one is obvious.
    pub fn hint(&self) -> Option<&'static str> {
        match &self.kind {
            TemplateErrorKind::Lex(LexErrorKind::UnclosedTag) => Some("close the tag with }}"),
            TemplateErrorKind::Lex(LexErrorKind::UnclosedComment) => {
                Some("long comments end with --}}, short ones with }}")
            }
            TemplateErrorKind::Lex(LexErrorKind::UnclosedQuote) => {
                Some("literals end with the quote they start with")
            }
            TemplateErrorKind::Parse(
                ParseErrorKind::UnclosedBlock(_) | ParseErrorKind::MismatchedClose { .. },
            ) => Some("every {{#name ...}} needs a matching {{/name}}"),
            TemplateErrorKind::Parse(ParseErrorKind::UnknownBlock(_)) => {
                Some("supported blocks are #eq and #if")
            }
            TemplateErrorKind::Parse(ParseErrorKind::HelperArity) => {
                Some("use {{helper path}} with a single path or literal")
            }
            _ => None,
        }
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "template syntax error: {}", self.kind)?;
        writeln!(f, "  {}", self.template)?;
        if let Some(pos) = self.position {
            let column = self.template[..pos.min(self.template.len())].chars().count();
            writeln!(f, "  {}^", " ".repeat(column))?;
        }
        if let Some(hint) = self.hint() {
            write!(f, "hint: {hint}")?;
        }
        Ok(())
    }
}

impl Error for TemplateError {}
