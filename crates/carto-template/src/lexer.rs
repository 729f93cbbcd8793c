//! Template lexer.
//!
//! Splits a template string into literal text and `{{ ... }}` tags. Tag contents are
//! broken into whitespace-separated arguments; double- or single-quoted arguments are
//! string literals, everything else is a dotted path.

use crate::error::{LexError, LexErrorKind};

/// Opening delimiter of a tag.
const OPEN: &str = "{{";

/// Closing delimiter of a tag.
const CLOSE: &str = "}}";

/// An argument inside a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// A dotted path such as `address.number`.
    Path(String),
    /// A quoted string literal (quotes stripped).
    Literal(String),
}

/// A token in the template language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text between tags.
    Text(String),

    /// A comment tag; the content is kept for diagnostics only.
    Comment(String),

    /// A block opener such as `{{#eq a b}}`.
    BlockOpen {
        /// Block name (`eq`, `if`).
        name: String,
        /// Block arguments.
        args: Vec<Arg>,
    },

    /// The `{{else}}` separator.
    Else,

    /// A block closer such as `{{/eq}}`.
    BlockClose(String),

    /// A plain tag: a field reference (`{{a.b}}`) or helper call (`{{helper a.b}}`).
    Tag(Vec<Arg>),
}

/// Tokenizes a template string.
struct Lexer<'a> {
    /// The original input string.
    input: &'a str,
    /// Current byte position in input.
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    /// Returns the unconsumed part of the input.
    fn rest(&self) -> &'a str {
        let input = self.input;
        &input[self.position..]
    }

    /// Tokenizes the entire input, returning each token with its byte offset.
    fn tokenize(mut self) -> Result<Vec<(usize, Token)>, LexError> {
        let mut tokens = Vec::new();

        while self.position < self.input.len() {
            let start = self.position;
            match self.rest().find(OPEN) {
                Some(0) => tokens.push((start, self.read_tag()?)),
                Some(offset) => {
                    let text = &self.rest()[..offset];
                    self.position += offset;
                    tokens.push((start, Token::Text(text.to_string())));
                }
                None => {
                    tokens.push((start, Token::Text(self.rest().to_string())));
                    self.position = self.input.len();
                }
            }
        }

        Ok(tokens)
    }

    /// Reads one `{{ ... }}` tag starting at the current position.
    fn read_tag(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        self.position += OPEN.len();

        if self.rest().starts_with("!--") {
            return self.read_comment(start, "!--", "--}}");
        }
        if self.rest().starts_with('!') {
            return self.read_comment(start, "!", CLOSE);
        }

        let body_start = self.position;
        let body_end = self.find_close(start)?;
        let body = self.input[body_start..body_end].trim();
        self.position = body_end + CLOSE.len();

        if body.is_empty() {
            return Err(LexError::new(LexErrorKind::EmptyTag, start));
        }

        if let Some(block) = body.strip_prefix('#') {
            let mut args = split_args(block, body_start)?;
            let name = match args.first() {
                Some(Arg::Path(name)) => name.clone(),
                _ => return Err(LexError::new(LexErrorKind::MissingBlockName, start)),
            };
            args.remove(0);
            return Ok(Token::BlockOpen { name, args });
        }

        if let Some(name) = body.strip_prefix('/') {
            let name = name.trim();
            if name.is_empty() {
                return Err(LexError::new(LexErrorKind::MissingBlockName, start));
            }
            return Ok(Token::BlockClose(name.to_string()));
        }

        if body == "else" {
            return Ok(Token::Else);
        }

        let args = split_args(body, body_start)?;
        Ok(Token::Tag(args))
    }

    /// Reads a comment tag, consuming everything up to `terminator`.
    fn read_comment(
        &mut self,
        start: usize,
        marker: &str,
        terminator: &str,
    ) -> Result<Token, LexError> {
        self.position += marker.len();
        let Some(end) = self.rest().find(terminator) else {
            return Err(LexError::new(LexErrorKind::UnclosedComment, start));
        };
        let content = self.rest()[..end].trim().to_string();
        self.position += end + terminator.len();
        Ok(Token::Comment(content))
    }

    /// Finds the byte offset of the `}}` closing the current tag, skipping quoted strings.
    fn find_close(&self, start: usize) -> Result<usize, LexError> {
        let mut quote: Option<char> = None;
        for (offset, ch) in self.rest().char_indices() {
            match quote {
                Some(q) if ch == q => quote = None,
                Some(_) => {}
                None if ch == '"' || ch == '\'' => quote = Some(ch),
                None if self.rest()[offset..].starts_with(CLOSE) => {
                    return Ok(self.position + offset);
                }
                None => {}
            }
        }

        let kind = if quote.is_some() {
            LexErrorKind::UnclosedQuote
        } else {
            LexErrorKind::UnclosedTag
        };
        Err(LexError::new(kind, start))
    }
}

/// Splits tag contents into arguments.
///
/// `base` is the byte offset of `body` in the template, used for error positions.
fn split_args(body: &str, base: usize) -> Result<Vec<Arg>, LexError> {
    let mut args = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '"' || ch == '\'' {
            chars.next();
            let mut literal = String::new();
            let mut closed = false;
            for (_, c) in chars.by_ref() {
                if c == ch {
                    closed = true;
                    break;
                }
                literal.push(c);
            }
            if !closed {
                return Err(LexError::new(LexErrorKind::UnclosedQuote, base + offset));
            }
            args.push(Arg::Literal(literal));
            continue;
        }

        let mut word = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() || c == '"' || c == '\'' {
                break;
            }
            word.push(c);
            chars.next();
        }
        args.push(Arg::Path(word));
    }

    Ok(args)
}

/// Convenience function to tokenize a template string.
pub fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, LexError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|(_, t)| t).collect()
    }

    fn path(s: &str) -> Arg {
        Arg::Path(s.into())
    }

    #[test]
    fn empty_input() {
        assert_eq!(tokens(""), vec![]);
    }

    #[test]
    fn plain_text() {
        assert_eq!(tokens("hello, world"), vec![Token::Text("hello, world".into())]);
    }

    #[test]
    fn single_field() {
        assert_eq!(tokens("{{place.name}}"), vec![Token::Tag(vec![path("place.name")])]);
    }

    #[test]
    fn field_with_padding() {
        assert_eq!(tokens("{{  place.name }}"), vec![Token::Tag(vec![path("place.name")])]);
    }

    #[test]
    fn text_between_fields() {
        assert_eq!(
            tokens("{{address.number}} {{address.name}}, "),
            vec![
                Token::Tag(vec![path("address.number")]),
                Token::Text(" ".into()),
                Token::Tag(vec![path("address.name")]),
                Token::Text(", ".into()),
            ]
        );
    }

    #[test]
    fn helper_call() {
        assert_eq!(
            tokens("{{toUpper address.name}}"),
            vec![Token::Tag(vec![path("toUpper"), path("address.name")])]
        );
    }

    #[test]
    fn eq_block() {
        assert_eq!(
            tokens("{{#eq address.number \"3000\"}}yes{{else}}no{{/eq}}"),
            vec![
                Token::BlockOpen {
                    name: "eq".into(),
                    args: vec![path("address.number"), Arg::Literal("3000".into())],
                },
                Token::Text("yes".into()),
                Token::Else,
                Token::Text("no".into()),
                Token::BlockClose("eq".into()),
            ]
        );
    }

    #[test]
    fn single_quoted_literal() {
        assert_eq!(
            tokens("{{#eq a 'b c'}}{{/eq}}"),
            vec![
                Token::BlockOpen {
                    name: "eq".into(),
                    args: vec![path("a"), Arg::Literal("b c".into())],
                },
                Token::BlockClose("eq".into()),
            ]
        );
    }

    #[test]
    fn long_comment() {
        assert_eq!(
            tokens("{{!-- comment --}} {{region.name}}"),
            vec![
                Token::Comment("comment".into()),
                Token::Text(" ".into()),
                Token::Tag(vec![path("region.name")]),
            ]
        );
    }

    #[test]
    fn long_comment_may_contain_braces() {
        assert_eq!(
            tokens("{{!-- {{place.name}} --}}"),
            vec![Token::Comment("{{place.name}}".into())]
        );
    }

    #[test]
    fn short_comment() {
        assert_eq!(
            tokens("{{! note }}x"),
            vec![Token::Comment("note".into()), Token::Text("x".into())]
        );
    }

    #[test]
    fn closing_braces_inside_literal() {
        assert_eq!(
            tokens("{{#eq a \"}}\"}}{{/eq}}"),
            vec![
                Token::BlockOpen {
                    name: "eq".into(),
                    args: vec![path("a"), Arg::Literal("}}".into())],
                },
                Token::BlockClose("eq".into()),
            ]
        );
    }

    #[test]
    fn positions_are_byte_offsets() {
        let spanned = tokenize("ab{{c}}").unwrap();
        assert_eq!(spanned[0].0, 0);
        assert_eq!(spanned[1].0, 2);
    }

    #[test]
    fn unclosed_tag_error() {
        let err = tokenize("x {{place.name").unwrap_err();
        assert_eq!(err, LexError::new(LexErrorKind::UnclosedTag, 2));
    }

    #[test]
    fn unclosed_comment_error() {
        let err = tokenize("{{!-- never ends }}").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnclosedComment);
    }

    #[test]
    fn unclosed_quote_error() {
        let err = tokenize("{{#eq a \"b}}").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnclosedQuote);
    }

    #[test]
    fn empty_tag_error() {
        let err = tokenize("{{ }}").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::EmptyTag);
    }

    #[test]
    fn block_without_name_error() {
        let err = tokenize("{{# }}").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::MissingBlockName);
        let err = tokenize("x{{/}}").unwrap_err();
        assert_eq!(err, LexError::new(LexErrorKind::MissingBlockName, 1));
    }

    #[test]
    fn lone_closing_braces_are_text() {
        assert_eq!(tokens("a }} b"), vec![Token::Text("a }} b".into())]);
    }
}
