//! Tokenizer for spec strings.
//!
//! `-` is a legal identifier character (`mvapich-foo`, `1.4b7-rc3`), so it is
//! only lexed as a variant-off marker when it does not continue an
//! identifier: `+debug -qt_4` disables `qt_4`, while `+debug-qt_4` enables a
//! variant called `debug-qt_4`. `~` always disables.

use std::fmt;
use std::ops::Range;

use logos::Logos;
use sprig_util::errors::{SprigError, SprigResult};

/// The kind of token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    /// Package, variant, compiler or architecture name, or a version.
    #[regex(r"[a-zA-Z0-9_][a-zA-Z0-9_.\-]*")]
    Id,

    #[token("@")]
    At,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("%")]
    Percent,

    #[token("^")]
    Caret,

    #[token("+")]
    On,

    #[token("-")]
    #[token("~")]
    Off,

    #[token("=")]
    Eq,

    /// End of input; never produced by logos, appended by [`lex`].
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Id => "identifier",
            Self::At => "'@'",
            Self::Colon => "':'",
            Self::Comma => "','",
            Self::Percent => "'%'",
            Self::Caret => "'^'",
            Self::On => "'+'",
            Self::Off => "'~'",
            Self::Eq => "'='",
            Self::Eof => "end of input",
        };
        f.write_str(s)
    }
}

/// A token with its kind, source text and byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Range<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// The identifier text, or `None` for punctuation.
    ///
    /// Punctuation carries no value, so `-` and `~` compare equal here.
    pub fn value(&self) -> Option<&str> {
        (self.kind == TokenKind::Id).then_some(self.text.as_str())
    }
}

/// Tokenize a spec string. The last token is always [`TokenKind::Eof`].
pub fn lex(input: &str) -> SprigResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(kind) => tokens.push(Token::new(kind, lexer.slice(), span)),
            Err(()) => {
                return Err(SprigError::Parse {
                    message: format!("Unexpected character '{}'", lexer.slice()),
                    input: input.to_string(),
                    span: span.into(),
                });
            }
        }
    }

    tokens.push(Token::new(TokenKind::Eof, "", input.len()..input.len()));
    tracing::trace!(
        "lexed {input:?} into {:?}",
        tokens.iter().map(|t| t.kind).collect::<Vec<_>>()
    );
    Ok(tokens)
}
