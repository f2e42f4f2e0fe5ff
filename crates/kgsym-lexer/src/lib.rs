//! Lexical analysis for kgsym
//!
//! Two token sets share one span-tracking lexer: `Token` for infix
//! expressions such as `Sum(i**2, (i, 1, n))` and `LatexToken` for LaTeX
//! formulas such as `\sum_{i=1}^{n} i^2`.

mod latex;

pub use latex::LatexToken;

use kgsym_ast::Span;
use logos::Logos;

/// Infix expression tokens
#[derive(Logos, Debug, PartialEq, Eq, Clone)]
pub enum Token {
    /// Identifier: symbol or function name
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),

    #[regex(r"[0-9]+", |lex| lex.slice().to_owned())]
    Integer(String),

    /// Decimal or exponent notation, must contain `.` or `e`
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().to_owned())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().to_owned())]
    Float(String),

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    /// Power operator (**)
    #[token("**")]
    DoubleStar,

    /// Alternative power operator (^)
    #[token("^")]
    Caret,

    #[token("/")]
    Slash,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token(",")]
    Comma,

    /// Whitespace (ignored)
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Whitespace,

    /// End of input
    Eof,

    /// Lexer error
    Error,
}

/// Token kinds that have end-of-input and error markers
pub trait Terminal {
    fn eof() -> Self;
    fn error() -> Self;
}

impl Terminal for Token {
    fn eof() -> Self {
        Self::Eof
    }

    fn error() -> Self {
        Self::Error
    }
}

/// Token with location information
#[derive(Debug, Clone)]
pub struct SpannedToken<T = Token> {
    pub token: T,
    pub span: Span,
    pub text: String,
}

/// Lexer that produces tokens with spans
pub struct Lexer<'input, T: Logos<'input>> {
    lexer: logos::Lexer<'input, T>,
    input: &'input str,
}

/// Lexer for infix expressions
pub type InfixLexer<'input> = Lexer<'input, Token>;

/// Lexer for LaTeX formulas
pub type LatexLexer<'input> = Lexer<'input, LatexToken>;

impl<'input, T> Lexer<'input, T>
where
    T: Logos<'input, Source = str, Error = ()> + Terminal + PartialEq,
    T::Extras: Default,
{
    #[must_use]
    pub fn new(input: &'input str) -> Self {
        Self {
            lexer: T::lexer(input),
            input,
        }
    }

    /// Get the next token with span information
    pub fn next_token(&mut self) -> SpannedToken<T> {
        match self.lexer.next() {
            Some(result) => {
                let span = self.lexer.span();
                let text = self.input[span.clone()].to_string();
                SpannedToken {
                    token: result.unwrap_or_else(|()| T::error()),
                    span: Span::new(span.start, span.end),
                    text,
                }
            }
            None => SpannedToken {
                token: T::eof(),
                span: Span::new(self.input.len(), self.input.len()),
                text: String::new(),
            },
        }
    }

    /// Tokenize the entire input, ending with an end-of-input token
    pub fn tokenize(&mut self) -> Vec<SpannedToken<T>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.token == T::eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
