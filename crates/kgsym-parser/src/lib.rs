//! Parsers for kgsym expressions
//!
//! Infix text such as `a + b*(a + c)` goes through a LALRPOP grammar fed by
//! the logos lexer. LaTeX formulas go through a hand-written recursive
//! descent parser in [`latex`]. Both produce canonical [`Expr`] trees whose
//! symbols are unbound; [`resolver`] binds them to graph items.

use kgsym_ast::{Expr, KgError, SourceMap, Span};
use kgsym_lexer::{InfixLexer, SpannedToken, Token};
use lalrpop_util::ParseError;

// Include the generated LALRPOP parser
lalrpop_util::lalrpop_mod!(
    #[allow(unused_imports, unused_variables, clippy::all, clippy::pedantic, clippy::nursery)]
    pub infix
);

pub mod builder;
pub mod latex;
pub mod resolver;

pub use latex::LatexParser;
pub use resolver::{BoundRole, Candidate, FreshSymbol, Resolved, SymbolResolver};

use builder::ActionError;

/// Deepest bracket nesting either parser accepts
pub const MAX_NESTING: usize = 64;

pub struct Parser {
    input: String,
    source_map: SourceMap,
    filename: String,
    tokens: Vec<SpannedToken>,
}

impl Parser {
    /// Create a new parser for the given input
    ///
    /// # Errors
    ///
    /// Returns `KgError` if there are lexical errors in the input
    pub fn new(input: &str) -> Result<Self, KgError> {
        Self::new_with_filename(input, "<expr>")
    }

    /// Create a new parser for the given input with a filename
    ///
    /// # Errors
    ///
    /// Returns `KgError` if there are lexical errors in the input
    pub fn new_with_filename(input: &str, filename: &str) -> Result<Self, KgError> {
        let source_map = SourceMap::new(input);

        let mut lexer = InfixLexer::new(input);
        let tokens = lexer.tokenize();

        for token in &tokens {
            if token.token == Token::Error {
                return Err(KgError::syntax(
                    format!("Unexpected character: {}", token.text),
                    token.span,
                    &source_map,
                    filename,
                ));
            }
        }

        Ok(Self {
            input: input.to_string(),
            source_map,
            filename: filename.to_string(),
            tokens,
        })
    }

    /// Parse the input into a canonical expression
    ///
    /// # Errors
    ///
    /// Returns `KgError` if there are syntax errors during parsing
    pub fn parse(&self) -> Result<Expr, KgError> {
        self.check_nesting()?;

        // Convert tokens to the triples LALRPOP expects, dropping the end marker
        let lalrpop_tokens: Vec<Result<(usize, Token, usize), ActionError>> = self
            .tokens
            .iter()
            .filter(|token| token.token != Token::Eof)
            .map(|token| Ok((token.span.start, token.token.clone(), token.span.end)))
            .collect();

        let parser = infix::ExpressionParser::new();
        let expr = parser
            .parse(lalrpop_tokens)
            .map_err(|err| self.convert_error(err))?;
        tracing::debug!(input = %self.input, %expr, "parsed infix expression");
        Ok(expr)
    }

    fn check_nesting(&self) -> Result<(), KgError> {
        let mut depth = 0usize;
        for token in &self.tokens {
            match token.token {
                Token::LeftParen => depth += 1,
                Token::RightParen => depth = depth.saturating_sub(1),
                _ => continue,
            }
            if depth > MAX_NESTING {
                return Err(KgError::syntax(
                    format!("Expression nests deeper than {MAX_NESTING} levels"),
                    token.span,
                    &self.source_map,
                    &self.filename,
                ));
            }
        }
        Ok(())
    }

    fn convert_error(&self, err: ParseError<usize, Token, ActionError>) -> KgError {
        let (message, span) = match err {
            ParseError::InvalidToken { location } => {
                ("Invalid token".to_string(), Span::new(location, location))
            }
            ParseError::UnrecognizedEof { location, expected } => (
                format!("Unexpected end of input, expected {}", expected.join(" or ")),
                Span::new(location, location),
            ),
            ParseError::UnrecognizedToken {
                token: (start, _, end),
                expected,
            } => (
                format!(
                    "Unexpected {}, expected {}",
                    &self.input[start..end],
                    expected.join(" or ")
                ),
                Span::new(start, end),
            ),
            ParseError::ExtraToken {
                token: (start, _, end),
            } => (
                format!("Unexpected {}", &self.input[start..end]),
                Span::new(start, end),
            ),
            ParseError::User { error } => (error.message, error.span),
        };
        KgError::syntax(message, span, &self.source_map, &self.filename)
    }
}

/// Parse an infix expression
///
/// # Errors
///
/// Returns `KgError::Syntax` on lexical or syntax errors
pub fn parse_expr(input: &str) -> Result<Expr, KgError> {
    Parser::new(input)?.parse()
}

/// Parse a LaTeX formula
///
/// # Errors
///
/// Returns `KgError::Syntax` on lexical or syntax errors
pub fn parse_latex(input: &str) -> Result<Expr, KgError> {
    LatexParser::new(input)?.parse()
}
