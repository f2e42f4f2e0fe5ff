//! Recursive descent parser for LaTeX formulas.
//!
//! Supported notation:
//! - `+ - * / \cdot \times \div`, juxtaposition as multiplication
//! - `^{...}` powers, `x_1` and `x_{ij}` subscripted names
//! - `\frac{a}{b}`, `\sqrt{x}`, `\sqrt[n]{x}`, `\left( ... \right)`
//! - `\sum_{i=1}^{n}` with a term-level summand
//! - `\int f \, dx` and `\int_a^b f \, dx`
//! - `\frac{d}{dx} f`, `\frac{d f}{d x}` and the `\partial` forms
//! - `\sin \cos \tan \exp \ln \log`, `\operatorname{f}(x)`
//!
//! Other control words such as `\alpha` become symbols named without the
//! backslash.

use kgsym_ast::{Expr, KgError, Number, SourceMap, Symbol};
use kgsym_lexer::{LatexLexer, LatexToken, SpannedToken};

use crate::{MAX_NESTING, builder};

/// Control words with structural meaning. Everything else is a symbol.
const STRUCTURAL_COMMANDS: &[&str] = &[
    "frac", "dfrac", "tfrac", "sqrt", "sum", "int", "left", "right", "cdot", "times", "div",
    "sin", "cos", "tan", "exp", "ln", "log", "mathrm", "operatorname", "text", "mathit",
    "partial", "limits",
];

fn is_symbol_command(name: &str) -> bool {
    !STRUCTURAL_COMMANDS.contains(&name)
}

pub struct LatexParser {
    input: String,
    source_map: SourceMap,
    filename: String,
    tokens: Vec<SpannedToken<LatexToken>>,
}

impl LatexParser {
    /// Create a new parser for the given formula
    ///
    /// # Errors
    ///
    /// Returns `KgError` if there are lexical errors in the input
    pub fn new(input: &str) -> Result<Self, KgError> {
        Self::new_with_filename(input, "<latex>")
    }

    /// Create a new parser for the given formula with a filename
    ///
    /// # Errors
    ///
    /// Returns `KgError` if there are lexical errors in the input
    pub fn new_with_filename(input: &str, filename: &str) -> Result<Self, KgError> {
        let source_map = SourceMap::new(input);
        let tokens = LatexLexer::new(input).tokenize();

        for token in &tokens {
            if token.token == LatexToken::Error {
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

    /// Parse the formula into a canonical expression
    ///
    /// # Errors
    ///
    /// Returns `KgError::Syntax` if the formula is malformed
    pub fn parse(&self) -> Result<Expr, KgError> {
        let mut cursor = Cursor {
            parser: self,
            pos: 0,
            depth: 0,
        };
        let expr = cursor.expression(Context::default())?;
        if cursor.peek() != &LatexToken::Eof {
            return Err(cursor.unexpected("end of input"));
        }
        tracing::debug!(input = %self.input, %expr, "parsed latex formula");
        Ok(expr)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    /// Inside an integrand: `d x` ends the expression
    stop_at_differential: bool,
}

struct Cursor<'p> {
    parser: &'p LatexParser,
    pos: usize,
    depth: usize,
}

impl<'p> Cursor<'p> {
    // The token list always ends with Eof, reads past it stay there
    fn token_at(&self, index: usize) -> &'p SpannedToken<LatexToken> {
        let tokens = &self.parser.tokens;
        &tokens[index.min(tokens.len() - 1)]
    }

    fn current(&self) -> &'p SpannedToken<LatexToken> {
        self.token_at(self.pos)
    }

    fn peek(&self) -> &'p LatexToken {
        &self.current().token
    }

    fn peek_at(&self, offset: usize) -> &'p LatexToken {
        &self.token_at(self.pos + offset).token
    }

    fn advance(&mut self) -> &'p SpannedToken<LatexToken> {
        let token = self.current();
        if self.pos < self.parser.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &LatexToken) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &LatexToken, what: &str) -> Result<(), KgError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn is_command(&self, name: &str) -> bool {
        matches!(self.peek(), LatexToken::Command(command) if command == name)
    }

    fn error_at(&self, token: &SpannedToken<LatexToken>, message: String) -> KgError {
        KgError::syntax(
            message,
            token.span,
            &self.parser.source_map,
            &self.parser.filename,
        )
    }

    fn error(&self, message: String) -> KgError {
        self.error_at(self.current(), message)
    }

    fn unexpected(&self, expected: &str) -> KgError {
        let token = self.current();
        let found = if token.token == LatexToken::Eof {
            "end of input"
        } else {
            token.text.as_str()
        };
        self.error(format!("Unexpected {found}, expected {expected}"))
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING`]
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, KgError>,
    ) -> Result<T, KgError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!("Formula nests deeper than {MAX_NESTING} levels")));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expression(&mut self, ctx: Context) -> Result<Expr, KgError> {
        self.nested(|cursor| cursor.additive(ctx))
    }

    fn additive(&mut self, ctx: Context) -> Result<Expr, KgError> {
        let mut terms = vec![self.term(ctx)?];
        loop {
            match self.peek() {
                LatexToken::Plus => {
                    self.advance();
                    terms.push(self.term(ctx)?);
                }
                LatexToken::Minus => {
                    self.advance();
                    terms.push(Expr::neg(self.term(ctx)?));
                }
                _ => break,
            }
        }
        Ok(Expr::add(terms))
    }

    fn term(&mut self, ctx: Context) -> Result<Expr, KgError> {
        let mut result = self.unary(ctx)?;
        loop {
            match self.peek() {
                LatexToken::Star => {
                    self.advance();
                    result = Expr::mul(vec![result, self.unary(ctx)?]);
                }
                LatexToken::Command(name) if name == "cdot" || name == "times" => {
                    self.advance();
                    result = Expr::mul(vec![result, self.unary(ctx)?]);
                }
                LatexToken::Slash => {
                    self.advance();
                    result = Expr::div(result, self.unary(ctx)?);
                }
                LatexToken::Command(name) if name == "div" => {
                    self.advance();
                    result = Expr::div(result, self.unary(ctx)?);
                }
                _ if ctx.stop_at_differential && self.at_differential() => break,
                _ if self.starts_factor() => {
                    result = Expr::mul(vec![result, self.power(ctx)?]);
                }
                _ => break,
            }
        }
        Ok(result)
    }

    fn unary(&mut self, ctx: Context) -> Result<Expr, KgError> {
        match self.peek() {
            LatexToken::Minus => {
                self.advance();
                Ok(Expr::neg(self.nested(|cursor| cursor.unary(ctx))?))
            }
            LatexToken::Plus => {
                self.advance();
                self.nested(|cursor| cursor.unary(ctx))
            }
            _ => self.power(ctx),
        }
    }

    fn power(&mut self, ctx: Context) -> Result<Expr, KgError> {
        let base = self.primary(ctx)?;
        if self.eat(&LatexToken::Caret) {
            let exponent = self.script()?;
            return Ok(Expr::pow(base, exponent));
        }
        Ok(base)
    }

    fn starts_factor(&self) -> bool {
        match self.peek() {
            LatexToken::Letter(_)
            | LatexToken::Number(_)
            | LatexToken::LeftParen
            | LatexToken::LeftBrace
            | LatexToken::LeftBracket => true,
            LatexToken::Command(name) => {
                !matches!(name.as_str(), "cdot" | "times" | "div" | "right" | "limits")
            }
            _ => false,
        }
    }

    fn primary(&mut self, ctx: Context) -> Result<Expr, KgError> {
        let token = self.current();
        match &token.token {
            LatexToken::Number(text) => {
                self.advance();
                self.number(token, text)
            }
            LatexToken::Letter(letter) => {
                self.advance();
                Ok(Expr::symbol(self.subscripted(letter.clone())?))
            }
            LatexToken::LeftParen => {
                self.advance();
                let expr = self.expression(Context::default())?;
                self.expect(&LatexToken::RightParen, ")")?;
                Ok(expr)
            }
            LatexToken::LeftBracket => {
                self.advance();
                let expr = self.expression(Context::default())?;
                self.expect(&LatexToken::RightBracket, "]")?;
                Ok(expr)
            }
            LatexToken::LeftBrace => self.group(),
            LatexToken::Command(name) => {
                self.advance();
                self.command(token, name, ctx)
            }
            _ => Err(self.unexpected("an operand")),
        }
    }

    fn number(&self, token: &SpannedToken<LatexToken>, text: &str) -> Result<Expr, KgError> {
        let parsed = if text.contains('.') {
            builder::float(text)
        } else {
            builder::integer(text)
        };
        parsed.map_err(|message| self.error_at(token, message))
    }

    fn group(&mut self) -> Result<Expr, KgError> {
        self.expect(&LatexToken::LeftBrace, "{")?;
        let expr = self.expression(Context::default())?;
        self.expect(&LatexToken::RightBrace, "}")?;
        Ok(expr)
    }

    /// Argument of `^`, `_` or `\frac`: a braced group or a single operand
    fn script(&mut self) -> Result<Expr, KgError> {
        match self.peek() {
            LatexToken::LeftBrace => self.group(),
            LatexToken::Minus => {
                self.advance();
                Ok(Expr::neg(self.nested(Self::script)?))
            }
            _ => self.primary(Context::default()),
        }
    }

    /// Append an optional `_1` or `_{ij}` subscript to `base`
    fn subscripted(&mut self, base: String) -> Result<String, KgError> {
        if !self.eat(&LatexToken::Underscore) {
            return Ok(base);
        }
        let subscript = match self.peek() {
            LatexToken::LeftBrace => self.braced_word()?,
            LatexToken::Letter(text) | LatexToken::Number(text) | LatexToken::Command(text) => {
                self.advance();
                text.clone()
            }
            _ => return Err(self.unexpected("a subscript")),
        };
        Ok(format!("{base}_{subscript}"))
    }

    /// Raw text of `{...}` with braces and backslashes dropped
    fn braced_word(&mut self) -> Result<String, KgError> {
        self.expect(&LatexToken::LeftBrace, "{")?;
        let mut depth = 1;
        let mut word = String::new();
        loop {
            let token = self.advance();
            match &token.token {
                LatexToken::LeftBrace => depth += 1,
                LatexToken::RightBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(word);
                    }
                }
                LatexToken::Eof => return Err(self.error_at(token, "Unclosed {".to_string())),
                LatexToken::Command(name) => word.push_str(name),
                _ => word.push_str(&token.text),
            }
        }
    }

    fn command(
        &mut self,
        token: &'p SpannedToken<LatexToken>,
        name: &str,
        ctx: Context,
    ) -> Result<Expr, KgError> {
        match name {
            "frac" | "dfrac" | "tfrac" => self.fraction(ctx),
            "sqrt" => self.square_root(),
            "sum" => self.summation(token, ctx),
            "int" => self.integral(token),
            "left" => self.delimited(),
            "sin" | "cos" | "tan" | "exp" | "ln" | "log" => self.function(name, ctx),
            "mathrm" | "operatorname" | "text" | "mathit" => {
                let word = self.braced_word()?;
                if self.eat(&LatexToken::LeftParen) {
                    let args = self.arguments()?;
                    Ok(Expr::apply(word, args))
                } else {
                    Ok(Expr::symbol(self.subscripted(word)?))
                }
            }
            _ if is_symbol_command(name) => Ok(Expr::symbol(self.subscripted(name.to_string())?)),
            _ => Err(self.error_at(token, format!("Unexpected \\{name}"))),
        }
    }

    /// Comma separated expressions up to a closing parenthesis
    fn arguments(&mut self) -> Result<Vec<Expr>, KgError> {
        let mut args = vec![self.expression(Context::default())?];
        while self.eat(&LatexToken::Comma) {
            args.push(self.expression(Context::default())?);
        }
        self.expect(&LatexToken::RightParen, ")")?;
        Ok(args)
    }

    fn fraction(&mut self, ctx: Context) -> Result<Expr, KgError> {
        if let Some(derivative) = self.derivative_fraction(ctx)? {
            return Ok(derivative);
        }
        let numerator = self.script()?;
        let denominator = self.script()?;
        Ok(Expr::div(numerator, denominator))
    }

    /// Consume `d`, `\partial` or `\mathrm{d}`
    fn eat_differential_marker(&mut self) -> bool {
        match (self.peek(), self.peek_at(1), self.peek_at(2), self.peek_at(3)) {
            (LatexToken::Letter(d), ..) if d == "d" => {
                self.advance();
                true
            }
            (LatexToken::Command(p), ..) if p == "partial" => {
                self.advance();
                true
            }
            (
                LatexToken::Command(m),
                LatexToken::LeftBrace,
                LatexToken::Letter(d),
                LatexToken::RightBrace,
            ) if m == "mathrm" && d == "d" => {
                self.pos += 4;
                true
            }
            _ => false,
        }
    }

    /// `\frac{d}{dx} f` or `\frac{d f}{dx}`. Restores the position and
    /// returns `None` when the fraction is an ordinary quotient.
    fn derivative_fraction(&mut self, ctx: Context) -> Result<Option<Expr>, KgError> {
        let start = self.pos;
        if !self.eat(&LatexToken::LeftBrace) || !self.eat_differential_marker() {
            self.pos = start;
            return Ok(None);
        }

        let numerator = if self.eat(&LatexToken::RightBrace) {
            None
        } else {
            let expr = self.expression(Context::default())?;
            if !self.eat(&LatexToken::RightBrace) {
                self.pos = start;
                return Ok(None);
            }
            Some(expr)
        };

        if !self.eat(&LatexToken::LeftBrace) || !self.eat_differential_marker() {
            self.pos = start;
            return Ok(None);
        }
        let var = match self.peek() {
            LatexToken::Letter(name) => {
                self.advance();
                self.subscripted(name.clone())?
            }
            LatexToken::Command(name) if is_symbol_command(name) => {
                self.advance();
                self.subscripted(name.clone())?
            }
            _ => {
                self.pos = start;
                return Ok(None);
            }
        };
        if !self.eat(&LatexToken::RightBrace) {
            self.pos = start;
            return Ok(None);
        }

        let body = match numerator {
            Some(expr) => expr,
            None => self.term(ctx)?,
        };
        Ok(Some(Expr::derivative(body, Symbol::new(var))))
    }

    fn square_root(&mut self) -> Result<Expr, KgError> {
        let index = if self.eat(&LatexToken::LeftBracket) {
            let index = self.expression(Context::default())?;
            self.expect(&LatexToken::RightBracket, "]")?;
            Some(index)
        } else {
            None
        };
        let radicand = self.script()?;
        let exponent = match index {
            Some(index) => Expr::pow(index, Expr::integer(-1)),
            None => Expr::Number(Number::Rational(1, 2)),
        };
        Ok(Expr::pow(radicand, exponent))
    }

    fn skip_limits(&mut self) {
        if self.is_command("limits") {
            self.advance();
        }
    }

    fn summation(
        &mut self,
        sum_token: &'p SpannedToken<LatexToken>,
        ctx: Context,
    ) -> Result<Expr, KgError> {
        self.skip_limits();
        let mut lower = None;
        let mut upper = None;
        for _ in 0..2 {
            if self.eat(&LatexToken::Underscore) {
                lower = Some(self.summation_start()?);
            } else if self.eat(&LatexToken::Caret) {
                upper = Some(self.script()?);
            }
        }
        let (Some((index, from)), Some(to)) = (lower, upper) else {
            return Err(self.error_at(
                sum_token,
                "\\sum needs limits such as _{i=1}^{n}".to_string(),
            ));
        };
        let body = self.term(ctx)?;
        Ok(Expr::sum(body, Symbol::new(index), from, to))
    }

    /// `{i=1}` below a sum
    fn summation_start(&mut self) -> Result<(String, Expr), KgError> {
        self.expect(&LatexToken::LeftBrace, "{")?;
        let index = match self.peek() {
            LatexToken::Letter(name) | LatexToken::Command(name) => {
                self.advance();
                self.subscripted(name.clone())?
            }
            _ => return Err(self.unexpected("a summation index")),
        };
        self.expect(&LatexToken::Equals, "=")?;
        let from = self.expression(Context::default())?;
        self.expect(&LatexToken::RightBrace, "}")?;
        Ok((index, from))
    }

    fn at_differential(&self) -> bool {
        match (self.peek(), self.peek_at(1)) {
            (LatexToken::Letter(d), LatexToken::Letter(_)) => d == "d",
            (LatexToken::Letter(d), LatexToken::Command(name)) => {
                d == "d" && is_symbol_command(name)
            }
            (LatexToken::Command(m), LatexToken::LeftBrace) => {
                m == "mathrm"
                    && matches!(self.peek_at(2), LatexToken::Letter(d) if d == "d")
                    && matches!(self.peek_at(3), LatexToken::RightBrace)
            }
            _ => false,
        }
    }

    fn integral(&mut self, int_token: &'p SpannedToken<LatexToken>) -> Result<Expr, KgError> {
        self.skip_limits();
        let mut lower = None;
        let mut upper = None;
        for _ in 0..2 {
            if self.eat(&LatexToken::Underscore) {
                lower = Some(self.script()?);
            } else if self.eat(&LatexToken::Caret) {
                upper = Some(self.script()?);
            }
        }
        let bounds = match (lower, upper) {
            (Some(a), Some(b)) => Some((a, b)),
            (None, None) => None,
            _ => {
                return Err(self.error_at(
                    int_token,
                    "Integral needs both limits or none".to_string(),
                ));
            }
        };

        let integrand = if self.at_differential() {
            Expr::one()
        } else {
            self.expression(Context {
                stop_at_differential: true,
            })?
        };

        if !self.at_differential() {
            return Err(self.unexpected("a differential such as dx"));
        }
        if self.is_command("mathrm") {
            self.pos += 4;
        } else {
            self.advance();
        }
        let var = match self.peek() {
            LatexToken::Letter(name) | LatexToken::Command(name) => {
                self.advance();
                self.subscripted(name.clone())?
            }
            _ => return Err(self.unexpected("an integration variable")),
        };
        Ok(Expr::integral(integrand, Symbol::new(var), bounds))
    }

    fn function(&mut self, name: &str, ctx: Context) -> Result<Expr, KgError> {
        let func = if name == "ln" { "log" } else { name };
        let base = if name == "log" && self.eat(&LatexToken::Underscore) {
            Some(self.script()?)
        } else {
            None
        };
        let exponent = if self.eat(&LatexToken::Caret) {
            Some(self.script()?)
        } else {
            None
        };

        let mut args = match self.peek() {
            LatexToken::LeftParen => {
                self.advance();
                self.arguments()?
            }
            LatexToken::LeftBrace => vec![self.group()?],
            _ => vec![self.power(ctx)?],
        };
        args.extend(base);

        let applied = Expr::apply(func, args);
        Ok(match exponent {
            Some(exponent) => Expr::pow(applied, exponent),
            None => applied,
        })
    }

    /// `\left( ... \right)` and `\left[ ... \right]`
    fn delimited(&mut self) -> Result<Expr, KgError> {
        let close = match self.peek() {
            LatexToken::LeftParen => LatexToken::RightParen,
            LatexToken::LeftBracket => LatexToken::RightBracket,
            _ => return Err(self.unexpected("( or [ after \\left")),
        };
        self.advance();
        let expr = self.expression(Context::default())?;
        if !self.is_command("right") {
            return Err(self.unexpected("\\right"));
        }
        self.advance();
        self.expect(&close, "a closing delimiter")?;
        Ok(expr)
    }
}
